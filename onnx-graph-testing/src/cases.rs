use std::any::Any;
use std::fmt::{Debug, Write};
use std::panic::{catch_unwind, RefUnwindSafe};

/// Runs a test function over a table of cases.
///
/// Each case is usually a small `Case` struct deriving `Debug`, holding the
/// input data and expected result. Every case is run even if earlier ones
/// fail. Afterwards, if any case panicked, `test_each` panics with one line
/// per failure giving the case's index in the table, its `Debug` output and
/// the original panic message.
///
/// ```
/// use onnx_graph_testing::{encode_varint, TestCases};
///
/// #[derive(Debug)]
/// struct Case {
///     value: u64,
///     len: usize,
/// }
///
/// let cases = [
///     Case { value: 127, len: 1 },
///     Case { value: 128, len: 2 },
///     Case { value: 1 << 14, len: 3 },
/// ];
///
/// cases.test_each(|case| {
///     assert_eq!(encode_varint(case.value).len(), case.len);
/// });
/// ```
///
/// Panics are caught with [`catch_unwind`], so the cases and anything the
/// test function captures must be [`RefUnwindSafe`]. Values that are not,
/// such as `Cell`s, should be created inside the test function instead.
pub trait TestCases {
    type Case;

    /// Call `test` with a reference to each case, then panic if any call
    /// panicked.
    fn test_each(self, test: impl Fn(&Self::Case) + RefUnwindSafe)
    where
        Self::Case: Debug + RefUnwindSafe;
}

impl<I: IntoIterator> TestCases for I {
    type Case = I::Item;

    fn test_each(self, test: impl Fn(&I::Item) + RefUnwindSafe)
    where
        I::Item: Debug + RefUnwindSafe,
    {
        let mut report = String::new();
        let mut failed = 0;

        for (index, case) in self.into_iter().enumerate() {
            if let Err(payload) = catch_unwind(|| test(&case)) {
                failed += 1;
                let _ = writeln!(
                    report,
                    "  case {}: {:?}: {}",
                    index,
                    case,
                    panic_message(payload.as_ref())
                );
            }
        }

        if failed > 0 {
            panic!("{} test cases failed:\n{}", failed, report);
        }
    }
}

/// Extract the message from a panic payload.
fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        *msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.as_str()
    } else {
        "<non-string panic>"
    }
}
