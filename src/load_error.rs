use std::error::Error;
use std::fmt::{Display, Formatter};

use crate::wire::DecodeError;

/// Errors that occur when loading a model from a file.
#[derive(Debug)]
pub enum LoadError {
    /// An error occurred reading the file from disk.
    Io(std::io::Error),

    /// The file was read but its contents could not be decoded.
    Decode(DecodeError),
}

impl Display for LoadError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "read error: {e}"),
            Self::Decode(e) => write!(f, "decode error: {e}"),
        }
    }
}

impl Error for LoadError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Decode(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for LoadError {
    fn from(val: std::io::Error) -> Self {
        Self::Io(val)
    }
}

impl From<DecodeError> for LoadError {
    fn from(val: DecodeError) -> Self {
        Self::Decode(val)
    }
}
