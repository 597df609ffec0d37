use std::fmt;
use std::io;

/// Error raised while reading or decoding a map file.
#[derive(Debug)]
pub struct MapFileError {
    message: String,
}

impl MapFileError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for MapFileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for MapFileError {}

impl From<io::Error> for MapFileError {
    fn from(err: io::Error) -> Self {
        MapFileError::new(format!("IO error: {}", err))
    }
}

impl From<std::string::FromUtf8Error> for MapFileError {
    fn from(err: std::string::FromUtf8Error) -> Self {
        MapFileError::new(format!("UTF-8 error: {}", err))
    }
}

impl From<String> for MapFileError {
    fn from(message: String) -> Self {
        MapFileError::new(message)
    }
}

impl From<&str> for MapFileError {
    fn from(message: &str) -> Self {
        MapFileError::new(message)
    }
}

/// Outcome of `MapDecoder::open_file`.
#[derive(Debug)]
pub enum FileOpenResult {
    Success,
    Failure(String),
}

impl FileOpenResult {
    pub fn is_success(&self) -> bool {
        matches!(self, FileOpenResult::Success)
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            FileOpenResult::Success => None,
            FileOpenResult::Failure(reason) => Some(reason),
        }
    }
}
