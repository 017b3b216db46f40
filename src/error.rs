/*!
error module defines the error types used in dflog.
*/
use std::fmt::{Display, Formatter};
use std::io::ErrorKind;
use std::{error::Error, fmt, io};

#[derive(Debug)]
pub enum DflogError {
    IoError(io::Error),
    EofError(io::Error),
    FormatError(String),
    ParseError(String),
    MergeError(String),
}

impl Error for DflogError {}

impl Display for DflogError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            DflogError::IoError(e) => write!(f, "IO error: {e}"),
            DflogError::EofError(e) => write!(f, "unexpected end of file: {e}"),
            DflogError::FormatError(s) => write!(f, "format error: {s}"),
            DflogError::ParseError(s) => write!(f, "parse error: {s}"),
            DflogError::MergeError(s) => write!(f, "merge error: {s}"),
        }
    }
}

impl From<io::Error> for DflogError {
    fn from(io_error: io::Error) -> Self {
        match io_error.kind() {
            ErrorKind::UnexpectedEof => DflogError::EofError(io_error),
            _ => DflogError::IoError(io_error),
        }
    }
}
