//! Error taxonomy for the dictionary.
//!
//! Six kinds, one enum. Queries never produce errors for "not present" -
//! they return `None` or an empty result set. Errors are reserved for
//! misuse (`Param`, `State`), structural limits (`Size`), and the IO
//! boundary (`Io`, `Format`, `Range`). A failed build leaves the
//! dictionary empty; nothing is recovered silently.

use std::fmt;
use std::io;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Error kinds surfaced at the API boundary.
#[derive(Debug)]
pub enum Error {
    /// Invalid argument: bad flag combination, out-of-range id,
    /// undersized caller buffer.
    Param(String),
    /// The structure would exceed its addressing limits (2^32 nodes,
    /// 2^32 bytes per section).
    Size(String),
    /// Operation invalid for the current state (e.g. serialising an
    /// unbuilt dictionary).
    State(&'static str),
    /// Underlying stream or file failure.
    Io(io::Error),
    /// Corrupt or mis-versioned serialised data.
    Format(String),
    /// A decoded bit vector is internally inconsistent. Detected during
    /// load validation; past that point the same condition is a bug and
    /// aborts via assertion.
    Range(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Param(msg) => write!(f, "invalid parameter: {}", msg),
            Error::Size(msg) => write!(f, "size limit exceeded: {}", msg),
            Error::State(msg) => write!(f, "invalid state: {}", msg),
            Error::Io(err) => write!(f, "io error: {}", err),
            Error::Format(msg) => write!(f, "format error: {}", msg),
            Error::Range(msg) => write!(f, "range error: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Io(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_carries_context() {
        let err = Error::Param("num_tries must be 1..=16, got 99".to_string());
        assert!(err.to_string().contains("99"));

        let err = Error::Format("bad magic".to_string());
        assert!(err.to_string().starts_with("format error"));
    }

    #[test]
    fn io_errors_convert() {
        let io_err = io::Error::new(io::ErrorKind::UnexpectedEof, "truncated");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
