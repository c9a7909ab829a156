//! Error types for unprofile library.

use std::io;
use thiserror::Error;

/// Result type alias for unprofile operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Fatal errors that abort a run.
///
/// Anything that still allows a reviewable record to be produced is reported
/// as a [`Warning`](crate::model::Warning) instead.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The input is not recognized as PDF.
    #[error("Unknown file format: not a valid PDF")]
    UnknownFormat,

    /// The PDF header carries a malformed version.
    #[error("Unsupported PDF version: {0}")]
    UnsupportedVersion(String),

    /// The PDF is missing, corrupt, or its content cannot be decoded.
    #[error("Unreadable PDF: {0}")]
    UnreadablePdf(String),

    /// The PDF is encrypted and no usable text could be recovered.
    #[error("Document is encrypted")]
    Encrypted,

    /// JSON (de)serialization failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV parsing failure.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Invalid heuristic configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Error while serializing the record.
    #[error("Rendering error: {0}")]
    Render(String),
}

impl Error {
    /// Whether this error means the input PDF itself could not be read.
    pub fn is_unreadable_pdf(&self) -> bool {
        matches!(
            self,
            Error::UnknownFormat
                | Error::UnsupportedVersion(_)
                | Error::UnreadablePdf(_)
                | Error::Encrypted
        )
    }
}

impl From<lopdf::Error> for Error {
    fn from(err: lopdf::Error) -> Self {
        match err {
            lopdf::Error::Decryption(_) => Error::Encrypted,
            _ => Error::UnreadablePdf(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::Encrypted;
        assert_eq!(err.to_string(), "Document is encrypted");

        let err = Error::UnreadablePdf("missing trailer".to_string());
        assert_eq!(err.to_string(), "Unreadable PDF: missing trailer");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
        assert!(!err.is_unreadable_pdf());
    }

    #[test]
    fn test_unreadable_grouping() {
        assert!(Error::UnknownFormat.is_unreadable_pdf());
        assert!(Error::Encrypted.is_unreadable_pdf());
        assert!(Error::UnsupportedVersion("x.y".into()).is_unreadable_pdf());
        assert!(!Error::Config("bad".into()).is_unreadable_pdf());
    }
}
