use std::fmt::Debug;
use std::{fmt, io};
use tracing::error;

#[derive(Clone, Debug, PartialEq)]
pub enum Error {
    StorageBackend(String),
    BlobNotFound,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::StorageBackend(e) => write!(f, "Storage backend error: {e}"),
            Error::BlobNotFound => write!(f, "Blob not found"),
        }
    }
}

impl std::error::Error for Error {}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        if e.kind() == io::ErrorKind::NotFound {
            Error::BlobNotFound
        } else {
            error!("IO error: {e:?}");
            Error::StorageBackend(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            format!("{}", Error::StorageBackend("disk full".to_string())),
            "Storage backend error: disk full"
        );
        assert_eq!(format!("{}", Error::BlobNotFound), "Blob not found");
    }

    #[test]
    fn test_from_io_error() {
        assert_eq!(
            Error::from(io::Error::new(io::ErrorKind::NotFound, "file not found")),
            Error::BlobNotFound
        );
        assert!(matches!(
            Error::from(io::Error::new(io::ErrorKind::PermissionDenied, "denied")),
            Error::StorageBackend(_)
        ));
    }
}
