use std::{fmt, io};
use tracing::error;

#[derive(Clone, Debug, PartialEq)]
pub enum Error {
    NotFound(String),
    QuotaExceeded(String),
    Conflict(String),
    Invalid(String),
    Backend(String),
    Serialization(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::NotFound(e) => write!(f, "Not found: {e}"),
            Error::QuotaExceeded(e) => write!(f, "Quota exceeded: {e}"),
            Error::Conflict(e) => write!(f, "Conflict: {e}"),
            Error::Invalid(e) => write!(f, "Invalid: {e}"),
            Error::Backend(e) => write!(f, "Backend error: {e}"),
            Error::Serialization(e) => write!(f, "Serialization error: {e}"),
        }
    }
}

impl std::error::Error for Error {}

impl Error {
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, Error::QuotaExceeded(_))
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        if e.kind() == io::ErrorKind::NotFound {
            Error::NotFound(e.to_string())
        } else {
            error!("IO error: {e:?}");
            Error::Backend(e.to_string())
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            format!("{}", Error::QuotaExceeded("limit 1".to_string())),
            "Quota exceeded: limit 1"
        );
        assert_eq!(
            format!("{}", Error::NotFound("images/x".to_string())),
            "Not found: images/x"
        );
    }

    #[test]
    fn test_is_quota_exceeded() {
        assert!(Error::QuotaExceeded(String::new()).is_quota_exceeded());
        assert!(!Error::Conflict(String::new()).is_quota_exceeded());
    }

    #[test]
    fn test_from_io_error() {
        assert!(matches!(
            Error::from(io::Error::new(io::ErrorKind::NotFound, "missing")),
            Error::NotFound(_)
        ));
        assert!(matches!(
            Error::from(io::Error::new(io::ErrorKind::PermissionDenied, "denied")),
            Error::Backend(_)
        ));
    }
}
