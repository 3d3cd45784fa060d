use imagestream_registry::{configuration, registry};
use std::{fmt, io};

#[derive(Debug)]
pub enum Error {
    IO(io::Error),
    Configuration(configuration::Error),
    Registry(registry::Error),
    InvalidArgument(String),
    Timeout(u64),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::IO(err) => write!(f, "IO error: {err}"),
            Error::Configuration(err) => {
                write!(f, "Configuration error: ")?;
                write!(f, "{err}")
            }
            Error::Registry(err) => {
                write!(f, "Registry error: ")?;
                write!(f, "{err}")
            }
            Error::InvalidArgument(err) => write!(f, "Invalid argument: {err}"),
            Error::Timeout(seconds) => write!(f, "Operation timed out after {seconds}s"),
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::IO(err)
    }
}

impl From<configuration::Error> for Error {
    fn from(err: configuration::Error) -> Self {
        Error::Configuration(err)
    }
}

impl From<registry::Error> for Error {
    fn from(err: registry::Error) -> Self {
        Error::Registry(err)
    }
}
