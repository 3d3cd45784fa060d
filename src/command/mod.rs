mod error;
pub mod import;
pub mod inspect;
pub mod tags;

use imagestream_registry::registry::oci::Digest;

pub use error::Error;

/// Splits `namespace/name` into its two parts.
fn parse_repository(repository: &str) -> Result<(&str, &str), Error> {
    repository
        .split_once('/')
        .filter(|(namespace, name)| !namespace.is_empty() && !name.is_empty())
        .ok_or_else(|| {
            Error::InvalidArgument(format!(
                "'{repository}' is not a repository of the form namespace/name"
            ))
        })
}

fn parse_digest(digest: &str) -> Result<Digest, Error> {
    Digest::try_from(digest).map_err(|e| Error::InvalidArgument(e.to_string()))
}
