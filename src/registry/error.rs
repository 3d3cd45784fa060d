use crate::registry::oci::Digest;
use crate::registry::{blob_store, image_store, oci};
use std::fmt::Display;
use tracing::debug;

#[derive(Clone, Debug, PartialEq)]
pub enum Error {
    RepositoryUnknown(String),
    TagUnknown(String),
    AccessDenied,
    DigestInvalid(String),
    UnsupportedManifestType(String),
    UnsupportedMediaType(String),
    ManifestMissing { image: String, media_type: String },
    ManifestInvalid(String),
    MissingDependency(Digest),
    // Collaborator failures passed through unchanged
    ImageStore(image_store::Error),
    BlobStore(blob_store::Error),
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::RepositoryUnknown(name) => write!(f, "repository name not known to registry: {name}"),
            Error::TagUnknown(tag) => write!(f, "unknown tag={tag}"),
            Error::AccessDenied => write!(f, "access denied"),
            Error::DigestInvalid(s) => write!(f, "invalid digest: {s}"),
            Error::UnsupportedManifestType(s) => write!(f, "unsupported manifest type {s}"),
            Error::UnsupportedMediaType(s) => write!(f, "unsupported manifest media type {s}"),
            Error::ManifestMissing { image, media_type } => write!(
                f,
                "manifest is not present in image object {image} (mediatype={media_type:?})"
            ),
            Error::ManifestInvalid(s) => write!(f, "manifest invalid: {s}"),
            Error::MissingDependency(digest) => {
                write!(f, "unknown blob {digest} on manifest")
            }
            Error::ImageStore(e) => write!(f, "image store error: {e}"),
            Error::BlobStore(e) => write!(f, "blob store error: {e}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<image_store::Error> for Error {
    fn from(error: image_store::Error) -> Self {
        debug!("Image store error: {error}");
        Error::ImageStore(error)
    }
}

impl From<blob_store::Error> for Error {
    fn from(error: blob_store::Error) -> Self {
        debug!("Blob store error: {error}");
        Error::BlobStore(error)
    }
}

impl From<oci::Error> for Error {
    fn from(error: oci::Error) -> Self {
        debug!("Manifest error: {error}");
        match error {
            oci::Error::InvalidFormat(s) => Error::ManifestInvalid(s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            Error::RepositoryUnknown("ns/app".to_string()).to_string(),
            "repository name not known to registry: ns/app"
        );
        assert_eq!(Error::TagUnknown("v1".to_string()).to_string(), "unknown tag=v1");
        assert_eq!(
            Error::ManifestMissing {
                image: "sha256:abc".to_string(),
                media_type: String::new(),
            }
            .to_string(),
            "manifest is not present in image object sha256:abc (mediatype=\"\")"
        );
    }

    #[test]
    fn test_from_collaborator_errors() {
        assert_eq!(
            Error::from(image_store::Error::Conflict("stale".to_string())),
            Error::ImageStore(image_store::Error::Conflict("stale".to_string()))
        );
        assert_eq!(
            Error::from(blob_store::Error::BlobNotFound),
            Error::BlobStore(blob_store::Error::BlobNotFound)
        );
        assert_eq!(
            Error::from(oci::Error::InvalidFormat("bad".to_string())),
            Error::ManifestInvalid("bad".to_string())
        );
    }
}
