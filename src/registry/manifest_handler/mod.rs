mod schema1;
mod schema2;

use crate::registry::blob_store::{self, BlobStore};
use crate::registry::image_store::Image;
use crate::registry::oci::media_type::{self, MANIFEST_SCHEMA2};
use crate::registry::oci::{DeserializedManifest, Digest, Manifest, SignedManifest};
use crate::registry::Error;
use serde::Serialize;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use tracing::{debug, instrument};

pub use schema1::Schema1Handler;
pub use schema2::Schema2Handler;

/// A layer of an image, as recorded on the image object.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageLayer {
    pub name: String,
    pub size: u64,
    pub media_type: String,
}

/// Schema 1 lists layers from the top of the image down, schema 2 from the base up.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LayerOrder {
    Ascending,
    Descending,
}

impl Display for LayerOrder {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            LayerOrder::Ascending => write!(f, "ascending"),
            LayerOrder::Descending => write!(f, "descending"),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Payload {
    pub media_type: String,
    /// The complete document, signatures included.
    pub payload: Vec<u8>,
    /// The document without signatures.
    pub canonical: Vec<u8>,
}

/// Uniform operations over the supported manifest schemas.
pub enum ManifestHandler {
    Schema1(Schema1Handler),
    Schema2(Schema2Handler),
}

/// Picks the handler matching the manifest's schema.
pub fn new_manifest_handler(
    blob_store: Arc<dyn BlobStore>,
    manifest: Manifest,
) -> Result<ManifestHandler, Error> {
    match manifest {
        Manifest::Schema1(manifest) => Ok(ManifestHandler::Schema1(Schema1Handler::new(
            blob_store, manifest,
        ))),
        Manifest::Schema2(manifest) => Ok(ManifestHandler::Schema2(Schema2Handler::new(
            blob_store, manifest,
        ))),
        Manifest::Unhandled { media_type, .. } => Err(Error::UnsupportedManifestType(media_type)),
    }
}

/// Rebuilds the manifest stored in an image record.
///
/// Records written before media types were tracked have none; those are schema 1
/// manifests whose signatures may be stored next to the payload.
#[instrument(skip(image), fields(image = %image.metadata.name))]
pub fn manifest_from_image(image: &Image) -> Result<Manifest, Error> {
    if image.docker_image_manifest.is_empty() {
        return Err(Error::ManifestMissing {
            image: image.metadata.name.clone(),
            media_type: image.docker_image_manifest_media_type.clone(),
        });
    }

    let content = image.docker_image_manifest.as_bytes();
    let declared_media_type = image.docker_image_manifest_media_type.as_str();

    if media_type::is_schema1(declared_media_type) {
        debug!(
            "Reconstructing schema 1 manifest with {} detached signature(s)",
            image.docker_image_signatures.len()
        );
        let manifest =
            SignedManifest::with_detached_signatures(content, &image.docker_image_signatures)?;
        Ok(Manifest::Schema1(manifest))
    } else if declared_media_type == MANIFEST_SCHEMA2 {
        Ok(Manifest::Schema2(DeserializedManifest::from_slice(content)?))
    } else {
        Err(Error::UnsupportedMediaType(declared_media_type.to_string()))
    }
}

/// Fails with [`Error::MissingDependency`] when the blob store does not know `digest`.
async fn verify_blob_exists(blob_store: &dyn BlobStore, digest: &Digest) -> Result<(), Error> {
    match blob_store.get_blob_size(digest).await {
        Ok(_) => Ok(()),
        Err(blob_store::Error::BlobNotFound) => Err(Error::MissingDependency(digest.clone())),
        Err(e) => Err(e.into()),
    }
}

impl ManifestHandler {
    pub fn digest(&self) -> Digest {
        match self {
            ManifestHandler::Schema1(handler) => handler.digest(),
            ManifestHandler::Schema2(handler) => handler.digest(),
        }
    }

    pub fn manifest(&self) -> Manifest {
        match self {
            ManifestHandler::Schema1(handler) => Manifest::Schema1(handler.manifest().clone()),
            ManifestHandler::Schema2(handler) => Manifest::Schema2(handler.manifest().clone()),
        }
    }

    pub fn payload(&self) -> Payload {
        match self {
            ManifestHandler::Schema1(handler) => handler.payload(),
            ManifestHandler::Schema2(handler) => handler.payload(),
        }
    }

    /// The image configuration blob; empty for schemas without one.
    pub async fn config(&self) -> Result<Vec<u8>, Error> {
        match self {
            ManifestHandler::Schema1(_) => Ok(Vec::new()),
            ManifestHandler::Schema2(handler) => handler.config().await,
        }
    }

    pub async fn layers(&self) -> Result<(LayerOrder, Vec<ImageLayer>), Error> {
        match self {
            ManifestHandler::Schema1(handler) => handler.layers().await,
            ManifestHandler::Schema2(handler) => Ok(handler.layers()),
        }
    }

    pub async fn verify(&self, skip_dependency_verification: bool) -> Result<(), Error> {
        match self {
            ManifestHandler::Schema1(handler) => handler.verify(skip_dependency_verification).await,
            ManifestHandler::Schema2(handler) => handler.verify(skip_dependency_verification).await,
        }
    }
}
