use crate::registry::blob_store::BlobStore;
use crate::registry::manifest_handler::{verify_blob_exists, ImageLayer, LayerOrder, Payload};
use crate::registry::oci::media_type::MANIFEST_SCHEMA2;
use crate::registry::oci::{DeserializedManifest, Digest};
use crate::registry::Error;
use std::sync::Arc;
use tracing::instrument;

pub struct Schema2Handler {
    blob_store: Arc<dyn BlobStore>,
    manifest: DeserializedManifest,
}

impl Schema2Handler {
    pub fn new(blob_store: Arc<dyn BlobStore>, manifest: DeserializedManifest) -> Self {
        Self {
            blob_store,
            manifest,
        }
    }

    pub fn digest(&self) -> Digest {
        self.manifest.digest()
    }

    pub fn manifest(&self) -> &DeserializedManifest {
        &self.manifest
    }

    pub fn payload(&self) -> Payload {
        let canonical = self.manifest.canonical().to_vec();
        Payload {
            media_type: MANIFEST_SCHEMA2.to_string(),
            payload: canonical.clone(),
            canonical,
        }
    }

    #[instrument(skip(self), fields(digest = %self.digest()))]
    pub async fn config(&self) -> Result<Vec<u8>, Error> {
        let config = &self.manifest.manifest.config;
        Ok(self.blob_store.read_blob(&config.digest).await?)
    }

    pub fn layers(&self) -> (LayerOrder, Vec<ImageLayer>) {
        let layers = self
            .manifest
            .manifest
            .layers
            .iter()
            .map(|layer| ImageLayer {
                name: layer.digest.to_string(),
                size: layer.size,
                media_type: layer.media_type.clone(),
            })
            .collect();

        (LayerOrder::Ascending, layers)
    }

    #[instrument(skip(self), fields(digest = %self.digest()))]
    pub async fn verify(&self, skip_dependency_verification: bool) -> Result<(), Error> {
        let schema_version = self.manifest.manifest.schema_version;
        if schema_version != 2 {
            return Err(Error::ManifestInvalid(format!(
                "unrecognized manifest schema version {schema_version}"
            )));
        }

        if skip_dependency_verification {
            return Ok(());
        }

        for reference in self.manifest.references() {
            verify_blob_exists(self.blob_store.as_ref(), &reference.digest).await?;
        }

        Ok(())
    }
}
