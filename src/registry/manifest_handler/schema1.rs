use crate::registry::blob_store::BlobStore;
use crate::registry::manifest_handler::{verify_blob_exists, ImageLayer, LayerOrder, Payload};
use crate::registry::oci::media_type::{MANIFEST_SCHEMA1_LAYER, MANIFEST_SCHEMA1_SIGNED};
use crate::registry::oci::{Digest, SignedManifest};
use crate::registry::Error;
use regex::Regex;
use std::sync::{Arc, LazyLock};
use tracing::instrument;

const REPOSITORY_NAME_MAX_LENGTH: usize = 255;

/// Docker reference name: optional `host[:port]/` prefix, then lowercase path components.
static REPOSITORY_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    let domain_component = r"(?:[a-zA-Z0-9]|[a-zA-Z0-9][a-zA-Z0-9-]*[a-zA-Z0-9])";
    let domain = format!(r"{domain_component}(?:\.{domain_component})*(?::[0-9]+)?");
    let path_component = r"[a-z0-9]+(?:(?:[._]|__|[-]*)[a-z0-9]+)*";
    Regex::new(&format!(
        r"^(?:{domain}/)?{path_component}(?:/{path_component})*$"
    ))
    .unwrap()
});

pub struct Schema1Handler {
    blob_store: Arc<dyn BlobStore>,
    manifest: SignedManifest,
}

impl Schema1Handler {
    pub fn new(blob_store: Arc<dyn BlobStore>, manifest: SignedManifest) -> Self {
        Self {
            blob_store,
            manifest,
        }
    }

    pub fn digest(&self) -> Digest {
        self.manifest.digest()
    }

    pub fn manifest(&self) -> &SignedManifest {
        &self.manifest
    }

    pub fn payload(&self) -> Payload {
        Payload {
            media_type: MANIFEST_SCHEMA1_SIGNED.to_string(),
            payload: self.manifest.all().to_vec(),
            canonical: self.manifest.canonical().to_vec(),
        }
    }

    /// Layer sizes are not part of schema 1, they come from the blob store.
    #[instrument(skip(self), fields(digest = %self.digest()))]
    pub async fn layers(&self) -> Result<(LayerOrder, Vec<ImageLayer>), Error> {
        let mut layers = Vec::with_capacity(self.manifest.manifest.fs_layers.len());

        for fs_layer in &self.manifest.manifest.fs_layers {
            let size = self.blob_store.get_blob_size(&fs_layer.blob_sum).await?;
            layers.push(ImageLayer {
                name: fs_layer.blob_sum.to_string(),
                size,
                media_type: MANIFEST_SCHEMA1_LAYER.to_string(),
            });
        }

        Ok((LayerOrder::Descending, layers))
    }

    #[instrument(skip(self), fields(digest = %self.digest()))]
    pub async fn verify(&self, skip_dependency_verification: bool) -> Result<(), Error> {
        let manifest = &self.manifest.manifest;

        if manifest.name.len() > REPOSITORY_NAME_MAX_LENGTH {
            return Err(Error::ManifestInvalid(format!(
                "repository name must not be more than {REPOSITORY_NAME_MAX_LENGTH} characters"
            )));
        }

        if !REPOSITORY_NAME_RE.is_match(&manifest.name) {
            return Err(Error::ManifestInvalid(format!(
                "invalid repository name '{}'",
                manifest.name
            )));
        }

        if manifest.fs_layers.is_empty() {
            return Err(Error::ManifestInvalid(
                "manifest has no layers".to_string(),
            ));
        }

        if manifest.history.len() != manifest.fs_layers.len() {
            return Err(Error::ManifestInvalid(format!(
                "mismatched history and fslayer cardinality {} != {}",
                manifest.history.len(),
                manifest.fs_layers.len()
            )));
        }

        if skip_dependency_verification {
            return Ok(());
        }

        for fs_layer in &manifest.fs_layers {
            verify_blob_exists(self.blob_store.as_ref(), &fs_layer.blob_sum).await?;
        }

        Ok(())
    }
}
