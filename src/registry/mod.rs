use std::fmt::Debug;
use std::sync::Arc;
use tracing::instrument;

pub mod blob_store;
pub mod data_store;
mod error;
pub mod image_store;
pub mod managed;
pub mod manifest_handler;
pub mod oci;
pub mod tag_service;

use crate::registry::blob_store::BlobStore;
use crate::registry::image_store::{CachedImageStreamGetter, Image, ImageStore, ImageStreamReference};
use crate::registry::manifest_handler::ManifestHandler;
use crate::registry::oci::Manifest;
use crate::registry::tag_service::TagService;
pub use error::Error;

pub struct Registry {
    blob_store: Arc<dyn BlobStore>,
    image_store: Arc<dyn ImageStore>,
    pullthrough: bool,
}

impl Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("pullthrough", &self.pullthrough)
            .finish()
    }
}

impl Registry {
    pub fn new(
        blob_store: Arc<dyn BlobStore>,
        image_store: Arc<dyn ImageStore>,
        pullthrough: bool,
    ) -> Self {
        Self {
            blob_store,
            image_store,
            pullthrough,
        }
    }

    pub fn blob_store(&self) -> &dyn BlobStore {
        self.blob_store.as_ref()
    }

    pub fn image_store(&self) -> &dyn ImageStore {
        self.image_store.as_ref()
    }

    /// Tag operations on one image stream. The stream is fetched at most once per
    /// returned service, so a service should not outlive the request using it.
    #[instrument(skip(self))]
    pub fn tag_service(&self, namespace: &str, name: &str) -> TagService {
        let reference = ImageStreamReference::new(namespace, name);
        let getter = CachedImageStreamGetter::new(self.image_store.clone(), reference.clone());

        TagService::new(
            reference,
            Arc::new(getter),
            self.image_store.clone(),
            self.pullthrough,
        )
    }

    pub fn manifest_handler(&self, manifest: Manifest) -> Result<ManifestHandler, Error> {
        manifest_handler::new_manifest_handler(self.blob_store.clone(), manifest)
    }

    pub fn manifest_from_image(&self, image: &Image) -> Result<Manifest, Error> {
        manifest_handler::manifest_from_image(image)
    }
}
