use crate::configuration::{BlobStorageConfig, Configuration, Error, ImageStoreConfig};
use crate::registry::blob_store::BlobStore;
use crate::registry::image_store::ImageStore;
use crate::registry::{blob_store, image_store, Registry};
use std::sync::Arc;
use tracing::info;

pub fn create_blob_store(config: &BlobStorageConfig) -> Arc<dyn BlobStore> {
    match config {
        BlobStorageConfig::FS(fs_config) => Arc::new(blob_store::fs::Backend::new(fs_config)),
    }
}

pub fn create_image_store(config: &ImageStoreConfig) -> Result<Arc<dyn ImageStore>, Error> {
    match config {
        ImageStoreConfig::FS(fs_config) => Ok(Arc::new(image_store::fs::Backend::new(fs_config))),
        ImageStoreConfig::Unspecified => Err(Error::ConfigurationFileFormat(
            "Image store configuration is unspecified".to_string(),
        )),
    }
}

pub fn create_registry(config: &Configuration) -> Result<Registry, Error> {
    let blob_store = create_blob_store(&config.blob_store);
    let image_store = create_image_store(&config.image_store)?;

    info!(
        pullthrough = config.registry.pullthrough,
        "Registry initialized"
    );
    Ok(Registry::new(
        blob_store,
        image_store,
        config.registry.pullthrough,
    ))
}
