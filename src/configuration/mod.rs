use serde::Deserialize;
use std::fs;
use std::path::Path;

mod error;
pub mod registry;

use crate::registry::{blob_store, image_store};
pub use error::Error;

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Configuration {
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(default)]
    pub blob_store: BlobStorageConfig,
    #[serde(default)]
    pub image_store: ImageStoreConfig,
    #[serde(default)]
    pub observability: Option<ObservabilityConfig>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct RegistryConfig {
    #[serde(default)]
    pub pullthrough: bool,
    #[serde(default = "RegistryConfig::default_request_timeout")]
    pub request_timeout: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        RegistryConfig {
            pullthrough: false,
            request_timeout: RegistryConfig::default_request_timeout(),
        }
    }
}

impl RegistryConfig {
    fn default_request_timeout() -> u64 {
        30
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub enum BlobStorageConfig {
    #[serde(rename = "fs")]
    FS(blob_store::fs::BackendConfig),
}

impl Default for BlobStorageConfig {
    fn default() -> Self {
        BlobStorageConfig::FS(blob_store::fs::BackendConfig::default())
    }
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub enum ImageStoreConfig {
    #[serde(rename = "fs")]
    FS(image_store::fs::BackendConfig),
    #[serde(skip_deserializing)]
    #[default]
    Unspecified,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default)]
    pub tracing: Option<TracingConfig>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct TracingConfig {
    pub endpoint: String,
    pub sampling_rate: f64,
}

impl Configuration {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let config_str = fs::read_to_string(path)?;
        Self::load_from_str(&config_str)
    }

    pub fn load_from_str(slice: &str) -> Result<Self, Error> {
        let mut config: Configuration = toml::from_str(slice).map_err(|e| {
            println!("Configuration file format error:");
            println!("{e}");
            Error::ConfigurationFileFormat(e.to_string())
        })?;

        // Resolve Unspecified image_store based on blob_store configuration
        if matches!(config.image_store, ImageStoreConfig::Unspecified) {
            config.image_store = match &config.blob_store {
                BlobStorageConfig::FS(cfg) => ImageStoreConfig::FS(image_store::fs::BackendConfig {
                    root_dir: cfg.root_dir.clone(),
                    sync_to_disk: cfg.sync_to_disk,
                    max_images_per_stream: None,
                }),
            };
        }

        if config.registry.request_timeout == 0 {
            return Err(Error::ConfigurationFileFormat(
                "request_timeout must be at least 1 second".to_string(),
            ));
        }

        if let ImageStoreConfig::FS(image_store::fs::BackendConfig {
            max_images_per_stream: Some(0),
            ..
        }) = config.image_store
        {
            return Err(Error::ConfigurationFileFormat(
                "max_images_per_stream must be at least 1".to_string(),
            ));
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_minimal_config() {
        let config = Configuration::load_from_str("").unwrap();

        assert!(!config.registry.pullthrough);
        assert_eq!(config.registry.request_timeout, 30);
        assert_eq!(config.blob_store, BlobStorageConfig::default());
        assert_eq!(
            config.image_store,
            ImageStoreConfig::FS(image_store::fs::BackendConfig::default())
        );
        assert!(config.observability.is_none());
    }

    #[test]
    fn test_load_full_config() {
        let config = r#"
        [registry]
        pullthrough = true
        request_timeout = 5

        [blob_store.fs]
        root_dir = "/data/blobs"

        [image_store.fs]
        root_dir = "/data/images"
        sync_to_disk = true
        max_images_per_stream = 50

        [observability.tracing]
        endpoint = "http://localhost:4317"
        sampling_rate = 0.5
        "#;

        let config = Configuration::load_from_str(config).unwrap();

        assert!(config.registry.pullthrough);
        assert_eq!(config.registry.request_timeout, 5);
        match config.image_store {
            ImageStoreConfig::FS(ref cfg) => {
                assert_eq!(cfg.root_dir, "/data/images");
                assert!(cfg.sync_to_disk);
                assert_eq!(cfg.max_images_per_stream, Some(50));
            }
            ImageStoreConfig::Unspecified => panic!("Expected FS image store"),
        }

        let tracing = config.observability.and_then(|o| o.tracing).unwrap();
        assert_eq!(tracing.endpoint, "http://localhost:4317");
        assert!((tracing.sampling_rate - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_image_store_defaults_with_fs_blob_store() {
        let config = r#"
        [blob_store.fs]
        root_dir = "/data/registry"
        sync_to_disk = true
        "#;

        let config = Configuration::load_from_str(config).unwrap();

        match config.image_store {
            ImageStoreConfig::FS(ref cfg) => {
                assert_eq!(cfg.root_dir, "/data/registry");
                assert!(cfg.sync_to_disk);
                assert_eq!(cfg.max_images_per_stream, None);
            }
            ImageStoreConfig::Unspecified => panic!("Expected FS image store"),
        }
    }

    #[test]
    fn test_invalid_values() {
        let config = r#"
        [registry]
        request_timeout = 0
        "#;
        assert!(matches!(
            Configuration::load_from_str(config),
            Err(Error::ConfigurationFileFormat(_))
        ));

        let config = r#"
        [image_store.fs]
        root_dir = "/data"
        max_images_per_stream = 0
        "#;
        assert!(matches!(
            Configuration::load_from_str(config),
            Err(Error::ConfigurationFileFormat(_))
        ));

        assert!(matches!(
            Configuration::load_from_str("[registry]\npullthrough = \"yes\""),
            Err(Error::ConfigurationFileFormat(_))
        ));
    }

    #[test]
    fn test_load_missing_file() {
        assert!(matches!(
            Configuration::load("/nonexistent/config.toml"),
            Err(Error::Io(_))
        ));
    }
}
