use crate::command::{parse_digest, Error};
use argh::FromArgs;
use imagestream_registry::registry;
use imagestream_registry::registry::managed::is_image_managed;
use imagestream_registry::registry::manifest_handler::ImageLayer;
use imagestream_registry::registry::Registry;
use serde::Serialize;

#[derive(FromArgs, PartialEq, Debug)]
#[argh(
    subcommand,
    name = "inspect",
    description = "Show and verify the manifest held by an image record"
)]
pub struct Options {
    #[argh(positional)]
    /// the digest of the image
    pub digest: String,
    #[argh(switch)]
    /// do not check that referenced blobs are present
    pub skip_dependency_verification: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Report {
    digest: String,
    media_type: String,
    managed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    config_size: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    layer_order: Option<String>,
    layers: Vec<ImageLayer>,
    verification: String,
}

pub struct Command {
    registry: Registry,
}

impl Command {
    pub fn new(registry: Registry) -> Self {
        Self { registry }
    }

    /// Verifies first; config and layers are only reported when they can be resolved.
    async fn report(
        &self,
        options: &Options,
    ) -> Result<(Report, Result<(), registry::Error>), Error> {
        let digest = parse_digest(&options.digest)?;

        let image = self
            .registry
            .image_store()
            .get_image(&digest)
            .await
            .map_err(registry::Error::from)?;

        let manifest = self.registry.manifest_from_image(&image)?;
        let handler = self.registry.manifest_handler(manifest)?;

        let verification = handler.verify(options.skip_dependency_verification).await;

        let details = match (handler.config().await, handler.layers().await) {
            (Ok(config), Ok(layers)) => Some((config, layers)),
            (Err(e), _) | (_, Err(e)) if verification.is_ok() => return Err(e.into()),
            _ => None,
        };
        let (config_size, layer_order, layers) = match details {
            Some((config, (layer_order, layers))) => {
                (Some(config.len()), Some(layer_order.to_string()), layers)
            }
            None => (None, None, Vec::new()),
        };

        let report = Report {
            digest: handler.digest().to_string(),
            media_type: handler.payload().media_type,
            managed: is_image_managed(&image),
            config_size,
            layer_order,
            layers,
            verification: match &verification {
                Ok(()) => "ok".to_string(),
                Err(e) => e.to_string(),
            },
        };

        Ok((report, verification))
    }

    pub async fn run(&self, options: &Options) -> Result<(), Error> {
        let (report, verification) = self.report(options).await?;

        let report = serde_json::to_string_pretty(&report)
            .map_err(|e| Error::InvalidArgument(e.to_string()))?;
        println!("{report}");

        Ok(verification?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine;
    use imagestream_registry::configuration::registry::create_registry;
    use imagestream_registry::configuration::Configuration;
    use imagestream_registry::registry::image_store::{Image, ImageStreamMapping, ObjectMeta};
    use imagestream_registry::registry::oci::media_type::MANIFEST_SCHEMA1_SIGNED;
    use imagestream_registry::registry::oci::Digest;
    use serde_json::json;
    use tempfile::TempDir;

    fn fs_registry(temp_dir: &TempDir) -> Registry {
        let config = format!(
            "[blob_store.fs]\nroot_dir = \"{}\"\n",
            temp_dir.path().display()
        );
        let config = Configuration::load_from_str(&config).unwrap();
        create_registry(&config).unwrap()
    }

    /// A pretty-JWS schema 1 manifest over `layers`, with the digest of its canonical form.
    fn schema1_manifest(layers: &[Digest]) -> (Vec<u8>, Digest) {
        let manifest = json!({
            "schemaVersion": 1,
            "name": "ns/app",
            "tag": "latest",
            "architecture": "amd64",
            "fsLayers": layers
                .iter()
                .map(|layer| json!({ "blobSum": layer.to_string() }))
                .collect::<Vec<_>>(),
            "history": layers
                .iter()
                .map(|_| json!({ "v1Compatibility": "{}" }))
                .collect::<Vec<_>>(),
        });
        let canonical = serde_json::to_vec_pretty(&manifest).unwrap();
        let format_length = canonical.len() - 2;

        let protected = json!({
            "formatLength": format_length,
            "formatTail": URL_SAFE_NO_PAD.encode("\n}"),
        });
        let signature = json!({
            "header": { "alg": "ES256" },
            "signature": "c2lnbmF0dXJl",
            "protected": URL_SAFE_NO_PAD.encode(protected.to_string()),
        });

        let mut signed = canonical[..format_length].to_vec();
        signed.extend_from_slice(b",\n   \"signatures\": ");
        signed.extend(serde_json::to_vec(&[signature]).unwrap());
        signed.extend_from_slice(b"\n}");

        (signed, Digest::sha256(&canonical))
    }

    async fn store_schema1_image(registry: &Registry, layers: &[Digest]) -> Digest {
        let (manifest, digest) = schema1_manifest(layers);
        let image = Image {
            metadata: ObjectMeta {
                name: digest.to_string(),
                ..ObjectMeta::default()
            },
            docker_image_manifest: String::from_utf8(manifest).unwrap(),
            docker_image_manifest_media_type: MANIFEST_SCHEMA1_SIGNED.to_string(),
            ..Image::default()
        };

        registry
            .image_store()
            .create_mapping(ImageStreamMapping {
                metadata: ObjectMeta {
                    namespace: "ns".to_string(),
                    name: "app".to_string(),
                    ..ObjectMeta::default()
                },
                tag: "latest".to_string(),
                image,
            })
            .await
            .unwrap();
        digest
    }

    fn options(digest: &Digest, skip_dependency_verification: bool) -> Options {
        Options {
            digest: digest.to_string(),
            skip_dependency_verification,
        }
    }

    #[tokio::test]
    async fn test_report() {
        let temp_dir = TempDir::new().unwrap();
        let registry = fs_registry(&temp_dir);
        let layer = registry.blob_store().create_blob(b"layer").await.unwrap();
        let digest = store_schema1_image(&registry, &[layer.clone()]).await;

        let (report, verification) = Command::new(registry)
            .report(&options(&digest, false))
            .await
            .unwrap();

        assert_eq!(verification, Ok(()));
        assert_eq!(report.digest, digest.to_string());
        assert_eq!(report.config_size, Some(0));
        assert_eq!(report.layer_order.as_deref(), Some("descending"));
        assert_eq!(report.layers.len(), 1);
        assert_eq!(report.layers[0].name, layer.to_string());
        assert_eq!(report.layers[0].size, 5);
        assert_eq!(report.verification, "ok");
    }

    #[tokio::test]
    async fn test_report_missing_layer() {
        let temp_dir = TempDir::new().unwrap();
        let registry = fs_registry(&temp_dir);
        let layer = Digest::sha256(b"layer");
        let digest = store_schema1_image(&registry, &[layer.clone()]).await;
        let command = Command::new(registry);

        let (report, verification) = command.report(&options(&digest, false)).await.unwrap();
        assert_eq!(
            verification,
            Err(registry::Error::MissingDependency(layer.clone()))
        );
        assert_eq!(report.verification, verification.unwrap_err().to_string());
        assert_eq!(report.config_size, None);
        assert!(report.layers.is_empty());

        assert!(matches!(
            command.run(&options(&digest, false)).await,
            Err(Error::Registry(registry::Error::MissingDependency(_)))
        ));
    }

    #[tokio::test]
    async fn test_report_missing_layer_unverified() {
        let temp_dir = TempDir::new().unwrap();
        let registry = fs_registry(&temp_dir);
        let digest = store_schema1_image(&registry, &[Digest::sha256(b"layer")]).await;

        let result = Command::new(registry).report(&options(&digest, true)).await;
        assert!(matches!(
            result,
            Err(Error::Registry(registry::Error::BlobStore(_)))
        ));
    }
}
