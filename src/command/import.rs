use crate::command::{parse_repository, Error};
use argh::FromArgs;
use imagestream_registry::registry;
use imagestream_registry::registry::image_store::{Image, ImageStreamMapping, ObjectMeta};
use imagestream_registry::registry::managed::MANAGED_IMAGE_ANNOTATION;
use imagestream_registry::registry::oci::Manifest;
use imagestream_registry::registry::Registry;
use tokio::fs;
use tracing::{debug, info};

#[derive(FromArgs, PartialEq, Debug)]
#[argh(
    subcommand,
    name = "import",
    description = "Store a manifest with its blobs and tag it"
)]
pub struct Options {
    #[argh(positional)]
    /// the image stream, as namespace/name
    pub repository: String,
    #[argh(positional)]
    /// the tag to point at the imported image
    pub tag: String,
    #[argh(positional)]
    /// path of the manifest file
    pub manifest: String,
    #[argh(option, short = 't')]
    /// media type of the manifest, detected from its content when omitted
    pub media_type: Option<String>,
    #[argh(option, short = 'b')]
    /// path of a blob to store first, may be repeated
    pub blob: Vec<String>,
    #[argh(option, short = 's')]
    /// path of a detached schema 1 signature, may be repeated
    pub signature: Vec<String>,
    #[argh(switch, short = 'm')]
    /// mark the image as managed by this registry
    pub managed: bool,
    #[argh(switch)]
    /// do not check that referenced blobs are present
    pub skip_dependency_verification: bool,
}

pub struct Command {
    registry: Registry,
}

impl Command {
    pub fn new(registry: Registry) -> Self {
        Self { registry }
    }

    pub async fn run(&self, options: &Options) -> Result<(), Error> {
        let (namespace, name) = parse_repository(&options.repository)?;

        for path in &options.blob {
            let content = fs::read(path).await?;
            let digest = self
                .registry
                .blob_store()
                .create_blob(&content)
                .await
                .map_err(registry::Error::from)?;
            debug!("Stored blob {path} as {digest}");
        }

        let payload = fs::read(&options.manifest).await?;
        let mut signatures = Vec::with_capacity(options.signature.len());
        for path in &options.signature {
            signatures.push(fs::read(path).await?);
        }

        let media_type = match &options.media_type {
            Some(media_type) => media_type.clone(),
            // Detached signatures are only found on untyped schema 1 records
            None if !signatures.is_empty() => String::new(),
            None => Manifest::from_payload(None, &payload)
                .map_err(registry::Error::from)?
                .media_type()
                .to_string(),
        };

        let mut image = Image {
            docker_image_manifest: String::from_utf8(payload)
                .map_err(|e| Error::InvalidArgument(format!("manifest is not UTF-8: {e}")))?,
            docker_image_manifest_media_type: media_type,
            docker_image_signatures: signatures,
            ..Image::default()
        };

        let manifest = self.registry.manifest_from_image(&image)?;
        let handler = self.registry.manifest_handler(manifest)?;
        handler.verify(options.skip_dependency_verification).await?;

        let digest = handler.digest();
        image.metadata.name = digest.to_string();
        image.docker_image_reference = format!("{namespace}/{name}@{digest}");
        if options.managed {
            image
                .metadata
                .annotations
                .insert(MANAGED_IMAGE_ANNOTATION.to_string(), "true".to_string());
        }

        let mapping = ImageStreamMapping {
            metadata: ObjectMeta {
                namespace: namespace.to_string(),
                name: name.to_string(),
                ..ObjectMeta::default()
            },
            tag: options.tag.clone(),
            image,
        };
        self.registry
            .image_store()
            .create_mapping(mapping)
            .await
            .map_err(registry::Error::from)?;

        info!("Imported {digest} as {namespace}/{name}:{}", options.tag);
        println!("{digest}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use imagestream_registry::configuration::registry::create_registry;
    use imagestream_registry::configuration::Configuration;
    use imagestream_registry::registry::oci::Digest;
    use serde_json::json;
    use tempfile::TempDir;

    struct Fixture {
        temp_dir: TempDir,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                temp_dir: TempDir::new().unwrap(),
            }
        }

        fn registry(&self) -> Registry {
            let config = format!(
                "[blob_store.fs]\nroot_dir = \"{}\"\n",
                self.temp_dir.path().join("store").display()
            );
            let config = Configuration::load_from_str(&config).unwrap();
            create_registry(&config).unwrap()
        }

        fn write(&self, name: &str, content: &[u8]) -> String {
            let path = self.temp_dir.path().join(name);
            std::fs::write(&path, content).unwrap();
            path.to_string_lossy().to_string()
        }

        fn schema2_manifest(&self, config: &[u8], layer: &[u8]) -> Vec<u8> {
            let manifest = json!({
                "schemaVersion": 2,
                "mediaType": "application/vnd.docker.distribution.manifest.v2+json",
                "config": {
                    "mediaType": "application/vnd.docker.container.image.v1+json",
                    "digest": Digest::sha256(config).to_string(),
                    "size": config.len(),
                },
                "layers": [{
                    "mediaType": "application/vnd.docker.image.rootfs.diff.tar.gzip",
                    "digest": Digest::sha256(layer).to_string(),
                    "size": layer.len(),
                }],
            });
            serde_json::to_vec_pretty(&manifest).unwrap()
        }

        fn options(&self, manifest: &[u8], blob: Vec<String>, managed: bool) -> Options {
            Options {
                repository: "ns/app".to_string(),
                tag: "latest".to_string(),
                manifest: self.write("manifest.json", manifest),
                media_type: None,
                blob,
                signature: Vec::new(),
                managed,
                skip_dependency_verification: false,
            }
        }
    }

    #[tokio::test]
    async fn test_import_managed() {
        let fixture = Fixture::new();
        let manifest = fixture.schema2_manifest(b"{}", b"layer");
        let blobs = vec![fixture.write("config", b"{}"), fixture.write("layer", b"layer")];

        let options = fixture.options(&manifest, blobs, true);
        Command::new(fixture.registry()).run(&options).await.unwrap();

        let descriptor = fixture
            .registry()
            .tag_service("ns", "app")
            .get("latest")
            .await
            .unwrap();
        assert_eq!(descriptor.digest, Digest::sha256(&manifest));
    }

    #[tokio::test]
    async fn test_import_unmanaged_is_hidden() {
        let fixture = Fixture::new();
        let manifest = fixture.schema2_manifest(b"{}", b"layer");
        let blobs = vec![fixture.write("config", b"{}"), fixture.write("layer", b"layer")];

        let options = fixture.options(&manifest, blobs, false);
        Command::new(fixture.registry()).run(&options).await.unwrap();

        let tags = fixture.registry().tag_service("ns", "app").all().await;
        assert_eq!(tags, Ok(Vec::new()));
    }

    #[tokio::test]
    async fn test_import_missing_blob() {
        let fixture = Fixture::new();
        let manifest = fixture.schema2_manifest(b"{}", b"layer");
        let blobs = vec![fixture.write("config", b"{}")];

        let options = fixture.options(&manifest, blobs, true);
        let result = Command::new(fixture.registry()).run(&options).await;

        assert!(matches!(
            result,
            Err(Error::Registry(registry::Error::MissingDependency(_)))
        ));
    }
}
