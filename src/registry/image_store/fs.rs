use crate::registry::data_store;
use crate::registry::image_store::{
    split_image_stream_tag, Error, Image, ImageStore, ImageStream, ImageStreamMapping,
    NamedTagEventList, TagEvent,
};
use crate::registry::oci::Digest;
use async_trait::async_trait;
use chrono::Utc;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::fmt::{Debug, Formatter};
use std::sync::LazyLock;
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

static NAMESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9]+(?:[._-][a-z0-9]+)*$").unwrap());

static IMAGE_STREAM_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9]+(?:[._-][a-z0-9]+)*(?:/[a-z0-9]+(?:[._-][a-z0-9]+)*)*$").unwrap()
});

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct BackendConfig {
    pub root_dir: String,
    #[serde(default)]
    pub sync_to_disk: bool,
    #[serde(default)]
    pub max_images_per_stream: Option<usize>,
}

impl From<&BackendConfig> for data_store::fs::BackendConfig {
    fn from(config: &BackendConfig) -> Self {
        Self {
            root_dir: config.root_dir.clone(),
            sync_to_disk: config.sync_to_disk,
        }
    }
}

/// Image records and image streams stored as JSON documents on the local filesystem.
pub struct Backend {
    store: data_store::fs::Backend,
    max_images_per_stream: Option<usize>,
    write_lock: Mutex<()>,
}

impl Debug for Backend {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("FSBackend").finish()
    }
}

impl Backend {
    pub fn new(config: &BackendConfig) -> Self {
        Self {
            store: data_store::fs::Backend::new(&config.into()),
            max_images_per_stream: config.max_images_per_stream,
            write_lock: Mutex::new(()),
        }
    }

    fn image_path(digest: &Digest) -> String {
        format!("images/{}/{}.json", digest.algorithm(), digest.hash())
    }

    fn image_stream_path(namespace: &str, name: &str) -> Result<String, Error> {
        if !NAMESPACE_RE.is_match(namespace) {
            return Err(Error::Invalid(format!("invalid namespace '{namespace}'")));
        }
        if !IMAGE_STREAM_NAME_RE.is_match(name) {
            return Err(Error::Invalid(format!("invalid image stream name '{name}'")));
        }
        Ok(format!("streams/{namespace}/{name}.json"))
    }

    fn new_resource_version() -> String {
        Uuid::new_v4().to_string()
    }

    async fn read_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        let content = self.store.read(path).await.map_err(|e| match Error::from(e) {
            Error::NotFound(_) => Error::NotFound(path.to_string()),
            e => e,
        })?;
        Ok(serde_json::from_slice(&content)?)
    }

    async fn write_json<T: Serialize>(&self, path: &str, value: &T) -> Result<(), Error> {
        let content = serde_json::to_vec_pretty(value)?;
        self.store.write(path, &content).await?;
        Ok(())
    }

    async fn read_image_stream_or_default(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<ImageStream, Error> {
        match self.get_image_stream(namespace, name).await {
            Ok(stream) => Ok(stream),
            Err(Error::NotFound(_)) => Ok(ImageStream::new(namespace, name)),
            Err(e) => Err(e),
        }
    }

    /// Writes `stream` unless someone else updated it since `read_version` was observed.
    async fn write_image_stream(
        &self,
        mut stream: ImageStream,
        read_version: &str,
    ) -> Result<(), Error> {
        let namespace = stream.metadata.namespace.clone();
        let name = stream.metadata.name.clone();

        let current = self.read_image_stream_or_default(&namespace, &name).await?;
        if current.metadata.resource_version != read_version {
            warn!("Image stream {namespace}/{name} was modified concurrently");
            return Err(Error::Conflict(format!(
                "the image stream {namespace}/{name} has been modified; please apply your changes to the latest version"
            )));
        }

        stream.metadata.resource_version = Self::new_resource_version();
        self.write_json(&Self::image_stream_path(&namespace, &name)?, &stream)
            .await
    }

    /// Stores an image record as-is, replacing any previous record with the same digest.
    #[instrument(skip(self, image), fields(image = %image.metadata.name))]
    pub async fn put_image(&self, image: &Image) -> Result<Digest, Error> {
        let digest = Digest::try_from(image.metadata.name.as_str())
            .map_err(|e| Error::Invalid(e.to_string()))?;

        let mut image = image.clone();
        image.set_resource_version(&Self::new_resource_version());
        self.write_json(&Self::image_path(&digest), &image).await?;

        Ok(digest)
    }

    fn check_quota(&self, stream: &ImageStream, image: &str) -> Result<(), Error> {
        let Some(max_images) = self.max_images_per_stream else {
            return Ok(());
        };

        let images: HashSet<&str> = stream
            .status
            .tags
            .iter()
            .flat_map(|history| history.items.iter().map(|event| event.image.as_str()))
            .collect();

        if !images.contains(image) && images.len() >= max_images {
            return Err(Error::QuotaExceeded(format!(
                "exceeded quota: images per stream limited to {max_images}"
            )));
        }

        Ok(())
    }
}

#[async_trait]
impl ImageStore for Backend {
    #[instrument(skip(self))]
    async fn get_image_stream(&self, namespace: &str, name: &str) -> Result<ImageStream, Error> {
        self.read_json(&Self::image_stream_path(namespace, name)?)
            .await
    }

    #[instrument(skip(self))]
    async fn get_image(&self, digest: &Digest) -> Result<Image, Error> {
        self.read_json(&Self::image_path(digest)).await
    }

    #[instrument(skip(self, mapping), fields(stream = %mapping.metadata.name, tag = %mapping.tag))]
    async fn create_mapping(&self, mapping: ImageStreamMapping) -> Result<(), Error> {
        if !mapping.image.metadata.resource_version.is_empty() {
            return Err(Error::Invalid(
                "resourceVersion should not be set on objects to be created".to_string(),
            ));
        }

        let digest = Digest::try_from(mapping.image.metadata.name.as_str())
            .map_err(|e| Error::Invalid(e.to_string()))?;

        let namespace = &mapping.metadata.namespace;
        let name = &mapping.metadata.name;
        Self::image_stream_path(namespace, name)?;

        let _guard = self.write_lock.lock().await;

        let mut stream = self.read_image_stream_or_default(namespace, name).await?;
        let read_version = stream.metadata.resource_version.clone();

        self.check_quota(&stream, &mapping.image.metadata.name)?;

        match self.get_image(&digest).await {
            Ok(_) => debug!("Image {digest} already stored"),
            Err(Error::NotFound(_)) => {
                self.put_image(&mapping.image).await?;
            }
            Err(e) => return Err(e),
        }

        let event = TagEvent {
            created: Utc::now(),
            docker_image_reference: mapping.image.docker_image_reference.clone(),
            image: mapping.image.metadata.name.clone(),
            generation: stream.generation() + 1,
        };

        match stream
            .status
            .tags
            .iter_mut()
            .find(|history| history.tag == mapping.tag)
        {
            Some(history) => history.items.insert(0, event),
            None => stream.status.tags.push(NamedTagEventList {
                tag: mapping.tag.clone(),
                items: vec![event],
            }),
        }

        self.write_image_stream(stream, &read_version).await
    }

    #[instrument(skip(self))]
    async fn delete_tag(&self, namespace: &str, stream_tag: &str) -> Result<(), Error> {
        let (name, tag) = split_image_stream_tag(stream_tag).ok_or_else(|| {
            Error::Invalid(format!("'{stream_tag}' is not a valid image stream tag name"))
        })?;

        let _guard = self.write_lock.lock().await;

        let mut stream = self.get_image_stream(namespace, name).await?;
        let read_version = stream.metadata.resource_version.clone();

        let Some(position) = stream
            .status
            .tags
            .iter()
            .position(|history| history.tag == tag)
        else {
            return Err(Error::NotFound(format!("imagestreamtag {stream_tag}")));
        };
        stream.status.tags.remove(position);

        self.write_image_stream(stream, &read_version).await
    }
}
