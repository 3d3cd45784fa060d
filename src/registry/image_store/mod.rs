mod error;
pub mod fs;
mod getter;
mod image;

use crate::registry::oci::Digest;
use async_trait::async_trait;

pub use error::Error;
pub use getter::CachedImageStreamGetter;
pub use image::{
    join_image_stream_tag, split_image_stream_tag, Image, ImageStream, ImageStreamMapping,
    ImageStreamReference, ImageStreamStatus, NamedTagEventList, ObjectMeta, TagEvent,
};

/// Read/write access to image records and image streams held by the metadata store.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ImageStore: Send + Sync {
    async fn get_image_stream(&self, namespace: &str, name: &str) -> Result<ImageStream, Error>;

    async fn get_image(&self, digest: &Digest) -> Result<Image, Error>;

    /// Records `mapping.image` as the newest entry of `mapping.tag`.
    ///
    /// Fails with [`Error::QuotaExceeded`] when the store refuses to grow the stream.
    async fn create_mapping(&self, mapping: ImageStreamMapping) -> Result<(), Error>;

    /// Removes a tag; `stream_tag` is the composite `name:tag` key.
    async fn delete_tag(&self, namespace: &str, stream_tag: &str) -> Result<(), Error>;
}

/// Source of the current snapshot of one image stream.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ImageStreamGetter: Send + Sync {
    async fn get(&self) -> Result<ImageStream, Error>;
}
