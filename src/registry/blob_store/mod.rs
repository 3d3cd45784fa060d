mod error;
pub mod fs;

use crate::registry::oci::Digest;
use async_trait::async_trait;

pub use error::Error;

/// Content-addressed blob storage consumed by the manifest handlers.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn create_blob(&self, content: &[u8]) -> Result<Digest, Error>;

    async fn read_blob(&self, digest: &Digest) -> Result<Vec<u8>, Error>;

    async fn get_blob_size(&self, digest: &Digest) -> Result<u64, Error>;
}
