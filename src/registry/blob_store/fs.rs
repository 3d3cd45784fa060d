use crate::registry::blob_store::{BlobStore, Error};
use crate::registry::data_store;
use crate::registry::oci::Digest;
use async_trait::async_trait;
use std::fmt;
use std::fmt::{Debug, Formatter};
use tracing::instrument;

pub use data_store::fs::BackendConfig;

#[derive(Clone)]
pub struct Backend {
    store: data_store::fs::Backend,
}

impl Debug for Backend {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("FSBackend").finish()
    }
}

impl Backend {
    pub fn new(config: &BackendConfig) -> Self {
        Self {
            store: data_store::fs::Backend::new(config),
        }
    }

    fn blob_path(digest: &Digest) -> String {
        format!(
            "blobs/{}/{}/{}/data",
            digest.algorithm(),
            digest.hash_prefix(),
            digest.hash()
        )
    }
}

#[async_trait]
impl BlobStore for Backend {
    #[instrument(skip(self, content))]
    async fn create_blob(&self, content: &[u8]) -> Result<Digest, Error> {
        let digest = Digest::sha256(content);
        self.store.write(&Self::blob_path(&digest), content).await?;
        Ok(digest)
    }

    #[instrument(skip(self))]
    async fn read_blob(&self, digest: &Digest) -> Result<Vec<u8>, Error> {
        Ok(self.store.read(&Self::blob_path(digest)).await?)
    }

    #[instrument(skip(self))]
    async fn get_blob_size(&self, digest: &Digest) -> Result<u64, Error> {
        Ok(self.store.file_size(&Self::blob_path(digest)).await?)
    }
}
