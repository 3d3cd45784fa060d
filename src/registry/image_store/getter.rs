use crate::registry::image_store::{
    Error, ImageStore, ImageStream, ImageStreamGetter, ImageStreamReference,
};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, instrument};

/// Fetches the image stream at most once and serves the same snapshot afterwards.
///
/// Meant to live for a single request: a failed fetch is not remembered, so the
/// next call tries again.
pub struct CachedImageStreamGetter {
    store: Arc<dyn ImageStore>,
    reference: ImageStreamReference,
    cached: OnceCell<ImageStream>,
}

impl CachedImageStreamGetter {
    pub fn new(store: Arc<dyn ImageStore>, reference: ImageStreamReference) -> Self {
        Self {
            store,
            reference,
            cached: OnceCell::new(),
        }
    }
}

#[async_trait]
impl ImageStreamGetter for CachedImageStreamGetter {
    #[instrument(skip(self), fields(stream = %self.reference))]
    async fn get(&self) -> Result<ImageStream, Error> {
        let store = &self.store;
        let reference = &self.reference;

        let stream = self
            .cached
            .get_or_try_init(|| async move {
                debug!("Fetching image stream {reference}");
                store
                    .get_image_stream(&reference.namespace, &reference.name)
                    .await
            })
            .await?;

        Ok(stream.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::image_store::MockImageStore;
    use mockall::predicate::eq;

    #[tokio::test]
    async fn test_get_fetches_once() {
        let mut store = MockImageStore::new();
        store
            .expect_get_image_stream()
            .with(eq("ns"), eq("app"))
            .times(1)
            .returning(|namespace, name| Ok(ImageStream::new(namespace, name)));

        let getter =
            CachedImageStreamGetter::new(Arc::new(store), ImageStreamReference::new("ns", "app"));

        let first = getter.get().await.unwrap();
        let second = getter.get().await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.metadata.name, "app");
    }

    #[tokio::test]
    async fn test_get_does_not_cache_errors() {
        let mut store = MockImageStore::new();
        let mut sequence = mockall::Sequence::new();
        store
            .expect_get_image_stream()
            .times(1)
            .in_sequence(&mut sequence)
            .returning(|_, _| Err(Error::Backend("unavailable".to_string())));
        store
            .expect_get_image_stream()
            .times(1)
            .in_sequence(&mut sequence)
            .returning(|namespace, name| Ok(ImageStream::new(namespace, name)));

        let getter =
            CachedImageStreamGetter::new(Arc::new(store), ImageStreamReference::new("ns", "app"));

        assert!(getter.get().await.is_err());
        assert!(getter.get().await.is_ok());
    }
}
