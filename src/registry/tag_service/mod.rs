use crate::registry::image_store::{
    self, join_image_stream_tag, ImageStore, ImageStream, ImageStreamGetter, ImageStreamMapping,
    ImageStreamReference, ObjectMeta, TagEvent,
};
use crate::registry::managed::is_image_managed;
use crate::registry::oci::Digest;
use crate::registry::Error;
use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use tracing::{debug, error, instrument};

/// The result of resolving a tag. Only the digest is known; the manifest is fetched separately.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TagDescriptor {
    pub digest: Digest,
}

/// Why a tag was kept or left out of a listing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TagOutcome {
    Included,
    NoHistory,
    DigestMismatch,
    Unparseable,
    Unavailable,
    Unmanaged,
}

impl Display for TagOutcome {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let outcome = match self {
            TagOutcome::Included => "included",
            TagOutcome::NoHistory => "no-history",
            TagOutcome::DigestMismatch => "digest-mismatch",
            TagOutcome::Unparseable => "unparseable",
            TagOutcome::Unavailable => "unavailable",
            TagOutcome::Unmanaged => "unmanaged",
        };
        write!(f, "{outcome}")
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TagEvaluation {
    pub tag: String,
    pub outcome: TagOutcome,
}

/// Managed flags of the images seen during one listing.
#[derive(Default)]
struct EligibilityCache {
    managed: HashMap<Digest, bool>,
}

impl EligibilityCache {
    async fn is_managed(
        &mut self,
        images: &dyn ImageStore,
        digest: &Digest,
    ) -> Result<bool, image_store::Error> {
        if let Some(managed) = self.managed.get(digest) {
            return Ok(*managed);
        }

        let image = images.get_image(digest).await?;
        let managed = is_image_managed(&image);
        self.managed.insert(digest.clone(), managed);
        Ok(managed)
    }
}

fn parse_digest(s: &str) -> Result<Digest, Error> {
    Digest::try_from(s).map_err(|e| Error::DigestInvalid(e.to_string()))
}

/// Registry tag operations over the tag histories of one image stream.
///
/// Without pull-through, only images carrying the managed annotation are visible.
/// Tags pointing at other images are reported as unknown rather than forbidden.
pub struct TagService {
    reference: ImageStreamReference,
    getter: Arc<dyn ImageStreamGetter>,
    images: Arc<dyn ImageStore>,
    pullthrough_enabled: bool,
}

impl TagService {
    pub fn new(
        reference: ImageStreamReference,
        getter: Arc<dyn ImageStreamGetter>,
        images: Arc<dyn ImageStore>,
        pullthrough_enabled: bool,
    ) -> Self {
        Self {
            reference,
            getter,
            images,
            pullthrough_enabled,
        }
    }

    async fn image_stream(&self) -> Result<ImageStream, Error> {
        self.getter.get().await.map_err(|e| {
            error!("Error retrieving image stream {}: {e}", self.reference);
            Error::RepositoryUnknown(self.reference.to_string())
        })
    }

    /// Fails with [`Error::TagUnknown`] when the image behind `digest` is not managed.
    async fn require_managed(&self, tag: &str, digest: &Digest) -> Result<(), Error> {
        let image = self.images.get_image(digest).await?;
        if !is_image_managed(&image) {
            debug!("Hiding tag {tag}: image {digest} is not managed");
            return Err(Error::TagUnknown(tag.to_string()));
        }
        Ok(())
    }

    #[instrument(skip(self), fields(stream = %self.reference))]
    pub async fn get(&self, tag: &str) -> Result<TagDescriptor, Error> {
        let stream = self.image_stream().await?;

        let event = stream
            .latest_tagged_image(tag)
            .ok_or_else(|| Error::TagUnknown(tag.to_string()))?;
        let digest = parse_digest(&event.image)?;

        if !self.pullthrough_enabled {
            self.require_managed(tag, &digest).await?;
        }

        Ok(TagDescriptor { digest })
    }

    #[instrument(skip(self), fields(stream = %self.reference))]
    pub async fn all(&self) -> Result<Vec<String>, Error> {
        let evaluations = self.evaluate_tags(None).await?;
        Ok(included_tags(evaluations))
    }

    #[instrument(skip(self), fields(stream = %self.reference, digest = %descriptor.digest))]
    pub async fn lookup(&self, descriptor: &TagDescriptor) -> Result<Vec<String>, Error> {
        let evaluations = self.evaluate_tags(Some(&descriptor.digest)).await?;
        Ok(included_tags(evaluations))
    }

    /// Evaluates the newest entry of every tag of the stream, in stream order.
    ///
    /// With a `filter`, entries pointing at another digest are left out before
    /// their images are looked at. Unparseable or unavailable entries are logged
    /// and left out; they never fail the listing.
    pub async fn evaluate_tags(
        &self,
        filter: Option<&Digest>,
    ) -> Result<Vec<TagEvaluation>, Error> {
        let stream = self.image_stream().await?;
        let mut eligibility = EligibilityCache::default();
        let mut evaluations = Vec::with_capacity(stream.status.tags.len());

        for history in &stream.status.tags {
            let outcome = match history.items.first() {
                Some(event) => self.evaluate_event(event, filter, &mut eligibility).await,
                None => TagOutcome::NoHistory,
            };

            evaluations.push(TagEvaluation {
                tag: history.tag.clone(),
                outcome,
            });
        }

        Ok(evaluations)
    }

    async fn evaluate_event(
        &self,
        event: &TagEvent,
        filter: Option<&Digest>,
        eligibility: &mut EligibilityCache,
    ) -> TagOutcome {
        if self.pullthrough_enabled && filter.is_none() {
            return TagOutcome::Included;
        }

        let digest = match Digest::try_from(event.image.as_str()) {
            Ok(digest) => digest,
            Err(e) => {
                error!("Bad digest {}: {e}", event.image);
                return TagOutcome::Unparseable;
            }
        };

        if let Some(expected) = filter {
            if &digest != expected {
                return TagOutcome::DigestMismatch;
            }
        }

        if self.pullthrough_enabled {
            return TagOutcome::Included;
        }

        match eligibility.is_managed(self.images.as_ref(), &digest).await {
            Ok(true) => TagOutcome::Included,
            Ok(false) => TagOutcome::Unmanaged,
            Err(e) => {
                error!("Unable to get image {} {digest}: {e}", self.reference);
                TagOutcome::Unavailable
            }
        }
    }

    /// Points `tag` at the image behind `descriptor`.
    ///
    /// A quota rejection from the store is reported as [`Error::AccessDenied`].
    #[instrument(skip(self), fields(stream = %self.reference, digest = %descriptor.digest))]
    pub async fn tag(&self, tag: &str, descriptor: &TagDescriptor) -> Result<(), Error> {
        let stream = self.image_stream().await?;

        let mut image = self
            .images
            .get_image(&descriptor.digest)
            .await
            .inspect_err(|e| error!("Unable to get image {}: {e}", descriptor.digest))?;
        image.set_resource_version("");

        if !self.pullthrough_enabled && !is_image_managed(&image) {
            return Err(Error::RepositoryUnknown(self.reference.to_string()));
        }

        let mapping = ImageStreamMapping {
            metadata: ObjectMeta {
                namespace: stream.metadata.namespace,
                name: stream.metadata.name,
                ..ObjectMeta::default()
            },
            tag: tag.to_string(),
            image,
        };

        match self.images.create_mapping(mapping).await {
            Err(e) if e.is_quota_exceeded() => {
                error!("Denied creating image stream mapping: {e}");
                Err(Error::AccessDenied)
            }
            result => Ok(result?),
        }
    }

    #[instrument(skip(self), fields(stream = %self.reference))]
    pub async fn untag(&self, tag: &str) -> Result<(), Error> {
        let stream = self.image_stream().await?;

        let event = stream
            .latest_tagged_image(tag)
            .ok_or_else(|| Error::TagUnknown(tag.to_string()))?;

        if !self.pullthrough_enabled {
            let digest = parse_digest(&event.image)?;
            self.require_managed(tag, &digest).await?;
        }

        let stream_tag = join_image_stream_tag(&stream.metadata.name, tag);
        Ok(self
            .images
            .delete_tag(&stream.metadata.namespace, &stream_tag)
            .await?)
    }
}

fn included_tags(evaluations: Vec<TagEvaluation>) -> Vec<String> {
    evaluations
        .into_iter()
        .filter(|evaluation| evaluation.outcome == TagOutcome::Included)
        .map(|evaluation| evaluation.tag)
        .collect()
}
