use crate::registry::image_store::Image;

/// Set on images the registry imported or received through a push.
pub const MANAGED_IMAGE_ANNOTATION: &str = "openshift.io/image.managed";

/// Whether tag operations may expose `image` when pull-through is disabled.
pub fn is_image_managed(image: &Image) -> bool {
    image
        .metadata
        .annotations
        .get(MANAGED_IMAGE_ANNOTATION)
        .is_some_and(|value| value == "true")
}
