pub const MANIFEST_SCHEMA1: &str = "application/vnd.docker.distribution.manifest.v1+json";
pub const MANIFEST_SCHEMA1_SIGNED: &str = "application/vnd.docker.distribution.manifest.v1+prettyjws";
pub const MANIFEST_SCHEMA1_LAYER: &str = "application/vnd.docker.container.image.rootfs.diff+x-gtar";

pub const MANIFEST_SCHEMA2: &str = "application/vnd.docker.distribution.manifest.v2+json";
pub const MANIFEST_SCHEMA2_CONFIG: &str = "application/vnd.docker.container.image.v1+json";
pub const MANIFEST_SCHEMA2_LAYER: &str = "application/vnd.docker.image.rootfs.diff.tar.gzip";

/// Records written before media types were tracked carry an empty value.
pub fn is_schema1(media_type: &str) -> bool {
    matches!(
        media_type,
        "" | MANIFEST_SCHEMA1 | MANIFEST_SCHEMA1_SIGNED
    )
}
