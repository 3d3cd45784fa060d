use crate::registry::oci::media_type::{
    MANIFEST_SCHEMA1, MANIFEST_SCHEMA1_SIGNED, MANIFEST_SCHEMA2,
};
use crate::registry::oci::{DeserializedManifest, Digest, Error, SignedManifest};
use serde::Deserialize;
use tracing::debug;

/// A decoded manifest. The set of variants is closed: schema 1 and schema 2 have
/// handlers, everything else (manifest lists, OCI types) is carried as-is.
#[derive(Clone, Debug, PartialEq)]
pub enum Manifest {
    Schema1(SignedManifest),
    Schema2(DeserializedManifest),
    Unhandled { media_type: String, payload: Vec<u8> },
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Versioned {
    schema_version: i32,
    #[serde(default)]
    media_type: Option<String>,
}

impl Manifest {
    /// Decodes a manifest received over the wire, using the declared content type
    /// when there is one and the document's own version fields otherwise.
    pub fn from_payload(media_type: Option<&str>, payload: &[u8]) -> Result<Self, Error> {
        match media_type.unwrap_or_default() {
            MANIFEST_SCHEMA1 | MANIFEST_SCHEMA1_SIGNED => {
                Ok(Manifest::Schema1(SignedManifest::from_slice(payload)?))
            }
            MANIFEST_SCHEMA2 => Ok(Manifest::Schema2(DeserializedManifest::from_slice(payload)?)),
            "" => Self::from_untyped_payload(payload),
            media_type => Ok(Manifest::Unhandled {
                media_type: media_type.to_string(),
                payload: payload.to_vec(),
            }),
        }
    }

    fn from_untyped_payload(payload: &[u8]) -> Result<Self, Error> {
        let versioned: Versioned = serde_json::from_slice(payload)?;
        debug!(
            "Detecting manifest type: schemaVersion={}, mediaType={:?}",
            versioned.schema_version, versioned.media_type
        );

        match (versioned.schema_version, versioned.media_type.as_deref()) {
            (1, _) => Ok(Manifest::Schema1(SignedManifest::from_slice(payload)?)),
            (2, None | Some(MANIFEST_SCHEMA2)) => {
                Ok(Manifest::Schema2(DeserializedManifest::from_slice(payload)?))
            }
            (_, media_type) => Ok(Manifest::Unhandled {
                media_type: media_type.unwrap_or_default().to_string(),
                payload: payload.to_vec(),
            }),
        }
    }

    pub fn media_type(&self) -> &str {
        match self {
            Manifest::Schema1(_) => MANIFEST_SCHEMA1_SIGNED,
            Manifest::Schema2(_) => MANIFEST_SCHEMA2,
            Manifest::Unhandled { media_type, .. } => media_type,
        }
    }

    pub fn digest(&self) -> Digest {
        match self {
            Manifest::Schema1(manifest) => manifest.digest(),
            Manifest::Schema2(manifest) => manifest.digest(),
            Manifest::Unhandled { payload, .. } => Digest::sha256(payload),
        }
    }
}
