use crate::registry::oci::media_type::MANIFEST_SCHEMA2;
use crate::registry::oci::{Descriptor, Digest, Error};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ManifestV2 {
    pub schema_version: i32,
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    pub config: Descriptor,
    #[serde(default)]
    pub layers: Vec<Descriptor>,
}

/// A schema 2 manifest together with the exact bytes it was decoded from.
#[derive(Clone, Debug, PartialEq)]
pub struct DeserializedManifest {
    pub manifest: ManifestV2,
    canonical: Vec<u8>,
}

impl DeserializedManifest {
    pub fn from_slice(payload: &[u8]) -> Result<Self, Error> {
        let manifest: ManifestV2 = serde_json::from_slice(payload)?;

        if manifest.schema_version != 2 {
            return Err(Error::InvalidFormat(format!(
                "unexpected schema version {} for schema 2 manifest",
                manifest.schema_version
            )));
        }

        if let Some(media_type) = &manifest.media_type {
            if media_type != MANIFEST_SCHEMA2 {
                return Err(Error::InvalidFormat(format!(
                    "unexpected media type '{media_type}' for schema 2 manifest"
                )));
            }
        }

        Ok(Self {
            manifest,
            canonical: payload.to_vec(),
        })
    }

    pub fn canonical(&self) -> &[u8] {
        &self.canonical
    }

    pub fn digest(&self) -> Digest {
        Digest::sha256(&self.canonical)
    }

    /// Config first, then layers.
    pub fn references(&self) -> impl Iterator<Item = &Descriptor> {
        std::iter::once(&self.manifest.config).chain(self.manifest.layers.iter())
    }
}
