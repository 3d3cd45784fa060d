use crate::registry::oci::{Digest, Error};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FsLayer {
    pub blob_sum: Digest,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct History {
    #[serde(rename = "v1Compatibility")]
    pub v1_compatibility: String,
}

/// The unsigned body of a schema 1 manifest.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ManifestV1 {
    pub schema_version: i32,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub tag: String,
    #[serde(default)]
    pub architecture: String,
    #[serde(default)]
    pub fs_layers: Vec<FsLayer>,
    #[serde(default)]
    pub history: Vec<History>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct Signature {
    pub header: serde_json::Value,
    pub signature: String,
    pub protected: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProtectedHeader {
    format_length: usize,
    format_tail: String,
}

#[derive(Deserialize)]
struct SignedDocument {
    #[serde(flatten)]
    manifest: ManifestV1,
    #[serde(default)]
    signatures: Vec<Signature>,
}

fn decode_base64_url(s: &str) -> Result<Vec<u8>, Error> {
    Ok(URL_SAFE_NO_PAD.decode(s.trim_end_matches('='))?)
}

/// Signatures as laid out by the pretty-JWS writer: three-space indentation.
fn pretty_signatures(signatures: &[Signature]) -> Result<Vec<u8>, Error> {
    let mut buffer = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"   ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
    signatures.serialize(&mut serializer)?;
    Ok(buffer)
}

impl Signature {
    fn protected_header(&self) -> Result<ProtectedHeader, Error> {
        let header = decode_base64_url(&self.protected)?;
        Ok(serde_json::from_slice(&header)?)
    }

    /// Splits `document` at the recorded format length and appends the recorded tail.
    fn format(&self, document: &[u8]) -> Result<(Vec<u8>, Vec<u8>), Error> {
        let header = self.protected_header()?;
        if header.format_length > document.len() {
            return Err(Error::InvalidFormat(format!(
                "signature format length {} exceeds payload length {}",
                header.format_length,
                document.len()
            )));
        }

        let head = document[..header.format_length].to_vec();
        let tail = decode_base64_url(&header.format_tail)?;
        Ok((head, tail))
    }
}

/// A schema 1 manifest in its pretty-JWS form.
///
/// `all` holds the document as received, signatures included. `canonical` is the
/// signed payload the signatures were computed over, and the basis of the digest.
#[derive(Clone, Debug, PartialEq)]
pub struct SignedManifest {
    pub manifest: ManifestV1,
    pub signatures: Vec<Signature>,
    canonical: Vec<u8>,
    all: Vec<u8>,
}

impl SignedManifest {
    pub fn from_slice(all: &[u8]) -> Result<Self, Error> {
        let document: SignedDocument = serde_json::from_slice(all)?;

        let Some(signature) = document.signatures.first() else {
            return Err(Error::InvalidFormat(
                "schema 1 manifest is missing signatures".to_string(),
            ));
        };

        let (mut canonical, tail) = signature.format(all)?;
        canonical.extend_from_slice(&tail);
        serde_json::from_slice::<ManifestV1>(&canonical)?;

        Ok(Self {
            manifest: document.manifest,
            signatures: document.signatures,
            canonical,
            all: all.to_vec(),
        })
    }

    /// Rebuilds a signed manifest from a payload stored apart from its signatures.
    ///
    /// Signatures embedded in `content` take precedence over the detached ones.
    pub fn with_detached_signatures(content: &[u8], signatures: &[Vec<u8>]) -> Result<Self, Error> {
        let embedded_error = match Self::from_slice(content) {
            Ok(manifest) => return Ok(manifest),
            Err(e) => e,
        };

        let signatures = signatures
            .iter()
            .map(|signature| serde_json::from_slice::<Signature>(signature))
            .collect::<Result<Vec<_>, _>>()?;

        let Some(signature) = signatures.first() else {
            return Err(embedded_error);
        };

        let (mut all, tail) = signature.format(content)?;
        all.extend_from_slice(b",\n   \"signatures\": ");
        all.extend(pretty_signatures(&signatures)?);
        all.extend_from_slice(&tail);

        Self::from_slice(&all)
    }

    pub fn canonical(&self) -> &[u8] {
        &self.canonical
    }

    pub fn all(&self) -> &[u8] {
        &self.all
    }

    pub fn digest(&self) -> Digest {
        Digest::sha256(&self.canonical)
    }
}
