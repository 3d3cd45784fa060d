use crate::registry::oci::Error;
use regex::Regex;
use serde::de::Visitor;
use serde::{de, Deserialize, Deserializer, Serialize};
use sha2::{Digest as Sha256Digest, Sha256};
use std::fmt;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::sync::LazyLock;

static DIGEST_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<algorithm>[a-z0-9]+(?:[.+_-][a-z0-9]+)*):(?P<hash>[a-zA-Z0-9=_-]+)$").unwrap()
});

static SHA256_HASH_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[a-f0-9]{64}$").unwrap());

#[derive(Debug, Clone, Eq, Hash, PartialEq, Ord, PartialOrd)]
pub enum Digest {
    Sha256(String),
}

impl Digest {
    /// Computes the sha256 digest of `content`.
    pub fn sha256(content: &[u8]) -> Self {
        let hash = Sha256::digest(content);
        Digest::Sha256(hex::encode(hash.as_slice()))
    }

    pub fn algorithm(&self) -> &str {
        match self {
            Digest::Sha256(_) => "sha256",
        }
    }

    pub fn hash(&self) -> &str {
        match self {
            Digest::Sha256(s) => s,
        }
    }

    pub fn hash_prefix(&self) -> &str {
        match self {
            Digest::Sha256(s) => &s[0..2],
        }
    }
}

impl TryFrom<&str> for Digest {
    type Error = Error;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        let captures = DIGEST_RE
            .captures(s)
            .ok_or_else(|| Error::InvalidFormat(format!("invalid digest: '{s}'")))?;

        match &captures["algorithm"] {
            "sha256" if SHA256_HASH_RE.is_match(&captures["hash"]) => {
                Ok(Digest::Sha256(captures["hash"].to_string()))
            }
            "sha256" => Err(Error::InvalidFormat(format!(
                "invalid sha256 hash in digest: '{s}'"
            ))),
            algorithm => Err(Error::InvalidFormat(format!(
                "unsupported digest algorithm: '{algorithm}'"
            ))),
        }
    }
}

impl FromStr for Digest {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Digest::try_from(s)
    }
}

impl Display for Digest {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.algorithm(), self.hash())
    }
}

impl<'de> Deserialize<'de> for Digest {
    fn deserialize<D>(deserializer: D) -> Result<Digest, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct DigestVisitor;

        impl Visitor<'_> for DigestVisitor {
            type Value = Digest;

            fn expecting(&self, formatter: &mut Formatter) -> fmt::Result {
                formatter.write_str("a valid digest string")
            }

            fn visit_str<E>(self, value: &str) -> Result<Digest, E>
            where
                E: de::Error,
            {
                Digest::try_from(value).map_err(de::Error::custom)
            }
        }

        deserializer.deserialize_str(DigestVisitor)
    }
}

impl Serialize for Digest {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HELLO_WORLD_SHA256: &str =
        "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9";

    #[test]
    fn test_digest_from_str() {
        let digest = Digest::try_from(format!("sha256:{HELLO_WORLD_SHA256}").as_str()).unwrap();
        assert_eq!(digest.algorithm(), "sha256");
        assert_eq!(digest.hash(), HELLO_WORLD_SHA256);
        assert_eq!(digest.hash_prefix(), "b9");
    }

    #[test]
    fn test_digest_sha256() {
        let digest = Digest::sha256(b"hello world");
        assert_eq!(digest, Digest::Sha256(HELLO_WORLD_SHA256.to_string()));
        assert_eq!(digest.to_string(), format!("sha256:{HELLO_WORLD_SHA256}"));
    }

    #[test]
    fn test_digest_invalid() {
        assert!(Digest::try_from("").is_err());
        assert!(Digest::try_from("sha256").is_err());
        assert!(Digest::try_from("sha256:").is_err());
        assert!(Digest::try_from("sha256:abc").is_err());
        assert!(Digest::try_from("not a digest").is_err());
        assert!(Digest::try_from(format!("SHA256:{HELLO_WORLD_SHA256}").as_str()).is_err());
    }

    #[test]
    fn test_digest_unsupported_algorithm() {
        let err = Digest::from_str("md5:d41d8cd98f00b204e9800998ecf8427e").unwrap_err();
        assert_eq!(
            err,
            Error::InvalidFormat("unsupported digest algorithm: 'md5'".to_string())
        );
    }

    #[test]
    fn test_digest_serde() {
        let digest = Digest::sha256(b"hello world");
        let json = serde_json::to_string(&digest).unwrap();
        assert_eq!(json, format!("\"sha256:{HELLO_WORLD_SHA256}\""));

        let parsed: Digest = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, digest);

        assert!(serde_json::from_str::<Digest>("\"sha256:nope\"").is_err());
    }
}
