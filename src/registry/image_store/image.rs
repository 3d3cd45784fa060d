use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

const DEFAULT_TAG: &str = "latest";

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    #[serde(default)]
    #[serde(skip_serializing_if = "String::is_empty")]
    pub namespace: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    #[serde(skip_serializing_if = "String::is_empty")]
    pub resource_version: String,
    #[serde(default)]
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

/// An image record, keyed by the digest of the manifest it holds.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub docker_image_reference: String,
    #[serde(default)]
    pub docker_image_manifest: String,
    #[serde(default)]
    pub docker_image_manifest_media_type: String,
    #[serde(default, with = "base64_list")]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub docker_image_signatures: Vec<Vec<u8>>,
}

impl Image {
    pub fn set_resource_version(&mut self, resource_version: &str) {
        self.metadata.resource_version = resource_version.to_string();
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TagEvent {
    pub created: DateTime<Utc>,
    #[serde(default)]
    pub docker_image_reference: String,
    pub image: String,
    #[serde(default)]
    pub generation: i64,
}

/// The history of a single tag, newest event first.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct NamedTagEventList {
    pub tag: String,
    #[serde(default)]
    pub items: Vec<TagEvent>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct ImageStreamStatus {
    #[serde(default)]
    pub tags: Vec<NamedTagEventList>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct ImageStream {
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub status: ImageStreamStatus,
}

impl ImageStream {
    pub fn new(namespace: &str, name: &str) -> Self {
        Self {
            metadata: ObjectMeta {
                namespace: namespace.to_string(),
                name: name.to_string(),
                ..ObjectMeta::default()
            },
            status: ImageStreamStatus::default(),
        }
    }

    /// The highest generation recorded in the tag history, 0 for an empty stream.
    pub fn generation(&self) -> i64 {
        self.status
            .tags
            .iter()
            .flat_map(|history| history.items.iter().map(|event| event.generation))
            .max()
            .unwrap_or(0)
    }

    /// Returns the newest history entry of `tag`; an empty tag means `latest`.
    pub fn latest_tagged_image(&self, tag: &str) -> Option<&TagEvent> {
        let tag = if tag.is_empty() { DEFAULT_TAG } else { tag };

        self.status
            .tags
            .iter()
            .find(|history| history.tag == tag)
            .and_then(|history| history.items.first())
    }
}

/// The body of a tag creation request.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct ImageStreamMapping {
    pub metadata: ObjectMeta,
    pub tag: String,
    pub image: Image,
}

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct ImageStreamReference {
    pub namespace: String,
    pub name: String,
}

impl ImageStreamReference {
    pub fn new(namespace: &str, name: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            name: name.to_string(),
        }
    }
}

impl Display for ImageStreamReference {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

pub fn join_image_stream_tag(name: &str, tag: &str) -> String {
    format!("{name}:{tag}")
}

pub fn split_image_stream_tag(stream_tag: &str) -> Option<(&str, &str)> {
    stream_tag
        .rsplit_once(':')
        .filter(|(name, tag)| !name.is_empty() && !tag.is_empty())
}

mod base64_list {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    #[allow(clippy::ptr_arg)]
    pub fn serialize<S>(items: &Vec<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_seq(items.iter().map(|item| STANDARD.encode(item)))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<Vec<u8>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Vec::<String>::deserialize(deserializer)?
            .iter()
            .map(|item| STANDARD.decode(item).map_err(D::Error::custom))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn event(image: &str) -> TagEvent {
        TagEvent {
            created: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            docker_image_reference: String::new(),
            image: image.to_string(),
            generation: 1,
        }
    }

    fn stream() -> ImageStream {
        let mut stream = ImageStream::new("ns", "app");
        stream.status.tags = vec![
            NamedTagEventList {
                tag: "latest".to_string(),
                items: vec![event("newest"), event("older")],
            },
            NamedTagEventList {
                tag: "old".to_string(),
                items: Vec::new(),
            },
        ];
        stream
    }

    #[test]
    fn test_latest_tagged_image() {
        let stream = stream();

        assert_eq!(stream.latest_tagged_image("latest").unwrap().image, "newest");
        assert_eq!(stream.latest_tagged_image("").unwrap().image, "newest");
        assert!(stream.latest_tagged_image("old").is_none());
        assert!(stream.latest_tagged_image("missing").is_none());
    }

    #[test]
    fn test_image_stream_tag() {
        assert_eq!(join_image_stream_tag("app", "v1"), "app:v1");
        assert_eq!(split_image_stream_tag("app:v1"), Some(("app", "v1")));
        assert_eq!(split_image_stream_tag("app"), None);
        assert_eq!(split_image_stream_tag("app:"), None);
        assert_eq!(split_image_stream_tag(":v1"), None);
    }

    #[test]
    fn test_tag_event_generation() {
        let value = json!({
            "created": "2024-01-01T00:00:00Z",
            "image": "sha256:abc",
            "generation": 7,
        });
        let event: TagEvent = serde_json::from_value(value).unwrap();
        assert_eq!(event.generation, 7);
        assert_eq!(serde_json::to_value(&event).unwrap()["generation"], 7);

        let value = json!({ "created": "2024-01-01T00:00:00Z", "image": "sha256:abc" });
        let event: TagEvent = serde_json::from_value(value).unwrap();
        assert_eq!(event.generation, 0);
    }

    #[test]
    fn test_reference_display() {
        assert_eq!(ImageStreamReference::new("ns", "app").to_string(), "ns/app");
    }

    #[test]
    fn test_image_serialization() {
        let image = Image {
            metadata: ObjectMeta {
                name: "sha256:abc".to_string(),
                annotations: BTreeMap::from([(
                    "openshift.io/image.managed".to_string(),
                    "true".to_string(),
                )]),
                ..ObjectMeta::default()
            },
            docker_image_manifest: "{}".to_string(),
            docker_image_signatures: vec![b"sig".to_vec()],
            ..Image::default()
        };

        let value = serde_json::to_value(&image).unwrap();
        assert_eq!(
            value,
            json!({
                "metadata": {
                    "name": "sha256:abc",
                    "annotations": { "openshift.io/image.managed": "true" }
                },
                "dockerImageReference": "",
                "dockerImageManifest": "{}",
                "dockerImageManifestMediaType": "",
                "dockerImageSignatures": ["c2ln"]
            })
        );

        let parsed: Image = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, image);
    }

    #[test]
    fn test_image_stream_deserialization() {
        let stream: ImageStream = serde_json::from_value(json!({
            "metadata": { "namespace": "ns", "name": "app", "resourceVersion": "42" },
            "status": {
                "tags": [
                    { "tag": "latest", "items": [{ "created": "2024-01-01T00:00:00Z", "image": "newest" }] },
                    { "tag": "empty" }
                ]
            }
        }))
        .unwrap();

        assert_eq!(stream.metadata.resource_version, "42");
        assert_eq!(stream.status.tags.len(), 2);
        assert!(stream.status.tags[1].items.is_empty());
        assert_eq!(stream.latest_tagged_image("latest").unwrap().image, "newest");
    }
}
