mod descriptor;
mod digest;
mod error;
mod manifest;
pub mod media_type;
pub mod schema1;
pub mod schema2;

pub use descriptor::Descriptor;
pub use digest::Digest;
pub use error::Error;
pub use manifest::Manifest;
pub use schema1::SignedManifest;
pub use schema2::DeserializedManifest;
