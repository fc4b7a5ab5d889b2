//! Identifier wire form.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use rocon_types::Identifier;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// `uuid_msgs/UniqueID`: a 16-byte identifier.
///
/// Encoded the way rosbridge carries `uint8[16]`: a base64 string. Decoding
/// also accepts a plain array of 16 integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UniqueIdMsg {
    #[serde(serialize_with = "serialize_uuid", deserialize_with = "deserialize_uuid")]
    pub uuid: [u8; 16],
}

impl From<Identifier> for UniqueIdMsg {
    fn from(id: Identifier) -> Self {
        Self {
            uuid: id.to_wire_bytes(),
        }
    }
}

impl From<UniqueIdMsg> for Identifier {
    fn from(msg: UniqueIdMsg) -> Self {
        Identifier::from_bytes(msg.uuid)
    }
}

fn serialize_uuid<S: Serializer>(bytes: &[u8; 16], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&BASE64.encode(bytes))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum UuidRepr {
    Base64(String),
    Bytes(Vec<u8>),
}

fn deserialize_uuid<'de, D: Deserializer<'de>>(deserializer: D) -> Result<[u8; 16], D::Error> {
    use serde::de::Error;

    let bytes = match UuidRepr::deserialize(deserializer)? {
        UuidRepr::Base64(text) => BASE64
            .decode(text.as_bytes())
            .map_err(|e| D::Error::custom(format!("uuid is not base64: {e}")))?,
        UuidRepr::Bytes(bytes) => bytes,
    };
    let len = bytes.len();
    bytes
        .try_into()
        .map_err(|_| D::Error::custom(format!("uuid must be 16 bytes, got {len}")))
}
