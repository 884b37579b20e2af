//! Serde adapters that store opaque byte blocks as base64 strings in JSON

use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serializer};

/// Fixed-size byte arrays as base64
pub mod base64_array {
    use super::{Deserialize, Deserializer, Serializer};
    use base64::{Engine as _, engine::general_purpose::STANDARD};
    use serde::de::Error as _;

    pub fn serialize<S: Serializer, const N: usize>(
        bytes: &[u8; N],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>, const N: usize>(
        deserializer: D,
    ) -> Result<[u8; N], D::Error> {
        let text = String::deserialize(deserializer)?;
        let bytes = STANDARD.decode(text.as_bytes()).map_err(D::Error::custom)?;
        bytes.try_into().map_err(|bytes: Vec<u8>| {
            D::Error::custom(format!("expected {N} bytes, found {}", bytes.len()))
        })
    }
}

/// Variable-length byte blocks as base64
pub mod base64_vec {
    use super::{Deserialize, Deserializer, Serializer};
    use base64::{Engine as _, engine::general_purpose::STANDARD};
    use serde::de::Error as _;

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(deserializer)?;
        STANDARD.decode(text.as_bytes()).map_err(D::Error::custom)
    }
}

/// Optional byte blocks as base64, omitted when absent
pub mod base64_opt {
    use super::{Deserialize, Deserializer, Serializer, decode_opt};
    use base64::{Engine as _, engine::general_purpose::STANDARD};

    #[allow(clippy::ref_option)]
    pub fn serialize<S: Serializer>(
        bytes: &Option<Vec<u8>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match bytes {
            Some(bytes) => serializer.serialize_some(&STANDARD.encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Vec<u8>>, D::Error> {
        let text = Option::<String>::deserialize(deserializer)?;
        decode_opt::<D>(text)
    }
}

fn decode_opt<'de, D: Deserializer<'de>>(text: Option<String>) -> Result<Option<Vec<u8>>, D::Error> {
    text.map(|t| STANDARD.decode(t.as_bytes()).map_err(D::Error::custom))
        .transpose()
}
