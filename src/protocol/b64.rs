//! Base64 (standard alphabet, padded) encoding of record blobs in JSON

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use bytes::Bytes;

fn encode(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

fn decode<E: serde::de::Error>(text: &str) -> Result<Bytes, E> {
    STANDARD.decode(text).map(Bytes::from).map_err(E::custom)
}

/// `Vec<Bytes>` as an array of base64 strings; `null` reads as empty
pub mod list {
    use bytes::Bytes;
    use serde::{Deserialize, Deserializer, Serializer};

    #[allow(clippy::ptr_arg)]
    pub fn serialize<S: Serializer>(records: &Vec<Bytes>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(records.iter().map(|r| super::encode(r)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Bytes>, D::Error> {
        let texts = Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default();
        texts.iter().map(|t| super::decode(t)).collect()
    }
}

/// `Option<Bytes>` as a base64 string or `null`
pub mod option {
    use bytes::Bytes;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(record: &Option<Bytes>, serializer: S) -> Result<S::Ok, S::Error> {
        match record {
            Some(bytes) => serializer.serialize_str(&super::encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Bytes>, D::Error> {
        Option::<String>::deserialize(deserializer)?
            .map(|text| super::decode(&text))
            .transpose()
    }
}

/// `Bytes` as a base64 string; `null` reads as empty
pub mod single {
    use bytes::Bytes;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(record: &Bytes, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::encode(record))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Bytes, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            Some(text) => super::decode(&text),
            None => Ok(Bytes::new()),
        }
    }
}
