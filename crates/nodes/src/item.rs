//! Items flowing in and out of a node.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One record of a batch.
///
/// `paired_item` is the index of the input item that produced this output,
/// so downstream steps can correlate results with their source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    #[serde(default)]
    pub json: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binary: Option<BinaryData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paired_item: Option<usize>,
}

impl Item {
    pub fn new(json: Value) -> Self {
        Self {
            json,
            binary: None,
            paired_item: None,
        }
    }

    /// An item whose payload is a file; its JSON part is empty.
    pub fn attachment(binary: BinaryData) -> Self {
        Self {
            json: Value::Object(Default::default()),
            binary: Some(binary),
            paired_item: None,
        }
    }

    pub fn paired(mut self, index: usize) -> Self {
        self.paired_item = Some(index);
        self
    }
}

/// A named file attached to an item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BinaryData {
    #[serde(with = "base64_bytes")]
    pub data: Bytes,
    pub file_name: String,
    pub mime_type: String,
}

impl BinaryData {
    pub fn new(data: Bytes, file_name: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            data,
            file_name: file_name.into(),
            mime_type: mime_type.into(),
        }
    }
}

mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use bytes::Bytes;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(data: &Bytes, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(data))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Bytes, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map(Bytes::from)
            .map_err(serde::de::Error::custom)
    }
}
