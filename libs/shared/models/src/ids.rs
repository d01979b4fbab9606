//! Row identifiers arrive as UUID strings or integer keys depending on the table;
//! both are carried as `String` inside the API.

use serde::{de, Deserialize, Deserializer, Serializer};
use serde_json::Value;

pub fn value_to_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

pub fn serialize<S: Serializer>(id: &str, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(id)
}

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let raw = Value::deserialize(deserializer)?;
    value_to_id(&raw).ok_or_else(|| de::Error::custom(format!("invalid identifier {}", raw)))
}

pub mod option {
    use serde::{Deserialize, Deserializer, Serializer};
    use serde_json::Value;

    use super::value_to_id;

    pub fn serialize<S: Serializer>(id: &Option<String>, serializer: S) -> Result<S::Ok, S::Error> {
        match id {
            Some(id) => serializer.serialize_some(id),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
        let raw = Option::<Value>::deserialize(deserializer)?;
        Ok(raw.as_ref().and_then(value_to_id))
    }
}
