use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

/// Keep the rows that decode, log the ones that don't.
pub fn decode_rows<T: DeserializeOwned>(table: &str, rows: Vec<Value>) -> Vec<T> {
    rows.into_iter()
        .filter_map(|row| match T::deserialize(&row) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                warn!("Skipping unreadable {} row {}: {}", table, row, e);
                None
            }
        })
        .collect()
}
