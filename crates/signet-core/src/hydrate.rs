//! Hydration payloads: resuming a previously committed native graph.
//!
//! When a host reloads while the native engine keeps running, the engine can
//! report the nodes it still holds as a JSON object mapping hex hashes to their
//! last props:
//!
//! ```json
//! { "1f3a9c02": { "value": 440 }, "6b0d11e4": { "channel": 0 } }
//! ```
//!
//! Seeding the node table from this payload lets the next render diff against
//! those nodes instead of re-creating them. Hydration emits no instructions.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::delegate::MountedNode;
use crate::error::GraphError;
use crate::node::NodeHash;
use crate::props::Props;

/// Mapping from hex-encoded hash to the prior props snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HydrationPayload(IndexMap<String, Props>);

impl HydrationPayload {
    /// Creates an empty payload.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a payload from JSON text.
    pub fn from_json(json: &str) -> Result<Self, GraphError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serializes the payload as compact JSON.
    pub fn to_json(&self) -> Result<String, GraphError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Adds an entry for `hash`.
    pub fn insert(&mut self, hash: NodeHash, props: Props) {
        self.0.insert(hash.to_string(), props);
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the payload has no entries.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Converts every entry into a hydrated placeholder record.
    ///
    /// Fails on the first key that is not a valid hex hash, before any record
    /// is produced.
    pub fn records(&self) -> Result<Vec<MountedNode>, GraphError> {
        self.0
            .iter()
            .map(|(key, props)| {
                let hash = NodeHash::from_hex(key)
                    .ok_or_else(|| GraphError::InvalidHydration(key.clone()))?;
                Ok(MountedNode::hydrated(hash, props.clone()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delegate::HYDRATED_KIND;
    use crate::props::PropValue;

    #[test]
    fn parses_hex_keys_into_records() {
        let payload = HydrationPayload::from_json(r#"{"1f": {"value": 440}, "a0": {}}"#).unwrap();
        let records = payload.records().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].hash.value(), 0x1f);
        assert_eq!(records[0].kind, HYDRATED_KIND);
        assert_eq!(records[0].props["value"], PropValue::Number(440.0));
        assert_eq!(records[0].generation, 0);
        assert_eq!(records[1].hash.value(), 0xa0);
    }

    #[test]
    fn rejects_non_hex_keys() {
        let payload = HydrationPayload::from_json(r#"{"xyz": {}}"#).unwrap();
        assert!(matches!(
            payload.records(),
            Err(GraphError::InvalidHydration(ref k)) if k == "xyz"
        ));
    }

    #[test]
    fn rejects_non_object_props() {
        assert!(matches!(
            HydrationPayload::from_json(r#"{"1f": 3}"#),
            Err(GraphError::Json(_))
        ));
    }

    #[test]
    fn insert_uses_hex_keys() {
        let mut payload = HydrationPayload::new();
        payload.insert(NodeHash::from_raw(255), Props::new());
        assert_eq!(payload.records().unwrap()[0].hash.value(), 255);
    }
}
