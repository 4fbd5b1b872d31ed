//! Normalized record store.
//!
//! # Responsibilities
//! - Flatten upstream GraphQL responses into records keyed by entity id
//! - Merge repeated fetches field-wise (later writes win per field)
//! - Produce the snapshot serialized into the document for hydration
//!
//! # Design Decisions
//! - Objects carrying a string `id` are keyed by that id; id-less objects
//!   get a path-derived key (`parent:field`)
//! - Nested entities are replaced by `{"__ref": key}` links, lists of
//!   entities by `{"__refs": [keys]}`
//! - The synthetic root record links every top-level response field,
//!   suffixing the variables JSON when variables are non-empty, so the same
//!   query + variables pair resolves to the same root field client-side

use std::collections::HashMap;

use serde_json::{json, Map, Value};

/// Key of the synthetic root record.
pub const ROOT_RECORD_KEY: &str = "client:root";

/// Per-request store of normalized records.
#[derive(Debug, Default)]
pub struct RecordStore {
    records: HashMap<String, Map<String, Value>>,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge fields into a record, creating it if absent. Existing fields
    /// not mentioned in `fields` are kept.
    pub fn merge_record(&mut self, key: &str, fields: Map<String, Value>) {
        let record = self.records.entry(key.to_string()).or_default();
        for (field, value) in fields {
            record.insert(field, value);
        }
    }

    pub fn record(&self, key: &str) -> Option<&Map<String, Value>> {
        self.records.get(key)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The entire store as one JSON object, serialized verbatim into the
    /// outgoing document.
    pub fn snapshot(&self) -> Value {
        let mut out = Map::new();
        for (key, fields) in &self.records {
            out.insert(key.clone(), Value::Object(fields.clone()));
        }
        Value::Object(out)
    }

    /// Normalize one response's `data` object into the store.
    pub fn normalize(&mut self, variables: &Value, data: &Value) {
        let Value::Object(fields) = data else {
            return;
        };

        let mut root = Map::new();
        for (field, value) in fields {
            let stored = self.normalize_value(value, format!("{ROOT_RECORD_KEY}:{field}"));
            root.insert(storage_key(field, variables), stored);
        }
        self.merge_record(ROOT_RECORD_KEY, root);
    }

    /// Normalize a value, inserting records for entities, and return the
    /// representation stored in the parent record.
    fn normalize_value(&mut self, value: &Value, fallback_key: String) -> Value {
        match value {
            Value::Object(map) => {
                let key = self.normalize_object(map, fallback_key);
                json!({ "__ref": key })
            }
            Value::Array(items) if items.iter().any(Value::is_object) => {
                let refs: Vec<Value> = items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| match item {
                        Value::Object(map) => {
                            Value::String(self.normalize_object(map, format!("{fallback_key}.{i}")))
                        }
                        other => other.clone(),
                    })
                    .collect();
                json!({ "__refs": refs })
            }
            other => other.clone(),
        }
    }

    /// Insert an object as a record and return its key.
    fn normalize_object(&mut self, map: &Map<String, Value>, fallback_key: String) -> String {
        let key = map
            .get("id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or(fallback_key);

        let mut fields = Map::new();
        for (field, value) in map {
            let stored = self.normalize_value(value, format!("{key}:{field}"));
            fields.insert(field.clone(), stored);
        }
        self.merge_record(&key, fields);

        key
    }
}

/// Storage key for a top-level response field: the field name alone for
/// variable-less queries, otherwise suffixed with the canonical variables
/// JSON (serde_json keeps object keys sorted).
fn storage_key(field: &str, variables: &Value) -> String {
    let empty = match variables {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    };
    if empty {
        field.to_string()
    } else {
        format!("{field}({variables})")
    }
}
