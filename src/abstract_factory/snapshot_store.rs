use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use serde_json::Value;
use tokio::fs::read_to_string;

use super::factory_interface::{
    ErrorDetails, ErrorLayer, Factory, FactoryError, LabelSelector, Result,
};
use crate::kinds::{fqn, Kind};

/// IO errors mean the snapshot itself is unavailable, which is sticky.
impl From<std::io::Error> for FactoryError {
    fn from(err: std::io::Error) -> FactoryError {
        FactoryError::StickyProblem(ErrorDetails {
            layer: ErrorLayer::StoreLayer,
            message: err.to_string(),
        })
    }
}

/// A frozen copy of cluster state that answers factory lookups.
///
/// Objects are indexed by kind and then by the fully qualified name derived
/// from their own `metadata`, so a store can be seeded straight from a dump of
/// API objects.
#[derive(Debug, Default)]
pub struct SnapshotStore {
    objects: HashMap<Kind, HashMap<String, Value>>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        SnapshotStore::default()
    }

    /// Add (or replace) an object, returning its fully qualified name.
    pub fn insert(&mut self, kind: Kind, object: Value) -> Result<String> {
        let name = match object.pointer("/metadata/name").and_then(Value::as_str) {
            Some(name) if !name.is_empty() => name,
            _ => {
                return Err(FactoryError::StickyProblem(ErrorDetails {
                    layer: ErrorLayer::DataLayer,
                    message: format!("{} object without metadata.name", kind),
                }));
            }
        };
        let ns = object
            .pointer("/metadata/namespace")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let id = fqn(ns, name);

        self.objects
            .entry(kind)
            .or_default()
            .insert(id.clone(), object);
        Ok(id)
    }

    pub fn with(mut self, kind: Kind, object: Value) -> Result<Self> {
        self.insert(kind, object)?;
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.objects.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Build a store from the snapshot document format: a mapping from kind
    /// strings to lists of objects.  JSON is a subset of YAML so both parse.
    pub fn from_document(raw: &str) -> Result<Self> {
        let doc: BTreeMap<String, Vec<Value>> =
            serde_yaml::from_str(raw).map_err(|err| {
                FactoryError::StickyProblem(ErrorDetails {
                    layer: ErrorLayer::DataLayer,
                    message: err.to_string(),
                })
            })?;

        let mut store = SnapshotStore::new();
        for (kind, objects) in doc {
            let kind = Kind::new(&kind);
            for object in objects {
                store.insert(kind, object)?;
            }
        }
        Ok(store)
    }
}

#[async_trait]
impl Factory for SnapshotStore {
    async fn get(
        &self,
        kind: Kind,
        id: &str,
        _skip_cache: bool,
        selector: &LabelSelector,
    ) -> Result<Option<Value>> {
        let found = self
            .objects
            .get(&kind)
            .and_then(|by_id| by_id.get(id))
            .filter(|object| selector.matches(object));
        Ok(found.cloned())
    }
}

/// Read a snapshot document from disk.
pub async fn load_snapshot_store(path: &str) -> Result<SnapshotStore> {
    let raw = read_to_string(path).await?;
    let store = SnapshotStore::from_document(&raw)?;
    trace!(path, objects = store.len(), "loaded snapshot store");
    Ok(store)
}
