use super::{BigMapKey, SnapshotReader, StorageKey};
use crate::{Error, Height};
use serde_json::Value;
use std::collections::BTreeMap;

/// Ledger history kept in memory, answering reads like the indexer would:
/// the latest write at or before the requested height wins.
#[derive(Clone, Debug, Default)]
pub struct InMemoryLedger {
    history: BTreeMap<StorageKey, BTreeMap<Height, Option<Value>>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: StorageKey, height: Height, value: impl Into<Value>) -> &mut Self {
        self.history
            .entry(key)
            .or_default()
            .insert(height, Some(value.into()));
        self
    }

    pub fn remove(&mut self, key: StorageKey, height: Height) -> &mut Self {
        self.history.entry(key).or_default().insert(height, None);
        self
    }

    pub fn set_entry(
        &mut self,
        contract: &str,
        path: &str,
        key: BigMapKey,
        height: Height,
        value: impl Into<Value>,
    ) -> &mut Self {
        self.set(StorageKey::big_map_entry(contract, path, key), height, value)
    }

    pub fn set_field(
        &mut self,
        contract: &str,
        path: &str,
        height: Height,
        value: impl Into<Value>,
    ) -> &mut Self {
        self.set(StorageKey::field(contract, path), height, value)
    }
}

impl SnapshotReader for InMemoryLedger {
    fn read_at(&self, key: &StorageKey, height: Height) -> Result<Option<Value>, Error> {
        Ok(self
            .history
            .get(key)
            .and_then(|writes| writes.range(..=height).next_back())
            .and_then(|(_, value)| value.clone()))
    }
}
