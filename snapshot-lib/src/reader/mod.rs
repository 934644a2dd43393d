#[cfg(any(test, feature = "test-api"))]
mod memory;
mod tzkt;

#[cfg(any(test, feature = "test-api"))]
pub use memory::InMemoryLedger;
pub use tzkt::TzktReader;

use crate::{ContractAddress, Error, Height};
use serde_json::Value;
use std::fmt;

/// Key of a big map entry, in the textual form the indexer expects:
/// simple keys as is, composite keys as compact JSON.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BigMapKey(String);

impl BigMapKey {
    pub fn address(address: &str) -> Self {
        Self(address.to_owned())
    }

    pub fn nat(id: impl fmt::Display) -> Self {
        Self(id.to_string())
    }

    /// FA2 style `{ owner, token_id }` pair
    pub fn owner_token_id(owner: &str, token_id: u64) -> Self {
        Self(
            serde_json::json!({ "owner": owner, "token_id": token_id.to_string() }).to_string(),
        )
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BigMapKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StorageKey {
    /// An entry of the big map found at `path` in the contract storage
    BigMapEntry {
        contract: ContractAddress,
        path: String,
        key: BigMapKey,
    },
    /// A plain value found at `path` in the contract storage
    Field {
        contract: ContractAddress,
        path: String,
    },
}

impl StorageKey {
    pub fn big_map_entry(contract: &str, path: &str, key: BigMapKey) -> Self {
        Self::BigMapEntry {
            contract: contract.to_owned(),
            path: path.to_owned(),
            key,
        }
    }

    pub fn field(contract: &str, path: &str) -> Self {
        Self::Field {
            contract: contract.to_owned(),
            path: path.to_owned(),
        }
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BigMapEntry {
                contract,
                path,
                key,
            } => write!(f, "{}:{}[{}]", contract, path, key),
            Self::Field { contract, path } => write!(f, "{}:{}", contract, path),
        }
    }
}

/// Historical view over contract storage.
pub trait SnapshotReader {
    /// Value of `key` as recorded at or before `height`, `None` if there was none.
    fn read_at(&self, key: &StorageKey, height: Height) -> Result<Option<Value>, Error>;
}

impl<R: SnapshotReader + ?Sized> SnapshotReader for &R {
    fn read_at(&self, key: &StorageKey, height: Height) -> Result<Option<Value>, Error> {
        (**self).read_at(key, height)
    }
}

/// A reader pinned to one height.
///
/// There is no way to issue a read at another height through a `Snapshot`, so a
/// computation handed one of these only ever sees a single consistent state.
#[derive(Clone, Copy)]
pub struct Snapshot<'r> {
    reader: &'r dyn SnapshotReader,
    height: Height,
}

impl<'r> Snapshot<'r> {
    pub fn at(reader: &'r dyn SnapshotReader, height: Height) -> Self {
        Self { reader, height }
    }

    pub fn height(&self) -> Height {
        self.height
    }

    pub fn get(&self, key: &StorageKey) -> Result<Option<Value>, Error> {
        log::trace!("reading {} at {}", key, self.height);
        self.reader.read_at(key, self.height)
    }

    pub fn big_map_entry(
        &self,
        contract: &str,
        path: &str,
        key: BigMapKey,
    ) -> Result<Option<(StorageKey, Value)>, Error> {
        let key = StorageKey::big_map_entry(contract, path, key);
        Ok(self.get(&key)?.map(|value| (key, value)))
    }

    pub fn field(&self, contract: &str, path: &str) -> Result<Option<(StorageKey, Value)>, Error> {
        let key = StorageKey::field(contract, path);
        Ok(self.get(&key)?.map(|value| (key, value)))
    }
}
