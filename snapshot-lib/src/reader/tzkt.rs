use super::{SnapshotReader, StorageKey};
use crate::{Error, Height};
use reqwest::{blocking::Client, StatusCode, Url};
use serde::Deserialize;
use serde_json::Value;

/// Reads historical contract storage from a TzKT compatible indexer.
pub struct TzktReader {
    client: Client,
    base: Url,
}

#[derive(Deserialize)]
struct HistoricalKey {
    active: bool,
    #[serde(default)]
    value: Value,
}

impl TzktReader {
    pub const DEFAULT_ENDPOINT: &'static str = "https://api.tzkt.io";

    pub fn new(base: &str) -> Result<Self, Error> {
        let base = Url::parse(base).map_err(|e| Error::InvalidUrl(format!("{}: {}", base, e)))?;
        if base.cannot_be_a_base() {
            return Err(Error::InvalidUrl(base.to_string()));
        }
        Ok(Self {
            client: Client::new(),
            base,
        })
    }

    fn url(&self, segments: &[&str]) -> Result<Url, Error> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| Error::InvalidUrl(self.base.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn get(&self, url: Url, query: &[(&str, &str)]) -> Result<Option<Value>, Error> {
        let response = self.client.get(url.clone()).query(query).send()?;
        match response.status() {
            StatusCode::NO_CONTENT => Ok(None),
            status if status.is_success() => Ok(Some(response.json()?)),
            status => Err(Error::Status {
                url: url.to_string(),
                status: status.as_u16(),
            }),
        }
    }
}

impl SnapshotReader for TzktReader {
    fn read_at(&self, key: &StorageKey, height: Height) -> Result<Option<Value>, Error> {
        let level = height.to_string();
        match key {
            StorageKey::BigMapEntry {
                contract,
                path,
                key,
            } => {
                let url = self.url(&[
                    "v1",
                    "contracts",
                    contract,
                    "bigmaps",
                    path,
                    "historical_keys",
                    &level,
                    key.as_str(),
                ])?;
                match self.get(url, &[])? {
                    None => Ok(None),
                    Some(entry) => {
                        let entry: HistoricalKey =
                            serde_json::from_value(entry).map_err(|e| Error::Malformed {
                                key: key.to_string(),
                                reason: e.to_string(),
                            })?;
                        Ok(entry.active.then_some(entry.value))
                    }
                }
            }
            StorageKey::Field { contract, path } => {
                let url = self.url(&["v1", "contracts", contract, "storage"])?;
                Ok(self
                    .get(url, &[("level", &level), ("path", path)])?
                    .filter(|value| !value.is_null()))
            }
        }
    }
}
