//! Per proposal run configuration.

use serde::Deserialize;
use snapshot_lib::sources::ValueSource;
use snapshot_lib::{ContractAddress, Height, HoldingsSource, TokenLedger};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("could not read {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("proposal {0} declares no holdings sources")]
    NoSources(String),

    #[error("column {0} is declared more than once")]
    DuplicateColumn(String),
}

#[derive(Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct TokenConfig {
    /// Used in the report summary, e.g. `YOU`
    pub symbol: String,
    pub ledger: TokenLedger,
}

#[derive(Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Endpoints {
    #[serde(default = "default_event_log")]
    pub event_log: String,
    #[serde(default = "default_snapshot")]
    pub snapshot: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            event_log: default_event_log(),
            snapshot: default_snapshot(),
        }
    }
}

fn default_event_log() -> String {
    crate::votes::BetterCallDev::DEFAULT_ENDPOINT.to_owned()
}

fn default_snapshot() -> String {
    snapshot_lib::reader::TzktReader::DEFAULT_ENDPOINT.to_owned()
}

fn default_network() -> String {
    "mainnet".to_owned()
}

fn default_pacing_ms() -> u64 {
    1000
}

#[derive(Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ProposalConfig {
    pub name: String,
    pub governance_contract: ContractAddress,
    pub proposal_hash: String,
    /// Votes must be included strictly before this level, holdings are read at it
    pub cutoff_height: Height,
    #[serde(default = "default_network")]
    pub network: String,
    pub token: TokenConfig,
    pub sources: Vec<HoldingsSource>,
    #[serde(default)]
    pub endpoints: Endpoints,
    #[serde(default = "default_pacing_ms")]
    pub pacing_ms: u64,
}

impl ProposalConfig {
    /// Loads a configuration, as YAML for `.yaml`/`.yml` files and JSON otherwise.
    pub fn load(path: &Path) -> Result<Self, Error> {
        let file = File::open(path).map_err(|source| Error::Io {
            path: path.to_owned(),
            source,
        })?;
        let reader = BufReader::new(file);
        let config: Self = match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml" | "yml") => serde_yaml::from_reader(reader)?,
            _ => serde_json::from_reader(reader)?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.sources.is_empty() {
            return Err(Error::NoSources(self.name.clone()));
        }
        let mut seen = std::collections::HashSet::new();
        for column in self.columns() {
            if !seen.insert(column) {
                return Err(Error::DuplicateColumn(column.to_owned()));
            }
        }
        Ok(())
    }

    /// Report columns, in source order
    pub fn columns(&self) -> Vec<&str> {
        self.sources.iter().map(|source| source.column()).collect()
    }

    pub fn pacing(&self) -> Duration {
        Duration::from_millis(self.pacing_ms)
    }

    pub fn default_output(&self) -> PathBuf {
        PathBuf::from(format!("votes-{}.csv", self.name))
    }

    /// Where the bare vote list goes unless told otherwise
    pub fn default_ballots_output(&self) -> PathBuf {
        PathBuf::from(format!("ballots-{}.csv", self.name))
    }

    /// Logs every farm counted with a share precision of its own.
    pub fn warn_rescaled_farms(&self) {
        for source in &self.sources {
            for farm in source.rescaled_farms() {
                log::warn!(
                    "{}: farm {} shares are scaled down by 10^{}",
                    source.column(),
                    farm.deposits.contract,
                    farm.share_decimals_offset
                );
            }
        }
    }
}
