//! Point-in-time token holdings for governance voters.
//!
//! Everything here reads the ledger through a [`Snapshot`], a handle pinned to a
//! single height, so one voter's holdings can never be assembled from reads at
//! different heights.

pub mod amount;
pub mod holdings;
pub mod reader;
pub mod schema;
pub mod sources;

pub use amount::TokenAmount;
pub use holdings::{resolve_holdings, HoldingsBreakdown, SourceAmount};
pub use reader::{BigMapKey, Snapshot, SnapshotReader, StorageKey};
pub use sources::{HoldingsSource, TokenLedger};

use thiserror::Error;

/// Block level of the ledger
pub type Height = u64;
/// Implicit or originated account address, used as is (no normalization)
pub type Address = String;
pub type ContractAddress = String;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Transport(#[from] reqwest::Error),

    #[error("request to {url} failed with status {status}")]
    Status { url: String, status: u16 },

    #[error("invalid endpoint url {0}")]
    InvalidUrl(String),

    #[error("malformed value for {key}: {reason}")]
    Malformed { key: String, reason: String },

    #[error("{what} is zero while {voter} holds a non-zero share")]
    ZeroDenominator { what: &'static str, voter: Address },
}
