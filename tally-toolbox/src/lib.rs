pub mod config;
pub mod report;
pub mod tally;
pub mod votes;

pub use config::ProposalConfig;
pub use report::{build_report, Report};
pub use tally::{resolve_all, run};
pub use votes::{collect_votes, Ballot, VoteRecord};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Votes(#[from] votes::Error),

    #[error(transparent)]
    Snapshot(#[from] snapshot_lib::Error),

    #[error(transparent)]
    Report(#[from] report::Error),

    #[error(transparent)]
    Config(#[from] config::Error),
}
