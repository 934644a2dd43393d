//! Discovery of the ballots cast on a proposal.
//!
//! The governance contract's operations are paged from the newest to the oldest.
//! Walking them in that order, the first eligible vote seen for an address is
//! its latest one, and every later sighting of that address is an older,
//! superseded ballot.

mod bcd;

pub use bcd::BetterCallDev;

use serde::{Deserialize, Serialize, Serializer};
use snapshot_lib::{Address, Height};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub const VOTE_ENTRYPOINT: &str = "vote";

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Transport(#[from] reqwest::Error),

    #[error("request to {url} failed with status {status}")]
    Status { url: String, status: u16 },

    #[error("invalid endpoint url {0}")]
    InvalidUrl(String),

    #[error("page of {0} operations came without a continuation cursor")]
    MissingCursor(usize),

    #[error("event log returned cursor {0} again")]
    StalledCursor(Cursor),

    #[error("vote of {voter} at level {height} has invalid ballot {value:?}")]
    InvalidBallot {
        voter: Address,
        height: Height,
        value: Option<String>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Ballot {
    Yes,
    No,
}

impl Ballot {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Yes => "1",
            Self::No => "0",
        }
    }
}

impl FromStr for Ballot {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1" => Ok(Self::Yes),
            "0" => Ok(Self::No),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Ballot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Ballot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct VoteRecord {
    #[serde(rename = "Address")]
    pub voter: Address,
    #[serde(rename = "Vote")]
    pub ballot: Ballot,
}

#[derive(Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OperationStatus {
    Applied,
    Failed,
    Backtracked,
    Skipped,
    #[serde(other)]
    Unknown,
}

/// An operation of the governance contract, as far as voting is concerned.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VoteEvent {
    pub voter: Address,
    pub height: Height,
    pub status: OperationStatus,
    pub entrypoint: Option<String>,
    /// Proposal hash the ballot was cast for, if the operation carries one
    pub proposal: Option<String>,
    pub ballot: Option<String>,
}

impl VoteEvent {
    pub fn is_eligible(&self, proposal_hash: &str, cutoff: Height) -> bool {
        self.status == OperationStatus::Applied
            && self.height < cutoff
            && self.entrypoint.as_deref() == Some(VOTE_ENTRYPOINT)
            && self.proposal.as_deref() == Some(proposal_hash)
    }

    fn ballot(&self) -> Result<Ballot, Error> {
        self.ballot
            .as_deref()
            .and_then(|value| value.parse().ok())
            .ok_or_else(|| Error::InvalidBallot {
                voter: self.voter.clone(),
                height: self.height,
                value: self.ballot.clone(),
            })
    }
}

/// Opaque continuation token of the event log
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Cursor(pub String);

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub struct EventPage {
    pub events: Vec<VoteEvent>,
    pub next_cursor: Option<Cursor>,
}

/// Operations log of the governance contract, newest first.
pub trait EventLog {
    /// The page following `cursor`, or the newest page if there is none.
    /// An empty page means the log is exhausted.
    fn page(&self, cursor: Option<&Cursor>) -> Result<EventPage, Error>;
}

impl<L: EventLog + ?Sized> EventLog for &L {
    fn page(&self, cursor: Option<&Cursor>) -> Result<EventPage, Error> {
        (**self).page(cursor)
    }
}

/// Keeps the first eligible ballot seen per voter.
pub struct VoteCollector<'a> {
    proposal_hash: &'a str,
    cutoff: Height,
    voters: HashSet<Address>,
    votes: Vec<VoteRecord>,
}

impl<'a> VoteCollector<'a> {
    pub fn new(proposal_hash: &'a str, cutoff: Height) -> Self {
        Self {
            proposal_hash,
            cutoff,
            voters: HashSet::new(),
            votes: Vec::new(),
        }
    }

    /// Returns whether the event produced a new vote record.
    pub fn observe(&mut self, event: &VoteEvent) -> Result<bool, Error> {
        if !event.is_eligible(self.proposal_hash, self.cutoff) {
            return Ok(false);
        }
        if self.voters.contains(&event.voter) {
            log::debug!(
                "ignoring older vote of {} at level {}",
                event.voter,
                event.height
            );
            return Ok(false);
        }
        let ballot = event.ballot()?;
        self.voters.insert(event.voter.clone());
        self.votes.push(VoteRecord {
            voter: event.voter.clone(),
            ballot,
        });
        Ok(true)
    }

    /// Votes in the order they were first seen
    pub fn finish(self) -> Vec<VoteRecord> {
        self.votes
    }
}

/// Walks the whole event log and returns the latest ballot of every voter on
/// `proposal_hash` cast strictly before `cutoff`.
///
/// Any failure aborts the walk: dropping a page would change which ballot is the
/// latest for some voters, so there is no usable partial result.
pub fn collect_votes<L: EventLog + ?Sized>(
    log: &L,
    proposal_hash: &str,
    cutoff: Height,
) -> Result<Vec<VoteRecord>, Error> {
    let mut collector = VoteCollector::new(proposal_hash, cutoff);
    let mut cursor: Option<Cursor> = None;
    loop {
        log::debug!(
            "requesting operations after {}",
            cursor.as_ref().map_or("the newest", |c| c.0.as_str())
        );
        let page = log.page(cursor.as_ref())?;
        if page.events.is_empty() {
            break;
        }
        for event in &page.events {
            collector.observe(event)?;
        }

        let next = page
            .next_cursor
            .ok_or(Error::MissingCursor(page.events.len()))?;
        if cursor.as_ref() == Some(&next) {
            return Err(Error::StalledCursor(next));
        }
        cursor = Some(next);
    }
    Ok(collector.finish())
}
