use crate::config::ProposalConfig;
use crate::report::{build_report, Report};
use crate::votes::{collect_votes, Ballot, EventLog, VoteRecord};
use crate::Error;
use snapshot_lib::{resolve_holdings, HoldingsBreakdown, Snapshot, SnapshotReader};
use std::time::Duration;

/// Resolves the holdings of every voter, one after the other, all at the cutoff
/// height. `pacing` is waited after each voter.
pub fn resolve_all(
    config: &ProposalConfig,
    votes: &[VoteRecord],
    reader: &dyn SnapshotReader,
    pacing: Duration,
) -> Result<Vec<HoldingsBreakdown>, Error> {
    let snapshot = Snapshot::at(reader, config.cutoff_height);
    let mut holdings = Vec::with_capacity(votes.len());
    for vote in votes {
        log::info!("checking {}", vote.voter);
        holdings.push(resolve_holdings(
            &vote.voter,
            snapshot,
            &config.token.ledger,
            &config.sources,
        )?);
        if !pacing.is_zero() {
            std::thread::sleep(pacing);
        }
    }
    Ok(holdings)
}

/// Collects the votes of the configured proposal and tallies them.
pub fn run(
    config: &ProposalConfig,
    log: &dyn EventLog,
    reader: &dyn SnapshotReader,
    pacing: Duration,
) -> Result<Report, Error> {
    config.warn_rescaled_farms();

    let votes = collect_votes(log, &config.proposal_hash, config.cutoff_height)?;
    let yes = votes.iter().filter(|vote| vote.ballot == Ballot::Yes).count();
    log::info!(
        "There are {} individual votes. {} yes and {} no.",
        votes.len(),
        yes,
        votes.len() - yes
    );

    let holdings = resolve_all(config, &votes, reader, pacing)?;
    let report = build_report(
        &votes,
        holdings,
        &config.token.symbol,
        config.columns().into_iter().map(str::to_owned).collect(),
    )?;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::votes::{Cursor, EventPage, OperationStatus, VoteEvent};
    use serde_json::Value;
    use snapshot_lib::StorageKey;
    use std::sync::Mutex;

    static TRACE: Mutex<Vec<String>> = Mutex::new(Vec::new());

    struct Recorder;

    impl log::Log for Recorder {
        fn enabled(&self, _: &log::Metadata) -> bool {
            true
        }

        fn log(&self, record: &log::Record) {
            let message = record.args().to_string();
            if message.starts_with("There are") {
                TRACE.lock().unwrap().push(message);
            }
        }

        fn flush(&self) {}
    }

    static RECORDER: Recorder = Recorder;

    /// Records every read and answers that nothing is there
    struct EmptyLedger;

    impl SnapshotReader for EmptyLedger {
        fn read_at(
            &self,
            key: &StorageKey,
            _height: snapshot_lib::Height,
        ) -> Result<Option<Value>, snapshot_lib::Error> {
            TRACE.lock().unwrap().push(format!("read {}", key));
            Ok(None)
        }
    }

    struct SinglePage(Vec<VoteEvent>);

    impl EventLog for SinglePage {
        fn page(&self, cursor: Option<&Cursor>) -> Result<EventPage, crate::votes::Error> {
            Ok(EventPage {
                events: if cursor.is_none() { self.0.clone() } else { Vec::new() },
                next_cursor: Some(Cursor("1".to_owned())),
            })
        }
    }

    fn vote(voter: &str, ballot: &str) -> VoteEvent {
        VoteEvent {
            voter: voter.to_owned(),
            height: 10,
            status: OperationStatus::Applied,
            entrypoint: Some("vote".to_owned()),
            proposal: Some("ipfs://proposal".to_owned()),
            ballot: Some(ballot.to_owned()),
        }
    }

    #[test]
    fn vote_counts_are_logged_before_holdings_are_read() {
        log::set_logger(&RECORDER).unwrap();
        log::set_max_level(log::LevelFilter::Info);

        let config: ProposalConfig = serde_yaml::from_str(
            r#"
name: counts
governance_contract: KT1Governance
proposal_hash: ipfs://proposal
cutoff_height: 100
token:
  symbol: YOU
  ledger:
    contract: KT1Token
    path: ledger
sources:
  - kind: direct_balance
    column: inWallet
"#,
        )
        .unwrap();
        let log = SinglePage(vec![vote("tz1a", "1"), vote("tz1b", "0"), vote("tz1c", "0")]);

        let report = run(&config, &log, &EmptyLedger, Duration::ZERO).unwrap();
        assert_eq!(report.summary.vote_count(), 3);

        let trace = TRACE.lock().unwrap();
        assert_eq!(
            trace.first().map(String::as_str),
            Some("There are 3 individual votes. 1 yes and 2 no.")
        );
        assert!(trace.len() > 1);
        assert!(trace[1..].iter().all(|entry| entry.starts_with("read ")));
    }
}
