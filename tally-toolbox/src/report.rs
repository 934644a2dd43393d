//! Joins votes with holdings and renders the tally.

use crate::votes::{Ballot, VoteRecord};
use snapshot_lib::{Address, HoldingsBreakdown, TokenAmount};
use std::collections::HashMap;
use std::io::Write;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("no holdings resolved for voter {0}")]
    MissingHoldings(Address),

    #[error("holdings resolved for {0} who did not vote")]
    UnexpectedHoldings(Address),

    #[error("voter {0} appears more than once")]
    DuplicateVoter(Address),

    #[error("holdings of {voter} do not match the report columns")]
    ColumnMismatch { voter: Address },

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReportRow {
    pub voter: Address,
    pub ballot: Ballot,
    pub total: TokenAmount,
    /// One amount per report column
    pub per_source: Vec<TokenAmount>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Summary {
    pub yes_count: usize,
    pub no_count: usize,
    pub yes_total: TokenAmount,
    pub no_total: TokenAmount,
}

impl Summary {
    fn add(mut self, row: &ReportRow) -> Self {
        match row.ballot {
            Ballot::Yes => {
                self.yes_count += 1;
                self.yes_total += &row.total;
            }
            Ballot::No => {
                self.no_count += 1;
                self.no_total += &row.total;
            }
        }
        self
    }

    pub fn combined_total(&self) -> TokenAmount {
        &self.yes_total + &self.no_total
    }

    pub fn vote_count(&self) -> usize {
        self.yes_count + self.no_count
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Report {
    pub token_symbol: String,
    pub columns: Vec<String>,
    /// In the order votes were collected
    pub rows: Vec<ReportRow>,
    pub summary: Summary,
}

/// Joins every vote with the holdings of its voter.
///
/// The join has to be exact: a vote without holdings, holdings without a vote
/// or a voter seen twice on either side all fail the report.
pub fn build_report(
    votes: &[VoteRecord],
    holdings: Vec<HoldingsBreakdown>,
    token_symbol: &str,
    columns: Vec<String>,
) -> Result<Report, Error> {
    let mut by_voter = HashMap::with_capacity(holdings.len());
    for breakdown in holdings {
        if let Some(previous) = by_voter.insert(breakdown.voter.clone(), breakdown) {
            return Err(Error::DuplicateVoter(previous.voter));
        }
    }

    let mut rows = Vec::with_capacity(votes.len());
    for vote in votes {
        let breakdown = by_voter
            .remove(&vote.voter)
            .ok_or_else(|| {
                if rows.iter().any(|row: &ReportRow| row.voter == vote.voter) {
                    Error::DuplicateVoter(vote.voter.clone())
                } else {
                    Error::MissingHoldings(vote.voter.clone())
                }
            })?;
        rows.push(row(vote, breakdown, &columns)?);
    }
    if let Some(voter) = by_voter.into_keys().min() {
        return Err(Error::UnexpectedHoldings(voter));
    }

    let summary = rows.iter().fold(Summary::default(), Summary::add);
    Ok(Report {
        token_symbol: token_symbol.to_owned(),
        columns,
        rows,
        summary,
    })
}

fn row(
    vote: &VoteRecord,
    breakdown: HoldingsBreakdown,
    columns: &[String],
) -> Result<ReportRow, Error> {
    let per_source = columns
        .iter()
        .map(|column| breakdown.amount(column).cloned())
        .collect::<Option<Vec<_>>>()
        .filter(|_| breakdown.per_source.len() == columns.len())
        .ok_or_else(|| Error::ColumnMismatch {
            voter: vote.voter.clone(),
        })?;
    Ok(ReportRow {
        voter: vote.voter.clone(),
        ballot: vote.ballot,
        total: breakdown.total,
        per_source,
    })
}

impl Report {
    /// Writes the rows followed by the summary lines.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), Error> {
        let mut csv = csv::WriterBuilder::new()
            .flexible(true)
            .from_writer(writer);

        let header = ["Address", "Vote", "TotalAmount"]
            .into_iter()
            .chain(self.columns.iter().map(String::as_str));
        csv.write_record(header)?;
        for row in &self.rows {
            let mut record = vec![
                row.voter.clone(),
                row.ballot.to_string(),
                row.total.to_string(),
            ];
            record.extend(row.per_source.iter().map(ToString::to_string));
            csv.write_record(&record)?;
        }

        let summary = &self.summary;
        let symbol = &self.token_symbol;
        for (label, value) in [
            ("Total votes YES".to_owned(), summary.yes_count.to_string()),
            ("Total votes NO".to_owned(), summary.no_count.to_string()),
            (format!("Total {} YES", symbol), summary.yes_total.to_string()),
            (format!("Total {} NO", symbol), summary.no_total.to_string()),
            (
                format!("Total {} VOTED", symbol),
                summary.combined_total().to_string(),
            ),
        ] {
            csv.write_record([label, value])?;
        }
        csv.flush()?;
        Ok(())
    }
}

/// Writes the `Address,Vote` list of collected votes.
pub fn write_votes_csv<W: Write>(votes: &[VoteRecord], writer: W) -> Result<(), Error> {
    let mut csv = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    csv.write_record(["Address", "Vote"])?;
    for vote in votes {
        csv.serialize(vote)?;
    }
    csv.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use snapshot_lib::SourceAmount;
    use test_strategy::proptest;

    fn vote(voter: &str, ballot: Ballot) -> VoteRecord {
        VoteRecord {
            voter: voter.to_owned(),
            ballot,
        }
    }

    fn holdings(voter: &str, wallet: u64, pool: u64) -> HoldingsBreakdown {
        HoldingsBreakdown {
            voter: voter.to_owned(),
            per_source: vec![
                SourceAmount {
                    source: "inWallet".to_owned(),
                    amount: wallet.into(),
                },
                SourceAmount {
                    source: "inPool".to_owned(),
                    amount: pool.into(),
                },
            ],
            total: TokenAmount::from(wallet) + TokenAmount::from(pool),
        }
    }

    fn columns() -> Vec<String> {
        vec!["inWallet".to_owned(), "inPool".to_owned()]
    }

    #[test]
    fn tallies_in_vote_order() {
        let votes = [vote("tz1b", Ballot::No), vote("tz1a", Ballot::Yes)];
        let report = build_report(
            &votes,
            vec![holdings("tz1a", 1000, 500), holdings("tz1b", 400, 0)],
            "YOU",
            columns(),
        )
        .unwrap();

        assert_eq!(
            report.rows.iter().map(|r| r.voter.as_str()).collect::<Vec<_>>(),
            vec!["tz1b", "tz1a"]
        );
        assert_eq!(
            report.rows[1].per_source,
            vec![TokenAmount::from(1000u32), TokenAmount::from(500u32)]
        );
        assert_eq!(
            report.summary,
            Summary {
                yes_count: 1,
                no_count: 1,
                yes_total: 1500u32.into(),
                no_total: 400u32.into(),
            }
        );
        assert_eq!(report.summary.combined_total(), TokenAmount::from(1900u32));
    }

    #[test]
    fn join_must_be_exact() {
        let votes = [vote("tz1a", Ballot::Yes)];
        assert!(matches!(
            build_report(&votes, vec![], "YOU", columns()),
            Err(Error::MissingHoldings(voter)) if voter == "tz1a"
        ));
        assert!(matches!(
            build_report(
                &votes,
                vec![holdings("tz1a", 1, 1), holdings("tz1z", 1, 1)],
                "YOU",
                columns()
            ),
            Err(Error::UnexpectedHoldings(voter)) if voter == "tz1z"
        ));
        assert!(matches!(
            build_report(
                &[vote("tz1a", Ballot::Yes), vote("tz1a", Ballot::No)],
                vec![holdings("tz1a", 1, 1)],
                "YOU",
                columns()
            ),
            Err(Error::DuplicateVoter(_))
        ));
        assert!(matches!(
            build_report(
                &votes,
                vec![holdings("tz1a", 1, 1), holdings("tz1a", 2, 2)],
                "YOU",
                columns()
            ),
            Err(Error::DuplicateVoter(_))
        ));
        assert!(matches!(
            build_report(&votes, vec![holdings("tz1a", 1, 1)], "YOU", vec!["inWallet".to_owned()]),
            Err(Error::ColumnMismatch { .. })
        ));
    }

    #[test]
    fn writes_rows_and_summary() {
        let report = build_report(
            &[vote("tz1a", Ballot::Yes), vote("tz1b", Ballot::No)],
            vec![holdings("tz1a", 1000, 500), holdings("tz1b", 400, 0)],
            "YOU",
            columns(),
        )
        .unwrap();
        let mut out = Vec::new();
        report.write_csv(&mut out).unwrap();

        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Address,Vote,TotalAmount,inWallet,inPool\n\
             tz1a,1,1500,1000,500\n\
             tz1b,0,400,400,0\n\
             Total votes YES,1\n\
             Total votes NO,1\n\
             Total YOU YES,1500\n\
             Total YOU NO,400\n\
             Total YOU VOTED,1900\n"
        );
    }

    #[test]
    fn writes_vote_list() {
        let mut out = Vec::new();
        write_votes_csv(&[vote("tz1a", Ballot::Yes), vote("tz1b", Ballot::No)], &mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Address,Vote\ntz1a,1\ntz1b,0\n"
        );
    }

    #[test]
    fn writes_header_without_votes() {
        let mut out = Vec::new();
        write_votes_csv(&[], &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "Address,Vote\n");
    }

    #[proptest]
    fn summary_matches_rows(
        #[strategy(prop::collection::vec((any::<bool>(), any::<u64>()), 0..30))] entries: Vec<(
            bool,
            u64,
        )>,
    ) {
        let votes = entries
            .iter()
            .enumerate()
            .map(|(i, (yes, _))| {
                vote(
                    &format!("tz1voter{}", i),
                    if *yes { Ballot::Yes } else { Ballot::No },
                )
            })
            .collect::<Vec<_>>();
        let breakdowns = entries
            .iter()
            .enumerate()
            .map(|(i, (_, amount))| holdings(&format!("tz1voter{}", i), *amount, 0))
            .collect();

        let report = build_report(&votes, breakdowns, "YOU", columns()).unwrap();
        let total = entries
            .iter()
            .fold(TokenAmount::default(), |acc, (_, amount)| acc + TokenAmount::from(*amount));

        prop_assert_eq!(report.summary.vote_count(), entries.len());
        prop_assert_eq!(report.summary.combined_total(), total);
        prop_assert_eq!(report.rows.len(), entries.len());
    }
}
