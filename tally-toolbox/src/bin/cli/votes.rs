use super::{create_output, Common};
use color_eyre::Report;
use std::path::PathBuf;
use structopt::StructOpt;
use tally_toolbox::collect_votes;
use tally_toolbox::report::write_votes_csv;
use tally_toolbox::votes::BetterCallDev;

#[derive(StructOpt)]
#[structopt(rename_all = "kebab-case")]
pub struct Votes {
    #[structopt(flatten)]
    common: Common,

    /// Defaults to `ballots-<name>.csv`
    #[structopt(long, parse(from_os_str))]
    output: Option<PathBuf>,
}

impl Votes {
    pub fn exec(self) -> Result<(), Report> {
        let config = self.common.load()?;
        let log = BetterCallDev::new(
            &config.endpoints.event_log,
            &config.network,
            &config.governance_contract,
        )?
        .with_request_delay(config.pacing());

        let votes = collect_votes(&log, &config.proposal_hash, config.cutoff_height)?;
        log::info!("collected {} votes", votes.len());

        let output = self.output.unwrap_or_else(|| config.default_ballots_output());
        write_votes_csv(&votes, create_output(&output)?)?;
        Ok(())
    }
}
