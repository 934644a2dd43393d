use super::{create_output, Common};
use color_eyre::Report;
use snapshot_lib::reader::TzktReader;
use std::path::PathBuf;
use structopt::StructOpt;
use tally_toolbox::votes::BetterCallDev;

#[derive(StructOpt)]
#[structopt(rename_all = "kebab-case")]
pub struct TallyReport {
    #[structopt(flatten)]
    common: Common,

    /// Defaults to `votes-<name>.csv`
    #[structopt(long, parse(from_os_str))]
    output: Option<PathBuf>,

    /// Delay between requests, overrides the configured one
    #[structopt(long)]
    pacing_ms: Option<u64>,
}

impl TallyReport {
    pub fn exec(self) -> Result<(), Report> {
        let mut config = self.common.load()?;
        if let Some(pacing_ms) = self.pacing_ms {
            config.pacing_ms = pacing_ms;
        }
        let log = BetterCallDev::new(
            &config.endpoints.event_log,
            &config.network,
            &config.governance_contract,
        )?
        .with_request_delay(config.pacing());
        let reader = TzktReader::new(&config.endpoints.snapshot)?;

        let report = tally_toolbox::run(&config, &log, &reader, config.pacing())?;

        let output = self.output.unwrap_or_else(|| config.default_output());
        report.write_csv(create_output(&output)?)?;
        log::info!("report written to {}", output.display());
        Ok(())
    }
}
