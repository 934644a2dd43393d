mod holdings;
mod report;
mod votes;

use color_eyre::{eyre::WrapErr, Report};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use structopt::StructOpt;
use tally_toolbox::ProposalConfig;

#[derive(StructOpt)]
#[structopt(rename_all = "kebab-case")]
pub enum Cli {
    /// Collect the latest ballot of every voter
    Votes(votes::Votes),
    /// Show the holdings of some addresses at the cutoff height
    Holdings(holdings::Holdings),
    /// Tally the proposal and write the report
    Report(report::TallyReport),
}

impl Cli {
    pub fn exec(self) -> Result<(), Report> {
        match self {
            Self::Votes(cmd) => cmd.exec(),
            Self::Holdings(cmd) => cmd.exec(),
            Self::Report(cmd) => cmd.exec(),
        }
    }
}

#[derive(StructOpt)]
#[structopt(rename_all = "kebab-case")]
pub struct Common {
    /// Proposal configuration, YAML or JSON
    #[structopt(long, parse(from_os_str))]
    config: PathBuf,

    /// Overrides the configured operations indexer
    #[structopt(long)]
    event_log_url: Option<String>,

    /// Overrides the configured storage indexer
    #[structopt(long)]
    snapshot_url: Option<String>,
}

impl Common {
    pub fn load(&self) -> Result<ProposalConfig, Report> {
        let mut config = ProposalConfig::load(&self.config)
            .wrap_err_with(|| format!("loading {}", self.config.display()))?;
        if let Some(url) = &self.event_log_url {
            config.endpoints.event_log = url.clone();
        }
        if let Some(url) = &self.snapshot_url {
            config.endpoints.snapshot = url.clone();
        }
        Ok(config)
    }
}

fn create_output(path: &Path) -> Result<BufWriter<File>, Report> {
    let file = File::create(path).wrap_err_with(|| format!("creating {}", path.display()))?;
    Ok(BufWriter::new(file))
}
