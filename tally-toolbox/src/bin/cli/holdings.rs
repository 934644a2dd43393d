use super::Common;
use color_eyre::Report;
use itertools::Itertools;
use snapshot_lib::reader::TzktReader;
use snapshot_lib::{resolve_holdings, Address, Snapshot};
use structopt::StructOpt;

#[derive(StructOpt)]
#[structopt(rename_all = "kebab-case")]
pub struct Holdings {
    #[structopt(flatten)]
    common: Common,

    /// Print the breakdowns as JSON
    #[structopt(long)]
    json: bool,

    #[structopt(required = true)]
    addresses: Vec<Address>,
}

impl Holdings {
    pub fn exec(self) -> Result<(), Report> {
        let config = self.common.load()?;
        config.warn_rescaled_farms();
        let reader = TzktReader::new(&config.endpoints.snapshot)?;
        let snapshot = Snapshot::at(&reader, config.cutoff_height);

        for address in &self.addresses {
            let breakdown =
                resolve_holdings(address, snapshot, &config.token.ledger, &config.sources)?;
            if self.json {
                println!("{}", serde_json::to_string(&breakdown)?);
            } else {
                println!(
                    "{} {} {} ({})",
                    breakdown.voter,
                    breakdown.total,
                    config.token.symbol,
                    breakdown
                        .per_source
                        .iter()
                        .map(|entry| format!("{}: {}", entry.source, entry.amount))
                        .join(", ")
                );
            }
        }
        Ok(())
    }
}
