mod cli;

use color_eyre::Report;
use structopt::StructOpt;

fn main() -> Result<(), Report> {
    color_eyre::install()?;
    env_logger::init();
    cli::Cli::from_args().exec()
}
