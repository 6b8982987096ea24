//! hec CLI - couples simulated farm water use with a river network.

use clap::Parser;

#[derive(Parser)]
#[command(
    name = "hec-cli",
    version,
    about = "Hydro-economic water allocation toolkit"
)]
struct Cli {
    #[command(subcommand)]
    command: hec_cmd::Command,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    log::debug!("hec-cli {}", env!("CARGO_PKG_VERSION"));
    hec_cmd::run(cli.command)
}
