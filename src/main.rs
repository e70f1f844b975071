use anyhow::Result;
use clap::Parser;
use voxcap::cli::Cli;

fn main() -> Result<()> {
    let cli = Cli::parse();
    voxcap::cli::run(cli)
}
