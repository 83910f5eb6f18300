mod cli;
mod config;
mod interval;
mod overlap;
mod peak;
mod process;
mod reader;

#[macro_use]
extern crate log;
#[macro_use]
extern crate anyhow;

use anyhow::Context;

fn main() -> anyhow::Result<()> {
    let cfg = cli::handle_cli().with_context(|| "Error processing command line arguments")?;
    process::run(&cfg)
}
