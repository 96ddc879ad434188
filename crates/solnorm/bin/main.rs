#[macro_use]
extern crate tracing;

mod args;
mod cmd;
mod opts;
mod utils;

use args::{SolnormArgs, SolnormSubcommand};
use clap::Parser;
use eyre::Result;

fn main() -> Result<()> {
    utils::install_error_handler();
    utils::subscriber();
    utils::enable_paint();

    let opts = SolnormArgs::parse();

    match opts.cmd {
        SolnormSubcommand::Payload(cmd) => cmd.run(),
        SolnormSubcommand::Report(cmd) => cmd.run(),
        SolnormSubcommand::Srcmap(cmd) => cmd.run(),
        SolnormSubcommand::Detect(cmd) => cmd.run(),
    }
}
