use std::process::ExitCode;

use clap::Parser;

mod commands;
mod printer;

use commands::Command;
use packrat_runtime::logging;

#[derive(Debug, Parser)]
#[command(
    name = "packrat",
    version,
    about = "Search a photo gallery with a compact query language",
    propagate_version = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

fn main() -> ExitCode {
    logging::init().ok();

    let cli = Cli::parse();
    match cli.command {
        Command::Parse(args) => commands::parse::run(args),
        Command::Search(args) => commands::search::run(args),
    }
}
