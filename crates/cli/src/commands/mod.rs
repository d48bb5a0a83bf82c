pub mod parse;
pub mod search;

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Subcommand;
use log::debug;
use packrat_engine::Gallery;
use packrat_runtime::default_gallery_path;

pub use parse::ParseArgs;
pub use search::SearchArgs;

/// Common error type for command handlers
pub type CommandResult<T> = Result<T, Box<dyn std::error::Error>>;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compile a query and print the resulting predicate.
    ///
    /// Example:
    ///   packrat parse 'sea -owner:bob'
    ///   packrat parse --json 'created:>=2020 :trip:paris*'
    Parse(ParseArgs),

    /// Search the gallery as a given viewer.
    ///
    /// Example:
    ///   packrat search 'family created:2020'
    ///   packrat search --viewer bob -n 5 'vis:restricted|vis:private'
    Search(SearchArgs),
}

/// Load the gallery fixture at `path`, or the default location.
pub fn load_gallery(path: Option<&Path>) -> anyhow::Result<Gallery> {
    let path: PathBuf = path.map_or_else(default_gallery_path, Path::to_path_buf);
    debug!("loading gallery from {}", path.display());

    Gallery::load(&path).with_context(|| format!("failed to load gallery from {}", path.display()))
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
