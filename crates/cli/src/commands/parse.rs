use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Args;
use packrat_engine::{Query, SearchParser, TagHierarchy};

use crate::commands::{CommandResult, load_gallery};

#[derive(Debug, Args)]
pub struct ParseArgs {
    /// The query expression to compile
    pub query: String,

    /// Print the predicate as JSON instead of an s-expression
    #[arg(long)]
    pub json: bool,

    /// Resolve qualified tags against this gallery fixture
    #[arg(long, value_name = "PATH")]
    pub gallery: Option<PathBuf>,
}

pub fn run(args: ParseArgs) -> ExitCode {
    match execute(&args, &mut io::stdout()) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("[error] {e}");
            ExitCode::from(2)
        }
    }
}

fn execute<W: Write>(args: &ParseArgs, out: &mut W) -> CommandResult<ExitCode> {
    // Without a gallery every qualified tag is unknown and matches nothing.
    let query = match &args.gallery {
        Some(path) => {
            let gallery = load_gallery(Some(path.as_path()))?;
            compile(gallery.tags(), &args.query)
        }
        None => compile(&packrat_engine::NoTags, &args.query),
    };

    match query {
        Ok(query) => {
            write_query(out, &query, args.json)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            eprintln!("[error] {e} (at offset {})", e.offset());
            Ok(ExitCode::from(1))
        }
    }
}

fn compile<H: TagHierarchy + ?Sized>(
    tags: &H,
    input: &str,
) -> Result<Query, packrat_engine::SearchError> {
    SearchParser::new(tags).parse(input)
}

fn write_query<W: Write>(out: &mut W, query: &Query, json: bool) -> CommandResult<()> {
    if json {
        serde_json::to_writer_pretty(&mut *out, &query.predicate)?;
        writeln!(out)?;
    } else {
        writeln!(out, "{}", query.predicate)?;
    }
    Ok(())
}

#[cfg(test)]
#[path = "parse_tests.rs"]
mod tests;
