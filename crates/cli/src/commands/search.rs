use std::io::{Stderr, Stdout};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Args;
use packrat_engine::{Gallery, SearchOutcome, SearchParser, Viewer, search};

use crate::commands::{CommandResult, load_gallery};
use crate::printer::{
    ColorChoice, HumanPrinter, JsonPrinter, OutputFormat, PrinterConfig, QueryPrintContext,
    QueryPrinter, QueryRow,
};

#[derive(Debug, Args)]
pub struct OutputOptions {
    /// Output results as NDJSON (one JSON object per line)
    #[arg(long)]
    pub json: bool,

    /// When to use colors: auto, always, never
    #[arg(long, value_name = "WHEN", default_value = "auto")]
    pub color: String,

    /// Suppress timing statistics
    #[arg(long, short = 'q')]
    pub quiet: bool,
}

impl OutputOptions {
    pub fn printer_config(&self, limit: usize) -> PrinterConfig {
        PrinterConfig {
            format: if self.json {
                OutputFormat::Json
            } else {
                OutputFormat::Human
            },
            color: ColorChoice::from_flag(&self.color),
            limit,
            show_timing: !self.quiet,
        }
    }

    pub fn make_printer(&self, limit: usize) -> Box<dyn QueryPrinter> {
        let cfg = self.printer_config(limit);
        match cfg.format {
            OutputFormat::Human => Box::new(HumanPrinter::<Stdout, Stderr>::stdout(cfg)),
            OutputFormat::Json => Box::new(JsonPrinter::<Stdout, Stderr>::stdout(cfg)),
        }
    }
}

#[derive(Debug, Args)]
pub struct SearchArgs {
    /// The query expression to execute
    pub query: String,

    /// Gallery fixture to search (defaults to the data directory)
    #[arg(long, value_name = "PATH")]
    pub gallery: Option<PathBuf>,

    /// Search as this user; anonymous when omitted
    #[arg(long, value_name = "NAME", conflicts_with = "superuser")]
    pub viewer: Option<String>,

    /// Search with no visibility restrictions
    #[arg(long)]
    pub superuser: bool,

    /// Maximum number of results to display
    #[arg(long, short = 'n', default_value = "20")]
    pub limit: usize,

    #[command(flatten)]
    pub output: OutputOptions,
}

impl SearchArgs {
    pub fn viewer(&self) -> Viewer {
        match (&self.viewer, self.superuser) {
            (_, true) => Viewer::Superuser,
            (Some(name), false) => Viewer::User(name.clone()),
            (None, false) => Viewer::Anonymous,
        }
    }
}

pub fn run(args: SearchArgs) -> ExitCode {
    match execute(&args) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("[error] {e}");
            ExitCode::from(2)
        }
    }
}

fn execute(args: &SearchArgs) -> CommandResult<ExitCode> {
    let gallery = load_gallery(args.gallery.as_deref())?;
    let mut printer = args.output.make_printer(args.limit);
    run_search(&gallery, args, printer.as_mut())
}

/// Search `gallery` and stream the hits to `printer`. Malformed queries exit
/// with status 1.
fn run_search(
    gallery: &Gallery,
    args: &SearchArgs,
    printer: &mut dyn QueryPrinter,
) -> CommandResult<ExitCode> {
    let parser = SearchParser::new(gallery.tags());

    let outcome = match search(gallery, args.viewer(), &parser, &args.query, args.limit) {
        Ok(outcome) => outcome,
        Err(e) => {
            eprintln!("[error] {e} (at offset {})", e.offset());
            return Ok(ExitCode::from(1));
        }
    };

    print_outcome(gallery, &outcome, &args.query, args.limit, printer)?;
    Ok(ExitCode::SUCCESS)
}

fn print_outcome(
    gallery: &Gallery,
    outcome: &SearchOutcome<'_>,
    query: &str,
    limit: usize,
    printer: &mut dyn QueryPrinter,
) -> CommandResult<()> {
    let ctx = QueryPrintContext {
        kind: "search",
        query: Some(query),
        total: outcome.total,
        truncated: outcome.total > limit,
        metrics: Some(&outcome.metrics),
    };

    printer.begin(&ctx)?;

    for hit in &outcome.hits {
        let picture = hit.picture;
        let tags: Vec<String> = picture
            .tags
            .iter()
            .filter_map(|&tag| gallery.tags().canonical(tag))
            .collect();

        let row = QueryRow {
            rank: hit.rank,
            id: picture.id,
            owner: &picture.owner,
            visibility: picture.visibility.as_str(),
            created: picture.created,
            tags: &tags,
        };
        printer.print_row(&row, &ctx)?;
    }

    printer.finish(&ctx)?;

    Ok(())
}

#[cfg(test)]
#[path = "search_tests.rs"]
mod tests;
