use chrono::NaiveDateTime;
use packrat_engine::SearchMetrics;
use std::io::{self, Write};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output with optional colors.
    #[default]
    Human,
    /// NDJSON (newline-delimited JSON) for machine consumption.
    Json,
}

/// Color handling strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ColorChoice {
    /// Enable colors when stdout is a terminal.
    #[default]
    Auto,
    Always,
    Never,
}

impl ColorChoice {
    /// Unknown values fall back to `Auto`.
    pub fn from_flag(value: &str) -> Self {
        match value {
            "always" => ColorChoice::Always,
            "never" => ColorChoice::Never,
            _ => ColorChoice::Auto,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PrinterConfig {
    pub format: OutputFormat,
    pub color: ColorChoice,
    /// Maximum number of results printed.
    pub limit: usize,
    /// Whether to show timing statistics.
    pub show_timing: bool,
}

impl Default for PrinterConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Human,
            color: ColorChoice::Auto,
            limit: 20,
            show_timing: true,
        }
    }
}

/// Human-readable printer with optional color support.
pub struct HumanPrinter<W: Write, E: Write> {
    out: W,
    err: E,
    cfg: PrinterConfig,
    use_color: bool,
}

impl<W: Write, E: Write> HumanPrinter<W, E> {
    /// `Auto` means no color here: arbitrary writers cannot be probed for a
    /// terminal. Use [`HumanPrinter::stdout`] for detection.
    pub fn new(out: W, err: E, cfg: PrinterConfig) -> Self {
        let use_color = cfg.color == ColorChoice::Always;
        Self {
            out,
            err,
            cfg,
            use_color,
        }
    }

    pub fn stdout(cfg: PrinterConfig) -> HumanPrinter<io::Stdout, io::Stderr> {
        use std::io::IsTerminal;

        let use_color = match cfg.color {
            ColorChoice::Always => true,
            ColorChoice::Never => false,
            ColorChoice::Auto => io::stdout().is_terminal(),
        };

        HumanPrinter {
            out: io::stdout(),
            err: io::stderr(),
            cfg,
            use_color,
        }
    }

    #[cfg(test)]
    pub fn into_parts(self) -> (W, E) {
        (self.out, self.err)
    }

    #[inline]
    fn paint(&self, code: &str, text: &str) -> String {
        if self.use_color {
            format!("\x1b[{code}m{text}\x1b[0m")
        } else {
            text.to_owned()
        }
    }
}

pub struct JsonPrinter<W: Write, E: Write> {
    out: W,
    err: E,
    cfg: PrinterConfig,
}

impl<W: Write, E: Write> JsonPrinter<W, E> {
    pub fn new(out: W, err: E, cfg: PrinterConfig) -> Self {
        Self { out, err, cfg }
    }

    pub fn stdout(cfg: PrinterConfig) -> JsonPrinter<io::Stdout, io::Stderr> {
        JsonPrinter {
            out: io::stdout(),
            err: io::stderr(),
            cfg,
        }
    }

    #[cfg(test)]
    pub fn into_parts(self) -> (W, E) {
        (self.out, self.err)
    }
}

/// Static context about a print run.
#[derive(Debug)]
pub struct QueryPrintContext<'a> {
    pub kind: &'a str,
    pub query: Option<&'a str>,
    /// Total number of matches before the limit.
    pub total: usize,
    pub truncated: bool,
    pub metrics: Option<&'a SearchMetrics>,
}

/// One picture in the result stream.
#[derive(Debug)]
pub struct QueryRow<'a> {
    /// 1-based rank of this result.
    pub rank: usize,
    pub id: u64,
    pub owner: &'a str,
    pub visibility: &'a str,
    pub created: NaiveDateTime,
    /// Canonical `:a:b:c` paths.
    pub tags: &'a [String],
}

pub trait QueryPrinter {
    /// Called once before any rows are printed.
    fn begin(&mut self, ctx: &QueryPrintContext) -> io::Result<()>;

    fn print_row(&mut self, row: &QueryRow<'_>, ctx: &QueryPrintContext) -> io::Result<()>;

    /// Called once after all rows are printed, for footers and timing.
    fn finish(&mut self, ctx: &QueryPrintContext) -> io::Result<()>;
}

fn millis(d: Option<std::time::Duration>) -> f64 {
    d.unwrap_or_default().as_secs_f64() * 1000.0
}

impl<W: Write, E: Write> QueryPrinter for HumanPrinter<W, E> {
    fn begin(&mut self, _ctx: &QueryPrintContext) -> io::Result<()> {
        Ok(())
    }

    fn print_row(&mut self, row: &QueryRow<'_>, _ctx: &QueryPrintContext) -> io::Result<()> {
        let id = self.paint("32", &format!("#{}", row.id));
        let created = row.created.format("%Y-%m-%d %H:%M");
        write!(
            self.out,
            "{:>3}  {}  {}  {}  {}",
            row.rank, id, created, row.owner, row.visibility
        )?;
        if !row.tags.is_empty() {
            let tags = self.paint("36", &row.tags.join(" "));
            write!(self.out, "  {tags}")?;
        }
        writeln!(self.out)
    }

    fn finish(&mut self, ctx: &QueryPrintContext) -> io::Result<()> {
        if ctx.truncated {
            let remaining = ctx.total.saturating_sub(self.cfg.limit);
            writeln!(self.out, "... and {remaining} more results")?;
        }

        if self.cfg.show_timing
            && let Some(m) = ctx.metrics
        {
            writeln!(
                self.err,
                "\n[{}] {} results in {:.2}ms (parse: {:.2}ms, exec: {:.2}ms, order: {:.2}ms)",
                ctx.kind,
                ctx.total,
                m.total().as_secs_f64() * 1000.0,
                millis(m.parse_time),
                millis(m.exec_time),
                millis(m.order_time),
            )?;
        }

        Ok(())
    }
}

impl<W: Write, E: Write> QueryPrinter for JsonPrinter<W, E> {
    fn begin(&mut self, _ctx: &QueryPrintContext) -> io::Result<()> {
        Ok(())
    }

    fn print_row(&mut self, row: &QueryRow<'_>, ctx: &QueryPrintContext) -> io::Result<()> {
        let obj = serde_json::json!({
            "kind": ctx.kind,
            "query": ctx.query,
            "rank": row.rank,
            "id": row.id,
            "owner": row.owner,
            "visibility": row.visibility,
            "created": row.created,
            "tags": row.tags,
        });
        writeln!(self.out, "{obj}")
    }

    fn finish(&mut self, ctx: &QueryPrintContext) -> io::Result<()> {
        if self.cfg.show_timing
            && let Some(m) = ctx.metrics
        {
            let obj = serde_json::json!({
                "type": "summary",
                "kind": ctx.kind,
                "query": ctx.query,
                "total": ctx.total,
                "truncated": ctx.truncated,
                "timing_ms": {
                    "total": m.total().as_secs_f64() * 1000.0,
                    "parse": millis(m.parse_time),
                    "exec": millis(m.exec_time),
                    "order": millis(m.order_time),
                }
            });
            writeln!(self.err, "{obj}")?;
        }

        Ok(())
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
