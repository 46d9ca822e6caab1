//! Reporting batch progress to the console

use std::io::{self, Write};
use std::path::Path;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use crate::batch::{BatchReporter, BatchSummary};
use crate::error::Error;

/// Prints `Fixed: <path>` as files are rewritten and a count at the end.
pub struct ConsoleReporter {
    stdout: StandardStream,
    stderr: StandardStream,
}

impl ConsoleReporter {
    pub fn new(use_color: bool) -> Self {
        let choice = if use_color {
            ColorChoice::Auto
        } else {
            ColorChoice::Never
        };
        Self {
            stdout: StandardStream::stdout(choice),
            stderr: StandardStream::stderr(choice),
        }
    }
}

fn verb(dry_run: bool) -> &'static str {
    if dry_run { "Would fix" } else { "Fixed" }
}

/// Format the closing count line.
pub fn summary_line(count: usize, dry_run: bool) -> String {
    format!("{} {} files", verb(dry_run), count)
}

impl BatchReporter for ConsoleReporter {
    fn file_fixed(&mut self, path: &Path, dry_run: bool) -> io::Result<()> {
        self.stdout
            .set_color(ColorSpec::new().set_fg(Some(Color::Green)).set_bold(true))?;
        write!(self.stdout, "{}:", verb(dry_run))?;
        self.stdout.reset()?;
        writeln!(self.stdout, " {}", path.display())
    }

    fn file_failed(&mut self, path: &Path, error: &Error) -> io::Result<()> {
        self.stderr
            .set_color(ColorSpec::new().set_fg(Some(Color::Red)).set_bold(true))?;
        write!(self.stderr, "Failed:")?;
        self.stderr.reset()?;
        writeln!(self.stderr, " {}: {}", path.display(), error)
    }

    fn finish(&mut self, summary: &BatchSummary) -> io::Result<()> {
        writeln!(self.stdout)?;
        writeln!(self.stdout, "{}", summary_line(summary.fixed_count(), summary.dry_run))?;
        if !summary.failed.is_empty() {
            self.stderr.set_color(ColorSpec::new().set_fg(Some(Color::Red)))?;
            writeln!(self.stderr, "Failed {} files", summary.failed.len())?;
            self.stderr.reset()?;
        }
        self.stdout.flush()
    }
}

/// Stays quiet while running and prints the summary as JSON at the end.
#[derive(Debug, Default)]
pub struct JsonReporter;

impl BatchReporter for JsonReporter {
    fn file_fixed(&mut self, _path: &Path, _dry_run: bool) -> io::Result<()> {
        Ok(())
    }

    fn file_failed(&mut self, _path: &Path, _error: &Error) -> io::Result<()> {
        Ok(())
    }

    fn finish(&mut self, summary: &BatchSummary) -> io::Result<()> {
        print_json(summary)
    }
}

/// Print a batch summary as pretty-printed JSON to stdout.
pub fn print_json(summary: &BatchSummary) -> io::Result<()> {
    let json = serde_json::to_string_pretty(summary).map_err(io::Error::other)?;
    println!("{}", json);
    Ok(())
}
