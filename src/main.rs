//! CLI entry point for reimport

use std::io::IsTerminal;
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use reimport::{
    Batch, BatchConfig, BatchReporter, ConsoleReporter, ErrorPolicy, JsonReporter, RuleSet,
    relative_import_path,
};
use tracing_subscriber::EnvFilter;

/// Color output mode
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
enum ColorMode {
    /// Auto-detect based on terminal and environment
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

/// Determine whether to use color output based on mode and environment.
fn should_use_color(mode: ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => {
            // Respect NO_COLOR environment variable (https://no-color.org/)
            if std::env::var_os("NO_COLOR").is_some() {
                return false;
            }
            if std::env::var_os("FORCE_COLOR").is_some() {
                return true;
            }
            if std::env::var("TERM").map(|t| t == "dumb").unwrap_or(false) {
                return false;
            }
            std::io::stdout().is_terminal()
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "reimport")]
#[command(about = "Rewrite import statements after a source tree reorganization")]
#[command(version)]
#[command(args_conflicts_with_subcommands = true)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Root directory to rewrite
    #[arg(default_value = "lib")]
    root: PathBuf,

    /// JSON rule set to use instead of the built-in one
    #[arg(short = 'r', long = "rules", value_name = "FILE")]
    rules: Option<PathBuf>,

    /// Show which files would change without writing them
    #[arg(short = 'n', long = "dry-run")]
    dry_run: bool,

    /// Skip files that cannot be read or written and report them at the end
    #[arg(short = 'k', long = "keep-going")]
    keep_going: bool,

    /// Skip files matched by .gitignore and .ignore
    #[arg(short = 'g', long = "gitignore")]
    gitignore: bool,

    /// Refuse to run if a file to rewrite has uncommitted git changes
    #[arg(long = "require-clean")]
    require_clean: bool,

    /// Print the run summary as JSON
    #[arg(long = "json")]
    json: bool,

    /// Control color output: auto, always, never
    #[arg(long = "color", value_name = "WHEN", default_value = "auto")]
    color: ColorMode,

    /// Increase log verbosity (-v info, -vv debug); RUST_LOG overrides
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the effective rule set as JSON
    Rules {
        /// JSON rule set to print instead of the built-in one
        #[arg(short = 'r', long = "rules", value_name = "FILE")]
        rules: Option<PathBuf>,
    },
    /// Print the import path from one file to another
    Relpath {
        /// File containing the import
        from: PathBuf,
        /// File being imported
        to: PathBuf,
    },
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn load_rules(path: Option<&PathBuf>) -> RuleSet {
    let loaded = match path {
        Some(p) => RuleSet::from_path(p),
        None => Ok(RuleSet::builtin()),
    };
    loaded.unwrap_or_else(|e| {
        eprintln!("reimport: {}", e);
        process::exit(1);
    })
}

fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    match args.command {
        Some(Command::Rules { ref rules }) => {
            let json = load_rules(rules.as_ref()).to_json().unwrap_or_else(|e| {
                eprintln!("reimport: {}", e);
                process::exit(1);
            });
            println!("{}", json);
            return;
        }
        Some(Command::Relpath { ref from, ref to }) => match relative_import_path(from, to) {
            Some(rel) => {
                println!("{}", rel);
                return;
            }
            None => {
                eprintln!(
                    "reimport: no relative path from '{}' to '{}'",
                    from.display(),
                    to.display()
                );
                process::exit(1);
            }
        },
        None => {}
    }

    let rules = load_rules(args.rules.as_ref());
    let config = BatchConfig {
        dry_run: args.dry_run,
        on_error: if args.keep_going {
            ErrorPolicy::Continue
        } else {
            ErrorPolicy::Abort
        },
        respect_gitignore: args.gitignore,
        require_clean: args.require_clean,
    };

    let batch = Batch::new(&rules, config).unwrap_or_else(|e| {
        eprintln!("reimport: {}", e);
        process::exit(1);
    });

    let mut reporter: Box<dyn BatchReporter> = if args.json {
        Box::new(JsonReporter)
    } else {
        Box::new(ConsoleReporter::new(should_use_color(args.color)))
    };

    match batch.run(&args.root, reporter.as_mut()) {
        Ok(summary) if summary.is_success() => {}
        Ok(_) => process::exit(1),
        Err(e) => {
            eprintln!("reimport: {}", e);
            process::exit(1);
        }
    }
}
