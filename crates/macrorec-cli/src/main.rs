//! # macrorec
//!
//! Command-line front end of the macro recorder.
//!
//! - `macrorec replay <log>` feeds a JSON-lines host-event log through the
//!   engine and prints the resulting macro stream as JSON lines on stdout
//! - `macrorec diff <before> <after>` prints the reconciliation macros that
//!   turn one file into the other

#![deny(unsafe_code)]

mod diff;
mod replay;

use std::io::{BufReader, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use macrorec_core::logging::{init_json_subscriber, init_subscriber};
use macrorec_settings::{MacroRecorderSettings, get_settings, init_settings, load_settings_from_path};
use tracing::info;

/// Macro recorder tools.
#[derive(Parser, Debug)]
#[command(name = "macrorec", version, about = "Record editing macros from host event logs")]
struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    command: Command,

    /// Settings file (defaults to `~/.macrorec/settings.json`).
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Log level, overriding the settings (`RUST_LOG` still wins).
    #[arg(long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Replay a host-event log and print the macro stream.
    Replay {
        /// JSON-lines event log, or `-` for stdin.
        log: PathBuf,

        /// Also print raw macros, wrapped as `{"raw": ...}`.
        #[arg(long)]
        raw: bool,

        /// Source roots relative to each project, for package names.
        #[arg(long = "source-root", default_value = "src")]
        source_roots: Vec<String>,
    },

    /// Print the macros that turn one file into another.
    Diff {
        /// Original file.
        before: PathBuf,

        /// Changed file.
        after: PathBuf,

        /// Report the change as expected (`AUTO_DIFF`) rather than irregular.
        #[arg(long)]
        expected: bool,
    },
}

/// Install the settings file named on the command line as the global
/// settings, falling back to the default location.
fn load_settings(path: Option<&PathBuf>) -> Result<&'static MacroRecorderSettings> {
    if let Some(path) = path {
        let settings = load_settings_from_path(path)
            .with_context(|| format!("failed to load settings from {}", path.display()))?;
        let _ = init_settings(settings);
    }
    Ok(get_settings())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = load_settings(cli.settings.as_ref())?;

    let level = cli.log_level.as_deref().unwrap_or(&settings.logging.level);
    if settings.logging.json {
        init_json_subscriber(level);
    } else {
        init_subscriber(level);
    }

    let stdout = std::io::stdout();
    match cli.command {
        Command::Replay {
            log,
            raw,
            source_roots,
        } => {
            let options = replay::ReplayOptions { raw, source_roots };
            let out = Box::new(stdout) as Box<dyn Write + Send>;
            let stats = if log.as_os_str() == "-" {
                replay::replay(std::io::stdin().lock(), settings.clone(), options, out)?
            } else {
                let file = std::fs::File::open(&log)
                    .with_context(|| format!("failed to open event log {}", log.display()))?;
                replay::replay(BufReader::new(file), settings.clone(), options, out)?
            };
            info!(events = stats.events, skipped = stats.skipped, "replay finished");
        }
        Command::Diff {
            before,
            after,
            expected,
        } => {
            let mut out = stdout.lock();
            let count = diff::diff_files(&before, &after, settings.diff.edit_cost, expected, &mut out)?;
            info!(count, "diff finished");
        }
    }
    Ok(())
}
