//! Command-line surface: one subcommand per library entry point.
//!
//! Mirrors the teacher's own `ruff::args` in shape (a `clap::Parser` root
//! with a `Subcommand` enum and a shared `LogLevelArgs`-style verbosity
//! group), scaled down to the three operations this crate actually exposes.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::logging::LogLevel;

#[derive(Debug, Parser)]
#[command(name = "pyedit", about = "Structural Python source editor", version)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    #[command(flatten)]
    pub log_level_args: LogLevelArgs,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Replace, insert beside, or delete the construct at `target_scope`.
    Edit(EditCommand),
    /// Print a scope's source, or a truncated outline if it's too large.
    View(ViewCommand),
    /// Apply a unified diff to a file, with fuzzy fallback matching.
    Patch(PatchCommand),
}

#[derive(Debug, clap::Args)]
pub struct EditCommand {
    /// `path.py` or `path.py::Class::method`.
    pub target_scope: String,

    /// New code: a file path, or `-` to read from stdin.
    #[arg(long)]
    pub code: PathOrStdin,

    /// Insert-after anchor: a name, `a::b`, a quoted pattern, or
    /// `__FILE_START__`/`__FILE_END__`. Omit to replace/delete instead.
    #[arg(long = "coscope-with")]
    pub coscope_with: Option<String>,

    /// Allow deleting more than 100 lines in a single call.
    #[arg(long)]
    pub delete_a_lot: bool,
}

#[derive(Debug, clap::Args)]
pub struct ViewCommand {
    /// `path.py` or `path.py::Class::method`.
    pub target_scope: String,

    /// Truncation budget; `<= 0` disables truncation.
    #[arg(long, default_value_t = 500)]
    pub max_lines: i64,
}

#[derive(Debug, clap::Args)]
pub struct PatchCommand {
    /// The file the unified diff applies to.
    pub file_path: String,

    /// Unified-diff content: a file path, or `-` to read from stdin.
    #[arg(long)]
    pub patch: PathOrStdin,
}

/// A CLI value that is either a file path or the literal `-`, meaning
/// "read from stdin" (spec §6a: code/patch bodies are realistically
/// multi-line and not a single argv token).
#[derive(Debug, Clone)]
pub enum PathOrStdin {
    Stdin,
    Path(PathBuf),
}

impl std::str::FromStr for PathOrStdin {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(if s == "-" { PathOrStdin::Stdin } else { PathOrStdin::Path(PathBuf::from(s)) })
    }
}

impl PathOrStdin {
    pub fn read(&self) -> anyhow::Result<String> {
        use std::io::Read;
        match self {
            PathOrStdin::Stdin => {
                let mut buf = String::new();
                std::io::stdin().read_to_string(&mut buf)?;
                Ok(buf)
            }
            PathOrStdin::Path(path) => Ok(std::fs::read_to_string(path)?),
        }
    }
}

#[derive(Debug, Default, Clone, clap::Args)]
pub struct LogLevelArgs {
    /// Show debug-level logging.
    #[arg(long, short, global = true)]
    verbose: bool,
    /// Only show errors and warnings.
    #[arg(long, short, global = true, conflicts_with = "verbose")]
    quiet: bool,
    /// Disable all logging.
    #[arg(long, global = true, conflicts_with_all = ["verbose", "quiet"])]
    silent: bool,
}

impl From<&LogLevelArgs> for LogLevel {
    fn from(args: &LogLevelArgs) -> Self {
        if args.silent {
            LogLevel::Silent
        } else if args.quiet {
            LogLevel::Quiet
        } else if args.verbose {
            LogLevel::Verbose
        } else {
            LogLevel::Default
        }
    }
}
