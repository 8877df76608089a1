//! Strobe CLI: the command-line interface for the strobe simulator.
//!
//! Provides `strobe run` for a seeded random stream through the valid/ready
//! stage, `strobe check` for the directed scenarios, and `strobe inspect`
//! for the published signal table.

#![warn(missing_docs)]

mod check;
mod inspect;
mod pipeline;
mod run;

use std::process;

use clap::{Parser, Subcommand, ValueEnum};

/// Strobe: a trigger-driven valid/ready pipeline simulator.
#[derive(Parser, Debug)]
#[command(name = "strobe", version, about = "Strobe valid/ready pipeline simulator")]
pub struct Cli {
    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose output (per-evaluation statistics and triggers).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Control colored output.
    #[arg(long, global = true, value_enum, default_value_t = ColorChoice::Auto)]
    pub color: ColorChoice,

    /// Path to a `strobe.toml` file or the directory containing it.
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a seeded random producer/consumer stream and scoreboard it.
    Run(RunArgs),
    /// Run the directed handshake scenarios.
    Check(CheckArgs),
    /// Print the published signal table.
    Inspect(InspectArgs),
}

/// Arguments for the `strobe run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Number of producer/consumer rounds (overrides `stimulus.transactions`).
    #[arg(long)]
    pub cycles: Option<u32>,

    /// RNG seed (overrides `stimulus.seed`).
    #[arg(long)]
    pub seed: Option<u64>,

    /// Output path for the JSON-lines trace.
    #[arg(short, long)]
    pub trace: Option<String>,

    /// Disable trace recording.
    #[arg(long, conflicts_with = "trace")]
    pub no_trace: bool,

    /// Output format for diagnostics.
    #[arg(short, long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,
}

/// Arguments for the `strobe check` subcommand.
#[derive(Parser, Debug)]
pub struct CheckArgs {
    /// Substring filter for scenario names.
    #[arg(long)]
    pub filter: Option<String>,

    /// Output format for diagnostics.
    #[arg(short, long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,
}

/// Arguments for the `strobe inspect` subcommand.
#[derive(Parser, Debug)]
pub struct InspectArgs {
    /// Output format for the signal table.
    #[arg(short, long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,
}

/// Controls whether colored output is produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ColorChoice {
    /// Detect from terminal capabilities.
    Auto,
    /// Always produce colored output.
    Always,
    /// Never produce colored output.
    Never,
}

/// Report output format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Human-readable terminal output.
    Text,
    /// Machine-readable JSON output.
    Json,
}

/// Global settings derived from CLI flags.
pub struct GlobalArgs {
    /// Whether to suppress non-error output.
    pub quiet: bool,
    /// Whether to print verbose information.
    pub verbose: bool,
    /// Whether to use colored output.
    pub color: bool,
    /// Optional path to a config file or project directory.
    pub config: Option<String>,
}

fn main() {
    let cli = Cli::parse();

    let color = match cli.color {
        ColorChoice::Auto => std::io::IsTerminal::is_terminal(&std::io::stderr()),
        ColorChoice::Always => true,
        ColorChoice::Never => false,
    };

    let global = GlobalArgs {
        quiet: cli.quiet,
        verbose: cli.verbose && !cli.quiet,
        color,
        config: cli.config,
    };

    let result = match cli.command {
        Command::Run(ref args) => run::run(args, &global),
        Command::Check(ref args) => check::run(args, &global),
        Command::Inspect(ref args) => inspect::run(args, &global),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn parse_run_default() {
        let cli = Cli::parse_from(["strobe", "run"]);
        match cli.command {
            Command::Run(ref args) => {
                assert!(args.cycles.is_none());
                assert!(args.seed.is_none());
                assert!(args.trace.is_none());
                assert!(!args.no_trace);
                assert_eq!(args.format, ReportFormat::Text);
            }
            _ => panic!("expected Run command"),
        }
    }

    #[test]
    fn parse_run_with_args() {
        let cli = Cli::parse_from([
            "strobe",
            "run",
            "--cycles",
            "500",
            "--seed",
            "42",
            "--trace",
            "out/run.jsonl",
            "--format",
            "json",
        ]);
        match cli.command {
            Command::Run(ref args) => {
                assert_eq!(args.cycles, Some(500));
                assert_eq!(args.seed, Some(42));
                assert_eq!(args.trace.as_deref(), Some("out/run.jsonl"));
                assert_eq!(args.format, ReportFormat::Json);
            }
            _ => panic!("expected Run command"),
        }
    }

    #[test]
    fn trace_and_no_trace_conflict() {
        let result = Cli::try_parse_from(["strobe", "run", "--trace", "a.jsonl", "--no-trace"]);
        assert!(result.is_err());
    }

    #[test]
    fn parse_check_filter() {
        let cli = Cli::parse_from(["strobe", "check", "--filter", "stall"]);
        match cli.command {
            Command::Check(ref args) => assert_eq!(args.filter.as_deref(), Some("stall")),
            _ => panic!("expected Check command"),
        }
    }

    #[test]
    fn parse_inspect_json() {
        let cli = Cli::parse_from(["strobe", "inspect", "-f", "json"]);
        match cli.command {
            Command::Inspect(ref args) => assert_eq!(args.format, ReportFormat::Json),
            _ => panic!("expected Inspect command"),
        }
    }

    #[test]
    fn parse_global_flags() {
        let cli = Cli::parse_from(["strobe", "--quiet", "--color", "never", "check"]);
        assert!(cli.quiet);
        assert!(!cli.verbose);
        assert_eq!(cli.color, ColorChoice::Never);
    }

    #[test]
    fn parse_global_after_subcommand() {
        let cli = Cli::parse_from(["strobe", "run", "--verbose", "--config", "proj/strobe.toml"]);
        assert!(cli.verbose);
        assert_eq!(cli.config.as_deref(), Some("proj/strobe.toml"));
    }

    #[test]
    fn missing_subcommand_rejected() {
        assert!(Cli::try_parse_from(["strobe"]).is_err());
    }
}
