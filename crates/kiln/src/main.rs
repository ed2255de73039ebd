//! kiln - static function inliner
//!
//! CLI driver that runs the inlining pass over a JSON-serialized program.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};

/// Static function inliner for J2CL output
#[derive(Parser, Debug)]
#[command(name = "kiln")]
#[command(author, version, about = "Inline J2CL runtime helper functions at their call sites")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Output format
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,
}

#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Inline designated static functions into their callers
    Inline(commands::inline::InlineArgs),

    /// Explain a diagnostic code
    Explain(commands::explain::ExplainArgs),
}

/// `RUST_LOG` wins; otherwise `-v` raises the level one step per flag
fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        (false, _) => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let use_color = !cli.no_color && !cli.quiet && atty::is(atty::Stream::Stderr);

    let Some(command) = cli.command else {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        cmd.print_help()?;
        println!();
        return Ok(());
    };

    match command {
        Commands::Inline(args) => commands::inline::run(args, cli.format, use_color, cli.quiet),
        Commands::Explain(args) => commands::explain::run(args, cli.format, use_color),
    }
}
