//! Inline command - run the inlining pass over a program

use anyhow::{anyhow, Context, Result};
use clap::{Args, ValueEnum};
use kiln_ast::{print_program, Program};
use kiln_diagnostics::{
    Diagnostic, DiagnosticCode, DiagnosticEmitter, Diagnostics, JsonEmitter, SimpleEmitter,
};
use kiln_transform::{DuplicatePolicy, InlineConfig, InlineReport, StaticFunctionInliner};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::OutputFormat;

/// Config file picked up from the working directory when `--config` is absent
const DEFAULT_CONFIG_FILE: &str = "kiln.toml";

#[derive(Args, Debug)]
pub struct InlineArgs {
    /// Program to rewrite, as JSON
    pub input: PathBuf,

    /// Inline targets (defaults to ./kiln.toml, then to the J2CL runtime helpers)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Representation of the rewritten program
    #[arg(long, value_enum, default_value = "json")]
    pub emit: Emit,

    /// Write the rewritten program here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Keep the first definition when a function is defined more than once
    #[arg(long)]
    pub first_wins: bool,

    /// Treat warnings as errors
    #[arg(long)]
    pub strict: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum Emit {
    /// The program as JSON, readable by `kiln inline` again
    Json,
    /// JavaScript-like source text
    Js,
}

/// Read the explicit config, else `kiln.toml` in `dir`, else the J2CL defaults
pub fn load_config(explicit: Option<&Path>, dir: &Path) -> Result<InlineConfig> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => {
            let candidate = dir.join(DEFAULT_CONFIG_FILE);
            if !candidate.is_file() {
                log::debug!("no {}, using J2CL defaults", DEFAULT_CONFIG_FILE);
                return Ok(InlineConfig::j2cl());
            }
            candidate
        }
    };

    let content = fs::read_to_string(&path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let config: InlineConfig = toml::from_str(&content)
        .with_context(|| format!("invalid config {}", path.display()))?;
    if config.targets.is_empty() {
        return Err(anyhow!("{} declares no [[target]]", path.display()));
    }
    log::debug!(
        "loaded {} target(s) from {}",
        config.targets.len(),
        path.display()
    );
    Ok(config)
}

fn read_program(path: &Path) -> Result<Program> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("{} is not a serialized program", path.display()))
}

fn render(program: &Program, emit: Emit) -> Result<String> {
    Ok(match emit {
        Emit::Json => serde_json::to_string_pretty(program)? + "\n",
        Emit::Js => print_program(program),
    })
}

pub fn run(args: InlineArgs, format: OutputFormat, use_color: bool, quiet: bool) -> Result<()> {
    let cwd = std::env::current_dir().context("failed to read the working directory")?;
    let mut config = load_config(args.config.as_deref(), &cwd)?;
    if args.first_wins {
        config = config.with_duplicate_policy(DuplicatePolicy::FirstWins);
    }

    let mut program = read_program(&args.input)?;

    let report = match StaticFunctionInliner::new(config).run(&mut program) {
        Ok(report) => report,
        Err(err) => {
            let mut diagnostics = Diagnostics::new();
            diagnostics.push(
                Diagnostic::new(DiagnosticCode::InternalError, err.to_string())
                    .with_unit(args.input.display().to_string())
                    .build(),
            );
            emit_diagnostics(&diagnostics, format)?;
            return Err(anyhow!("inlining failed: {}", err));
        }
    };

    let rendered = render(&program, args.emit)?;
    match &args.output {
        Some(path) => fs::write(path, rendered)
            .with_context(|| format!("failed to write {}", path.display()))?,
        None => std::io::stdout().lock().write_all(rendered.as_bytes())?,
    }

    if !quiet || report.diagnostics.has_errors() {
        emit_diagnostics(&report.diagnostics, format)?;
    }
    if !quiet {
        print_summary(&report, format, use_color)?;
    }

    let warnings = report.diagnostics.warning_count();
    if args.strict && warnings > 0 {
        return Err(anyhow!("{} warning(s) with --strict", warnings));
    }
    Ok(())
}

fn emit_diagnostics(diagnostics: &Diagnostics, format: OutputFormat) -> Result<()> {
    let stderr = std::io::stderr();
    match format {
        OutputFormat::Text => SimpleEmitter::new(stderr.lock()).emit_all(diagnostics)?,
        OutputFormat::Json => JsonEmitter::new(stderr.lock()).emit_all(diagnostics)?,
    }
    Ok(())
}

/// The summary goes to stderr so stdout carries only the program
fn print_summary(report: &InlineReport, format: OutputFormat, use_color: bool) -> Result<()> {
    let stats = &report.stats;
    match format {
        OutputFormat::Text => {
            let headline = format!(
                "Inlined {} call(s) ({} direct, {} block)",
                stats.inlined(),
                stats.inlined_direct,
                stats.inlined_block
            );
            if use_color {
                eprintln!("{}", console::style(headline).green().bold());
            } else {
                eprintln!("{}", headline);
            }
            eprintln!(
                "  {} target(s), {} definition(s) collected, {} call(s) left in place",
                stats.targets, stats.collected, stats.skipped
            );
            eprintln!("  {} body(ies) changed", report.changes.len());
        }
        OutputFormat::Json => {
            let summary = serde_json::json!({
                "type": "summary",
                "changed": report.changed(),
                "stats": stats,
                "changes": report.changes,
                "warnings": report.diagnostics.warning_count(),
                "hints": report.diagnostics.hint_count(),
            });
            eprintln!("{}", serde_json::to_string(&summary)?);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_ast::builder::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("kiln-{}-{}", name, std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_defaults_without_config_file() {
        let dir = scratch_dir("defaults");
        let config = load_config(None, &dir).unwrap();
        assert_eq!(config, InlineConfig::j2cl());
    }

    #[test]
    fn test_config_file_in_directory() {
        let dir = scratch_dir("dirconfig");
        fs::write(
            dir.join(DEFAULT_CONFIG_FILE),
            "[[target]]\nhost = \"A.impl.js\"\nfunctions = [\"f\"]\n",
        )
        .unwrap();
        let config = load_config(None, &dir).unwrap();
        assert_eq!(config.targets.len(), 1);
        assert_eq!(config.targets[0].host, "A.impl.js");
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_config_without_targets_is_rejected() {
        let dir = scratch_dir("empty");
        let path = dir.join("empty.toml");
        fs::write(&path, "duplicate_policy = \"last-wins\"\n").unwrap();
        let err = load_config(Some(&path), &dir).unwrap_err();
        assert!(err.to_string().contains("no [[target]]"));
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_program_json_round_trips_through_render() {
        let mut program = Program::new();
        program.add_unit("main.js", vec![var("x", Some(num(1.0)))]);

        let json = render(&program, Emit::Json).unwrap();
        let back: Program = serde_json::from_str(&json).unwrap();
        assert_eq!(back, program);
        assert_eq!(render(&program, Emit::Js).unwrap(), print_program(&program));
    }
}
