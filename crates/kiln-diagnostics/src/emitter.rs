//! Diagnostic emitters for different output formats.

use crate::diagnostic::{Diagnostic, Diagnostics};
use std::io::Write;

/// Trait for emitting diagnostics in various formats.
pub trait DiagnosticEmitter {
    /// Emit a single diagnostic.
    fn emit(&mut self, diagnostic: &Diagnostic) -> std::io::Result<()>;

    /// Emit multiple diagnostics.
    fn emit_all(&mut self, diagnostics: &Diagnostics) -> std::io::Result<()> {
        for diag in diagnostics.iter() {
            self.emit(diag)?;
        }
        Ok(())
    }

    /// Emit a summary line.
    fn emit_summary(&mut self, diagnostics: &Diagnostics) -> std::io::Result<()>;
}

/// JSON lines output for tooling integration.
pub struct JsonEmitter<W: Write> {
    writer: W,
}

impl<W: Write> JsonEmitter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

impl<W: Write> DiagnosticEmitter for JsonEmitter<W> {
    fn emit(&mut self, diagnostic: &Diagnostic) -> std::io::Result<()> {
        let json = serde_json::json!({
            "code": diagnostic.code.as_str(),
            "severity": diagnostic.severity.as_str(),
            "message": diagnostic.message,
            "unit": diagnostic.unit,
            "help": diagnostic.explanation,
            "related": diagnostic.related.iter().map(|r| {
                serde_json::json!({
                    "unit": r.unit,
                    "message": r.message,
                })
            }).collect::<Vec<_>>(),
        });

        serde_json::to_writer(&mut self.writer, &json)?;
        writeln!(self.writer)?;
        Ok(())
    }

    fn emit_summary(&mut self, diagnostics: &Diagnostics) -> std::io::Result<()> {
        let summary = serde_json::json!({
            "type": "summary",
            "errors": diagnostics.error_count(),
            "warnings": diagnostics.warning_count(),
            "hints": diagnostics.hint_count(),
            "total": diagnostics.len(),
        });
        serde_json::to_writer(&mut self.writer, &summary)?;
        writeln!(self.writer)?;
        Ok(())
    }
}

/// Plain text output, one line per diagnostic.
pub struct SimpleEmitter<W: Write> {
    writer: W,
}

impl<W: Write> SimpleEmitter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

impl<W: Write> DiagnosticEmitter for SimpleEmitter<W> {
    fn emit(&mut self, diagnostic: &Diagnostic) -> std::io::Result<()> {
        if let Some(unit) = &diagnostic.unit {
            write!(self.writer, "{}: ", unit)?;
        }
        writeln!(
            self.writer,
            "{}: {} [{}]",
            diagnostic.severity.as_str(),
            diagnostic.message,
            diagnostic.code.as_str()
        )?;
        if let Some(help) = &diagnostic.explanation {
            writeln!(self.writer, "  help: {}", help)?;
        }
        for related in &diagnostic.related {
            match &related.unit {
                Some(unit) => writeln!(self.writer, "  note: {}: {}", unit, related.message)?,
                None => writeln!(self.writer, "  note: {}", related.message)?,
            }
        }
        Ok(())
    }

    fn emit_summary(&mut self, diagnostics: &Diagnostics) -> std::io::Result<()> {
        writeln!(
            self.writer,
            "{} error(s), {} warning(s), {} hint(s)",
            diagnostics.error_count(),
            diagnostics.warning_count(),
            diagnostics.hint_count()
        )
    }
}
