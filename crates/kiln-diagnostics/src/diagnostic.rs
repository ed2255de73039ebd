//! Diagnostic types for inliner warnings and hints.

use serde::{Deserialize, Serialize};

/// Severity level of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational hint
    Hint,
    /// Warning (the pass still completes)
    Warning,
    /// Error
    Error,
}

impl Severity {
    /// Get the string representation for display.
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Hint => "hint",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Diagnostic codes produced by the inlining pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiagnosticCode {
    /// A qualified name is defined more than once in the definition host
    DuplicateDefinition,
    /// No source unit matches the configured definition host
    HostUnitNotFound,
    /// A candidate function has no definition in the host
    CandidateNotFound,
    /// Internal error
    InternalError,
}

impl DiagnosticCode {
    /// All codes, in code order.
    pub const ALL: [DiagnosticCode; 4] = [
        Self::DuplicateDefinition,
        Self::HostUnitNotFound,
        Self::CandidateNotFound,
        Self::InternalError,
    ];

    /// Get the code string (e.g., "I001").
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DuplicateDefinition => "I001",
            Self::HostUnitNotFound => "I002",
            Self::CandidateNotFound => "I003",
            Self::InternalError => "I900",
        }
    }

    /// Parse a code string back into a code.
    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.as_str().eq_ignore_ascii_case(code))
    }

    /// Get the default severity for this code.
    pub fn default_severity(&self) -> Severity {
        match self {
            Self::InternalError => Severity::Error,
            Self::DuplicateDefinition | Self::HostUnitNotFound => Severity::Warning,
            Self::CandidateNotFound => Severity::Hint,
        }
    }
}

impl std::fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Related information for a diagnostic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelatedInfo {
    /// Source unit the note refers to
    pub unit: Option<String>,
    /// Message explaining the relation
    pub message: String,
}

/// A diagnostic produced while running the pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Stable code
    pub code: DiagnosticCode,
    /// Severity level
    pub severity: Severity,
    /// Short message (single line)
    pub message: String,
    /// Longer explanation (optional)
    pub explanation: Option<String>,
    /// Source unit the diagnostic concerns
    pub unit: Option<String>,
    /// Related notes
    pub related: Vec<RelatedInfo>,
}

impl Diagnostic {
    /// Start a diagnostic at the code's default severity
    pub fn new(code: DiagnosticCode, message: impl Into<String>) -> DiagnosticBuilder {
        DiagnosticBuilder {
            inner: Diagnostic {
                code,
                severity: code.default_severity(),
                message: message.into(),
                explanation: None,
                unit: None,
                related: Vec::new(),
            },
        }
    }
}

/// Builder for constructing diagnostics fluently.
pub struct DiagnosticBuilder {
    inner: Diagnostic,
}

impl DiagnosticBuilder {
    /// Override the code's default severity
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.inner.severity = severity;
        self
    }

    /// Set the source unit.
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.inner.unit = Some(unit.into());
        self
    }

    /// Add help text.
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.inner.explanation = Some(help.into());
        self
    }

    /// Add related information.
    pub fn with_related(mut self, unit: Option<String>, message: impl Into<String>) -> Self {
        self.inner.related.push(RelatedInfo {
            unit,
            message: message.into(),
        });
        self
    }

    /// Build the diagnostic.
    pub fn build(self) -> Diagnostic {
        self.inner
    }
}

/// Collection of diagnostics with summary statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Diagnostics {
    /// All diagnostics
    pub items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.items.push(diagnostic);
    }

    pub fn extend(&mut self, diagnostics: impl IntoIterator<Item = Diagnostic>) {
        self.items.extend(diagnostics);
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.items.iter().filter(|d| d.severity == severity).count()
    }

    pub fn has_errors(&self) -> bool {
        self.count(Severity::Error) > 0
    }

    pub fn error_count(&self) -> usize {
        self.count(Severity::Error)
    }

    pub fn warning_count(&self) -> usize {
        self.count(Severity::Warning)
    }

    pub fn hint_count(&self) -> usize {
        self.count(Severity::Hint)
    }

    /// Diagnostics carrying `code`
    pub fn with_code(&self, code: DiagnosticCode) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter().filter(move |d| d.code == code)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_round_trip() {
        for code in DiagnosticCode::ALL {
            assert_eq!(DiagnosticCode::from_code(code.as_str()), Some(code));
        }
        assert_eq!(
            DiagnosticCode::from_code("i002"),
            Some(DiagnosticCode::HostUnitNotFound)
        );
        assert_eq!(DiagnosticCode::from_code("X001"), None);
    }

    #[test]
    fn test_default_severity_and_counts() {
        let mut diags = Diagnostics::new();
        diags.push(Diagnostic::new(DiagnosticCode::DuplicateDefinition, "dup").build());
        diags.push(Diagnostic::new(DiagnosticCode::CandidateNotFound, "missing").build());
        diags.push(Diagnostic::new(DiagnosticCode::InternalError, "boom").build());
        diags.push(
            Diagnostic::new(DiagnosticCode::HostUnitNotFound, "promoted")
                .with_severity(Severity::Error)
                .build(),
        );

        assert_eq!(diags.warning_count(), 1);
        assert_eq!(diags.hint_count(), 1);
        assert_eq!(diags.error_count(), 2);
        assert!(diags.has_errors());
        assert_eq!(diags.with_code(DiagnosticCode::CandidateNotFound).count(), 1);
    }

    #[test]
    fn test_builder_sets_fields() {
        let diag = Diagnostic::new(DiagnosticCode::DuplicateDefinition, "dup")
            .with_unit("A.impl.js")
            .with_help("remove one definition")
            .with_related(Some("A.impl.js".to_string()), "first definition")
            .build();
        assert_eq!(diag.unit.as_deref(), Some("A.impl.js"));
        assert_eq!(diag.explanation.as_deref(), Some("remove one definition"));
        assert_eq!(diag.related.len(), 1);
    }
}
