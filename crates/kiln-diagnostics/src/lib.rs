//! Diagnostic infrastructure for kiln.
//!
//! Diagnostics carry a stable code, a severity, the source unit they concern
//! and optional help text. Emitters render them as plain text or JSON lines.
//!
//! # Example
//!
//! ```
//! use kiln_diagnostics::{Diagnostic, DiagnosticCode, DiagnosticEmitter, SimpleEmitter};
//!
//! let diag = Diagnostic::new(DiagnosticCode::DuplicateDefinition, "'A.f' is defined twice")
//!     .with_unit("A.impl.js")
//!     .build();
//!
//! let mut out = Vec::new();
//! SimpleEmitter::new(&mut out).emit(&diag).unwrap();
//! assert_eq!(
//!     String::from_utf8(out).unwrap(),
//!     "A.impl.js: warning: 'A.f' is defined twice [I001]\n"
//! );
//! ```

pub mod diagnostic;
pub mod emitter;

pub use diagnostic::{
    Diagnostic, DiagnosticBuilder, DiagnosticCode, Diagnostics, RelatedInfo, Severity,
};
pub use emitter::{DiagnosticEmitter, JsonEmitter, SimpleEmitter};
