//! Fatal errors of the inlining pass

use kiln_ast::AstError;
use kiln_types::NodeId;
use thiserror::Error;

/// Contract violations that abort a pass run.
///
/// Call sites that cannot be inlined are not errors; they are left untouched
/// and counted in the report.
#[derive(Debug, Error)]
pub enum InlineError {
    #[error("malformed program: {0}")]
    Ast(#[from] AstError),

    #[error("no scope recorded for function literal {0}")]
    UnknownFunctionScope(NodeId),

    #[error("no scope recorded for source unit '{0}'")]
    UnknownUnitScope(String),
}

pub type Result<T> = std::result::Result<T, InlineError>;
