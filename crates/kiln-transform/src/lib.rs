//! Static function inlining for kiln
//!
//! The pass runs once per configured target:
//! - Collection: snapshot the designated functions defined in the host unit
//! - Rewriting: replace every qualified call to a collected function with
//!   its body, hygienically renamed, either as a single expression or as a
//!   block spliced in front of the enclosing statement

pub mod analysis;
pub mod changes;
pub mod collect;
pub mod context;
pub mod error;
pub mod inline;
pub mod names;
pub mod pass;
pub mod rewrite;

pub use changes::{ChangeSet, ChangedScope};
pub use collect::{collect, collect_with_policy, Definition, DefinitionTable, DuplicatePolicy};
pub use context::InlineContext;
pub use error::{InlineError, Result};
pub use inline::{inline_call, InlineMode, InlineOutcome, SkipReason};
pub use names::{NameIdSupplier, UniqueIdSupplier};
pub use pass::{
    InlineConfig, InlineReport, InlineStats, InlineTarget, StaticFunctionInliner,
    J2CL_ARRAYS_HOST, J2CL_CASTS_HOST,
};
pub use rewrite::rewrite_program;
