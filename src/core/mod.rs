//! Core types: evaluation results, contexts, errors, shared value types

pub mod context;
pub mod errors;
pub mod evaluation;
pub mod types;

pub use context::{CfaProvider, EvalContext, ExprOrigin, ObjectKind};
pub use errors::{EvalError, Result};
pub use evaluation::{
    ComputeStep, EvalResult, ImplicitPointerTarget, MemoryAccessSize, PieceResult,
};
pub use types::{BaseTypeInfo, PcRange, UnitSignature};
