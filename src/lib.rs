//! DWARF location resolution library
//!
//! The debugging-information resolution core of an ELF/DWARF toolkit: links
//! a compilation unit's skeleton (in the main binary) to its out-of-line
//! split unit (in a `.dwo` companion), and evaluates DWARF location
//! expressions against a program-counter value to produce a structured
//! storage classification (register, memory address, composite piece, or
//! computed/implicit value).
//!
//! Section parsing is delegated to gimli and object; CFI unwinding is
//! consumed through the [`CfaProvider`] seam.

// Core types
pub mod core;

// Internal implementation modules
pub(crate) mod parser;
pub(crate) mod split;

// Session and ownership model
pub mod session;

#[cfg(test)]
pub(crate) mod fixtures;

// Re-export the main public API
pub use crate::session::{
    load_dwarf_object, load_dwarf_path, DebugSession, DwarfFile, Reader, SessionConfig, UnitCell,
    UnitKind, UnitLink, UnitRef,
};

pub use crate::core::{
    BaseTypeInfo, CfaProvider, ComputeStep, EvalContext, EvalError, EvalResult, ExprOrigin,
    ImplicitPointerTarget, MemoryAccessSize, ObjectKind, PcRange, PieceResult, Result,
    UnitSignature,
};

pub use crate::parser::base_type::BaseTypeResolver;
pub use crate::parser::expression_evaluator::ExpressionEvaluator;
pub use crate::parser::frame_base::{FrameBase, FrameBaseResolver, FrameBaseSource};
pub use crate::parser::location_classifier::{
    classify_location, location_at_pc, LocatedExpression, LocationAttr, LocationRanges,
};

// Re-export gimli types that appear in the public API
pub use gimli::{DwAte, Expression, UnitOffset};
