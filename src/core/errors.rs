//! Error types for location classification and expression evaluation

/// Result type used for session-level plumbing throughout the library.
pub type Result<T> = anyhow::Result<T>;

/// Failures local to classifying or evaluating one attribute.
///
/// Absence of information (no split unit, no location, empty range) is never
/// an error; these variants cover malformed input, policy violations, and
/// resource exhaustion. A failed evaluation leaves session caches untouched
/// and callers may continue with other DIEs.
#[derive(thiserror::Error, Debug)]
pub enum EvalError {
    #[error("DWARF decode error: {0}")]
    Decode(gimli::Error),
    #[error("unsupported opcode {0}")]
    UnsupportedOpcode(gimli::DwOp),
    #[error("malformed location list at offset 0x{offset:x}: {source}")]
    MalformedLocationList { offset: u64, source: gimli::Error },
    #[error("malformed expression: {0}")]
    MalformedExpression(&'static str),
    #[error("attribute form does not encode a location or location list")]
    NotALocation,
    #[error("frame-relative operation used without a frame base")]
    FrameBaseRequired,
    #[error("call frame address operation inside a CFI expression")]
    UsedOutsideFrameContext,
    #[error("{0} is not valid inside a CFI expression")]
    IllegalInCfi(gimli::DwOp),
    #[error("no call frame information covers pc 0x{pc:x}")]
    NoCfiAvailable { pc: u64 },
    #[error("expression recursion limit ({0}) exceeded")]
    RecursionLimitExceeded(usize),
    #[error("no DIE at offset 0x{offset:x}")]
    BadDieReference { offset: u64 },
    #[error("DIE at offset 0x{offset:x} is not a base type")]
    NotABaseType { offset: u64 },
    #[error("base type at offset 0x{offset:x} has no byte or bit size with encoding")]
    MissingSizeOrEncoding { offset: u64 },
    #[error("DIE at offset 0x{offset:x} is not a formal parameter")]
    NotAFormalParameter { offset: u64 },
}

impl From<gimli::Error> for EvalError {
    fn from(err: gimli::Error) -> Self {
        match err {
            // An unrecognized opcode invalidates the whole expression and
            // must surface as its own kind, never be skipped.
            gimli::Error::InvalidExpression(op) => EvalError::UnsupportedOpcode(op),
            other => EvalError::Decode(other),
        }
    }
}
