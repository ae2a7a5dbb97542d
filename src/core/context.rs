//! Evaluation context and the CFI provider seam
//!
//! Everything the reference behavior keeps in process-wide state (frame-base
//! flag, CFI tables and biases, object kind, "inside CFI" marker) lives here
//! as explicit per-call fields, so evaluation is reentrant and testable in
//! isolation.

use crate::core::Result;

/// Where the expression under evaluation came from.
///
/// Several operations (DW_OP_call_frame_cfa, DW_OP_fbreg,
/// DW_OP_push_object_address, the call and implicit-pointer families) are
/// only legal in expressions attached to a DIE attribute and must fail when
/// the expression was lifted out of a CFI table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExprOrigin {
    /// The expression came from a DIE attribute.
    Attribute,
    /// The expression came from CFI (a CFA definition).
    Cfi,
}

/// What kind of object the expression was decoded from. Relocatable objects
/// and debug-only files may legitimately lack usable CFI, so CFA lookups
/// degrade to an unresolved marker instead of failing there.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Executable,
    Relocatable,
    DebugOnly,
}

impl ObjectKind {
    pub(crate) fn forgives_missing_cfi(&self) -> bool {
        matches!(self, ObjectKind::Relocatable | ObjectKind::DebugOnly)
    }
}

/// External capability that computes call-frame information.
///
/// CFI unwinding itself is out of scope here; the consuming toolkit hands in
/// an implementation that, for a PC (with any per-source bias already
/// applied by the implementor), returns the raw DWARF expression bytes of
/// the CFA rule in effect, or `None` when no frame covers the address.
pub trait CfaProvider {
    fn frame_at(&self, pc: u64) -> Result<Option<Vec<u8>>>;
}

/// Per-evaluation context, created per query and discarded after use.
pub struct EvalContext<'a> {
    /// The PC in effect for this evaluation.
    pub pc: u64,
    /// Whether the surrounding function (or an enclosing subprogram, for
    /// inlined instances) established a frame base. Required by DW_OP_fbreg.
    pub has_frame_base: bool,
    /// Whether this expression came from an attribute or a CFI table.
    pub origin: ExprOrigin,
    /// CFI accessor for DW_OP_call_frame_cfa.
    pub cfa: Option<&'a dyn CfaProvider>,
    pub object_kind: ObjectKind,
}

impl<'a> EvalContext<'a> {
    /// Context for an attribute expression with no frame base and no CFI.
    pub fn new(pc: u64) -> Self {
        EvalContext {
            pc,
            has_frame_base: false,
            origin: ExprOrigin::Attribute,
            cfa: None,
            object_kind: ObjectKind::Executable,
        }
    }

    pub fn with_frame_base(mut self, has_frame_base: bool) -> Self {
        self.has_frame_base = has_frame_base;
        self
    }

    pub fn with_cfa(mut self, cfa: &'a dyn CfaProvider) -> Self {
        self.cfa = Some(cfa);
        self
    }

    pub fn with_object_kind(mut self, kind: ObjectKind) -> Self {
        self.object_kind = kind;
        self
    }

    /// Derived context for evaluating a CFA expression pulled out of CFI.
    /// Attribute-only operations become illegal and the frame base is gone.
    pub(crate) fn for_cfi(&self) -> EvalContext<'a> {
        EvalContext {
            pc: self.pc,
            has_frame_base: false,
            origin: ExprOrigin::Cfi,
            cfa: self.cfa,
            object_kind: self.object_kind,
        }
    }
}
