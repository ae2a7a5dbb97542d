//! Structured results of DWARF location expression evaluation
//!
//! The evaluator classifies an expression into where the value lives
//! (register, memory address, composite pieces) or what it is (implicit or
//! computed value). It deliberately stops at classification: frame-base
//! composition, TLS base resolution, and typed numeric conversion belong to
//! the caller, which owns the runtime value domain.

use crate::core::types::BaseTypeInfo;
use std::fmt;

/// Terminal classification of a fully evaluated location expression.
#[derive(Debug, Clone, PartialEq)]
pub enum EvalResult {
    /// The value lives at this memory address.
    Address(u64),
    /// The value lives in memory at register + offset (DW_OP_breg*).
    RegisterAddress { register: u16, offset: i64 },
    /// The value lives in a register (DW_OP_reg*), typed for
    /// DW_OP_regval_type.
    Register {
        register: u16,
        base_type: Option<BaseTypeInfo>,
    },
    /// Signed offset from the function's frame base (DW_OP_fbreg). The
    /// caller folds in the separately evaluated frame-base location.
    FrameOffset(i64),
    /// Address relative to the defining module's TLS block. The TLS base
    /// itself is resolved by the caller's runtime, not here.
    TlsAddress(Box<EvalResult>),
    /// Known constant value without a location.
    Constant(i64),
    /// Typed constant embedded in the expression (DW_OP_const_type); bytes
    /// are carried unmodified.
    TypedValue {
        bytes: Vec<u8>,
        base_type: BaseTypeInfo,
    },
    /// Untyped value block embedded in the expression (DW_OP_implicit_value).
    ImplicitValue(Vec<u8>),
    /// The value is the result of the computation itself, not a location
    /// (DW_OP_stack_value).
    StackValue(Vec<ComputeStep>),
    /// A memory address that must be computed at runtime.
    ComputedAddress(Vec<ComputeStep>),
    /// Pointer to an object that has no runtime location
    /// (DW_OP_implicit_pointer).
    ImplicitPointer {
        target: ImplicitPointerTarget,
        byte_offset: i64,
    },
    /// The value the wrapped expression had on entry to the current frame
    /// (DW_OP_entry_value), evaluated against the caller's context.
    EntryValue(Box<EvalResult>),
    /// The current value of a referenced variable (DW_OP_GNU_variable_value).
    VariableValue(Box<EvalResult>),
    /// A formal parameter whose value must be recovered from the matching
    /// call-site parameter in the caller (DW_OP_GNU_parameter_ref).
    CallSiteParameter { die_offset: u64 },
    /// The value is split across multiple pieces.
    Composite(Vec<PieceResult>),
    /// No location and no value; the variable was optimized away.
    OptimizedOut,
    /// Recognized but not statically classifiable (control flow, missing
    /// CFI in a forgiving object kind).
    Unknown,
}

/// One piece of a composite location (DW_OP_piece / DW_OP_bit_piece).
#[derive(Debug, Clone, PartialEq)]
pub struct PieceResult {
    pub location: EvalResult,
    pub size_in_bits: u64,
    /// Bit offset within the piece; `None` for byte-aligned DW_OP_piece.
    pub bit_offset: Option<u64>,
}

/// What a DW_OP_implicit_pointer refers to.
#[derive(Debug, Clone, PartialEq)]
pub enum ImplicitPointerTarget {
    /// The referenced DIE carries DW_AT_const_value; the constant is
    /// available without a location lookup.
    ConstValue,
    /// The referenced DIE's own location, evaluated at the current PC.
    Location(Box<EvalResult>),
}

/// One step of a stack computation the caller must perform at runtime.
#[derive(Debug, Clone, PartialEq)]
pub enum ComputeStep {
    /// Push the value of a DWARF-numbered register.
    LoadRegister(u16),
    PushConstant(i64),
    /// Push the function's frame-base address.
    LoadFrameBase,
    /// Push the address of the object the expression is attached to.
    PushObjectAddress,
    /// Pop an address, push the memory it points at. A base type is
    /// attached for DW_OP_deref_type; the read itself is untyped here.
    Dereference {
        size: MemoryAccessSize,
        base_type: Option<BaseTypeInfo>,
    },

    Add,
    Sub,
    Mul,
    Div,
    Mod,
    And,
    Or,
    Xor,
    Shl,
    Shr,
    Shra,
    Not,
    Neg,
    Abs,

    Dup,
    Drop,
    Swap,
    Rot,
    Pick(u8),

    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,

    /// Pop, convert to the given base type, push. `None` is the untyped
    /// sentinel (operand 0). The numeric conversion is the caller's.
    Convert { base_type: Option<BaseTypeInfo> },
    /// Pop, reinterpret the bits as the given base type, push.
    Reinterpret { base_type: Option<BaseTypeInfo> },
}

/// Memory access width for dereference steps.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MemoryAccessSize {
    U8,
    U16,
    U32,
    U64,
}

impl MemoryAccessSize {
    /// Width for a byte count as encoded in DW_OP_deref_size; zero means
    /// the target address size.
    pub fn from_byte_count(bytes: u8) -> Self {
        match bytes {
            1 => MemoryAccessSize::U8,
            2 => MemoryAccessSize::U16,
            4 => MemoryAccessSize::U32,
            _ => MemoryAccessSize::U64,
        }
    }

    pub fn bytes(&self) -> usize {
        match self {
            MemoryAccessSize::U8 => 1,
            MemoryAccessSize::U16 => 2,
            MemoryAccessSize::U32 => 4,
            MemoryAccessSize::U64 => 8,
        }
    }
}

impl EvalResult {
    /// Simple constant, if that is what this classifies as.
    pub fn as_constant(&self) -> Option<i64> {
        match self {
            EvalResult::Constant(c) => Some(*c),
            _ => None,
        }
    }

    /// Whether any value or location information survived at all.
    pub fn is_present(&self) -> bool {
        !matches!(self, EvalResult::OptimizedOut | EvalResult::Unknown)
    }
}

fn write_bytes(f: &mut fmt::Formatter<'_>, bytes: &[u8]) -> fmt::Result {
    for b in bytes {
        write!(f, "{b:02x}")?;
    }
    Ok(())
}

fn write_steps(f: &mut fmt::Formatter<'_>, steps: &[ComputeStep]) -> fmt::Result {
    write!(f, "{{")?;
    for (i, step) in steps.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{step}")?;
    }
    write!(f, "}}")
}

impl fmt::Display for EvalResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvalResult::Address(addr) => write!(f, "@0x{addr:x}"),
            EvalResult::RegisterAddress { register, offset } => {
                if *offset >= 0 {
                    write!(f, "@[reg{register}+{offset}]")
                } else {
                    write!(f, "@[reg{register}-{}]", -offset)
                }
            }
            EvalResult::Register {
                register,
                base_type,
            } => match base_type {
                Some(ty) => write!(f, "reg{register}:{ty}"),
                None => write!(f, "reg{register}"),
            },
            EvalResult::FrameOffset(off) => write!(f, "frame{off:+}"),
            EvalResult::TlsAddress(inner) => write!(f, "tls({inner})"),
            EvalResult::Constant(c) => write!(f, "const {c}"),
            EvalResult::TypedValue { bytes, base_type } => {
                write!(f, "value:{base_type}[")?;
                write_bytes(f, bytes)?;
                write!(f, "]")
            }
            EvalResult::ImplicitValue(bytes) => {
                write!(f, "implicit[")?;
                write_bytes(f, bytes)?;
                write!(f, "]")
            }
            EvalResult::StackValue(steps) => {
                write!(f, "=")?;
                write_steps(f, steps)
            }
            EvalResult::ComputedAddress(steps) => {
                write!(f, "@")?;
                write_steps(f, steps)
            }
            EvalResult::ImplicitPointer {
                target,
                byte_offset,
            } => match target {
                ImplicitPointerTarget::ConstValue => {
                    write!(f, "implicit_ptr(<constant value>,{byte_offset})")
                }
                ImplicitPointerTarget::Location(loc) => {
                    write!(f, "implicit_ptr({loc},{byte_offset})")
                }
            },
            EvalResult::EntryValue(inner) => write!(f, "entry({inner})"),
            EvalResult::VariableValue(inner) => write!(f, "varvalue({inner})"),
            EvalResult::CallSiteParameter { die_offset } => {
                write!(f, "call_site_param[0x{die_offset:x}]")
            }
            EvalResult::Composite(pieces) => {
                write!(f, "composite[")?;
                for (i, piece) in pieces.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{piece}")?;
                }
                write!(f, "]")
            }
            EvalResult::OptimizedOut => write!(f, "<optimized out>"),
            EvalResult::Unknown => write!(f, "<unknown>"),
        }
    }
}

impl fmt::Display for PieceResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.bit_offset {
            Some(off) => write!(
                f,
                "{}:{}bits@{}",
                self.location, self.size_in_bits, off
            ),
            None => write!(f, "{}:{}bits", self.location, self.size_in_bits),
        }
    }
}

impl fmt::Display for ComputeStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComputeStep::LoadRegister(r) => write!(f, "load reg{r}"),
            ComputeStep::PushConstant(v) => write!(f, "push {v}"),
            ComputeStep::LoadFrameBase => write!(f, "push frame_base"),
            ComputeStep::PushObjectAddress => write!(f, "push object_address"),
            ComputeStep::Dereference { size, base_type } => match base_type {
                Some(ty) => write!(f, "deref {size}:{ty}"),
                None => write!(f, "deref {size}"),
            },
            ComputeStep::Add => write!(f, "add"),
            ComputeStep::Sub => write!(f, "sub"),
            ComputeStep::Mul => write!(f, "mul"),
            ComputeStep::Div => write!(f, "div"),
            ComputeStep::Mod => write!(f, "mod"),
            ComputeStep::And => write!(f, "and"),
            ComputeStep::Or => write!(f, "or"),
            ComputeStep::Xor => write!(f, "xor"),
            ComputeStep::Shl => write!(f, "shl"),
            ComputeStep::Shr => write!(f, "shr"),
            ComputeStep::Shra => write!(f, "shra"),
            ComputeStep::Not => write!(f, "not"),
            ComputeStep::Neg => write!(f, "neg"),
            ComputeStep::Abs => write!(f, "abs"),
            ComputeStep::Dup => write!(f, "dup"),
            ComputeStep::Drop => write!(f, "drop"),
            ComputeStep::Swap => write!(f, "swap"),
            ComputeStep::Rot => write!(f, "rot"),
            ComputeStep::Pick(n) => write!(f, "pick {n}"),
            ComputeStep::Eq => write!(f, "eq"),
            ComputeStep::Ne => write!(f, "ne"),
            ComputeStep::Lt => write!(f, "lt"),
            ComputeStep::Le => write!(f, "le"),
            ComputeStep::Gt => write!(f, "gt"),
            ComputeStep::Ge => write!(f, "ge"),
            ComputeStep::Convert { base_type } => match base_type {
                Some(ty) => write!(f, "convert {ty}"),
                None => write!(f, "convert <untyped>"),
            },
            ComputeStep::Reinterpret { base_type } => match base_type {
                Some(ty) => write!(f, "reinterpret {ty}"),
                None => write!(f, "reinterpret <untyped>"),
            },
        }
    }
}

impl fmt::Display for MemoryAccessSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemoryAccessSize::U8 => write!(f, "u8"),
            MemoryAccessSize::U16 => write!(f, "u16"),
            MemoryAccessSize::U32 => write!(f, "u32"),
            MemoryAccessSize::U64 => write!(f, "u64"),
        }
    }
}
