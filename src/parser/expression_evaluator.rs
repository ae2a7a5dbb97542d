//! DWARF location expression evaluator
//!
//! Classifies a location expression into a structured [`EvalResult`]: where
//! the value lives, or what it is when it has no runtime location. This is a
//! single pass over the decoded operations; each top-level operation is
//! self-describing, and only composite and indirect operations recurse. One
//! shared depth counter bounds all recursion (call targets, entry values,
//! implicit pointers, CFA expressions), so adversarial or cyclic debug data
//! fails fast instead of overflowing the stack.

use crate::core::{
    ComputeStep, EvalContext, EvalError, EvalResult, ExprOrigin, ImplicitPointerTarget,
    MemoryAccessSize, PieceResult,
};
use crate::parser::base_type::BaseTypeResolver;
use crate::parser::die_section_offset;
use crate::parser::location_classifier::{classify_location, location_at_pc};
use crate::session::{DwarfFile, Reader};
use gimli::Reader as _;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, trace};

/// Recursion ceiling shared by every composite evaluation path.
const MAX_EVAL_DEPTH: usize = 64;

/// Evaluates location expressions of one unit against an [`EvalContext`].
pub struct ExpressionEvaluator<'a> {
    file: &'a DwarfFile,
    unit: &'a gimli::Unit<Reader>,
}

/// A decoded operation. gimli has no variant for DW_OP_GNU_variable_value,
/// so it is decoded by hand alongside the regular operations.
enum LocOp {
    Op(gimli::Operation<Reader>),
    VariableValue { offset: gimli::DebugInfoOffset },
}

/// Classification state for the operations since the last piece boundary.
#[derive(Default)]
struct PendingPiece {
    steps: Vec<ComputeStep>,
    terminal: Option<EvalResult>,
    stack_value: bool,
    tls: bool,
    unknown: bool,
}

impl PendingPiece {
    fn is_empty(&self) -> bool {
        self.steps.is_empty()
            && self.terminal.is_none()
            && !self.stack_value
            && !self.tls
            && !self.unknown
    }

    fn set_terminal(&mut self, result: EvalResult) -> Result<(), EvalError> {
        if self.terminal.is_some() {
            return Err(EvalError::MalformedExpression(
                "operation after a terminating operation",
            ));
        }
        self.terminal = Some(result);
        Ok(())
    }

    fn push(&mut self, step: ComputeStep) -> Result<(), EvalError> {
        if self.terminal.is_some() {
            return Err(EvalError::MalformedExpression(
                "operation after a terminating operation",
            ));
        }
        self.steps.push(step);
        Ok(())
    }

    /// Fold a call target's classification into this piece: it stands on
    /// its own when nothing preceded it, otherwise it joins the
    /// computation.
    fn fold(&mut self, result: EvalResult) -> Result<(), EvalError> {
        if self.steps.is_empty() {
            return self.set_terminal(result);
        }
        self.fold_steps(result)
    }

    /// Splice a sub-evaluation that denotes an address value (the CFA) into
    /// the running computation.
    fn fold_steps(&mut self, result: EvalResult) -> Result<(), EvalError> {
        match result_to_steps(&result) {
            Some(steps) => {
                for step in steps {
                    self.push(step)?;
                }
                Ok(())
            }
            None => {
                // A sub-result that cannot join a computation makes the
                // whole piece unclassifiable, not wrong.
                self.unknown = true;
                Ok(())
            }
        }
    }

    fn finish(self) -> EvalResult {
        let result = if self.unknown {
            EvalResult::Unknown
        } else if let Some(terminal) = self.terminal {
            terminal
        } else {
            classify_steps(self.steps, self.stack_value)
        };
        if self.tls {
            EvalResult::TlsAddress(Box::new(result))
        } else {
            result
        }
    }
}

fn classify_steps(steps: Vec<ComputeStep>, stack_value: bool) -> EvalResult {
    match steps.as_slice() {
        [] => EvalResult::OptimizedOut,
        [ComputeStep::PushConstant(v)] => {
            if stack_value {
                EvalResult::Constant(*v)
            } else {
                EvalResult::Address(*v as u64)
            }
        }
        [ComputeStep::LoadRegister(r)] => {
            if stack_value {
                EvalResult::Register {
                    register: *r,
                    base_type: None,
                }
            } else {
                EvalResult::RegisterAddress {
                    register: *r,
                    offset: 0,
                }
            }
        }
        [ComputeStep::LoadRegister(r), ComputeStep::PushConstant(o), ComputeStep::Add]
            if !stack_value =>
        {
            EvalResult::RegisterAddress {
                register: *r,
                offset: *o,
            }
        }
        [ComputeStep::LoadRegister(r), ComputeStep::Convert { base_type: Some(ty) }] => {
            EvalResult::Register {
                register: *r,
                base_type: Some(ty.clone()),
            }
        }
        [ComputeStep::LoadFrameBase] => EvalResult::FrameOffset(0),
        [ComputeStep::LoadFrameBase, ComputeStep::PushConstant(o), ComputeStep::Add] => {
            EvalResult::FrameOffset(*o)
        }
        _ => {
            if stack_value {
                EvalResult::StackValue(steps)
            } else {
                EvalResult::ComputedAddress(steps)
            }
        }
    }
}

/// Steps equivalent to a sub-result, when it can join a computation.
fn result_to_steps(result: &EvalResult) -> Option<Vec<ComputeStep>> {
    match result {
        EvalResult::Address(addr) => Some(vec![ComputeStep::PushConstant(*addr as i64)]),
        EvalResult::Constant(c) => Some(vec![ComputeStep::PushConstant(*c)]),
        EvalResult::RegisterAddress { register, offset } => {
            let mut steps = vec![ComputeStep::LoadRegister(*register)];
            if *offset != 0 {
                steps.push(ComputeStep::PushConstant(*offset));
                steps.push(ComputeStep::Add);
            }
            Some(steps)
        }
        EvalResult::Register {
            register,
            base_type: None,
        } => Some(vec![ComputeStep::LoadRegister(*register)]),
        EvalResult::FrameOffset(offset) => {
            let mut steps = vec![ComputeStep::LoadFrameBase];
            if *offset != 0 {
                steps.push(ComputeStep::PushConstant(*offset));
                steps.push(ComputeStep::Add);
            }
            Some(steps)
        }
        EvalResult::ComputedAddress(steps) | EvalResult::StackValue(steps) => {
            Some(steps.clone())
        }
        _ => None,
    }
}

impl<'a> ExpressionEvaluator<'a> {
    pub fn new(file: &'a DwarfFile, unit: &'a gimli::Unit<Reader>) -> Self {
        ExpressionEvaluator { file, unit }
    }

    /// Evaluate one expression against `ctx`.
    pub fn evaluate(
        &self,
        expr: &gimli::Expression<Reader>,
        ctx: &EvalContext<'_>,
    ) -> Result<EvalResult, EvalError> {
        self.eval_reader(expr.0.clone(), ctx, 0)
    }

    /// Resolve and evaluate the location of the DIE at `offset`: follow
    /// DW_AT_location (chasing abstract origins and specifications), pick
    /// the list entry covering `ctx.pc`, and fall back to
    /// DW_AT_const_value. Absence classifies as optimized out.
    pub fn evaluate_die_location(
        &self,
        offset: gimli::UnitOffset,
        ctx: &EvalContext<'_>,
    ) -> Result<EvalResult, EvalError> {
        self.die_location(offset, ctx, 0)
    }

    fn check_depth(&self, depth: usize) -> Result<(), EvalError> {
        if depth > MAX_EVAL_DEPTH {
            Err(EvalError::RecursionLimitExceeded(MAX_EVAL_DEPTH))
        } else {
            Ok(())
        }
    }

    fn eval_reader(
        &self,
        bytes: Reader,
        ctx: &EvalContext<'_>,
        depth: usize,
    ) -> Result<EvalResult, EvalError> {
        self.check_depth(depth)?;

        let ops = self.parse_ops(bytes)?;
        if ops.is_empty() {
            trace!("empty expression classifies as optimized out");
            return Ok(EvalResult::OptimizedOut);
        }

        let mut pieces: Vec<PieceResult> = Vec::new();
        let mut pending = PendingPiece::default();

        for op in ops {
            let op = match op {
                LocOp::VariableValue { offset } => {
                    if ctx.origin == ExprOrigin::Cfi {
                        return Err(EvalError::IllegalInCfi(
                            gimli::DwOp(0xfd), // DW_OP_GNU_variable_value
                        ));
                    }
                    let value = self.referenced_die_value(offset, ctx, depth)?;
                    pending.set_terminal(EvalResult::VariableValue(Box::new(value)))?;
                    continue;
                }
                LocOp::Op(op) => op,
            };

            use gimli::Operation::*;
            match op {
                Piece {
                    size_in_bits,
                    bit_offset,
                } => {
                    let location = std::mem::take(&mut pending).finish();
                    pieces.push(PieceResult {
                        location,
                        size_in_bits,
                        bit_offset,
                    });
                }

                Nop => {}
                StackValue => pending.stack_value = true,
                TLS => pending.tls = true,

                Register { register } => pending.set_terminal(EvalResult::Register {
                    register: register.0,
                    base_type: None,
                })?,

                RegisterOffset {
                    register,
                    offset,
                    base_type,
                } => {
                    pending.push(ComputeStep::LoadRegister(register.0))?;
                    if offset != 0 {
                        pending.push(ComputeStep::PushConstant(offset))?;
                        pending.push(ComputeStep::Add)?;
                    }
                    if base_type.0 != 0 {
                        let info =
                            BaseTypeResolver::resolve(self.file.dwarf(), self.unit, base_type)?;
                        pending.push(ComputeStep::Convert {
                            base_type: Some(info),
                        })?;
                    }
                }

                FrameOffset { offset } => {
                    if ctx.origin == ExprOrigin::Cfi {
                        return Err(EvalError::IllegalInCfi(gimli::DW_OP_fbreg));
                    }
                    if !ctx.has_frame_base {
                        return Err(EvalError::FrameBaseRequired);
                    }
                    pending.push(ComputeStep::LoadFrameBase)?;
                    if offset != 0 {
                        pending.push(ComputeStep::PushConstant(offset))?;
                        pending.push(ComputeStep::Add)?;
                    }
                }

                CallFrameCFA => {
                    // Never legal inside a CFA definition itself.
                    if ctx.origin == ExprOrigin::Cfi {
                        return Err(EvalError::UsedOutsideFrameContext);
                    }
                    let cfa = self.call_frame_cfa(ctx, depth)?;
                    match cfa {
                        Some(result) => pending.fold_steps(result)?,
                        None => pending.unknown = true,
                    }
                }

                PushObjectAddress => {
                    if ctx.origin == ExprOrigin::Cfi {
                        return Err(EvalError::IllegalInCfi(
                            gimli::DW_OP_push_object_address,
                        ));
                    }
                    pending.push(ComputeStep::PushObjectAddress)?;
                }

                Address { address } => pending.push(ComputeStep::PushConstant(address as i64))?,
                AddressIndex { index } => {
                    let address = self.file.dwarf().address(self.unit, index)?;
                    pending.push(ComputeStep::PushConstant(address as i64))?;
                }
                ConstantIndex { index } => {
                    let constant = self.file.dwarf().address(self.unit, index)?;
                    pending.push(ComputeStep::PushConstant(constant as i64))?;
                }
                UnsignedConstant { value } => {
                    pending.push(ComputeStep::PushConstant(value as i64))?
                }
                SignedConstant { value } => pending.push(ComputeStep::PushConstant(value))?,
                PlusConstant { value } => {
                    pending.push(ComputeStep::PushConstant(value as i64))?;
                    pending.push(ComputeStep::Add)?;
                }

                Deref {
                    base_type,
                    size,
                    space: _,
                } => {
                    let base_type = if base_type.0 != 0 {
                        Some(BaseTypeResolver::resolve(
                            self.file.dwarf(),
                            self.unit,
                            base_type,
                        )?)
                    } else {
                        None
                    };
                    pending.push(ComputeStep::Dereference {
                        size: MemoryAccessSize::from_byte_count(size),
                        base_type,
                    })?;
                }

                Pick { index } => pending.push(if index == 0 {
                    ComputeStep::Dup
                } else {
                    ComputeStep::Pick(index)
                })?,
                Drop => pending.push(ComputeStep::Drop)?,
                Swap => pending.push(ComputeStep::Swap)?,
                Rot => pending.push(ComputeStep::Rot)?,

                Abs => pending.push(ComputeStep::Abs)?,
                And => pending.push(ComputeStep::And)?,
                Div => pending.push(ComputeStep::Div)?,
                Minus => pending.push(ComputeStep::Sub)?,
                Mod => pending.push(ComputeStep::Mod)?,
                Mul => pending.push(ComputeStep::Mul)?,
                Neg => pending.push(ComputeStep::Neg)?,
                Not => pending.push(ComputeStep::Not)?,
                Or => pending.push(ComputeStep::Or)?,
                Plus => pending.push(ComputeStep::Add)?,
                Shl => pending.push(ComputeStep::Shl)?,
                Shr => pending.push(ComputeStep::Shr)?,
                Shra => pending.push(ComputeStep::Shra)?,
                Xor => pending.push(ComputeStep::Xor)?,

                Eq => pending.push(ComputeStep::Eq)?,
                Ge => pending.push(ComputeStep::Ge)?,
                Gt => pending.push(ComputeStep::Gt)?,
                Le => pending.push(ComputeStep::Le)?,
                Lt => pending.push(ComputeStep::Lt)?,
                Ne => pending.push(ComputeStep::Ne)?,

                // Control flow cannot be classified statically; the piece
                // survives as unknown rather than failing the whole DIE.
                Bra { .. } | Skip { .. } => {
                    debug!("control-flow operation leaves piece unclassified");
                    pending.unknown = true;
                }

                ImplicitValue { data } => {
                    let bytes = data.to_slice()?.to_vec();
                    pending.set_terminal(EvalResult::ImplicitValue(bytes))?;
                }

                ImplicitPointer { value, byte_offset } => {
                    if ctx.origin == ExprOrigin::Cfi {
                        return Err(EvalError::IllegalInCfi(gimli::DW_OP_implicit_pointer));
                    }
                    let target = self.implicit_pointer_target(value, ctx, depth)?;
                    pending.set_terminal(EvalResult::ImplicitPointer {
                        target,
                        byte_offset,
                    })?;
                }

                EntryValue { expression } => {
                    // The wrapped expression describes the value as of
                    // function entry; it is still evaluated at the caller's
                    // current PC.
                    let inner = self.eval_reader(expression, ctx, depth + 1)?;
                    pending.set_terminal(EvalResult::EntryValue(Box::new(inner)))?;
                }

                Call { offset } => {
                    let op_name = match offset {
                        gimli::DieReference::UnitRef(_) => gimli::DW_OP_call4,
                        gimli::DieReference::DebugInfoRef(_) => gimli::DW_OP_call_ref,
                    };
                    if ctx.origin == ExprOrigin::Cfi {
                        return Err(EvalError::IllegalInCfi(op_name));
                    }
                    let result = self.call_target(offset, ctx, depth)?;
                    pending.fold(result)?;
                }

                ParameterRef { offset } => {
                    let section_offset = die_section_offset(self.unit, offset);
                    let entry = self.unit.entry(offset).map_err(|_| {
                        EvalError::BadDieReference {
                            offset: section_offset,
                        }
                    })?;
                    if entry.tag() != gimli::DW_TAG_formal_parameter {
                        return Err(EvalError::NotAFormalParameter {
                            offset: section_offset,
                        });
                    }
                    pending.set_terminal(EvalResult::CallSiteParameter {
                        die_offset: section_offset,
                    })?;
                }

                TypedLiteral { base_type, value } => {
                    let info =
                        BaseTypeResolver::resolve(self.file.dwarf(), self.unit, base_type)?;
                    // The payload bytes are carried unmodified; interpreting
                    // them per encoding is the caller's value domain.
                    pending.set_terminal(EvalResult::TypedValue {
                        bytes: value.to_slice()?.to_vec(),
                        base_type: info,
                    })?;
                }

                Convert { base_type } => {
                    let info = self.optional_base_type(base_type)?;
                    pending.push(ComputeStep::Convert { base_type: info })?;
                }
                Reinterpret { base_type } => {
                    let info = self.optional_base_type(base_type)?;
                    pending.push(ComputeStep::Reinterpret { base_type: info })?;
                }

                WasmLocal { .. } | WasmGlobal { .. } | WasmStack { .. } => {
                    return Err(EvalError::UnsupportedOpcode(gimli::DW_OP_WASM_location))
                }

                other => {
                    debug!("unhandled operation {:?}", other);
                    return Err(EvalError::UnsupportedOpcode(gimli::DwOp(0xff))); // DW_OP_hi_user
                }
            }
        }

        if pieces.is_empty() {
            return Ok(pending.finish());
        }

        // Trailing operations after the last piece close an implicit final
        // piece of unspecified size.
        if !pending.is_empty() {
            pieces.push(PieceResult {
                location: pending.finish(),
                size_in_bits: 0,
                bit_offset: None,
            });
        }
        Ok(EvalResult::Composite(pieces))
    }

    fn parse_ops(&self, mut bytes: Reader) -> Result<Vec<LocOp>, EvalError> {
        let encoding = self.unit.encoding();
        let mut ops = Vec::new();
        while !bytes.is_empty() {
            let mut probe = bytes.clone();
            if probe.read_u8()? == 0xfd {
                // DW_OP_GNU_variable_value
                bytes.read_u8()?;
                let offset = bytes.read_offset(encoding.format)?;
                ops.push(LocOp::VariableValue {
                    offset: gimli::DebugInfoOffset(offset),
                });
                continue;
            }
            let op = gimli::Operation::parse(&mut bytes, encoding)?;
            ops.push(LocOp::Op(op));
        }
        Ok(ops)
    }

    fn optional_base_type(
        &self,
        offset: gimli::UnitOffset,
    ) -> Result<Option<crate::core::BaseTypeInfo>, EvalError> {
        // Offset zero is the "untyped" sentinel.
        if offset.0 == 0 {
            return Ok(None);
        }
        BaseTypeResolver::resolve(self.file.dwarf(), self.unit, offset).map(Some)
    }

    /// Ask the CFI accessor for the CFA expression at `ctx.pc` and evaluate
    /// it as a CFI-origin expression. `Ok(None)` means the lookup failed in
    /// an object kind where that is forgivable.
    fn call_frame_cfa(
        &self,
        ctx: &EvalContext<'_>,
        depth: usize,
    ) -> Result<Option<EvalResult>, EvalError> {
        let degrade = |pc| {
            if ctx.object_kind.forgives_missing_cfi() {
                Ok(None)
            } else {
                Err(EvalError::NoCfiAvailable { pc })
            }
        };

        let Some(provider) = ctx.cfa else {
            return degrade(ctx.pc);
        };
        match provider.frame_at(ctx.pc) {
            Ok(Some(expr_bytes)) => {
                let reader = Reader::new(Arc::from(&expr_bytes[..]), gimli::LittleEndian);
                let result = self.eval_reader(reader, &ctx.for_cfi(), depth + 1)?;
                Ok(Some(result))
            }
            Ok(None) => degrade(ctx.pc),
            Err(err) => {
                debug!("CFI lookup at pc 0x{:x} failed: {:#}", ctx.pc, err);
                degrade(ctx.pc)
            }
        }
    }

    /// Resolve a DW_OP_call* target and evaluate its location attribute.
    fn call_target(
        &self,
        reference: gimli::DieReference,
        ctx: &EvalContext<'_>,
        depth: usize,
    ) -> Result<EvalResult, EvalError> {
        match reference {
            gimli::DieReference::UnitRef(offset) => self.die_location(offset, ctx, depth + 1),
            gimli::DieReference::DebugInfoRef(offset) => {
                let (evaluator, unit_offset) = self.cross_unit(offset)?;
                evaluator.die_location(unit_offset, ctx, depth + 1)
            }
        }
    }

    /// Evaluator for the unit containing the section-relative `offset`.
    fn cross_unit(
        &self,
        offset: gimli::DebugInfoOffset,
    ) -> Result<(ExpressionEvaluator<'a>, gimli::UnitOffset), EvalError> {
        let index = self
            .file
            .unit_containing(offset)
            .ok_or(EvalError::BadDieReference {
                offset: offset.0 as u64,
            })?;
        let unit_offset =
            self.file
                .to_unit_offset(index, offset)
                .ok_or(EvalError::BadDieReference {
                    offset: offset.0 as u64,
                })?;
        let evaluator = ExpressionEvaluator {
            file: self.file,
            unit: self.file.unit(index).unit(),
        };
        Ok((evaluator, unit_offset))
    }

    /// What a DW_OP_implicit_pointer refers to: the referenced DIE's
    /// location evaluated at the *current* PC, or its constant value.
    fn implicit_pointer_target(
        &self,
        offset: gimli::DebugInfoOffset,
        ctx: &EvalContext<'_>,
        depth: usize,
    ) -> Result<ImplicitPointerTarget, EvalError> {
        let (evaluator, unit_offset) = self.cross_unit(offset)?;
        let entry = evaluator.unit.entry(unit_offset).map_err(|_| {
            EvalError::BadDieReference {
                offset: offset.0 as u64,
            }
        })?;

        if let Some(value) = entry.attr_value(gimli::DW_AT_location)? {
            let attr = classify_location(evaluator.file.dwarf(), evaluator.unit, value)?;
            let result = match location_at_pc(attr, ctx.pc)? {
                Some(expr) => evaluator.eval_reader(expr.0, ctx, depth + 1)?,
                None => EvalResult::OptimizedOut,
            };
            return Ok(ImplicitPointerTarget::Location(Box::new(result)));
        }

        if entry.attr_value(gimli::DW_AT_const_value)?.is_some() {
            // The constant is available without a location lookup; decoding
            // it belongs to the caller's value domain.
            return Ok(ImplicitPointerTarget::ConstValue);
        }

        Ok(ImplicitPointerTarget::Location(Box::new(
            EvalResult::OptimizedOut,
        )))
    }

    /// The current value of the DIE referenced by DW_OP_GNU_variable_value.
    fn referenced_die_value(
        &self,
        offset: gimli::DebugInfoOffset,
        ctx: &EvalContext<'_>,
        depth: usize,
    ) -> Result<EvalResult, EvalError> {
        let (evaluator, unit_offset) = self.cross_unit(offset)?;
        evaluator.die_location(unit_offset, ctx, depth + 1)
    }

    fn die_location(
        &self,
        offset: gimli::UnitOffset,
        ctx: &EvalContext<'_>,
        depth: usize,
    ) -> Result<EvalResult, EvalError> {
        self.check_depth(depth)?;

        let entry = self.unit.entry(offset).map_err(|_| {
            EvalError::BadDieReference {
                offset: die_section_offset(self.unit, offset),
            }
        })?;

        let mut visited = HashSet::new();
        if let Some(value) =
            self.attr_with_origins(&entry, gimli::DW_AT_location, &mut visited)?
        {
            let attr = classify_location(self.file.dwarf(), self.unit, value)?;
            return match location_at_pc(attr, ctx.pc)? {
                Some(expr) => self.eval_reader(expr.0, ctx, depth),
                None => {
                    trace!("no location list entry covers pc 0x{:x}", ctx.pc);
                    Ok(EvalResult::OptimizedOut)
                }
            };
        }

        let mut visited = HashSet::new();
        if let Some(value) =
            self.attr_with_origins(&entry, gimli::DW_AT_const_value, &mut visited)?
        {
            return self.const_value(value, ctx, depth);
        }

        trace!("DIE has neither location nor constant value; optimized out");
        Ok(EvalResult::OptimizedOut)
    }

    fn const_value(
        &self,
        value: gimli::AttributeValue<Reader>,
        ctx: &EvalContext<'_>,
        depth: usize,
    ) -> Result<EvalResult, EvalError> {
        use gimli::AttributeValue;
        Ok(match value {
            AttributeValue::Udata(v) => EvalResult::Constant(v as i64),
            AttributeValue::Sdata(v) => EvalResult::Constant(v),
            AttributeValue::Data1(v) => EvalResult::Constant(v as i64),
            AttributeValue::Data2(v) => EvalResult::Constant(v as i64),
            AttributeValue::Data4(v) => EvalResult::Constant(v as i64),
            AttributeValue::Data8(v) => EvalResult::Constant(v as i64),
            AttributeValue::Block(data) => EvalResult::ImplicitValue(data.to_slice()?.to_vec()),
            // Some producers encode an implicit value as an expression.
            AttributeValue::Exprloc(expr) => self.eval_reader(expr.0, ctx, depth + 1)?,
            other => {
                debug!("unhandled DW_AT_const_value form: {:?}", other);
                EvalResult::OptimizedOut
            }
        })
    }

    /// Look up `attr` on `entry`, chasing DW_AT_abstract_origin and
    /// DW_AT_specification chains. Cycle-safe.
    fn attr_with_origins(
        &self,
        entry: &gimli::DebuggingInformationEntry<'_, '_, Reader>,
        attr: gimli::DwAt,
        visited: &mut HashSet<gimli::UnitOffset>,
    ) -> Result<Option<gimli::AttributeValue<Reader>>, EvalError> {
        if let Some(value) = entry.attr_value(attr)? {
            return Ok(Some(value));
        }
        for origin_attr in [gimli::DW_AT_abstract_origin, gimli::DW_AT_specification] {
            if let Some(gimli::AttributeValue::UnitRef(offset)) =
                entry.attr_value(origin_attr)?
            {
                if visited.insert(offset) {
                    let origin = self.unit.entry(offset).map_err(|_| {
                        EvalError::BadDieReference {
                            offset: die_section_offset(self.unit, offset),
                        }
                    })?;
                    if let Some(value) = self.attr_with_origins(&origin, attr, visited)? {
                        return Ok(Some(value));
                    }
                }
            }
        }
        Ok(None)
    }
}
