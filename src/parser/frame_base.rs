//! Frame-base applicability for function-like DIEs
//!
//! DW_OP_fbreg is only meaningful where a frame base is established. A
//! subprogram establishes one with its own DW_AT_frame_base; an inlined
//! instance inherits the one of its enclosing subprogram, found by walking
//! the scope ancestry. The resulting flag applies transitively to all
//! descendants when validating frame-relative operations, even though the
//! concrete base expression belongs to an ancestor.

use crate::core::EvalError;
use crate::parser::die_section_offset;
use crate::parser::location_classifier::{classify_location, LocationAttr};
use crate::session::{DwarfFile, Reader};
use tracing::trace;

/// Where the applicable frame base came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameBaseSource {
    /// The DIE carries DW_AT_frame_base itself.
    Own,
    /// Inherited from the enclosing subprogram at this section offset.
    Inherited { ancestor: u64 },
}

/// The frame-base expression applicable to a DIE: either a single
/// expression covering the whole function or a PC-range-indexed list.
pub struct FrameBase<'a> {
    pub source: FrameBaseSource,
    pub location: LocationAttr<'a>,
}

/// Resolves which frame-base expression, if any, governs a DIE.
pub struct FrameBaseResolver;

impl FrameBaseResolver {
    /// Whether frame-relative operations are valid below this DIE.
    pub fn has_frame_base(
        file: &DwarfFile,
        unit: &gimli::Unit<Reader>,
        offset: gimli::UnitOffset,
    ) -> Result<bool, EvalError> {
        Ok(Self::frame_base(file, unit, offset)?.is_some())
    }

    /// The applicable frame-base expression for the function-like DIE at
    /// `offset`, walking the scope ancestry for inlined instances.
    pub fn frame_base<'a>(
        file: &'a DwarfFile,
        unit: &'a gimli::Unit<Reader>,
        offset: gimli::UnitOffset,
    ) -> Result<Option<FrameBase<'a>>, EvalError> {
        let entry = unit.entry(offset).map_err(|_| EvalError::BadDieReference {
            offset: die_section_offset(unit, offset),
        })?;

        if let Some(value) = entry.attr_value(gimli::DW_AT_frame_base)? {
            let location = classify_location(file.dwarf(), unit, value)?;
            return Ok(Some(FrameBase {
                source: FrameBaseSource::Own,
                location,
            }));
        }

        if entry.tag() != gimli::DW_TAG_inlined_subroutine {
            return Ok(None);
        }

        // See whether the subprogram this instance was inlined into
        // establishes a frame base we should use.
        for ancestor in scope_ancestry(unit, offset)?.into_iter().rev() {
            let scope = unit.entry(ancestor).map_err(|_| EvalError::BadDieReference {
                offset: die_section_offset(unit, ancestor),
            })?;
            if scope.tag() != gimli::DW_TAG_subprogram {
                continue;
            }
            if let Some(value) = scope.attr_value(gimli::DW_AT_frame_base)? {
                let location = classify_location(file.dwarf(), unit, value)?;
                return Ok(Some(FrameBase {
                    source: FrameBaseSource::Inherited {
                        ancestor: die_section_offset(unit, ancestor),
                    },
                    location,
                }));
            }
        }

        trace!("no enclosing subprogram establishes a frame base");
        Ok(None)
    }
}

/// Offsets of the DIEs on the path from the unit root to `target`,
/// outermost first, excluding `target` itself.
fn scope_ancestry(
    unit: &gimli::Unit<Reader>,
    target: gimli::UnitOffset,
) -> Result<Vec<gimli::UnitOffset>, EvalError> {
    let mut ancestors: Vec<gimli::UnitOffset> = Vec::new();
    let mut depth: isize = 0;
    let mut cursor = unit.entries();

    while let Some((delta, entry)) = cursor.next_dfs()? {
        depth += delta;
        ancestors.truncate(depth.max(0) as usize);
        if entry.offset() == target {
            return Ok(ancestors);
        }
        ancestors.push(entry.offset());
    }

    Err(EvalError::BadDieReference {
        offset: die_section_offset(unit, target),
    })
}
