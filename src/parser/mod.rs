//! Location-attribute classification and expression evaluation

pub mod base_type;
pub mod expression_evaluator;
pub mod frame_base;
pub mod location_classifier;

use crate::session::Reader;

/// Section-level offset of a unit-relative DIE offset, for error reporting.
pub(crate) fn die_section_offset(unit: &gimli::Unit<Reader>, offset: gimli::UnitOffset) -> u64 {
    unit.header
        .offset()
        .as_debug_info_offset()
        .map(|base| (base.0 + offset.0) as u64)
        .unwrap_or(offset.0 as u64)
}
