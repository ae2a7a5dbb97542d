//! Classifying location attributes into expressions and range lists
//!
//! An attribute either holds one expression inline (covering everything the
//! owning DIE covers) or references a location list whose entries pair a PC
//! range with an expression. List entries are yielded lazily, in section
//! order, unsorted and unmerged. Entries with `begin >= end` are valid to
//! yield; they mean "no effective location", never `[end, begin)`.

use crate::core::{EvalError, PcRange};
use crate::session::Reader;
use tracing::{debug, trace};

/// A classified location attribute.
#[derive(Debug)]
pub enum LocationAttr<'a> {
    /// The attribute holds a single expression.
    Single(gimli::Expression<Reader>),
    /// The attribute references a location list.
    List(LocationRanges<'a>),
}

/// One location-list entry: a PC range and the expression in effect there.
#[derive(Debug, Clone)]
pub struct LocatedExpression {
    pub range: PcRange,
    pub expression: gimli::Expression<Reader>,
}

/// Determine whether `value` holds an inline expression or a list
/// reference. Unrecognized forms fail with [`EvalError::NotALocation`];
/// "the DIE has no such attribute" is the caller's case to handle.
pub fn classify_location<'a>(
    dwarf: &'a gimli::Dwarf<Reader>,
    unit: &'a gimli::Unit<Reader>,
    value: gimli::AttributeValue<Reader>,
) -> Result<LocationAttr<'a>, EvalError> {
    match value {
        gimli::AttributeValue::Exprloc(expr) => Ok(LocationAttr::Single(expr)),
        // DWARF 2/3 encoded expressions as plain blocks.
        gimli::AttributeValue::Block(data) => {
            Ok(LocationAttr::Single(gimli::Expression(data)))
        }
        gimli::AttributeValue::SecOffset(offset) => {
            LocationRanges::new(dwarf, unit, gimli::LocationListsOffset(offset))
                .map(LocationAttr::List)
        }
        gimli::AttributeValue::LocationListsRef(offset) => {
            LocationRanges::new(dwarf, unit, offset).map(LocationAttr::List)
        }
        gimli::AttributeValue::DebugLocListsIndex(index) => {
            let offset = dwarf.locations_offset(unit, index)?;
            LocationRanges::new(dwarf, unit, offset).map(LocationAttr::List)
        }
        other => {
            trace!("attribute value {:?} is not a location", other);
            Err(EvalError::NotALocation)
        }
    }
}

/// Lazy iterator over the entries of one location list.
///
/// Base-address-selection entries update the base for subsequent offset
/// pairs; the initial base is the owning unit's low PC. Malformed list data
/// surfaces as [`EvalError::MalformedLocationList`], distinct from "no
/// location".
#[derive(Debug)]
pub struct LocationRanges<'a> {
    dwarf: &'a gimli::Dwarf<Reader>,
    unit: &'a gimli::Unit<Reader>,
    iter: gimli::RawLocListIter<Reader>,
    base_address: u64,
    section_offset: u64,
    done: bool,
}

impl<'a> LocationRanges<'a> {
    fn new(
        dwarf: &'a gimli::Dwarf<Reader>,
        unit: &'a gimli::Unit<Reader>,
        offset: gimli::LocationListsOffset,
    ) -> Result<Self, EvalError> {
        let iter = dwarf
            .raw_locations(unit, offset)
            .map_err(|source| EvalError::MalformedLocationList {
                offset: offset.0 as u64,
                source,
            })?;
        Ok(LocationRanges {
            dwarf,
            unit,
            iter,
            base_address: unit.low_pc,
            section_offset: offset.0 as u64,
            done: false,
        })
    }

    fn malformed(&mut self, source: gimli::Error) -> EvalError {
        self.done = true;
        EvalError::MalformedLocationList {
            offset: self.section_offset,
            source,
        }
    }

    fn address(&self, index: gimli::DebugAddrIndex) -> gimli::Result<u64> {
        self.dwarf.address(self.unit, index)
    }
}

impl Iterator for LocationRanges<'_> {
    type Item = Result<LocatedExpression, EvalError>;

    fn next(&mut self) -> Option<Self::Item> {
        use gimli::read::RawLocListEntry;

        if self.done {
            return None;
        }

        loop {
            let entry = match self.iter.next() {
                Ok(Some(entry)) => entry,
                Ok(None) => {
                    self.done = true;
                    return None;
                }
                Err(e) => return Some(Err(self.malformed(e))),
            };

            let (range, data) = match entry {
                RawLocListEntry::BaseAddress { addr } => {
                    self.base_address = addr;
                    continue;
                }
                RawLocListEntry::BaseAddressx { addr } => {
                    match self.address(addr) {
                        Ok(addr) => self.base_address = addr,
                        Err(e) => return Some(Err(self.malformed(e))),
                    }
                    continue;
                }
                RawLocListEntry::OffsetPair { begin, end, data }
                | RawLocListEntry::AddressOrOffsetPair { begin, end, data } => (
                    PcRange::new(
                        self.base_address.wrapping_add(begin),
                        self.base_address.wrapping_add(end),
                    ),
                    data,
                ),
                RawLocListEntry::StartEnd { begin, end, data } => {
                    (PcRange::new(begin, end), data)
                }
                RawLocListEntry::StartLength {
                    begin,
                    length,
                    data,
                } => (PcRange::new(begin, begin.wrapping_add(length)), data),
                RawLocListEntry::StartxEndx { begin, end, data } => {
                    let begin = match self.address(begin) {
                        Ok(a) => a,
                        Err(e) => return Some(Err(self.malformed(e))),
                    };
                    let end = match self.address(end) {
                        Ok(a) => a,
                        Err(e) => return Some(Err(self.malformed(e))),
                    };
                    (PcRange::new(begin, end), data)
                }
                RawLocListEntry::StartxLength {
                    begin,
                    length,
                    data,
                } => {
                    let begin = match self.address(begin) {
                        Ok(a) => a,
                        Err(e) => return Some(Err(self.malformed(e))),
                    };
                    (PcRange::new(begin, begin.wrapping_add(length)), data)
                }
                // A default location applies wherever no other entry does.
                RawLocListEntry::DefaultLocation { data } => {
                    (PcRange::new(0, u64::MAX), data)
                }
            };

            if range.is_empty() {
                debug!(
                    "empty location range {} at list offset 0x{:x}",
                    range, self.section_offset
                );
            }

            return Some(Ok(LocatedExpression {
                range,
                expression: data,
            }));
        }
    }
}

/// Select the expression in effect at `pc`. A single expression always
/// applies; list entries apply when their range covers `pc`. Empty entries
/// never match.
pub fn location_at_pc(
    attr: LocationAttr<'_>,
    pc: u64,
) -> Result<Option<gimli::Expression<Reader>>, EvalError> {
    match attr {
        LocationAttr::Single(expr) => Ok(Some(expr)),
        LocationAttr::List(ranges) => {
            for entry in ranges {
                let entry = entry?;
                if entry.range.contains(pc) {
                    return Ok(Some(entry.expression));
                }
            }
            Ok(None)
        }
    }
}
