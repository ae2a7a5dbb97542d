//! Core value types shared across the library

use std::fmt;

/// 8-byte identifier linking a skeleton unit to its split companion.
///
/// Two units with equal signatures are the same logical unit, regardless of
/// which file they were decoded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UnitSignature(pub u64);

impl UnitSignature {
    /// Whether `other` identifies the same logical unit.
    pub fn matches(&self, other: &UnitSignature) -> bool {
        self == other
    }
}

impl From<gimli::DwoId> for UnitSignature {
    fn from(id: gimli::DwoId) -> Self {
        UnitSignature(id.0)
    }
}

impl fmt::Display for UnitSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:016x}", self.0)
    }
}

/// Half-open PC range `[begin, end)`, module-relative.
///
/// A range with `begin >= end` is an explicitly empty entry; it is valid to
/// carry around but never covers any address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PcRange {
    pub begin: u64,
    pub end: u64,
}

impl PcRange {
    pub fn new(begin: u64, end: u64) -> Self {
        PcRange { begin, end }
    }

    /// Empty entries denote "no effective location", not `[end, begin)`.
    pub fn is_empty(&self) -> bool {
        self.begin >= self.end
    }

    /// Whether `pc` falls inside the range. Always false for empty ranges.
    pub fn contains(&self, pc: u64) -> bool {
        !self.is_empty() && pc >= self.begin && pc < self.end
    }
}

impl fmt::Display for PcRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[0x{:x},0x{:x})", self.begin, self.end)
    }
}

/// Encoding and size metadata of a base type referenced by a typed
/// expression operation. Byte sizes are normalized to bits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseTypeInfo {
    /// DW_AT_name, when present.
    pub name: Option<String>,
    /// DW_AT_encoding.
    pub encoding: gimli::DwAte,
    /// Size in bits (DW_AT_byte_size * 8, or DW_AT_bit_size).
    pub bit_size: u64,
    /// Section offset of the defining DIE.
    pub die_offset: u64,
}

impl fmt::Display for BaseTypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.name.as_deref().unwrap_or("<anon>");
        write!(
            f,
            "{{{},{},{}@[0x{:x}]}}",
            name,
            self.encoding,
            self.bit_size,
            self.die_offset
        )
    }
}
