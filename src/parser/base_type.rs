//! Base-type metadata for typed expression operations

use crate::core::{BaseTypeInfo, EvalError};
use crate::parser::die_section_offset;
use crate::session::Reader;
use gimli::Reader as _;

/// Resolves the encoding/size metadata of base-type DIEs referenced by
/// typed operations (DW_OP_convert, DW_OP_const_type, ...).
pub struct BaseTypeResolver;

impl BaseTypeResolver {
    /// Fetch `{encoding, bit_size}` of the DW_TAG_base_type at `offset`
    /// (unit-relative). Byte sizes are normalized to bits.
    pub fn resolve(
        dwarf: &gimli::Dwarf<Reader>,
        unit: &gimli::Unit<Reader>,
        offset: gimli::UnitOffset,
    ) -> Result<BaseTypeInfo, EvalError> {
        let section_offset = die_section_offset(unit, offset);

        let entry = unit
            .entry(offset)
            .map_err(|_| EvalError::BadDieReference {
                offset: section_offset,
            })?;

        if entry.tag() != gimli::DW_TAG_base_type {
            return Err(EvalError::NotABaseType {
                offset: section_offset,
            });
        }

        let encoding = match entry.attr_value(gimli::DW_AT_encoding)? {
            Some(gimli::AttributeValue::Encoding(ate)) => ate,
            Some(other) => match other.udata_value() {
                Some(value) => gimli::DwAte(value as u8),
                None => {
                    return Err(EvalError::MissingSizeOrEncoding {
                        offset: section_offset,
                    })
                }
            },
            None => {
                return Err(EvalError::MissingSizeOrEncoding {
                    offset: section_offset,
                })
            }
        };

        let bit_size = match entry
            .attr_value(gimli::DW_AT_byte_size)?
            .and_then(|v| v.udata_value())
        {
            Some(bytes) => bytes * 8,
            None => entry
                .attr_value(gimli::DW_AT_bit_size)?
                .and_then(|v| v.udata_value())
                .ok_or(EvalError::MissingSizeOrEncoding {
                    offset: section_offset,
                })?,
        };

        let name = entry
            .attr_value(gimli::DW_AT_name)?
            .and_then(|v| dwarf.attr_string(unit, v).ok())
            .and_then(|s| s.to_string_lossy().ok().map(|s| s.into_owned()));

        Ok(BaseTypeInfo {
            name,
            encoding,
            bit_size,
            die_offset: section_offset,
        })
    }
}
