//! Hand-encoded DWARF fixtures for tests
//!
//! Sections are assembled byte by byte so tests control the exact encoding
//! (DWARF4 vs DWARF5, skeleton vs split units, loclist flavors) without a
//! compiler in the loop. DIE offsets are fixed by construction and exported
//! as constants next to each builder.

use crate::session::Reader;
use std::path::Path;
use std::sync::Arc;

pub fn reader(bytes: &[u8]) -> Reader {
    Reader::new(Arc::from(bytes), gimli::LittleEndian)
}

pub fn uleb(mut value: u64) -> Vec<u8> {
    let mut out = Vec::new();
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            break;
        }
        out.push(byte | 0x80);
    }
    out
}

#[derive(Default)]
struct Sections {
    info: Vec<u8>,
    abbrev: Vec<u8>,
    loc: Vec<u8>,
    loclists: Vec<u8>,
}

fn dwarf_from(sections: Sections) -> gimli::Dwarf<Reader> {
    let load = |id: gimli::SectionId| -> Result<Reader, ()> {
        let data: &[u8] = match id {
            gimli::SectionId::DebugInfo => &sections.info,
            gimli::SectionId::DebugAbbrev => &sections.abbrev,
            gimli::SectionId::DebugLoc => &sections.loc,
            gimli::SectionId::DebugLocLists => &sections.loclists,
            _ => &[],
        };
        Ok(reader(data))
    };
    gimli::Dwarf::load(load).unwrap()
}

/// The first (and only) unit of a fixture.
pub fn sole_unit(dwarf: &gimli::Dwarf<Reader>) -> gimli::Unit<Reader> {
    let header = dwarf.units().next().unwrap().expect("fixture has a unit");
    dwarf.unit(header).unwrap()
}

/// Patch the 4-byte initial length once a unit's bytes are complete.
fn patch_unit_length(info: &mut [u8], unit_start: usize) {
    let length = (info.len() - unit_start - 4) as u32;
    info[unit_start..unit_start + 4].copy_from_slice(&length.to_le_bytes());
}

fn unit_header_v4(info: &mut Vec<u8>) {
    info.extend_from_slice(&[0, 0, 0, 0]); // unit_length, patched later
    info.extend_from_slice(&4u16.to_le_bytes()); // version
    info.extend_from_slice(&0u32.to_le_bytes()); // debug_abbrev_offset
    info.push(8); // address_size
}

fn unit_header_v5(info: &mut Vec<u8>, unit_type: u8, dwo_id: Option<u64>) {
    info.extend_from_slice(&[0, 0, 0, 0]); // unit_length, patched later
    info.extend_from_slice(&5u16.to_le_bytes()); // version
    info.push(unit_type);
    info.push(8); // address_size
    info.extend_from_slice(&0u32.to_le_bytes()); // debug_abbrev_offset
    if let Some(id) = dwo_id {
        info.extend_from_slice(&id.to_le_bytes());
    }
}

// ---------------------------------------------------------------------------
// Base-type / variable fixture (DWARF4)
//
//   [0x0b] DW_TAG_compile_unit
//   [0x0c]   DW_TAG_base_type "int" (signed, 4 bytes)
//   [0x13]   DW_TAG_base_type "bad" (signed, no size)
//   [0x19]   DW_TAG_variable "v" (DW_AT_const_value 42)
//   [0x1d]   DW_TAG_variable "w" (DW_AT_location {DW_OP_reg0})
// ---------------------------------------------------------------------------

pub const ROOT_DIE_OFFSET: usize = 0x0b;
pub const BASE_TYPE_DIE_OFFSET: usize = 0x0c;
pub const SIZELESS_TYPE_DIE_OFFSET: usize = 0x13;
pub const CONST_VALUE_DIE_OFFSET: usize = 0x19;
pub const LOCATED_VAR_DIE_OFFSET: usize = 0x1d;

pub fn base_type_dwarf() -> gimli::Dwarf<Reader> {
    let mut abbrev = Vec::new();
    // 1: compile_unit, has children, no attributes
    abbrev.extend_from_slice(&[1, 0x11, 1, 0, 0]);
    // 2: base_type { name: string, encoding: data1, byte_size: data1 }
    abbrev.extend_from_slice(&[2, 0x24, 0, 0x03, 0x08, 0x3e, 0x0b, 0x0b, 0x0b, 0, 0]);
    // 3: base_type { name: string, encoding: data1 }
    abbrev.extend_from_slice(&[3, 0x24, 0, 0x03, 0x08, 0x3e, 0x0b, 0, 0]);
    // 4: variable { name: string, const_value: data1 }
    abbrev.extend_from_slice(&[4, 0x34, 0, 0x03, 0x08, 0x1c, 0x0b, 0, 0]);
    // 5: variable { name: string, location: exprloc }
    abbrev.extend_from_slice(&[5, 0x34, 0, 0x03, 0x08, 0x02, 0x18, 0, 0]);
    abbrev.push(0);

    let mut info = Vec::new();
    unit_header_v4(&mut info);
    debug_assert_eq!(info.len(), ROOT_DIE_OFFSET);
    info.push(1); // compile_unit

    debug_assert_eq!(info.len(), BASE_TYPE_DIE_OFFSET);
    info.push(2);
    info.extend_from_slice(b"int\0");
    info.push(0x05); // DW_ATE_signed
    info.push(4);

    debug_assert_eq!(info.len(), SIZELESS_TYPE_DIE_OFFSET);
    info.push(3);
    info.extend_from_slice(b"bad\0");
    info.push(0x05);

    debug_assert_eq!(info.len(), CONST_VALUE_DIE_OFFSET);
    info.push(4);
    info.extend_from_slice(b"v\0");
    info.push(42);

    debug_assert_eq!(info.len(), LOCATED_VAR_DIE_OFFSET);
    info.push(5);
    info.extend_from_slice(b"w\0");
    info.push(1); // expression length
    info.push(0x50); // DW_OP_reg0

    info.push(0); // end of children
    patch_unit_length(&mut info, 0);

    dwarf_from(Sections {
        info,
        abbrev,
        ..Sections::default()
    })
}

// ---------------------------------------------------------------------------
// Frame-base fixture (DWARF4)
//
//   [0x0b] DW_TAG_compile_unit
//   [0x0c]   DW_TAG_subprogram (DW_AT_frame_base {DW_OP_call_frame_cfa})
//   [0x0f]     DW_TAG_lexical_block
//   [0x10]       DW_TAG_inlined_subroutine
//   [0x13]   DW_TAG_subprogram (no frame base)
//   [0x14]     DW_TAG_inlined_subroutine
// ---------------------------------------------------------------------------

pub const FB_SUBPROGRAM_A_OFFSET: usize = 0x0c;
pub const FB_INLINED_A_OFFSET: usize = 0x10;
pub const FB_SUBPROGRAM_B_OFFSET: usize = 0x13;
pub const FB_INLINED_B_OFFSET: usize = 0x14;

pub fn frame_base_dwarf() -> gimli::Dwarf<Reader> {
    let mut abbrev = Vec::new();
    // 1: compile_unit, children
    abbrev.extend_from_slice(&[1, 0x11, 1, 0, 0]);
    // 2: subprogram { frame_base: exprloc }, children
    abbrev.extend_from_slice(&[2, 0x2e, 1, 0x40, 0x18, 0, 0]);
    // 3: lexical_block, children
    abbrev.extend_from_slice(&[3, 0x0b, 1, 0, 0]);
    // 4: inlined_subroutine, no children
    abbrev.extend_from_slice(&[4, 0x1d, 0, 0, 0]);
    // 5: subprogram, children, no attributes
    abbrev.extend_from_slice(&[5, 0x2e, 1, 0, 0]);
    abbrev.push(0);

    let mut info = Vec::new();
    unit_header_v4(&mut info);
    info.push(1); // compile_unit

    debug_assert_eq!(info.len(), FB_SUBPROGRAM_A_OFFSET);
    info.push(2);
    info.push(1); // expression length
    info.push(0x9c); // DW_OP_call_frame_cfa

    info.push(3); // lexical_block at 0x0f
    debug_assert_eq!(info.len(), FB_INLINED_A_OFFSET);
    info.push(4);
    info.push(0); // end of lexical_block children
    info.push(0); // end of subprogram A children

    debug_assert_eq!(info.len(), FB_SUBPROGRAM_B_OFFSET);
    info.push(5);
    debug_assert_eq!(info.len(), FB_INLINED_B_OFFSET);
    info.push(4);
    info.push(0); // end of subprogram B children

    info.push(0); // end of compile_unit children
    patch_unit_length(&mut info, 0);

    dwarf_from(Sections {
        info,
        abbrev,
        ..Sections::default()
    })
}

// ---------------------------------------------------------------------------
// Skeleton units (DWARF5)
// ---------------------------------------------------------------------------

/// A skeleton unit naming its split companion.
pub fn skeleton_dwarf(
    dwo_id: u64,
    dwo_name: &str,
    comp_dir: Option<&str>,
) -> gimli::Dwarf<Reader> {
    let mut abbrev = Vec::new();
    // 1: skeleton_unit { dwo_name: string, comp_dir: string }
    abbrev.extend_from_slice(&[1, 0x4a, 0, 0x76, 0x08, 0x1b, 0x08, 0, 0]);
    // 2: skeleton_unit { dwo_name: string }
    abbrev.extend_from_slice(&[2, 0x4a, 0, 0x76, 0x08, 0, 0]);
    abbrev.push(0);

    let mut info = Vec::new();
    unit_header_v5(&mut info, 0x04, Some(dwo_id)); // DW_UT_skeleton
    match comp_dir {
        Some(dir) => {
            info.push(1);
            info.extend_from_slice(dwo_name.as_bytes());
            info.push(0);
            info.extend_from_slice(dir.as_bytes());
            info.push(0);
        }
        None => {
            info.push(2);
            info.extend_from_slice(dwo_name.as_bytes());
            info.push(0);
        }
    }
    patch_unit_length(&mut info, 0);

    dwarf_from(Sections {
        info,
        abbrev,
        ..Sections::default()
    })
}

/// A skeleton unit with a dwo id but no dwo-name attribute: there is
/// nothing to look for on disk.
pub fn skeleton_dwarf_without_name(dwo_id: u64) -> gimli::Dwarf<Reader> {
    let mut abbrev = Vec::new();
    // 1: skeleton_unit, no attributes
    abbrev.extend_from_slice(&[1, 0x4a, 0, 0, 0]);
    abbrev.push(0);

    let mut info = Vec::new();
    unit_header_v5(&mut info, 0x04, Some(dwo_id));
    info.push(1);
    patch_unit_length(&mut info, 0);

    dwarf_from(Sections {
        info,
        abbrev,
        ..Sections::default()
    })
}

// ---------------------------------------------------------------------------
// Location lists
// ---------------------------------------------------------------------------

pub enum LocEntry {
    /// Base-address selection.
    Base(u64),
    /// Offset pair relative to the current base, with expression bytes.
    Pair(u64, u64, Vec<u8>),
}

fn minimal_cu_v4(sections: &mut Sections) {
    sections.abbrev.extend_from_slice(&[1, 0x11, 0, 0, 0]);
    sections.abbrev.push(0);
    unit_header_v4(&mut sections.info);
    sections.info.push(1);
    patch_unit_length(&mut sections.info, 0);
}

fn minimal_cu_v5(sections: &mut Sections) {
    sections.abbrev.extend_from_slice(&[1, 0x11, 0, 0, 0]);
    sections.abbrev.push(0);
    unit_header_v5(&mut sections.info, 0x01, None); // DW_UT_compile
    sections.info.push(1);
    patch_unit_length(&mut sections.info, 0);
}

/// A DWARF4 unit plus a `.debug_loc` list starting at offset 0.
pub fn loc_list_dwarf_v4(entries: &[LocEntry]) -> gimli::Dwarf<Reader> {
    let mut sections = Sections::default();
    minimal_cu_v4(&mut sections);

    for entry in entries {
        match entry {
            LocEntry::Base(addr) => {
                sections.loc.extend_from_slice(&u64::MAX.to_le_bytes());
                sections.loc.extend_from_slice(&addr.to_le_bytes());
            }
            LocEntry::Pair(begin, end, expr) => {
                sections.loc.extend_from_slice(&begin.to_le_bytes());
                sections.loc.extend_from_slice(&end.to_le_bytes());
                sections
                    .loc
                    .extend_from_slice(&(expr.len() as u16).to_le_bytes());
                sections.loc.extend_from_slice(expr);
            }
        }
    }
    sections.loc.extend_from_slice(&0u64.to_le_bytes());
    sections.loc.extend_from_slice(&0u64.to_le_bytes());

    dwarf_from(sections)
}

/// A DWARF5 unit plus a `.debug_loclists` list starting at offset 0.
pub fn loc_list_dwarf_v5(entries: &[LocEntry]) -> gimli::Dwarf<Reader> {
    let mut sections = Sections::default();
    minimal_cu_v5(&mut sections);

    for entry in entries {
        match entry {
            LocEntry::Base(addr) => {
                sections.loclists.push(0x06); // DW_LLE_base_address
                sections.loclists.extend_from_slice(&addr.to_le_bytes());
            }
            LocEntry::Pair(begin, end, expr) => {
                sections.loclists.push(0x04); // DW_LLE_offset_pair
                sections.loclists.extend_from_slice(&uleb(*begin));
                sections.loclists.extend_from_slice(&uleb(*end));
                sections.loclists.extend_from_slice(&uleb(expr.len() as u64));
                sections.loclists.extend_from_slice(expr);
            }
        }
    }
    sections.loclists.push(0x00); // DW_LLE_end_of_list

    dwarf_from(sections)
}

/// A `.debug_loc` list cut off in the middle of an entry.
pub fn truncated_loc_list_dwarf_v4() -> gimli::Dwarf<Reader> {
    let mut sections = Sections::default();
    minimal_cu_v4(&mut sections);
    sections.loc.extend_from_slice(&0x10u64.to_le_bytes());
    sections.loc.extend_from_slice(&[0x20, 0x00, 0x00, 0x00]); // half an end address
    dwarf_from(sections)
}

// ---------------------------------------------------------------------------
// Split companion files on disk
// ---------------------------------------------------------------------------

/// Write a `.dwo` ELF containing two split compile units; only the second
/// carries `dwo_id`, so resolution must scan past the first.
pub fn write_dwo_file(path: &Path, dwo_id: u64) {
    let mut abbrev = Vec::new();
    // 1: compile_unit, no children, no attributes
    abbrev.extend_from_slice(&[1, 0x11, 0, 0, 0]);
    abbrev.push(0);

    let mut info = Vec::new();
    let first_start = info.len();
    unit_header_v5(&mut info, 0x05, Some(dwo_id.wrapping_add(0x100))); // DW_UT_split_compile
    info.push(1);
    patch_unit_length(&mut info, first_start);

    let second_start = info.len();
    unit_header_v5(&mut info, 0x05, Some(dwo_id));
    info.push(1);
    patch_unit_length(&mut info, second_start);

    let elf = build_elf(&[(".debug_info", &info), (".debug_abbrev", &abbrev)]);
    std::fs::write(path, elf).unwrap();
}

/// Assemble a minimal ELF64 relocatable file holding the given sections.
fn build_elf(sections: &[(&str, &[u8])]) -> Vec<u8> {
    let mut shstrtab = vec![0u8];
    let mut name_offsets = Vec::new();
    for (name, _) in sections {
        name_offsets.push(shstrtab.len() as u32);
        shstrtab.extend_from_slice(name.as_bytes());
        shstrtab.push(0);
    }
    let shstrtab_name = shstrtab.len() as u32;
    shstrtab.extend_from_slice(b".shstrtab\0");

    let ehsize = 64u64;
    let mut offset = ehsize;
    let mut data_offsets = Vec::new();
    for (_, data) in sections {
        data_offsets.push(offset);
        offset += data.len() as u64;
    }
    let shstrtab_offset = offset;
    offset += shstrtab.len() as u64;
    let pad = (8 - offset % 8) % 8;
    let shoff = offset + pad;
    let shnum = (sections.len() + 2) as u16; // null + sections + shstrtab

    let mut out = Vec::new();
    out.extend_from_slice(&[0x7f, b'E', b'L', b'F', 2, 1, 1, 0]);
    out.extend_from_slice(&[0u8; 8]);
    out.extend_from_slice(&1u16.to_le_bytes()); // ET_REL
    out.extend_from_slice(&0x3eu16.to_le_bytes()); // EM_X86_64
    out.extend_from_slice(&1u32.to_le_bytes());
    out.extend_from_slice(&0u64.to_le_bytes()); // e_entry
    out.extend_from_slice(&0u64.to_le_bytes()); // e_phoff
    out.extend_from_slice(&shoff.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes()); // e_flags
    out.extend_from_slice(&64u16.to_le_bytes()); // e_ehsize
    out.extend_from_slice(&0u16.to_le_bytes()); // e_phentsize
    out.extend_from_slice(&0u16.to_le_bytes()); // e_phnum
    out.extend_from_slice(&64u16.to_le_bytes()); // e_shentsize
    out.extend_from_slice(&shnum.to_le_bytes());
    out.extend_from_slice(&(shnum - 1).to_le_bytes()); // e_shstrndx

    for (_, data) in sections {
        out.extend_from_slice(data);
    }
    out.extend_from_slice(&shstrtab);
    out.extend_from_slice(&vec![0u8; pad as usize]);

    let mut shdr = |name: u32, sh_type: u32, offset: u64, size: u64| {
        out.extend_from_slice(&name.to_le_bytes());
        out.extend_from_slice(&sh_type.to_le_bytes());
        out.extend_from_slice(&0u64.to_le_bytes()); // sh_flags
        out.extend_from_slice(&0u64.to_le_bytes()); // sh_addr
        out.extend_from_slice(&offset.to_le_bytes());
        out.extend_from_slice(&size.to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes()); // sh_link
        out.extend_from_slice(&0u32.to_le_bytes()); // sh_info
        out.extend_from_slice(&1u64.to_le_bytes()); // sh_addralign
        out.extend_from_slice(&0u64.to_le_bytes()); // sh_entsize
    };

    shdr(0, 0, 0, 0); // SHT_NULL
    for (i, (_, data)) in sections.iter().enumerate() {
        shdr(name_offsets[i], 1, data_offsets[i], data.len() as u64); // SHT_PROGBITS
    }
    shdr(shstrtab_name, 3, shstrtab_offset, shstrtab.len() as u64); // SHT_STRTAB

    out
}
