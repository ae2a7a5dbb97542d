//! Debug-info session: owns decoded DWARF files and their units
//!
//! A session owns one `DwarfFile` for the main object plus any split
//! companions opened on demand. Units and DIEs live as long as the session;
//! skeleton/split links are weak back-pointers resolved at most once and
//! memoized, so the two-node link cycle never owns anything.

use crate::core::{Result, UnitSignature};
use anyhow::Context as _;
use gimli::Reader as _;
use once_cell::sync::OnceCell;
use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};
use tracing::debug;

/// Reader over owned section copies; no borrowed lifetimes in the session.
pub type Reader = gimli::EndianArcSlice<gimli::LittleEndian>;

/// How a unit participates in the split-DWARF scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitKind {
    /// A regular compile unit, no split companion involved.
    Ordinary,
    /// A skeleton unit in the main binary; the bulk of its debug data lives
    /// in a companion named by DW_AT_dwo_name / DW_AT_GNU_dwo_name.
    Skeleton,
    /// A split compile unit inside a `.dwo` file.
    SplitCompile,
    TypeUnit,
    Partial,
}

/// A weak reference to a unit in some session-owned file. Lookup-only; the
/// session's `Arc`s hold the real ownership.
#[derive(Clone)]
pub struct UnitLink {
    file: Weak<DwarfFile>,
    index: usize,
}

impl UnitLink {
    pub(crate) fn new(file: &Arc<DwarfFile>, index: usize) -> Self {
        UnitLink {
            file: Arc::downgrade(file),
            index,
        }
    }

    /// Upgrade to a usable reference; `None` once the owning session is gone.
    pub fn upgrade(&self) -> Option<UnitRef> {
        self.file.upgrade().map(|file| UnitRef {
            file,
            index: self.index,
        })
    }
}

/// A resolved reference to one unit of one file.
#[derive(Clone)]
pub struct UnitRef {
    pub file: Arc<DwarfFile>,
    pub index: usize,
}

impl UnitRef {
    pub fn cell(&self) -> &UnitCell {
        &self.file.units[self.index]
    }

    pub fn unit(&self) -> &gimli::Unit<Reader> {
        &self.cell().unit
    }

    /// Whether this refers to the same unit as `(file, index)`.
    pub fn is(&self, file: &Arc<DwarfFile>, index: usize) -> bool {
        Arc::ptr_eq(&self.file, file) && self.index == index
    }
}

/// One decoded unit plus its split-link state.
pub struct UnitCell {
    pub(crate) unit: gimli::Unit<Reader>,
    kind: UnitKind,
    signature: Option<UnitSignature>,
    /// Coverage of this unit's entries in `.debug_info`, for resolving
    /// section-relative DIE references.
    info_range: Option<(u64, u64)>,
    /// Tri-state split cache: unset = unresolved, `Some(None)` = resolved to
    /// none, `Some(Some(_))` = resolved. Written at most once.
    pub(crate) split: OnceCell<Option<UnitLink>>,
    /// Back-reference from a split unit to its skeleton, set when linked.
    pub(crate) skeleton: OnceCell<UnitLink>,
}

impl UnitCell {
    pub fn unit(&self) -> &gimli::Unit<Reader> {
        &self.unit
    }

    pub fn kind(&self) -> UnitKind {
        self.kind
    }

    pub fn signature(&self) -> Option<UnitSignature> {
        self.signature
    }

    /// The memoized split link, if resolution already ran.
    pub fn split_link(&self) -> Option<Option<UnitRef>> {
        self.split
            .get()
            .map(|link| link.as_ref().and_then(UnitLink::upgrade))
    }

    /// The skeleton this split unit was linked back to, if any.
    pub fn skeleton_link(&self) -> Option<UnitRef> {
        self.skeleton.get().and_then(UnitLink::upgrade)
    }
}

/// One DWARF file (main object or split companion) with its decoded units.
pub struct DwarfFile {
    dwarf: gimli::Dwarf<Reader>,
    pub(crate) units: Vec<UnitCell>,
    path: Option<PathBuf>,
}

impl DwarfFile {
    /// Decode the unit list of an already-loaded DWARF view.
    pub fn new(dwarf: gimli::Dwarf<Reader>, path: Option<PathBuf>) -> Result<Self> {
        let mut units = Vec::new();
        let mut iter = dwarf.units();
        while let Some(header) = iter.next()? {
            let info_range = header
                .offset()
                .as_debug_info_offset()
                .map(|start| (start.0 as u64, (start.0 + header.length_including_self()) as u64));
            let unit = dwarf.unit(header)?;
            let (kind, signature) = classify_unit(&unit);
            units.push(UnitCell {
                unit,
                kind,
                signature,
                info_range,
                split: OnceCell::new(),
                skeleton: OnceCell::new(),
            });
        }
        debug!(
            "decoded {} units from {}",
            units.len(),
            path.as_deref().unwrap_or(Path::new("<memory>")).display()
        );
        Ok(DwarfFile { dwarf, units, path })
    }

    pub fn dwarf(&self) -> &gimli::Dwarf<Reader> {
        &self.dwarf
    }

    pub fn units(&self) -> &[UnitCell] {
        &self.units
    }

    pub fn unit(&self, index: usize) -> &UnitCell {
        &self.units[index]
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Index of the unit whose `.debug_info` entries cover `offset`.
    pub fn unit_containing(&self, offset: gimli::DebugInfoOffset) -> Option<usize> {
        let off = offset.0 as u64;
        self.units.iter().position(|cell| {
            cell.info_range
                .map(|(start, end)| off >= start && off < end)
                .unwrap_or(false)
        })
    }

    /// Convert a section-relative DIE offset into a unit-relative one.
    pub(crate) fn to_unit_offset(
        &self,
        unit_index: usize,
        offset: gimli::DebugInfoOffset,
    ) -> Option<gimli::UnitOffset> {
        let (start, end) = self.units[unit_index].info_range?;
        let off = offset.0 as u64;
        if off < start || off >= end {
            return None;
        }
        Some(gimli::UnitOffset((off - start) as usize))
    }

    /// The unit's dwo-name attribute (DW_AT_dwo_name or the GNU alias).
    pub(crate) fn dwo_name(&self, index: usize) -> Option<String> {
        let unit = &self.units[index].unit;
        let attr = unit.dwo_name().ok().flatten()?;
        let s = self.dwarf.attr_string(unit, attr).ok()?;
        Some(s.to_string_lossy().ok()?.into_owned())
    }

    /// The unit's DW_AT_comp_dir, when present.
    pub(crate) fn comp_dir(&self, index: usize) -> Option<String> {
        let unit = &self.units[index].unit;
        let dir = unit.comp_dir.as_ref()?;
        Some(dir.to_string_lossy().ok()?.into_owned())
    }
}

fn classify_unit(unit: &gimli::Unit<Reader>) -> (UnitKind, Option<UnitSignature>) {
    match unit.header.type_() {
        gimli::UnitType::Skeleton(id) => (UnitKind::Skeleton, Some(id.into())),
        gimli::UnitType::SplitCompilation(id) => (UnitKind::SplitCompile, Some(id.into())),
        gimli::UnitType::Compilation => match unit.dwo_id {
            // Pre-v5 GNU fission: the skeleton side names its companion,
            // the .dwo side only carries the id.
            Some(id) => {
                let has_dwo_name = matches!(unit.dwo_name(), Ok(Some(_)));
                if has_dwo_name {
                    (UnitKind::Skeleton, Some(id.into()))
                } else {
                    (UnitKind::SplitCompile, Some(id.into()))
                }
            }
            None => (UnitKind::Ordinary, None),
        },
        gimli::UnitType::Type { .. } | gimli::UnitType::SplitType { .. } => {
            (UnitKind::TypeUnit, None)
        }
        gimli::UnitType::Partial => (UnitKind::Partial, None),
    }
}

/// Session configuration consumed from the surrounding toolkit.
#[derive(Debug, Clone, Default)]
pub struct SessionConfig {
    /// Search root joined with dwo names when locating split companions.
    pub debug_search_root: Option<PathBuf>,
}

/// A debug-info session: the owner of all decoded units and split links.
pub struct DebugSession {
    main: Arc<DwarfFile>,
    /// Split companions opened so far; grow-only, written once per skeleton.
    splits: RefCell<Vec<Arc<DwarfFile>>>,
    config: SessionConfig,
}

impl DebugSession {
    /// Build a session over an already-decoded DWARF view. Section parsing
    /// is the collaborator's job; this only walks the unit list.
    pub fn new(dwarf: gimli::Dwarf<Reader>, config: SessionConfig) -> Result<Self> {
        Ok(DebugSession {
            main: Arc::new(DwarfFile::new(dwarf, None)?),
            splits: RefCell::new(Vec::new()),
            config,
        })
    }

    /// Open an ELF object and build a session over its DWARF sections.
    pub fn from_path<P: AsRef<Path>>(path: P, config: SessionConfig) -> Result<Self> {
        let path = path.as_ref();
        let dwarf = load_dwarf_path(path)?;
        Ok(DebugSession {
            main: Arc::new(DwarfFile::new(dwarf, Some(path.to_path_buf()))?),
            splits: RefCell::new(Vec::new()),
            config,
        })
    }

    pub fn main_file(&self) -> &Arc<DwarfFile> {
        &self.main
    }

    pub fn unit_count(&self) -> usize {
        self.main.units.len()
    }

    pub fn unit(&self, index: usize) -> &UnitCell {
        &self.main.units[index]
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Locate and link the split companion of the skeleton unit at `index`
    /// in the main file. See [`crate::split`] for the search semantics.
    /// Idempotent: the result is memoized per unit for the session lifetime.
    pub fn resolve_split(&self, index: usize) -> Option<UnitRef> {
        crate::split::resolve_split(self, index)
    }

    pub(crate) fn adopt_split_file(&self, file: DwarfFile) -> Arc<DwarfFile> {
        let file = Arc::new(file);
        self.splits.borrow_mut().push(file.clone());
        file
    }
}

/// Load the DWARF sections of a parsed object into owned storage.
pub fn load_dwarf_object(object: &object::File<'_>) -> Result<gimli::Dwarf<Reader>> {
    use object::{Object, ObjectSection};

    let load_section = |id: gimli::SectionId| -> Result<Reader> {
        let data = object
            .section_by_name(id.name())
            .and_then(|section| section.uncompressed_data().ok())
            .unwrap_or(std::borrow::Cow::Borrowed(&[]));
        Ok(Reader::new(Arc::from(data.as_ref()), gimli::LittleEndian))
    };

    gimli::Dwarf::load(load_section)
}

/// Read an ELF file and load its DWARF sections. The file handle is
/// released as soon as the contents are in memory.
pub fn load_dwarf_path(path: &Path) -> Result<gimli::Dwarf<Reader>> {
    let data = std::fs::read(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let object = object::File::parse(&*data)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    load_dwarf_object(&object)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    #[test]
    fn classifies_skeleton_and_ordinary_units() {
        let dwarf = fixtures::skeleton_dwarf(0x1122334455667788, "foo.dwo", Some("/src"));
        let session = DebugSession::new(dwarf, SessionConfig::default()).unwrap();

        assert_eq!(session.unit_count(), 1);
        let cell = session.unit(0);
        assert_eq!(cell.kind(), UnitKind::Skeleton);
        assert_eq!(
            cell.signature(),
            Some(UnitSignature(0x1122334455667788))
        );

        let dwarf = fixtures::base_type_dwarf();
        let session = DebugSession::new(dwarf, SessionConfig::default()).unwrap();
        assert_eq!(session.unit(0).kind(), UnitKind::Ordinary);
        assert_eq!(session.unit(0).signature(), None);
    }

    #[test]
    fn unit_containing_maps_section_offsets() {
        let dwarf = fixtures::base_type_dwarf();
        let file = DwarfFile::new(dwarf, None).unwrap();

        // The sole unit starts at section offset 0 and covers its DIEs.
        assert_eq!(file.unit_containing(gimli::DebugInfoOffset(0x0c)), Some(0));
        assert_eq!(file.unit_containing(gimli::DebugInfoOffset(0x10000)), None);

        let unit_off = file
            .to_unit_offset(0, gimli::DebugInfoOffset(0x0c))
            .unwrap();
        assert_eq!(unit_off, gimli::UnitOffset(0x0c));
    }
}
