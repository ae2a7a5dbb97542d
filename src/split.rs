//! Locating and linking split (`.dwo`) companion units
//!
//! A skeleton unit names its companion file via DW_AT_dwo_name (or the GNU
//! alias); the companion's split compile unit carries the same 8-byte
//! signature. Resolution is attempted at most once per skeleton and the
//! outcome memoized, including the negative one. Absence of split info is a
//! normal condition: every I/O or decode failure degrades silently to
//! "no split unit found".

use crate::session::{DebugSession, DwarfFile, UnitKind, UnitLink, UnitRef};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Resolve the split companion of the skeleton at `index` in the session's
/// main file. Returns the linked split unit, or `None` permanently.
pub(crate) fn resolve_split(session: &DebugSession, index: usize) -> Option<UnitRef> {
    let main = session.main_file();
    let cell = &main.units[index];

    // Only try once; later calls return the memoized outcome without
    // touching the filesystem.
    if let Some(link) = cell.split.get() {
        return link.as_ref().and_then(UnitLink::upgrade);
    }

    let link = locate_and_link(session, index);
    let link = cell.split.get_or_init(|| link);
    link.as_ref().and_then(UnitLink::upgrade)
}

fn locate_and_link(session: &DebugSession, index: usize) -> Option<UnitLink> {
    let main = session.main_file();
    let cell = &main.units[index];

    if cell.kind() != UnitKind::Skeleton {
        return None;
    }
    let signature = cell.signature()?;

    // A skeleton without a dwo-name attribute has nothing to look for;
    // resolve to none without any filesystem access.
    let dwo_name = main.dwo_name(index)?;
    let comp_dir = main.comp_dir(index);

    let root = session.config().debug_search_root.as_deref();
    let path = candidate_path(root, comp_dir.as_deref(), &dwo_name)?;

    debug!(
        "looking for split unit {} in {}",
        signature,
        path.display()
    );

    // The file is read and parsed inside this call; the handle is gone by
    // the time it returns, whatever the outcome.
    let file = match open_split_file(&path) {
        Ok(file) => file,
        Err(err) => {
            debug!("split file {} unusable: {:#}", path.display(), err);
            return None;
        }
    };

    let split_index = file.units().iter().position(|unit| {
        unit.kind() == UnitKind::SplitCompile
            && unit.signature().map(|s| s.matches(&signature)) == Some(true)
    });

    let Some(split_index) = split_index else {
        debug!(
            "no split compile unit with signature {} in {}",
            signature,
            path.display()
        );
        return None;
    };

    // Link skeleton and split unit both ways, then hand ownership of the
    // companion to the session.
    let file = session.adopt_split_file(file);
    let skeleton_link = UnitLink::new(main, index);
    if file.units()[split_index].skeleton.set(skeleton_link).is_err() {
        warn!(
            "split unit {} in {} already linked to another skeleton",
            signature,
            path.display()
        );
    }
    Some(UnitLink::new(&file, split_index))
}

/// Build the first existing candidate path for a dwo file: the search root
/// joined with the name alone, then root, comp_dir, and name. An absolute
/// dwo name wins over any prefix.
fn candidate_path(
    root: Option<&Path>,
    comp_dir: Option<&str>,
    dwo_name: &str,
) -> Option<PathBuf> {
    let root = root.unwrap_or(Path::new(""));

    let direct = root.join(dwo_name);
    if direct.exists() {
        return Some(direct);
    }

    if let Some(dir) = comp_dir {
        let via_comp_dir = root.join(dir).join(dwo_name);
        if via_comp_dir.exists() {
            return Some(via_comp_dir);
        }
    }

    None
}

fn open_split_file(path: &Path) -> crate::core::Result<DwarfFile> {
    let dwarf = crate::session::load_dwarf_path(path)?;
    DwarfFile::new(dwarf, Some(path.to_path_buf()))
}
