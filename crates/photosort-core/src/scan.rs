use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

/// Lazy, restartable enumeration of source files.
///
/// Wraps a recursive walk yielding only regular files; directories are
/// traversed but not otherwise distinguished, symlinks are not followed.
/// Unreadable entries are logged and skipped. A fresh `SourceWalk` over
/// the same root restarts the sequence from the beginning.
pub struct SourceWalk {
    inner: walkdir::IntoIter,
}

impl SourceWalk {
    pub fn new(source_root: &Path) -> Self {
        Self {
            inner: WalkDir::new(source_root).follow_links(false).into_iter(),
        }
    }
}

impl Iterator for SourceWalk {
    type Item = PathBuf;

    fn next(&mut self) -> Option<PathBuf> {
        loop {
            match self.inner.next()? {
                Ok(entry) if entry.file_type().is_file() => return Some(entry.into_path()),
                Ok(_) => continue,
                Err(e) => {
                    log::warn!("error walking source tree: {e}");
                    continue;
                }
            }
        }
    }
}

/// Remove directories left empty under `root` after a run, deepest first,
/// repeating until a fixed point (capped). The root itself survives.
pub fn prune_empty_dirs(root: &Path) {
    for _ in 0..10 {
        if remove_empty_dirs_pass(root) == 0 {
            break;
        }
    }
}

fn remove_empty_dirs_pass(root: &Path) -> usize {
    let mut dirs: Vec<PathBuf> = WalkDir::new(root)
        .min_depth(1)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_dir())
        .map(|e| e.into_path())
        .collect();
    // Deepest first so parents can empty out within the same pass.
    dirs.sort_by_key(|d| std::cmp::Reverse(d.components().count()));

    let mut removed = 0;
    for dir in dirs {
        let is_empty = fs::read_dir(&dir)
            .map(|mut entries| entries.next().is_none())
            .unwrap_or(false);
        if is_empty && fs::remove_dir(&dir).is_ok() {
            log::info!("removed empty directory: {}", dir.display());
            removed += 1;
        }
    }
    removed
}
