use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::warn;

use crate::hash;

/// What conflict resolution decided for a desired destination name.
#[derive(Debug, PartialEq, Eq)]
pub enum Placement {
    /// A free (possibly renamed-past-collisions) path to commit to.
    At(PathBuf),
    /// An existing destination file already holds this exact content;
    /// the source is a duplicate and must not be placed.
    DuplicateOfExisting(PathBuf),
}

/// Resolve `desired_name` inside `dir` against files already on disk.
///
/// An existing file with an equal fingerprint makes the source a
/// duplicate. A non-equal one gets renamed past by appending `_1`, `_2`,
/// ... before the extension; the counter restarts at 1 for every item.
/// An existing file that cannot be hashed is treated as a non-match and
/// renamed past rather than silently dropping the source.
pub fn resolve_destination(dir: &Path, desired_name: &str, fingerprint: &str) -> Placement {
    let (stem, ext) = split_name(desired_name);
    let mut candidate = dir.join(desired_name);
    let mut counter = 1u32;
    while candidate.exists() {
        match hash::fingerprint(&candidate) {
            Ok(existing) if existing == fingerprint => {
                return Placement::DuplicateOfExisting(candidate);
            }
            Ok(_) => {}
            Err(e) => {
                warn!(
                    "could not hash existing file {} ({e}); treating as non-match",
                    candidate.display()
                );
            }
        }
        let new_name = numbered_name(stem, ext, counter);
        warn!(
            "filename conflict: trying '{new_name}' in '{}'",
            dir.display()
        );
        candidate = dir.join(new_name);
        counter += 1;
    }
    Placement::At(candidate)
}

/// Name-only fallback used when the source has no fingerprint (hash
/// failure routing): still guarantees an unused destination name.
pub fn next_free_name(dir: &Path, desired_name: &str) -> PathBuf {
    let (stem, ext) = split_name(desired_name);
    let mut candidate = dir.join(desired_name);
    let mut counter = 1u32;
    while candidate.exists() {
        candidate = dir.join(numbered_name(stem, ext, counter));
        counter += 1;
    }
    candidate
}

fn numbered_name(stem: &str, ext: &str, counter: u32) -> String {
    if ext.is_empty() {
        format!("{stem}_{counter}")
    } else {
        format!("{stem}_{counter}.{ext}")
    }
}

fn split_name(name: &str) -> (&str, &str) {
    let path = Path::new(name);
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("file");
    let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("");
    (stem, ext)
}

/// Move a file, falling back to copy-then-remove when rename fails
/// (cross-device moves). The fallback preserves the source mtime.
pub fn move_file(src: &Path, dest: &Path) -> io::Result<()> {
    if fs::rename(src, dest).is_ok() {
        return Ok(());
    }
    fs::copy(src, dest)?;
    if let Ok(meta) = fs::metadata(src) {
        let mtime = filetime::FileTime::from_last_modification_time(&meta);
        filetime::set_file_mtime(dest, mtime).ok();
    }
    fs::remove_file(src)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_free_name_accepted_as_is() {
        let dir = tempdir().unwrap();
        let fp = "00".repeat(32);
        let placement = resolve_destination(dir.path(), "img.jpg", &fp);
        assert_eq!(placement, Placement::At(dir.path().join("img.jpg")));
    }

    #[test]
    fn test_equal_content_is_duplicate() {
        let dir = tempdir().unwrap();
        let existing = dir.path().join("img.jpg");
        fs::write(&existing, b"same bytes").unwrap();
        let fp = hash::fingerprint(&existing).unwrap();

        let placement = resolve_destination(dir.path(), "img.jpg", &fp);
        assert_eq!(placement, Placement::DuplicateOfExisting(existing));
    }

    #[test]
    fn test_distinct_content_renamed_with_counter() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("img.jpg"), b"first").unwrap();
        let other = dir.path().join("probe");
        fs::write(&other, b"second").unwrap();
        let fp = hash::fingerprint(&other).unwrap();

        let placement = resolve_destination(dir.path(), "img.jpg", &fp);
        assert_eq!(placement, Placement::At(dir.path().join("img_1.jpg")));

        // With img_1.jpg also taken by distinct content, counting continues.
        fs::write(dir.path().join("img_1.jpg"), b"third").unwrap();
        let placement = resolve_destination(dir.path(), "img.jpg", &fp);
        assert_eq!(placement, Placement::At(dir.path().join("img_2.jpg")));
    }

    #[test]
    fn test_duplicate_found_behind_renames() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("img.jpg"), b"first").unwrap();
        fs::write(dir.path().join("img_1.jpg"), b"target content").unwrap();
        let fp = hash::fingerprint(&dir.path().join("img_1.jpg")).unwrap();

        let placement = resolve_destination(dir.path(), "img.jpg", &fp);
        assert_eq!(
            placement,
            Placement::DuplicateOfExisting(dir.path().join("img_1.jpg"))
        );
    }

    #[test]
    fn test_next_free_name_counts_past_existing() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("err.bin"), b"x").unwrap();
        fs::write(dir.path().join("err_1.bin"), b"y").unwrap();
        assert_eq!(
            next_free_name(dir.path(), "err.bin"),
            dir.path().join("err_2.bin")
        );
    }

    #[test]
    fn test_extensionless_names() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("README"), b"x").unwrap();
        assert_eq!(
            next_free_name(dir.path(), "README"),
            dir.path().join("README_1")
        );
    }

    #[test]
    fn test_move_file() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("src.bin");
        let dest = dir.path().join("dest.bin");
        fs::write(&src, b"payload").unwrap();

        move_file(&src, &dest).unwrap();
        assert!(!src.exists());
        assert_eq!(fs::read(&dest).unwrap(), b"payload");
    }
}
