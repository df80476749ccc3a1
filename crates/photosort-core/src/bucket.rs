use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use crate::classify::{Category, SizeTier};
use crate::date::DateOutcome;

/// Identity of a destination directory under the output root.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BucketKey {
    /// One folder per resolved capture year.
    Year(String),
    /// Dateless files, sub-keyed by size tier.
    NoDate(SizeTier),
    Archives,
    Errors,
    /// Originals of converted HEICs, when the caller keeps them.
    ConvertedOriginals,
}

impl BucketKey {
    pub fn relative_path(&self) -> PathBuf {
        match self {
            BucketKey::Year(year) => PathBuf::from(year),
            BucketKey::NoDate(tier) => Path::new("no_date").join(tier.folder_name()),
            BucketKey::Archives => PathBuf::from("archives"),
            BucketKey::Errors => PathBuf::from("errors"),
            BucketKey::ConvertedOriginals => PathBuf::from("converted_originals"),
        }
    }
}

/// Decision table for target-directory selection, in precedence order:
/// archives, then unreadable/error routing, then year, then no-date tier.
/// `Unclassified` items are deleted before ever reaching this resolver.
pub fn resolve_bucket<F>(category: Category, date: &DateOutcome, size_tier: F) -> BucketKey
where
    F: FnOnce() -> SizeTier,
{
    if category == Category::Archive {
        return BucketKey::Archives;
    }
    match date {
        DateOutcome::Unreadable | DateOutcome::Error => BucketKey::Errors,
        DateOutcome::Year(year) => BucketKey::Year(year.clone()),
        DateOutcome::NoDate => BucketKey::NoDate(size_tier()),
    }
}

/// Run-scoped pipeline context: the fingerprints committed into each
/// bucket so far, plus the directories already created. Passed explicitly
/// through the pipeline; a parallel walk would only need to synchronize
/// this one structure to keep at most one survivor per fingerprint per
/// bucket.
pub struct RunState {
    dest_root: PathBuf,
    committed: HashMap<BucketKey, HashSet<String>>,
    created_dirs: HashSet<PathBuf>,
}

impl RunState {
    pub fn new(dest_root: &Path) -> Self {
        Self {
            dest_root: dest_root.to_path_buf(),
            committed: HashMap::new(),
            created_dirs: HashSet::new(),
        }
    }

    pub fn dest_root(&self) -> &Path {
        &self.dest_root
    }

    /// Absolute directory for a bucket, created lazily on first use and
    /// at most once per run.
    pub fn bucket_dir(&mut self, key: &BucketKey) -> anyhow::Result<PathBuf> {
        let dir = self.dest_root.join(key.relative_path());
        if !self.created_dirs.contains(&dir) {
            fs::create_dir_all(&dir)?;
            self.created_dirs.insert(dir.clone());
        }
        Ok(dir)
    }

    pub fn is_duplicate(&self, key: &BucketKey, fingerprint: &str) -> bool {
        self.committed
            .get(key)
            .is_some_and(|set| set.contains(fingerprint))
    }

    /// Record a fingerprint for a bucket. Called only after a successful
    /// commit, so items that fail later never reserve a fingerprint.
    pub fn mark_committed(&mut self, key: &BucketKey, fingerprint: String) {
        self.committed
            .entry(key.clone())
            .or_default()
            .insert(fingerprint);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_decision_table_precedence() {
        // Archives win regardless of date outcome.
        assert_eq!(
            resolve_bucket(Category::Archive, &DateOutcome::NoDate, || SizeTier::Tiny),
            BucketKey::Archives
        );
        assert_eq!(
            resolve_bucket(Category::Image, &DateOutcome::Unreadable, || SizeTier::Tiny),
            BucketKey::Errors
        );
        assert_eq!(
            resolve_bucket(Category::Image, &DateOutcome::Error, || SizeTier::Tiny),
            BucketKey::Errors
        );
        assert_eq!(
            resolve_bucket(
                Category::Image,
                &DateOutcome::Year("2021".to_string()),
                || SizeTier::Tiny
            ),
            BucketKey::Year("2021".to_string())
        );
        assert_eq!(
            resolve_bucket(Category::Video, &DateOutcome::NoDate, || SizeTier::Large),
            BucketKey::NoDate(SizeTier::Large)
        );
    }

    #[test]
    fn test_size_tier_only_computed_for_no_date() {
        // The closure must not run when a year is resolved.
        let key = resolve_bucket(
            Category::Image,
            &DateOutcome::Year("2020".to_string()),
            || panic!("tier computed for dated item"),
        );
        assert_eq!(key, BucketKey::Year("2020".to_string()));
    }

    #[test]
    fn test_relative_paths() {
        assert_eq!(
            BucketKey::Year("2021".to_string()).relative_path(),
            PathBuf::from("2021")
        );
        assert_eq!(
            BucketKey::NoDate(SizeTier::Tiny).relative_path(),
            Path::new("no_date").join("tiny_under_0.5MB")
        );
        assert_eq!(BucketKey::Errors.relative_path(), PathBuf::from("errors"));
    }

    #[test]
    fn test_bucket_dir_created_once() {
        let dir = tempdir().unwrap();
        let mut state = RunState::new(dir.path());
        let key = BucketKey::Year("2023".to_string());

        let first = state.bucket_dir(&key).unwrap();
        assert!(first.is_dir());
        assert_eq!(state.bucket_dir(&key).unwrap(), first);
    }

    #[test]
    fn test_dedup_is_per_bucket() {
        let dir = tempdir().unwrap();
        let mut state = RunState::new(dir.path());
        let year = BucketKey::Year("2021".to_string());
        let errors = BucketKey::Errors;

        assert!(!state.is_duplicate(&year, "abc"));
        state.mark_committed(&year, "abc".to_string());
        assert!(state.is_duplicate(&year, "abc"));
        // Same fingerprint in a different bucket is not a duplicate.
        assert!(!state.is_duplicate(&errors, "abc"));
    }
}
