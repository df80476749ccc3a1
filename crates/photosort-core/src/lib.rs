pub mod bucket;
pub mod classify;
pub mod convert;
pub mod date;
pub mod hash;
pub mod media;
pub mod scan;
pub mod writer;

#[cfg(test)]
mod test_support;

use std::fs;
use std::io;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Instant;

use anyhow::Context;
use log::{error, info, warn};
use serde::{Deserialize, Serialize};

use bucket::{resolve_bucket, BucketKey, RunState};
use classify::{size_tier, Category};
use date::DateOutcome;
use media::MediaItem;
use writer::Placement;

fn default_quality() -> u8 {
    convert::JPEG_QUALITY
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SortOptions {
    /// Root of the unsorted media pool, walked recursively.
    pub source: PathBuf,
    /// Root of the sorted destination tree.
    pub dest: PathBuf,
    #[serde(default = "default_quality")]
    pub jpeg_quality: u8,
    /// Keep converted HEIC originals under `converted_originals/`
    /// instead of deleting them.
    #[serde(default)]
    pub keep_originals: bool,
    /// Remove directories left empty under the source root after the run.
    #[serde(default = "default_true")]
    pub prune_empty_dirs: bool,
}

impl SortOptions {
    pub fn new(source: impl Into<PathBuf>, dest: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            dest: dest.into(),
            jpeg_quality: convert::JPEG_QUALITY,
            keep_originals: false,
            prune_empty_dirs: true,
        }
    }
}

/// Terminal disposition of one discovered file. Every file that the walk
/// yields ends in exactly one of these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Moved unmodified into a non-error bucket.
    Moved(BucketKey),
    /// HEIC re-encoded to JPEG inside the given bucket.
    Converted(BucketKey),
    /// Content-identical to a file already placed; source deleted.
    DuplicateDeleted,
    /// Unrecognized extension; source deleted.
    NonMediaDeleted,
    /// Failed somewhere; `relocated` tells whether the file made it into
    /// the errors bucket or is still sitting at its source path.
    ErrorRouted { relocated: bool },
    /// Already inside the destination tree, or vanished before action.
    Skipped,
}

/// Per-outcome counters for one run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunSummary {
    pub discovered: u64,
    pub moved: u64,
    pub moved_to_year: u64,
    pub moved_no_date: u64,
    pub moved_archives: u64,
    pub converted: u64,
    pub duplicates_deleted: u64,
    pub non_media_deleted: u64,
    pub errors: u64,
    /// Subset of `errors`: remediation failed too and the file is still
    /// at its source path.
    pub left_in_place: u64,
    pub skipped: u64,
}

impl RunSummary {
    fn record(&mut self, outcome: &Outcome) {
        match outcome {
            Outcome::Moved(bucket) => {
                self.moved += 1;
                match bucket {
                    BucketKey::Year(_) => self.moved_to_year += 1,
                    BucketKey::NoDate(_) => self.moved_no_date += 1,
                    BucketKey::Archives => self.moved_archives += 1,
                    BucketKey::Errors | BucketKey::ConvertedOriginals => {}
                }
            }
            Outcome::Converted(_) => self.converted += 1,
            Outcome::DuplicateDeleted => self.duplicates_deleted += 1,
            Outcome::NonMediaDeleted => self.non_media_deleted += 1,
            Outcome::ErrorRouted { relocated } => {
                self.errors += 1;
                if !relocated {
                    self.left_in_place += 1;
                }
            }
            Outcome::Skipped => self.skipped += 1,
        }
    }

    fn log(&self) {
        info!("--- sorting summary ---");
        info!("files moved to year folders: {}", self.moved_to_year);
        info!("HEIC files converted to JPEG: {}", self.converted);
        info!("files moved to no_date subfolders: {}", self.moved_no_date);
        info!("archive files moved: {}", self.moved_archives);
        info!("non-media files deleted: {}", self.non_media_deleted);
        info!(
            "duplicate files deleted from source: {}",
            self.duplicates_deleted
        );
        info!("files that hit errors: {}", self.errors);
        if self.left_in_place > 0 {
            warn!(
                "files left in place after failed remediation: {}",
                self.left_in_place
            );
        }
        info!("files skipped: {}", self.skipped);
    }
}

/// Type alias for progress callback
pub type ProgressCallback = dyn Fn(&str, u64, u64, &str) + Send + Sync;

/// Throttled progress reporter — emits at most every 200ms or on completion.
pub struct ThrottledProgress<'a> {
    inner: &'a ProgressCallback,
    last_emit: Mutex<Instant>,
}

impl<'a> ThrottledProgress<'a> {
    pub fn new(inner: &'a ProgressCallback) -> Self {
        Self {
            inner,
            last_emit: Mutex::new(Instant::now() - std::time::Duration::from_secs(1)),
        }
    }

    pub fn report(&self, stage: &str, current: u64, total: u64, message: &str) {
        let is_done = current + 1 >= total;
        if !is_done {
            let mut last = self.last_emit.lock().unwrap();
            if last.elapsed().as_millis() < 200 {
                return;
            }
            *last = Instant::now();
        }
        (self.inner)(stage, current, total, message);
    }
}

/// Run the whole pipeline: walk the source tree and carry every file
/// through classification, date resolution, bucket assignment, dedup,
/// conflict resolution and commit. No single file's failure aborts the
/// run; failures are contained at the per-file boundary.
pub fn sort_media(
    options: &SortOptions,
    progress_callback: &ProgressCallback,
) -> anyhow::Result<RunSummary> {
    let tp = ThrottledProgress::new(progress_callback);

    if !options.source.is_dir() {
        anyhow::bail!(
            "source directory '{}' not found",
            options.source.display()
        );
    }
    fs::create_dir_all(&options.dest).with_context(|| {
        format!(
            "could not create destination root '{}'",
            options.dest.display()
        )
    })?;

    // The walk and the destination guard must agree on path shape no
    // matter how the caller spelled the roots ('./' prefixes, '..'
    // components, symlinks), so both are resolved to canonical form
    // before anything is enumerated.
    let source = options.source.canonicalize().with_context(|| {
        format!("could not resolve source root '{}'", options.source.display())
    })?;
    let dest = options.dest.canonicalize().with_context(|| {
        format!(
            "could not resolve destination root '{}'",
            options.dest.display()
        )
    })?;

    info!(
        "starting media sort from '{}' to '{}'",
        options.source.display(),
        options.dest.display()
    );
    info!(
        "HEIC/HEIF files will be converted to JPEG (quality {})",
        options.jpeg_quality
    );

    // Pre-count so progress totals mean something; the walk restarts
    // cleanly for the processing pass.
    let total = scan::SourceWalk::new(&source).count() as u64;

    let mut state = RunState::new(&dest);
    let mut summary = RunSummary::default();

    for (idx, path) in scan::SourceWalk::new(&source).enumerate() {
        summary.discovered += 1;
        let mut item = MediaItem::new(path);
        let name = item.file_name();

        let outcome = match process_one(&mut item, options, &mut state) {
            Ok(outcome) => outcome,
            Err(err) => {
                // Containment boundary: log, count, and try to park the
                // file in the errors bucket if it is still there.
                error!(
                    "unexpected error processing '{}': {err:#}",
                    item.path().display()
                );
                if item.path().exists() {
                    match relocate_to_errors(item.path(), None, &mut state) {
                        Ok(()) => Outcome::ErrorRouted { relocated: true },
                        Err(e) => {
                            error!(
                                "could not move '{}' to errors bucket: {e:#}; file left in place",
                                item.path().display()
                            );
                            Outcome::ErrorRouted { relocated: false }
                        }
                    }
                } else {
                    Outcome::Skipped
                }
            }
        };
        summary.record(&outcome);
        tp.report("sort", idx as u64, total, &name);
    }

    if options.prune_empty_dirs {
        scan::prune_empty_dirs(&source);
    }

    summary.log();
    Ok(summary)
}

/// Carry one file through the state machine. Expected failures are
/// handled in place and become an [`Outcome`]; only genuinely unexpected
/// errors bubble up to the per-file containment boundary.
fn process_one(
    item: &mut MediaItem,
    options: &SortOptions,
    state: &mut RunState,
) -> anyhow::Result<Outcome> {
    // Never reprocess the tool's own output.
    if item.path().starts_with(state.dest_root()) {
        info!(
            "skipping file already in destination tree: {}",
            item.path().display()
        );
        return Ok(Outcome::Skipped);
    }

    let category = item.category();

    if category == Category::Unclassified {
        return Ok(match fs::remove_file(item.path()) {
            Ok(()) => {
                info!(
                    "deleted '{}' (not a recognized media file)",
                    item.file_name()
                );
                Outcome::NonMediaDeleted
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Outcome::Skipped,
            Err(e) => {
                error!(
                    "could not delete non-media file '{}': {e}",
                    item.path().display()
                );
                Outcome::ErrorRouted { relocated: false }
            }
        });
    }

    // Date resolution: only images carry metadata timestamps; videos are
    // unconditionally dateless by policy.
    let date = match category {
        Category::Image | Category::HeicImage => date::extract_year(item.path()),
        _ => DateOutcome::NoDate,
    };
    if date == DateOutcome::Unreadable && !item.path().exists() {
        return Ok(Outcome::Skipped);
    }

    let bucket = resolve_bucket(category, &date, || size_tier(item.path()));

    let fingerprint = match item.fingerprint() {
        Ok(fp) => fp.to_string(),
        Err(e) => {
            if !item.path().exists() {
                return Ok(Outcome::Skipped);
            }
            // Hash failure overrides whatever bucket was resolved.
            warn!(
                "could not hash '{}': {e:#}; routing to errors bucket",
                item.path().display()
            );
            return Ok(match relocate_to_errors(item.path(), None, state) {
                Ok(()) => Outcome::ErrorRouted { relocated: true },
                Err(err) => {
                    error!(
                        "could not move '{}' to errors bucket: {err:#}; file left in place",
                        item.path().display()
                    );
                    Outcome::ErrorRouted { relocated: false }
                }
            });
        }
    };

    // Run-scoped dedup: one survivor per fingerprint per bucket.
    if state.is_duplicate(&bucket, &fingerprint) {
        warn!(
            "duplicate detected (hash match in run): '{}' for {:?}; deleting source",
            item.file_name(),
            bucket.relative_path()
        );
        return Ok(delete_source(item.path()));
    }

    let dir = state.bucket_dir(&bucket)?;
    let convert_to_jpeg = category == Category::HeicImage && bucket != BucketKey::Errors;
    let name = item.file_name();
    let desired = if convert_to_jpeg {
        let stem = Path::new(&name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("file");
        format!("{stem}.jpg")
    } else {
        name.clone()
    };

    match writer::resolve_destination(&dir, &desired, &fingerprint) {
        Placement::DuplicateOfExisting(existing) => {
            warn!(
                "duplicate detected (hash matches existing '{}'); deleting source '{}'",
                existing.display(),
                item.file_name()
            );
            Ok(delete_source(item.path()))
        }
        Placement::At(dest) => {
            if convert_to_jpeg {
                Ok(commit_conversion(
                    item.path(),
                    &dest,
                    &bucket,
                    fingerprint,
                    options,
                    state,
                ))
            } else {
                Ok(commit_move(item.path(), &dest, &bucket, fingerprint, state))
            }
        }
    }
}

/// Move commit for everything except HEIC conversions.
fn commit_move(
    src: &Path,
    dest: &Path,
    bucket: &BucketKey,
    fingerprint: String,
    state: &mut RunState,
) -> Outcome {
    match writer::move_file(src, dest) {
        Ok(()) => {
            info!("moved '{}' -> '{}'", src.display(), dest.display());
            state.mark_committed(bucket, fingerprint);
            if *bucket == BucketKey::Errors {
                Outcome::ErrorRouted { relocated: true }
            } else {
                Outcome::Moved(bucket.clone())
            }
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Outcome::Skipped,
        Err(e) => {
            error!(
                "could not move '{}' to '{}': {e}",
                src.display(),
                dest.display()
            );
            if *bucket == BucketKey::Errors {
                return Outcome::ErrorRouted { relocated: false };
            }
            match relocate_to_errors(src, Some(&fingerprint), state) {
                Ok(()) => Outcome::ErrorRouted { relocated: true },
                Err(err) => {
                    error!(
                        "could not move '{}' to errors bucket: {err:#}; file left in place",
                        src.display()
                    );
                    Outcome::ErrorRouted { relocated: false }
                }
            }
        }
    }
}

/// Conversion commit for HEIC/HEIF items headed to a non-error bucket.
/// On success the original is deleted (or archived under
/// `converted_originals/`); on failure the original, unconverted file is
/// routed to the errors bucket.
fn commit_conversion(
    src: &Path,
    dest: &Path,
    bucket: &BucketKey,
    fingerprint: String,
    options: &SortOptions,
    state: &mut RunState,
) -> Outcome {
    info!("converting '{}' -> '{}'", src.display(), dest.display());
    match convert::heic_to_jpeg(src, dest, options.jpeg_quality) {
        Ok(()) => {
            // Dedup tracks the fingerprint of the original HEIC, so a
            // second copy of the same source is caught even though the
            // committed bytes are the re-encoded JPEG.
            state.mark_committed(bucket, fingerprint.clone());
            dispose_converted_original(src, &fingerprint, options, state);
            Outcome::Converted(bucket.clone())
        }
        Err(e) => {
            error!("failed to convert '{}': {e:#}", src.display());
            match relocate_to_errors(src, Some(&fingerprint), state) {
                Ok(()) => Outcome::ErrorRouted { relocated: true },
                Err(err) => {
                    error!(
                        "could not move failed HEIC '{}' to errors bucket: {err:#}; file left in place",
                        src.display()
                    );
                    Outcome::ErrorRouted { relocated: false }
                }
            }
        }
    }
}

/// After a successful conversion the JPEG already exists, so every
/// failure here is logged but never downgrades the outcome.
fn dispose_converted_original(
    src: &Path,
    fingerprint: &str,
    options: &SortOptions,
    state: &mut RunState,
) {
    if !options.keep_originals {
        if let Err(e) = fs::remove_file(src) {
            error!(
                "could not delete original '{}' after conversion: {e}",
                src.display()
            );
        }
        return;
    }

    let dir = match state.bucket_dir(&BucketKey::ConvertedOriginals) {
        Ok(dir) => dir,
        Err(e) => {
            warn!("could not create converted_originals: {e:#}; original kept at source");
            return;
        }
    };
    let name = src
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "file".to_string());
    match writer::resolve_destination(&dir, &name, fingerprint) {
        Placement::At(dest) => {
            if let Err(e) = writer::move_file(src, &dest) {
                warn!(
                    "could not archive original '{}': {e}; original kept at source",
                    src.display()
                );
            }
        }
        Placement::DuplicateOfExisting(_) => {
            if let Err(e) = fs::remove_file(src) {
                warn!(
                    "could not delete already-archived original '{}': {e}",
                    src.display()
                );
            }
        }
    }
}

/// Delete a source file whose content is already represented in the
/// destination (duplicate handling).
fn delete_source(path: &Path) -> Outcome {
    match fs::remove_file(path) {
        Ok(()) => Outcome::DuplicateDeleted,
        Err(e) if e.kind() == io::ErrorKind::NotFound => Outcome::Skipped,
        Err(e) => {
            error!(
                "could not delete duplicate source '{}': {e}",
                path.display()
            );
            Outcome::ErrorRouted { relocated: false }
        }
    }
}

/// Park a failed file in the errors bucket with conflict-resolved
/// naming. Without a fingerprint (hash failures), the name-only counter
/// loop still guarantees a free destination.
fn relocate_to_errors(
    path: &Path,
    fingerprint: Option<&str>,
    state: &mut RunState,
) -> anyhow::Result<()> {
    let dir = state.bucket_dir(&BucketKey::Errors)?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "file".to_string());
    let dest = match fingerprint {
        Some(fp) => match writer::resolve_destination(&dir, &name, fp) {
            Placement::At(dest) => dest,
            Placement::DuplicateOfExisting(existing) => {
                warn!(
                    "'{}' duplicates '{}' already in errors bucket; deleting source",
                    path.display(),
                    existing.display()
                );
                fs::remove_file(path)?;
                return Ok(());
            }
        },
        None => writer::next_free_name(&dir, &name),
    };
    writer::move_file(path, &dest)?;
    info!(
        "moved '{}' to errors bucket as '{}'",
        path.display(),
        dest.display()
    );
    Ok(())
}
