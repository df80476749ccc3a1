use std::path::Path;

/// Media category derived from a file's extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Image,
    /// HEIC/HEIF: an image sub-category that gets re-encoded to JPEG on commit.
    HeicImage,
    Video,
    Archive,
    /// Not a recognized media extension; deleted by the pipeline.
    Unclassified,
}

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "tiff", "bmp", "heic", "heif"];
const HEIC_EXTENSIONS: &[&str] = &["heic", "heif"];
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "avi", "mov", "wmv", "mkv", "flv", "mpeg", "mpg", "m4v"];
const ARCHIVE_EXTENSIONS: &[&str] = &["zip", "rar", "7z", "tar", "gz", "bz2", "xz"];
const COMPOUND_ARCHIVE_SUFFIXES: &[&str] = &[".tar.gz", ".tar.bz2", ".tar.xz"];

/// Map a file name's extension to a [`Category`]. Case-insensitive,
/// pure lookup against the fixed sets above.
pub fn classify(path: &Path) -> Category {
    let name = match path.file_name().and_then(|n| n.to_str()) {
        Some(n) => n.to_ascii_lowercase(),
        None => return Category::Unclassified,
    };
    if COMPOUND_ARCHIVE_SUFFIXES.iter().any(|s| name.ends_with(s)) {
        return Category::Archive;
    }
    let ext = match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => ext,
        _ => return Category::Unclassified,
    };
    if HEIC_EXTENSIONS.contains(&ext) {
        Category::HeicImage
    } else if IMAGE_EXTENSIONS.contains(&ext) {
        Category::Image
    } else if VIDEO_EXTENSIONS.contains(&ext) {
        Category::Video
    } else if ARCHIVE_EXTENSIONS.contains(&ext) {
        Category::Archive
    } else {
        Category::Unclassified
    }
}

/// Byte-size tier used to sub-bucket files that carry no capture date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SizeTier {
    Tiny,
    Small,
    Medium,
    Large,
    Xlarge,
    Huge,
    /// Stat failure; a non-fatal degrade, not an error outcome.
    Unknown,
}

impl SizeTier {
    pub fn folder_name(self) -> &'static str {
        match self {
            SizeTier::Tiny => "tiny_under_0.5MB",
            SizeTier::Small => "small_0.5-1MB",
            SizeTier::Medium => "medium_1-2MB",
            SizeTier::Large => "large_2-5MB",
            SizeTier::Xlarge => "xlarge_5-10MB",
            SizeTier::Huge => "huge_over_10MB",
            SizeTier::Unknown => "unknown_size",
        }
    }

    pub fn from_len(bytes: u64) -> Self {
        let mb = bytes as f64 / (1024.0 * 1024.0);
        if mb < 0.5 {
            SizeTier::Tiny
        } else if mb < 1.0 {
            SizeTier::Small
        } else if mb < 2.0 {
            SizeTier::Medium
        } else if mb < 5.0 {
            SizeTier::Large
        } else if mb < 10.0 {
            SizeTier::Xlarge
        } else {
            SizeTier::Huge
        }
    }
}

/// Tier for the file at `path`, degrading to [`SizeTier::Unknown`] when
/// the size cannot be read.
pub fn size_tier(path: &Path) -> SizeTier {
    match std::fs::metadata(path) {
        Ok(meta) => SizeTier::from_len(meta.len()),
        Err(e) => {
            log::warn!("could not get file size for {}: {e}", path.display());
            SizeTier::Unknown
        }
    }
}
