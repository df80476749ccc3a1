use std::io::Cursor;
use std::path::Path;

use exif::{In, Reader, Tag, Value};
use log::{error, warn};

/// Result of a capture-date probe on an image file, returned as a value
/// so failure shape never rides on error types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateOutcome {
    /// 4-digit capture year taken from an embedded timestamp tag.
    Year(String),
    /// The file parsed fine but carries no usable timestamp tag.
    NoDate,
    /// The file vanished mid-read, or the decoder does not recognize it
    /// as an image at all.
    Unreadable,
    /// Any other decode failure.
    Error,
}

/// Probe `path` for a capture year via its embedded metadata.
///
/// Reads the full payload up front (some containers only expose their
/// metadata after a complete read) into a scope-bound buffer, so the
/// file handle is released on every exit path. Tries the original
/// capture timestamp first, then the generic timestamp.
pub fn extract_year(path: &Path) -> DateOutcome {
    let bytes = match std::fs::read(path) {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!("file not found during metadata read: {}", path.display());
            return DateOutcome::Unreadable;
        }
        Err(e) => {
            error!("error reading {} for metadata: {e}", path.display());
            return DateOutcome::Error;
        }
    };

    let exif = match Reader::new().read_from_container(&mut Cursor::new(&bytes)) {
        Ok(exif) => exif,
        // Recognized container, just no metadata block: not a failure.
        Err(exif::Error::NotFound(_)) => return DateOutcome::NoDate,
        Err(exif::Error::InvalidFormat(_)) => {
            warn!(
                "cannot identify image file (possibly corrupt): {}",
                path.display()
            );
            return DateOutcome::Unreadable;
        }
        Err(e) => {
            error!("error decoding metadata for {}: {e}", path.display());
            return DateOutcome::Error;
        }
    };

    for tag in [Tag::DateTimeOriginal, Tag::DateTime] {
        if let Some(field) = exif.get_field(tag, In::PRIMARY) {
            if let Value::Ascii(ref vals) = field.value {
                for raw in vals {
                    let s = String::from_utf8_lossy(raw);
                    if let Some(year) = year_from_timestamp(&s) {
                        return DateOutcome::Year(year.to_string());
                    }
                }
            }
        }
    }
    DateOutcome::NoDate
}

/// Intentionally strict shape check: a timestamp is accepted only if it
/// is at least 10 bytes with colons at offsets 4 and 7 (`YYYY:MM:DD...`).
/// Anything else, including dash-separated dates, is rejected.
fn year_from_timestamp(s: &str) -> Option<&str> {
    let b = s.as_bytes();
    if b.len() >= 10 && b[4] == b':' && b[7] == b':' {
        return s.get(..4);
    }
    None
}
