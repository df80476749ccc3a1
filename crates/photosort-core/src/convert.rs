//! HEIC/HEIF to JPEG re-encoding.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::Context;
use image::codecs::jpeg::JpegEncoder;
use image::RgbImage;

/// Fixed quality for re-encoded JPEG output.
pub const JPEG_QUALITY: u8 = 95;

/// Decodes the primary image of a HEIF container and writes it to
/// `dest` as a JPEG, carrying the source mtime over to the output.
#[cfg(feature = "heif")]
pub fn heic_to_jpeg(src: &Path, dest: &Path, quality: u8) -> anyhow::Result<()> {
    use libheif_rs::{ColorSpace, HeifContext, LibHeif, RgbChroma};

    let src_str = src
        .to_str()
        .with_context(|| format!("non-UTF-8 source path '{}'", src.display()))?;
    let lib_heif = LibHeif::new();
    let ctx = HeifContext::read_from_file(src_str)
        .with_context(|| format!("failed to open HEIF container '{}'", src.display()))?;
    let handle = ctx
        .primary_image_handle()
        .with_context(|| format!("no primary image in '{}'", src.display()))?;
    let decoded = lib_heif
        .decode(&handle, ColorSpace::Rgb(RgbChroma::Rgb), None)
        .with_context(|| format!("failed to decode '{}'", src.display()))?;
    let planes = decoded.planes();
    let plane = planes
        .interleaved
        .with_context(|| format!("no interleaved RGB plane in '{}'", src.display()))?;

    // The decoder may pad rows, so repack stride-aware.
    let row_bytes = plane.width as usize * 3;
    let mut rgb = Vec::with_capacity(row_bytes * plane.height as usize);
    for row in plane.data.chunks(plane.stride).take(plane.height as usize) {
        rgb.extend_from_slice(&row[..row_bytes]);
    }
    let img = RgbImage::from_raw(plane.width, plane.height, rgb)
        .with_context(|| format!("decoded plane size mismatch in '{}'", src.display()))?;

    write_jpeg(&img, dest, quality)?;

    if let Ok(meta) = std::fs::metadata(src) {
        let mtime = filetime::FileTime::from_last_modification_time(&meta);
        let _ = filetime::set_file_mtime(dest, mtime);
    }
    Ok(())
}

#[cfg(not(feature = "heif"))]
pub fn heic_to_jpeg(src: &Path, _dest: &Path, _quality: u8) -> anyhow::Result<()> {
    anyhow::bail!(
        "HEIF support not compiled in, cannot convert '{}'",
        src.display()
    )
}

/// Writes `img` to `dest` as a JPEG at the given quality. If encoding
/// fails after the file was created, the partial output is removed so
/// the name is not left occupied for later conflict resolution.
pub(crate) fn write_jpeg(img: &RgbImage, dest: &Path, quality: u8) -> anyhow::Result<()> {
    let out = File::create(dest)
        .with_context(|| format!("failed to create '{}'", dest.display()))?;
    let mut writer = BufWriter::new(out);
    let result = (|| -> anyhow::Result<()> {
        let encoder = JpegEncoder::new_with_quality(&mut writer, quality);
        img.write_with_encoder(encoder)?;
        writer.flush()?;
        Ok(())
    })();
    if let Err(err) = result {
        drop(writer);
        let _ = std::fs::remove_file(dest);
        return Err(err.context(format!("failed to encode JPEG '{}'", dest.display())));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_invalid_heic_fails_without_touching_source() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("not_really.heic");
        fs::write(&src, b"this is not a heif container").unwrap();
        let dest = dir.path().join("out.jpg");

        assert!(heic_to_jpeg(&src, &dest, JPEG_QUALITY).is_err());
        assert!(src.exists());
        assert!(!dest.exists());
    }

    #[test]
    fn test_write_jpeg_output_is_decodable() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("out.jpg");
        let img = RgbImage::from_pixel(8, 8, image::Rgb([120, 40, 200]));

        write_jpeg(&img, &dest, JPEG_QUALITY).unwrap();

        let back = image::open(&dest).unwrap();
        assert_eq!(back.width(), 8);
        assert_eq!(back.height(), 8);
    }

    #[test]
    fn test_partial_output_removed_on_encode_failure() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("too_wide.jpg");
        // JPEG cannot represent dimensions beyond u16::MAX, so the
        // encoder rejects this after the output file already exists.
        let img = RgbImage::from_raw(70_000, 1, vec![0u8; 70_000 * 3]).unwrap();

        assert!(write_jpeg(&img, &dest, JPEG_QUALITY).is_err());
        assert!(!dest.exists());
    }
}
