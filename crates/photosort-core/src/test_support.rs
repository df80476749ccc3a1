//! Hand-rolled EXIF fixtures: minimal JPEGs whose APP1 segment carries
//! just enough little-endian TIFF structure for the metadata reader to
//! parse, so tests need no binary fixture files.

const TAG_DATETIME: u16 = 0x0132;
const TAG_DATETIME_ORIGINAL: u16 = 0x9003;
const TAG_EXIF_IFD_POINTER: u16 = 0x8769;
const TYPE_ASCII: u16 = 2;
const TYPE_LONG: u16 = 4;

/// JPEG with `DateTimeOriginal` in the Exif sub-IFD.
pub(crate) fn jpeg_with_datetime_original(ts: &str) -> Vec<u8> {
    // Header(8) + IFD0{1 entry: ExifIFD pointer}(2+12+4=18) puts the
    // sub-IFD at 26; sub-IFD{1 entry}(18) puts the string at 44.
    let mut tiff = tiff_header();
    push_ifd_start(&mut tiff, 1);
    push_entry_long(&mut tiff, TAG_EXIF_IFD_POINTER, 26);
    push_next_ifd(&mut tiff);

    push_ifd_start(&mut tiff, 1);
    push_entry_ascii(&mut tiff, TAG_DATETIME_ORIGINAL, ts, 44);
    push_next_ifd(&mut tiff);
    push_ascii_data(&mut tiff, ts);
    wrap_jpeg(&tiff)
}

/// JPEG with only the generic `DateTime` tag, directly in IFD0.
pub(crate) fn jpeg_with_datetime(ts: &str) -> Vec<u8> {
    // Header(8) + IFD0{1 entry}(18) puts the string at 26.
    let mut tiff = tiff_header();
    push_ifd_start(&mut tiff, 1);
    push_entry_ascii(&mut tiff, TAG_DATETIME, ts, 26);
    push_next_ifd(&mut tiff);
    push_ascii_data(&mut tiff, ts);
    wrap_jpeg(&tiff)
}

/// Structurally valid JPEG with no metadata segment at all.
pub(crate) fn jpeg_without_exif() -> Vec<u8> {
    vec![0xFF, 0xD8, 0xFF, 0xD9]
}

fn tiff_header() -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(b"II");
    out.extend_from_slice(&42u16.to_le_bytes());
    out.extend_from_slice(&8u32.to_le_bytes());
    out
}

fn push_ifd_start(out: &mut Vec<u8>, entries: u16) {
    out.extend_from_slice(&entries.to_le_bytes());
}

fn push_next_ifd(out: &mut Vec<u8>) {
    out.extend_from_slice(&0u32.to_le_bytes());
}

fn push_entry_long(out: &mut Vec<u8>, tag: u16, value: u32) {
    out.extend_from_slice(&tag.to_le_bytes());
    out.extend_from_slice(&TYPE_LONG.to_le_bytes());
    out.extend_from_slice(&1u32.to_le_bytes());
    out.extend_from_slice(&value.to_le_bytes());
}

fn push_entry_ascii(out: &mut Vec<u8>, tag: u16, value: &str, data_offset: u32) {
    // Counts include the trailing NUL; fixtures always use the offset
    // form, so keep values longer than 3 bytes.
    assert!(value.len() > 3, "fixture ASCII values must not fit inline");
    out.extend_from_slice(&tag.to_le_bytes());
    out.extend_from_slice(&TYPE_ASCII.to_le_bytes());
    out.extend_from_slice(&(value.len() as u32 + 1).to_le_bytes());
    out.extend_from_slice(&data_offset.to_le_bytes());
}

fn push_ascii_data(out: &mut Vec<u8>, value: &str) {
    out.extend_from_slice(value.as_bytes());
    out.push(0);
}

fn wrap_jpeg(tiff: &[u8]) -> Vec<u8> {
    let mut out = vec![0xFF, 0xD8, 0xFF, 0xE1];
    out.extend_from_slice(&((tiff.len() + 8) as u16).to_be_bytes());
    out.extend_from_slice(b"Exif\0\0");
    out.extend_from_slice(tiff);
    out.extend_from_slice(&[0xFF, 0xD9]);
    out
}
