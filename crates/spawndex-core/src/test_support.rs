//! Fixture helpers shared by the unit tests

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Write a zip archive named `name` into `dir` holding `files` as
/// (path, contents) pairs.
pub fn write_archive(dir: &Path, name: &str, files: &[(&str, &str)]) -> PathBuf {
    write_archive_with(dir, name, files, CompressionMethod::Deflated)
}

/// Like [`write_archive`], but entry data is stored uncompressed so tests
/// can find and patch it in the raw bytes.
pub fn write_stored_archive(dir: &Path, name: &str, files: &[(&str, &str)]) -> PathBuf {
    write_archive_with(dir, name, files, CompressionMethod::Stored)
}

fn write_archive_with(dir: &Path, name: &str, files: &[(&str, &str)], method: CompressionMethod) -> PathBuf {
    let path = dir.join(name);
    let mut writer = ZipWriter::new(File::create(&path).unwrap());
    for (entry, body) in files {
        let options = SimpleFileOptions::default().compression_method(method);
        writer.start_file(*entry, options).unwrap();
        writer.write_all(body.as_bytes()).unwrap();
    }
    writer.finish().unwrap();
    path
}

/// Overwrite the first occurrence of `needle` in the file with `replacement`
/// (same length).
pub fn patch_bytes(path: &Path, needle: &[u8], replacement: &[u8]) {
    assert_eq!(needle.len(), replacement.len());
    let mut bytes = fs::read(path).unwrap();
    let at = bytes
        .windows(needle.len())
        .position(|w| w == needle)
        .unwrap();
    bytes[at..at + needle.len()].copy_from_slice(replacement);
    fs::write(path, bytes).unwrap();
}

/// Rewrite the uncompressed size recorded in the central directory for
/// `entry`, leaving the data itself untouched.
pub fn patch_central_size(path: &Path, entry: &str, size: u32) {
    const CENTRAL_HEADER: [u8; 4] = [0x50, 0x4b, 0x01, 0x02];
    let mut bytes = fs::read(path).unwrap();
    let mut at = 0;
    loop {
        at += bytes[at..]
            .windows(4)
            .position(|w| w == CENTRAL_HEADER)
            .unwrap();
        let name_len = u16::from_le_bytes([bytes[at + 28], bytes[at + 29]]) as usize;
        if &bytes[at + 46..at + 46 + name_len] == entry.as_bytes() {
            bytes[at + 24..at + 28].copy_from_slice(&size.to_le_bytes());
            break;
        }
        at += 4;
    }
    fs::write(path, bytes).unwrap();
}
