//! Copyright © 2025-2026 Wenze Wei. All Rights Reserved.
//!
//! This file is part of Qi.
//! The Qi project belongs to the Dunimd Team.

use std::io::{Cursor, Write};

use qix::block::QiArchiveKind;
use qix::errors::QiError;
use qix::stages::archive::{open_archive, pick_member};
use qix::stages::QiBytes;
use zip::write::FileOptions;

fn zip_bytes(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    writer.add_directory("data/", FileOptions::default()).unwrap();
    for (name, content) in entries {
        writer.start_file(*name, FileOptions::default()).unwrap();
        writer.write_all(content.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

#[test]
fn test_zip_members_are_listed_without_directories() {
    let bytes = QiBytes::new(
        "trees.zip",
        zip_bytes(&[("data/trees.csv", "id;height\n"), ("readme.txt", "hi")]),
    );
    let archive = open_archive("Unzip", QiArchiveKind::Zip, bytes).unwrap();

    assert_eq!(archive.names().collect::<Vec<_>>(), vec!["data/trees.csv", "readme.txt"]);
    assert_eq!(archive.get("readme.txt").unwrap().data, b"hi");
}

#[test]
fn test_file_picker_ignores_leading_slash() {
    let bytes = QiBytes::new("trees.zip", zip_bytes(&[("data/trees.csv", "id;height\n")]));
    let archive = open_archive("Unzip", QiArchiveKind::Zip, bytes).unwrap();

    let member = pick_member("Pick", archive.clone(), "/data/trees.csv").unwrap();
    assert_eq!(member.name, "trees.csv");
    assert_eq!(member.data, b"id;height\n");

    let err = pick_member("Pick", archive, "data/bushes.csv").unwrap_err();
    assert_eq!(
        err,
        QiError::MemberNotFound {
            block: "Pick".into(),
            path: "data/bushes.csv".into()
        }
    );
}

#[cfg(feature = "compression")]
#[test]
fn test_gzip_stream_becomes_single_member() {
    use flate2::write::GzEncoder;
    use flate2::Compression;

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(b"a,b\n1,2\n").unwrap();
    let bytes = QiBytes::new("numbers.csv.gz", encoder.finish().unwrap());

    let archive = open_archive("Gunzip", QiArchiveKind::Gzip, bytes).unwrap();
    assert_eq!(archive.len(), 1);
    let member = pick_member("Pick", archive, "numbers.csv").unwrap();
    assert_eq!(member.data, b"a,b\n1,2\n");
}

#[cfg(feature = "compression")]
#[test]
fn test_zstd_stream_becomes_single_member() {
    let compressed = zstd::stream::encode_all(&b"x;y\n"[..], 0).unwrap();
    let archive = open_archive("Unzstd", QiArchiveKind::Zstd, QiBytes::new("pairs.zst", compressed)).unwrap();
    assert_eq!(archive.names().collect::<Vec<_>>(), vec!["pairs"]);
}

#[cfg(feature = "compression")]
#[test]
fn test_declared_kind_must_match_bytes() {
    let zip = QiBytes::new("trees.zip", zip_bytes(&[("a.csv", "1")]));
    let err = open_archive("Gunzip", QiArchiveKind::Gzip, zip).unwrap_err();
    assert!(matches!(err, QiError::ArchiveFormat { block, .. } if block == "Gunzip"));
}

#[test]
fn test_zip_with_inflated_declared_size_is_read_by_content() {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let stored = FileOptions::default().compression_method(zip::CompressionMethod::Stored);
    writer.start_file("trees.csv", stored).unwrap();
    writer.write_all(b"id\nDE-1\n").unwrap();
    let mut bytes = writer.finish().unwrap().into_inner();

    // Uncompressed size in the central directory header: 4 GiB - 2.
    let header = bytes
        .windows(4)
        .position(|w| w == b"PK\x01\x02")
        .unwrap();
    bytes[header + 24..header + 28].copy_from_slice(&0xFFFF_FFFEu32.to_le_bytes());

    match open_archive("Unzip", QiArchiveKind::Zip, QiBytes::new("trees.zip", bytes)) {
        Ok(archive) => assert_eq!(archive.get("trees.csv").unwrap().data, b"id\nDE-1\n"),
        Err(err) => assert!(matches!(err, QiError::ArchiveFormat { block, .. } if block == "Unzip")),
    }
}
