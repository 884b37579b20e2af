//! Stream bundle unpack and repack

mod common;

use std::fs;
use std::path::PathBuf;

use common::{SectionFixture, build_stream, payload};
use pretty_assertions::assert_eq;
use rwskit::prelude::*;
use tempfile::{TempDir, tempdir};

fn bundle() -> Vec<SectionFixture> {
    vec![
        SectionFixture::Raw {
            id: 0x80D,
            payload: payload(1, 40),
        },
        SectionFixture::Asset {
            name: "level01.txd".to_string(),
            kind: "rwID_TEXDICTIONARY".to_string(),
            file: payload(2, 300),
            rest: vec![1, 2, 3, 4, 5, 6],
            trailing: vec![0xEE; 7],
        },
        SectionFixture::Asset {
            name: "intro".to_string(),
            kind: "TEXT".to_string(),
            file: b"Once upon a time".to_vec(),
            rest: Vec::new(),
            trailing: Vec::new(),
        },
        SectionFixture::Raw {
            id: 0x2A,
            payload: Vec::new(),
        },
    ]
}

fn unpack_bundle() -> (TempDir, PathBuf, PathBuf) {
    let temp = tempdir().unwrap();
    let original = temp.path().join("level01.stream");
    fs::write(&original, build_stream(&bundle())).unwrap();
    let out = temp.path().join("level01");
    StreamOperations::unpack(&original, &out).unwrap();
    (temp, original, out)
}

#[test]
fn test_stream_roundtrip_is_byte_identical() {
    let (temp, original, out) = unpack_bundle();
    let rebuilt = temp.path().join("rebuilt.stream");

    let result = StreamOperations::repack(&out, &rebuilt).unwrap();
    assert_eq!(result.section_count, 4);
    assert_eq!(fs::read(&rebuilt).unwrap(), fs::read(&original).unwrap());
}

#[test]
fn test_stream_sections_named_by_index_and_kind() {
    let temp = tempdir().unwrap();
    let original = temp.path().join("level01.stream");
    fs::write(&original, build_stream(&bundle())).unwrap();
    let out = temp.path().join("level01");

    let result = StreamOperations::unpack(&original, &out).unwrap();
    assert_eq!(result.section_count, 4);
    assert_eq!(result.asset_count, 2);
    assert_eq!(result.bytes_extracted, 40 + 300 + 16);

    assert_eq!(fs::read(out.join("1_2061.UNK")).unwrap(), payload(1, 40));
    assert_eq!(fs::read(out.join("2_level01.txd")).unwrap(), payload(2, 300));
    assert_eq!(fs::read(out.join("3_intro.TEXT")).unwrap(), b"Once upon a time");
    assert!(out.join("4_42.UNK").is_file());

    let manifest = StreamManifest::load(&out).unwrap();
    let indices: Vec<usize> = manifest.sections.iter().map(|s| s.index).collect();
    assert_eq!(indices, vec![1, 2, 3, 4]);
    let asset = manifest.sections[1].asset.as_ref().unwrap();
    assert_eq!(asset.name, "level01.txd");
    assert_eq!(asset.kind, "rwID_TEXDICTIONARY");
    assert_eq!(asset.trailing, vec![0xEE; 7]);
    assert!(manifest.sections[0].asset.is_none());
}

#[test]
fn test_stream_edited_asset_changes_sizes() {
    let (temp, _, out) = unpack_bundle();
    let edited = payload(9, 1000);
    fs::write(out.join("2_level01.txd"), &edited).unwrap();

    let rebuilt = temp.path().join("edited.stream");
    StreamOperations::repack(&out, &rebuilt).unwrap();

    let mut expected = bundle();
    if let SectionFixture::Asset { file, .. } = &mut expected[1] {
        *file = edited.clone();
    }
    assert_eq!(fs::read(&rebuilt).unwrap(), build_stream(&expected));

    let check = temp.path().join("check");
    StreamOperations::unpack(&rebuilt, &check).unwrap();
    assert_eq!(fs::read(check.join("2_level01.txd")).unwrap(), edited);
}

#[test]
fn test_stream_missing_section_file() {
    let (temp, _, out) = unpack_bundle();
    fs::remove_file(out.join("3_intro.TEXT")).unwrap();

    let target = temp.path().join("out.stream");
    let err = StreamOperations::repack(&out, &target).unwrap_err();
    assert!(matches!(&err, Error::ArtifactMissing { path } if path.ends_with("3_intro.TEXT")));
    assert_eq!(err.kind(), "IOError");
    assert!(!target.exists());
}

#[test]
fn test_stream_asset_overrunning_section() {
    let temp = tempdir().unwrap();
    let mut bytes = build_stream(&bundle()[1..2]);
    // file_size follows the 4-byte header_size field and the header itself
    let header_size = u32::from_le_bytes(bytes[12..16].try_into().unwrap()) as usize;
    let file_size_at = 16 + header_size;
    bytes[file_size_at..file_size_at + 4].copy_from_slice(&5000u32.to_le_bytes());

    let original = temp.path().join("bad.stream");
    fs::write(&original, &bytes).unwrap();
    let out = temp.path().join("bad");
    let err = StreamOperations::unpack(&original, &out).unwrap_err();
    assert!(matches!(err, Error::TruncatedInput { .. }), "{err}");
    assert!(!out.join("manifest.json").exists());
}

#[test]
fn test_stream_truncated_section() {
    let temp = tempdir().unwrap();
    let bytes = build_stream(&bundle());
    let original = temp.path().join("short.stream");
    fs::write(&original, &bytes[..bytes.len() - 3]).unwrap();

    let err = StreamOperations::unpack(&original, &temp.path().join("short")).unwrap_err();
    assert!(matches!(err, Error::TruncatedInput { .. }), "{err}");
}
