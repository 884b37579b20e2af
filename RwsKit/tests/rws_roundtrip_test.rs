//! Unpack and repack of whole containers

mod common;

use std::fs;
use std::path::{Path, PathBuf};

use common::{ContainerFixture, LayerFixture, payload};
use pretty_assertions::assert_eq;
use rwskit::prelude::*;
use tempfile::tempdir;

fn two_segment_container() -> ContainerFixture {
    let mut fixture = ContainerFixture::new("Banquet", 16, 64)
        .layer(LayerFixture::dsp())
        .layer(LayerFixture::pcm())
        .segment(vec![payload(1, 100), payload(2, 37)])
        .segment(vec![payload(3, 64), payload(4, 5)]);
    fixture.prefix = vec![0xAB; 12];
    fixture.tail = b"trailing bytes".to_vec();
    fixture.header_tail = vec![0x77; 8];
    fixture.padding_fill = 0xCD;
    fixture
}

fn write_container(dir: &Path, fixture: &ContainerFixture) -> PathBuf {
    let path = dir.join(format!("{}.rws", fixture.name));
    fs::write(&path, fixture.build()).unwrap();
    path
}

/// Unpack, check every block artifact, repack and compare with the original
fn assert_full_roundtrip(fixture: &ContainerFixture) {
    let temp = tempdir().unwrap();
    let original = write_container(temp.path(), fixture);
    let unpacked = temp.path().join("unpacked");
    let rebuilt = temp.path().join("rebuilt.rws");
    let config = LayoutConfig::new(fixture.layer_alignment, fixture.segment_alignment);

    let result = RwsOperations::unpack(&original, &unpacked, &config).unwrap();
    assert!(result.warnings.is_empty(), "{:?}", result.warnings);
    assert_eq!(
        result.artifact_count,
        fixture.segments.len() * fixture.layers.len()
    );
    for s in 0..fixture.segments.len() {
        for l in 0..fixture.layers.len() {
            let artifact = unpacked.join(format!("{}_s{s:03}_l{l:02}.raw", fixture.name));
            assert_eq!(fs::read(artifact).unwrap(), fixture.block(s, l), "segment {s} layer {l}");
        }
    }

    let manifest = Manifest::load(&unpacked).unwrap();
    let usable: Vec<u32> = fixture
        .segments
        .iter()
        .flatten()
        .map(|p| p.len() as u32)
        .collect();
    assert_eq!(manifest.container.usable_sizes, usable);

    RwsOperations::repack(&unpacked, &rebuilt).unwrap();
    assert_eq!(fs::read(&rebuilt).unwrap(), fs::read(&original).unwrap());
}

#[test]
fn test_roundtrip_is_byte_identical() {
    assert_full_roundtrip(&two_segment_container());
}

#[test]
fn test_two_segments_sharing_one_layer() {
    let fixture = ContainerFixture::new("Overture", 16, 32)
        .layer(LayerFixture::pcm())
        .segment(vec![payload(5, 70)])
        .segment(vec![payload(6, 40)]);
    assert_full_roundtrip(&fixture);
}

#[test]
fn test_two_segments_sharing_two_layers() {
    let mut fixture = ContainerFixture::new("Finale", 16, 16)
        .layer(LayerFixture::pcm())
        .layer(LayerFixture::dsp())
        .segment(vec![payload(7, 20), payload(8, 30)])
        .segment(vec![payload(9, 32), payload(10, 12)]);
    fixture.padding_fill = 0x99;
    assert_full_roundtrip(&fixture);
}

#[test]
fn test_three_segments_sharing_one_layer() {
    let mut fixture = ContainerFixture::new("Loop", 4, 2048)
        .layer(LayerFixture::dsp())
        .segment(vec![payload(11, 9)])
        .segment(vec![payload(12, 3)])
        .segment(vec![payload(13, 0)]);
    fixture.prefix = vec![0x01; 5];
    fixture.padding_fill = 0x42;
    assert_full_roundtrip(&fixture);
}

#[test]
fn test_artifacts_hold_exact_blocks() {
    let temp = tempdir().unwrap();
    let fixture = two_segment_container();
    let original = write_container(temp.path(), &fixture);
    let unpacked = temp.path().join("unpacked");

    let result = RwsOperations::unpack(&original, &unpacked, &LayoutConfig::new(16, 64)).unwrap();
    assert_eq!(result.bytes_extracted, 2 * (100 + 37) + 12 + 14);

    // Blocks shorter than the shared block size carry the bytes that follow them
    let short = fs::read(unpacked.join("Banquet_s001_l00.raw")).unwrap();
    assert_eq!(short.len(), 100);
    assert_eq!(&short[..64], payload(3, 64).as_slice());
    assert!(short[64..].iter().all(|&b| b == 0xCD));

    assert_eq!(fs::read(unpacked.join("Banquet_prefix.raw")).unwrap(), fixture.prefix);
    assert_eq!(fs::read(unpacked.join("Banquet_tail.raw")).unwrap(), fixture.tail);

    let manifest = Manifest::load(&unpacked).unwrap();
    assert_eq!(manifest.source_file, "Banquet.rws");
    assert_eq!(manifest.layout, LayoutConfig::new(16, 64));
    assert_eq!(manifest.container.name, "Banquet");
    assert_eq!(manifest.container.usable_sizes, vec![100, 37, 64, 5]);
    assert_eq!(manifest.segments[1].name, "seg1");
    assert_eq!(manifest.layers.len(), 2);
    assert!(manifest.layers[0].dsp.is_some());
    assert!(manifest.layers[1].dsp.is_none());
    assert_eq!(manifest.artifacts.len(), 4);
    assert_eq!(
        manifest.artifacts["Banquet_s000_l01.raw"].padding,
        Some(vec![0xCD; 11])
    );
    assert_eq!(manifest.segments[0].padding, Some(vec![0xCD; 32]));
}

#[test]
fn test_roundtrip_with_zero_padding_and_no_prefix() {
    let temp = tempdir().unwrap();
    let fixture = ContainerFixture::new("Plain", 32, 32)
        .layer(LayerFixture::pcm())
        .segment(vec![payload(9, 33)]);
    let original = write_container(temp.path(), &fixture);
    let unpacked = temp.path().join("plain");
    let rebuilt = temp.path().join("plain.rws");

    RwsOperations::unpack(&original, &unpacked, &LayoutConfig::new(32, 32)).unwrap();
    let manifest = Manifest::load(&unpacked).unwrap();
    assert_eq!(manifest.prefix, None);
    assert_eq!(manifest.tail, None);
    assert_eq!(manifest.artifacts["Plain_s000_l00.raw"].padding, None);

    RwsOperations::repack(&unpacked, &rebuilt).unwrap();
    assert_eq!(fs::read(&rebuilt).unwrap(), fs::read(&original).unwrap());
}

#[test]
fn test_repack_is_idempotent() {
    let temp = tempdir().unwrap();
    let original = write_container(temp.path(), &two_segment_container());
    let config = LayoutConfig::new(16, 64);

    let first_dir = temp.path().join("first");
    let first = temp.path().join("first.rws");
    RwsOperations::unpack(&original, &first_dir, &config).unwrap();
    RwsOperations::repack(&first_dir, &first).unwrap();

    let second_dir = temp.path().join("second");
    let second = temp.path().join("second.rws");
    RwsOperations::unpack(&first, &second_dir, &config).unwrap();
    RwsOperations::repack(&second_dir, &second).unwrap();

    assert_eq!(fs::read(&second).unwrap(), fs::read(&first).unwrap());
}

#[test]
fn test_resized_block_grows_the_layer_in_every_segment() {
    let temp = tempdir().unwrap();
    let fixture = two_segment_container();
    let original = write_container(temp.path(), &fixture);
    let unpacked = temp.path().join("unpacked");
    let rebuilt = temp.path().join("resized.rws");
    let config = LayoutConfig::new(16, 64);

    RwsOperations::unpack(&original, &unpacked, &config).unwrap();
    let edited = payload(0x40, 300);
    fs::write(unpacked.join("Banquet_s000_l00.raw"), &edited).unwrap();

    let mut options = RepackOptions::default();
    options.resize.insert("Banquet_s000_l00.raw".to_string());
    let result = RwsOperations::repack_with_options(&unpacked, &rebuilt, &options).unwrap();
    assert_eq!(result.resized, vec!["Banquet_s000_l00.raw".to_string()]);

    let check_dir = temp.path().join("check");
    let check = RwsOperations::unpack(&rebuilt, &check_dir, &config).unwrap();
    assert!(check.warnings.is_empty(), "{:?}", check.warnings);

    assert_eq!(fs::read(check_dir.join("Banquet_s000_l00.raw")).unwrap(), edited);
    let mut grown = fixture.block(1, 0);
    grown.resize(300, 0);
    assert_eq!(fs::read(check_dir.join("Banquet_s001_l00.raw")).unwrap(), grown);
    assert_eq!(
        fs::read(check_dir.join("Banquet_s000_l01.raw")).unwrap(),
        fixture.block(0, 1)
    );
    assert_eq!(
        fs::read(check_dir.join("Banquet_s001_l01.raw")).unwrap(),
        fixture.block(1, 1)
    );

    let info = RwsOperations::inspect(&rebuilt, &config).unwrap();
    let first = &info.segments[0];
    assert_eq!(first.layers[0].block_size, 300);
    assert_eq!(first.layers[0].block_size_pad, 304);
    assert_eq!(first.layers[0].usable_size, 300);
    assert_eq!(first.layers[1].layer_start, 304);
    assert_eq!(first.layers_size, 384);
    assert_eq!(info.segments[1].data_offset, 384);
    assert_eq!(info.segments[1].layers[0].block_size, 300);
    assert_eq!(info.segments[1].layers[0].usable_size, 64);

    // The grown layer and every segment lose their recorded padding
    let manifest = Manifest::load(&check_dir).unwrap();
    assert_eq!(manifest.artifacts["Banquet_s000_l00.raw"].padding, None);
    assert_eq!(manifest.artifacts["Banquet_s001_l00.raw"].padding, None);
    assert_eq!(
        manifest.artifacts["Banquet_s001_l01.raw"].padding,
        Some(vec![0xCD; 11])
    );
    assert_eq!(manifest.segments[0].padding, None);
}

#[test]
fn test_shrunk_block_keeps_the_shared_block_size() {
    let temp = tempdir().unwrap();
    let fixture = two_segment_container();
    let original = write_container(temp.path(), &fixture);
    let unpacked = temp.path().join("unpacked");
    let rebuilt = temp.path().join("shrunk.rws");
    let config = LayoutConfig::new(16, 64);

    RwsOperations::unpack(&original, &unpacked, &config).unwrap();
    let edited = payload(0x70, 10);
    fs::write(unpacked.join("Banquet_s000_l00.raw"), &edited).unwrap();

    let options = RepackOptions {
        resize_all: true,
        ..RepackOptions::default()
    };
    RwsOperations::repack_with_options(&unpacked, &rebuilt, &options).unwrap();

    // Only the usable size and the block contents differ from the original
    let info = RwsOperations::inspect(&rebuilt, &config).unwrap();
    assert_eq!(info.segments[0].layers[0].block_size, 100);
    assert_eq!(info.segments[0].layers[0].usable_size, 10);
    assert_eq!(
        fs::metadata(&rebuilt).unwrap().len(),
        fs::metadata(&original).unwrap().len()
    );

    let check_dir = temp.path().join("check");
    RwsOperations::unpack(&rebuilt, &check_dir, &config).unwrap();
    let mut block = edited.clone();
    block.resize(100, 0);
    assert_eq!(fs::read(check_dir.join("Banquet_s000_l00.raw")).unwrap(), block);
    let manifest = Manifest::load(&check_dir).unwrap();
    assert_eq!(
        manifest.artifacts["Banquet_s000_l00.raw"].padding,
        Some(vec![0xCD; 12])
    );
    assert_eq!(manifest.segments[0].padding, Some(vec![0xCD; 32]));
}

#[test]
fn test_repack_with_different_alignment() {
    let temp = tempdir().unwrap();
    let fixture = two_segment_container();
    let original = write_container(temp.path(), &fixture);
    let unpacked = temp.path().join("unpacked");
    let rebuilt = temp.path().join("aligned.rws");

    RwsOperations::unpack(&original, &unpacked, &LayoutConfig::new(16, 64)).unwrap();
    let options = RepackOptions {
        layout: Some(LayoutConfig::new(2048, 2048)),
        ..RepackOptions::default()
    };
    let result = RwsOperations::repack_with_options(&unpacked, &rebuilt, &options).unwrap();
    assert_eq!(result.layout, LayoutConfig::new(2048, 2048));

    let info = RwsOperations::inspect(&rebuilt, &LayoutConfig::new(2048, 2048)).unwrap();
    assert!(info.warnings.is_empty(), "{:?}", info.warnings);
    assert_eq!(info.segments[1].data_offset, 4096);
    assert_eq!(info.block_layers_size, 2 * 2048);

    let check_dir = temp.path().join("check");
    RwsOperations::unpack(&rebuilt, &check_dir, &LayoutConfig::new(2048, 2048)).unwrap();
    assert_eq!(
        fs::read(check_dir.join("Banquet_s001_l01.raw")).unwrap(),
        fixture.block(1, 1)
    );
}

#[test]
fn test_inspect_reports_codecs_and_dsp() {
    let temp = tempdir().unwrap();
    let original = write_container(temp.path(), &two_segment_container());

    let info = RwsOperations::inspect(&original, &LayoutConfig::new(16, 64)).unwrap();
    assert_eq!(info.name, "Banquet");
    assert_eq!(info.total_segments, 2);
    assert_eq!(info.total_layers, 2);
    assert_eq!(info.data_offset, 12);
    assert!(info.warnings.is_empty());

    for segment in &info.segments {
        let dsp = &segment.layers[0];
        assert!(dsp.has_dsp);
        assert_eq!(dsp.codec, CodecKind::DspAdpcm.to_string());
        assert_eq!(dsp.sample_rate, 22050);

        let pcm = &segment.layers[1];
        assert!(!pcm.has_dsp);
        assert_eq!(pcm.codec, CodecKind::Pcm.to_string());
        assert_eq!(pcm.channels, 1);
    }

    // Estimates follow each segment's usable size
    assert_eq!(info.segments[0].layers[0].estimated_samples, 12 * 14);
    assert_eq!(info.segments[0].layers[1].estimated_samples, 18);
    assert_eq!(info.segments[1].layers[1].estimated_samples, 2);
}

#[test]
fn test_corrupted_layer_start_is_reported_not_fatal() {
    let temp = tempdir().unwrap();
    let fixture = two_segment_container();
    let mut bytes = fixture.build();
    let field = fixture.layer_info_offset(1) + 0x24;
    bytes[field..field + 4].copy_from_slice(&64u32.to_le_bytes());
    let path = temp.path().join("Banquet.rws");
    fs::write(&path, &bytes).unwrap();

    let unpacked = temp.path().join("unpacked");
    let result = RwsOperations::unpack(&path, &unpacked, &LayoutConfig::new(16, 64)).unwrap();
    assert_eq!(result.warnings.len(), 1);
    let warning = &result.warnings[0];
    assert_eq!((warning.segment, warning.layer), (None, Some(1)));
    assert_eq!((warning.stored, warning.computed), (64, 112));

    // Extraction follows the stored offset in every segment
    for s in 0..2 {
        let artifact = fs::read(unpacked.join(format!("Banquet_s{s:03}_l01.raw"))).unwrap();
        assert_eq!(artifact.len(), 37);
        assert_ne!(artifact, fixture.block(s, 1));
    }
}

#[test]
fn test_batch_unpack_mirrors_directories() {
    let temp = tempdir().unwrap();
    let source = temp.path().join("game");
    fs::create_dir_all(source.join("music")).unwrap();
    fs::write(source.join("music/Banquet.rws"), two_segment_container().build()).unwrap();
    fs::write(source.join("Broken.RWS"), b"not a container").unwrap();
    fs::write(source.join("readme.txt"), b"ignored").unwrap();

    let files = find_rws_files(&source);
    assert_eq!(files.len(), 2);

    let dest = temp.path().join("out");
    let result = batch_unpack(&files, &source, &dest, &LayoutConfig::new(16, 64), |_| {});
    assert_eq!(result.success_count, 1);
    assert_eq!(result.fail_count, 1);
    assert!(dest.join("music/Banquet/manifest.json").is_file());
    assert!(!dest.join("Broken/manifest.json").exists());
}
