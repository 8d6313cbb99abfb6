mod common;

use common::*;
use reclaim::detect::CHECK_ERROR_PREFIX;
use reclaim::{Item, RecoveryEngine};
use reclaim_io::LocalStorage;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::tempdir;

fn engine() -> RecoveryEngine {
    RecoveryEngine::new(Arc::new(LocalStorage::new()))
}

fn item_at(dir: &Path, name: &str, data: &[u8]) -> Item {
    let path = dir.join(name);
    fs::write(&path, data).unwrap();
    Item::new(handle(&path), name, None, data.len() as u64, Some("test".into()), false)
}

#[test]
fn test_healthy_files_pass() {
    let dir = tempdir().unwrap();
    let engine = engine();
    let healthy = [
        item_at(dir.path(), "photo.jpg", &jpeg_bytes(32, 24)),
        item_at(dir.path(), "shot.png", &png_bytes(8, 8)),
        item_at(dir.path(), "clip.mp4", &mp4_bytes(4)),
        item_at(dir.path(), "tone.wav", &wav_bytes(8000)),
        item_at(dir.path(), "paper.pdf", &pdf_bytes(2)),
        item_at(dir.path(), "notes.txt", b"shopping list"),
        item_at(dir.path(), "bundle.zip", &stored_zip(&[("a.txt", b"alpha")])),
        item_at(dir.path(), "empty.zip", &stored_zip(&[])),
        item_at(dir.path(), "blob.bin", b"\x00\x01\x02"),
    ];
    for item in &healthy {
        assert_eq!(engine.detect_corruption(item), None, "{} should be healthy", item.name());
    }
}

#[test]
fn test_header_only_image_damage_passes_probe() {
    let dir = tempdir().unwrap();
    let item = item_at(dir.path(), "cut.jpg", &truncated_jpeg());
    assert_eq!(engine().detect_corruption(&item), None);
}

#[test]
fn test_damaged_media_is_fixable() {
    let dir = tempdir().unwrap();
    let engine = engine();
    let cases = [
        item_at(dir.path(), "photo.jpg", b"not really a jpeg"),
        item_at(dir.path(), "clip.mp4", &[0u8; 128]),
        item_at(dir.path(), "song.mp3", b"no frames here at all"),
    ];
    for item in &cases {
        let report = engine.detect_corruption(item).expect("damaged");
        assert!(report.fixable, "{} should be fixable", item.name());
        assert_eq!(report.item.handle(), item.handle());
        assert_eq!(report.source_id(), Some("test"));
    }
}

#[test]
fn test_document_damage_is_not_fixable() {
    let dir = tempdir().unwrap();
    let engine = engine();
    let cases = [
        item_at(dir.path(), "paper.pdf", b"%PDF-1.4\nbroken"),
        item_at(dir.path(), "empty.txt", b""),
        item_at(dir.path(), "letter.docx", b"PK but not really"),
    ];
    for item in &cases {
        let report = engine.detect_corruption(item).expect("damaged");
        assert!(!report.fixable, "{} should not be fixable", item.name());
    }
}

#[test]
fn test_truncated_archive_is_unhealthy() {
    let dir = tempdir().unwrap();
    let full = stored_zip(&[("a.txt", b"alpha-payload"), ("b.txt", b"bravo-payload")]);
    let second = full
        .windows(13)
        .position(|w| w == b"bravo-payload")
        .unwrap();
    let item = item_at(dir.path(), "bundle.zip", &full[..second + 4]);

    let report = engine().detect_corruption(&item).expect("damaged");
    assert!(report.fixable);
}

#[test]
fn test_checksum_failure_is_unhealthy() {
    let dir = tempdir().unwrap();
    let mut data = stored_zip(&[("a.txt", b"alpha-payload"), ("b.txt", b"bravo-payload")]);
    damage(&mut data, b"bravo-payload");
    let item = item_at(dir.path(), "bundle.zip", &data);
    assert!(engine().detect_corruption(&item).is_some());
}

#[test]
fn test_unreadable_item_reports_check_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("gone.png");
    let item = Item::new(handle(&path), "gone.png", None, 10, None, false);

    let report = engine().detect_corruption(&item).expect("report");
    assert!(report.reason.starts_with(CHECK_ERROR_PREFIX));
    assert!(!report.fixable);
}

#[test]
fn test_data_descriptor_archives_are_healthy() {
    let dir = tempdir().unwrap();
    let engine = engine();
    let data = descriptor_zip(&[("hello.txt", b"hello world"), ("word/document.xml", b"<w:document/>")]);
    for name in ["stream.zip", "report.docx"] {
        let item = item_at(dir.path(), name, &data);
        assert_eq!(engine.detect_corruption(&item), None, "{name} should be healthy");
    }
}

#[test]
fn test_tar_archives_are_walked() {
    let dir = tempdir().unwrap();
    let engine = engine();
    let tar = tar_bytes(&[("a.txt", b"alpha"), ("b.bin", &[9u8; 3000])]);

    let plain = item_at(dir.path(), "backup.tar", &tar);
    let packed = item_at(dir.path(), "backup.tar.gz", &gzipped(&tar));
    assert_eq!(engine.detect_corruption(&plain), None);
    assert_eq!(engine.detect_corruption(&packed), None);

    let cut = item_at(dir.path(), "cut.tar", &tar[..1024 + 512 + 100]);
    let report = engine.detect_corruption(&cut).expect("damaged");
    assert!(report.fixable);
}

#[test]
fn test_gzip_stream_is_checked_but_not_fixable() {
    let dir = tempdir().unwrap();
    let engine = engine();
    let healthy = item_at(dir.path(), "server.log.gz", &gzipped(b"line one\nline two\n"));
    assert_eq!(engine.detect_corruption(&healthy), None);

    let broken = item_at(dir.path(), "broken.log.gz", b"\x1f\x8b but nothing else");
    let report = engine.detect_corruption(&broken).expect("damaged");
    assert!(!report.fixable);
}

#[test]
fn test_audio_without_duration_is_damaged() {
    let dir = tempdir().unwrap();
    let item = item_at(dir.path(), "silence.wav", &wav_bytes(0));
    let report = engine().detect_corruption(&item).expect("damaged");
    assert!(report.fixable);
}

#[test]
fn test_unparsed_containers_are_not_fixable() {
    let dir = tempdir().unwrap();
    let engine = engine();
    for name in ["movie.mkv", "bundle.rar"] {
        let empty = item_at(dir.path(), name, b"");
        let report = engine.detect_corruption(&empty).expect("damaged");
        assert!(!report.fixable, "{name} should not be fixable");
    }
}
