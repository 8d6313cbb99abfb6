mod common;

use common::*;
use reclaim::{
    CancelToken, EngineConfig, EngineError, Fidelity, Item, OutcomeStatus, RecoveryEngine,
    RecoveryMode,
};
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
    Item::new(handle(&path), name, None, data.len() as u64, None, false)
}

#[test]
fn test_check_all_attaches_damage_in_order() {
    let dir = tempdir().unwrap();
    let items = vec![
        item_at(dir.path(), "good.png", &png_bytes(4, 4)),
        item_at(dir.path(), "bad.jpg", b"garbage"),
        item_at(dir.path(), "fine.txt", b"text"),
    ];

    let batch = engine().check_all(&items, |_, _| {}, || false);
    assert!(!batch.cancelled);
    let flags: Vec<Option<bool>> = batch.outcomes.iter().map(|o| o.item.damaged()).collect();
    assert_eq!(flags, vec![Some(false), Some(true), Some(false)]);
    assert_eq!(batch.damaged().count(), 1);
    assert_eq!(batch.outcomes[1].item.name(), "bad.jpg");
}

#[test]
fn test_check_all_honours_cancellation() {
    let dir = tempdir().unwrap();
    let items = vec![item_at(dir.path(), "a.txt", b"a"), item_at(dir.path(), "b.txt", b"b")];
    let token = CancelToken::new();
    token.cancel();

    let batch = engine().check_all(&items, |_, _| {}, token.predicate());
    assert!(batch.cancelled);
    assert!(batch.outcomes.is_empty());
}

#[test]
fn test_recover_requires_directory() {
    let dir = tempdir().unwrap();
    let items = vec![item_at(dir.path(), "a.txt", b"a")];
    let missing = handle(&dir.path().join("not-here"));

    let result = engine().recover_all(&items, &missing, RecoveryMode::Copy, |_, _| {}, || false);
    assert!(matches!(result, Err(EngineError::DestinationUnavailable(_))));
}

#[test]
fn test_recover_copies_and_reports() {
    let src = tempdir().unwrap();
    let out = tempdir().unwrap();
    let items = vec![
        item_at(src.path(), "a.txt", b"alpha"),
        Item::new(handle(&src.path().join("ghost.txt")), "ghost.txt", None, 3, None, false),
    ];

    let report = engine()
        .recover_all(&items, &handle(out.path()), RecoveryMode::Copy, |_, _| {}, || false)
        .unwrap();

    assert_eq!((report.recovered(), report.failed(), report.skipped()), (1, 1, 0));
    match &report.outcomes[0].status {
        OutcomeStatus::Recovered {
            output_name,
            fidelity,
            sha256,
            ..
        } => {
            assert_eq!(output_name, "a.txt");
            assert_eq!(*fidelity, Fidelity::Exact);
            assert!(sha256.is_some());
        }
        other => panic!("unexpected status {other:?}"),
    }
    assert_eq!(file_names(out.path()), vec!["a.txt"]);
}

#[test]
fn test_recover_stops_between_items_when_cancelled() {
    let src = tempdir().unwrap();
    let out = tempdir().unwrap();
    let items = vec![
        item_at(src.path(), "a.txt", b"a"),
        item_at(src.path(), "b.txt", b"b"),
        item_at(src.path(), "c.txt", b"c"),
    ];
    let token = CancelToken::new();
    let canceller = token.clone();

    let report = engine()
        .recover_all(
            &items,
            &handle(out.path()),
            RecoveryMode::Repair,
            |_, _| canceller.cancel(),
            token.predicate(),
        )
        .unwrap();

    assert!(report.cancelled);
    assert_eq!((report.recovered(), report.skipped()), (1, 2));
    assert_eq!(file_names(out.path()), vec!["a.txt"]);
}

#[test]
fn test_repaired_suffix_is_configurable() {
    let src = tempdir().unwrap();
    let out = tempdir().unwrap();
    let engine = RecoveryEngine::with_config(
        Arc::new(LocalStorage::new()),
        EngineConfig::default().with_repaired_suffix("-rescued"),
    );
    let item = item_at(src.path(), "tone.wav", &wav_bytes(800));

    let repaired = engine.repair_best_effort(&item, &handle(out.path())).unwrap();
    assert_eq!(repaired.name, "tone-rescued.wav");
}

#[test]
fn test_classify_via_engine() {
    let engine = engine();
    assert_eq!(engine.classify("IMG_1.HEIC", None), reclaim::Kind::Image);
    assert_eq!(engine.classify("blob", Some("video/mp4")), reclaim::Kind::Video);
    assert_eq!(engine.classify("report.bin", Some("application/pdf")), reclaim::Kind::Other);
}

#[test]
fn test_same_named_items_keep_separate_outputs() {
    let src = tempdir().unwrap();
    let out = tempdir().unwrap();
    fs::create_dir_all(src.path().join("phone")).unwrap();
    fs::create_dir_all(src.path().join("card")).unwrap();
    let items = vec![
        item_at(&src.path().join("phone"), "note.txt", b"from the phone"),
        item_at(&src.path().join("card"), "note.txt", b"from the card"),
    ];

    let report = engine()
        .recover_all(&items, &handle(out.path()), RecoveryMode::Copy, |_, _| {}, || false)
        .unwrap();

    assert_eq!(report.recovered(), 2);
    assert_eq!(file_names(out.path()), vec!["note (2).txt", "note.txt"]);
    let outputs: Vec<&str> = report
        .outcomes
        .iter()
        .map(|o| match &o.status {
            OutcomeStatus::Recovered { output_name, .. } => output_name.as_str(),
            other => panic!("unexpected status {other:?}"),
        })
        .collect();
    assert_eq!(outputs, vec!["note.txt", "note (2).txt"]);
    assert_eq!(fs::read(out.path().join("note.txt")).unwrap(), b"from the phone");
    assert_eq!(fs::read(out.path().join("note (2).txt")).unwrap(), b"from the card");
}

#[test]
fn test_same_named_repairs_keep_separate_outputs() {
    let src = tempdir().unwrap();
    let out = tempdir().unwrap();
    fs::create_dir_all(src.path().join("a")).unwrap();
    fs::create_dir_all(src.path().join("b")).unwrap();
    let items = vec![
        item_at(&src.path().join("a"), "tone.wav", &wav_bytes(800)),
        item_at(&src.path().join("b"), "tone.wav", &wav_bytes(1600)),
    ];

    let report = engine()
        .recover_all(&items, &handle(out.path()), RecoveryMode::Repair, |_, _| {}, || false)
        .unwrap();

    assert_eq!(report.recovered(), 2);
    assert_eq!(file_names(out.path()), vec!["tone_fixed (2).wav", "tone_fixed.wav"]);
    assert_eq!(fs::read(out.path().join("tone_fixed (2).wav")).unwrap(), wav_bytes(1600));
}
