// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use masc_core::clock::FakeClock;
use std::sync::Arc;
use std::time::Duration;

fn backend() -> (tempfile::TempDir, FileBackend<FakeClock>) {
    let dir = tempfile::tempdir().unwrap();
    let clock = FakeClock::new();
    let backend = FileBackend::with_clock(dir.path().join(".masc"), false, clock).unwrap();
    (dir, backend)
}

#[test]
fn get_put_delete_roundtrip() {
    let (_dir, b) = backend();
    assert_eq!(b.get("tasks/task-1").unwrap(), None);

    b.put("tasks/task-1", b"{\"x\":1}").unwrap();
    assert_eq!(b.get("tasks/task-1").unwrap().as_deref(), Some(&b"{\"x\":1}"[..]));

    assert!(b.delete("tasks/task-1").unwrap());
    assert!(!b.delete("tasks/task-1").unwrap());
    assert_eq!(b.get("tasks/task-1").unwrap(), None);
}

#[test]
fn put_replaces_atomically() {
    let (_dir, b) = backend();
    b.put("state", b"one").unwrap();
    b.put("state", b"two").unwrap();
    assert_eq!(b.get("state").unwrap().as_deref(), Some(&b"two"[..]));
    // No stray temp files remain
    let names: Vec<_> = std::fs::read_dir(b.root())
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|n| n.contains("tmp"))
        .collect();
    assert!(names.is_empty(), "leftover temps: {names:?}");
}

#[test]
fn list_returns_sorted_keys_in_namespace() {
    let (_dir, b) = backend();
    b.put("tasks/task-2", b"b").unwrap();
    b.put("tasks/task-1", b"a").unwrap();
    b.put("agents/a1", b"c").unwrap();

    let keys = b.list("tasks/").unwrap();
    assert_eq!(keys, vec!["tasks/task-1", "tasks/task-2"]);

    assert!(b.list("votes/").unwrap().is_empty());
}

#[test]
fn list_filters_by_stem_prefix() {
    let (_dir, b) = backend();
    b.put("messages/00000000000000000001", b"a").unwrap();
    b.put("messages/00000000000000000002", b"b").unwrap();
    let keys = b.list("messages/00000000000000000002").unwrap();
    assert_eq!(keys, vec!["messages/00000000000000000002"]);
}

#[test]
fn atomic_inc_counts_from_zero() {
    let (_dir, b) = backend();
    assert_eq!(b.atomic_inc("room.message_seq", 1).unwrap(), 1);
    assert_eq!(b.atomic_inc("room.message_seq", 1).unwrap(), 2);
    assert_eq!(b.atomic_inc("room.message_seq", 5).unwrap(), 7);
    assert_eq!(b.atomic_inc("other", 1).unwrap(), 1);
}

#[test]
fn atomic_inc_is_linearizable_across_threads() {
    let dir = tempfile::tempdir().unwrap();
    let b = Arc::new(FileBackend::open(dir.path().join(".masc"), false).unwrap());

    let mut handles = Vec::new();
    for _ in 0..8 {
        let b = Arc::clone(&b);
        handles.push(std::thread::spawn(move || {
            for _ in 0..25 {
                b.atomic_inc("seq", 1).unwrap();
            }
        }));
    }
    for h in handles {
        h.join().unwrap();
    }
    assert_eq!(b.atomic_inc("seq", 0).unwrap(), 200);
}

#[test]
fn lock_excludes_other_owners_until_ttl() {
    let dir = tempfile::tempdir().unwrap();
    let clock = FakeClock::new();
    let b = FileBackend::with_clock(dir.path().join(".masc"), false, clock.clone()).unwrap();

    assert!(b.acquire_lock("locks/src%2Flib.rs", 30, "a1").unwrap());
    assert!(!b.acquire_lock("locks/src%2Flib.rs", 30, "a2").unwrap());
    // Re-acquire by the holder refreshes
    assert!(b.acquire_lock("locks/src%2Flib.rs", 30, "a1").unwrap());

    clock.advance(Duration::from_secs(31));
    assert!(b.acquire_lock("locks/src%2Flib.rs", 30, "a2").unwrap());
}

#[test]
fn release_requires_matching_owner() {
    let (_dir, b) = backend();
    assert!(b.acquire_lock("locks/f", 30, "a1").unwrap());
    assert!(!b.release_lock("locks/f", "a2").unwrap());
    assert!(b.release_lock("locks/f", "a1").unwrap());
    assert!(!b.release_lock("locks/f", "a1").unwrap());
    // Free again
    assert!(b.acquire_lock("locks/f", 30, "a2").unwrap());
}

#[test]
fn lock_records_are_visible_through_get_and_list() {
    let (_dir, b) = backend();
    b.acquire_lock("locks/f", 30, "a1").unwrap();
    let bytes = b.get("locks/f").unwrap().unwrap();
    let record: LockRecord = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(record.owner, "a1");
    assert_eq!(b.list("locks/").unwrap(), vec!["locks/f"]);
}

#[test]
fn invalid_keys_are_rejected() {
    let (_dir, b) = backend();
    assert!(b.put("../escape", b"x").is_err());
    assert!(b.get("tasks/../state").is_err());
    assert!(b.list("..").is_err());
}

#[test]
fn corrupt_counter_is_reported() {
    let (_dir, b) = backend();
    b.atomic_inc("seq", 1).unwrap();
    std::fs::write(b.root().join("counters").join("seq"), "garbage").unwrap();
    assert!(matches!(
        b.atomic_inc("seq", 1),
        Err(StorageError::CorruptCounter { .. })
    ));
}
