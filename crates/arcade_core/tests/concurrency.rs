//! Multi-session behavior against one shared store.

use arcade_core::{Config, Store};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Barrier;
use std::time::Duration;
use tempfile::tempdir;

#[test]
fn uncommitted_writes_are_invisible_to_other_threads() {
    let store = Store::open_in_memory().unwrap();
    let staged = Barrier::new(2);
    let checked = Barrier::new(2);

    std::thread::scope(|scope| {
        scope.spawn(|| {
            let mut writer = store.new_session();
            writer.begin();
            writer.set("secret", b"staged".to_vec()).unwrap();
            staged.wait();
            checked.wait();
            writer.commit().unwrap();
        });

        scope.spawn(|| {
            let reader = store.new_session();
            staged.wait();
            assert_eq!(reader.get("secret").unwrap(), None);
            checked.wait();
        });
    });

    assert_eq!(store.get("secret").unwrap(), Some(b"staged".to_vec()));
}

#[test]
fn outermost_commit_is_all_or_nothing() {
    const N: usize = 200;
    let dir = tempdir().unwrap();
    let store = Store::open(dir.path()).unwrap();
    let done = AtomicBool::new(false);

    std::thread::scope(|scope| {
        let observer = scope.spawn(|| {
            let mut seen = Vec::new();
            while !done.load(Ordering::SeqCst) {
                let visible = store
                    .dump()
                    .unwrap()
                    .iter()
                    .filter(|(key, _)| key.starts_with("bulk-"))
                    .count();
                seen.push(visible);
            }
            seen
        });

        let mut session = store.new_session();
        session.begin();
        for i in 0..N {
            session.set(format!("bulk-{i:03}"), i.to_le_bytes().to_vec()).unwrap();
        }
        std::thread::sleep(Duration::from_millis(5));
        session.commit().unwrap();
        std::thread::sleep(Duration::from_millis(5));
        done.store(true, Ordering::SeqCst);

        for count in observer.join().unwrap() {
            assert!(count == 0 || count == N, "observed partial commit: {count}");
        }
    });

    assert_eq!(store.len(), N);
}

#[test]
fn concurrent_autocommits_resolve_last_write_wins() {
    let store = Store::open_in_memory().unwrap();
    let start = Barrier::new(2);

    std::thread::scope(|scope| {
        for value in [b"left".to_vec(), b"right".to_vec()] {
            let store = &store;
            let start = &start;
            scope.spawn(move || {
                let mut session = store.new_session();
                start.wait();
                session.set("contested", value).unwrap();
            });
        }
    });

    // The record with the highest sequence is the write applied last.
    let log = store.read_commit_log().unwrap();
    let last = log.iter().max_by_key(|record| record.sequence).unwrap();
    assert_eq!(
        store.get("contested").unwrap().as_ref(),
        last.writes.get("contested")
    );
}

#[test]
fn many_writers_on_distinct_keys() {
    const THREADS: usize = 16;
    const WRITES: usize = 50;
    let dir = tempdir().unwrap();
    let store = Store::open_with_config(
        dir.path(),
        Config::default().busy_timeout(Duration::from_secs(10)),
    )
    .unwrap();

    std::thread::scope(|scope| {
        for t in 0..THREADS {
            let store = &store;
            scope.spawn(move || {
                let mut session = store.new_session().with_origin(format!("writer-{t}"));
                for i in 0..WRITES {
                    session
                        .set(format!("t{t:02}-k{i:02}"), format!("{t}:{i}").into_bytes())
                        .unwrap();
                }
            });
        }
    });

    assert_eq!(store.len(), THREADS * WRITES);
    assert_eq!(store.read_commit_log().unwrap().len(), THREADS * WRITES);
    assert_eq!(store.get("t07-k31").unwrap(), Some(b"7:31".to_vec()));
    assert!(store.pool().opened_count() <= THREADS as u64 + 1);
}

#[test]
fn transactions_on_overlapping_keys_serialize() {
    let store = Store::open_in_memory().unwrap();

    std::thread::scope(|scope| {
        for t in 0..4u8 {
            let store = &store;
            scope.spawn(move || {
                for _ in 0..25 {
                    let mut session = store.new_session();
                    session.begin();
                    session.set("a", vec![t]).unwrap();
                    session.set("b", vec![t]).unwrap();
                    session.commit().unwrap();
                }
            });
        }
    });

    // Each commit writes both keys in one frame, so they always agree.
    assert_eq!(store.get("a").unwrap(), store.get("b").unwrap());
    assert_eq!(store.stats().transactions_committed(), 100);
}
