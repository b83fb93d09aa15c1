//! On-disk stores across reopen.

use arcade_core::{CommitKind, Config, CoreError, Store};
use std::fs::OpenOptions;
use std::io::Write;
use tempfile::tempdir;

#[test]
fn committed_data_survives_reopen() {
    let dir = tempdir().unwrap();
    {
        let store = Store::open(dir.path()).unwrap();
        let mut session = store.new_session();
        session.set("a", b"1".to_vec()).unwrap();
        session.begin();
        session.set("b", b"2".to_vec()).unwrap();
        session.delete("a").unwrap();
        session.commit().unwrap();

        // never committed
        session.begin();
        session.set("c", b"3".to_vec()).unwrap();
    }

    let store = Store::open(dir.path()).unwrap();
    assert_eq!(store.get("a").unwrap(), None);
    assert_eq!(store.get("b").unwrap(), Some(b"2".to_vec()));
    assert_eq!(store.get("c").unwrap(), None);
    assert_eq!(store.last_sequence().as_u64(), 2);
}

#[test]
fn second_open_is_locked_out() {
    let dir = tempdir().unwrap();
    let _store = Store::open(dir.path()).unwrap();
    assert!(matches!(
        Store::open(dir.path()),
        Err(CoreError::StoreLocked)
    ));
}

#[test]
fn commit_log_is_json_lines_on_disk() {
    let dir = tempdir().unwrap();
    {
        let store = Store::open(dir.path()).unwrap();
        let mut session = store.new_session().with_origin("main");
        session.set("k", b"v".to_vec()).unwrap();
        session.begin();
        session.delete("k").unwrap();
        session.commit().unwrap();
    }

    let text = std::fs::read_to_string(dir.path().join("commits.log")).unwrap();
    let lines: Vec<serde_json::Value> = text
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["type"], "autocommit");
    assert_eq!(lines[0]["writes"]["k"], hex::encode(b"v"));
    assert_eq!(lines[1]["type"], "transaction");
    assert_eq!(lines[1]["deletes"], serde_json::json!(["k"]));

    let store = Store::open(dir.path()).unwrap();
    let records = store.read_commit_log().unwrap();
    assert_eq!(records[1].kind, CommitKind::Transaction);
    assert_eq!(records[1].origin, "main");
}

#[test]
fn torn_table_tail_is_recovered() {
    let dir = tempdir().unwrap();
    {
        let store = Store::open(dir.path()).unwrap();
        store.new_session().set("k", b"v".to_vec()).unwrap();
    }

    let table = dir.path().join("table.dat");
    let intact = std::fs::metadata(&table).unwrap().len();
    OpenOptions::new()
        .append(true)
        .open(&table)
        .unwrap()
        .write_all(&[0x40, 0, 0, 0, b'A', b'K'])
        .unwrap();

    let store = Store::open(dir.path()).unwrap();
    assert_eq!(std::fs::metadata(&table).unwrap().len(), intact);
    assert_eq!(store.get("k").unwrap(), Some(b"v".to_vec()));
    assert_eq!(store.verify().unwrap().torn_tail_bytes, 0);
}

#[test]
fn synced_commits_are_readable() {
    let dir = tempdir().unwrap();
    let store = Store::open_with_config(dir.path(), Config::default().sync_on_commit(true)).unwrap();
    let mut session = store.new_session();
    session.begin();
    session.set("k", b"v".to_vec()).unwrap();
    session.commit().unwrap();
    assert_eq!(store.get("k").unwrap(), Some(b"v".to_vec()));
}
