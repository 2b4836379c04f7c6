#![allow(dead_code)]

use std::path::PathBuf;

use tempfile::TempDir;

use skillswap_store::{ActivityLogStore, UpdateSignal};

pub struct TestStore {
    pub _dir: TempDir,
    pub store: ActivityLogStore,
    pub signal: UpdateSignal,
    pub path: PathBuf,
}

pub fn setup_store() -> TestStore {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("test.sqlite");
    let signal = UpdateSignal::new();
    let store = ActivityLogStore::open(&path, signal.clone()).expect("open store");
    TestStore {
        _dir: dir,
        store,
        signal,
        path,
    }
}
