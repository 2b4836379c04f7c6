mod support;

use support::setup_store;

use skillswap_core::{ActivityLog, today_key};
use skillswap_store::{ACTIVITY_LOG_KEY, ActivityLogStore, Kv, Signal, UpdateSignal};

#[test]
fn load_on_fresh_store_is_empty() {
    let test = setup_store();
    assert!(test.store.load().is_empty());
}

#[test]
fn course_completion_creates_today_entry() {
    let test = setup_store();
    let log = test
        .store
        .record_course_completion(1.5, 20)
        .expect("record completion");

    assert_eq!(log.entries.len(), 1);
    let entry = log.entry_for(&today_key()).expect("today entry");
    assert_eq!(entry.courses_completed, 1);
    assert!((entry.time_spent - 1.5).abs() < 1e-9);
    assert_eq!(entry.tokens_earned, 20);
    assert_eq!(entry.tokens_used, 0);
}

#[test]
fn same_day_recordings_accumulate_into_one_entry() {
    let test = setup_store();
    test.store
        .record_course_completion(1.0, 10)
        .expect("first completion");
    test.store
        .record_course_completion(0.5, 5)
        .expect("second completion");
    test.store.record_token_usage(3).expect("usage");
    test.store.record_token_earned(7).expect("earned");

    let log = test.store.load();
    assert_eq!(log.entries.len(), 1);
    let entry = log.entry_for(&today_key()).expect("today entry");
    assert_eq!(entry.courses_completed, 2);
    assert!((entry.time_spent - 1.5).abs() < 1e-9);
    assert_eq!(entry.tokens_earned, 22);
    assert_eq!(entry.tokens_used, 3);
}

#[test]
fn zero_delta_recordings_never_touch_the_log() {
    let test = setup_store();
    let log = test.store.record_token_usage(0).expect("zero usage");
    assert!(log.is_empty());
    let log = test.store.record_token_usage(-4).expect("negative usage");
    assert!(log.is_empty());
    let log = test.store.record_token_earned(0).expect("zero earned");
    assert!(log.is_empty());
    assert!(test.store.load().is_empty());
}

#[test]
fn log_survives_reopen() {
    let test = setup_store();
    test.store
        .record_course_completion(2.0, 15)
        .expect("record");
    drop(test.store);

    let reopened =
        ActivityLogStore::open(&test.path, UpdateSignal::new()).expect("reopen store");
    let log = reopened.load();
    let entry = log.entry_for(&today_key()).expect("today entry");
    assert_eq!(entry.courses_completed, 1);
    assert_eq!(entry.tokens_earned, 15);
}

#[test]
fn unparsable_blob_falls_back_to_empty_log() {
    let test = setup_store();
    test.store.record_token_earned(9).expect("seed");
    drop(test.store);

    let kv = Kv::open(&test.path).expect("open kv");
    kv.put(ACTIVITY_LOG_KEY, "{not json").expect("corrupt blob");
    drop(kv);

    let reopened =
        ActivityLogStore::open(&test.path, UpdateSignal::new()).expect("reopen store");
    assert!(reopened.load().is_empty());
}

#[test]
fn unknown_blob_version_falls_back_to_empty_log() {
    let test = setup_store();
    let kv = Kv::open(&test.path).expect("open kv");
    kv.put(ACTIVITY_LOG_KEY, r#"{"version":99,"entries":[]}"#)
        .expect("future blob");
    drop(kv);

    assert!(test.store.load().is_empty());
}

#[test]
fn save_broadcasts_activity_log_signal() {
    let test = setup_store();
    let mut rx = test.signal.subscribe();

    test.store
        .save(&ActivityLog::default())
        .expect("save empty log");

    assert_eq!(rx.try_recv().expect("signal"), Signal::ActivityLog);
}

#[test]
fn recordings_broadcast_once_per_save() {
    let test = setup_store();
    let mut rx = test.signal.subscribe();

    test.store.record_token_earned(5).expect("earned");
    test.store.record_token_usage(0).expect("zero usage");

    assert_eq!(rx.try_recv().expect("signal"), Signal::ActivityLog);
    assert!(rx.try_recv().is_err(), "zero-delta write must not signal");
}
