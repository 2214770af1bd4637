//! Architectural Contract Test: Change Detection
//!
//! This test verifies that a run only touches the outside world when the
//! public IPv6 address actually changed.
//!
//! Constraints verified:
//! - An unchanged address causes no DNS call, no browser and no state write
//! - An empty or corrupted state slot counts as "changed"
//! - Resolver failures leave the stored address untouched
//! - The stored address survives a process restart
//!
//! If this test fails, runs are either doing redundant work or skipping
//! work they must do.

mod common;

use common::*;
use portsync_core::traits::StateStore;
use portsync_core::{Error, FailureKind, FileStateStore, IpVersion, MemoryStateStore, SyncOutcome};

#[tokio::test]
async fn unchanged_address_touches_nothing() {
    let store = FlakyStateStore::new(MemoryStateStore::with_address(addr("2001:db8::1")));
    let dns = RecordingDnsUpdater::new();
    let browser = ScriptedBrowser::with_rows(&["nas"]);
    let factory = ScriptedBrowserFactory::new(&browser);

    let (engine, events) = build_engine(
        ScriptedLookup::answering("2001:db8::1\n"),
        &dns,
        store.clone(),
        &factory,
        sync_config(&["rec-1"], &["nas"]),
    );

    let outcome = engine.run_once().await.unwrap();
    assert_eq!(
        outcome,
        SyncOutcome::Unchanged {
            address: addr("2001:db8::1")
        }
    );

    assert_eq!(dns.update_call_count(), 0, "no DNS update when unchanged");
    assert_eq!(factory.create_count(), 0, "no browser when unchanged");
    assert_eq!(store.commit_count(), 0);
    assert_eq!(store.invalidate_count(), 0);

    drop(engine);
    assert!(drain_events(events).await.is_empty());
}

#[tokio::test]
async fn equal_addresses_in_other_notation_are_unchanged() {
    let store = MemoryStateStore::with_address(addr("2001:0db8:0000::0001"));
    let dns = RecordingDnsUpdater::new();
    let factory = ScriptedBrowserFactory::new(&ScriptedBrowser::default());

    let (engine, _events) = build_engine(
        ScriptedLookup::answering("2001:db8::1"),
        &dns,
        store,
        &factory,
        sync_config(&["rec-1"], &[]),
    );

    assert!(matches!(
        engine.run_once().await.unwrap(),
        SyncOutcome::Unchanged { .. }
    ));
    assert_eq!(dns.update_call_count(), 0);
}

#[tokio::test]
async fn empty_state_propagates_everything() {
    let store = MemoryStateStore::new();
    let dns = RecordingDnsUpdater::new();
    let browser = ScriptedBrowser::with_rows(&["nas"]);
    let factory = ScriptedBrowserFactory::new(&browser);

    let (engine, _events) = build_engine(
        ScriptedLookup::answering("2001:db8::2"),
        &dns,
        store.clone(),
        &factory,
        sync_config(&["rec-1"], &["nas"]),
    );

    let outcome = engine.run_once().await.unwrap();
    assert_eq!(
        outcome,
        SyncOutcome::Synced {
            address: addr("2001:db8::2"),
            records: 1,
            mappings: 1,
        }
    );
    assert_eq!(store.load(IpVersion::V6).await.unwrap(), Some(addr("2001:db8::2")));
}

#[tokio::test]
async fn no_ipv6_leaves_state_untouched() {
    let store = FlakyStateStore::new(MemoryStateStore::with_address(addr("2001:db8::1")));
    let dns = RecordingDnsUpdater::new();
    let factory = ScriptedBrowserFactory::new(&ScriptedBrowser::default());

    let (engine, _events) = build_engine(
        ScriptedLookup::answering("203.0.113.7"),
        &dns,
        store.clone(),
        &factory,
        sync_config(&["rec-1"], &["nas"]),
    );

    let err = engine.run_once().await.unwrap_err();
    assert!(matches!(err, Error::VersionMismatch { .. }));
    assert_eq!(err.kind(), FailureKind::NoIpv6);

    assert_eq!(dns.update_call_count(), 0);
    assert_eq!(factory.create_count(), 0);
    assert_eq!(store.invalidate_count(), 0, "resolver failures never roll back");
    assert_eq!(store.load(IpVersion::V6).await.unwrap(), Some(addr("2001:db8::1")));
}

#[tokio::test]
async fn lookup_failures_leave_state_untouched() {
    let cases = [
        (ScriptedLookup::unreachable(), FailureKind::Connectivity),
        (ScriptedLookup::answering("<html>502</html>"), FailureKind::InvalidAddress),
    ];

    for (lookup, kind) in cases {
        let store = FlakyStateStore::new(MemoryStateStore::with_address(addr("2001:db8::1")));
        let dns = RecordingDnsUpdater::new();
        let factory = ScriptedBrowserFactory::new(&ScriptedBrowser::default());

        let (engine, _events) =
            build_engine(lookup, &dns, store.clone(), &factory, sync_config(&["rec-1"], &[]));

        let err = engine.run_once().await.unwrap_err();
        assert_eq!(err.kind(), kind, "{err}");
        assert_eq!(dns.update_call_count(), 0);
        assert_eq!(store.invalidate_count(), 0);
        assert_eq!(store.commit_count(), 0);
    }
}

#[tokio::test]
async fn restart_simulation_no_duplicate_updates() {
    let dir = tempfile::tempdir().unwrap();
    let dns = RecordingDnsUpdater::new();
    let browser = ScriptedBrowser::with_rows(&["nas"]);
    let factory = ScriptedBrowserFactory::new(&browser);

    // First process: address is new
    {
        let store = FileStateStore::new(dir.path()).await.unwrap();
        let (engine, _events) = build_engine(
            ScriptedLookup::answering("2001:db8::5"),
            &dns,
            store,
            &factory,
            sync_config(&["rec-1"], &["nas"]),
        );
        assert!(matches!(
            engine.run_once().await.unwrap(),
            SyncOutcome::Synced { .. }
        ));
    }

    // Second process: same address, state read back from disk
    {
        let store = FileStateStore::new(dir.path()).await.unwrap();
        let (engine, _events) = build_engine(
            ScriptedLookup::answering("2001:db8::5"),
            &dns,
            store,
            &factory,
            sync_config(&["rec-1"], &["nas"]),
        );
        assert!(matches!(
            engine.run_once().await.unwrap(),
            SyncOutcome::Unchanged { .. }
        ));
    }

    assert_eq!(dns.update_call_count(), 1, "second run must not update DNS");
    assert_eq!(factory.create_count(), 1, "second run must not open a browser");
}

#[tokio::test]
async fn corrupted_state_file_forces_full_sync() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStateStore::new(dir.path()).await.unwrap();
    std::fs::write(store.slot_path(IpVersion::V6), "not an address").unwrap();

    let dns = RecordingDnsUpdater::new();
    let factory = ScriptedBrowserFactory::new(&ScriptedBrowser::default());
    let (engine, _events) = build_engine(
        ScriptedLookup::answering("2001:db8::5"),
        &dns,
        store,
        &factory,
        sync_config(&["rec-1"], &[]),
    );

    assert!(matches!(
        engine.run_once().await.unwrap(),
        SyncOutcome::Synced { .. }
    ));
    assert_eq!(dns.update_call_count(), 1);

    let on_disk = std::fs::read_to_string(dir.path().join("ipv6.txt")).unwrap();
    assert_eq!(on_disk, "2001:db8::5");
}
