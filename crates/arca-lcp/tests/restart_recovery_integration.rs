//! Integration tests for restart recovery
//!
//! Simulates daemon and dataplane restarts:
//! - Junos names restored from the snapshot on a fresh manager
//! - Recovery keyed by linux name when interface indexes change
//! - Sync idempotence
//! - Degraded recovery with a missing, corrupt or inconsistent snapshot

use std::fs;
use std::sync::Arc;

use arca_lcp::{
    FileMappingStore, HostInterfaceType, LcpError, LcpStateManager, MappingStore, MockDataplane,
    OpContext, PersistedMapping,
};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn manager(dp: &Arc<MockDataplane>, temp_dir: &TempDir) -> LcpStateManager {
    LcpStateManager::with_store(
        dp.clone(),
        Arc::new(FileMappingStore::new(temp_dir.path().join("lcp_mapping.json"))),
    )
}

async fn populate(mgr: &LcpStateManager) {
    let ctx = OpContext::background();
    for (index, device) in [(1, "ge-0/0/0"), (2, "ge-0/0/1"), (3, "ge-0/0/1.10")] {
        mgr.create_for_device(&ctx, index, device).await.unwrap();
    }
}

fn device_names(mgr: &LcpStateManager) -> Vec<(u32, String)> {
    mgr.list()
        .into_iter()
        .map(|p| (p.dataplane_index, p.device_name))
        .collect()
}

#[tokio::test]
async fn test_daemon_restart_restores_device_names() {
    let temp_dir = TempDir::new().unwrap();
    let dp = Arc::new(MockDataplane::new());
    populate(&manager(&dp, &temp_dir)).await;

    let restarted = manager(&dp, &temp_dir);
    assert!(restarted.is_empty());

    let report = restarted.sync(&OpContext::background()).await.unwrap();
    assert_eq!((report.pairs, report.recovered), (3, 3));
    assert!(report.is_clean());
    assert_eq!(
        device_names(&restarted),
        vec![
            (1, "ge-0/0/0".to_string()),
            (2, "ge-0/0/1".to_string()),
            (3, "ge-0/0/1.10".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_dataplane_renumbering_keeps_device_names() {
    let temp_dir = TempDir::new().unwrap();
    let dp = Arc::new(MockDataplane::new());
    populate(&manager(&dp, &temp_dir)).await;

    dp.restart_with_offset(40);
    let restarted = manager(&dp, &temp_dir);
    restarted.sync(&OpContext::background()).await.unwrap();

    let pair = restarted.get_by_device_name("ge-0/0/1.10").unwrap();
    assert_eq!(pair.dataplane_index, 43);
    assert_eq!(pair.kernel_name, "ge0-0-1v10");
    assert!(restarted.get_by_device_name("ge-0/0/0").is_ok());
}

#[tokio::test]
async fn test_sync_is_idempotent() {
    let temp_dir = TempDir::new().unwrap();
    let dp = Arc::new(MockDataplane::new());
    let mgr = manager(&dp, &temp_dir);
    populate(&mgr).await;
    let ctx = OpContext::background();

    mgr.sync(&ctx).await.unwrap();
    let first = mgr.list();
    mgr.sync(&ctx).await.unwrap();
    assert_eq!(mgr.list(), first);
}

#[tokio::test]
async fn test_missing_snapshot_is_clean_cold_start() {
    let temp_dir = TempDir::new().unwrap();
    let dp = Arc::new(MockDataplane::new());
    populate(&manager(&dp, &temp_dir)).await;

    let store = FileMappingStore::new(temp_dir.path().join("lcp_mapping.json"));
    store.delete().unwrap();

    let restarted = manager(&dp, &temp_dir);
    let report = restarted.sync(&OpContext::background()).await.unwrap();
    assert_eq!((report.pairs, report.recovered), (3, 0));
    assert!(report.is_clean());
    assert!(restarted.list().iter().all(|p| !p.has_device_name()));
}

#[tokio::test]
async fn test_corrupt_snapshot_degrades_to_warning() {
    let temp_dir = TempDir::new().unwrap();
    let dp = Arc::new(MockDataplane::new());
    populate(&manager(&dp, &temp_dir)).await;
    fs::write(temp_dir.path().join("lcp_mapping.json"), b"[{\"sw_if_index\": 1,").unwrap();

    let restarted = manager(&dp, &temp_dir);
    let report = restarted.sync(&OpContext::background()).await.unwrap();
    assert_eq!(report.pairs, 3);
    assert_eq!(report.recovered, 0);
    let warning = report.warning.unwrap();
    assert!(warning.is_persistence());
    assert_eq!(warning.code(), "LCP_MAPPING_CORRUPTED");
}

#[tokio::test]
async fn test_duplicate_entries_discard_history() {
    let temp_dir = TempDir::new().unwrap();
    let dp = Arc::new(MockDataplane::new());
    let mgr = manager(&dp, &temp_dir);
    populate(&mgr).await;

    let store = FileMappingStore::new(temp_dir.path().join("lcp_mapping.json"));
    let mut mappings = store.load().unwrap();
    let mut duplicate = mappings[0].clone();
    duplicate.sw_if_index = 99;
    mappings.push(duplicate);
    store.save(&mappings).unwrap();

    let report = mgr.sync(&OpContext::background()).await.unwrap();
    assert_eq!(report.recovered, 0);
    match report.warning {
        Some(LcpError::Validation { issues }) => {
            assert_eq!(
                issues,
                vec![
                    "mapping[3]: duplicate linux_name: ge0-0-0".to_string(),
                    "mapping[3]: duplicate junos_name: ge-0/0/0".to_string(),
                ]
            );
        }
        other => panic!("expected validation warning, got {other:?}"),
    }
}

#[tokio::test]
async fn test_history_without_device_names_is_accepted() {
    let temp_dir = TempDir::new().unwrap();
    let dp = Arc::new(MockDataplane::new());
    let mgr = manager(&dp, &temp_dir);
    let ctx = OpContext::background();

    // A pair discovered on a cache miss has no Junos name; the next
    // snapshot still includes it.
    dp.insert_pair(arca_lcp::DataplanePair::new(5, "lo0"));
    mgr.get(&ctx, 5).await.unwrap();
    mgr.create_for_device(&ctx, 1, "ge-0/0/0").await.unwrap();

    let store = FileMappingStore::new(temp_dir.path().join("lcp_mapping.json"));
    let saved = store.load().unwrap();
    assert_eq!(
        saved[1],
        PersistedMapping {
            sw_if_index: 5,
            linux_name: "lo0".to_string(),
            junos_name: String::new(),
            host_if_type: HostInterfaceType::Tap,
            netns: String::new(),
        }
    );

    let restarted = manager(&dp, &temp_dir);
    let report = restarted.sync(&ctx).await.unwrap();
    assert!(report.is_clean());
    assert_eq!(report.recovered, 1);
}
