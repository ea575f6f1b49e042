//! Startup reconciliation of the pair cache.
//!
//! The dataplane is the source of truth for which pairs exist; the snapshot
//! only contributes Junos names. History is joined on the linux name, since
//! interface indexes are not stable across a dataplane restart.

use std::collections::HashMap;

use tracing::{info, warn};

use crate::context::OpContext;
use crate::error::{LcpError, LcpResult};
use crate::persistence::validate_mappings;
use crate::state::LcpStateManager;
use crate::types::{InterfacePair, PersistedMapping};

/// Outcome of a successful [`LcpStateManager::sync`].
#[derive(Debug, Default)]
pub struct SyncReport {
    /// Number of pairs now cached (one per live dataplane pair).
    pub pairs: usize,

    /// Pairs whose Junos name was recovered from the snapshot.
    pub recovered: usize,

    /// Set when history could not be loaded or failed validation.
    /// The cache is still valid but holds no Junos names.
    pub warning: Option<LcpError>,
}

impl SyncReport {
    pub fn is_clean(&self) -> bool {
        self.warning.is_none()
    }
}

impl LcpStateManager {
    /// Rebuilds the cache from the dataplane and restores Junos names.
    ///
    /// Fails only when the dataplane cannot be listed, in which case the
    /// cache is left untouched. Holds the persistence lock throughout, so
    /// concurrent `create`/`delete` calls complete before or after it.
    pub async fn sync(&self, ctx: &OpContext) -> LcpResult<SyncReport> {
        let _persist = self.persist_lock.lock().await;

        ctx.check("sync")?;
        let live = self
            .client
            .list_pairs()
            .await
            .map_err(|e| LcpError::from_dataplane("list", e))?;

        let (history, warning) = self.load_history();
        let device_names: HashMap<String, String> = history
            .into_iter()
            .map(|m| (m.linux_name, m.junos_name))
            .collect();

        let mut recovered = 0;
        let rebuilt: HashMap<u32, InterfacePair> = live
            .into_iter()
            .map(|live_pair| {
                let mut pair = InterfacePair::from(live_pair);
                if let Some(name) = device_names.get(&pair.kernel_name) {
                    if !name.is_empty() {
                        recovered += 1;
                    }
                    pair.device_name = name.clone();
                }
                (pair.dataplane_index, pair)
            })
            .collect();

        let pairs = rebuilt.len();
        *self.cache.write() = rebuilt;

        info!(pairs, recovered, "LCP state synchronized with dataplane");
        Ok(SyncReport {
            pairs,
            recovered,
            warning,
        })
    }

    /// Loads and validates the snapshot; any problem yields empty history.
    fn load_history(&self) -> (Vec<PersistedMapping>, Option<LcpError>) {
        let mappings = match self.store.load() {
            Ok(mappings) => mappings,
            Err(e) => {
                warn!(error = %e, "Failed to load LCP mappings, Junos names will not be restored");
                return (Vec::new(), Some(e));
            }
        };

        let issues = validate_mappings(&mappings);
        if !issues.is_empty() {
            let err = LcpError::Validation {
                issues: issues.iter().map(ToString::to_string).collect(),
            };
            warn!(error = %err, "Discarding persisted LCP mappings");
            return (Vec::new(), Some(err));
        }

        (mappings, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::DataplaneClient;
    use crate::error::DataplaneError;
    use crate::mock::MockDataplane;
    use crate::persistence::MockMappingStore;
    use crate::types::HostInterfaceType;
    use std::sync::Arc;

    fn mapping(index: u32, linux: &str, junos: &str) -> PersistedMapping {
        InterfacePair::new(index, linux, junos).to_mapping()
    }

    fn store_returning(mappings: Vec<PersistedMapping>) -> MockMappingStore {
        let mut store = MockMappingStore::new();
        store.expect_load().returning(move || Ok(mappings.clone()));
        store
    }

    #[tokio::test]
    async fn test_sync_attaches_names_by_linux_name() {
        let dp = Arc::new(MockDataplane::new());
        dp.create_pair(10, "ge0-0-0").await.unwrap();
        dp.create_pair(11, "ge0-0-1").await.unwrap();
        dp.create_pair(12, "lo1").await.unwrap();

        // Indexes in the snapshot are stale; names are not.
        let store = store_returning(vec![
            mapping(1, "ge0-0-0", "ge-0/0/0"),
            mapping(2, "ge0-0-1", "ge-0/0/1"),
            mapping(3, "ge0-0-2", "ge-0/0/2"),
        ]);
        let mgr = LcpStateManager::with_store(dp, Arc::new(store));

        let report = mgr.sync(&OpContext::background()).await.unwrap();
        assert_eq!(report.pairs, 3);
        assert_eq!(report.recovered, 2);
        assert!(report.is_clean());

        let names: Vec<(u32, String)> = mgr
            .list()
            .into_iter()
            .map(|p| (p.dataplane_index, p.device_name))
            .collect();
        assert_eq!(
            names,
            vec![
                (10, "ge-0/0/0".to_string()),
                (11, "ge-0/0/1".to_string()),
                (12, String::new()),
            ]
        );
    }

    #[tokio::test]
    async fn test_sync_replaces_stale_cache() {
        let dp = Arc::new(MockDataplane::new());
        dp.create_pair(2, "ge0-0-1").await.unwrap();
        let mgr = LcpStateManager::with_store(dp, Arc::new(store_returning(vec![])));
        mgr.register_existing(1, "ge0-0-0", "ge-0/0/0");

        mgr.sync(&OpContext::background()).await.unwrap();
        assert_eq!(mgr.len(), 1);
        assert!(mgr.get_by_kernel_name("ge0-0-0").is_err());
    }

    #[tokio::test]
    async fn test_sync_keeps_live_attributes() {
        let dp = Arc::new(MockDataplane::new());
        let mut live = crate::types::DataplanePair::new(4, "xe0-0-4");
        live.host_if_type = HostInterfaceType::Tun;
        live.namespace = "dataplane".to_string();
        dp.insert_pair(live);

        let mut stored = mapping(4, "xe0-0-4", "xe-0/0/4");
        stored.netns = "other".to_string();
        let mgr = LcpStateManager::with_store(dp, Arc::new(store_returning(vec![stored])));

        mgr.sync(&OpContext::background()).await.unwrap();
        let pair = mgr.get_by_device_name("xe-0/0/4").unwrap();
        assert_eq!(pair.host_if_type, HostInterfaceType::Tun);
        assert_eq!(pair.namespace, "dataplane");
    }

    #[tokio::test]
    async fn test_sync_dataplane_failure_leaves_cache() {
        let dp = Arc::new(MockDataplane::new());
        dp.fail_list(Some(DataplaneError::Disconnected));
        let mut store = MockMappingStore::new();
        store.expect_load().never();
        let mgr = LcpStateManager::with_store(dp, Arc::new(store));
        mgr.register_existing(1, "ge0-0-0", "ge-0/0/0");

        let err = mgr.sync(&OpContext::background()).await.unwrap_err();
        assert!(matches!(err, LcpError::External { operation: "list", .. }));
        assert_eq!(mgr.len(), 1);
    }

    #[tokio::test]
    async fn test_sync_load_failure_is_warning() {
        let dp = Arc::new(MockDataplane::new());
        dp.create_pair(1, "ge0-0-0").await.unwrap();
        let mut store = MockMappingStore::new();
        store.expect_load().returning(|| {
            Err(LcpError::Corruption {
                path: "/var/lib/arca-router/lcp_mapping.json".into(),
                source: serde_json::from_str::<Vec<PersistedMapping>>("[{").unwrap_err(),
            })
        });
        let mgr = LcpStateManager::with_store(dp, Arc::new(store));

        let report = mgr.sync(&OpContext::background()).await.unwrap();
        assert_eq!(report.pairs, 1);
        assert_eq!(report.recovered, 0);
        assert!(matches!(report.warning, Some(LcpError::Corruption { .. })));
        assert!(!mgr.get(&OpContext::background(), 1).await.unwrap().has_device_name());
    }

    #[tokio::test]
    async fn test_sync_invalid_history_is_discarded() {
        let dp = Arc::new(MockDataplane::new());
        dp.create_pair(1, "ge0-0-0").await.unwrap();
        let store = store_returning(vec![
            mapping(1, "ge0-0-0", "ge-0/0/0"),
            mapping(1, "ge0-0-1", "ge-0/0/1"),
        ]);
        let mgr = LcpStateManager::with_store(dp, Arc::new(store));

        let report = mgr.sync(&OpContext::background()).await.unwrap();
        assert_eq!(report.recovered, 0);
        assert!(matches!(report.warning, Some(LcpError::Validation { .. })));
    }

    #[tokio::test]
    async fn test_sync_cancelled() {
        let dp = Arc::new(MockDataplane::new());
        let mgr = LcpStateManager::with_store(dp.clone(), Arc::new(MockMappingStore::new()));
        let ctx = OpContext::background();
        ctx.cancel();

        assert!(matches!(
            mgr.sync(&ctx).await,
            Err(LcpError::Cancelled { operation: "sync" })
        ));
        assert_eq!(dp.calls().list, 0);
    }
}
