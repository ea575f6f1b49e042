//! LCP pair state manager.
//!
//! Keeps the `sw_if_index -> (linux name, Junos name)` table in memory and
//! writes a snapshot of it after every mutation.
//!
//! # Locking
//!
//! - `cache` (`RwLock`) guards the table itself.
//! - `persist_lock` serializes writers: the {check, dataplane call, mutate,
//!   snapshot, save} sequence of `create`/`delete` and the whole of `sync`.
//!   Name conflict checks therefore see every earlier mutation, and snapshots
//!   reach disk in mutation order.
//!
//! Lock order is always `persist_lock` then `cache`. The cache lock is never
//! held across the dataplane call or the snapshot write, so readers never
//! wait on dataplane or disk I/O.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::client::DataplaneClient;
use crate::config::LcpConfig;
use crate::context::OpContext;
use crate::error::{LcpError, LcpResult, Mutation};
use crate::naming::{self, validate_kernel_name};
use crate::persistence::{FileMappingStore, MappingStore};
use crate::types::{InterfacePair, PersistedMapping};

/// Manages LCP interface pairs state and provides caching.
pub struct LcpStateManager {
    pub(crate) client: Arc<dyn DataplaneClient>,
    pub(crate) store: Arc<dyn MappingStore>,
    pub(crate) cache: RwLock<HashMap<u32, InterfacePair>>,
    pub(crate) persist_lock: Mutex<()>,
}

impl LcpStateManager {
    /// Creates a manager persisting to the default mapping path.
    pub fn new(client: Arc<dyn DataplaneClient>) -> Self {
        Self::with_store(client, Arc::new(FileMappingStore::default()))
    }

    /// Creates a manager persisting to the path from `config`.
    pub fn from_config(client: Arc<dyn DataplaneClient>, config: &LcpConfig) -> Self {
        Self::with_store(client, Arc::new(FileMappingStore::from_config(config)))
    }

    pub fn with_store(client: Arc<dyn DataplaneClient>, store: Arc<dyn MappingStore>) -> Self {
        Self {
            client,
            store,
            cache: RwLock::new(HashMap::new()),
            persist_lock: Mutex::new(()),
        }
    }

    /// Retrieves an LCP pair by dataplane index.
    ///
    /// Cache misses are resolved against the dataplane and cached.
    pub async fn get(&self, ctx: &OpContext, index: u32) -> LcpResult<InterfacePair> {
        let cached = self.cache.read().get(&index).cloned();
        if let Some(pair) = cached {
            return Ok(pair);
        }

        ctx.check("get")?;
        let pair: InterfacePair = self
            .client
            .get_pair(index)
            .await
            .map_err(|e| LcpError::from_dataplane("get", e))?
            .into();

        debug!(sw_if_index = index, linux_name = %pair.kernel_name, "Cached LCP pair from dataplane");
        self.cache.write().insert(index, pair.clone());
        Ok(pair)
    }

    /// Creates an LCP pair in the dataplane and records its Junos name.
    ///
    /// The cache only changes after the dataplane confirms. If the snapshot
    /// cannot be written afterwards, the pair stays live and cached and
    /// `LcpError::Unpersisted` is returned.
    pub async fn create(
        &self,
        ctx: &OpContext,
        index: u32,
        kernel_name: &str,
        device_name: &str,
    ) -> LcpResult<()> {
        validate_kernel_name(kernel_name)?;

        let _persist = self.persist_lock.lock().await;
        self.check_conflicts(index, kernel_name, device_name)?;

        ctx.check("create")?;
        self.client
            .create_pair(index, kernel_name)
            .await
            .map_err(|e| LcpError::from_dataplane("create", e))?;

        let snapshot = {
            let mut cache = self.cache.write();
            cache.insert(index, InterfacePair::new(index, kernel_name, device_name));
            snapshot_of(&cache)
        };

        info!(
            sw_if_index = index,
            linux_name = kernel_name,
            junos_name = device_name,
            "LCP pair created"
        );
        self.persist(Mutation::Create, index, &snapshot)
    }

    /// Translates a Junos name and creates the LCP pair for it.
    pub async fn create_for_device(
        &self,
        ctx: &OpContext,
        index: u32,
        device_name: &str,
    ) -> LcpResult<InterfacePair> {
        let kernel = naming::translate(device_name)?;
        if kernel.is_hashed() {
            debug!(
                junos_name = device_name,
                linux_name = %kernel.name,
                "Using hashed linux name"
            );
        }

        self.create(ctx, index, &kernel.name, device_name).await?;
        Ok(InterfacePair::new(index, kernel.name, device_name))
    }

    /// Removes an LCP pair from the dataplane, then from the cache and snapshot.
    pub async fn delete(&self, ctx: &OpContext, index: u32) -> LcpResult<()> {
        let _persist = self.persist_lock.lock().await;

        ctx.check("delete")?;
        self.client
            .delete_pair(index)
            .await
            .map_err(|e| LcpError::from_dataplane("delete", e))?;

        let snapshot = {
            let mut cache = self.cache.write();
            cache.remove(&index);
            snapshot_of(&cache)
        };

        info!(sw_if_index = index, "LCP pair deleted");
        self.persist(Mutation::Delete, index, &snapshot)
    }

    /// Records a pair that already exists in the dataplane.
    ///
    /// Touches neither the dataplane nor the snapshot.
    pub fn register_existing(&self, index: u32, kernel_name: &str, device_name: &str) {
        self.cache
            .write()
            .insert(index, InterfacePair::new(index, kernel_name, device_name));
    }

    /// Returns all cached pairs ordered by dataplane index.
    pub fn list(&self) -> Vec<InterfacePair> {
        let mut pairs: Vec<InterfacePair> = self.cache.read().values().cloned().collect();
        pairs.sort_by_key(|p| p.dataplane_index);
        pairs
    }

    pub fn get_by_device_name(&self, device_name: &str) -> LcpResult<InterfacePair> {
        self.cache
            .read()
            .values()
            .find(|p| p.has_device_name() && p.device_name == device_name)
            .cloned()
            .ok_or_else(|| LcpError::not_found(format!("Junos name {}", device_name)))
    }

    pub fn get_by_kernel_name(&self, kernel_name: &str) -> LcpResult<InterfacePair> {
        self.cache
            .read()
            .values()
            .find(|p| p.kernel_name == kernel_name)
            .cloned()
            .ok_or_else(|| LcpError::not_found(format!("Linux name {}", kernel_name)))
    }

    /// Empties the cache. The snapshot file is left as is.
    pub fn clear(&self) {
        self.cache.write().clear();
    }

    pub fn len(&self) -> usize {
        self.cache.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.read().is_empty()
    }

    /// Rejects names already owned by another index.
    fn check_conflicts(&self, index: u32, kernel_name: &str, device_name: &str) -> LcpResult<()> {
        let cache = self.cache.read();
        for pair in cache.values().filter(|p| p.dataplane_index != index) {
            if pair.kernel_name == kernel_name {
                return Err(LcpError::Conflict {
                    field: "linux_name",
                    value: kernel_name.to_string(),
                    owner: pair.dataplane_index,
                });
            }
            if !device_name.is_empty() && pair.device_name == device_name {
                return Err(LcpError::Conflict {
                    field: "junos_name",
                    value: device_name.to_string(),
                    owner: pair.dataplane_index,
                });
            }
        }
        Ok(())
    }

    /// Writes a snapshot; must be called with `persist_lock` held.
    fn persist(&self, mutation: Mutation, index: u32, snapshot: &[PersistedMapping]) -> LcpResult<()> {
        self.store.save(snapshot).map_err(|source| {
            warn!(
                sw_if_index = index,
                mutation = %mutation,
                error = %source,
                "LCP pair applied but mapping was not persisted; Junos name may be lost on restart"
            );
            LcpError::Unpersisted {
                mutation,
                index,
                source: Box::new(source),
            }
        })
    }
}

fn snapshot_of(cache: &HashMap<u32, InterfacePair>) -> Vec<PersistedMapping> {
    let mut mappings: Vec<PersistedMapping> = cache.values().map(InterfacePair::to_mapping).collect();
    mappings.sort_by_key(|m| m.sw_if_index);
    mappings
}
