//! In-memory dataplane for tests and dry runs.
//!
//! Behaves like the linux-cp plugin as seen through the pair API: it rejects
//! duplicate indexes and host names, validates host names, and forgets
//! nothing except on [`MockDataplane::restart_with_offset`], which renumbers
//! every interface the way a dataplane restart may.

use std::collections::BTreeMap;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::client::{DataplaneClient, DataplaneResult};
use crate::error::DataplaneError;
use crate::naming::validate_kernel_name;
use crate::types::DataplanePair;

/// Injected failures, one slot per operation.
#[derive(Debug, Default, Clone)]
struct FailureHooks {
    create: Option<DataplaneError>,
    delete: Option<DataplaneError>,
    get: Option<DataplaneError>,
    list: Option<DataplaneError>,
}

#[derive(Debug, Default)]
struct MockState {
    pairs: BTreeMap<u32, DataplanePair>,
    hooks: FailureHooks,
    calls: CallCounters,
}

/// Number of calls seen per operation.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CallCounters {
    pub create: usize,
    pub delete: usize,
    pub get: usize,
    pub list: usize,
}

/// Mock implementation of [`DataplaneClient`].
#[derive(Debug, Default)]
pub struct MockDataplane {
    state: Mutex<MockState>,
}

impl MockDataplane {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a pair behind the state manager's back (out-of-band creation).
    pub fn insert_pair(&self, pair: DataplanePair) {
        self.state.lock().pairs.insert(pair.index, pair);
    }

    /// Removes a pair behind the state manager's back (out-of-band deletion).
    pub fn remove_pair(&self, index: u32) -> Option<DataplanePair> {
        self.state.lock().pairs.remove(&index)
    }

    /// Renames a pair in place without going through the pair API.
    pub fn rename_pair(&self, index: u32, kernel_name: &str) -> bool {
        match self.state.lock().pairs.get_mut(&index) {
            Some(pair) => {
                pair.kernel_name = kernel_name.to_string();
                true
            }
            None => false,
        }
    }

    /// Simulates a dataplane restart that assigns new interface indexes.
    ///
    /// Indexes wrap around at `u32::MAX`, which keeps them distinct.
    pub fn restart_with_offset(&self, offset: u32) {
        let mut state = self.state.lock();
        let pairs = std::mem::take(&mut state.pairs);
        state.pairs = pairs
            .into_values()
            .map(|mut pair| {
                pair.index = pair.index.wrapping_add(offset);
                (pair.index, pair)
            })
            .collect();
    }

    pub fn pairs(&self) -> Vec<DataplanePair> {
        self.state.lock().pairs.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.state.lock().pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().pairs.is_empty()
    }

    pub fn calls(&self) -> CallCounters {
        self.state.lock().calls
    }

    pub fn fail_create(&self, err: Option<DataplaneError>) {
        self.state.lock().hooks.create = err;
    }

    pub fn fail_delete(&self, err: Option<DataplaneError>) {
        self.state.lock().hooks.delete = err;
    }

    pub fn fail_get(&self, err: Option<DataplaneError>) {
        self.state.lock().hooks.get = err;
    }

    pub fn fail_list(&self, err: Option<DataplaneError>) {
        self.state.lock().hooks.list = err;
    }

    /// Drops all pairs, hooks and counters.
    pub fn reset(&self) {
        *self.state.lock() = MockState::default();
    }
}

#[async_trait]
impl DataplaneClient for MockDataplane {
    async fn create_pair(&self, index: u32, kernel_name: &str) -> DataplaneResult<()> {
        let mut state = self.state.lock();
        state.calls.create += 1;
        if let Some(err) = state.hooks.create.clone() {
            return Err(err);
        }

        validate_kernel_name(kernel_name)
            .map_err(|e| DataplaneError::operation("lcp_itf_pair_add", e.to_string()))?;

        if state.pairs.contains_key(&index) {
            return Err(DataplaneError::AlreadyExists {
                detail: format!("sw_if_index {}", index),
            });
        }
        if state.pairs.values().any(|p| p.kernel_name == kernel_name) {
            return Err(DataplaneError::AlreadyExists {
                detail: format!("host interface {}", kernel_name),
            });
        }

        state.pairs.insert(index, DataplanePair::new(index, kernel_name));
        Ok(())
    }

    async fn delete_pair(&self, index: u32) -> DataplaneResult<()> {
        let mut state = self.state.lock();
        state.calls.delete += 1;
        if let Some(err) = state.hooks.delete.clone() {
            return Err(err);
        }
        state
            .pairs
            .remove(&index)
            .map(|_| ())
            .ok_or(DataplaneError::NotFound { index })
    }

    async fn get_pair(&self, index: u32) -> DataplaneResult<DataplanePair> {
        let mut state = self.state.lock();
        state.calls.get += 1;
        if let Some(err) = state.hooks.get.clone() {
            return Err(err);
        }
        state
            .pairs
            .get(&index)
            .cloned()
            .ok_or(DataplaneError::NotFound { index })
    }

    async fn list_pairs(&self) -> DataplaneResult<Vec<DataplanePair>> {
        let mut state = self.state.lock();
        state.calls.list += 1;
        if let Some(err) = state.hooks.list.clone() {
            return Err(err);
        }
        Ok(state.pairs.values().cloned().collect())
    }
}
