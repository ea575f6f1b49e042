//! Cache versus dataplane consistency check.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use tracing::{debug, warn};

use crate::context::OpContext;
use crate::error::{LcpError, LcpResult};
use crate::state::LcpStateManager;

/// A single divergence between the cache and the dataplane.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inconsistency {
    /// Cached pair no longer exists in the dataplane.
    StaleInCache { index: u32, kernel_name: String },

    /// Same index, different linux name.
    KernelNameMismatch {
        index: u32,
        cached: String,
        live: String,
    },

    /// Dataplane pair the cache does not know about.
    MissingFromCache { index: u32, kernel_name: String },
}

impl Inconsistency {
    pub fn index(&self) -> u32 {
        match self {
            Inconsistency::StaleInCache { index, .. }
            | Inconsistency::KernelNameMismatch { index, .. }
            | Inconsistency::MissingFromCache { index, .. } => *index,
        }
    }
}

impl fmt::Display for Inconsistency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Inconsistency::StaleInCache { index, kernel_name } => write!(
                f,
                "LCP pair sw_if_index={} ({}) exists in cache but not in VPP",
                index, kernel_name
            ),
            Inconsistency::KernelNameMismatch {
                index,
                cached,
                live,
            } => write!(
                f,
                "LCP pair sw_if_index={} linux_name mismatch: cache={}, VPP={}",
                index, cached, live
            ),
            Inconsistency::MissingFromCache { index, kernel_name } => write!(
                f,
                "LCP pair sw_if_index={} ({}) exists in VPP but not in cache",
                index, kernel_name
            ),
        }
    }
}

impl LcpStateManager {
    /// Compares the cache against a fresh dataplane listing.
    ///
    /// Returns an empty list iff both hold the same `(index, linux name)`
    /// set. Findings are ordered by index. The cache is not modified.
    pub async fn check_consistency(&self, ctx: &OpContext) -> LcpResult<Vec<Inconsistency>> {
        ctx.check("check_consistency")?;
        let live: HashMap<u32, String> = self
            .client
            .list_pairs()
            .await
            .map_err(|e| LcpError::from_dataplane("list", e))?
            .into_iter()
            .map(|p| (p.index, p.kernel_name))
            .collect();

        let mut findings: BTreeMap<u32, Inconsistency> = BTreeMap::new();
        {
            let cache = self.cache.read();
            for (index, pair) in cache.iter() {
                match live.get(index) {
                    None => {
                        findings.insert(
                            *index,
                            Inconsistency::StaleInCache {
                                index: *index,
                                kernel_name: pair.kernel_name.clone(),
                            },
                        );
                    }
                    Some(name) if *name != pair.kernel_name => {
                        findings.insert(
                            *index,
                            Inconsistency::KernelNameMismatch {
                                index: *index,
                                cached: pair.kernel_name.clone(),
                                live: name.clone(),
                            },
                        );
                    }
                    Some(_) => {}
                }
            }
            for (index, name) in live.iter().filter(|(i, _)| !cache.contains_key(*i)) {
                findings.insert(
                    *index,
                    Inconsistency::MissingFromCache {
                        index: *index,
                        kernel_name: name.clone(),
                    },
                );
            }
        }

        let findings: Vec<Inconsistency> = findings.into_values().collect();
        if findings.is_empty() {
            debug!(pairs = live.len(), "LCP cache consistent with dataplane");
        } else {
            warn!(count = findings.len(), "LCP cache diverges from dataplane");
        }
        Ok(findings)
    }
}
