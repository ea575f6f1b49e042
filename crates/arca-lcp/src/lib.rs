//! Interface identity layer for arca-router.
//!
//! Every routed interface has three names that must stay in agreement:
//!
//! - the VPP software interface index (`sw_if_index`), assigned by the
//!   dataplane and not stable across dataplane restarts
//! - the Linux kernel name of its linux-cp host interface (`ge0-0-0`)
//! - the Junos configuration name (`ge-0/0/0`), which the dataplane never sees
//!
//! This crate provides:
//!
//! - [`naming`]: deterministic Junos to Linux name translation
//! - [`FileMappingStore`]: crash-safe JSON snapshot of the name mappings
//! - [`LcpStateManager`]: in-memory pair cache with snapshot-after-mutation,
//!   startup reconciliation ([`LcpStateManager::sync`]) and drift detection
//!   ([`LcpStateManager::check_consistency`])
//! - [`MockDataplane`]: in-memory [`DataplaneClient`] for tests and dry runs
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use arca_lcp::{LcpConfig, LcpStateManager, OpContext};
//!
//! let config = LcpConfig::load_default()?;
//! let manager = LcpStateManager::from_config(client, &config);
//! let ctx = OpContext::background();
//!
//! let report = manager.sync(&ctx).await?;
//! if let Some(warning) = &report.warning {
//!     tracing::warn!(error = %warning, "Junos names not restored");
//! }
//! manager.create_for_device(&ctx, 1, "ge-0/0/0").await?;
//! ```

pub mod client;
pub mod config;
pub mod consistency;
pub mod context;
pub mod error;
pub mod mock;
pub mod naming;
pub mod persistence;
pub mod reconcile;
pub mod state;
pub mod types;

pub use client::{DataplaneClient, DataplaneResult};
pub use config::{LcpConfig, LoggingConfig, PersistenceConfig, DEFAULT_CONFIG_PATH};
pub use consistency::Inconsistency;
pub use context::OpContext;
pub use error::{DataplaneError, LcpError, LcpResult, Mutation};
pub use mock::MockDataplane;
pub use naming::{convert, is_device_name, translate, KernelName, NameForm, MAX_KERNEL_NAME_LEN};
pub use persistence::{
    validate_mappings, FileMappingStore, IssueKind, MappingStore, ValidationIssue,
    DEFAULT_MAPPING_PATH,
};
pub use reconcile::SyncReport;
pub use state::LcpStateManager;
pub use types::{DataplanePair, HostInterfaceType, InterfacePair, PersistedMapping};
