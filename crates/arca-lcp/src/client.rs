//! Dataplane collaborator abstraction.
//!
//! The identity layer only needs the linux-cp pair operations of the
//! dataplane API. Wire encoding, connection management and retries live in
//! the implementation behind this trait.

use async_trait::async_trait;

use crate::error::DataplaneError;
use crate::types::DataplanePair;

/// Result type for dataplane calls.
pub type DataplaneResult<T> = Result<T, DataplaneError>;

/// LCP pair operations provided by the dataplane.
#[async_trait]
pub trait DataplaneClient: Send + Sync {
    /// Creates an LCP pair for an existing dataplane interface, making it
    /// visible in the Linux kernel as `kernel_name`.
    async fn create_pair(&self, index: u32, kernel_name: &str) -> DataplaneResult<()>;

    /// Removes the LCP pair of a dataplane interface.
    async fn delete_pair(&self, index: u32) -> DataplaneResult<()>;

    /// Retrieves the LCP pair of a dataplane interface.
    ///
    /// Returns `DataplaneError::NotFound` when the interface has no pair.
    async fn get_pair(&self, index: u32) -> DataplaneResult<DataplanePair>;

    /// Lists all LCP pairs known to the dataplane.
    async fn list_pairs(&self) -> DataplaneResult<Vec<DataplanePair>>;
}
