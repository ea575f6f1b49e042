//! Error types for LCP identity operations.
//!
//! All errors implement `std::error::Error` via `thiserror`. Each variant maps
//! to a stable error code and an operator action so that the CLI and the
//! apply-configuration path can report failures uniformly.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for LCP operations.
pub type LcpResult<T> = Result<T, LcpError>;

/// Mutation that reached the dataplane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    Create,
    Delete,
}

impl Mutation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mutation::Create => "create",
            Mutation::Delete => "delete",
        }
    }
}

impl std::fmt::Display for Mutation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors reported by the dataplane collaborator.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DataplaneError {
    /// No LCP pair exists for the interface index.
    #[error("LCP pair not found for interface index {index}")]
    NotFound { index: u32 },

    /// An LCP pair already exists for the index or host name.
    #[error("LCP pair already exists: {detail}")]
    AlreadyExists { detail: String },

    /// The dataplane connection is not established.
    #[error("not connected to dataplane")]
    Disconnected,

    /// The dataplane rejected or failed the request.
    #[error("dataplane operation {operation} failed: {message}")]
    Operation { operation: String, message: String },
}

impl DataplaneError {
    /// Creates an operation error.
    pub fn operation(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Operation {
            operation: operation.into(),
            message: message.into(),
        }
    }
}

/// Errors that can occur in the LCP identity layer.
#[derive(Debug, Error)]
pub enum LcpError {
    /// Device name does not follow the `type-fpc/pic/port[.vlan]` grammar.
    #[error("invalid Junos interface name format: '{name}' (expected format: ge-0/0/0 or ge-0/0/0.10)")]
    Format {
        /// The rejected device name.
        name: String,
    },

    /// Generated kernel name is still over the kernel limit.
    #[error("generated linux name too long: {name} ({len} chars, max {max})")]
    Length { name: String, len: usize, max: usize },

    /// Kernel interface name fails the charset or length check.
    #[error("invalid linux interface name '{name}': {reason}")]
    InvalidKernelName { name: String, reason: String },

    /// Snapshot file I/O failed.
    #[error("failed to {action} LCP mapping file {path}: {source}")]
    PersistenceIo {
        /// Step that failed (e.g. "write", "rename", "fsync directory of").
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Snapshot file does not contain a valid mapping array.
    #[error("LCP mapping file {path} is corrupted: {source}")]
    Corruption {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Lookup miss.
    #[error("LCP interface not found for {key}")]
    NotFound {
        /// Human readable lookup key (e.g. "Junos name ge-0/0/0").
        key: String,
    },

    /// Dataplane call failed.
    #[error("dataplane {operation} failed: {source}")]
    External {
        operation: &'static str,
        #[source]
        source: DataplaneError,
    },

    /// Loaded snapshot is internally inconsistent.
    #[error("persisted LCP mappings validation failed: {}", issues.join("; "))]
    Validation { issues: Vec<String> },

    /// A kernel or device name is already owned by another interface.
    #[error("{field} '{value}' already in use by sw_if_index {owner}")]
    Conflict {
        field: &'static str,
        value: String,
        owner: u32,
    },

    /// The dataplane mutation succeeded but the snapshot write did not.
    ///
    /// The pair is live and cached; only its Junos name history is at risk
    /// across a restart.
    #[error("LCP {mutation} applied for sw_if_index {index} but mapping was not persisted: {source}")]
    Unpersisted {
        mutation: Mutation,
        index: u32,
        #[source]
        source: Box<LcpError>,
    },

    /// Operation cancelled before the dataplane call was issued.
    #[error("operation {operation} cancelled")]
    Cancelled { operation: &'static str },

    /// Deadline passed before the dataplane call was issued.
    #[error("operation {operation} deadline exceeded")]
    DeadlineExceeded { operation: &'static str },

    /// Configuration file could not be read, parsed or validated.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl LcpError {
    /// Creates a format error.
    pub fn format(name: impl Into<String>) -> Self {
        Self::Format { name: name.into() }
    }

    /// Creates a not found error.
    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound { key: key.into() }
    }

    /// Creates an invalid kernel name error.
    pub fn invalid_kernel_name(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidKernelName {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Converts a dataplane failure, keeping "not found" as a lookup miss.
    pub fn from_dataplane(operation: &'static str, source: DataplaneError) -> Self {
        match source {
            DataplaneError::NotFound { index } => {
                Self::not_found(format!("sw_if_index {}", index))
            }
            source => Self::External { operation, source },
        }
    }

    /// Returns true for snapshot I/O and corruption errors.
    pub fn is_persistence(&self) -> bool {
        matches!(
            self,
            LcpError::PersistenceIo { .. } | LcpError::Corruption { .. }
        )
    }

    /// Returns true when the dataplane side was applied but not persisted.
    pub fn is_partial_success(&self) -> bool {
        matches!(self, LcpError::Unpersisted { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, LcpError::NotFound { .. })
    }

    /// Returns true if this error indicates a transient condition
    /// that may succeed on retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            LcpError::External { source, .. } => matches!(
                source,
                DataplaneError::Disconnected | DataplaneError::Operation { .. }
            ),
            LcpError::PersistenceIo { .. } | LcpError::DeadlineExceeded { .. } => true,
            _ => false,
        }
    }

    /// Stable error code for logs and CLI output.
    pub fn code(&self) -> &'static str {
        match self {
            LcpError::Format { .. } => "LCP_NAME_FORMAT_ERROR",
            LcpError::Length { .. } => "LCP_NAME_LENGTH_ERROR",
            LcpError::InvalidKernelName { .. } => "LCP_NAME_INVALID",
            LcpError::PersistenceIo { .. } => "SYSTEM_ERROR",
            LcpError::Corruption { .. } => "LCP_MAPPING_CORRUPTED",
            LcpError::NotFound { .. } => "LCP_NOT_FOUND",
            LcpError::External { source, .. } => match source {
                DataplaneError::Disconnected => "VPP_CONNECTION_ERROR",
                _ => "VPP_OPERATION_ERROR",
            },
            LcpError::Validation { .. } => "LCP_MAPPING_INVALID",
            LcpError::Conflict { .. } => "LCP_NAME_CONFLICT",
            LcpError::Unpersisted { .. } => "LCP_NOT_PERSISTED",
            LcpError::Cancelled { .. } => "OPERATION_CANCELLED",
            LcpError::DeadlineExceeded { .. } => "VPP_TIMEOUT",
            LcpError::Configuration(_) => "CONFIG_ERROR",
        }
    }

    /// Suggested operator action.
    pub fn action(&self) -> &'static str {
        match self {
            LcpError::Format { .. } => "Use an interface name like ge-0/0/0 or ge-0/0/0.10",
            LcpError::Length { .. } | LcpError::InvalidKernelName { .. } => {
                "Choose a shorter interface name"
            }
            LcpError::PersistenceIo { .. } | LcpError::Unpersisted { .. } => {
                "Check /var/lib/arca-router/ permissions and disk space"
            }
            LcpError::Corruption { .. } | LcpError::Validation { .. } => {
                "Restore the mapping file from backup or delete it to start fresh"
            }
            LcpError::NotFound { .. } => "Ensure the interface has been created with an LCP pair",
            LcpError::External { .. } => "Ensure VPP is running and the linux-cp plugin is loaded",
            LcpError::Conflict { .. } => "Delete the existing LCP pair or rename the interface",
            LcpError::Cancelled { .. } | LcpError::DeadlineExceeded { .. } => {
                "Retry the operation"
            }
            LcpError::Configuration(_) => "Check /etc/arca-router/lcp.toml",
        }
    }
}
