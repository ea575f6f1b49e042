//! Crash-safe persistence of LCP name mappings.
//!
//! The dataplane only knows interface indexes and Linux names. Junos names
//! exist nowhere but in this process, so they are written to a JSON snapshot
//! after every mutation and read back during [`sync`](crate::LcpStateManager::sync).
//!
//! ## Write protocol
//!
//! 1. Serialize the full mapping set (always a full replace, never a patch)
//! 2. Create a temp file next to the target so the rename stays on one filesystem
//! 3. chmod 0640, write, fsync, close
//! 4. Rename onto the target path
//! 5. fsync the directory so the rename survives a crash
//!
//! Readers therefore see either the previous snapshot or the new one, never a
//! partial file. Only one process may own a snapshot path.

use std::collections::HashSet;
use std::fmt;
use std::fs::{self, DirBuilder, File, Permissions};
use std::io::{self, ErrorKind, Write};
use std::os::unix::fs::{DirBuilderExt, PermissionsExt};
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use tracing::{debug, info};

use crate::config::LcpConfig;
use crate::error::{LcpError, LcpResult};
use crate::naming::validate_kernel_name;
use crate::types::PersistedMapping;

/// Default path for LCP mapping persistence.
pub const DEFAULT_MAPPING_PATH: &str = "/var/lib/arca-router/lcp_mapping.json";

/// Mapping file permissions (owner: rw, group: r, other: none).
pub const MAPPING_FILE_MODE: u32 = 0o640;

/// Permissions for a newly created parent directory.
pub const MAPPING_DIR_MODE: u32 = 0o750;

const TEMP_PREFIX: &str = ".lcp_mapping.";
const TEMP_SUFFIX: &str = ".tmp";

/// Storage for the LCP mapping snapshot.
#[cfg_attr(test, mockall::automock)]
pub trait MappingStore: Send + Sync {
    /// Atomically replaces the stored snapshot with `mappings`.
    fn save(&self, mappings: &[PersistedMapping]) -> LcpResult<()>;

    /// Reads the stored snapshot. A missing snapshot is an empty set.
    fn load(&self) -> LcpResult<Vec<PersistedMapping>>;

    /// Removes the stored snapshot if there is one.
    fn delete(&self) -> LcpResult<()>;
}

/// JSON file backed [`MappingStore`].
#[derive(Debug)]
pub struct FileMappingStore {
    path: PathBuf,
    lock: RwLock<()>,
}

impl FileMappingStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: RwLock::new(()),
        }
    }

    pub fn from_config(config: &LcpConfig) -> Self {
        Self::new(config.persistence.mapping_path.clone())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn dir(&self) -> PathBuf {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    fn io_err(&self, action: &'static str, path: &Path, source: io::Error) -> LcpError {
        LcpError::PersistenceIo {
            action,
            path: path.to_path_buf(),
            source,
        }
    }

    fn sync_dir(&self, dir: &Path) -> LcpResult<()> {
        File::open(dir)
            .and_then(|d| d.sync_all())
            .map_err(|e| self.io_err("fsync directory of", dir, e))
    }
}

impl Default for FileMappingStore {
    fn default() -> Self {
        Self::new(DEFAULT_MAPPING_PATH)
    }
}

impl MappingStore for FileMappingStore {
    fn save(&self, mappings: &[PersistedMapping]) -> LcpResult<()> {
        let _guard = self.lock.write();
        let dir = self.dir();

        DirBuilder::new()
            .recursive(true)
            .mode(MAPPING_DIR_MODE)
            .create(&dir)
            .map_err(|e| self.io_err("create directory for", &dir, e))?;

        let data = serde_json::to_vec_pretty(mappings)
            .map_err(|e| self.io_err("encode", &self.path, io::Error::from(e)))?;

        // O_EXCL temp file; dropped (and removed) on any early return below.
        let mut temp = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .suffix(TEMP_SUFFIX)
            .tempfile_in(&dir)
            .map_err(|e| self.io_err("create temp file for", &self.path, e))?;

        temp.as_file()
            .set_permissions(Permissions::from_mode(MAPPING_FILE_MODE))
            .map_err(|e| self.io_err("chmod temp file for", temp.path(), e))?;
        temp.write_all(&data)
            .map_err(|e| self.io_err("write temp file for", temp.path(), e))?;
        temp.as_file()
            .sync_all()
            .map_err(|e| self.io_err("fsync temp file for", temp.path(), e))?;

        // Close before rename; the TempPath still removes the file on failure.
        let temp_path = temp.into_temp_path();
        temp_path
            .persist(&self.path)
            .map_err(|e| self.io_err("rename temp file onto", &self.path, e.error))?;

        self.sync_dir(&dir)?;

        debug!(
            path = %self.path.display(),
            count = mappings.len(),
            "Saved LCP mapping snapshot"
        );
        Ok(())
    }

    fn load(&self) -> LcpResult<Vec<PersistedMapping>> {
        let _guard = self.lock.read();

        let data = match fs::read(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No LCP mapping snapshot found");
                return Ok(Vec::new());
            }
            Err(e) => return Err(self.io_err("read", &self.path, e)),
        };

        serde_json::from_slice(&data).map_err(|source| LcpError::Corruption {
            path: self.path.clone(),
            source,
        })
    }

    fn delete(&self) -> LcpResult<()> {
        let _guard = self.lock.write();

        match fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(self.io_err("delete", &self.path, e)),
        }

        self.sync_dir(&self.dir())?;
        info!(path = %self.path.display(), "Deleted LCP mapping snapshot");
        Ok(())
    }
}

/// Problem found in a loaded mapping set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    /// Position of the offending entry in the snapshot.
    pub position: usize,
    pub problem: IssueKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IssueKind {
    MissingLinuxName,
    DuplicateIndex(u32),
    DuplicateLinuxName(String),
    DuplicateJunosName(String),
    InvalidLinuxName(String),
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "mapping[{}]: ", self.position)?;
        match &self.problem {
            IssueKind::MissingLinuxName => write!(f, "missing linux_name"),
            IssueKind::DuplicateIndex(index) => write!(f, "duplicate sw_if_index: {}", index),
            IssueKind::DuplicateLinuxName(name) => write!(f, "duplicate linux_name: {}", name),
            IssueKind::DuplicateJunosName(name) => write!(f, "duplicate junos_name: {}", name),
            IssueKind::InvalidLinuxName(reason) => {
                write!(f, "invalid linux_name format: {}", reason)
            }
        }
    }
}

/// Checks a mapping set for missing fields, duplicates and bad Linux names.
///
/// An empty `junos_name` is allowed: pairs discovered without history are
/// snapshotted too.
pub fn validate_mappings(mappings: &[PersistedMapping]) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    let mut seen_index = HashSet::new();
    let mut seen_linux = HashSet::new();
    let mut seen_junos = HashSet::new();

    for (position, mapping) in mappings.iter().enumerate() {
        let mut push = |problem| issues.push(ValidationIssue { position, problem });

        if !seen_index.insert(mapping.sw_if_index) {
            push(IssueKind::DuplicateIndex(mapping.sw_if_index));
        }

        if mapping.linux_name.is_empty() {
            push(IssueKind::MissingLinuxName);
        } else {
            if !seen_linux.insert(mapping.linux_name.as_str()) {
                push(IssueKind::DuplicateLinuxName(mapping.linux_name.clone()));
            }
            if let Err(e) = validate_kernel_name(&mapping.linux_name) {
                push(IssueKind::InvalidLinuxName(e.to_string()));
            }
        }

        if !mapping.junos_name.is_empty() && !seen_junos.insert(mapping.junos_name.as_str()) {
            push(IssueKind::DuplicateJunosName(mapping.junos_name.clone()));
        }
    }

    issues
}
