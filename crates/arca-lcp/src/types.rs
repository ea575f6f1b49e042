//! LCP identity type definitions

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Kind of host device exposing a dataplane interface to the kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HostInterfaceType {
    #[default]
    Tap,
    Tun,
}

impl HostInterfaceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            HostInterfaceType::Tap => "tap",
            HostInterfaceType::Tun => "tun",
        }
    }
}

impl fmt::Display for HostInterfaceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HostInterfaceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("tap") {
            Ok(HostInterfaceType::Tap)
        } else if s.eq_ignore_ascii_case("tun") {
            Ok(HostInterfaceType::Tun)
        } else {
            Err(format!("unknown host interface type: {}", s))
        }
    }
}

/// LCP pair as reported by the dataplane.
///
/// The dataplane has no notion of Junos names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataplanePair {
    /// VPP software interface index
    pub index: u32,

    /// Linux kernel interface name
    pub kernel_name: String,

    pub host_if_type: HostInterfaceType,

    /// Network namespace (empty for default namespace)
    pub namespace: String,
}

impl DataplanePair {
    pub fn new(index: u32, kernel_name: impl Into<String>) -> Self {
        Self {
            index,
            kernel_name: kernel_name.into(),
            host_if_type: HostInterfaceType::Tap,
            namespace: String::new(),
        }
    }
}

/// A linux control plane interface pair tracked by the state manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfacePair {
    /// VPP software interface index
    pub dataplane_index: u32,

    /// Linux kernel interface name (at most 15 characters)
    pub kernel_name: String,

    /// Junos configuration name (e.g. ge-0/0/0), empty when unknown.
    /// Populated by the state manager, never by the dataplane.
    pub device_name: String,

    pub host_if_type: HostInterfaceType,

    /// Network namespace (empty for default namespace)
    pub namespace: String,
}

impl InterfacePair {
    /// Creates a TAP pair in the default namespace.
    pub fn new(
        dataplane_index: u32,
        kernel_name: impl Into<String>,
        device_name: impl Into<String>,
    ) -> Self {
        Self {
            dataplane_index,
            kernel_name: kernel_name.into(),
            device_name: device_name.into(),
            host_if_type: HostInterfaceType::Tap,
            namespace: String::new(),
        }
    }

    pub fn has_device_name(&self) -> bool {
        !self.device_name.is_empty()
    }

    pub fn to_mapping(&self) -> PersistedMapping {
        PersistedMapping {
            sw_if_index: self.dataplane_index,
            linux_name: self.kernel_name.clone(),
            junos_name: self.device_name.clone(),
            host_if_type: self.host_if_type,
            netns: self.namespace.clone(),
        }
    }
}

impl From<DataplanePair> for InterfacePair {
    fn from(pair: DataplanePair) -> Self {
        Self {
            dataplane_index: pair.index,
            kernel_name: pair.kernel_name,
            device_name: String::new(),
            host_if_type: pair.host_if_type,
            namespace: pair.namespace,
        }
    }
}

/// Single entry of the on-disk LCP name mapping snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedMapping {
    pub sw_if_index: u32,
    pub linux_name: String,
    pub junos_name: String,
    pub host_if_type: HostInterfaceType,
    pub netns: String,
}
