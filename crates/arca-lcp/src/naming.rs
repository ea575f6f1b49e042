//! Junos to Linux interface name translation.
//!
//! Linux limits interface names to `IFNAMSIZ - 1` (15) bytes, while Junos
//! names are hierarchical (`ge-0/0/0.10`). Translation keeps slashes out of
//! the kernel name and separates the FPC, PIC and port numbers so that
//! `ge-1/11/1` and `ge-11/1/1` never map to the same name:
//!
//! | Junos         | Linux        |
//! |---------------|--------------|
//! | `ge-0/0/0`    | `ge0-0-0`    |
//! | `xe-1/2/3`    | `xe1-2-3`    |
//! | `ge-0/0/0.10` | `ge0-0-0v10` |
//!
//! Names that do not fit fall back to `<type><hash>` where the hash is
//! derived from the full Junos name. That form is deterministic but only
//! probabilistically unique; duplicates are caught by mapping validation and
//! by the state manager on insert.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};

use crate::error::{LcpError, LcpResult};

/// Maximum length for Linux interface names (IFNAMSIZ - 1).
pub const MAX_KERNEL_NAME_LEN: usize = 15;

/// Length of the hash suffix used for names that do not fit.
pub const HASH_SUFFIX_LEN: usize = 5;

/// Matches Junos interface names like ge-0/0/0, xe-1/2/3, et-4/5/6.10
static JUNOS_IF_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([a-z]+)-([0-9]+)/([0-9]+)/([0-9]+)(?:\.([0-9]+))?$").expect("valid Junos name pattern")
});

static KERNEL_NAME_CHARSET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9._-]+$").expect("valid kernel name pattern"));

/// Which branch of the translation produced a kernel name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameForm {
    /// Separator-based name that fits the kernel limit. Collision-free.
    Direct,
    /// Truncated type plus hash suffix.
    Hashed,
}

/// Result of translating a Junos name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernelName {
    pub name: String,
    pub form: NameForm,
}

impl KernelName {
    pub fn as_str(&self) -> &str {
        &self.name
    }

    pub fn is_hashed(&self) -> bool {
        self.form == NameForm::Hashed
    }
}

/// Components of a Junos interface name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceNameComponents {
    /// Interface type (ge, xe, et, ...)
    pub if_type: String,
    /// FPC (Flexible PIC Concentrator) number
    pub fpc: String,
    /// PIC (Physical Interface Card) number
    pub pic: String,
    pub port: String,
    /// VLAN ID for logical units (None if not a subinterface)
    pub vlan: Option<String>,
}

/// Converts a Junos interface name to its Linux kernel name.
pub fn convert(device_name: &str) -> LcpResult<String> {
    translate(device_name).map(|kernel| kernel.name)
}

/// Converts a Junos interface name, reporting which form was used.
pub fn translate(device_name: &str) -> LcpResult<KernelName> {
    let parts = parse_components(device_name)?;

    let mut base = format!("{}{}-{}-{}", parts.if_type, parts.fpc, parts.pic, parts.port);
    if let Some(vlan) = &parts.vlan {
        base.push('v');
        base.push_str(vlan);
    }

    if base.len() <= MAX_KERNEL_NAME_LEN {
        return Ok(KernelName {
            name: base,
            form: NameForm::Direct,
        });
    }

    hashed_name(device_name, &parts.if_type).map(|name| KernelName {
        name,
        form: NameForm::Hashed,
    })
}

/// Builds `<prefix><hash>` from the SHA-256 of the full Junos name.
fn hashed_name(device_name: &str, prefix: &str) -> LcpResult<String> {
    let digest = Sha256::digest(device_name.as_bytes());
    let encoded = URL_SAFE_NO_PAD.encode(digest).to_lowercase();
    let suffix = &encoded[..HASH_SUFFIX_LEN];

    // Prefix is ASCII by construction of the name pattern.
    let max_prefix = MAX_KERNEL_NAME_LEN - HASH_SUFFIX_LEN;
    let prefix = if prefix.len() > max_prefix {
        &prefix[..max_prefix]
    } else {
        prefix
    };

    let name = format!("{}{}", prefix, suffix);
    if name.len() > MAX_KERNEL_NAME_LEN {
        return Err(LcpError::Length {
            len: name.len(),
            name,
            max: MAX_KERNEL_NAME_LEN,
        });
    }
    Ok(name)
}

/// Checks that a Linux interface name is usable by the kernel.
pub fn validate_kernel_name(name: &str) -> LcpResult<()> {
    if name.is_empty() {
        return Err(LcpError::invalid_kernel_name(name, "empty name"));
    }
    if name.len() > MAX_KERNEL_NAME_LEN {
        return Err(LcpError::invalid_kernel_name(
            name,
            format!("{} chars, max {}", name.len(), MAX_KERNEL_NAME_LEN),
        ));
    }
    if !KERNEL_NAME_CHARSET.is_match(name) {
        return Err(LcpError::invalid_kernel_name(name, "contains invalid characters"));
    }
    Ok(())
}

/// Returns true if the string follows the Junos interface naming convention.
pub fn is_device_name(name: &str) -> bool {
    JUNOS_IF_NAME.is_match(name)
}

/// Splits a Junos interface name into its components.
pub fn parse_components(device_name: &str) -> LcpResult<DeviceNameComponents> {
    let caps = JUNOS_IF_NAME
        .captures(device_name)
        .ok_or_else(|| LcpError::format(device_name))?;

    Ok(DeviceNameComponents {
        if_type: caps[1].to_string(),
        fpc: caps[2].to_string(),
        pic: caps[3].to_string(),
        port: caps[4].to_string(),
        vlan: caps.get(5).map(|m| m.as_str().to_string()),
    })
}
