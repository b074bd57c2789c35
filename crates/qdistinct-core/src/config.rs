//! Execution configuration that downstream crates can serialize/deserialize.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Which backend holds the per-execution key-presence store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyStoreKind {
    /// Hash map accounted against the memory cap.
    Memory,
    /// One entry per key on the configured spill storage.
    Storage,
}

impl FromStr for KeyStoreKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" | "mem" => Ok(KeyStoreKind::Memory),
            "storage" | "disk" => Ok(KeyStoreKind::Storage),
            other => Err(Error::Config(format!("unknown key store kind '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecConfig {
    /// Hard memory cap (in bytes) for memory-backed key stores.
    pub mem_cap_bytes: usize,

    /// Backend for the key-presence store.
    pub key_store: KeyStoreKind,

    /// Directory for storage-backed key stores (legacy local-path configuration).
    pub spill_dir: String,

    /// Optional fully-qualified spill URI (`file:///tmp/x` or `memory://`).
    pub spill_uri: Option<String>,
}

impl Default for ExecConfig {
    fn default() -> Self {
        Self {
            mem_cap_bytes: 256 * 1024 * 1024, // 256 MiB default
            key_store: KeyStoreKind::Memory,
            spill_dir: "/tmp/qdistinct-spill".to_string(),
            spill_uri: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub uri: Option<String>,
    pub root: String,
}

impl StorageConfig {
    pub fn scheme(&self) -> Option<&str> {
        self.uri
            .as_deref()
            .and_then(|uri| uri.split("://").next())
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
    }
}

impl ExecConfig {
    /// Create a config from environment variables, falling back to defaults.
    ///
    /// Environment variables:
    /// - `QDISTINCT_MEM_CAP_BYTES`: memory cap in bytes
    /// - `QDISTINCT_KEY_STORE`: `memory` or `storage`
    /// - `QDISTINCT_SPILL_DIR`: spill directory
    /// - `QDISTINCT_SPILL_URI`: spill URI
    ///
    /// Values that fail to parse are ignored.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(s) = std::env::var("QDISTINCT_MEM_CAP_BYTES") {
            if let Ok(v) = s.parse::<usize>() {
                cfg.mem_cap_bytes = v;
            }
        }

        if let Ok(s) = std::env::var("QDISTINCT_KEY_STORE") {
            if let Ok(v) = s.parse::<KeyStoreKind>() {
                cfg.key_store = v;
            }
        }

        if let Ok(s) = std::env::var("QDISTINCT_SPILL_DIR") {
            cfg.spill_dir = s;
        }

        if let Ok(s) = std::env::var("QDISTINCT_SPILL_URI") {
            cfg.spill_uri = Some(s);
        }

        cfg
    }

    /// Produce a storage configuration snapshot used by the IO layer.
    pub fn storage_config(&self) -> StorageConfig {
        let scheme = self
            .spill_uri
            .as_deref()
            .and_then(|uri| uri.split("://").next())
            .map(|s| s.trim())
            .filter(|s| !s.is_empty());

        let root = match (scheme, self.spill_uri.as_ref()) {
            (Some("file"), Some(uri)) => {
                file_uri_to_path(uri).unwrap_or_else(|| self.spill_dir.clone())
            }
            (Some("memory"), _) => "mem".to_string(),
            (Some(_), Some(uri)) => uri.trim_end_matches('/').to_string(),
            _ => self.spill_dir.clone(),
        };

        StorageConfig {
            uri: self.spill_uri.clone(),
            root,
        }
    }
}

fn file_uri_to_path(uri: &str) -> Option<String> {
    let stripped = uri.strip_prefix("file://")?;
    if stripped.starts_with('/') {
        Some(stripped.to_string())
    } else {
        Some(format!("/{}", stripped))
    }
}
