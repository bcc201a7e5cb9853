//! JSON-file backend for exported site-configuration data.
//!
//! The extension's storage exports as `{"sites": {hostname: entry}}`,
//! where an entry is either the legacy boolean or the object form.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use cl_core::config::{ConfigBackend, StoreError, StoredEntry};

#[derive(Debug, Default, Serialize, Deserialize)]
struct SitesFile {
    #[serde(default)]
    sites: HashMap<String, StoredEntry>,
}

/// Backend over an exported configuration file. Reads from `read_path`,
/// writes to `write_path` (the same path for in-place migration).
pub struct JsonFileBackend {
    read_path: PathBuf,
    write_path: PathBuf,
}

impl JsonFileBackend {
    pub fn new(read_path: &Path, write_path: &Path) -> Self {
        Self {
            read_path: read_path.to_path_buf(),
            write_path: write_path.to_path_buf(),
        }
    }

    pub fn in_place(path: &Path) -> Self {
        Self::new(path, path)
    }
}

impl ConfigBackend for JsonFileBackend {
    fn load_sites(&self) -> Result<HashMap<String, StoredEntry>, StoreError> {
        let raw = fs::read_to_string(&self.read_path)
            .map_err(|e| StoreError::Unavailable(format!("{}: {e}", self.read_path.display())))?;
        let file: SitesFile = serde_json::from_str(&raw)?;
        Ok(file.sites)
    }

    fn store_sites(&mut self, sites: &HashMap<String, StoredEntry>) -> Result<(), StoreError> {
        let file = SitesFile {
            sites: sites.clone(),
        };
        let raw = serde_json::to_string_pretty(&file)?;
        fs::write(&self.write_path, raw)
            .map_err(|e| StoreError::WriteFailed(format!("{}: {e}", self.write_path.display())))
    }
}
