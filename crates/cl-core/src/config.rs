//! Site Configuration Store
//!
//! Maps hostnames to per-site {enabled, features} configuration. The
//! persisted shape is backward compatible with the legacy boolean-only
//! format: every read normalizes on the fly, and a one-time bulk
//! migration is available for callers that want the persisted data
//! upgraded in place.
//!
//! Storage access goes through [`ConfigBackend`] so the same store logic
//! runs against extension storage (via the wasm glue), a JSON file (the
//! CLI), or an in-memory map (tests).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::types::FeatureSet;

/// Error type for storage access.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    #[error("storage write failed: {0}")]
    WriteFailed(String),
    #[error("malformed configuration: {0}")]
    Format(#[from] serde_json::Error),
}

// =============================================================================
// Persisted Shapes
// =============================================================================

/// One site entry as persisted. Legacy installs stored a bare boolean;
/// anything unrecognized normalizes to disabled with default features.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoredEntry {
    Legacy(bool),
    Config(StoredConfig),
    Other(serde_json::Value),
}

/// Object-form entry. `enabled` defaults to true when absent (only an
/// explicit `false` disables); missing feature keys default to true.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredConfig {
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub features: Option<FeatureSet>,
}

/// Normalized per-site configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteConfig {
    pub enabled: bool,
    pub features: FeatureSet,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            features: FeatureSet::default(),
        }
    }
}

/// Normalize a stored entry to the object form.
pub fn normalize(entry: &StoredEntry) -> SiteConfig {
    match entry {
        StoredEntry::Legacy(enabled) => SiteConfig {
            enabled: *enabled,
            features: FeatureSet::default(),
        },
        StoredEntry::Config(config) => SiteConfig {
            enabled: config.enabled != Some(false),
            features: config.features.unwrap_or_default(),
        },
        StoredEntry::Other(_) => SiteConfig::default(),
    }
}

impl From<SiteConfig> for StoredEntry {
    fn from(config: SiteConfig) -> Self {
        StoredEntry::Config(StoredConfig {
            enabled: Some(config.enabled),
            features: Some(config.features),
        })
    }
}

// =============================================================================
// Backend
// =============================================================================

/// Storage backend: loads and stores the whole hostname → entry mapping,
/// mirroring the single `sites` key the extension persists under.
pub trait ConfigBackend {
    fn load_sites(&self) -> Result<HashMap<String, StoredEntry>, StoreError>;
    fn store_sites(&mut self, sites: &HashMap<String, StoredEntry>) -> Result<(), StoreError>;
}

/// In-memory backend.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    sites: HashMap<String, StoredEntry>,
}

impl ConfigBackend for MemoryBackend {
    fn load_sites(&self) -> Result<HashMap<String, StoredEntry>, StoreError> {
        Ok(self.sites.clone())
    }

    fn store_sites(&mut self, sites: &HashMap<String, StoredEntry>) -> Result<(), StoreError> {
        self.sites = sites.clone();
        Ok(())
    }
}

// =============================================================================
// Store
// =============================================================================

/// Site configuration store over a backend.
pub struct SiteStore<B: ConfigBackend> {
    backend: B,
}

impl<B: ConfigBackend> SiteStore<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Raw entries, treating an unavailable backend as an empty mapping.
    /// Reads must never take the page down; only writes surface errors.
    fn load_or_empty(&self) -> HashMap<String, StoredEntry> {
        match self.backend.load_sites() {
            Ok(sites) => sites,
            Err(e) => {
                log::warn!("site config read failed, treating as empty: {e}");
                HashMap::new()
            }
        }
    }

    /// All sites, normalized.
    pub fn all_sites(&self) -> HashMap<String, SiteConfig> {
        self.load_or_empty()
            .iter()
            .map(|(hostname, entry)| (hostname.clone(), normalize(entry)))
            .collect()
    }

    /// Normalized configuration for one site; absent entries yield
    /// disabled with default features.
    pub fn get_site_config(&self, hostname: &str) -> SiteConfig {
        self.load_or_empty()
            .get(hostname)
            .map(normalize)
            .unwrap_or_default()
    }

    pub fn is_enabled(&self, hostname: &str) -> bool {
        self.get_site_config(hostname).enabled
    }

    /// Set enabled-state for a site.
    ///
    /// Disabling keeps the most specific feature set available (explicit
    /// argument, else the stored one, else defaults) so re-enabling
    /// restores prior choices. Enabling without features means all-on.
    pub fn set_site_config(
        &mut self,
        hostname: &str,
        enabled: bool,
        features: Option<FeatureSet>,
    ) -> Result<(), StoreError> {
        let mut sites = self.load_or_empty();

        let features = if enabled {
            features.unwrap_or_default()
        } else {
            features
                .or_else(|| sites.get(hostname).map(|e| normalize(e).features))
                .unwrap_or_default()
        };

        sites.insert(
            hostname.to_string(),
            StoredEntry::from(SiteConfig { enabled, features }),
        );
        self.backend.store_sites(&sites)
    }

    /// Feature-only update; the enabled flag is preserved as-is.
    pub fn update_site_features(
        &mut self,
        hostname: &str,
        features: FeatureSet,
    ) -> Result<(), StoreError> {
        let enabled = self.get_site_config(hostname).enabled;
        self.set_site_config(hostname, enabled, Some(features))
    }

    /// One-time bulk upgrade of legacy boolean entries to the object
    /// form. Writes only when something actually changed; returns the
    /// number of migrated entries.
    pub fn migrate(&mut self) -> Result<usize, StoreError> {
        let mut sites = self.backend.load_sites()?;
        let mut migrated = 0usize;

        for entry in sites.values_mut() {
            if matches!(entry, StoredEntry::Legacy(_)) {
                *entry = StoredEntry::from(normalize(entry));
                migrated += 1;
            }
        }

        if migrated > 0 {
            self.backend.store_sites(&sites)?;
        }
        Ok(migrated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingBackend;

    impl ConfigBackend for FailingBackend {
        fn load_sites(&self) -> Result<HashMap<String, StoredEntry>, StoreError> {
            Err(StoreError::Unavailable("no storage in this context".into()))
        }

        fn store_sites(&mut self, _: &HashMap<String, StoredEntry>) -> Result<(), StoreError> {
            Err(StoreError::WriteFailed("no storage in this context".into()))
        }
    }

    #[test]
    fn test_normalize_legacy_booleans() {
        let on = normalize(&StoredEntry::Legacy(true));
        assert!(on.enabled);
        assert_eq!(on.features, FeatureSet::default());

        let off = normalize(&StoredEntry::Legacy(false));
        assert!(!off.enabled);
        assert_eq!(off.features, FeatureSet::default());
    }

    #[test]
    fn test_normalize_partial_object() {
        let entry: StoredEntry =
            serde_json::from_str(r#"{"enabled":true,"features":{"cursor":false}}"#).unwrap();
        let config = normalize(&entry);
        assert!(config.enabled);
        assert!(config.features.text_selection);
        assert!(config.features.context_menu);
        assert!(config.features.copy_paste);
        assert!(!config.features.cursor);
    }

    #[test]
    fn test_normalize_enabled_defaults_true_when_absent() {
        let entry: StoredEntry = serde_json::from_str(r#"{"features":{}}"#).unwrap();
        assert!(normalize(&entry).enabled);
    }

    #[test]
    fn test_normalize_invalid_shape_is_disabled() {
        let entry: StoredEntry = serde_json::from_str(r#"[1,2,3]"#).unwrap();
        let config = normalize(&entry);
        assert!(!config.enabled);
        assert_eq!(config.features, FeatureSet::default());
    }

    #[test]
    fn test_absent_site_is_disabled_with_defaults() {
        let store = SiteStore::new(MemoryBackend::default());
        let config = store.get_site_config("example.com");
        assert!(!config.enabled);
        assert_eq!(config.features, FeatureSet::default());
    }

    #[test]
    fn test_disable_preserves_features() {
        let mut store = SiteStore::new(MemoryBackend::default());
        let custom = FeatureSet {
            cursor: false,
            ..FeatureSet::default()
        };

        store.set_site_config("example.com", true, Some(custom)).unwrap();
        store.set_site_config("example.com", false, None).unwrap();

        let config = store.get_site_config("example.com");
        assert!(!config.enabled);
        assert!(!config.features.cursor);
        assert!(config.features.text_selection);
    }

    #[test]
    fn test_explicit_features_win_over_stored_on_disable() {
        let mut store = SiteStore::new(MemoryBackend::default());
        store.set_site_config("example.com", true, None).unwrap();

        let explicit = FeatureSet {
            copy_paste: false,
            ..FeatureSet::default()
        };
        store.set_site_config("example.com", false, Some(explicit)).unwrap();

        assert!(!store.get_site_config("example.com").features.copy_paste);
    }

    #[test]
    fn test_enable_without_features_is_all_on() {
        let mut store = SiteStore::new(MemoryBackend::default());
        store.set_site_config("example.com", true, None).unwrap();

        let config = store.get_site_config("example.com");
        assert!(config.enabled);
        assert_eq!(config.features, FeatureSet::default());
    }

    #[test]
    fn test_update_features_keeps_enabled_flag() {
        let mut store = SiteStore::new(MemoryBackend::default());
        store.set_site_config("example.com", false, None).unwrap();

        let features = FeatureSet {
            context_menu: false,
            ..FeatureSet::default()
        };
        store.update_site_features("example.com", features).unwrap();

        let config = store.get_site_config("example.com");
        assert!(!config.enabled);
        assert!(!config.features.context_menu);
    }

    #[test]
    fn test_migrate_upgrades_only_legacy_entries() {
        let mut backend = MemoryBackend::default();
        let mut sites = HashMap::new();
        sites.insert("a.com".to_string(), StoredEntry::Legacy(true));
        sites.insert("b.com".to_string(), StoredEntry::Legacy(false));
        sites.insert(
            "c.com".to_string(),
            StoredEntry::from(SiteConfig {
                enabled: true,
                features: FeatureSet::default(),
            }),
        );
        backend.store_sites(&sites).unwrap();

        let mut store = SiteStore::new(backend);
        assert_eq!(store.migrate().unwrap(), 2);

        let all = store.all_sites();
        assert!(all["a.com"].enabled);
        assert!(!all["b.com"].enabled);
        assert!(all["c.com"].enabled);

        // Second pass is a no-op.
        assert_eq!(store.migrate().unwrap(), 0);
    }

    #[test]
    fn test_unavailable_backend_reads_empty_writes_error() {
        let mut store = SiteStore::new(FailingBackend);
        let config = store.get_site_config("example.com");
        assert!(!config.enabled);

        assert!(store.set_site_config("example.com", true, None).is_err());
    }

    #[test]
    fn test_stored_roundtrip_is_object_form() {
        let mut store = SiteStore::new(MemoryBackend::default());
        store.set_site_config("example.com", true, None).unwrap();

        let raw = store.backend().load_sites().unwrap();
        assert!(matches!(raw["example.com"], StoredEntry::Config(_)));
    }
}
