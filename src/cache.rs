//! # Model Catalog Cache
//!
//! Fetched catalogs, keyed by where they came from. One cache lives in each
//! [`ConfigBridge`](crate::ConfigBridge); nothing is process-global.
//!
//! | Key | Source | Invalidated by |
//! |-----|--------|----------------|
//! | `Server` | `GraphHost::fetch_catalog` | explicit refresh, `clear` |
//! | `Bridge` | `GraphHost::fetch_bridge_listing` | bridge-mode setting changes |

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use hashbrown::HashMap;
use parking_lot::RwLock;

use crate::model::ModelCatalog;

/// Identity of a cached catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CatalogKey {
    Server { server: String, port: u16, use_tls: bool },
    Bridge { community: bool, uncurated: bool },
}

impl CatalogKey {
    pub fn server(server: impl Into<String>, port: u16, use_tls: bool) -> Self {
        CatalogKey::Server { server: server.into(), port, use_tls }
    }

    pub fn is_bridge(&self) -> bool {
        matches!(self, CatalogKey::Bridge { .. })
    }
}

/// `server:port[:tls]` for servers, `bridge[:community][:uncurated]` for the
/// bridge listing.
impl fmt::Display for CatalogKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogKey::Server { server, port, use_tls } => {
                write!(f, "{server}:{port}")?;
                if *use_tls {
                    f.write_str(":tls")?;
                }
                Ok(())
            }
            CatalogKey::Bridge { community, uncurated } => {
                f.write_str("bridge")?;
                if *community {
                    f.write_str(":community")?;
                }
                if *uncurated {
                    f.write_str(":uncurated")?;
                }
                Ok(())
            }
        }
    }
}

/// One cached catalog.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub catalog: Arc<ModelCatalog>,
    pub fetched_at: DateTime<Utc>,
}

/// Catalogs by key, safe to share between tasks.
#[derive(Debug, Default)]
pub struct CatalogCache {
    entries: RwLock<HashMap<CatalogKey, CacheEntry>>,
}

impl CatalogCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &CatalogKey) -> Option<Arc<ModelCatalog>> {
        self.entries.read().get(key).map(|e| Arc::clone(&e.catalog))
    }

    pub fn entry(&self, key: &CatalogKey) -> Option<CacheEntry> {
        self.entries.read().get(key).cloned()
    }

    /// Store a catalog, replacing any previous one under the same key.
    pub fn insert(&self, key: CatalogKey, catalog: ModelCatalog) -> Arc<ModelCatalog> {
        let catalog = Arc::new(catalog);
        let entry = CacheEntry {
            catalog: Arc::clone(&catalog),
            fetched_at: Utc::now(),
        };
        self.entries.write().insert(key, entry);
        catalog
    }

    /// Drop one entry. Returns whether it was present.
    pub fn invalidate(&self, key: &CatalogKey) -> bool {
        self.entries.write().remove(key).is_some()
    }

    /// Drop every bridge-listing entry. Returns how many were dropped.
    pub fn invalidate_bridge(&self) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|key, _| !key.is_bridge());
        before - entries.len()
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
