//! # dt-config-bridge: Draw Things configs on node-graph editor nodes
//!
//! Maps Draw Things generation configs (the JSON the app copies to the
//! clipboard) onto the fields of sampler, LoRA, control-net, upscaler and
//! refiner nodes in a node-graph editor, and rebuilds the config from those
//! nodes.
//!
//! ## Design Principles
//!
//! 1. **Trait-first**: `GraphHost` is the contract between the engine and the editor
//! 2. **Table-driven**: every mapped property is one `PropertyDescriptor`
//! 3. **Coercion never fails**: bad values become valid ones and are reported
//! 4. **Recompute is pure**: display flags follow from field values alone
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use dt_config_bridge::{ConfigBridge, MemoryHost, NodeType};
//!
//! # async fn example() -> dt_config_bridge::Result<()> {
//! let host = MemoryHost::new();
//! let sampler = host.add_node(NodeType::Sampler);
//! let bridge = ConfigBridge::new(host);
//!
//! let report = bridge
//!     .import_config(sampler, r#"{"width": 768, "steps": 30}"#)
//!     .await?;
//! assert!(report.missing.is_empty());
//!
//! let config = bridge.export_config(sampler)?;
//! assert_eq!(config["width"], 768);
//! # Ok(())
//! # }
//! ```
//!
//! ## Hosts
//!
//! | Host | Module | Description |
//! |------|--------|-------------|
//! | `MemoryHost` | `host::memory` | In-memory graph for testing/embedding |

// ============================================================================
// Modules
// ============================================================================

pub mod model;
pub mod registry;
pub mod coerce;
pub mod host;
pub mod access;
pub mod visibility;
pub mod chain;
pub mod import;
pub mod export;
pub mod cache;
pub mod config;
pub mod session;

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, warn};

// ============================================================================
// Re-exports: Model (the DTOs)
// ============================================================================

pub use model::{
    BridgeListing, FieldMap, ModelCatalog, ModelKind, ModelOption, ModelVersion,
    Node, NodeId, NodeType, Value,
};

// ============================================================================
// Re-exports: Host
// ============================================================================

pub use host::{GraphHost, MemoryHost, Notification};
pub use access::NodeProxy;

// ============================================================================
// Re-exports: Pipelines
// ============================================================================

pub use cache::{CatalogCache, CatalogKey};
pub use chain::{ChainSpec, Distribution, MissingCapacityReport};
pub use coerce::CorrectionRecord;
pub use config::{BridgeMode, EngineConfig};
pub use import::{Document, ImportReport, NodeCorrections};
pub use registry::{ChainKind, PropertyDescriptor, Registry};

// ============================================================================
// Top-level ConfigBridge handle
// ============================================================================

const DEFAULT_SERVER: &str = "localhost";
const DEFAULT_PORT: u16 = 7859;

/// The primary entry point. A `ConfigBridge` wraps a graph host and runs
/// imports, exports and field recomputes against it.
pub struct ConfigBridge<H: GraphHost> {
    host: H,
    config: RwLock<EngineConfig>,
    catalogs: CatalogCache,
    sessions: session::ImportSessions,
}

impl<H: GraphHost> ConfigBridge<H> {
    /// Create a bridge with default settings.
    pub fn new(host: H) -> Self {
        Self::with_config(host, EngineConfig::default())
    }

    pub fn with_config(host: H, config: EngineConfig) -> Self {
        Self {
            host,
            config: RwLock::new(config.normalized()),
            catalogs: CatalogCache::new(),
            sessions: session::ImportSessions::new(),
        }
    }

    /// Access the underlying host.
    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn config(&self) -> EngineConfig {
        self.config.read().clone()
    }

    pub fn catalog_cache(&self) -> &CatalogCache {
        &self.catalogs
    }

    /// Replace the settings. Changing bridge-mode settings drops cached
    /// bridge listings.
    pub fn update_config(&self, config: EngineConfig) {
        let config = config.normalized();
        let mut current = self.config.write();
        if current.bridge_mode != config.bridge_mode {
            let dropped = self.catalogs.invalidate_bridge();
            debug!(dropped, "bridge mode changed, dropped cached listings");
        }
        *current = config;
    }

    fn open(&self, node: NodeId) -> Result<NodeProxy<'_>> {
        NodeProxy::open(&self.host, node)
    }

    // ========================================================================
    // Model catalogs
    // ========================================================================

    /// The models offered to `node`. With bridge mode on this is the bridge
    /// listing alone and the node's server is never asked; otherwise it is
    /// the server's catalog. Served from the cache unless `refresh` is set.
    ///
    /// An unreachable server or listing gives an empty catalog, which is not
    /// cached.
    pub async fn models_for(&self, node: NodeId, refresh: bool) -> Result<Arc<ModelCatalog>> {
        let bridge = self.config.read().bridge_mode;
        if bridge.enabled {
            self.open(node)?;
            return Ok(self.bridge_catalog(bridge, refresh).await);
        }

        let (server, port, use_tls) = {
            let proxy = self.open(node)?;
            let server = proxy
                .text("server")?
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| DEFAULT_SERVER.to_string());
            let port = proxy
                .number("port")?
                .and_then(|p| u16::try_from(p as i64).ok())
                .unwrap_or(DEFAULT_PORT);
            let use_tls = match proxy.get("use_tls")? {
                Some(v) => v.is_truthy(),
                None => true,
            };
            (server, port, use_tls)
        };
        let key = CatalogKey::server(server.as_str(), port, use_tls);
        if refresh {
            self.catalogs.invalidate(&key);
        }

        if let Some(catalog) = self.catalogs.get(&key) {
            return Ok(catalog);
        }
        Ok(match self.host.fetch_catalog(&server, port, use_tls).await? {
            Some(catalog) => self.catalogs.insert(key, catalog),
            None => {
                warn!(server = %key, "model server unreachable");
                Arc::new(ModelCatalog::default())
            }
        })
    }

    async fn bridge_catalog(&self, bridge: BridgeMode, refresh: bool) -> Arc<ModelCatalog> {
        if refresh {
            self.catalogs.invalidate_bridge();
        }
        let key = CatalogKey::Bridge {
            community: bridge.community,
            uncurated: bridge.uncurated,
        };
        if let Some(catalog) = self.catalogs.get(&key) {
            return catalog;
        }
        match self.host.fetch_bridge_listing().await {
            Ok(listing) => {
                let catalog = listing.assemble(bridge.community, bridge.uncurated);
                self.catalogs.insert(key, catalog)
            }
            Err(e) => {
                warn!(error = %e, "bridge listing unavailable");
                Arc::new(ModelCatalog::default())
            }
        }
    }

    // ========================================================================
    // Import / export
    // ========================================================================

    /// Import config text into a sampler node and its linked nodes.
    ///
    /// Text that is not a config document fails with `DocumentParse` or
    /// `NotADocument` before anything is written, and the host is told once.
    /// Everything else is applied as far as it goes; see [`ImportReport`].
    ///
    /// Imports of the same node run one at a time.
    pub async fn import_config(&self, node: NodeId, text: &str) -> Result<ImportReport> {
        let _session = self.sessions.begin(node).await;

        let doc = match import::parse_document(text) {
            Ok(doc) => doc,
            Err(e) => {
                warn!(node = %node, error = %e, "config document rejected");
                self.host
                    .notify_error(&format!("{}\n\n{e}", import::PARSE_ERROR_MESSAGE));
                return Err(e);
            }
        };
        let primary = NodeProxy::open_as(&self.host, node, NodeType::Sampler)?;

        let catalog = self.models_for(node, false).await?;
        import::import_document(&primary, &doc, &catalog, &self.config())
    }

    /// Export a sampler node and its linked nodes as a config document.
    pub fn export_config(&self, node: NodeId) -> Result<serde_json::Value> {
        let primary = NodeProxy::open_as(&self.host, node, NodeType::Sampler)?;
        let doc = export::export_document(&primary, &self.config())?;
        Ok(serde_json::Value::Object(doc))
    }

    // ========================================================================
    // Node lifecycle hooks
    // ========================================================================

    /// Recompute a node's display flags and derived values.
    pub fn recompute(&self, node: NodeId) -> Result<()> {
        visibility::recompute(&self.open(node)?)
    }

    /// React to a user edit of one field.
    pub fn field_changed(&self, node: NodeId, field: &str) -> Result<()> {
        visibility::field_changed(&self.open(node)?, field)
    }

    /// Run after a node is created or restored: coerce every registered
    /// field, report what changed, recompute.
    pub fn configure_node(&self, node: NodeId) -> Result<Vec<CorrectionRecord>> {
        let proxy = self.open(node)?;
        let corrections = coerce::coerce_node(&proxy)?;
        if !corrections.is_empty() && self.config.read().notify_corrections {
            self.host
                .notify_info(&coerce::correction_message(proxy.node_type(), &corrections));
        }
        visibility::recompute(&proxy)?;
        Ok(corrections)
    }

    /// Set a LoRA node's active slot count. Returns the count after clamping.
    pub fn set_lora_count(&self, node: NodeId, count: i64) -> Result<usize> {
        let proxy = NodeProxy::open_as(&self.host, node, NodeType::Lora)?;
        visibility::LoraFields::set_count(&proxy, count)
    }
}

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Config document is not valid JSON: {0}")]
    DocumentParse(String),

    #[error("Config document is not a JSON object")]
    NotADocument,

    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("Node {node} has no field {field}")]
    UnknownField { node: NodeId, field: String },

    #[error("Node {node}: expected {expected}, got {got}")]
    WrongNodeType { node: NodeId, expected: String, got: String },

    #[error("Unknown node type: {0}")]
    UnknownNodeType(String),

    #[error("Host error: {0}")]
    Host(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
