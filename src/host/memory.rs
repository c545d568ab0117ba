//! In-memory graph host.
//!
//! This is the reference implementation of `GraphHost`. It keeps node
//! snapshots in HashMaps protected by RwLock, records every notification,
//! and serves model catalogs registered up front.
//!
//! ## Limitations
//!
//! - **No rendering**: visibility and disabled flags are stored, nothing more.
//! - **Static catalogs**: `fetch_catalog()` answers from catalogs registered
//!   with `register_catalog()`; unregistered servers are unreachable.
//!
//! Use this host for:
//! - Testing the import, export and visibility pipelines
//! - Headless tools that convert configs without an editor

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::cache::CatalogKey;
use crate::model::*;
use crate::registry::lists::{NONE_SELECTED, SETTINGS_MODES};
use crate::registry::{ChainKind, Registry, ValueKind};
use crate::{Error, Result};
use super::GraphHost;

/// A message pushed to the host's notification sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    Info(String),
    Warning(String),
    Error(String),
}

impl Notification {
    pub fn message(&self) -> &str {
        match self {
            Notification::Info(m) | Notification::Warning(m) | Notification::Error(m) => m,
        }
    }
}

// ============================================================================
// MemoryHost
// ============================================================================

/// In-memory node graph.
#[derive(Clone)]
pub struct MemoryHost {
    inner: Arc<MemoryInner>,
}

struct MemoryInner {
    nodes: RwLock<HashMap<NodeId, Node>>,
    /// Nodes of kinds the engine does not know; they have no fields.
    foreign: RwLock<HashSet<NodeId>>,
    /// (node, relation) → linked nodes, in link order
    links: RwLock<HashMap<(NodeId, String), Vec<NodeId>>>,
    catalogs: RwLock<HashMap<CatalogKey, ModelCatalog>>,
    bridge_listing: RwLock<Option<BridgeListing>>,
    notifications: RwLock<Vec<Notification>>,
    next_node_id: AtomicU64,
    fetches: AtomicUsize,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MemoryInner {
                nodes: RwLock::new(HashMap::new()),
                foreign: RwLock::new(HashSet::new()),
                links: RwLock::new(HashMap::new()),
                catalogs: RwLock::new(HashMap::new()),
                bridge_listing: RwLock::new(None),
                notifications: RwLock::new(Vec::new()),
                next_node_id: AtomicU64::new(1),
                fetches: AtomicUsize::new(0),
            }),
        }
    }

    fn next_id(&self) -> NodeId {
        NodeId(self.inner.next_node_id.fetch_add(1, Ordering::Relaxed))
    }

    // ========================================================================
    // Graph building
    // ========================================================================

    /// Add a node of `node_type` with every field at its initial value.
    pub fn add_node(&self, node_type: NodeType) -> NodeId {
        let id = self.next_id();
        let mut node = Node::new(id, node_type);
        node.fields = initial_fields(node_type);
        self.inner.nodes.write().insert(id, node);
        id
    }

    /// Add a node of a kind the engine does not handle.
    pub fn add_foreign_node(&self) -> NodeId {
        let id = self.next_id();
        self.inner.foreign.write().insert(id);
        id
    }

    /// Link `to` onto `from` along `relation`, after any existing links.
    pub fn link(&self, from: NodeId, relation: &str, to: NodeId) {
        self.inner
            .links
            .write()
            .entry((from, relation.to_string()))
            .or_default()
            .push(to);
    }

    /// Remove every link of `from` along `relation`.
    pub fn unlink(&self, from: NodeId, relation: &str) {
        self.inner.links.write().remove(&(from, relation.to_string()));
    }

    /// Snapshot of a node.
    pub fn node(&self, id: NodeId) -> Option<Node> {
        self.inner.nodes.read().get(&id).cloned()
    }

    /// Shorthand for reading one field in tests and tools.
    pub fn value(&self, id: NodeId, field: &str) -> Option<Value> {
        self.inner.nodes.read().get(&id).and_then(|n| n.get(field).cloned())
    }

    // ========================================================================
    // Catalogs
    // ========================================================================

    /// Make `catalog` the answer for one server.
    pub fn register_catalog(&self, server: &str, port: u16, use_tls: bool, catalog: ModelCatalog) {
        self.inner
            .catalogs
            .write()
            .insert(CatalogKey::server(server, port, use_tls), catalog);
    }

    pub fn register_bridge_listing(&self, listing: BridgeListing) {
        *self.inner.bridge_listing.write() = Some(listing);
    }

    /// How many catalog or bridge fetches have been served.
    pub fn fetch_count(&self) -> usize {
        self.inner.fetches.load(Ordering::Relaxed)
    }

    // ========================================================================
    // Notifications
    // ========================================================================

    pub fn notifications(&self) -> Vec<Notification> {
        self.inner.notifications.read().clone()
    }

    pub fn take_notifications(&self) -> Vec<Notification> {
        std::mem::take(&mut *self.inner.notifications.write())
    }

    fn push(&self, notification: Notification) {
        self.inner.notifications.write().push(notification);
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn with_node<T>(&self, id: NodeId, f: impl FnOnce(&Node) -> T) -> Result<T> {
        self.inner.nodes.read().get(&id).map(f).ok_or(Error::NodeNotFound(id))
    }

    fn with_field_mut<T>(
        &self,
        id: NodeId,
        field: &str,
        f: impl FnOnce(&mut Node) -> T,
    ) -> Result<T> {
        let mut nodes = self.inner.nodes.write();
        let node = nodes.get_mut(&id).ok_or(Error::NodeNotFound(id))?;
        if !node.fields.contains_key(field) {
            return Err(Error::UnknownField { node: id, field: field.to_string() });
        }
        Ok(f(node))
    }

    fn is_foreign(&self, id: NodeId) -> bool {
        self.inner.foreign.read().contains(&id)
    }
}

impl Default for MemoryHost {
    fn default() -> Self {
        Self::new()
    }
}

/// Fields a freshly created node of `node_type` carries.
fn initial_fields(node_type: NodeType) -> FieldMap {
    let mut fields = FieldMap::new();
    for descriptor in Registry::global().find_by_owner_type(node_type) {
        let Some(name) = descriptor.field_name else { continue };
        let value = match descriptor.kind {
            ValueKind::ModelReference { .. } => Value::from(NONE_SELECTED),
            ref kind => kind.default_value(),
        };
        fields.insert(name.to_string(), value);
    }

    match node_type {
        NodeType::Sampler => {
            fields.insert("settings".into(), Value::from(SETTINGS_MODES[0]));
            fields.insert("server".into(), Value::from("localhost"));
            fields.insert("port".into(), Value::Int(7859));
            fields.insert("use_tls".into(), Value::Bool(true));
        }
        NodeType::Lora | NodeType::ControlNet => {
            let chain = match node_type {
                NodeType::Lora => ChainKind::Lora,
                _ => ChainKind::ControlNet,
            };
            for slot in 0..chain.capacity() {
                for sub in chain.slot_fields() {
                    let value = match sub.kind {
                        ValueKind::ModelReference { .. } if slot == 0 => Value::from(NONE_SELECTED),
                        ValueKind::ModelReference { .. } => Value::Null,
                        ref kind => kind.default_value(),
                    };
                    fields.insert(sub.field_name(slot), value);
                }
            }
            if node_type == NodeType::Lora {
                fields.insert("lora_count".into(), Value::Int(1));
                fields.insert("show_mode".into(), Value::Bool(false));
            }
        }
        NodeType::Prompt => {
            fields.insert("prompt".into(), Value::from(""));
        }
        NodeType::Upscaler | NodeType::Refiner => {}
    }
    fields
}

// ============================================================================
// GraphHost impl
// ============================================================================

#[async_trait]
impl GraphHost for MemoryHost {
    fn node_type(&self, node: NodeId) -> Result<Option<NodeType>> {
        if self.is_foreign(node) {
            return Ok(None);
        }
        self.with_node(node, |n| Some(n.node_type))
    }

    fn linked_nodes(&self, node: NodeId, relation: &str) -> Result<Vec<NodeId>> {
        if !self.is_foreign(node) {
            self.with_node(node, |_| ())?;
        }
        Ok(self
            .inner
            .links
            .read()
            .get(&(node, relation.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    fn field_names(&self, node: NodeId) -> Result<Vec<String>> {
        if self.is_foreign(node) {
            return Ok(Vec::new());
        }
        self.with_node(node, |n| {
            let mut names: Vec<String> = n.fields.keys().cloned().collect();
            names.sort();
            names
        })
    }

    fn field_value(&self, node: NodeId, field: &str) -> Result<Option<Value>> {
        if self.is_foreign(node) {
            return Ok(None);
        }
        self.with_node(node, |n| n.get(field).cloned())
    }

    fn set_field_value(&self, node: NodeId, field: &str, value: Value) -> Result<()> {
        self.with_field_mut(node, field, |n| {
            n.fields.insert(field.to_string(), value);
        })
    }

    fn field_visible(&self, node: NodeId, field: &str) -> Result<bool> {
        self.with_field_mut(node, field, |n| n.is_visible(field))
    }

    fn set_field_visible(&self, node: NodeId, field: &str, visible: bool) -> Result<()> {
        self.with_field_mut(node, field, |n| {
            n.hidden.retain(|h| h != field);
            if !visible {
                n.hidden.push(field.to_string());
            }
        })
    }

    fn set_field_disabled(&self, node: NodeId, field: &str, disabled: bool) -> Result<()> {
        self.with_field_mut(node, field, |n| {
            n.disabled.retain(|d| d != field);
            if disabled {
                n.disabled.push(field.to_string());
            }
        })
    }

    async fn fetch_catalog(
        &self,
        server: &str,
        port: u16,
        use_tls: bool,
    ) -> Result<Option<ModelCatalog>> {
        self.inner.fetches.fetch_add(1, Ordering::Relaxed);
        let key = CatalogKey::server(server, port, use_tls);
        Ok(self.inner.catalogs.read().get(&key).cloned())
    }

    async fn fetch_bridge_listing(&self) -> Result<BridgeListing> {
        self.inner.fetches.fetch_add(1, Ordering::Relaxed);
        self.inner
            .bridge_listing
            .read()
            .clone()
            .ok_or_else(|| Error::Host("no bridge listing registered".into()))
    }

    fn notify_info(&self, message: &str) {
        self.push(Notification::Info(message.to_string()));
    }

    fn notify_warning(&self, message: &str) {
        self.push(Notification::Warning(message.to_string()));
    }

    fn notify_error(&self, message: &str) {
        self.push(Notification::Error(message.to_string()));
    }
}

// ============================================================================
// Tests
// ============================================================================
