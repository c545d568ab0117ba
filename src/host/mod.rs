//! # Graph Host Trait
//!
//! This is THE contract between the engine and the node-graph editor that
//! embeds it. The engine never renders, links or persists nodes itself; it
//! reads and writes field values and display flags through this trait and
//! reports to the user through its notification sink.
//!
//! ## Implementations
//!
//! | Host | Module | Description |
//! |------|--------|-------------|
//! | `MemoryHost` | `memory` | In-memory graph for testing/embedding |

pub mod memory;

use async_trait::async_trait;

use crate::model::*;
use crate::{Error, Result};

pub use memory::{MemoryHost, Notification};

// ============================================================================
// Link relations
// ============================================================================

/// Named connections followed when discovering secondary nodes.
pub mod relation {
    /// Sampler → first LoRA node.
    pub const LORA: &str = "lora";
    /// LoRA node → next LoRA node.
    pub const LORA_STACK: &str = "lora_stack";
    /// Sampler → first control-net node, and each control-net → the next.
    pub const CONTROL_NET: &str = "control_net";
    pub const UPSCALER: &str = "upscaler";
    pub const REFINER: &str = "refiner";
}

// ============================================================================
// GraphHost Trait
// ============================================================================

/// The host-graph contract.
///
/// Field access is synchronous: the host runs the engine on its own UI
/// thread and answers from live widget state. Only network-backed catalog
/// fetches suspend.
///
/// Operations on a node id the host does not know return
/// `Error::NodeNotFound`; operations on a field the node does not have
/// return `Error::UnknownField`.
#[async_trait]
pub trait GraphHost: Send + Sync + 'static {
    // ========================================================================
    // Nodes and links
    // ========================================================================

    /// The node's kind, or `None` for nodes that are not Draw Things nodes.
    fn node_type(&self, node: NodeId) -> Result<Option<NodeType>>;

    /// Nodes linked to `node` along `relation`, in link order.
    fn linked_nodes(&self, node: NodeId, relation: &str) -> Result<Vec<NodeId>>;

    // ========================================================================
    // Fields
    // ========================================================================

    /// Names of all fields on the node.
    fn field_names(&self, node: NodeId) -> Result<Vec<String>>;

    /// Current value of a field; `None` when the node has no such field.
    fn field_value(&self, node: NodeId, field: &str) -> Result<Option<Value>>;

    fn set_field_value(&self, node: NodeId, field: &str, value: Value) -> Result<()>;

    fn field_visible(&self, node: NodeId, field: &str) -> Result<bool>;

    fn set_field_visible(&self, node: NodeId, field: &str, visible: bool) -> Result<()>;

    /// Grey a field out without hiding it.
    fn set_field_disabled(&self, node: NodeId, field: &str, disabled: bool) -> Result<()>;

    /// The model variant of the node's selected model.
    ///
    /// Default: the version of the catalog entry held by the `model` field.
    fn selected_model_variant(&self, node: NodeId) -> Result<Option<ModelVersion>> {
        Ok(self
            .field_value(node, "model")?
            .and_then(|v| v.as_model().and_then(|m| m.version.clone())))
    }

    // ========================================================================
    // Model catalogs
    // ========================================================================

    /// Fetch the model catalog of one server. `Ok(None)` means the server
    /// could not be reached.
    async fn fetch_catalog(
        &self,
        server: &str,
        port: u16,
        use_tls: bool,
    ) -> Result<Option<ModelCatalog>>;

    /// Fetch the bridge-mode listing.
    ///
    /// Default returns an error; hosts with bridge support override it.
    async fn fetch_bridge_listing(&self) -> Result<BridgeListing> {
        Err(Error::Host("bridge mode not supported".into()))
    }

    // ========================================================================
    // Notifications
    // ========================================================================

    fn notify_info(&self, message: &str);

    fn notify_warning(&self, message: &str);

    fn notify_error(&self, message: &str);
}
