//! # Visibility / Dependency Engine
//!
//! Decides which fields of a node are meaningful given its selected model
//! variant and current toggles, and keeps derived values in step.
//!
//! Each node kind with dynamic fields has a handler implementing
//! [`HasDynamicFields`]; [`recompute`] dispatches to it. Handlers are pure
//! functions of the node's current field values: running one twice in a row
//! changes nothing the second time.

mod control_net;
mod lora;
mod sampler;

pub use control_net::ControlNetFields;
pub use lora::LoraFields;
pub use sampler::SamplerFields;

use tracing::trace;

use crate::Result;
use crate::access::NodeProxy;
use crate::model::NodeType;

/// A node kind whose field set changes with its values.
pub trait HasDynamicFields: Send + Sync {
    fn node_type(&self) -> NodeType;

    /// Recompute display flags and derived values from current field values.
    fn update_dynamic_fields(&self, node: &NodeProxy<'_>) -> Result<()>;

    /// React to a user edit of `field`, then recompute.
    ///
    /// Default: just recompute.
    fn field_changed(&self, node: &NodeProxy<'_>, field: &str) -> Result<()> {
        let _ = field;
        self.update_dynamic_fields(node)
    }
}

static SAMPLER: SamplerFields = SamplerFields;
static CONTROL_NET: ControlNetFields = ControlNetFields;
static LORA: LoraFields = LoraFields;

/// The handler for a node kind, if it has dynamic fields.
pub fn handler_for(node_type: NodeType) -> Option<&'static dyn HasDynamicFields> {
    match node_type {
        NodeType::Sampler => Some(&SAMPLER),
        NodeType::ControlNet => Some(&CONTROL_NET),
        NodeType::Lora => Some(&LORA),
        NodeType::Upscaler | NodeType::Refiner | NodeType::Prompt => None,
    }
}

/// Recompute a node's dynamic fields. Nodes without a handler are left alone.
pub fn recompute(node: &NodeProxy<'_>) -> Result<()> {
    match handler_for(node.node_type()) {
        Some(handler) => {
            trace!(node = %node.id(), kind = %node.node_type(), "recomputing dynamic fields");
            handler.update_dynamic_fields(node)
        }
        None => Ok(()),
    }
}

/// Recompute after a user edit of `field`.
pub fn field_changed(node: &NodeProxy<'_>, field: &str) -> Result<()> {
    match handler_for(node.node_type()) {
        Some(handler) => handler.field_changed(node, field),
        None => Ok(()),
    }
}

/// Resolution-dependent shift for an image of `height` × `width` pixels,
/// rounded to two decimals.
pub fn calc_shift(height: f64, width: f64) -> f64 {
    let tokens = height * width / 256.0;
    let slope = (1.15 - 0.5) / (4096.0 - 256.0);
    let shift = ((tokens - 256.0) * slope + 0.5).exp();
    (shift * 100.0).round() / 100.0
}
