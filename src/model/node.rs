//! Editor node identity and node kinds.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use super::{FieldMap, Value};

/// Opaque node identifier assigned by the host graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The Draw Things node kinds the engine knows about.
///
/// Nodes of any other kind may exist in the host graph; the host reports
/// them as `None` and the engine never touches them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NodeType {
    #[serde(rename = "DrawThingsSampler")]
    Sampler,
    #[serde(rename = "DrawThingsControlNet")]
    ControlNet,
    #[serde(rename = "DrawThingsLoRA")]
    Lora,
    #[serde(rename = "DrawThingsUpscaler")]
    Upscaler,
    #[serde(rename = "DrawThingsRefiner")]
    Refiner,
    #[serde(rename = "DrawThingsPrompt")]
    Prompt,
}

impl NodeType {
    pub const ALL: [NodeType; 6] = [
        NodeType::Sampler,
        NodeType::ControlNet,
        NodeType::Lora,
        NodeType::Upscaler,
        NodeType::Refiner,
        NodeType::Prompt,
    ];

    /// The node's class name in the host graph.
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::Sampler => "DrawThingsSampler",
            NodeType::ControlNet => "DrawThingsControlNet",
            NodeType::Lora => "DrawThingsLoRA",
            NodeType::Upscaler => "DrawThingsUpscaler",
            NodeType::Refiner => "DrawThingsRefiner",
            NodeType::Prompt => "DrawThingsPrompt",
        }
    }

    /// Human-facing title used in notifications.
    pub fn display_name(&self) -> &'static str {
        match self {
            NodeType::Sampler => "Draw Things Sampler",
            NodeType::ControlNet => "Draw Things Control Net",
            NodeType::Lora => "Draw Things LoRA",
            NodeType::Upscaler => "Draw Things Upscaler",
            NodeType::Refiner => "Draw Things Refiner",
            NodeType::Prompt => "Draw Things Prompt",
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeType {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        NodeType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| crate::Error::UnknownNodeType(s.to_string()))
    }
}

/// A detached snapshot of one editor node: its kind, field values, and
/// which fields are hidden or disabled.
///
/// The in-memory host stores these; real hosts keep their own widgets and
/// only hand values across the `GraphHost` boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub node_type: NodeType,
    pub fields: FieldMap,
    /// Fields currently hidden from display.
    pub hidden: Vec<String>,
    /// Fields shown but greyed out.
    pub disabled: Vec<String>,
}

impl Node {
    pub fn new(id: NodeId, node_type: NodeType) -> Self {
        Self {
            id,
            node_type,
            fields: FieldMap::new(),
            hidden: Vec::new(),
            disabled: Vec::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn is_visible(&self, name: &str) -> bool {
        !self.hidden.iter().any(|h| h == name)
    }

    pub fn is_disabled(&self, name: &str) -> bool {
        self.disabled.iter().any(|d| d == name)
    }
}
