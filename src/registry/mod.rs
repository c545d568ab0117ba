//! # Property Registry
//!
//! Static catalog mapping external config keys to editor fields.
//!
//! Each [`PropertyDescriptor`] names one external key, the field (and node
//! kind) it lands in, and a [`ValueKind`] carrying exactly the constraints
//! that kind needs. Per-property import/export quirks are named by
//! [`Importer`] / [`Exporter`] tags and applied by the pipelines.
//!
//! The table is built once on first use and never mutated.

pub mod lists;
mod table;

use std::collections::HashMap;
use std::sync::LazyLock;

use crate::model::{ModelKind, ModelVersion, NodeType};

// ============================================================================
// Descriptor types
// ============================================================================

/// Upper bound of a numeric property.
#[derive(Debug, Clone, PartialEq)]
pub enum MaxBound {
    Unbounded,
    Fixed(f64),
    /// Bound depends on the selected model variant (by variant id).
    PerVariant {
        table: &'static [(&'static str, f64)],
        fallback: f64,
    },
    /// Bound is the current value of another field on the same node.
    Field(&'static str),
}

/// Constraints of one property, by value kind.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueKind {
    Int {
        default: i64,
        min: Option<f64>,
        max: MaxBound,
        step: f64,
    },
    Float {
        default: f64,
        min: Option<f64>,
        max: MaxBound,
        step: f64,
    },
    Bool {
        default: bool,
    },
    Text {
        default: &'static str,
    },
    EnumIndex {
        values: &'static [&'static str],
        default_index: usize,
    },
    ModelReference {
        kind: ModelKind,
    },
    /// Array of sub-configs spread across a chain of nodes.
    OpaqueArray {
        chain: ChainKind,
    },
}

impl ValueKind {
    pub fn name(&self) -> &'static str {
        match self {
            ValueKind::Int { .. } => "int",
            ValueKind::Float { .. } => "float",
            ValueKind::Bool { .. } => "bool",
            ValueKind::Text { .. } => "string",
            ValueKind::EnumIndex { .. } => "enumIndex",
            ValueKind::ModelReference { .. } => "modelReference",
            ValueKind::OpaqueArray { .. } => "opaqueArray",
        }
    }

    /// The declared default as a field value. Model references and arrays
    /// have none.
    pub fn default_value(&self) -> crate::model::Value {
        use crate::model::Value;
        match self {
            ValueKind::Int { default, .. } => Value::Int(*default),
            ValueKind::Float { default, .. } => Value::Float(*default),
            ValueKind::Bool { default } => Value::Bool(*default),
            ValueKind::Text { default } => Value::from(*default),
            ValueKind::EnumIndex { values, default_index } => values
                .get(*default_index)
                .map(|v| Value::from(*v))
                .unwrap_or(Value::Null),
            ValueKind::ModelReference { .. } | ValueKind::OpaqueArray { .. } => Value::Null,
        }
    }
}

impl MaxBound {
    /// Resolve to a scalar for a node whose model variant is `variant`.
    /// `field` reads sibling fields for [`MaxBound::Field`].
    pub fn resolve(
        &self,
        variant: Option<&ModelVersion>,
        field: impl Fn(&str) -> Option<f64>,
    ) -> Option<f64> {
        match self {
            MaxBound::Unbounded => None,
            MaxBound::Fixed(max) => Some(*max),
            MaxBound::PerVariant { table, fallback } => Some(
                variant
                    .and_then(|v| table.iter().find(|(id, _)| *id == v.as_str()))
                    .map(|(_, max)| *max)
                    .unwrap_or(*fallback),
            ),
            MaxBound::Field(name) => field(name),
        }
    }
}

/// Visibility dependency on another property of the same node, named by its
/// external key.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Condition {
    IfTrue(&'static str),
    IfFalse(&'static str),
    /// Parent (an enum field) holds exactly this option.
    IfEquals(&'static str, &'static str),
}

impl Condition {
    pub fn parent(&self) -> &'static str {
        match self {
            Condition::IfTrue(p) | Condition::IfFalse(p) | Condition::IfEquals(p, _) => p,
        }
    }
}

/// Custom import behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Importer {
    /// Round to the nearest multiple of 64; numeric strings are accepted.
    RoundTo64,
    /// Index into the descriptor's enum list, or an option by name. Anything
    /// else selects the default option.
    EnumByIndex,
    /// Like [`Importer::EnumByIndex`], but an unknown option keeps the field.
    EnumByIndexOrKeep,
    /// Match a catalog entry by checkpoint file; no match keeps the field.
    ModelByFile,
    /// Only non-negative numbers are applied.
    NonNegative,
    /// Write the flag, and when set, derive `shift` from width and height.
    ResolutionShift,
    /// External `n` → field `4n - 3`; non-numbers and `n <= 0` become 0.
    CausalInference,
    /// External `n` → field `4n`; non-numbers are ignored.
    CausalInferencePad,
    /// `2` stays 2, anything else becomes 4.
    ScaleFactor,
    /// Clamp to `[0, 1]`; non-numbers become the default.
    UnitClamp,
}

/// Custom export behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exporter {
    /// Selected catalog entry → its checkpoint file. Nothing selected omits the key.
    ModelFile,
    /// Enum option → its index.
    EnumIndex,
    /// Field `v` → `floor((v + 3) / 4)`.
    CausalInference,
    /// Field `v` → `floor(v / 4)`.
    CausalInferencePad,
}

/// When a property in a document requires a node of its owner type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    WhenPresent,
    /// Only when the document value is truthy (optional model selections).
    WhenTruthy,
    /// Never on its own; applied once another property brings the node in.
    Never,
}

/// Chains of same-kind nodes that hold array-valued properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChainKind {
    Lora,
    ControlNet,
}

impl ChainKind {
    pub fn node_type(&self) -> NodeType {
        match self {
            ChainKind::Lora => NodeType::Lora,
            ChainKind::ControlNet => NodeType::ControlNet,
        }
    }

    /// Slots per node.
    pub fn capacity(&self) -> usize {
        match self {
            ChainKind::Lora => 8,
            ChainKind::ControlNet => 1,
        }
    }

    /// Per-slot sub-fields, in document order.
    pub fn slot_fields(&self) -> &'static [SlotField] {
        match self {
            ChainKind::Lora => table::LORA_SLOT_FIELDS,
            ChainKind::ControlNet => table::CONTROL_SLOT_FIELDS,
        }
    }
}

/// How a slot sub-field travels between a sub-config and a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotCodec {
    /// Value copied as is, then coerced.
    Direct,
    /// Catalog entry matched by checkpoint file.
    ModelByFile,
    /// Lowercase in documents, capitalized option in the editor.
    Capitalized,
    /// Any truthy document value is `true`.
    Truthy,
    /// Document holds a list of attention blocks; its length picks the option.
    TargetBlocks,
}

/// One sub-field of a chain slot.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotField {
    /// Key inside a sub-config object.
    pub sub_key: &'static str,
    /// Field name of slot 0; later slots append `_2`, `_3`...
    pub stem: &'static str,
    pub kind: ValueKind,
    pub codec: SlotCodec,
}

impl SlotField {
    /// The editor field name for zero-based `slot`.
    pub fn field_name(&self, slot: usize) -> String {
        if slot == 0 {
            self.stem.to_string()
        } else {
            format!("{}_{}", self.stem, slot + 1)
        }
    }
}

/// One registered property.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDescriptor {
    pub external_key: &'static str,
    /// `None` for chain-distributed properties.
    pub field_name: Option<&'static str>,
    /// `None` for chain-distributed properties.
    pub owner: Option<NodeType>,
    pub kind: ValueKind,
    pub condition: Option<Condition>,
    /// Skip import unless the condition holds in the document itself.
    pub gate_import: bool,
    pub importer: Option<Importer>,
    pub exporter: Option<Exporter>,
    pub requirement: Requirement,
}

impl PropertyDescriptor {
    /// The node kind that must exist for this property to apply.
    pub fn required_node_type(&self) -> Option<NodeType> {
        match (&self.owner, &self.kind) {
            (Some(owner), _) => Some(*owner),
            (None, ValueKind::OpaqueArray { chain }) => Some(chain.node_type()),
            _ => None,
        }
    }

    pub fn chain(&self) -> Option<ChainKind> {
        match self.kind {
            ValueKind::OpaqueArray { chain } => Some(chain),
            _ => None,
        }
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Read-only lookup over the descriptor table.
pub struct Registry {
    descriptors: Vec<PropertyDescriptor>,
    by_key: HashMap<&'static str, usize>,
}

static GLOBAL: LazyLock<Registry> = LazyLock::new(|| Registry::new(table::descriptors()));

impl Registry {
    fn new(descriptors: Vec<PropertyDescriptor>) -> Self {
        let mut by_key = HashMap::with_capacity(descriptors.len());
        for (i, d) in descriptors.iter().enumerate() {
            let previous = by_key.insert(d.external_key, i);
            debug_assert!(previous.is_none(), "duplicate external key {}", d.external_key);
        }
        Self { descriptors, by_key }
    }

    /// The process-wide registry.
    pub fn global() -> &'static Registry {
        &GLOBAL
    }

    /// All descriptors, in table order.
    pub fn iter(&self) -> impl Iterator<Item = &PropertyDescriptor> {
        self.descriptors.iter()
    }

    pub fn find_by_external_key(&self, key: &str) -> Option<&PropertyDescriptor> {
        self.by_key.get(key).map(|&i| &self.descriptors[i])
    }

    /// First descriptor bound to `name` on any node kind.
    pub fn find_by_field_name(&self, name: &str) -> Option<&PropertyDescriptor> {
        self.descriptors.iter().find(|d| d.field_name == Some(name))
    }

    /// The descriptor bound to `name` on nodes of kind `owner`.
    pub fn find_field(&self, owner: NodeType, name: &str) -> Option<&PropertyDescriptor> {
        self.descriptors
            .iter()
            .find(|d| d.owner == Some(owner) && d.field_name == Some(name))
    }

    pub fn find_by_owner_type(&self, owner: NodeType) -> impl Iterator<Item = &PropertyDescriptor> {
        self.descriptors.iter().filter(move |d| d.owner == Some(owner))
    }

    /// The chain property stored on nodes of kind `node_type`, if any.
    pub fn find_chain(&self, node_type: NodeType) -> Option<&PropertyDescriptor> {
        self.descriptors
            .iter()
            .find(|d| d.chain().is_some_and(|c| c.node_type() == node_type))
    }
}
