//! # Chain Distribution
//!
//! Array-valued properties (`loras`, `controls`) live in chains of linked
//! secondary nodes, each with a fixed number of slots. This module finds
//! the chain hanging off a primary node and spreads a list of sub-configs
//! across it, window by window.
//!
//! Nodes past the last one a list needs are never touched.

pub mod slots;

use std::collections::HashSet;
use std::fmt;

use tracing::debug;

use crate::Result;
use crate::access::NodeProxy;
use crate::host::relation;
use crate::model::{ModelCatalog, NodeType, Value};
use crate::registry::ChainKind;
use crate::visibility::{self, LoraFields};

// ============================================================================
// Chain spec
// ============================================================================

/// How a chain is linked and how much each node holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainSpec {
    pub kind: ChainKind,
    /// Slots filled per node; at most the node's physical slot count.
    pub capacity: usize,
    /// Relation from the primary node to the first chain node.
    pub entry_relation: &'static str,
    /// Relation from a chain node to the next one.
    pub next_relation: &'static str,
}

impl ChainSpec {
    pub fn new(kind: ChainKind, capacity: usize) -> Self {
        let (entry_relation, next_relation) = match kind {
            ChainKind::Lora => (relation::LORA, relation::LORA_STACK),
            ChainKind::ControlNet => (relation::CONTROL_NET, relation::CONTROL_NET),
        };
        Self {
            kind,
            capacity: capacity.clamp(1, kind.capacity()),
            entry_relation,
            next_relation,
        }
    }

    /// Full physical capacity per node.
    pub fn for_kind(kind: ChainKind) -> Self {
        Self::new(kind, kind.capacity())
    }

    /// Nodes needed to hold `count` sub-configs.
    pub fn nodes_needed(&self, count: usize) -> usize {
        count.div_ceil(self.capacity)
    }
}

// ============================================================================
// Discovery
// ============================================================================

/// The chain linked to `primary`, in link order.
///
/// Walks the entry relation, then the next relation from each chain node.
/// Stops at an unlinked input, a node of another kind, or a node already
/// visited.
pub fn discover<'h>(primary: &NodeProxy<'h>, spec: &ChainSpec) -> Result<Vec<NodeProxy<'h>>> {
    let host = primary.host();
    let mut chain = Vec::new();
    let mut visited = HashSet::from([primary.id()]);
    let mut next = primary.linked(spec.entry_relation)?.first().copied();

    while let Some(id) = next {
        if !visited.insert(id) {
            break;
        }
        if host.node_type(id)? != Some(spec.kind.node_type()) {
            break;
        }
        let node = NodeProxy::open(host, id)?;
        next = node.linked(spec.next_relation)?.first().copied();
        chain.push(node);
    }
    Ok(chain)
}

/// The single optional node linked to `primary` along `relation`, if it is
/// of kind `node_type`.
pub fn discover_single<'h>(
    primary: &NodeProxy<'h>,
    relation: &str,
    node_type: NodeType,
) -> Result<Option<NodeProxy<'h>>> {
    let host = primary.host();
    let Some(id) = primary.linked(relation)?.first().copied() else {
        return Ok(None);
    };
    if host.node_type(id)? != Some(node_type) {
        return Ok(None);
    }
    NodeProxy::open(host, id).map(Some)
}

// ============================================================================
// Distribution
// ============================================================================

/// What one distribution did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Distribution {
    /// Slots that received a sub-config.
    pub populated: usize,
    /// Chain nodes written to.
    pub nodes_written: usize,
    /// Further nodes the list would need.
    pub missing_nodes: usize,
}

/// Spread `sub_configs` across `chain`.
///
/// Node *i* takes the window `[i·capacity, i·capacity + capacity)`. Its
/// slots past the window are cleared so nothing from an earlier import
/// survives, and LoRA nodes get their active count set to the window size.
/// An empty list clears the first node.
pub fn distribute(
    spec: &ChainSpec,
    sub_configs: &[Value],
    chain: &[NodeProxy<'_>],
    catalog: &ModelCatalog,
) -> Result<Distribution> {
    let needed = spec.nodes_needed(sub_configs.len());
    let mut outcome = Distribution {
        missing_nodes: needed.saturating_sub(chain.len()),
        ..Default::default()
    };

    for (i, node) in chain.iter().enumerate().take(needed.max(1)) {
        let start = (i * spec.capacity).min(sub_configs.len());
        let end = (start + spec.capacity).min(sub_configs.len());
        let window = &sub_configs[start..end];

        for slot in 0..spec.kind.capacity() {
            match window.get(slot) {
                Some(sub_config) => {
                    slots::apply_sub_config(node, spec.kind, slot, sub_config, catalog)?
                }
                None => slots::clear_slot(node, spec.kind, slot)?,
            }
        }
        if spec.kind == ChainKind::Lora {
            node.set_if_present(LoraFields::COUNT_FIELD, Value::Int(window.len() as i64))?;
        }
        visibility::recompute(node)?;

        debug!(
            node = %node.id(),
            kind = ?spec.kind,
            slots = window.len(),
            "distributed chain window"
        );
        outcome.populated += window.len();
        outcome.nodes_written += 1;
    }
    Ok(outcome)
}

/// Collect the sub-configs held by a chain, in slot order. Slots past a
/// LoRA node's active count and slots without a model are skipped.
pub fn collect(spec: &ChainSpec, chain: &[NodeProxy<'_>]) -> Result<Vec<serde_json::Value>> {
    let mut out = Vec::new();
    for node in chain {
        let active = match spec.kind {
            ChainKind::Lora => LoraFields::count(node)?,
            ChainKind::ControlNet => spec.kind.capacity(),
        };
        for slot in 0..active.min(spec.capacity) {
            if let Some(sub_config) = slots::read_sub_config(node, spec.kind, slot)? {
                out.push(sub_config);
            }
        }
    }
    Ok(out)
}

// ============================================================================
// Missing-capacity report
// ============================================================================

/// A node kind the import needed but could not find enough of.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MissingCapacityReport {
    pub node_type: NodeType,
    pub count_needed: usize,
    /// Chain kinds are reported with a count, single nodes by name only.
    pub chained: bool,
}

impl fmt::Display for MissingCapacityReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.chained {
            write!(f, "{} x {}", self.count_needed, self.node_type)
        } else {
            write!(f, "{}", self.node_type)
        }
    }
}

/// The combined warning for a non-empty report list.
pub fn missing_nodes_message(reports: &[MissingCapacityReport]) -> String {
    let mut lines = vec![
        "The Draw Things config has been partially loaded. \
         To load the full config, add the following nodes:\n"
            .to_string(),
    ];
    lines.extend(reports.iter().map(|r| format!("• {r}")));
    lines.join("\n")
}
