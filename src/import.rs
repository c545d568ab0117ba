//! # Import Pipeline
//!
//! Applies a Draw Things config document to a sampler node and the nodes
//! linked to it.
//!
//! Order of work:
//!
//! 1. sampler properties, in registry order, through their importers
//! 2. coercion of the sampler's fields, then a visibility recompute
//! 3. upscaler / refiner properties, when the document asks for them
//! 4. chain arrays (`controls`, `loras`) distributed over linked chains
//! 5. one warning naming every node the document needed but did not find
//!
//! Only a document that does not parse aborts; everything else is applied
//! as far as it goes and reported.

use std::collections::BTreeSet;

use smallvec::SmallVec;
use tracing::{debug, info, warn};

use crate::access::NodeProxy;
use crate::chain::{self, ChainSpec, Distribution, MissingCapacityReport};
use crate::coerce::{CorrectionRecord, coerce_node, correction_message};
use crate::config::EngineConfig;
use crate::host::relation;
use crate::model::{ModelCatalog, NodeId, NodeType, Value};
use crate::registry::{
    ChainKind, Condition, Importer, PropertyDescriptor, Registry, Requirement, ValueKind,
};
use crate::visibility::{self, calc_shift};
use crate::{Error, Result};

/// A parsed config document: external keys to JSON values.
pub type Document = serde_json::Map<String, serde_json::Value>;

/// Shown when the input is not a config document.
pub const PARSE_ERROR_MESSAGE: &str = "Failed to parse Draw Things config from clipboard";

/// Parse config text. Anything but a JSON object is rejected.
pub fn parse_document(text: &str) -> Result<Document> {
    match serde_json::from_str::<serde_json::Value>(text) {
        Ok(serde_json::Value::Object(doc)) => Ok(doc),
        Ok(_) => Err(Error::NotADocument),
        Err(e) => Err(Error::DocumentParse(e.to_string())),
    }
}

// ============================================================================
// Report
// ============================================================================

/// Corrections coercion made on one node.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeCorrections {
    pub node: NodeId,
    pub node_type: NodeType,
    pub records: Vec<CorrectionRecord>,
}

/// Everything an import did short of failing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportReport {
    /// External keys written to a node.
    pub applied_keys: Vec<String>,
    /// External keys with no registered property.
    pub unknown_keys: Vec<String>,
    pub corrections: Vec<NodeCorrections>,
    /// One entry per chain list in the document; there are two chain kinds.
    pub chains: SmallVec<[(ChainKind, Distribution); 2]>,
    /// At most one entry per secondary node kind.
    pub missing: SmallVec<[MissingCapacityReport; 4]>,
}

impl ImportReport {
    pub fn correction_count(&self) -> usize {
        self.corrections.iter().map(|c| c.records.len()).sum()
    }

    /// Whether anything the document asked for could not be applied for
    /// lack of nodes.
    pub fn is_partial(&self) -> bool {
        !self.missing.is_empty()
    }
}

// ============================================================================
// Pipeline
// ============================================================================

/// Apply `doc` to `primary` and its linked nodes.
///
/// `catalog` resolves model files; it should be fresh for the primary
/// node's server. Notifications go to the primary node's host.
pub fn import_document(
    primary: &NodeProxy<'_>,
    doc: &Document,
    catalog: &ModelCatalog,
    config: &EngineConfig,
) -> Result<ImportReport> {
    let registry = Registry::global();
    let mut report = ImportReport::default();
    let mut required: BTreeSet<NodeType> = BTreeSet::new();
    let mut chains: Vec<(ChainKind, Vec<Value>)> = Vec::new();

    debug!(node = %primary.id(), keys = doc.len(), "config document parsed");

    for key in doc.keys() {
        if registry.find_by_external_key(key).is_none() {
            debug!(key = %key, "skipping unknown config key");
            report.unknown_keys.push(key.clone());
        }
    }

    for descriptor in registry.iter() {
        let Some(json) = doc.get(descriptor.external_key) else { continue };
        let raw = Value::from_json(json);

        if let Some(kind) = descriptor.chain() {
            match raw {
                Value::List(items) => chains.push((kind, items)),
                other => debug!(
                    key = descriptor.external_key,
                    got = other.type_name(),
                    "chain value is not a list"
                ),
            }
            continue;
        }

        if descriptor.owner == Some(primary.node_type()) {
            if descriptor.gate_import && !gate_open(descriptor, doc) {
                continue;
            }
            if apply_property(primary, descriptor, &raw, doc, catalog)? {
                report.applied_keys.push(descriptor.external_key.to_string());
            }
            continue;
        }

        if let Some(node_type) = descriptor.required_node_type() {
            let needed = match descriptor.requirement {
                Requirement::WhenPresent => true,
                Requirement::WhenTruthy => raw.is_truthy(),
                Requirement::Never => false,
            };
            if needed {
                required.insert(node_type);
            }
        }
    }

    let records = coerce_node(primary)?;
    push_corrections(&mut report, primary, records);
    visibility::recompute(primary)?;

    // Single optional nodes.
    let singles = [
        (NodeType::Upscaler, relation::UPSCALER),
        (NodeType::Refiner, relation::REFINER),
    ];
    for (node_type, rel) in singles {
        if !required.contains(&node_type) {
            continue;
        }
        let Some(node) = chain::discover_single(primary, rel, node_type)? else {
            report.missing.push(MissingCapacityReport {
                node_type,
                count_needed: 1,
                chained: false,
            });
            continue;
        };
        for descriptor in registry.find_by_owner_type(node_type) {
            let key = descriptor.external_key;
            let raw = doc.get(key).map(Value::from_json).unwrap_or(Value::Null);
            if apply_property(&node, descriptor, &raw, doc, catalog)? && doc.contains_key(key) {
                report.applied_keys.push(descriptor.external_key.to_string());
            }
        }
        let records = coerce_node(&node)?;
        push_corrections(&mut report, &node, records);
        visibility::recompute(&node)?;
    }

    // Chains.
    for (kind, items) in &chains {
        let spec = chain_spec(*kind, config);
        let nodes = chain::discover(primary, &spec)?;
        let outcome = chain::distribute(&spec, items, &nodes, catalog)?;
        if outcome.nodes_written > 0 {
            let key = registry.iter().find(|d| d.chain() == Some(*kind)).map(|d| d.external_key);
            report.applied_keys.extend(key.map(str::to_string));
        }
        if outcome.missing_nodes > 0 {
            report.missing.push(MissingCapacityReport {
                node_type: kind.node_type(),
                count_needed: outcome.missing_nodes,
                chained: true,
            });
        }
        report.chains.push((*kind, outcome));
    }

    notify(primary, &report, config);
    Ok(report)
}

/// The distribution spec for `kind` under `config`.
pub fn chain_spec(kind: ChainKind, config: &EngineConfig) -> ChainSpec {
    match kind {
        ChainKind::Lora => ChainSpec::new(kind, config.chain_capacity_lora),
        ChainKind::ControlNet => ChainSpec::for_kind(kind),
    }
}

fn push_corrections(
    report: &mut ImportReport,
    node: &NodeProxy<'_>,
    records: Vec<CorrectionRecord>,
) {
    if records.is_empty() {
        return;
    }
    info!(
        node = %node.id(),
        kind = %node.node_type(),
        count = records.len(),
        "corrected invalid values"
    );
    report.corrections.push(NodeCorrections {
        node: node.id(),
        node_type: node.node_type(),
        records,
    });
}

fn notify(primary: &NodeProxy<'_>, report: &ImportReport, config: &EngineConfig) {
    let host = primary.host();
    if config.notify_corrections {
        for corrections in &report.corrections {
            host.notify_info(&correction_message(corrections.node_type, &corrections.records));
        }
    }
    if report.is_partial() {
        warn!(node = %primary.id(), missing = report.missing.len(), "config partially loaded");
        host.notify_warning(&chain::missing_nodes_message(&report.missing));
    }
}

// ============================================================================
// Property importers
// ============================================================================

/// Whether the document itself satisfies a gated property's condition.
fn gate_open(descriptor: &PropertyDescriptor, doc: &Document) -> bool {
    let Some(condition) = descriptor.condition else {
        return true;
    };
    let parent = doc.get(condition.parent()).map(Value::from_json).unwrap_or(Value::Null);
    match condition {
        Condition::IfTrue(_) => parent.is_truthy(),
        Condition::IfFalse(_) => !parent.is_truthy(),
        Condition::IfEquals(_, option) => parent.as_str() == Some(option),
    }
}

/// Write one document value into its field. Returns whether the field was
/// written; importers may decline a value and leave the field as it was.
fn apply_property(
    node: &NodeProxy<'_>,
    descriptor: &PropertyDescriptor,
    raw: &Value,
    doc: &Document,
    catalog: &ModelCatalog,
) -> Result<bool> {
    let Some(field) = descriptor.field_name else {
        return Ok(false);
    };
    if !node.has(field)? {
        return Ok(false);
    }

    let value = match descriptor.importer {
        None if raw.is_null() => Some(descriptor.kind.default_value()),
        None => Some(raw.clone()),
        Some(Importer::RoundTo64) => Some(match raw.as_float_lenient() {
            Some(v) => number((v / 64.0).round() * 64.0),
            None => raw.clone(),
        }),
        Some(Importer::EnumByIndex) => Some(
            enum_by_index(&descriptor.kind, raw)
                .unwrap_or_else(|| descriptor.kind.default_value()),
        ),
        Some(Importer::EnumByIndexOrKeep) => enum_by_index(&descriptor.kind, raw),
        Some(Importer::ModelByFile) => match (&descriptor.kind, raw.as_str()) {
            (ValueKind::ModelReference { kind }, Some(file)) => {
                catalog.find_file(*kind, file).cloned().map(Value::from)
            }
            _ => None,
        },
        Some(Importer::NonNegative) => raw.as_float().filter(|v| *v >= 0.0).map(|_| raw.clone()),
        Some(Importer::ResolutionShift) => {
            node.set(field, raw.clone())?;
            if raw.is_truthy() {
                derive_shift(node, doc)?;
            }
            return Ok(true);
        }
        Some(Importer::CausalInference) => Some(match finite(raw) {
            Some(n) => number(n * 4.0 - 3.0),
            None => Value::Int(0),
        }),
        Some(Importer::CausalInferencePad) => finite(raw).map(|n| number(n * 4.0)),
        Some(Importer::ScaleFactor) => {
            Some(Value::Int(if finite(raw) == Some(2.0) { 2 } else { 4 }))
        }
        Some(Importer::UnitClamp) => Some(match finite(raw) {
            Some(v) => Value::Float(v.clamp(0.0, 1.0)),
            None => descriptor.kind.default_value(),
        }),
    };

    match value {
        Some(value) => {
            node.set(field, value)?;
            Ok(true)
        }
        None => Ok(false),
    }
}

/// Shift from the document's size when it has one, else from the node's.
fn derive_shift(node: &NodeProxy<'_>, doc: &Document) -> Result<()> {
    let size = |key: &str| -> Result<Option<f64>> {
        let from_doc = doc
            .get(key)
            .map(Value::from_json)
            .and_then(|v| v.as_float_lenient())
            .filter(|v| *v != 0.0);
        match from_doc {
            Some(v) => Ok(Some(v)),
            None => Ok(node.number(key)?.filter(|v| *v != 0.0)),
        }
    };
    if let (Some(width), Some(height)) = (size("width")?, size("height")?) {
        node.set_if_present("shift", Value::Float(calc_shift(height, width)))?;
    }
    Ok(())
}

/// An index into the option list, or an option by name.
fn enum_by_index(kind: &ValueKind, raw: &Value) -> Option<Value> {
    let ValueKind::EnumIndex { values, .. } = kind else {
        return None;
    };
    let option = match raw {
        Value::String(s) => values.iter().find(|v| **v == s.as_str()),
        other => other
            .as_int()
            .and_then(|i| usize::try_from(i).ok())
            .and_then(|i| values.get(i)),
    };
    option.map(|v| Value::from(*v))
}

fn finite(raw: &Value) -> Option<f64> {
    raw.as_float().filter(|v| v.is_finite())
}

/// Whole numbers as `Int`, the rest as `Float`.
fn number(v: f64) -> Value {
    if v.fract() == 0.0 && v.abs() < i64::MAX as f64 {
        Value::Int(v as i64)
    } else {
        Value::Float(v)
    }
}
