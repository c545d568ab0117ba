//! Config export: rebuild a Draw Things config document from a sampler node
//! and the nodes linked to it.
//!
//! ```text
//! sampler fields ──┐
//! upscaler/refiner ├─→ export_document() → { "width": 768, "loras": [...], ... }
//! lora/cnet chains ┘
//! ```
//!
//! The output is the shape `import_document` reads, so exporting and
//! importing again reproduces every mapped field.

use tracing::debug;

use crate::Result;
use crate::access::NodeProxy;
use crate::chain;
use crate::config::EngineConfig;
use crate::host::relation;
use crate::import::{Document, chain_spec};
use crate::model::{NodeType, Value};
use crate::registry::{Exporter, PropertyDescriptor, Registry, ValueKind};

/// Export `primary` and its linked nodes.
///
/// Model selections with nothing chosen are omitted, and chain keys are
/// omitted when no chain is linked.
pub fn export_document(primary: &NodeProxy<'_>, config: &EngineConfig) -> Result<Document> {
    let registry = Registry::global();
    let mut doc = Document::new();

    for descriptor in registry.find_by_owner_type(primary.node_type()) {
        export_property(primary, descriptor, &mut doc)?;
    }

    let singles = [
        (NodeType::Upscaler, relation::UPSCALER),
        (NodeType::Refiner, relation::REFINER),
    ];
    for (node_type, rel) in singles {
        if let Some(node) = chain::discover_single(primary, rel, node_type)? {
            for descriptor in registry.find_by_owner_type(node_type) {
                export_property(&node, descriptor, &mut doc)?;
            }
        }
    }

    for descriptor in registry.iter() {
        let Some(kind) = descriptor.chain() else { continue };
        let spec = chain_spec(kind, config);
        let nodes = chain::discover(primary, &spec)?;
        if nodes.is_empty() {
            continue;
        }
        let items = chain::collect(&spec, &nodes)?;
        debug!(
            key = descriptor.external_key,
            nodes = nodes.len(),
            items = items.len(),
            "exported chain"
        );
        doc.insert(descriptor.external_key.to_string(), serde_json::Value::Array(items));
    }

    Ok(doc)
}

/// Write one field's value under its external key, if it has one to give.
fn export_property(
    node: &NodeProxy<'_>,
    descriptor: &PropertyDescriptor,
    doc: &mut Document,
) -> Result<()> {
    let Some(field) = descriptor.field_name else {
        return Ok(());
    };
    let Some(value) = node.get(field)? else {
        return Ok(());
    };

    let json = match descriptor.exporter {
        Some(Exporter::ModelFile) => {
            value.as_model().map(|m| serde_json::Value::from(m.file.clone()))
        }
        Some(Exporter::EnumIndex) => match (&descriptor.kind, value.as_str()) {
            (ValueKind::EnumIndex { values, .. }, Some(option)) => {
                values.iter().position(|v| *v == option).map(serde_json::Value::from)
            }
            _ => None,
        },
        Some(Exporter::CausalInference) => value
            .as_float()
            .map(|v| serde_json::Value::from(((v + 3.0) / 4.0).floor() as i64)),
        Some(Exporter::CausalInferencePad) => value
            .as_float()
            .map(|v| serde_json::Value::from((v / 4.0).floor() as i64)),
        None => match value {
            Value::Null => None,
            other => Some(other.to_json()),
        },
    };

    if let Some(json) = json {
        doc.insert(descriptor.external_key.to_string(), json);
    }
    Ok(())
}
