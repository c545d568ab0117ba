//! Moving one sub-config in and out of one chain slot.

use std::collections::HashMap;

use crate::Result;
use crate::access::NodeProxy;
use crate::coerce::{CoerceContext, coerce_kind};
use crate::model::{FieldMap, ModelCatalog, Value};
use crate::registry::lists::{
    NONE_SELECTED, SDXL_TARGET_BLOCKS, V1_TARGET_BLOCKS, capitalize, decapitalize,
};
use crate::registry::{ChainKind, SlotCodec, SlotField, ValueKind};

/// The value a cleared slot's model field holds.
///
/// LoRA nodes hide cleared slots, so they get the null sentinel; a
/// control-net's single slot stays on screen and shows the placeholder.
pub fn empty_model_value(kind: ChainKind) -> Value {
    match kind {
        ChainKind::Lora => Value::Null,
        ChainKind::ControlNet => Value::from(NONE_SELECTED),
    }
}

/// Populate `slot` of `node` from one sub-config object.
///
/// Missing or unusable sub-values fall back to the sub-field's default; a
/// model file not in `catalog` leaves the model field as it was.
pub fn apply_sub_config(
    node: &NodeProxy<'_>,
    kind: ChainKind,
    slot: usize,
    sub_config: &Value,
    catalog: &ModelCatalog,
) -> Result<()> {
    let empty = HashMap::new();
    let entries = match sub_config {
        Value::Map(map) => map,
        _ => &empty,
    };
    let no_fields = FieldMap::new();
    let ctx = CoerceContext::new(None, &no_fields);

    for field in kind.slot_fields() {
        let name = field.field_name(slot);
        let raw = entries.get(field.sub_key);
        let value = match field.codec {
            SlotCodec::ModelByFile => {
                let file = raw.and_then(Value::as_str).filter(|f| !f.is_empty());
                match (file, &field.kind) {
                    (None, _) => Some(Value::from(NONE_SELECTED)),
                    (Some(file), ValueKind::ModelReference { kind }) => {
                        catalog.find_file(*kind, file).cloned().map(Value::from)
                    }
                    (Some(_), _) => None,
                }
            }
            SlotCodec::Direct => Some(coerce_kind(&field.kind, raw.unwrap_or(&Value::Null), &ctx)),
            SlotCodec::Capitalized => Some(match raw.and_then(Value::as_str) {
                Some(s) => coerce_kind(&field.kind, &Value::from(capitalize(s)), &ctx),
                None => field.kind.default_value(),
            }),
            SlotCodec::Truthy => Some(Value::Bool(raw.is_some_and(Value::is_truthy))),
            SlotCodec::TargetBlocks => Some(target_blocks_option(field, raw)),
        };
        if let Some(value) = value {
            node.set_if_present(&name, value)?;
        }
    }
    Ok(())
}

fn target_blocks_option(field: &SlotField, raw: Option<&Value>) -> Value {
    let index = match raw {
        Some(Value::List(blocks)) => blocks.len().min(2),
        _ => 0,
    };
    coerce_kind(&field.kind, &Value::Int(index as i64), &CoerceContext::new(None, &FieldMap::new()))
}

/// Reset `slot` of `node`: the model field gets the empty value, every
/// other sub-field its default.
pub fn clear_slot(node: &NodeProxy<'_>, kind: ChainKind, slot: usize) -> Result<()> {
    for field in kind.slot_fields() {
        let value = match field.codec {
            SlotCodec::ModelByFile => empty_model_value(kind),
            _ => field.kind.default_value(),
        };
        node.set_if_present(&field.field_name(slot), value)?;
    }
    Ok(())
}

/// Rebuild the sub-config held by `slot`, or `None` when no model is
/// selected there.
pub fn read_sub_config(
    node: &NodeProxy<'_>,
    kind: ChainKind,
    slot: usize,
) -> Result<Option<serde_json::Value>> {
    let mut out = serde_json::Map::new();
    let mut model_version = None;

    for field in kind.slot_fields() {
        let Some(value) = node.get(&field.field_name(slot))? else { continue };
        let json = match field.codec {
            SlotCodec::ModelByFile => match value.as_model() {
                Some(model) => {
                    model_version = model.version.clone();
                    serde_json::Value::String(model.file.clone())
                }
                None => return Ok(None),
            },
            SlotCodec::Direct => value.to_json(),
            SlotCodec::Capitalized => match value.as_str() {
                Some(s) => serde_json::Value::String(decapitalize(s)),
                None => continue,
            },
            SlotCodec::Truthy => serde_json::Value::Bool(value.is_truthy()),
            SlotCodec::TargetBlocks => {
                let index = match (&field.kind, value.as_str()) {
                    (ValueKind::EnumIndex { values, .. }, Some(s)) => {
                        values.iter().position(|v| *v == s).unwrap_or(0)
                    }
                    _ => 0,
                };
                let table = if model_version.as_ref().is_some_and(|v| v.is_sdxl()) {
                    SDXL_TARGET_BLOCKS
                } else {
                    V1_TARGET_BLOCKS
                };
                serde_json::Value::from(table.get(index).copied().unwrap_or_default().to_vec())
            }
        };
        out.insert(field.sub_key.to_string(), json);
    }
    Ok(Some(serde_json::Value::Object(out)))
}
