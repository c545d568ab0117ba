//! LoRA node: eight fixed slots, of which the first `lora_count` are shown.
//!
//! Slots past the count hold the empty sentinel (`Value::Null`), distinct
//! from the "(None selected)" placeholder of a shown slot without a model.

use crate::Result;
use crate::access::NodeProxy;
use crate::model::{NodeType, Value};
use crate::registry::ChainKind;
use crate::registry::lists::NONE_SELECTED;

use super::HasDynamicFields;

/// Dynamic-field handler of `DrawThingsLoRA`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoraFields;

impl LoraFields {
    pub const COUNT_FIELD: &'static str = "lora_count";
    pub const SHOW_MODE_FIELD: &'static str = "show_mode";

    pub fn slots() -> usize {
        ChainKind::Lora.capacity()
    }

    /// The node's active slot count, clamped to the slot range. A missing or
    /// non-numeric count reads as one slot.
    pub fn count(node: &NodeProxy<'_>) -> Result<usize> {
        let count = node.number(Self::COUNT_FIELD)?.unwrap_or(1.0);
        Ok(count.clamp(0.0, Self::slots() as f64) as usize)
    }

    /// Set the active slot count and fix up slot values: slots past the
    /// count get the empty sentinel, shown slots without a model get the
    /// placeholder. Display flags are recomputed afterwards.
    pub fn set_count(node: &NodeProxy<'_>, count: i64) -> Result<usize> {
        let count = count.clamp(0, Self::slots() as i64) as usize;
        node.set_if_present(Self::COUNT_FIELD, Value::Int(count as i64))?;
        Self::settle_slots(node, count)?;
        LoraFields.update_dynamic_fields(node)?;
        Ok(count)
    }

    pub(crate) fn settle_slots(node: &NodeProxy<'_>, count: usize) -> Result<()> {
        let model_field = &ChainKind::Lora.slot_fields()[0];
        for slot in 0..Self::slots() {
            let name = model_field.field_name(slot);
            let Some(current) = node.get(&name)? else { continue };
            if slot >= count {
                if !current.is_null() {
                    node.set(&name, Value::Null)?;
                }
            } else if !current.is_truthy() {
                node.set(&name, Value::from(NONE_SELECTED))?;
            }
        }
        Ok(())
    }
}

impl HasDynamicFields for LoraFields {
    fn node_type(&self) -> NodeType {
        NodeType::Lora
    }

    fn update_dynamic_fields(&self, node: &NodeProxy<'_>) -> Result<()> {
        let count = Self::count(node)?;
        let show_mode = node.truthy(Self::SHOW_MODE_FIELD)?;
        for slot in 0..Self::slots() {
            let active = slot < count;
            for sub in ChainKind::Lora.slot_fields() {
                let visible = match sub.sub_key {
                    "mode" => active && show_mode,
                    _ => active,
                };
                node.show(&sub.field_name(slot), visible)?;
            }
        }
        Ok(())
    }

    fn field_changed(&self, node: &NodeProxy<'_>, field: &str) -> Result<()> {
        if field == Self::COUNT_FIELD {
            let count = Self::count(node)?;
            Self::settle_slots(node, count)?;
        }
        self.update_dynamic_fields(node)
    }
}
