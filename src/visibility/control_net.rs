//! Control-net node: which options apply to the selected control model.

use crate::Result;
use crate::access::NodeProxy;
use crate::model::{ModelOption, NodeType, Value};
use crate::registry::lists::capitalize;

use super::HasDynamicFields;

const DOWN_SAMPLING_TYPES: &[&str] = &["lowquality", "blur", "tile"];
const TARGET_BLOCK_TYPES: &[&str] = &["ipadapterplus", "ipadapterfull", "ipadapterfaceidplus"];

/// Dynamic-field handler of `DrawThingsControlNet`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ControlNetFields;

impl ControlNetFields {
    /// Visibility of the model-dependent fields for a selection and input type.
    pub fn compute(
        model: Option<&ModelOption>,
        input_type: Option<&str>,
    ) -> [(&'static str, bool); 4] {
        let modifier = model.and_then(|m| m.modifier.as_deref()).filter(|m| !m.is_empty());
        let kind = model.and_then(|m| m.kind.as_deref());

        let input_type_shown =
            model.is_some() && (modifier.is_none() || kind == Some("controlnetunion"));
        let pooling_shown = model.is_some_and(|m| m.global_average_pooling);
        let down_sampling_shown = modifier.is_some_and(|m| DOWN_SAMPLING_TYPES.contains(&m))
            || input_type
                .map(str::to_lowercase)
                .is_some_and(|t| DOWN_SAMPLING_TYPES.contains(&t.as_str()));
        let target_blocks_shown = kind.is_some_and(|k| TARGET_BLOCK_TYPES.contains(&k))
            && model
                .and_then(|m| m.version.as_ref())
                .is_some_and(|v| v.as_str() == "v1" || v.is_sdxl());

        [
            ("control_input_type", input_type_shown),
            ("global_average_pooling", pooling_shown),
            ("down_sampling_rate", down_sampling_shown),
            ("target_blocks", target_blocks_shown),
        ]
    }
}

impl HasDynamicFields for ControlNetFields {
    fn node_type(&self) -> NodeType {
        NodeType::ControlNet
    }

    fn update_dynamic_fields(&self, node: &NodeProxy<'_>) -> Result<()> {
        let model = node.get("control_name")?;
        let input_type = node.text("control_input_type")?;
        let model = model.as_ref().and_then(Value::as_model);
        for (field, visible) in Self::compute(model, input_type.as_deref()) {
            node.show(field, visible)?;
        }
        Ok(())
    }

    /// Picking a control model with a fixed modifier also picks the matching
    /// input type.
    fn field_changed(&self, node: &NodeProxy<'_>, field: &str) -> Result<()> {
        if field == "control_name" {
            let modifier = node
                .get("control_name")?
                .and_then(|v| v.as_model().and_then(|m| m.modifier.clone()))
                .filter(|m| !m.is_empty());
            if let Some(modifier) = modifier {
                let input_type = Value::from(capitalize(&modifier));
                if node.get("control_input_type")?.as_ref() != Some(&input_type) {
                    node.set_if_present("control_input_type", input_type)?;
                }
            }
        }
        self.update_dynamic_fields(node)
    }
}
