//! # Coercion & Validation
//!
//! Normalizes raw field values into valid, in-range values for their
//! descriptor. Coercion never fails: anything unusable becomes the declared
//! default. Every change is recorded as a [`CorrectionRecord`] so the caller
//! can tell the user exactly what was fixed.

use std::fmt;

use crate::Result;
use crate::access::NodeProxy;
use crate::model::{FieldMap, ModelVersion, NodeType, Value};
use crate::model::field_map;
use crate::registry::{PropertyDescriptor, ValueKind};

/// What coercion may consult besides the raw value: the node's selected
/// model variant (per-variant bounds) and its other fields (field bounds).
#[derive(Debug, Clone, Copy)]
pub struct CoerceContext<'a> {
    pub variant: Option<&'a ModelVersion>,
    pub fields: &'a FieldMap,
}

impl<'a> CoerceContext<'a> {
    pub fn new(variant: Option<&'a ModelVersion>, fields: &'a FieldMap) -> Self {
        Self { variant, fields }
    }
}

/// One field whose value was changed by coercion.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrectionRecord {
    pub field_name: String,
    pub original: Value,
    pub coerced: Value,
}

impl fmt::Display for CorrectionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} -> {}", self.field_name, self.original, self.coerced)
    }
}

/// Coerce `raw` per the descriptor's value kind.
pub fn coerce(descriptor: &PropertyDescriptor, raw: &Value, ctx: &CoerceContext<'_>) -> Value {
    coerce_kind(&descriptor.kind, raw, ctx)
}

/// Coerce `raw` per `kind`. Used directly for chain slot sub-fields, which
/// have no descriptor of their own.
pub fn coerce_kind(kind: &ValueKind, raw: &Value, ctx: &CoerceContext<'_>) -> Value {
    match kind {
        ValueKind::Int { default, min, max, .. } => {
            let Some(v) = finite_number(raw) else {
                return Value::Int(*default);
            };
            let max = max.resolve(ctx.variant, |name| field_map::number(ctx.fields, name));
            Value::Int(clamp(v, *min, max).round() as i64)
        }
        ValueKind::Float { default, min, max, .. } => {
            let Some(v) = finite_number(raw) else {
                return Value::Float(*default);
            };
            let max = max.resolve(ctx.variant, |name| field_map::number(ctx.fields, name));
            Value::Float(clamp(v, *min, max))
        }
        ValueKind::Bool { default } => Value::Bool(raw.as_bool().unwrap_or(*default)),
        ValueKind::Text { default } => match raw {
            Value::String(s) => Value::String(s.clone()),
            _ => Value::from(*default),
        },
        ValueKind::EnumIndex { values, default_index } => {
            let picked = match raw {
                Value::Int(i) => usize::try_from(*i).ok().and_then(|i| values.get(i)),
                Value::Float(f) if f.fract() == 0.0 && *f >= 0.0 => values.get(*f as usize),
                Value::String(s) => values.iter().find(|v| **v == s.as_str()),
                _ => None,
            };
            picked
                .or_else(|| values.get(*default_index))
                .map(|v| Value::from(*v))
                .unwrap_or(Value::Null)
        }
        // Model selections are matched against the catalog on import, and
        // chain arrays are distributed; neither has a range to enforce.
        ValueKind::ModelReference { .. } | ValueKind::OpaqueArray { .. } => raw.clone(),
    }
}

fn finite_number(raw: &Value) -> Option<f64> {
    raw.as_float().filter(|v| v.is_finite())
}

/// Lower bound wins over upper when both are violated, matching how the
/// editor widgets resolve an inverted range.
fn clamp(v: f64, min: Option<f64>, max: Option<f64>) -> f64 {
    match (min, max) {
        (Some(min), _) if min.is_finite() && v < min => min,
        (_, Some(max)) if max.is_finite() && v > max => max,
        _ => v,
    }
}

/// Coerce every registered field present in `fields` of a node of kind
/// `node_type`, in place. Returns one record per changed field, in registry
/// order.
pub fn coerce_fields(
    node_type: NodeType,
    fields: &mut FieldMap,
    variant: Option<&ModelVersion>,
) -> Vec<CorrectionRecord> {
    let registry = crate::registry::Registry::global();
    let mut corrections = Vec::new();
    for descriptor in registry.find_by_owner_type(node_type) {
        let Some(name) = descriptor.field_name else { continue };
        let Some(original) = fields.get(name).cloned() else { continue };
        let coerced = {
            let ctx = CoerceContext::new(variant, fields);
            coerce(descriptor, &original, &ctx)
        };
        if !coerced.same_as(&original) {
            fields.insert(name.to_string(), coerced.clone());
            corrections.push(CorrectionRecord {
                field_name: name.to_string(),
                original,
                coerced,
            });
        }
    }
    corrections
}

/// Coerce every registered field of a live node and write back what changed.
pub fn coerce_node(node: &NodeProxy<'_>) -> Result<Vec<CorrectionRecord>> {
    let mut fields = node.snapshot()?;
    let variant = node.variant()?;
    let corrections = coerce_fields(node.node_type(), &mut fields, variant.as_ref());
    for record in &corrections {
        node.set(&record.field_name, record.coerced.clone())?;
    }
    Ok(corrections)
}

/// The combined, human-readable message for a non-empty correction list.
pub fn correction_message(node_type: NodeType, corrections: &[CorrectionRecord]) -> String {
    let list: Vec<String> = corrections.iter().map(ToString::to_string).collect();
    format!(
        "The {} node contained invalid values - they have been corrected:\n\n{}",
        node_type.display_name(),
        list.join("\n")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Registry;
    use pretty_assertions::assert_eq;

    fn descriptor(key: &str) -> &'static PropertyDescriptor {
        Registry::global().find_by_external_key(key).unwrap()
    }

    fn coerce_bare(key: &str, raw: Value) -> Value {
        let fields = FieldMap::new();
        coerce(descriptor(key), &raw, &CoerceContext::new(None, &fields))
    }

    #[test]
    fn test_int_clamped_and_rounded() {
        assert_eq!(coerce_bare("steps", Value::Int(5000)), Value::Int(150));
        assert_eq!(coerce_bare("steps", Value::Int(0)), Value::Int(1));
        assert_eq!(coerce_bare("steps", Value::Float(20.6)), Value::Int(21));
    }

    #[test]
    fn test_non_numeric_becomes_default() {
        assert_eq!(coerce_bare("shift", Value::from("apple")), Value::Float(1.0));
        assert_eq!(coerce_bare("steps", Value::Null), Value::Int(16));
        assert_eq!(coerce_bare("guidanceScale", Value::Float(f64::NAN)), Value::Float(5.0));
    }

    #[test]
    fn test_bool_and_text_defaults() {
        assert_eq!(coerce_bare("hiresFix", Value::from("yes")), Value::Bool(false));
        assert_eq!(coerce_bare("speedUpWithGuidanceEmbed", Value::Int(0)), Value::Bool(true));
        assert_eq!(coerce_bare("clipLText", Value::Int(3)), Value::from(""));
        assert_eq!(coerce_bare("clipLText", Value::from("a cat")), Value::from("a cat"));
    }

    #[test]
    fn test_enum_index() {
        assert_eq!(coerce_bare("sampler", Value::Int(9)), Value::from("TCD"));
        assert_eq!(coerce_bare("sampler", Value::from("UniPC")), Value::from("UniPC"));
        assert_eq!(coerce_bare("sampler", Value::Int(99)), Value::from("DPM++ 2M Karras"));
        assert_eq!(coerce_bare("seedMode", Value::from("bogus")), Value::from("ScaleAlike"));
        assert_eq!(coerce_bare("seedMode", Value::Int(-1)), Value::from("ScaleAlike"));
    }

    #[test]
    fn test_model_reference_passes_through() {
        let raw = Value::from("whatever.ckpt");
        assert_eq!(coerce_bare("model", raw.clone()), raw);
    }

    #[test]
    fn test_per_variant_max() {
        let fields = FieldMap::new();
        let frames = descriptor("numFrames");
        let svd = ModelVersion::SvdI2v;
        let ctx = CoerceContext::new(Some(&svd), &fields);
        assert_eq!(coerce(frames, &Value::Int(100), &ctx), Value::Int(25));
        let ctx = CoerceContext::new(None, &fields);
        assert_eq!(coerce(frames, &Value::Int(100), &ctx), Value::Int(100));
    }

    #[test]
    fn test_field_bound_reads_sibling() {
        let mut fields = FieldMap::new();
        fields.insert("steps".into(), Value::Int(10));
        let ctx = CoerceContext::new(None, &fields);
        assert_eq!(coerce(descriptor("cfgZeroInitSteps"), &Value::Int(30), &ctx), Value::Int(10));
    }

    #[test]
    fn test_coerce_fields_records_changes() {
        let mut fields = FieldMap::new();
        fields.insert("steps".into(), Value::Int(5000));
        fields.insert("cfg".into(), Value::Float(-2.0));
        fields.insert("width".into(), Value::Int(512));
        fields.insert("not_registered".into(), Value::from("x"));

        let corrections = coerce_fields(NodeType::Sampler, &mut fields, None);
        let names: Vec<&str> = corrections.iter().map(|c| c.field_name.as_str()).collect();
        assert_eq!(names, vec!["steps", "cfg"]);
        assert_eq!(fields["steps"], Value::Int(150));
        assert_eq!(fields["not_registered"], Value::from("x"));

        let message = correction_message(NodeType::Sampler, &corrections);
        assert_eq!(
            message,
            "The Draw Things Sampler node contained invalid values - they have been corrected:\n\n\
             steps: 5000 -> 150\ncfg: -2 -> 0"
        );
    }

    #[test]
    fn test_int_written_as_float_is_not_a_correction() {
        let mut fields = FieldMap::new();
        fields.insert("steps".into(), Value::Float(20.0));
        assert!(coerce_fields(NodeType::Sampler, &mut fields, None).is_empty());
    }
}
