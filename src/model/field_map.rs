//! FieldMap: the name → value store on an editor node.

use std::collections::HashMap;
use super::Value;

/// A map of field names to values.
pub type FieldMap = HashMap<String, Value>;

/// Read a numeric field, treating anything non-numeric as absent.
pub fn number(fields: &FieldMap, name: &str) -> Option<f64> {
    fields.get(name).and_then(Value::as_float)
}

/// Read a field's truthiness; a missing field is false.
pub fn truthy(fields: &FieldMap, name: &str) -> bool {
    fields.get(name).is_some_and(Value::is_truthy)
}
