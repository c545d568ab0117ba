//! Field accessor: a typed handle on one host node.
//!
//! Display-flag helpers are lenient about missing fields (a node built by an
//! older host version may lack a widget), value writers are strict.

use crate::host::GraphHost;
use crate::model::{FieldMap, ModelVersion, NodeId, NodeType, Value};
use crate::{Error, Result};

/// One Draw Things node, seen through the host.
#[derive(Clone, Copy)]
pub struct NodeProxy<'h> {
    host: &'h dyn GraphHost,
    id: NodeId,
    node_type: NodeType,
}

impl<'h> NodeProxy<'h> {
    /// Open a node. Fails for unknown ids and for nodes of other kinds.
    pub fn open(host: &'h dyn GraphHost, id: NodeId) -> Result<Self> {
        match host.node_type(id)? {
            Some(node_type) => Ok(Self { host, id, node_type }),
            None => Err(Error::WrongNodeType {
                node: id,
                expected: "a Draw Things node".into(),
                got: "another node kind".into(),
            }),
        }
    }

    /// Open a node that must be of kind `expected`.
    pub fn open_as(host: &'h dyn GraphHost, id: NodeId, expected: NodeType) -> Result<Self> {
        let proxy = Self::open(host, id)?;
        if proxy.node_type != expected {
            return Err(Error::WrongNodeType {
                node: id,
                expected: expected.as_str().into(),
                got: proxy.node_type.as_str().into(),
            });
        }
        Ok(proxy)
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn node_type(&self) -> NodeType {
        self.node_type
    }

    pub fn host(&self) -> &'h dyn GraphHost {
        self.host
    }

    // ========================================================================
    // Values
    // ========================================================================

    pub fn has(&self, field: &str) -> Result<bool> {
        Ok(self.host.field_value(self.id, field)?.is_some())
    }

    pub fn get(&self, field: &str) -> Result<Option<Value>> {
        self.host.field_value(self.id, field)
    }

    pub fn number(&self, field: &str) -> Result<Option<f64>> {
        Ok(self.get(field)?.and_then(|v| v.as_float()))
    }

    /// A missing field is false.
    pub fn truthy(&self, field: &str) -> Result<bool> {
        Ok(self.get(field)?.is_some_and(|v| v.is_truthy()))
    }

    pub fn text(&self, field: &str) -> Result<Option<String>> {
        Ok(self.get(field)?.and_then(|v| v.as_str().map(str::to_string)))
    }

    pub fn set(&self, field: &str, value: Value) -> Result<()> {
        self.host.set_field_value(self.id, field, value)
    }

    /// Write only if the node has the field. Returns whether it did.
    pub fn set_if_present(&self, field: &str, value: Value) -> Result<bool> {
        if !self.has(field)? {
            return Ok(false);
        }
        self.set(field, value)?;
        Ok(true)
    }

    /// All field values at once.
    pub fn snapshot(&self) -> Result<FieldMap> {
        let mut fields = FieldMap::new();
        for name in self.host.field_names(self.id)? {
            if let Some(value) = self.get(&name)? {
                fields.insert(name, value);
            }
        }
        Ok(fields)
    }

    pub fn variant(&self) -> Result<Option<ModelVersion>> {
        self.host.selected_model_variant(self.id)
    }

    // ========================================================================
    // Display flags
    // ========================================================================

    pub fn visible(&self, field: &str) -> Result<bool> {
        if !self.has(field)? {
            return Ok(false);
        }
        self.host.field_visible(self.id, field)
    }

    /// Show or hide a field. Fields the node lacks are skipped.
    pub fn show(&self, field: &str, visible: bool) -> Result<()> {
        if self.has(field)? {
            self.host.set_field_visible(self.id, field, visible)?;
        }
        Ok(())
    }

    pub fn disable(&self, field: &str, disabled: bool) -> Result<()> {
        if self.has(field)? {
            self.host.set_field_disabled(self.id, field, disabled)?;
        }
        Ok(())
    }

    // ========================================================================
    // Links
    // ========================================================================

    pub fn linked(&self, relation: &str) -> Result<Vec<NodeId>> {
        self.host.linked_nodes(self.id, relation)
    }
}

impl std::fmt::Debug for NodeProxy<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeProxy")
            .field("id", &self.id)
            .field("node_type", &self.node_type)
            .finish()
    }
}
