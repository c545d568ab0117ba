//! # Editor Node Model
//!
//! Clean DTOs that every layer shares: field values, node identity and
//! kinds, model variants, and server model catalogs.
//!
//! Design rule: this module is pure data. No host access, no state, no async.

pub mod node;
pub mod value;
pub mod field_map;
pub mod version;
pub mod catalog;

pub use node::{Node, NodeId, NodeType};
pub use value::Value;
pub use field_map::FieldMap;
pub use version::ModelVersion;
pub use catalog::{BridgeListing, ModelCatalog, ModelKind, ModelOption};
