//! Model catalogs: what a Draw Things server offers for each model dropdown.

use serde::{Deserialize, Serialize};

use super::ModelVersion;

/// One selectable model, as listed by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelOption {
    pub name: String,
    /// Checkpoint file name. This is the identifier config documents use.
    pub file: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<ModelVersion>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modifier: Option<String>,
    /// Control-net family, e.g. `controlnetunion` or `ipadapterplus`.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, alias = "globalAveragePooling")]
    pub global_average_pooling: bool,
}

impl ModelOption {
    pub fn new(name: impl Into<String>, file: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            file: file.into(),
            version: None,
            modifier: None,
            kind: None,
            global_average_pooling: false,
        }
    }

    pub fn with_version(mut self, version: impl Into<ModelVersion>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn with_modifier(mut self, modifier: impl Into<String>) -> Self {
        self.modifier = Some(modifier.into());
        self
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    pub fn with_global_average_pooling(mut self, gap: bool) -> Self {
        self.global_average_pooling = gap;
        self
    }

    /// Dropdown label: `"FLUX.1 [dev] (F1)"`.
    pub fn label(&self) -> String {
        match &self.version {
            Some(v) if v.as_str() != "fail" => format!("{} ({})", self.name, v.abbrev()),
            _ => self.name.clone(),
        }
    }
}

/// Which dropdown list of a catalog a model field draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelKind {
    Models,
    ControlNets,
    Loras,
    Upscalers,
    TextualInversions,
}

/// Everything one server (or the bridge-mode listing) offers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelCatalog {
    #[serde(default)]
    pub models: Vec<ModelOption>,
    #[serde(default)]
    pub control_nets: Vec<ModelOption>,
    #[serde(default)]
    pub loras: Vec<ModelOption>,
    #[serde(default)]
    pub upscalers: Vec<ModelOption>,
    #[serde(default)]
    pub textual_inversions: Vec<ModelOption>,
}

impl ModelCatalog {
    pub fn options_for(&self, kind: ModelKind) -> &[ModelOption] {
        match kind {
            ModelKind::Models => &self.models,
            ModelKind::ControlNets => &self.control_nets,
            ModelKind::Loras => &self.loras,
            ModelKind::Upscalers => &self.upscalers,
            ModelKind::TextualInversions => &self.textual_inversions,
        }
    }

    /// Find an option by checkpoint file.
    pub fn find_file(&self, kind: ModelKind, file: &str) -> Option<&ModelOption> {
        self.options_for(kind).iter().find(|m| m.file == file)
    }
}

/// The bridge-mode model listing: official, community and uncurated models,
/// already filtered to files the bridge can serve.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeListing {
    #[serde(default)]
    pub official: ModelCatalog,
    #[serde(default)]
    pub community: ModelCatalog,
    #[serde(default)]
    pub uncurated_models: Vec<ModelOption>,
}

impl BridgeListing {
    /// The catalog offered for the given bridge-mode choices. Official
    /// entries always come first; upscalers are never offered.
    pub fn assemble(&self, community: bool, uncurated: bool) -> ModelCatalog {
        let mut catalog = ModelCatalog {
            models: self.official.models.clone(),
            control_nets: self.official.control_nets.clone(),
            loras: self.official.loras.clone(),
            upscalers: Vec::new(),
            textual_inversions: Vec::new(),
        };
        if community {
            catalog.models.extend(self.community.models.iter().cloned());
            catalog.control_nets.extend(self.community.control_nets.iter().cloned());
            catalog.loras.extend(self.community.loras.iter().cloned());
            catalog
                .textual_inversions
                .extend(self.community.textual_inversions.iter().cloned());
        }
        if uncurated {
            catalog.models.extend(self.uncurated_models.iter().cloned());
        }
        catalog
    }
}
