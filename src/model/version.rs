//! Model variants reported by the Draw Things server.
//!
//! The variant of the selected model decides which sampler fields are
//! meaningful (video frame counts, TeaCache, resolution-dependent shift...).
//! Variants the engine does not know are kept verbatim in `Other` so that
//! prefix rules such as "any wan model" still apply to them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ModelVersion {
    V1,
    V2,
    Kandinsky21,
    SdxlBase,
    SdxlRefiner,
    Ssd1b,
    SvdI2v,
    WurstchenStageC,
    WurstchenStageB,
    Sd3,
    Pixart,
    Auraflow,
    Flux1,
    Sd3Large,
    HunyuanVideo,
    Wan21_1_3b,
    Wan21_14b,
    HidreamI1,
    QwenImage,
    ZImage,
    Flux2,
    Other(String),
}

static KNOWN: [(ModelVersion, &str, &str); 21] = [
    (ModelVersion::V1, "v1", "SD"),
    (ModelVersion::V2, "v2", "SD2"),
    (ModelVersion::Kandinsky21, "kandinsky2.1", "Kan"),
    (ModelVersion::SdxlBase, "sdxl_base_v0.9", "SDXL"),
    (ModelVersion::SdxlRefiner, "sdxl_refiner_v0.9", "SDXL"),
    (ModelVersion::Ssd1b, "ssd_1b", "SSD"),
    (ModelVersion::SvdI2v, "svd_i2v", "SVD"),
    (ModelVersion::WurstchenStageC, "wurstchen_v3.0_stage_c", "Wur"),
    (ModelVersion::WurstchenStageB, "wurstchen_v3.0_stage_b", "Wur"),
    (ModelVersion::Sd3, "sd3", "SD3"),
    (ModelVersion::Pixart, "pixart", "Pix"),
    (ModelVersion::Auraflow, "auraflow", "AF"),
    (ModelVersion::Flux1, "flux1", "F1"),
    (ModelVersion::Sd3Large, "sd3_large", "SD3L"),
    (ModelVersion::HunyuanVideo, "hunyuan_video", "Hun"),
    (ModelVersion::Wan21_1_3b, "wan_v2.1_1.3b", "Wan"),
    (ModelVersion::Wan21_14b, "wan_v2.1_14b", "Wan"),
    (ModelVersion::HidreamI1, "hidream_i1", "HiD"),
    (ModelVersion::QwenImage, "qwen_image", "Qwen"),
    (ModelVersion::ZImage, "z_image", "Z Image"),
    (ModelVersion::Flux2, "flux2", "F2"),
];

impl ModelVersion {
    /// The identifier used in model catalogs.
    pub fn as_str(&self) -> &str {
        match self {
            ModelVersion::Other(s) => s,
            known => KNOWN
                .iter()
                .find(|(v, _, _)| v == known)
                .map(|(_, id, _)| *id)
                .unwrap_or(""),
        }
    }

    /// Short tag shown next to model names in dropdowns, e.g. "F1".
    pub fn abbrev(&self) -> &str {
        match self {
            ModelVersion::Other(s) => s,
            known => KNOWN
                .iter()
                .find(|(v, _, _)| v == known)
                .map(|(_, _, abbrev)| *abbrev)
                .unwrap_or(""),
        }
    }

    pub fn is_sdxl(&self) -> bool {
        self.as_str().starts_with("sdxl")
    }

    pub fn is_wan(&self) -> bool {
        self.as_str().to_ascii_lowercase().starts_with("wan")
    }

    /// Video-generating variants, which expose a frame count.
    pub fn is_video(&self) -> bool {
        matches!(
            self,
            ModelVersion::HunyuanVideo
                | ModelVersion::Wan21_1_3b
                | ModelVersion::Wan21_14b
                | ModelVersion::SvdI2v
        )
    }
}

impl FromStr for ModelVersion {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(KNOWN
            .iter()
            .find(|(_, id, _)| *id == s)
            .map(|(v, _, _)| v.clone())
            .unwrap_or_else(|| ModelVersion::Other(s.to_string())))
    }
}

impl From<&str> for ModelVersion {
    fn from(s: &str) -> Self {
        match s.parse() {
            Ok(v) => v,
            Err(never) => match never {},
        }
    }
}

impl fmt::Display for ModelVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ModelVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ModelVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(ModelVersion::from(s.as_str()))
    }
}
