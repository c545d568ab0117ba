//! Sampler node: display-mode groups, per-variant availability, dependent
//! sub-fields, and the derived resolution-dependent shift.

use crate::Result;
use crate::access::NodeProxy;
use crate::model::{FieldMap, ModelVersion, NodeType, Value, field_map};
use crate::registry::lists::SETTINGS_MODES;
use crate::registry::{Condition, Registry};

use super::{HasDynamicFields, calc_shift};

/// Fields shown in "Basic" (and "All") display mode.
const BASIC_FIELDS: &[&str] = &[
    "server",
    "port",
    "use_tls",
    "strength",
    "seed",
    "control_after_generate",
    "width",
    "height",
    "steps",
    "cfg",
    "sampler_name",
    "stochastic_sampling_gamma",
    "res_dpt_shift",
    "shift",
    "batch_size",
    "num_frames",
    "cfg_zero_star",
    "cfg_zero_star_init_steps",
];

/// Fields shown in "Advanced" (and "All") display mode.
const ADVANCED_FIELDS: &[&str] = &[
    "seed_mode",
    "speed_up",
    "guidance_embed",
    "fps",
    "motion_scale",
    "guiding_frame_noise",
    "start_frame_guidance",
    "causal_inference",
    "causal_inference_pad",
    "clip_skip",
    "sharpness",
    "mask_blur",
    "mask_blur_outset",
    "preserve_original",
    "separate_clip_l",
    "clip_l_text",
    "separate_open_clip_g",
    "open_clip_g_text",
    "high_res_fix",
    "high_res_fix_start_width",
    "high_res_fix_start_height",
    "high_res_fix_strength",
    "image_guidance_scale",
    "tiled_decoding",
    "decoding_tile_width",
    "decoding_tile_height",
    "decoding_tile_overlap",
    "tiled_diffusion",
    "diffusion_tile_width",
    "diffusion_tile_height",
    "diffusion_tile_overlap",
    "tea_cache",
    "tea_cache_start",
    "tea_cache_end",
    "tea_cache_threshold",
    "tea_cache_max_skip_steps",
];

/// Which model variants a field is meaningful for.
enum Availability {
    Variants(&'static [&'static str]),
    /// Any variant whose id starts with "wan".
    WanFamily,
    /// Variants that generate video.
    Video,
}

const FLUX_SD3_HIDREAM_QWEN: &[&str] = &["flux1", "sd3", "hidream_i1", "qwen_image"];
const CFG_ZERO_STAR: &[&str] = &[
    "flux1",
    "hidream_i1",
    "wan_v2.1_1.3b",
    "wan_v2.1_14b",
    "sd3",
    "hunyuan_video",
    "qwen_image",
];
const TEA_CACHE: &[&str] =
    &["flux1", "hidream_i1", "wan_v2.1_1.3b", "wan_v2.1_14b", "hunyuan_video"];
const GUIDANCE_EMBED: &[&str] = &["flux1", "hidream_i1", "hunyuan_video"];
const CLIP_L: &[&str] = &["flux1", "hidream_i1", "sd3"];
const SVD: &[&str] = &["svd_i2v"];

const AVAILABILITY: &[(&str, Availability)] = &[
    ("res_dpt_shift", Availability::Variants(FLUX_SD3_HIDREAM_QWEN)),
    ("num_frames", Availability::Video),
    ("cfg_zero_star", Availability::Variants(CFG_ZERO_STAR)),
    ("tea_cache", Availability::Variants(TEA_CACHE)),
    ("speed_up", Availability::Variants(GUIDANCE_EMBED)),
    ("separate_clip_l", Availability::Variants(CLIP_L)),
    ("separate_open_clip_g", Availability::Variants(&["sd3"])),
    ("fps", Availability::Variants(SVD)),
    ("motion_scale", Availability::Variants(SVD)),
    ("guiding_frame_noise", Availability::Variants(SVD)),
    ("start_frame_guidance", Availability::Variants(SVD)),
    ("causal_inference", Availability::WanFamily),
    ("causal_inference_pad", Availability::WanFamily),
];

/// What a visibility decision reads.
struct SamplerState<'a> {
    fields: &'a FieldMap,
    variant: Option<&'a ModelVersion>,
    basic: bool,
    advanced: bool,
}

impl SamplerState<'_> {
    fn in_group(&self, field: &str) -> bool {
        if BASIC_FIELDS.contains(&field) {
            self.basic
        } else if ADVANCED_FIELDS.contains(&field) {
            self.advanced
        } else {
            true
        }
    }

    fn available(&self, field: &str) -> bool {
        let Some((_, rule)) = AVAILABILITY.iter().find(|(name, _)| *name == field) else {
            return true;
        };
        let Some(variant) = self.variant else {
            return false;
        };
        match rule {
            Availability::Variants(ids) => ids.contains(&variant.as_str()),
            Availability::WanFamily => variant.is_wan(),
            Availability::Video => variant.is_video(),
        }
    }

    /// The field's own dependency on a parent field of the same node.
    fn condition_met(&self, field: &str) -> bool {
        let registry = Registry::global();
        let Some(condition) = registry
            .find_field(NodeType::Sampler, field)
            .and_then(|d| d.condition)
        else {
            return true;
        };
        let Some(parent) = registry
            .find_by_external_key(condition.parent())
            .and_then(|d| d.field_name)
        else {
            return true;
        };
        if !self.visible(parent) {
            return false;
        }
        let value = self.fields.get(parent);
        match condition {
            Condition::IfTrue(_) => value.is_some_and(Value::is_truthy),
            Condition::IfFalse(_) => !value.is_some_and(Value::is_truthy),
            Condition::IfEquals(_, option) => value.and_then(Value::as_str) == Some(option),
        }
    }

    fn visible(&self, field: &str) -> bool {
        self.in_group(field) && self.available(field) && self.condition_met(field)
    }

    /// Shift is derived from the image size while resolution-dependent
    /// shift is available and on.
    fn shift_is_derived(&self) -> bool {
        self.available("res_dpt_shift") && field_map::truthy(self.fields, "res_dpt_shift")
    }
}

/// Dynamic-field handler of `DrawThingsSampler`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SamplerFields;

impl SamplerFields {
    /// The visibility every field of the node should have, by name.
    pub fn compute(fields: &FieldMap, variant: Option<&ModelVersion>) -> Vec<(String, bool)> {
        // an unrecognised mode reads as the first one
        let settings = fields
            .get("settings")
            .and_then(Value::as_str)
            .filter(|s| SETTINGS_MODES.contains(s))
            .unwrap_or(SETTINGS_MODES[0]);
        let state = SamplerState {
            fields,
            variant,
            basic: matches!(settings, "Basic" | "All"),
            advanced: matches!(settings, "Advanced" | "All"),
        };
        let mut names: Vec<&String> = fields.keys().collect();
        names.sort();
        names
            .into_iter()
            .map(|name| (name.clone(), state.visible(name)))
            .collect()
    }
}

impl HasDynamicFields for SamplerFields {
    fn node_type(&self) -> NodeType {
        NodeType::Sampler
    }

    fn update_dynamic_fields(&self, node: &NodeProxy<'_>) -> Result<()> {
        let mut fields = node.snapshot()?;
        let variant = node.variant()?;

        let derived = SamplerState {
            fields: &fields,
            variant: variant.as_ref(),
            basic: false,
            advanced: false,
        }
        .shift_is_derived();

        if derived {
            let height = fields.get("height").and_then(Value::as_float);
            let width = fields.get("width").and_then(Value::as_float);
            if let (Some(height), Some(width)) = (height, width) {
                let shift = Value::Float(calc_shift(height, width));
                if fields.get("shift").is_some_and(|s| !s.same_as(&shift)) {
                    node.set("shift", shift.clone())?;
                    fields.insert("shift".into(), shift);
                }
            }
        }
        node.disable("shift", derived)?;

        for (name, visible) in Self::compute(&fields, variant.as_ref()) {
            node.show(&name, visible)?;
        }
        Ok(())
    }
}
