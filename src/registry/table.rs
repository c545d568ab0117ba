//! The descriptor table.
//!
//! Properties are listed in import order: flags that other importers read
//! (`hiresFix`, `resolutionDependentShift`...) come after the values they
//! may override.

use crate::model::{ModelKind, NodeType};

use super::lists::{
    CONTROL_INPUT_TYPES, CONTROL_MODES, LORA_MODES, SAMPLERS, SEED_MODES, TARGET_BLOCKS,
};
use super::{
    ChainKind, Condition, Exporter, Importer, MaxBound, PropertyDescriptor, Requirement,
    SlotCodec, SlotField, ValueKind,
};

const NUM_FRAMES_MAX: &[(&str, f64)] = &[
    ("wan_v2.1_1.3b", 129.0),
    ("wan_v2.1_14b", 129.0),
    ("hunyuan_video", 201.0),
    ("svd_i2v", 25.0),
];

// ============================================================================
// Builders
// ============================================================================

fn property(key: &'static str, field: &'static str, kind: ValueKind) -> PropertyDescriptor {
    PropertyDescriptor {
        external_key: key,
        field_name: Some(field),
        owner: Some(NodeType::Sampler),
        kind,
        condition: None,
        gate_import: false,
        importer: None,
        exporter: None,
        requirement: Requirement::WhenPresent,
    }
}

fn int(
    key: &'static str,
    field: &'static str,
    default: i64,
    min: f64,
    max: MaxBound,
    step: f64,
) -> PropertyDescriptor {
    property(key, field, ValueKind::Int { default, min: Some(min), max, step })
}

fn float(
    key: &'static str,
    field: &'static str,
    default: f64,
    min: f64,
    max: f64,
    step: f64,
) -> PropertyDescriptor {
    let max = MaxBound::Fixed(max);
    property(key, field, ValueKind::Float { default, min: Some(min), max, step })
}

fn flag(key: &'static str, field: &'static str, default: bool) -> PropertyDescriptor {
    property(key, field, ValueKind::Bool { default })
}

fn text(key: &'static str, field: &'static str) -> PropertyDescriptor {
    property(key, field, ValueKind::Text { default: "" })
}

fn choice(
    key: &'static str,
    field: &'static str,
    values: &'static [&'static str],
    default_index: usize,
) -> PropertyDescriptor {
    property(key, field, ValueKind::EnumIndex { values, default_index })
        .import_with(Importer::EnumByIndex)
        .export_with(Exporter::EnumIndex)
}

fn model(key: &'static str, field: &'static str, kind: ModelKind) -> PropertyDescriptor {
    property(key, field, ValueKind::ModelReference { kind })
        .import_with(Importer::ModelByFile)
        .export_with(Exporter::ModelFile)
}

fn chain(key: &'static str, chain: ChainKind) -> PropertyDescriptor {
    PropertyDescriptor {
        external_key: key,
        field_name: None,
        owner: None,
        kind: ValueKind::OpaqueArray { chain },
        condition: None,
        gate_import: false,
        importer: None,
        exporter: None,
        requirement: Requirement::WhenPresent,
    }
}

fn fixed(max: f64) -> MaxBound {
    MaxBound::Fixed(max)
}

impl PropertyDescriptor {
    fn on(mut self, owner: NodeType) -> Self {
        self.owner = Some(owner);
        self
    }

    fn import_with(mut self, importer: Importer) -> Self {
        self.importer = Some(importer);
        self
    }

    fn export_with(mut self, exporter: Exporter) -> Self {
        self.exporter = Some(exporter);
        self
    }

    fn when(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }

    /// Shown only when `parent` is true, and imported only when the document
    /// sets `parent` too.
    fn gated_by(mut self, parent: &'static str) -> Self {
        self.condition = Some(Condition::IfTrue(parent));
        self.gate_import = true;
        self
    }

    fn required_when_truthy(mut self) -> Self {
        self.requirement = Requirement::WhenTruthy;
        self
    }

    fn never_required(mut self) -> Self {
        self.requirement = Requirement::Never;
        self
    }
}

// ============================================================================
// Table
// ============================================================================

pub(super) fn descriptors() -> Vec<PropertyDescriptor> {
    use Condition::*;
    use Importer::*;

    vec![
        int("width", "width", 512, 128.0, fixed(2048.0), 64.0).import_with(RoundTo64),
        int("height", "height", 512, 128.0, fixed(2048.0), 64.0).import_with(RoundTo64),
        int("seed", "seed", -1, -1.0, fixed(4_294_967_295.0), 1.0).import_with(NonNegative),
        int("steps", "steps", 16, 1.0, fixed(150.0), 1.0),
        float("guidanceScale", "cfg", 5.0, 0.0, 50.0, 0.1),
        float("strength", "strength", 1.0, 0.0, 1.0, 0.01),
        model("model", "model", ModelKind::Models),
        choice("sampler", "sampler_name", SAMPLERS, 0),
        int("batchCount", "batch_count", 1, 1.0, fixed(4.0), 1.0),
        int("batchSize", "batch_size", 1, 1.0, fixed(1.0), 1.0),
        flag("hiresFix", "high_res_fix", false),
        int("hiresFixWidth", "high_res_fix_start_width", 512, 128.0, fixed(2048.0), 64.0)
            .import_with(RoundTo64)
            .gated_by("hiresFix"),
        int("hiresFixHeight", "high_res_fix_start_height", 512, 128.0, fixed(2048.0), 64.0)
            .import_with(RoundTo64)
            .gated_by("hiresFix"),
        float("hiresFixStrength", "high_res_fix_strength", 0.7, 0.0, 1.0, 0.01)
            .gated_by("hiresFix"),
        float("imageGuidanceScale", "image_guidance_scale", 5.0, 0.0, 50.0, 0.1),
        choice("seedMode", "seed_mode", SEED_MODES, 2).import_with(EnumByIndexOrKeep),
        int("clipSkip", "clip_skip", 1, 1.0, fixed(23.0), 1.0),
        chain("controls", ChainKind::ControlNet),
        chain("loras", ChainKind::Lora),
        float("maskBlur", "mask_blur", 2.5, 0.0, 15.0, 0.1),
        int("fps", "fps", 12, 1.0, fixed(30.0), 1.0),
        int("motionScale", "motion_scale", 127, 0.0, fixed(255.0), 1.0),
        float("guidingFrameNoise", "guiding_frame_noise", 0.02, 0.0, 1.0, 0.01),
        float("startFrameGuidance", "start_frame_guidance", 1.0, 0.0, 15.0, 0.1),
        int(
            "numFrames",
            "num_frames",
            25,
            1.0,
            MaxBound::PerVariant { table: NUM_FRAMES_MAX, fallback: 201.0 },
            1.0,
        ),
        float("maskBlurOutset", "mask_blur_outset", 0.0, -100.0, 100.0, 0.1),
        float("sharpness", "sharpness", 0.0, 0.0, 30.0, 0.1),
        float("shift", "shift", 1.0, 0.0, 16.0, 0.01),
        flag("tiledDecoding", "tiled_decoding", false),
        int("decodingTileWidth", "decoding_tile_width", 512, 128.0, fixed(2048.0), 64.0)
            .import_with(RoundTo64)
            .gated_by("tiledDecoding"),
        int("decodingTileHeight", "decoding_tile_height", 512, 128.0, fixed(2048.0), 64.0)
            .import_with(RoundTo64)
            .gated_by("tiledDecoding"),
        int("decodingTileOverlap", "decoding_tile_overlap", 512, 64.0, fixed(1024.0), 64.0)
            .import_with(RoundTo64)
            .gated_by("tiledDecoding"),
        float("stochasticSamplingGamma", "stochastic_sampling_gamma", 0.3, 0.0, 1.0, 0.01)
            .when(IfEquals("sampler", "TCD")),
        flag("preserveOriginalAfterInpaint", "preserve_original", true),
        flag("tiledDiffusion", "tiled_diffusion", false),
        int("diffusionTileWidth", "diffusion_tile_width", 512, 128.0, fixed(2048.0), 64.0)
            .import_with(RoundTo64)
            .gated_by("tiledDiffusion"),
        int("diffusionTileHeight", "diffusion_tile_height", 512, 128.0, fixed(2048.0), 64.0)
            .import_with(RoundTo64)
            .gated_by("tiledDiffusion"),
        int("diffusionTileOverlap", "diffusion_tile_overlap", 512, 64.0, fixed(1024.0), 64.0)
            .import_with(RoundTo64)
            .gated_by("tiledDiffusion"),
        flag("separateClipL", "separate_clip_l", false),
        text("clipLText", "clip_l_text").when(IfTrue("separateClipL")),
        flag("separateOpenClipG", "separate_open_clip_g", false),
        text("openClipGText", "open_clip_g_text").when(IfTrue("separateOpenClipG")),
        flag("speedUpWithGuidanceEmbed", "speed_up", true),
        float("guidanceEmbed", "guidance_embed", 4.5, 0.0, 50.0, 0.1)
            .when(IfFalse("speedUpWithGuidanceEmbed")),
        flag("resolutionDependentShift", "res_dpt_shift", true).import_with(ResolutionShift),
        flag("teaCache", "tea_cache", false),
        int("teaCacheStart", "tea_cache_start", 5, 0.0, fixed(150.0), 1.0).when(IfTrue("teaCache")),
        int("teaCacheEnd", "tea_cache_end", -1, -151.0, fixed(150.0), 1.0).when(IfTrue("teaCache")),
        float("teaCacheThreshold", "tea_cache_threshold", 0.06, 0.0, 1.0, 0.01)
            .when(IfTrue("teaCache")),
        int("teaCacheMaxSkipSteps", "tea_cache_max_skip_steps", 3, 1.0, fixed(50.0), 1.0)
            .when(IfTrue("teaCache")),
        int("causalInference", "causal_inference", 0, 0.0, fixed(129.0), 4.0)
            .import_with(CausalInference)
            .export_with(Exporter::CausalInference),
        int("causalInferencePad", "causal_inference_pad", 0, 0.0, fixed(129.0), 4.0)
            .import_with(CausalInferencePad)
            .export_with(Exporter::CausalInferencePad),
        model("upscaler", "upscaler_model", ModelKind::Upscalers)
            .on(NodeType::Upscaler)
            .required_when_truthy(),
        int("upscalerScaleFactor", "upscaler_scale_factor", 4, 2.0, fixed(4.0), 2.0)
            .on(NodeType::Upscaler)
            .import_with(ScaleFactor)
            .never_required(),
        model("refinerModel", "refiner_model", ModelKind::Models)
            .on(NodeType::Refiner)
            .required_when_truthy(),
        property(
            "refinerStart",
            "refiner_start",
            ValueKind::Float { default: 0.85, min: Some(0.0), max: fixed(1.0), step: 0.01 },
        )
        .on(NodeType::Refiner)
        .import_with(UnitClamp)
        .never_required(),
        flag("cfgZeroStar", "cfg_zero_star", false),
        int("cfgZeroInitSteps", "cfg_zero_star_init_steps", 0, 0.0, MaxBound::Field("steps"), 1.0)
            .when(IfTrue("cfgZeroStar")),
    ]
}

// ============================================================================
// Chain slots
// ============================================================================

pub(super) const LORA_SLOT_FIELDS: &[SlotField] = &[
    SlotField {
        sub_key: "file",
        stem: "lora",
        kind: ValueKind::ModelReference { kind: ModelKind::Loras },
        codec: SlotCodec::ModelByFile,
    },
    SlotField {
        sub_key: "weight",
        stem: "weight",
        kind: ValueKind::Float {
            default: 1.0,
            min: Some(-5.0),
            max: MaxBound::Fixed(5.0),
            step: 0.01,
        },
        codec: SlotCodec::Direct,
    },
    SlotField {
        sub_key: "mode",
        stem: "mode",
        kind: ValueKind::EnumIndex { values: LORA_MODES, default_index: 0 },
        codec: SlotCodec::Capitalized,
    },
];

pub(super) const CONTROL_SLOT_FIELDS: &[SlotField] = &[
    SlotField {
        sub_key: "file",
        stem: "control_name",
        kind: ValueKind::ModelReference { kind: ModelKind::ControlNets },
        codec: SlotCodec::ModelByFile,
    },
    SlotField {
        sub_key: "inputOverride",
        stem: "control_input_type",
        kind: ValueKind::EnumIndex { values: CONTROL_INPUT_TYPES, default_index: 0 },
        codec: SlotCodec::Capitalized,
    },
    SlotField {
        sub_key: "controlImportance",
        stem: "control_mode",
        kind: ValueKind::EnumIndex { values: CONTROL_MODES, default_index: 0 },
        codec: SlotCodec::Capitalized,
    },
    SlotField {
        sub_key: "weight",
        stem: "control_weight",
        kind: ValueKind::Float {
            default: 1.0,
            min: Some(0.0),
            max: MaxBound::Fixed(2.5),
            step: 0.01,
        },
        codec: SlotCodec::Direct,
    },
    SlotField {
        sub_key: "guidanceStart",
        stem: "control_start",
        kind: ValueKind::Float {
            default: 0.0,
            min: Some(0.0),
            max: MaxBound::Fixed(1.0),
            step: 0.01,
        },
        codec: SlotCodec::Direct,
    },
    SlotField {
        sub_key: "guidanceEnd",
        stem: "control_end",
        kind: ValueKind::Float {
            default: 1.0,
            min: Some(0.0),
            max: MaxBound::Fixed(1.0),
            step: 0.01,
        },
        codec: SlotCodec::Direct,
    },
    SlotField {
        sub_key: "downSamplingRate",
        stem: "down_sampling_rate",
        kind: ValueKind::Float {
            default: 1.0,
            min: Some(0.0),
            max: MaxBound::Fixed(1.0),
            step: 0.01,
        },
        codec: SlotCodec::Direct,
    },
    SlotField {
        sub_key: "globalAveragePooling",
        stem: "global_average_pooling",
        kind: ValueKind::Bool { default: false },
        codec: SlotCodec::Truthy,
    },
    SlotField {
        sub_key: "targetBlocks",
        stem: "target_blocks",
        kind: ValueKind::EnumIndex { values: TARGET_BLOCKS, default_index: 0 },
        codec: SlotCodec::TargetBlocks,
    },
];
