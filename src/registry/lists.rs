//! Fixed option lists shared by the registry, the node definitions and the
//! server. Order matters: config documents refer to entries by index.

pub const SAMPLERS: &[&str] = &[
    "DPM++ 2M Karras",
    "Euler A",
    "DDIM",
    "PLMS",
    "DPM++ SDE Karras",
    "UniPC",
    "LCM",
    "Euler A Substep",
    "DPM++ SDE Substep",
    "TCD",
    "Euler A Trailing",
    "DPM++ SDE Trailing",
    "DPM++ 2M AYS",
    "Euler A AYS",
    "DPM++ SDE AYS",
    "DPM++ 2M Trailing",
    "DDIM Trailing",
    "UniPC Trailing",
    "UniPC AYS",
];

pub const SEED_MODES: &[&str] =
    &["Legacy", "TorchCpuCompatible", "ScaleAlike", "NvidiaGpuCompatible"];

/// Sampler display modes; gate the basic and advanced field groups.
pub const SETTINGS_MODES: &[&str] = &["Basic", "Advanced", "All"];

pub const LORA_MODES: &[&str] = &["All", "Base", "Refiner"];

pub const CONTROL_MODES: &[&str] = &["Balanced", "Prompt", "Control"];

pub const CONTROL_INPUT_TYPES: &[&str] = &[
    "Unspecified",
    "Custom",
    "Depth",
    "Canny",
    "Scribble",
    "Pose",
    "Normalbae",
    "Color",
    "Lineart",
    "Softedge",
    "Seg",
    "Inpaint",
    "Ip2p",
    "Shuffle",
    "Mlsd",
    "Tile",
    "Blur",
    "Lowquality",
    "Gray",
];

pub const TARGET_BLOCKS: &[&str] = &["All", "Style", "Style and Layout"];

/// Attention blocks sent for each target-block choice on SDXL models.
pub const SDXL_TARGET_BLOCKS: [&[&str]; 3] = [
    &[],
    &["up_blocks.0.attentions.1"],
    &["down_blocks.2.attentions.1", "up_blocks.0.attentions.1"],
];

/// Attention blocks sent for each target-block choice on SD 1.x models.
pub const V1_TARGET_BLOCKS: [&[&str]; 3] = [
    &[],
    &["up_blocks.1"],
    &["down_blocks.2", "mid_block", "up_blocks.1"],
];

/// Placeholder shown by a model dropdown with nothing chosen.
pub const NONE_SELECTED: &str = "(None selected)";

/// Uppercase the first character: `"depth"` → `"Depth"`.
pub fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Lowercase the first character: `"Depth"` → `"depth"`.
pub fn decapitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}
