//! End-to-end tests for display flags, derived values and node lifecycle
//! hooks (`recompute`, `field_changed`, `configure_node`).

use dt_config_bridge::{
    ConfigBridge, EngineConfig, Error, GraphHost, MemoryHost, ModelOption, NodeId, NodeType,
    Notification, Value,
};
use pretty_assertions::assert_eq;

fn flux() -> Value {
    Value::from(ModelOption::new("FLUX.1 [dev]", "flux_1_dev_q8p.ckpt").with_version("flux1"))
}

fn sdxl() -> Value {
    let model = ModelOption::new("SDXL Base", "sd_xl_base_1.0_f16.ckpt");
    Value::from(model.with_version("sdxl_base_v0.9"))
}

fn sampler_with(fields: &[(&str, Value)]) -> (ConfigBridge<MemoryHost>, NodeId) {
    let host = MemoryHost::new();
    let sampler = host.add_node(NodeType::Sampler);
    for (name, value) in fields {
        host.set_field_value(sampler, name, value.clone()).unwrap();
    }
    (ConfigBridge::new(host), sampler)
}

// ============================================================================
// 1. Sampler
// ============================================================================

#[test]
fn test_recompute_is_idempotent() {
    let (bridge, sampler) = sampler_with(&[
        ("model", flux()),
        ("width", Value::Int(1024)),
        ("height", Value::Int(1024)),
        ("settings", Value::from("All")),
    ]);

    bridge.recompute(sampler).unwrap();
    let first = bridge.host().node(sampler).unwrap();
    bridge.recompute(sampler).unwrap();
    let second = bridge.host().node(sampler).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_flux_derives_shift_and_disables_it() {
    let (bridge, sampler) = sampler_with(&[
        ("model", flux()),
        ("width", Value::Int(1024)),
        ("height", Value::Int(1024)),
    ]);
    bridge.recompute(sampler).unwrap();

    let node = bridge.host().node(sampler).unwrap();
    assert_eq!(node.get("shift"), Some(&Value::Float(3.16)));
    assert!(node.is_disabled("shift"));
    assert!(node.is_visible("res_dpt_shift"));

    // a size edit moves the derived shift along
    bridge.host().set_field_value(sampler, "width", Value::Int(512)).unwrap();
    bridge.host().set_field_value(sampler, "height", Value::Int(512)).unwrap();
    bridge.field_changed(sampler, "width").unwrap();
    assert_eq!(bridge.host().value(sampler, "shift"), Some(Value::Float(1.88)));

    // switching the flag off hands shift back to the user
    bridge.host().set_field_value(sampler, "res_dpt_shift", Value::Bool(false)).unwrap();
    bridge.field_changed(sampler, "res_dpt_shift").unwrap();
    assert!(!bridge.host().node(sampler).unwrap().is_disabled("shift"));
}

#[test]
fn test_sdxl_hides_flux_only_fields() {
    let (bridge, sampler) = sampler_with(&[
        ("model", sdxl()),
        ("settings", Value::from("All")),
        ("width", Value::Int(1024)),
        ("height", Value::Int(1024)),
    ]);
    bridge.recompute(sampler).unwrap();

    let node = bridge.host().node(sampler).unwrap();
    assert!(!node.is_visible("res_dpt_shift"));
    assert!(!node.is_visible("tea_cache"));
    assert!(!node.is_visible("num_frames"));
    assert!(!node.is_disabled("shift"));
    assert_eq!(node.get("shift"), Some(&Value::Float(1.0)));
}

#[test]
fn test_display_modes_select_field_groups() {
    let (bridge, sampler) = sampler_with(&[("model", sdxl())]);

    bridge.recompute(sampler).unwrap();
    let node = bridge.host().node(sampler).unwrap();
    assert!(node.is_visible("steps"));
    assert!(!node.is_visible("seed_mode"));

    bridge.host().set_field_value(sampler, "settings", Value::from("Advanced")).unwrap();
    bridge.field_changed(sampler, "settings").unwrap();
    let node = bridge.host().node(sampler).unwrap();
    assert!(!node.is_visible("steps"));
    assert!(node.is_visible("seed_mode"));

    bridge.host().set_field_value(sampler, "settings", Value::from("All")).unwrap();
    bridge.field_changed(sampler, "settings").unwrap();
    let node = bridge.host().node(sampler).unwrap();
    assert!(node.is_visible("steps"));
    assert!(node.is_visible("seed_mode"));
}

#[test]
fn test_dependent_fields_follow_their_flag() {
    let (bridge, sampler) =
        sampler_with(&[("model", sdxl()), ("settings", Value::from("Advanced"))]);
    bridge.recompute(sampler).unwrap();
    assert!(!bridge.host().node(sampler).unwrap().is_visible("high_res_fix_start_width"));

    bridge.host().set_field_value(sampler, "high_res_fix", Value::Bool(true)).unwrap();
    bridge.field_changed(sampler, "high_res_fix").unwrap();
    assert!(bridge.host().node(sampler).unwrap().is_visible("high_res_fix_start_width"));
}

#[test]
fn test_guidance_embed_shown_when_speed_up_is_off() {
    let (bridge, sampler) = sampler_with(&[("model", flux()), ("settings", Value::from("All"))]);
    bridge.recompute(sampler).unwrap();
    assert!(!bridge.host().node(sampler).unwrap().is_visible("guidance_embed"));

    bridge.host().set_field_value(sampler, "speed_up", Value::Bool(false)).unwrap();
    bridge.field_changed(sampler, "speed_up").unwrap();
    assert!(bridge.host().node(sampler).unwrap().is_visible("guidance_embed"));
}

// ============================================================================
// 2. LoRA and control-net nodes
// ============================================================================

#[test]
fn test_set_lora_count_through_bridge() {
    let host = MemoryHost::new();
    let lora = host.add_node(NodeType::Lora);
    let sampler = host.add_node(NodeType::Sampler);
    let bridge = ConfigBridge::new(host);

    assert_eq!(bridge.set_lora_count(lora, 3).unwrap(), 3);
    let node = bridge.host().node(lora).unwrap();
    assert!(node.is_visible("weight_3"));
    assert!(!node.is_visible("weight_4"));
    assert_eq!(node.get("lora_3"), Some(&Value::from("(None selected)")));
    assert_eq!(node.get("lora_4"), Some(&Value::Null));

    assert_eq!(bridge.set_lora_count(lora, 20).unwrap(), 8);
    assert!(matches!(bridge.set_lora_count(sampler, 2), Err(Error::WrongNodeType { .. })));
}

#[test]
fn test_control_model_with_modifier_picks_input_type() {
    let host = MemoryHost::new();
    let control = host.add_node(NodeType::ControlNet);
    let bridge = ConfigBridge::new(host);

    let depth = ModelOption::new("Depth", "depth.ckpt").with_modifier("depth");
    bridge.host().set_field_value(control, "control_name", Value::from(depth)).unwrap();
    bridge.field_changed(control, "control_name").unwrap();

    let node = bridge.host().node(control).unwrap();
    assert_eq!(node.get("control_input_type"), Some(&Value::from("Depth")));
    assert!(!node.is_visible("control_input_type"));

    let union = ModelOption::new("Union", "union.ckpt")
        .with_modifier("canny")
        .with_kind("controlnetunion");
    bridge.host().set_field_value(control, "control_name", Value::from(union)).unwrap();
    bridge.field_changed(control, "control_name").unwrap();

    let node = bridge.host().node(control).unwrap();
    assert_eq!(node.get("control_input_type"), Some(&Value::from("Canny")));
    assert!(node.is_visible("control_input_type"));
}

#[test]
fn test_nodes_without_dynamic_fields_are_left_alone() {
    let host = MemoryHost::new();
    let upscaler = host.add_node(NodeType::Upscaler);
    let bridge = ConfigBridge::new(host);
    let before = bridge.host().node(upscaler).unwrap();
    bridge.recompute(upscaler).unwrap();
    assert_eq!(bridge.host().node(upscaler).unwrap(), before);
}

#[test]
fn test_unknown_node_is_reported() {
    let (bridge, _) = sampler_with(&[]);
    let err = bridge.recompute(NodeId(999)).unwrap_err();
    assert!(matches!(err, Error::NodeNotFound(NodeId(999))));
}

// ============================================================================
// 3. configure_node
// ============================================================================

#[test]
fn test_configure_node_corrects_and_notifies() {
    let (bridge, sampler) = sampler_with(&[
        ("steps", Value::Int(5000)),
        ("cfg", Value::Float(-3.0)),
    ]);

    let corrections = bridge.configure_node(sampler).unwrap();
    let names: Vec<_> = corrections.iter().map(|c| c.field_name.as_str()).collect();
    assert_eq!(names, ["steps", "cfg"]);
    assert_eq!(bridge.host().value(sampler, "steps"), Some(Value::Int(150)));
    assert_eq!(bridge.host().value(sampler, "cfg"), Some(Value::Float(0.0)));

    assert_eq!(
        bridge.host().notifications(),
        vec![Notification::Info(
            "The Draw Things Sampler node contained invalid values - they have been corrected:\n\n\
             steps: 5000 -> 150\ncfg: -3 -> 0"
                .into()
        )]
    );

    // a clean node is quiet
    assert!(bridge.configure_node(sampler).unwrap().is_empty());
    assert_eq!(bridge.host().notifications().len(), 1);
}

#[test]
fn test_configure_node_can_stay_silent() {
    let host = MemoryHost::new();
    let sampler = host.add_node(NodeType::Sampler);
    host.set_field_value(sampler, "width", Value::Int(100_000)).unwrap();
    let config = EngineConfig { notify_corrections: false, ..Default::default() };
    let bridge = ConfigBridge::with_config(host, config);

    assert_eq!(bridge.configure_node(sampler).unwrap().len(), 1);
    assert_eq!(bridge.host().value(sampler, "width"), Some(Value::Int(2048)));
    assert!(bridge.host().notifications().is_empty());
}
