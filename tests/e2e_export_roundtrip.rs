//! Export → import round-trip tests.
//!
//! A fully configured graph is exported, the document is imported into a
//! fresh graph of the same shape, and every mapped field must come back
//! equal (numbers within 1e-5).

use dt_config_bridge::host::relation;
use dt_config_bridge::{
    BridgeMode, ChainKind, ConfigBridge, EngineConfig, MemoryHost, ModelCatalog, ModelOption,
    NodeId, NodeType, Registry, Value,
};
use pretty_assertions::assert_eq;

fn catalog() -> ModelCatalog {
    ModelCatalog {
        models: vec![
            ModelOption::new("SDXL Base", "sd_xl_base_1.0_f16.ckpt")
                .with_version("sdxl_base_v0.9"),
            ModelOption::new("SDXL Refiner", "sd_xl_refiner_1.0_f16.ckpt")
                .with_version("sdxl_refiner_v0.9"),
        ],
        loras: vec![
            ModelOption::new("Detail", "detail.ckpt"),
            ModelOption::new("Film", "film.ckpt"),
            ModelOption::new("Ink", "ink.ckpt"),
        ],
        control_nets: vec![
            ModelOption::new("IP Adapter Plus", "ip_adapter_plus_xl.ckpt")
                .with_kind("ipadapterplus")
                .with_version("sdxl_base_v0.9"),
        ],
        upscalers: vec![ModelOption::new("Real-ESRGAN X2+", "realesrgan_x2plus_f16.ckpt")],
        ..Default::default()
    }
}

struct Graph {
    sampler: NodeId,
    lora: NodeId,
    control: NodeId,
    upscaler: NodeId,
    refiner: NodeId,
}

fn graph(host: &MemoryHost) -> Graph {
    let g = Graph {
        sampler: host.add_node(NodeType::Sampler),
        lora: host.add_node(NodeType::Lora),
        control: host.add_node(NodeType::ControlNet),
        upscaler: host.add_node(NodeType::Upscaler),
        refiner: host.add_node(NodeType::Refiner),
    };
    host.link(g.sampler, relation::LORA, g.lora);
    host.link(g.sampler, relation::CONTROL_NET, g.control);
    host.link(g.sampler, relation::UPSCALER, g.upscaler);
    host.link(g.sampler, relation::REFINER, g.refiner);
    g
}

fn bridge(host: MemoryHost) -> ConfigBridge<MemoryHost> {
    host.register_catalog("localhost", 7859, true, catalog());
    let config = EngineConfig {
        bridge_mode: BridgeMode { enabled: false, ..Default::default() },
        ..Default::default()
    };
    ConfigBridge::with_config(host, config)
}

fn model(file: &str) -> Value {
    let catalog = catalog();
    let found = [&catalog.models, &catalog.loras, &catalog.control_nets, &catalog.upscalers]
        .into_iter()
        .flatten()
        .find(|m| m.file == file)
        .cloned()
        .unwrap();
    Value::from(found)
}

/// Populate the source graph through the host, the way a user would.
fn configure(host: &MemoryHost, g: &Graph) {
    let set = |node: NodeId, field: &str, value: Value| {
        use dt_config_bridge::GraphHost;
        host.set_field_value(node, field, value).unwrap();
    };
    set(g.sampler, "model", model("sd_xl_base_1.0_f16.ckpt"));
    set(g.sampler, "width", Value::Int(832));
    set(g.sampler, "height", Value::Int(1216));
    set(g.sampler, "steps", Value::Int(28));
    set(g.sampler, "cfg", Value::Float(6.5));
    set(g.sampler, "seed", Value::Int(123_456_789));
    set(g.sampler, "sampler_name", Value::from("DPM++ SDE Karras"));
    set(g.sampler, "seed_mode", Value::from("NvidiaGpuCompatible"));
    set(g.sampler, "strength", Value::Float(0.75));
    set(g.sampler, "res_dpt_shift", Value::Bool(false));
    set(g.sampler, "shift", Value::Float(2.25));
    set(g.sampler, "clip_skip", Value::Int(2));
    set(g.sampler, "high_res_fix", Value::Bool(true));
    set(g.sampler, "high_res_fix_start_width", Value::Int(640));
    set(g.sampler, "high_res_fix_start_height", Value::Int(896));
    set(g.sampler, "high_res_fix_strength", Value::Float(0.55));
    set(g.sampler, "tiled_decoding", Value::Bool(true));
    set(g.sampler, "decoding_tile_width", Value::Int(1024));
    set(g.sampler, "separate_clip_l", Value::Bool(true));
    set(g.sampler, "clip_l_text", Value::from("a watercolor fox"));
    set(g.sampler, "tea_cache", Value::Bool(true));
    set(g.sampler, "tea_cache_threshold", Value::Float(0.2));
    set(g.sampler, "causal_inference", Value::Int(9));
    set(g.sampler, "causal_inference_pad", Value::Int(8));
    set(g.sampler, "cfg_zero_star", Value::Bool(true));
    set(g.sampler, "cfg_zero_star_init_steps", Value::Int(3));

    set(g.lora, "lora_count", Value::Int(3));
    set(g.lora, "lora", model("detail.ckpt"));
    set(g.lora, "weight", Value::Float(0.6));
    set(g.lora, "lora_2", model("film.ckpt"));
    set(g.lora, "weight_2", Value::Float(-1.25));
    set(g.lora, "mode_2", Value::from("Refiner"));
    set(g.lora, "lora_3", model("ink.ckpt"));
    set(g.lora, "mode_3", Value::from("Base"));

    set(g.control, "control_name", model("ip_adapter_plus_xl.ckpt"));
    set(g.control, "control_weight", Value::Float(0.8));
    set(g.control, "control_start", Value::Float(0.1));
    set(g.control, "control_end", Value::Float(0.9));
    set(g.control, "down_sampling_rate", Value::Float(0.5));
    set(g.control, "control_input_type", Value::from("Depth"));
    set(g.control, "control_mode", Value::from("Prompt"));
    set(g.control, "global_average_pooling", Value::Bool(true));
    set(g.control, "target_blocks", Value::from("Style"));

    set(g.upscaler, "upscaler_model", model("realesrgan_x2plus_f16.ckpt"));
    set(g.upscaler, "upscaler_scale_factor", Value::Int(2));
    set(g.refiner, "refiner_model", model("sd_xl_refiner_1.0_f16.ckpt"));
    set(g.refiner, "refiner_start", Value::Float(0.6));
}

fn same(a: Option<Value>, b: Option<Value>) -> bool {
    match (&a, &b) {
        (Some(Value::Model(x)), Some(Value::Model(y))) => x.file == y.file,
        (Some(x), Some(y)) => match (x.as_float(), y.as_float()) {
            (Some(x), Some(y)) => (x - y).abs() < 1e-5,
            _ => x == y,
        },
        _ => a == b,
    }
}

fn assert_fields_match(
    src: &MemoryHost,
    src_node: NodeId,
    dst: &MemoryHost,
    dst_node: NodeId,
    fields: &[String],
) {
    for field in fields {
        let (a, b) = (src.value(src_node, field), dst.value(dst_node, field));
        assert!(same(a.clone(), b.clone()), "{field}: {a:?} != {b:?}");
    }
}

#[tokio::test]
async fn test_round_trip_every_mapped_field() {
    let source = bridge(MemoryHost::new());
    let src = graph(source.host());
    configure(source.host(), &src);

    let exported = source.export_config(src.sampler).unwrap();

    let target = bridge(MemoryHost::new());
    let dst = graph(target.host());
    let report = target
        .import_config(dst.sampler, &exported.to_string())
        .await
        .unwrap();
    assert!(report.missing.is_empty());
    assert_eq!(report.correction_count(), 0);

    let registry = Registry::global();
    for node_type in [NodeType::Sampler, NodeType::Upscaler, NodeType::Refiner] {
        let (s, d) = match node_type {
            NodeType::Sampler => (src.sampler, dst.sampler),
            NodeType::Upscaler => (src.upscaler, dst.upscaler),
            _ => (src.refiner, dst.refiner),
        };
        let fields: Vec<String> = registry
            .find_by_owner_type(node_type)
            .filter_map(|d| d.field_name.map(str::to_string))
            .collect();
        assert_fields_match(source.host(), s, target.host(), d, &fields);
    }

    let slot_fields = |kind: ChainKind, slots: usize| -> Vec<String> {
        (0..slots)
            .flat_map(|slot| kind.slot_fields().iter().map(move |f| f.field_name(slot)))
            .collect()
    };
    let mut lora_fields = slot_fields(ChainKind::Lora, 3);
    lora_fields.push("lora_count".into());
    assert_fields_match(source.host(), src.lora, target.host(), dst.lora, &lora_fields);
    assert_fields_match(
        source.host(),
        src.control,
        target.host(),
        dst.control,
        &slot_fields(ChainKind::ControlNet, 1),
    );

    // exporting the copy gives the same document
    assert_eq!(target.export_config(dst.sampler).unwrap(), exported);
}

#[tokio::test]
async fn test_exported_document_shape() {
    let source = bridge(MemoryHost::new());
    let src = graph(source.host());
    configure(source.host(), &src);

    let doc = source.export_config(src.sampler).unwrap();
    assert_eq!(doc["model"], "sd_xl_base_1.0_f16.ckpt");
    assert_eq!(doc["sampler"], 4);
    assert_eq!(doc["seedMode"], 3);
    assert_eq!(doc["causalInference"], 3);
    assert_eq!(doc["upscaler"], "realesrgan_x2plus_f16.ckpt");
    assert_eq!(doc["refinerStart"], 0.6);
    assert_eq!(
        doc["loras"],
        serde_json::json!([
            {"file": "detail.ckpt", "weight": 0.6, "mode": "all"},
            {"file": "film.ckpt", "weight": -1.25, "mode": "refiner"},
            {"file": "ink.ckpt", "weight": 1.0, "mode": "base"},
        ])
    );
    let control = &doc["controls"][0];
    assert_eq!(control["file"], "ip_adapter_plus_xl.ckpt");
    assert_eq!(control["inputOverride"], "depth");
    assert_eq!(control["controlImportance"], "prompt");
    assert_eq!(control["targetBlocks"], serde_json::json!(["up_blocks.0.attentions.1"]));
}
