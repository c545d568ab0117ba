//! Edge cases of the import pipeline: odd documents, odd graphs.

use dt_config_bridge::host::relation;
use dt_config_bridge::{
    ConfigBridge, Error, GraphHost, MemoryHost, NodeId, NodeType, Notification, Value,
};
use pretty_assertions::assert_eq;

fn bridge() -> (ConfigBridge<MemoryHost>, NodeId) {
    let host = MemoryHost::new();
    let sampler = host.add_node(NodeType::Sampler);
    (ConfigBridge::new(host), sampler)
}

fn loras(n: usize) -> String {
    let items: Vec<String> = (0..n).map(|i| format!(r#"{{"file": "l{i}.ckpt"}}"#)).collect();
    format!(r#"{{"loras": [{}]}}"#, items.join(","))
}

fn warnings(host: &MemoryHost) -> Vec<String> {
    host.notifications()
        .into_iter()
        .filter_map(|n| match n {
            Notification::Warning(m) => Some(m),
            _ => None,
        })
        .collect()
}

// ============================================================================
// 1. Documents
// ============================================================================

#[tokio::test]
async fn test_empty_document_changes_nothing() {
    let (bridge, sampler) = bridge();
    let before = bridge.host().node(sampler).unwrap().fields;

    let report = bridge.import_config(sampler, "{}").await.unwrap();
    assert!(report.applied_keys.is_empty());
    assert!(report.unknown_keys.is_empty());
    assert!(!report.is_partial());
    assert_eq!(bridge.host().node(sampler).unwrap().fields, before);
    assert!(bridge.host().notifications().is_empty());
}

#[tokio::test]
async fn test_unknown_keys_are_reported_and_skipped() {
    let (bridge, sampler) = bridge();
    let report = bridge
        .import_config(
            sampler,
            r#"{"faceRestoration": "gfpgan", "steps": 20, "zeroNegativePrompt": true}"#,
        )
        .await
        .unwrap();

    assert_eq!(report.unknown_keys, ["faceRestoration", "zeroNegativePrompt"]);
    assert_eq!(report.applied_keys, ["steps"]);
    assert_eq!(bridge.host().value(sampler, "steps"), Some(Value::Int(20)));
}

#[tokio::test]
async fn test_gated_properties_need_their_flag_in_the_document() {
    let (bridge, sampler) = bridge();

    bridge.import_config(sampler, r#"{"hiresFixWidth": 1024}"#).await.unwrap();
    assert_eq!(bridge.host().value(sampler, "high_res_fix_start_width"), Some(Value::Int(512)));

    bridge
        .import_config(sampler, r#"{"hiresFix": false, "hiresFixWidth": 1024}"#)
        .await
        .unwrap();
    assert_eq!(bridge.host().value(sampler, "high_res_fix_start_width"), Some(Value::Int(512)));

    bridge
        .import_config(sampler, r#"{"hiresFix": true, "hiresFixWidth": 1000}"#)
        .await
        .unwrap();
    assert_eq!(bridge.host().value(sampler, "high_res_fix_start_width"), Some(Value::Int(1024)));
}

#[tokio::test]
async fn test_declined_values_keep_the_field() {
    let (bridge, sampler) = bridge();
    let host = bridge.host();
    host.set_field_value(sampler, "seed", Value::Int(42)).unwrap();
    host.set_field_value(sampler, "seed_mode", Value::from("Legacy")).unwrap();

    let report = bridge
        .import_config(sampler, r#"{"seed": -5, "seedMode": 99}"#)
        .await
        .unwrap();
    assert!(report.applied_keys.is_empty());
    assert_eq!(host.value(sampler, "seed"), Some(Value::Int(42)));
    assert_eq!(host.value(sampler, "seed_mode"), Some(Value::from("Legacy")));
}

#[tokio::test]
async fn test_unknown_sampler_selects_the_default() {
    let (bridge, sampler) = bridge();
    let host = bridge.host();
    let karras = Some(Value::from("DPM++ 2M Karras"));

    host.set_field_value(sampler, "sampler_name", Value::from("Euler A")).unwrap();
    let report = bridge.import_config(sampler, r#"{"sampler": 99}"#).await.unwrap();
    assert_eq!(report.applied_keys, ["sampler"]);
    assert_eq!(host.value(sampler, "sampler_name"), karras);

    host.set_field_value(sampler, "sampler_name", Value::from("Euler A")).unwrap();
    bridge.import_config(sampler, r#"{"sampler": "NoSuch"}"#).await.unwrap();
    assert_eq!(host.value(sampler, "sampler_name"), karras);

    bridge.import_config(sampler, r#"{"sampler": 9}"#).await.unwrap();
    assert_eq!(host.value(sampler, "sampler_name"), Some(Value::from("TCD")));
    bridge.import_config(sampler, r#"{"sampler": "Euler A"}"#).await.unwrap();
    assert_eq!(host.value(sampler, "sampler_name"), Some(Value::from("Euler A")));
}

#[tokio::test]
async fn test_causal_inference_conversion() {
    let (bridge, sampler) = bridge();
    bridge
        .import_config(sampler, r#"{"causalInference": 3, "causalInferencePad": 2}"#)
        .await
        .unwrap();
    assert_eq!(bridge.host().value(sampler, "causal_inference"), Some(Value::Int(9)));
    assert_eq!(bridge.host().value(sampler, "causal_inference_pad"), Some(Value::Int(8)));

    bridge
        .import_config(sampler, r#"{"causalInference": "x", "causalInferencePad": "x"}"#)
        .await
        .unwrap();
    assert_eq!(bridge.host().value(sampler, "causal_inference"), Some(Value::Int(0)));
    assert_eq!(bridge.host().value(sampler, "causal_inference_pad"), Some(Value::Int(8)));
}

#[tokio::test]
async fn test_chain_value_that_is_not_a_list_is_ignored() {
    let host = MemoryHost::new();
    let sampler = host.add_node(NodeType::Sampler);
    let lora = host.add_node(NodeType::Lora);
    host.link(sampler, relation::LORA, lora);
    let bridge = ConfigBridge::new(host);
    let before = bridge.host().node(lora).unwrap();

    let report = bridge.import_config(sampler, r#"{"loras": "detail.ckpt"}"#).await.unwrap();
    assert!(report.chains.is_empty());
    assert!(!report.is_partial());
    assert_eq!(bridge.host().node(lora).unwrap(), before);
}

#[tokio::test]
async fn test_optional_models_only_need_a_node_when_set() {
    let (bridge, sampler) = bridge();
    let report = bridge
        .import_config(
            sampler,
            r#"{"upscaler": "", "upscalerScaleFactor": 2,
                "refinerModel": null, "refinerStart": 0.5}"#,
        )
        .await
        .unwrap();
    assert!(!report.is_partial());
    assert!(warnings(bridge.host()).is_empty());
}

#[tokio::test]
async fn test_refiner_start_is_clamped_to_unit_range() {
    let host = MemoryHost::new();
    let sampler = host.add_node(NodeType::Sampler);
    let refiner = host.add_node(NodeType::Refiner);
    host.link(sampler, relation::REFINER, refiner);
    let bridge = ConfigBridge::new(host);

    bridge
        .import_config(sampler, r#"{"refinerModel": "unknown.ckpt", "refinerStart": 1.7}"#)
        .await
        .unwrap();
    assert_eq!(bridge.host().value(refiner, "refiner_start"), Some(Value::Float(1.0)));
    // a file not in the catalog leaves the selection alone
    assert_eq!(bridge.host().value(refiner, "refiner_model"), Some(Value::from("(None selected)")));
}

// ============================================================================
// 2. Graphs
// ============================================================================

#[tokio::test]
async fn test_empty_list_clears_the_first_node() {
    let host = MemoryHost::new();
    let sampler = host.add_node(NodeType::Sampler);
    let first = host.add_node(NodeType::Lora);
    let second = host.add_node(NodeType::Lora);
    host.link(sampler, relation::LORA, first);
    host.link(first, relation::LORA_STACK, second);
    host.set_field_value(first, "weight", Value::Float(0.3)).unwrap();
    host.set_field_value(second, "weight", Value::Float(0.3)).unwrap();
    let bridge = ConfigBridge::new(host);

    let report = bridge.import_config(sampler, r#"{"loras": []}"#).await.unwrap();
    assert_eq!(report.chains[0].1.nodes_written, 1);

    let host = bridge.host();
    assert_eq!(host.value(first, "lora_count"), Some(Value::Int(0)));
    assert_eq!(host.value(first, "lora"), Some(Value::Null));
    assert_eq!(host.value(first, "weight"), Some(Value::Float(1.0)));
    assert_eq!(host.value(second, "weight"), Some(Value::Float(0.3)));
}

#[tokio::test]
async fn test_chain_with_a_cycle_stops_at_the_repeat() {
    let host = MemoryHost::new();
    let sampler = host.add_node(NodeType::Sampler);
    let a = host.add_node(NodeType::Lora);
    let b = host.add_node(NodeType::Lora);
    host.link(sampler, relation::LORA, a);
    host.link(a, relation::LORA_STACK, b);
    host.link(b, relation::LORA_STACK, a);
    let bridge = ConfigBridge::new(host);

    let report = bridge.import_config(sampler, &loras(20)).await.unwrap();
    let (_, outcome) = report.chains[0];
    assert_eq!(outcome.populated, 16);
    assert_eq!(outcome.nodes_written, 2);
    assert_eq!(outcome.missing_nodes, 1);
    assert!(warnings(bridge.host())[0].ends_with("• 1 x DrawThingsLoRA"));
}

#[tokio::test]
async fn test_chain_stops_at_a_foreign_node() {
    let host = MemoryHost::new();
    let sampler = host.add_node(NodeType::Sampler);
    let lora = host.add_node(NodeType::Lora);
    let foreign = host.add_foreign_node();
    let beyond = host.add_node(NodeType::Lora);
    host.link(sampler, relation::LORA, lora);
    host.link(lora, relation::LORA_STACK, foreign);
    host.link(foreign, relation::LORA_STACK, beyond);
    let bridge = ConfigBridge::new(host);

    let report = bridge.import_config(sampler, &loras(10)).await.unwrap();
    assert_eq!(report.chains[0].1.nodes_written, 1);
    assert_eq!(report.missing[0].count_needed, 1);
    assert_eq!(bridge.host().value(beyond, "lora_count"), Some(Value::Int(1)));
}

#[tokio::test]
async fn test_wrong_kind_on_the_upscaler_input_counts_as_missing() {
    let host = MemoryHost::new();
    let sampler = host.add_node(NodeType::Sampler);
    let refiner = host.add_node(NodeType::Refiner);
    host.link(sampler, relation::UPSCALER, refiner);
    let bridge = ConfigBridge::new(host);

    let report = bridge
        .import_config(sampler, r#"{"upscaler": "realesrgan_x4plus_f16.ckpt"}"#)
        .await
        .unwrap();
    assert_eq!(report.missing.len(), 1);
    assert_eq!(report.missing[0].to_string(), "DrawThingsUpscaler");
}

#[tokio::test]
async fn test_unknown_node_id() {
    let (bridge, _) = bridge();
    let err = bridge.import_config(NodeId(404), "{}").await.unwrap_err();
    assert!(matches!(err, Error::NodeNotFound(NodeId(404))));
    assert!(matches!(bridge.export_config(NodeId(404)), Err(Error::NodeNotFound(_))));
}
