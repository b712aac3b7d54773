//! End-to-end scenarios for the decomposition engine
//!
//! Each scenario drives the engine through the transport-agnostic
//! dispatcher, the same entry point the MCP server and CLI use.

use decomposer::core::DecompositionEngine;
use decomposer::mcp::tools::decompose::dispatch_value;
use decomposer::mcp::tools::ToolEnvelope;
use serde_json::{json, Map, Value};

fn run(engine: &mut DecompositionEngine, action: &str, args: Value) -> ToolEnvelope {
    dispatch_value(engine, action, args).unwrap()
}

fn ok(engine: &mut DecompositionEngine, action: &str, args: Value) -> ToolEnvelope {
    let envelope = run(engine, action, args);
    assert!(envelope.is_success(), "{} failed: {:?}", action, envelope);
    envelope
}

fn create_problem(engine: &mut DecompositionEngine, id: &str) {
    ok(
        engine,
        "createProblem",
        json!({"problemId": id, "problemStatement": format!("Problem {}", id)}),
    );
}

fn create_component(engine: &mut DecompositionEngine, id: &str, problem: &str, deps: &[&str]) {
    ok(
        engine,
        "createComponent",
        json!({
            "componentId": id,
            "parentProblemId": problem,
            "name": format!("Component {}", id),
            "description": "",
            "dependencies": deps,
        }),
    );
}

const METRIC_FIELDS: [&str; 5] = [
    "componentCount",
    "averageComplexity",
    "maxDepth",
    "dependencyCount",
    "balanceScore",
];

/// The metric fields of a calculateMetrics envelope, without `problemId`
fn metrics(engine: &mut DecompositionEngine, problem: &str) -> Value {
    let envelope = ok(engine, "calculateMetrics", json!({"problemId": problem}));
    assert_eq!(envelope.get("problemId"), Some(&json!(problem)));
    let fields: Map<String, Value> = METRIC_FIELDS
        .iter()
        .map(|name| (name.to_string(), envelope.get(name).cloned().unwrap()))
        .collect();
    Value::Object(fields)
}

/// p1 with c1 (no deps) and c2 depending on c1
fn two_component_chain() -> DecompositionEngine {
    let mut engine = DecompositionEngine::new();
    create_problem(&mut engine, "p1");
    create_component(&mut engine, "c1", "p1", &[]);
    create_component(&mut engine, "c2", "p1", &["c1"]);
    engine
}

// ============================================
// Metrics Scenarios
// ============================================

#[test]
fn test_metrics_of_empty_problem() {
    let mut engine = DecompositionEngine::new();
    create_problem(&mut engine, "p1");

    let m = metrics(&mut engine, "p1");
    assert_eq!(m["componentCount"], json!(0));
    assert_eq!(m["averageComplexity"], json!(0.0));
    assert_eq!(m["maxDepth"], json!(0));
    assert_eq!(m["dependencyCount"], json!(0));
    assert_eq!(m["balanceScore"], json!(10.0));
}

#[test]
fn test_metrics_of_two_component_chain() {
    let mut engine = two_component_chain();

    let m = metrics(&mut engine, "p1");
    assert_eq!(m["componentCount"], json!(2));
    assert_eq!(m["maxDepth"], json!(2));
    assert_eq!(m["dependencyCount"], json!(1));

    let balance = m["balanceScore"].as_f64().unwrap();
    assert!(balance < 10.0);
    assert!(balance >= 1.0);
}

#[test]
fn test_single_component_is_perfectly_balanced() {
    let mut engine = DecompositionEngine::new();
    create_problem(&mut engine, "p1");
    create_component(&mut engine, "c1", "p1", &[]);

    let m = metrics(&mut engine, "p1");
    assert_eq!(m["maxDepth"], json!(1));
    assert_eq!(m["balanceScore"], json!(10.0));
}

#[test]
fn test_average_complexity() {
    let mut engine = DecompositionEngine::new();
    create_problem(&mut engine, "p1");
    for (id, complexity) in [("c1", 2), ("c2", 4)] {
        ok(
            &mut engine,
            "createComponent",
            json!({
                "componentId": id,
                "parentProblemId": "p1",
                "name": id,
                "description": "",
                "complexity": complexity,
            }),
        );
    }

    let m = metrics(&mut engine, "p1");
    assert_eq!(m["averageComplexity"], json!(3.0));
}

#[test]
fn test_metrics_unknown_problem() {
    let mut engine = DecompositionEngine::new();
    let envelope = run(&mut engine, "calculateMetrics", json!({"problemId": "ghost"}));
    assert!(envelope.error().unwrap().contains("ghost"));
}

// ============================================
// Cycle Guard Scenarios
// ============================================

#[test]
fn test_reverse_link_is_rejected_and_state_unchanged() {
    let mut engine = two_component_chain();

    let envelope = run(
        &mut engine,
        "linkComponents",
        json!({"sourceId": "c1", "targetId": "c2"}),
    );
    let error = envelope.error().unwrap();
    assert!(error.contains("cycle"), "unexpected error: {}", error);

    let details = ok(&mut engine, "getComponentDetails", json!({"componentId": "c1"}));
    assert_eq!(details.get("component").unwrap()["dependencies"], json!([]));
}

#[test]
fn test_self_link_is_rejected() {
    let mut engine = two_component_chain();
    let envelope = run(
        &mut engine,
        "linkComponents",
        json!({"sourceId": "c1", "targetId": "c1"}),
    );
    assert!(!envelope.is_success());
}

#[test]
fn test_long_cycle_is_rejected() {
    let mut engine = DecompositionEngine::new();
    create_problem(&mut engine, "p1");
    create_component(&mut engine, "a", "p1", &[]);
    create_component(&mut engine, "b", "p1", &["a"]);
    create_component(&mut engine, "c", "p1", &["b"]);
    create_component(&mut engine, "d", "p1", &["c"]);

    let envelope = run(
        &mut engine,
        "linkComponents",
        json!({"sourceId": "a", "targetId": "d"}),
    );
    let error = envelope.error().unwrap();
    assert!(error.contains("d -> c -> b -> a"), "unexpected error: {}", error);
}

#[test]
fn test_link_is_idempotent() {
    let mut engine = DecompositionEngine::new();
    create_problem(&mut engine, "p1");
    create_component(&mut engine, "c1", "p1", &[]);
    create_component(&mut engine, "c2", "p1", &[]);

    let first = ok(
        &mut engine,
        "linkComponents",
        json!({"sourceId": "c2", "targetId": "c1"}),
    );
    let second = ok(
        &mut engine,
        "linkComponents",
        json!({"sourceId": "c2", "targetId": "c1"}),
    );

    assert_eq!(first.get("created"), Some(&json!(true)));
    assert_eq!(second.get("created"), Some(&json!(false)));
    assert_eq!(
        second.get("component").unwrap()["dependencies"],
        json!(["c1"])
    );
    assert_eq!(metrics(&mut engine, "p1")["dependencyCount"], json!(1));
}

#[test]
fn test_link_unknown_component() {
    let mut engine = two_component_chain();
    let envelope = run(
        &mut engine,
        "linkComponents",
        json!({"sourceId": "c1", "targetId": "nope"}),
    );
    assert!(envelope.error().unwrap().contains("nope"));
}

// ============================================
// Creation Failure Scenarios
// ============================================

#[test]
fn test_component_with_unknown_parent_is_not_stored() {
    let mut engine = DecompositionEngine::new();
    let envelope = run(
        &mut engine,
        "createComponent",
        json!({"componentId": "c1", "parentProblemId": "missing", "name": "x", "description": ""}),
    );
    assert!(envelope.error().unwrap().contains("missing"));

    let details = run(&mut engine, "getComponentDetails", json!({"componentId": "c1"}));
    assert!(!details.is_success());
    assert_eq!(engine.store().component_count(), 0);
}

#[test]
fn test_component_with_unknown_dependency_is_not_stored() {
    let mut engine = DecompositionEngine::new();
    create_problem(&mut engine, "p1");
    let envelope = run(
        &mut engine,
        "createComponent",
        json!({
            "componentId": "c1",
            "parentProblemId": "p1",
            "name": "x",
            "description": "",
            "dependencies": ["ghost"],
        }),
    );
    assert!(envelope.error().unwrap().contains("ghost"));
    assert_eq!(engine.store().component_count(), 0);
}

#[test]
fn test_duplicate_problem_rejected() {
    let mut engine = DecompositionEngine::new();
    create_problem(&mut engine, "p1");
    let envelope = run(
        &mut engine,
        "createProblem",
        json!({"problemId": "p1", "problemStatement": "again"}),
    );
    assert!(envelope.error().unwrap().contains("already exists"));
}

#[test]
fn test_update_unknown_problem() {
    let mut engine = DecompositionEngine::new();
    let envelope = run(
        &mut engine,
        "updateProblem",
        json!({"problemId": "p1", "problemStatement": "x"}),
    );
    assert!(envelope.error().unwrap().contains("not found"));
}

#[test]
fn test_complexity_out_of_range() {
    let mut engine = DecompositionEngine::new();
    let envelope = run(
        &mut engine,
        "createProblem",
        json!({"problemId": "p1", "problemStatement": "x", "complexity": 11}),
    );
    assert!(envelope.error().unwrap().contains("complexity"));
    assert_eq!(engine.store().problem_count(), 0);
}

// ============================================
// Update Scenarios
// ============================================

#[test]
fn test_update_component_cannot_close_cycle() {
    let mut engine = two_component_chain();
    let envelope = run(
        &mut engine,
        "updateComponent",
        json!({
            "componentId": "c1",
            "parentProblemId": "p1",
            "name": "Renamed",
            "description": "",
            "dependencies": ["c2"],
        }),
    );
    assert!(!envelope.is_success());

    let details = ok(&mut engine, "getComponentDetails", json!({"componentId": "c1"}));
    let component = details.get("component").unwrap();
    assert_eq!(component["name"], json!("Component c1"));
    assert_eq!(component["dependencies"], json!([]));
}

#[test]
fn test_update_component_replaces_fields() {
    let mut engine = two_component_chain();
    let envelope = ok(
        &mut engine,
        "updateComponent",
        json!({
            "componentId": "c2",
            "parentProblemId": "p1",
            "name": "Renamed",
            "description": "now complete",
            "status": "completed",
        }),
    );
    let component = envelope.get("component").unwrap();
    assert_eq!(component["name"], json!("Renamed"));
    assert_eq!(component["status"], json!("completed"));
    assert_eq!(component["dependencies"], json!(["c1"]));
}

#[test]
fn test_status_update_keeps_dependencies() {
    let mut engine = two_component_chain();
    let before = metrics(&mut engine, "p1");
    assert_eq!(before["dependencyCount"], json!(1));
    assert_eq!(before["maxDepth"], json!(2));

    ok(
        &mut engine,
        "updateComponent",
        json!({
            "componentId": "c2",
            "parentProblemId": "p1",
            "name": "Component c2",
            "description": "",
            "status": "in-progress",
        }),
    );

    let after = metrics(&mut engine, "p1");
    assert_eq!(after["dependencyCount"], json!(1));
    assert_eq!(after["maxDepth"], json!(2));
    let details = ok(&mut engine, "getComponentDetails", json!({"componentId": "c2"}));
    assert_eq!(details.get("component").unwrap()["dependencies"], json!(["c1"]));
}

#[test]
fn test_update_component_with_empty_dependencies_clears_edges() {
    let mut engine = two_component_chain();
    ok(
        &mut engine,
        "updateComponent",
        json!({
            "componentId": "c2",
            "parentProblemId": "p1",
            "name": "Component c2",
            "description": "",
            "dependencies": [],
        }),
    );

    let m = metrics(&mut engine, "p1");
    assert_eq!(m["dependencyCount"], json!(0));
    assert_eq!(m["maxDepth"], json!(1));
}

// ============================================
// Phase Scenarios
// ============================================

#[test]
fn test_phase_completion_snapshots_metrics() {
    let mut engine = two_component_chain();

    ok(
        &mut engine,
        "startPhase",
        json!({"phaseId": "ph1", "phaseName": "Analysis", "description": "first pass"}),
    );
    let completed = ok(
        &mut engine,
        "completePhase",
        json!({"phaseId": "ph1", "problemId": "p1"}),
    );

    let phase = completed.get("phase").unwrap();
    assert!(!phase["completedAt"].is_null());
    assert_eq!(phase["metrics"], metrics(&mut engine, "p1"));
}

#[test]
fn test_phase_snapshot_does_not_follow_later_changes() {
    let mut engine = two_component_chain();
    ok(
        &mut engine,
        "startPhase",
        json!({"phaseId": "ph1", "phaseName": "Analysis", "description": ""}),
    );
    ok(
        &mut engine,
        "completePhase",
        json!({"phaseId": "ph1", "problemId": "p1"}),
    );
    create_component(&mut engine, "c3", "p1", &["c2"]);

    let history = ok(&mut engine, "getPhaseHistory", json!({}));
    let phases = history.get("phases").unwrap().as_array().unwrap();
    assert_eq!(phases[0]["metrics"]["componentCount"], json!(2));
    assert_eq!(metrics(&mut engine, "p1")["componentCount"], json!(3));
}

#[test]
fn test_complete_unknown_phase() {
    let mut engine = two_component_chain();
    let envelope = run(
        &mut engine,
        "completePhase",
        json!({"phaseId": "ph9", "problemId": "p1"}),
    );
    assert!(envelope.error().unwrap().contains("ph9"));
}

#[test]
fn test_complete_phase_unknown_problem_leaves_phase_open() {
    let mut engine = DecompositionEngine::new();
    ok(
        &mut engine,
        "startPhase",
        json!({"phaseId": "ph1", "phaseName": "Analysis", "description": ""}),
    );
    let envelope = run(
        &mut engine,
        "completePhase",
        json!({"phaseId": "ph1", "problemId": "ghost"}),
    );
    assert!(!envelope.is_success());

    let history = ok(&mut engine, "getPhaseHistory", Value::Null);
    assert!(history.get("phases").unwrap()[0]["completedAt"].is_null());
}

#[test]
fn test_phase_history_before_any_phase() {
    let mut engine = DecompositionEngine::new();
    let history = ok(&mut engine, "getPhaseHistory", json!({}));
    assert_eq!(history.get("phases"), Some(&json!([])));
    assert_eq!(history.get("currentPhaseIndex"), Some(&Value::Null));
    assert_eq!(history.get("currentPhaseState"), Some(&json!("no-phase")));
}

#[test]
fn test_duplicate_phase_ids_are_separate_entries() {
    let mut engine = two_component_chain();
    for _ in 0..2 {
        ok(
            &mut engine,
            "startPhase",
            json!({"phaseId": "ph1", "phaseName": "Again", "description": ""}),
        );
    }
    ok(
        &mut engine,
        "completePhase",
        json!({"phaseId": "ph1", "problemId": "p1"}),
    );

    let history = ok(&mut engine, "getPhaseHistory", json!({}));
    let phases = history.get("phases").unwrap().as_array().unwrap();
    assert_eq!(phases.len(), 2);
    assert!(phases[0]["completedAt"].is_null());
    assert!(!phases[1]["completedAt"].is_null());
    assert_eq!(history.get("currentPhaseIndex"), Some(&json!(1)));
    assert_eq!(history.get("currentPhaseState"), Some(&json!("closed")));
}

// ============================================
// Query Scenarios
// ============================================

#[test]
fn test_decomposition_resolution_order() {
    let mut engine = DecompositionEngine::new();
    create_problem(&mut engine, "p1");
    create_component(&mut engine, "deploy", "p1", &[]);
    create_component(&mut engine, "build", "p1", &[]);
    create_component(&mut engine, "test", "p1", &["build"]);
    ok(
        &mut engine,
        "linkComponents",
        json!({"sourceId": "deploy", "targetId": "test"}),
    );

    let view = ok(&mut engine, "getDecomposition", json!({"problemId": "p1"}));
    assert_eq!(
        view.get("resolutionOrder"),
        Some(&json!(["build", "test", "deploy"]))
    );
    assert_eq!(view.get("components").unwrap().as_array().unwrap().len(), 3);
    assert_eq!(view.get("metrics").unwrap()["maxDepth"], json!(3));
}

#[test]
fn test_component_details_lists_dependents() {
    let mut engine = two_component_chain();
    create_component(&mut engine, "c3", "p1", &["c1"]);

    let details = ok(&mut engine, "getComponentDetails", json!({"componentId": "c1"}));
    assert_eq!(details.get("dependents"), Some(&json!(["c2", "c3"])));
}

#[test]
fn test_problem_details_counts_only_own_components() {
    let mut engine = two_component_chain();
    create_problem(&mut engine, "p2");
    create_component(&mut engine, "x1", "p2", &["c1"]);

    let details = ok(&mut engine, "getProblemDetails", json!({"problemId": "p1"}));
    assert_eq!(details.get("componentCount"), Some(&json!(2)));
    let details = ok(&mut engine, "getProblemDetails", json!({"problemId": "p2"}));
    assert_eq!(details.get("componentCount"), Some(&json!(1)));
}

#[test]
fn test_depth_crosses_problem_boundaries() {
    let mut engine = two_component_chain();
    create_problem(&mut engine, "p2");
    create_component(&mut engine, "x1", "p2", &["c2"]);

    let m = metrics(&mut engine, "p2");
    assert_eq!(m["componentCount"], json!(1));
    assert_eq!(m["maxDepth"], json!(3));
}

// ============================================
// Dispatcher Scenarios
// ============================================

#[test]
fn test_unknown_action() {
    let mut engine = DecompositionEngine::new();
    let envelope = run(&mut engine, "explode", json!({}));
    assert!(envelope.error().unwrap().contains("action"));
}

#[test]
fn test_non_object_arguments() {
    let mut engine = DecompositionEngine::new();
    let envelope = run(&mut engine, "getPhaseHistory", json!([1, 2]));
    assert!(envelope.error().unwrap().contains("arguments"));
}

#[test]
fn test_missing_required_field() {
    let mut engine = DecompositionEngine::new();
    let envelope = run(&mut engine, "createProblem", json!({"problemId": "p1"}));
    assert!(envelope.error().unwrap().contains("problemStatement"));
}

#[test]
fn test_envelope_wire_shape() {
    let mut engine = DecompositionEngine::new();
    let success = ok(
        &mut engine,
        "createProblem",
        json!({"problemId": "p1", "problemStatement": "x"}),
    );
    let value = serde_json::to_value(&success).unwrap();
    assert_eq!(value["status"], json!("success"));
    assert!(value["message"].is_string());
    assert_eq!(value["problem"]["id"], json!("p1"));
    assert_eq!(value["problem"]["complexity"], json!(5));

    let failed = run(
        &mut engine,
        "createProblem",
        json!({"problemId": "p1", "problemStatement": "x"}),
    );
    let value = serde_json::to_value(&failed).unwrap();
    assert_eq!(value["status"], json!("failed"));
    assert!(value["error"].is_string());
}
