//! The stdio transport end to end: scripted input lines in, JSON replies out.

use std::io::Cursor;
use std::sync::Arc;

use serde_json::Value;
use spicebox_engine::LinearEngine;
use spicebox_server::{ServerConfig, StdioServer, ToolDispatcher};

fn run(lines: &[&str]) -> Vec<Value> {
    let dispatcher = ToolDispatcher::new(Arc::new(LinearEngine::new()), ServerConfig::default());
    let mut server = StdioServer::new(Arc::new(dispatcher));
    let input = Cursor::new(lines.join("\n"));
    let mut output = Vec::new();
    server.serve(input, &mut output).unwrap();
    String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

#[test]
fn session_over_stdio() {
    let replies = run(&[
        r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{"protocolVersion":"2024-11-05","clientInfo":{"name":"test"}}}"#,
        r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
        r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#,
        r#"{"jsonrpc":"2.0","id":3,"method":"tools/call","params":{"name":"create_circuit","arguments":{"circuit_id":"rc"}}}"#,
        r#"{"jsonrpc":"2.0","id":4,"method":"tools/call","params":{"name":"add_component","arguments":{"component_name":"V1","component_type":"V","nodes":["in","0"],"value":5}}}"#,
        r#"{"jsonrpc":"2.0","id":5,"method":"tools/call","params":{"name":"add_component","arguments":{"component_name":"R1","component_type":"R","nodes":["in","0"],"value":"1k"}}}"#,
        r#"{"jsonrpc":"2.0","id":"op","method":"tools/call","params":{"name":"run_op_analysis","arguments":{}}}"#,
        "",
        r#"{"jsonrpc":"2.0","id":6,"method":"ping"}"#,
    ]);
    // The notification and the blank line produce nothing.
    assert_eq!(replies.len(), 7);

    assert_eq!(replies[0]["id"], 1);
    assert_eq!(replies[0]["result"]["serverInfo"]["name"], "spicebox");
    assert_eq!(replies[0]["result"]["serverInfo"]["engine"], "spicebox-linear");

    let tools = replies[1]["result"]["tools"].as_array().unwrap();
    let names: Vec<&str> = tools.iter().map(|t| t["name"].as_str().unwrap()).collect();
    for expected in [
        "create_circuit",
        "run_ac_analysis",
        "run_parameter_sweep",
        "plot_results",
        "calculate_group_delay",
        "library_search",
    ] {
        assert!(names.contains(&expected), "missing {}", expected);
    }
    assert!(!names.contains(&"run_noise_analysis"));

    for reply in &replies[2..5] {
        assert!(reply["result"]["isError"].is_null(), "{}", reply);
    }
    assert_eq!(replies[5]["id"], "op");
    let text = replies[5]["result"]["content"][0]["text"].as_str().unwrap();
    let summary: Value = serde_json::from_str(text).unwrap();
    let v_in = summary["values"]["v(in)"].as_f64().unwrap();
    assert!((v_in - 5.0).abs() < 1e-9);

    assert_eq!(replies[6]["id"], 6);
    assert!(replies[6]["result"].is_object());
}

#[test]
fn protocol_errors() {
    let replies = run(&[
        "{this is not json",
        r#"{"jsonrpc":"2.0","id":7,"method":"resources/list"}"#,
        r#"{"jsonrpc":"2.0","id":8,"method":"tools/call","params":{"name":"run_noise_analysis","arguments":{}}}"#,
        r#"{"jsonrpc":"2.0","id":9,"method":"tools/call","params":{"name":"get_results","arguments":{"circuit_id":"none"}}}"#,
    ]);
    assert_eq!(replies.len(), 4);

    assert_eq!(replies[0]["error"]["code"], -32700);
    assert!(replies[0]["id"].is_null());

    assert_eq!(replies[1]["error"]["code"], -32601);
    assert_eq!(replies[1]["id"], 7);
    assert!(replies[1]["error"]["message"].as_str().unwrap().contains("resources/list"));

    assert_eq!(replies[2]["result"]["isError"], true);
    assert_eq!(replies[2]["result"]["content"][0]["text"], "Unknown tool: run_noise_analysis");

    assert_eq!(replies[3]["result"]["isError"], true);
    let message = replies[3]["result"]["content"][0]["text"].as_str().unwrap();
    assert!(message.contains("'none' not found"), "{}", message);
}

#[test]
fn oversized_sweep_does_not_stop_the_server() {
    let replies = run(&[
        r#"{"jsonrpc":"2.0","id":1,"method":"tools/call","params":{"name":"create_circuit","arguments":{"circuit_id":"rc"}}}"#,
        r#"{"jsonrpc":"2.0","id":2,"method":"tools/call","params":{"name":"run_ac_analysis","arguments":{"start_freq":10,"stop_freq":1e6,"points_per_decade":18446744073709551615}}}"#,
        r#"{"jsonrpc":"2.0","id":3,"method":"ping"}"#,
    ]);
    assert_eq!(replies.len(), 3);
    assert_eq!(replies[1]["result"]["isError"], true);
    let message = replies[1]["result"]["content"][0]["text"].as_str().unwrap();
    assert!(message.contains("at most"), "{}", message);
    assert_eq!(replies[2]["id"], 3);
}
