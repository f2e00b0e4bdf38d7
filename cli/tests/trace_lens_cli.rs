use std::fs;
use std::path::Path;

use anyhow::Result;
use assert_cmd::Command;
use predicates::prelude::*;
use pretty_assertions::assert_eq;
use serde_json::Value;
use serde_json::json;
use tempfile::TempDir;

const SPEC_SOURCE: &str = r#"describe('orders', () => {
    it('places an order', async () => {
        await client.post('/orders');
    });
});
"#;

fn trace_lens(workspace: &Path) -> Result<Command> {
    let mut cmd = Command::cargo_bin("trace-lens")?;
    cmd.current_dir(workspace);
    cmd.env("RUST_LOG", "off");
    Ok(cmd)
}

fn workspace_with_traces(traces: Value) -> Result<TempDir> {
    let dir = TempDir::new()?;
    fs::create_dir_all(dir.path().join("test"))?;
    fs::write(dir.path().join("test/orders.spec.ts"), SPEC_SOURCE)?;
    fs::create_dir_all(dir.path().join("traces"))?;
    fs::write(
        dir.path().join("traces/2024-05-01T12-00-00.json"),
        traces.to_string(),
    )?;
    Ok(dir)
}

fn order_traces() -> Value {
    json!([
        {
            "type": "request", "file": "test/orders.spec.ts",
            "testTitlePath": ["orders", "places an order"], "result": "success", "elapsed": 30,
            "request": { "method": "POST", "url": "http://localhost:8080/orders" },
            "response": { "status": 201 }
        },
        {
            "type": "sql", "file": "test/orders.spec.ts",
            "testTitlePath": ["orders", "places an order"], "result": "error", "elapsed": 10,
            "sql": "INSERT INTO orders DEFAULT VALUES", "error": { "str": "deadlock" }
        }
    ])
}

#[test]
fn lists_test_declarations() -> Result<()> {
    let dir = workspace_with_traces(json!([]))?;
    trace_lens(dir.path())?
        .args(["tests", "test/orders.spec.ts"])
        .assert()
        .success()
        .stdout(predicate::str::contains("    1: orders"))
        .stdout(predicate::str::contains("    2: orders > places an order"));
    Ok(())
}

#[test]
fn rejects_unsupported_files() -> Result<()> {
    let dir = workspace_with_traces(json!([]))?;
    fs::write(dir.path().join("notes.md"), "# notes")?;
    trace_lens(dir.path())?
        .args(["tests", "notes.md"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unsupported language"));
    Ok(())
}

#[test]
fn shows_traces_by_title() -> Result<()> {
    let dir = workspace_with_traces(order_traces())?;
    trace_lens(dir.path())?
        .args(["show", "test/orders.spec.ts", "--test", "orders", "places an order"])
        .assert()
        .success()
        .stdout(predicate::str::contains("orders > places an order (test/orders.spec.ts:2)"))
        .stdout(predicate::str::contains("2 traces over 40ms"))
        .stdout(predicate::str::contains("POST /orders 30ms [0%..75%]"))
        .stdout(predicate::str::contains("! INSERT 10ms [0%..25%]"));
    Ok(())
}

#[test]
fn shows_traces_by_line_as_json() -> Result<()> {
    let dir = workspace_with_traces(order_traces())?;
    let output = trace_lens(dir.path())?
        .args(["show", "test/orders.spec.ts", "--line", "2", "--json"])
        .output()?;
    assert!(output.status.success());

    let payload: Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(payload["test"]["title_path"], json!(["orders", "places an order"]));
    assert_eq!(payload["window"]["regime"], json!("sequential"));
    assert_eq!(payload["entries"].as_array().map(Vec::len), Some(2));
    assert_eq!(payload["entries"][1]["summary"], json!("INSERT"));
    assert_eq!(payload["entries"][1]["record"]["error"]["str"], json!("deadlock"));
    Ok(())
}

#[test]
fn reports_missing_traces_without_failing() -> Result<()> {
    let dir = workspace_with_traces(json!([]))?;
    fs::remove_dir_all(dir.path().join("traces"))?;
    trace_lens(dir.path())?
        .args(["show", "test/orders.spec.ts", "--test", "orders"])
        .assert()
        .success()
        .stdout(predicate::str::contains("no traces recorded for this test"));
    Ok(())
}

#[test]
fn malformed_snapshot_fails() -> Result<()> {
    let dir = workspace_with_traces(json!([]))?;
    fs::write(dir.path().join("traces/2099-01-01.json"), "[{ oops")?;
    trace_lens(dir.path())?
        .args(["show", "test/orders.spec.ts", "--test", "orders"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("malformed trace snapshot"));
    Ok(())
}

#[test]
fn requires_a_selection() -> Result<()> {
    let dir = workspace_with_traces(json!([]))?;
    trace_lens(dir.path())?
        .args(["show", "test/orders.spec.ts"])
        .assert()
        .failure();
    Ok(())
}
