mod support;

use predicates::str::contains;
use serde_json::Value;

use support::TestData;

#[test]
fn day_set_creates_day_tasks_and_tasks() -> Result<(), Box<dyn std::error::Error>> {
    let data = TestData::new();

    let out = data.json(&["day", "set", "2024-03-18", "--note", "sprint start", "--tasks", "1,2"])?;
    assert_eq!(out["status"], "success");
    assert_eq!(out["command"], "day set");
    assert_eq!(out["data"]["note"], "sprint start");
    let tasks = out["data"]["tasks"].as_array().expect("tasks");
    assert_eq!(tasks.len(), 2);
    assert_eq!(tasks[0]["task_id"], 1);
    assert_eq!(tasks[0]["status"], "todo");

    let registered = data.read_register("tasks")?;
    assert_eq!(registered.as_array().map(Vec::len), Some(2));
    let day_tasks = data.read_register("day-tasks")?;
    assert_eq!(day_tasks[0][0], "2024-03-18_1");

    Ok(())
}

#[test]
fn day_show_and_list() -> Result<(), Box<dyn std::error::Error>> {
    let data = TestData::new();
    data.cmd()
        .args(["task", "add", "Write docs"])
        .assert()
        .success();
    data.cmd()
        .args(["day", "set", "2024-03-19", "--tasks", "1"])
        .assert()
        .success();
    data.cmd()
        .args(["day", "set", "2024-03-18", "--note", "planning"])
        .assert()
        .success();

    data.cmd()
        .args(["day", "show", "2024-03-19"])
        .assert()
        .success()
        .stdout(contains("Day 2024-03-19"))
        .stdout(contains("#1 Write docs [todo]"));

    let listed = data.json(&["day", "list"])?;
    let names: Vec<&str> = listed["data"]
        .as_array()
        .expect("days")
        .iter()
        .filter_map(|day| day["name"].as_str())
        .collect();
    assert_eq!(names, vec!["2024-03-18", "2024-03-19"]);

    Ok(())
}

#[test]
fn day_rm_keeps_tasks() -> Result<(), Box<dyn std::error::Error>> {
    let data = TestData::new();
    data.cmd()
        .args(["day", "set", "2024-03-18", "--tasks", "1"])
        .assert()
        .success();

    let out = data.json(&["day", "rm", "2024-03-18"])?;
    assert_eq!(out["data"]["removed"], true);

    let tasks = data.json(&["task", "list"])?;
    assert_eq!(tasks["data"].as_array().map(Vec::len), Some(1));
    assert_eq!(data.read_register("day-tasks")?, Value::Array(Vec::new()));

    let again = data.json(&["day", "rm", "2024-03-18"])?;
    assert_eq!(again["data"]["removed"], false);

    Ok(())
}

#[test]
fn malformed_day_is_a_user_error() -> Result<(), Box<dyn std::error::Error>> {
    let data = TestData::new();

    data.cmd()
        .args(["day", "set", "18/03/2024"])
        .assert()
        .code(2)
        .stderr(contains("Invalid day name"));

    let output = data
        .cmd()
        .args(["--json", "day", "set", "2024-02-30"])
        .output()?;
    assert_eq!(output.status.code(), Some(2));
    let envelope: Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(envelope["status"], "error");
    assert_eq!(envelope["command"], "day set");
    assert_eq!(envelope["error"]["kind"], "user_error");

    assert!(!data.register_path("days").exists());
    Ok(())
}

#[test]
fn missing_day_is_not_found() {
    let data = TestData::new();
    data.cmd()
        .args(["day", "show", "2024-03-18"])
        .assert()
        .code(2)
        .stderr(contains("Day not found"));
}
