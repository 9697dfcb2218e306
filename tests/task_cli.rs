mod support;

use predicates::str::contains;

use support::TestData;

#[test]
fn task_add_assigns_ids_and_defaults() -> Result<(), Box<dyn std::error::Error>> {
    let data = TestData::new();

    let first = data.json(&["task", "add", "Write docs"])?;
    assert_eq!(first["data"]["id"], 1);
    assert_eq!(first["data"]["status"], "todo");
    assert_eq!(first["data"]["sortIndex"], -1);
    assert_eq!(first["data"]["note"], "");

    let second = data.json(&["task", "add", "Review", "--status", "in-review"])?;
    assert_eq!(second["data"]["id"], 2);
    assert_eq!(second["data"]["status"], "in-review");

    Ok(())
}

#[test]
fn task_set_merges_fields() -> Result<(), Box<dyn std::error::Error>> {
    let data = TestData::new();
    data.cmd()
        .args(["task", "add", "Write docs", "--note", "api"])
        .assert()
        .success();

    let out = data.json(&["task", "set", "1", "--status", "Completed", "--sort-index", "-50"])?;
    assert_eq!(out["data"]["name"], "Write docs");
    assert_eq!(out["data"]["note"], "api");
    assert_eq!(out["data"]["status"], "completed");
    assert_eq!(out["data"]["sortIndex"], -50);

    Ok(())
}

#[test]
fn task_list_splits_finished() -> Result<(), Box<dyn std::error::Error>> {
    let data = TestData::new();
    for args in [
        vec!["task", "add", "a"],
        vec!["task", "add", "b", "--status", "completed"],
        vec!["task", "add", "c", "--status", "will-not-do"],
        vec!["task", "add", "d"],
    ] {
        data.cmd().args(&args).assert().success();
    }

    let ids = |value: &serde_json::Value| -> Vec<u64> {
        value["data"]
            .as_array()
            .expect("tasks")
            .iter()
            .filter_map(|task| task["id"].as_u64())
            .collect()
    };

    // Default sort index is -id, so newer tasks come first.
    assert_eq!(ids(&data.json(&["task", "list"])?), vec![4, 1]);
    assert_eq!(ids(&data.json(&["task", "list", "--finished"])?), vec![3, 2]);
    assert_eq!(ids(&data.json(&["task", "list", "--all"])?).len(), 4);

    Ok(())
}

#[test]
fn task_rm_removes_from_days() -> Result<(), Box<dyn std::error::Error>> {
    let data = TestData::new();
    data.cmd()
        .args(["day", "set", "2024-03-18", "--tasks", "1,2"])
        .assert()
        .success();

    let out = data.json(&["task", "rm", "1"])?;
    assert_eq!(out["data"]["removed"], true);

    let day = data.json(&["day", "show", "2024-03-18"])?;
    let tasks = day["data"]["tasks"].as_array().expect("tasks");
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0]["task_id"], 2);

    Ok(())
}

#[test]
fn unknown_task_and_status_are_user_errors() {
    let data = TestData::new();

    data.cmd()
        .args(["task", "show", "9"])
        .assert()
        .code(2)
        .stderr(contains("Task not found: 9"));

    data.cmd()
        .args(["task", "add", "x", "--status", "done"])
        .assert()
        .code(2)
        .stderr(contains("unknown status 'done'"));

    data.cmd()
        .args(["task", "set", "9", "--name", "ghost"])
        .assert()
        .code(2);
}
