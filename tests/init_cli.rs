mod support;

use std::fs;

use support::TestData;

#[test]
fn init_writes_default_config_once() -> Result<(), Box<dyn std::error::Error>> {
    let data = TestData::new();

    let first = data.json(&["init"])?;
    assert_eq!(first["data"]["created"]["config"], true);
    assert_eq!(first["data"]["created"]["data_dir"], false);

    let written = fs::read_to_string(data.path().join("daybook.toml"))?;
    assert!(written.contains("[storage]"));
    assert!(written.contains("include_images = true"));

    // The written file is accepted by every other command.
    data.cmd().args(["task", "add", "After init"]).assert().success();

    data.write_config("[export]\npretty = false\n")?;
    let second = data.json(&["init"])?;
    assert_eq!(second["data"]["created"]["config"], false);
    assert_eq!(
        fs::read_to_string(data.path().join("daybook.toml"))?,
        "[export]\npretty = false\n"
    );
    Ok(())
}

#[test]
fn init_creates_missing_data_dir() -> Result<(), Box<dyn std::error::Error>> {
    let data = TestData::new();
    let nested = data.path().join("nested").join("book");

    let out = data.json(&["--data-dir", nested.to_str().expect("utf8 path"), "init"])?;
    assert_eq!(out["data"]["created"]["data_dir"], true);
    assert!(nested.join("daybook.toml").is_file());
    Ok(())
}
