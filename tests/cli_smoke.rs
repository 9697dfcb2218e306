use assert_cmd::Command;
use predicates::str::contains;

#[test]
fn daybook_help_works() {
    Command::cargo_bin("daybook")
        .expect("binary")
        .arg("--help")
        .assert()
        .success()
        .stdout(contains("Day-by-day task journal"));
}

#[test]
fn subcommand_help_works() {
    let subcommands = [
        vec!["init"],
        vec!["day"],
        vec!["day", "set"],
        vec!["task"],
        vec!["task", "status"],
        vec!["log"],
        vec!["unlog"],
        vec!["export"],
        vec!["import"],
    ];

    for cmd in subcommands {
        Command::cargo_bin("daybook")
            .expect("binary")
            .args(&cmd)
            .arg("--help")
            .assert()
            .success();
    }
}

#[test]
fn unknown_subcommand_is_a_usage_error() {
    Command::cargo_bin("daybook")
        .expect("binary")
        .arg("frobnicate")
        .assert()
        .code(2);
}
