use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn tally(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("tally").unwrap();
    cmd.env("HOME", home.path()).env("NO_COLOR", "1").env_remove("RUST_LOG");
    cmd
}

fn init(home: &TempDir) {
    let data_dir = home.path().join("books");
    tally(home)
        .args(["init", "--data-dir"])
        .arg(&data_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized tally at"));
}

#[test]
fn commands_require_init() {
    let home = TempDir::new().unwrap();
    tally(&home)
        .args(["rules", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("tally init"));
}

#[test]
fn demo_rules_preview_apply_then_settle() {
    let home = TempDir::new().unwrap();
    init(&home);
    tally(&home).arg("demo").assert().success().stdout(predicate::str::contains("Demo data loaded!"));
    tally(&home)
        .arg("demo")
        .assert()
        .success()
        .stdout(predicate::str::contains("already loaded"));

    tally(&home)
        .arg("run")
        .assert()
        .success()
        .stdout(predicate::str::contains("Dry run:"))
        .stdout(predicate::str::contains("12 transactions scoped, 7 modified"));

    // Dry run wrote nothing.
    tally(&home)
        .arg("run")
        .assert()
        .success()
        .stdout(predicate::str::contains("7 modified"));

    tally(&home)
        .args(["run", "--apply"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Applied:"))
        .stdout(predicate::str::contains("7 modified"));

    tally(&home)
        .arg("run")
        .assert()
        .success()
        .stdout(predicate::str::contains("0 modified, 0 category changes, 0 tag changes"));

    tally(&home)
        .args(["search", "tag:Pantry"])
        .assert()
        .success()
        .stdout(predicate::str::contains("3 matches"));
}

#[test]
fn run_scope_by_account_and_date() {
    let home = TempDir::new().unwrap();
    init(&home);
    tally(&home).arg("demo").assert().success();

    tally(&home)
        .args(["run", "--account", "Visa", "--from", "2025-02-01"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2 transactions scoped, 2 modified"));

    tally(&home)
        .args(["run", "--account", "Savings"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown account: Savings"));

    tally(&home)
        .args(["run", "--from", "Feb 1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid date"));
}

#[test]
fn saved_filters_must_group_mixed_operators() {
    let home = TempDir::new().unwrap();
    init(&home);

    tally(&home)
        .args(["filters", "add", "mixed", "cat:Food OR cat:Rent amt:<-50"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("parentheses"));

    tally(&home)
        .args(["filters", "add", "Grouped", "(cat:Food OR cat:Rent) amt:<-50"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Saved filter 'grouped'"));

    tally(&home)
        .args(["filters", "add", "GROUPED", "cat:Food"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn filters_check_prints_canonical_form() {
    let home = TempDir::new().unwrap();
    tally(&home)
        .args(["filters", "check", "coffee cat:Food OR amt:>50"])
        .assert()
        .success()
        .stdout(predicate::str::contains("(coffee AND cat:Food) OR amt:>50"));

    tally(&home)
        .args(["filters", "check", "--strict", "coffee cat:Food OR amt:>50"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid filter"));
}

#[test]
fn rules_reorder_and_disable() {
    let home = TempDir::new().unwrap();
    init(&home);
    tally(&home).args(["filters", "add", "rides", "desc:uber"]).assert().success();
    tally(&home)
        .args(["rules", "add", "Rides", "--filter", "rides", "--category", "Transport"])
        .assert()
        .success()
        .stdout(predicate::str::contains("position 1"));
    tally(&home)
        .args(["rules", "add", "Also rides", "--filter", "rides", "--category", "Travel"])
        .assert()
        .success()
        .stdout(predicate::str::contains("position 2"));
    tally(&home)
        .args(["rules", "add", "No action", "--filter", "rides"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid rule"));

    tally(&home)
        .args(["rules", "move", "2", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Moved rule 2 to position 1"));
    tally(&home).args(["rules", "disable", "1"]).assert().success();
    tally(&home)
        .args(["rules", "delete", "7"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No rule with ID 7"));
}

#[test]
fn search_falls_back_on_malformed_query() {
    let home = TempDir::new().unwrap();
    init(&home);
    tally(&home).arg("demo").assert().success();

    tally(&home)
        .args(["search", "desc:uber"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2 matches"));

    tally(&home)
        .args(["search", "(lunch"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Warning:"))
        .stdout(predicate::str::contains("0 matches"));
}

#[test]
fn deeply_nested_queries_are_rejected_not_crashed() {
    let home = TempDir::new().unwrap();
    let deep = format!("{}a{}", "(".repeat(3000), ")".repeat(3000));
    tally(&home)
        .args(["filters", "check", &deep])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("nests too deeply"));

    init(&home);
    tally(&home).arg("demo").assert().success();
    tally(&home)
        .args(["search", &"(".repeat(5000)])
        .assert()
        .success()
        .stderr(predicate::str::contains("Warning:"))
        .stdout(predicate::str::contains("0 matches"));
}
