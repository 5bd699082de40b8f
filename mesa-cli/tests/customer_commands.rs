//! Integration tests for customer lookup and conflict resolution.

mod common;

use common::{parse_id, TestEnv, DATE};
use predicates::prelude::*;

/// Two customers: one owning the email, one owning the phone.
fn env_with_two_customers() -> TestEnv {
    let env = TestEnv::with_floor();
    env.command()
        .args(["reserve", "Carmen", "--party", "2", "--date", DATE, "--time", "13:00"])
        .args(["--email", "a@x.com"])
        .assert()
        .success();
    env.reserve("Carlos", 2, "13:30", "600000000");
    env
}

fn web_booking(env: &TestEnv) -> i64 {
    let output = env
        .command()
        .args(["reserve", "Carmen López", "--party", "4", "--date", DATE, "--time", "21:00"])
        .args(["--origin", "web", "--email", "A@X.com", "--phone", "600 000 000"])
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "Reserve failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    parse_id(&String::from_utf8_lossy(&output.stdout))
}

#[test]
fn test_check_reports_matches() {
    let env = env_with_two_customers();

    env.command()
        .args(["customer", "check", "--email", "a@x.com"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("match\t#1\tCarmen\tEmail"));

    env.command()
        .args(["customer", "check", "--email", "nobody@x.com"])
        .assert()
        .success()
        .stdout("none\n");

    env.command()
        .args(["customer", "check", "--email", "a@x.com", "--phone", "+34 600000000"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("conflict\n"));

    let output = env
        .command()
        .args(["customer", "check", "--email", "a@x.com", "--phone", "600000000", "--json"])
        .output()
        .unwrap();
    let result: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(result["result"], "conflict");
    assert_eq!(result["email_match"]["name"], "Carmen");
    assert_eq!(result["phone_match"]["name"], "Carlos");

    env.command()
        .args(["customer", "check"])
        .assert()
        .code(4);
}

/// **Invariant verified:** a booking whose contact data points at two
/// customers cannot be confirmed until the conflict is resolved.
#[test]
fn test_conflict_blocks_confirmation_until_resolved() {
    let env = env_with_two_customers();
    let id = web_booking(&env);

    let listed = env.list_json(&["--status", "pending"]);
    assert_eq!(listed.len(), 1);
    assert!(listed[0]["customer"].is_null());

    env.command().args(["confirm", &id.to_string()]).assert().code(1);

    env.command()
        .args(["customer", "resolve", "--email", "a@x.com", "--phone", "600000000"])
        .args(["--strategy", "keep-email", "--reservation", &id.to_string()])
        .assert()
        .success()
        .stdout("1\n");

    env.command().args(["confirm", &id.to_string()]).assert().success();

    env.command()
        .args(["customer", "check", "--email", "a@x.com", "--phone", "600000000"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("match\t#1\tCarmen\tBoth"));
}

#[test]
fn test_merge_needs_manager_and_retires_record() {
    let env = env_with_two_customers();
    let merge = [
        "customer", "resolve", "--email", "a@x.com", "--phone", "600000000", "--strategy", "merge",
    ];

    env.command().args(merge).assert().code(1);

    env.command()
        .args(["--role", "manager"])
        .args(merge)
        .assert()
        .success()
        .stderr(predicate::str::contains("#2 merged and retired"));

    let output = env.command().args(["customer", "show", "2"]).output().unwrap();
    let retired: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(retired["superseded_by"], 1);

    // Nothing left to resolve
    env.command()
        .args(["--role", "manager"])
        .args(merge)
        .assert()
        .code(1);
}

#[test]
fn test_booking_can_resolve_on_entry() {
    let env = env_with_two_customers();

    let output = env
        .command()
        .args(["reserve", "Carlos", "--party", "2", "--date", DATE, "--time", "14:00"])
        .args(["--email", "a@x.com", "--phone", "600000000", "--customer", "keep-phone"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let id = parse_id(&String::from_utf8_lossy(&output.stdout));

    let reservation = env
        .list_json(&[])
        .into_iter()
        .find(|r| r["id"] == id)
        .unwrap();
    assert_eq!(reservation["customer"], 2);
}

#[test]
fn test_resolve_dry_run_changes_nothing() {
    let env = env_with_two_customers();

    env.command()
        .args(["customer", "resolve", "--email", "a@x.com", "--phone", "600000000"])
        .args(["--strategy", "keep-phone", "--dry-run"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Would resolve"));

    env.command()
        .args(["customer", "check", "--email", "a@x.com", "--phone", "600000000"])
        .assert()
        .stdout(predicate::str::starts_with("conflict\n"));
}
