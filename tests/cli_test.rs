mod common;

use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use common::requests_csv;
use predicates::prelude::*;
use std::process::Command;

#[test]
fn test_cli_end_to_end() -> Result<(), Box<dyn std::error::Error>> {
    let csv = requests_csv(&["a1, 25.00, USD", "a2, 10, usd"]);

    let mut cmd = Command::new(cargo_bin!("paycoord"));
    cmd.arg(csv.path());

    cmd.assert()
        .success()
        .stdout(predicate::str::contains(
            "attempt,outcome,order_id,capture_id,error",
        ))
        .stdout(predicate::str::contains("a1,succeeded,O1,C1,"))
        .stdout(predicate::str::contains("a2,succeeded,O2,C2,"))
        .stderr(predicate::str::contains("Unsettled order").not());

    Ok(())
}

#[test]
fn test_cli_cancelled_approval_lists_unsettled_order() {
    let csv = requests_csv(&["a1, 25.00, USD"]);

    let mut cmd = Command::new(cargo_bin!("paycoord"));
    cmd.arg(csv.path()).arg("--approval").arg("cancel");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains(
            "a1,cancelled,O1,,payer cancelled approval",
        ))
        .stderr(predicate::str::contains(
            "Unsettled order O1 (attempt a1, state cancelled)",
        ));
}

#[test]
fn test_cli_approval_timeout_is_cancelled_class() {
    let csv = requests_csv(&["a1, 5.00, EUR"]);

    let mut cmd = Command::new(cargo_bin!("paycoord"));
    cmd.arg(csv.path()).arg("--approval").arg("timeout");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("a1,cancelled,O1,,approval timed out"));
}

#[test]
fn test_cli_approval_timeout_flag_cancels_slow_payer() {
    let csv = requests_csv(&["a1, 5.00, EUR"]);

    let mut cmd = Command::new(cargo_bin!("paycoord"));
    cmd.arg(csv.path())
        .args(["--approval-delay-ms", "2000"])
        .args(["--approval-timeout-ms", "20"]);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("a1,cancelled,O1,,approval timed out"))
        .stderr(predicate::str::contains("Unsettled order O1"));
}

#[test]
fn test_cli_approval_timeout_from_environment() {
    let csv = requests_csv(&["a1, 5.00, EUR"]);

    let mut cmd = Command::new(cargo_bin!("paycoord"));
    cmd.arg(csv.path())
        .args(["--approval-delay-ms", "2000"])
        .env("PAYCOORD_APPROVAL_TIMEOUT_MS", "20");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("a1,cancelled,O1,,approval timed out"));
}

#[test]
fn test_cli_gateway_timeout_flag_bounds_provider_calls() {
    let csv = requests_csv(&["a1, 5.00, USD"]);

    let mut cmd = Command::new(cargo_bin!("paycoord"));
    cmd.arg(csv.path())
        .args(["--provider-latency-ms", "2000"])
        .args(["--gateway-timeout-ms", "20"]);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains(
            "a1,timeout,,,Timed out: create_order exceeded 20ms",
        ))
        .stderr(predicate::str::contains("Unsettled order").not());
}

#[test]
fn test_cli_unreachable_provider_url_is_network_failure() {
    let csv = requests_csv(&["a1, 5.00, USD"]);

    let mut cmd = Command::new(cargo_bin!("paycoord"));
    cmd.arg(csv.path())
        .args(["--provider-url", "http://127.0.0.1:1"])
        .args(["--access-token", "tok"]);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("a1,network,,,"));
}

#[test]
fn test_cli_provider_url_from_environment() {
    let csv = requests_csv(&["a1, 5.00, USD"]);

    let mut cmd = Command::new(cargo_bin!("paycoord"));
    cmd.arg(csv.path())
        .env("PAYCOORD_PROVIDER_URL", "http://127.0.0.1:1");

    // The simulated provider would have succeeded with O1.
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("a1,network,,,"))
        .stdout(predicate::str::contains("succeeded").not());
}
