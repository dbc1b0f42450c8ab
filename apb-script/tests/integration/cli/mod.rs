use std::fs;

use assert_cmd::prelude::*;
use predicates::prelude::*;

const DATA: &str = "./tests/integration/cli/data";

fn bin_under_test() -> escargot::CargoRun {
    escargot::CargoBuild::new()
        .bin("apb-script")
        .features("executable")
        .current_release()
        .current_target()
        .run()
        .unwrap_or_else(|err| {
            // Process the error string to add borders.
            let formatted_err = err.to_string()
                .lines()
                .map(|line| format!("│\t{line}"))
                .collect::<Vec<_>>()
                .join("\n");

            panic!(
                "\n\
                Failed to build `apb-script`.\n\
                Original cargo error:\n\
                ┌──────────────────────────────────────────────────\n\
                {formatted_err}\n\
                └──────────────────────────────────────────────────\n\
                To reproduce this failure manually, run the following command:\n\
                $ cargo build -p apb-script --features executable\n\n"
            );
        })
}

#[test]
fn cli_run_stream() {
    let mut cmd = bin_under_test().command();
    cmd.arg("run").arg(format!("{DATA}/blink.json")).arg("--idle-gap").arg("1");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Status: completed"))
        .stdout(predicate::str::contains("Transactions: 6"))
        .stdout(predicate::str::contains("Read 0: 0x5678"))
        .stdout(predicate::str::contains("Read 1: 0x0001"));
}

#[test]
fn cli_run_store() {
    let mut cmd = bin_under_test().command();
    cmd.arg("run")
        .arg(format!("{DATA}/blink.json"))
        .arg("--front-end")
        .arg("store")
        .arg("--store-latency")
        .arg("3")
        .arg("--wait-states")
        .arg("2");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Status: completed"))
        .stdout(predicate::str::contains("Transactions: 6"));
}

#[test]
fn cli_run_bus_fault() {
    let mut cmd = bin_under_test().command();
    cmd.arg("run").arg(format!("{DATA}/fault.json"));

    cmd.assert()
        .failure()
        .stdout(predicate::str::contains("Status: errored"))
        .stderr(predicate::str::contains("bus fault on write of address 0x00000010"));
}

#[test]
fn cli_run_poll_failure() {
    let mut cmd = bin_under_test().command();
    cmd.arg("run").arg(format!("{DATA}/stuck.json"));

    cmd.assert()
        .failure()
        .stdout(predicate::str::contains("Transactions: 4"))
        .stderr(predicate::str::contains("gave up after 4 attempts"));
}

#[test]
fn cli_run_cycle_limit() {
    let mut cmd = bin_under_test().command();
    cmd.arg("run")
        .arg(format!("{DATA}/stuck.json"))
        .arg("--poll-delay")
        .arg("100")
        .arg("--max-cycles")
        .arg("50");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("did not finish within 50 cycles"));
}

#[test]
fn cli_run_missing_file() {
    let mut cmd = bin_under_test().command();
    cmd.arg("run").arg(format!("{DATA}/missing.json"));

    cmd.assert().failure().stderr(predicate::str::contains("Failed to read script file"));
}

#[test]
fn cli_assemble() {
    let output_file = std::env::temp_dir().join("cli_assemble.mem");

    let mut cmd = bin_under_test().command();
    cmd.arg("assemble")
        .arg(format!("{DATA}/blink.json"))
        .arg(format!("{DATA}/fault.json"))
        .arg("--output")
        .arg(output_file.as_path());
    cmd.assert().success().stdout(predicate::str::contains("Assembled 2 scripts"));

    let mem = fs::read_to_string(&output_file).unwrap();
    assert!(mem.starts_with("// blink\n@0000\n"));
    assert!(mem.contains("// fault\n@"));
    // every word line is 14 hex digits
    assert!(
        mem.lines()
            .filter(|line| !line.starts_with("//") && !line.starts_with('@'))
            .all(|line| line.len() == 14 && line.chars().all(|c| c.is_ascii_hexdigit()))
    );
    fs::remove_file(&output_file).unwrap()
}
