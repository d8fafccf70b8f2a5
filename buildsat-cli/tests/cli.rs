use std::io::Write;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::NamedTempFile;

fn cnf_file(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{}", content).unwrap();
    file
}

fn buildsat() -> Command {
    Command::cargo_bin("buildsat").unwrap()
}

#[test]
fn no_arguments_prints_usage() {
    buildsat()
        .assert()
        .code(0)
        .stdout(predicate::str::contains("USAGE"));
}

#[test]
fn version_flag() {
    buildsat()
        .arg("--version")
        .assert()
        .code(0)
        .stdout(predicate::str::contains("buildsat"));
}

#[test]
fn missing_file_reports_error() {
    buildsat()
        .arg("does-not-exist.cnf")
        .assert()
        .code(1)
        .stdout(predicate::str::contains("c FILE NOT FOUND"));
}

#[test]
fn trivial_sat() {
    let file = cnf_file("p cnf 1 1\n1 0\n");
    buildsat()
        .arg(file.path())
        .assert()
        .code(10)
        .stdout(predicate::str::contains("s SATISFIABLE"));
}

#[test]
fn conflicting_units_unsat_at_parse() {
    let file = cnf_file("p cnf 1 2\n1 0\n-1 0\n");
    buildsat()
        .arg(file.path())
        .assert()
        .code(20)
        .stdout(predicate::str::contains("s UNSATISFIABLE"));
}

#[test]
fn pigeon_hole_unsat() {
    // Three pigeons in two holes.
    let file = cnf_file(
        "p cnf 6 9\n\
         1 2 0\n\
         3 4 0\n\
         5 6 0\n\
         -1 -3 0\n\
         -1 -5 0\n\
         -3 -5 0\n\
         -2 -4 0\n\
         -2 -6 0\n\
         -4 -6 0\n",
    );
    buildsat()
        .arg(file.path())
        .assert()
        .code(20)
        .stdout(predicate::str::contains("s UNSATISFIABLE"));
}

#[test]
fn propagate_mode_buildable() {
    // Selecting x1 forces x3; x2 stays free but defaults cleanly.
    let file = cnf_file("c v 1 1\np cnf 3 2\n1 2 0\n-1 3 0\n");
    buildsat()
        .arg("--propagate")
        .arg(file.path())
        .assert()
        .code(30)
        .stdout(predicate::str::contains("v 1 3").and(predicate::str::contains("s BUILDABLE")));
}

#[test]
fn propagate_mode_incomplete() {
    // Nothing selected, but (x1 v x2) rules out defaulting both to false.
    let file = cnf_file("p cnf 2 1\n1 2 0\n");
    buildsat()
        .arg("--propagate")
        .arg(file.path())
        .assert()
        .code(40)
        .stdout(predicate::str::contains("s INCOMPLETE"));
}

#[test]
fn propagate_mode_dead_vars() {
    // Dead x1 forces x2 via (x1 v x2).
    let file = cnf_file("c d 1 1\np cnf 2 1\n1 2 0\n");
    buildsat()
        .arg("--propagate")
        .arg(file.path())
        .assert()
        .code(30)
        .stdout(predicate::str::contains("v -1 2").and(predicate::str::contains("s BUILDABLE")));
}

#[test]
fn status_mode_invalid_on_unsat_formula() {
    let file = cnf_file("c v 1 1\np cnf 1 2\n1 0\n-1 0\n");
    buildsat()
        .arg("--status")
        .arg(file.path())
        .assert()
        .code(50)
        .stdout(predicate::str::contains("s INVALID"));
}

#[test]
fn status_mode_invalid_on_dead_selection() {
    let file = cnf_file("c d 1 2\nc v 1 2\np cnf 2 1\n1 2 0\n");
    buildsat()
        .arg("--status")
        .arg(file.path())
        .assert()
        .code(50)
        .stdout(predicate::str::contains("s INVALID"));
}

#[test]
fn status_mode_buildable() {
    // x1 satisfies the only clause, x2 defaults to false.
    let file = cnf_file("c v 1 1\np cnf 2 1\n1 2 0\n");
    buildsat()
        .arg("--status")
        .arg(file.path())
        .assert()
        .code(30)
        .stdout(predicate::str::contains("s BUILDABLE"));
}

#[test]
fn status_mode_incomplete() {
    // Status mode does not propagate: selecting x1 leaves (-x1 v x3) waiting for x3.
    let file = cnf_file("c v 1 1\np cnf 3 2\n1 2 0\n-1 3 0\n");
    buildsat()
        .arg("--status")
        .arg(file.path())
        .assert()
        .code(40)
        .stdout(predicate::str::contains("s INCOMPLETE"));
}

#[test]
fn parse_error_exits_with_error() {
    let file = cnf_file("p cnf 2 1\n1 ? 0\n");
    buildsat().arg(file.path()).assert().code(1);
}
