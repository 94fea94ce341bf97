use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

fn bindery() -> Command {
    Command::cargo_bin("bindery").unwrap()
}

#[test]
fn init_then_create_then_tree() {
    let dir = tempdir().unwrap();
    let book = dir.path().to_str().unwrap();

    bindery()
        .args(["--book", book, "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized"));

    bindery()
        .args(["--book", book, "new", "chapter", "Opening Moves"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Opening Moves"));

    bindery()
        .args(["--book", book, "tree"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Opening Moves"));
}

#[test]
fn init_twice_fails() {
    let dir = tempdir().unwrap();
    let book = dir.path().to_str().unwrap();

    bindery().args(["--book", book, "init"]).assert().success();
    bindery()
        .args(["--book", book, "init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already initialized"));
}

#[test]
fn rm_with_yes_recycles_into_the_bin() {
    let dir = tempdir().unwrap();
    let book = dir.path().to_str().unwrap();

    bindery().args(["--book", book, "init"]).assert().success();
    bindery()
        .args(["--book", book, "new", "snip", "Loose Thought"])
        .assert()
        .success();

    // find the snip's store path from the tree listing
    let output = bindery()
        .args(["--book", book, "tree", "--paths"])
        .output()
        .unwrap();
    let stdout = String::from_utf8(output.stdout).unwrap();
    let snip_path = stdout
        .lines()
        .find(|line| line.contains("Loose Thought"))
        .and_then(|line| line.split_whitespace().last())
        .unwrap()
        .to_string();

    bindery()
        .args(["--book", book, "-y", "rm", &snip_path])
        .assert()
        .success()
        .stdout(predicate::str::contains("Recycled 1"));

    bindery()
        .args(["--book", book, "bin"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Loose Thought"));
}
