use assert_cmd::prelude::*;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::Path;
use std::process::Command;

fn deck(config_dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("deck").expect("bin");
    cmd.arg("--config")
        .arg(config_dir.join("config.json"))
        .env_remove("DECK_BACKEND")
        .env_remove("DECK_API_URL")
        .env_remove("DECK_LOG_PATH")
        .env_remove("RUST_LOG")
        .env("DECK_STUB_DELAY_MS", "0");
    cmd
}

fn slides_from(output: &[u8]) -> Vec<Value> {
    let value: Value = serde_json::from_slice(output).unwrap();
    value.as_array().cloned().unwrap()
}

fn heading(slide: &Value) -> &str {
    slide["blocks"][0]["text"].as_str().unwrap()
}

#[test]
fn parse_finalizes_open_slide() {
    let tmp = tempfile::tempdir().unwrap();
    let file = tmp.path().join("deck.xml");
    fs::write(
        &file,
        "<slide><heading>Intro</heading></slide><slide><heading>Next",
    )
    .unwrap();

    let output = deck(tmp.path()).arg("parse").arg(&file).output().unwrap();
    assert!(output.status.success());

    let slides = slides_from(&output.stdout);
    assert_eq!(slides.len(), 2);
    assert_eq!(heading(&slides[0]), "Intro");
    assert_eq!(heading(&slides[1]), "Next");
    assert!(slides.iter().all(|s| s["generating"] == Value::Bool(false)));
}

#[test]
fn parse_partial_keeps_tail_generating() {
    let tmp = tempfile::tempdir().unwrap();
    let file = tmp.path().join("deck.xml");
    fs::write(
        &file,
        "<slide><heading>Intro</heading></slide><slide><heading>Next",
    )
    .unwrap();

    let output = deck(tmp.path())
        .args(["parse", "--partial"])
        .arg(&file)
        .output()
        .unwrap();
    assert!(output.status.success());

    let slides = slides_from(&output.stdout);
    assert_eq!(slides.len(), 2);
    assert_eq!(slides[0]["generating"], Value::Bool(false));
    assert_eq!(slides[1]["generating"], Value::Bool(true));
}

#[test]
fn parse_missing_file_fails() {
    let tmp = tempfile::tempdir().unwrap();
    deck(tmp.path())
        .arg("parse")
        .arg(tmp.path().join("nope.xml"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot read"));
}

#[test]
fn stub_generate_prints_slides_as_json() {
    let tmp = tempfile::tempdir().unwrap();
    let output = deck(tmp.path())
        .args(["--backend", "stub", "generate", "--topic", "Rust", "-n", "3", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let slides = slides_from(&output.stdout);
    assert_eq!(slides.len(), 3);
    assert_eq!(heading(&slides[0]), "Introduction to Rust");
    assert_eq!(heading(&slides[2]), "Summary and Next Steps");
    assert!(slides.iter().all(|s| s["generating"] == Value::Bool(false)));
}

#[test]
fn stub_generate_from_outline_file() {
    let tmp = tempfile::tempdir().unwrap();
    let outline = tmp.path().join("outline.md");
    fs::write(&outline, "# Borrowing\n- shared\n- mutable\n\n# Lifetimes\n- elision\n").unwrap();

    deck(tmp.path())
        .args(["--backend", "stub", "generate", "--title", "Rust"])
        .arg("--outline-file")
        .arg(&outline)
        .assert()
        .success()
        .stdout(predicate::str::contains("Slide 1: Borrowing"))
        .stdout(predicate::str::contains("Slide 2: Lifetimes"));
}

#[test]
fn stub_outline_lists_titles() {
    let tmp = tempfile::tempdir().unwrap();
    deck(tmp.path())
        .args(["--backend", "stub", "outline", "Rust", "-n", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1. Introduction to Rust"))
        .stdout(predicate::str::contains("2. Summary and Next Steps"));
}

#[test]
fn unknown_backend_is_rejected() {
    let tmp = tempfile::tempdir().unwrap();
    deck(tmp.path())
        .args(["--backend", "grpc", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown backend"));
}
