use std::fs;

use bggdeck::formats::GameRecord;
use predicates::prelude::*;

fn record(id: &str, name: &str) -> GameRecord {
    GameRecord {
        id: id.to_owned(),
        name: name.to_owned(),
        image: None,
        year_published: Some(2004),
        min_players: Some(2),
        max_players: Some(5),
        playing_time_minutes: Some(60),
        complexity_weight: Some(1.9),
        description: Some("Route building across a map.".to_owned()),
        designers: vec!["Alan R. Moon".to_owned()],
        artists: Vec::new(),
    }
}

fn write_records(dir: &std::path::Path, count: usize) -> std::path::PathBuf {
    let records = (0..count)
        .map(|i| record(&i.to_string(), &format!("Game {i}")))
        .collect::<Vec<_>>();
    let path = dir.join("records.json");
    fs::write(&path, serde_json::to_string(&records).unwrap()).unwrap();
    path
}

#[test]
fn layout_writes_sheets_json() {
    let temp = tempfile::tempdir().unwrap();
    let records = write_records(temp.path(), 11);
    let out = temp.path().join("sheets.json");

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("bggdeck");
    cmd.args(["layout", "--records"])
        .arg(&records)
        .arg("--out")
        .arg(&out)
        .assert()
        .success();

    let sheets: serde_json::Value = serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
    let sheets = sheets.as_array().unwrap();
    assert_eq!(sheets.len(), 2);
    assert_eq!(sheets[0]["slots"].as_array().unwrap().len(), 9);
    assert_eq!(sheets[1]["slots"].as_array().unwrap().len(), 2);
    assert_eq!(sheets[1]["slots"][1]["record"]["id"], "10");
}

#[test]
fn layout_writes_print_html_without_bleed() {
    let temp = tempfile::tempdir().unwrap();
    let records = write_records(temp.path(), 1);
    let out = temp.path().join("deck.html");

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("bggdeck");
    cmd.args(["layout", "--format", "html", "--no-bleed", "--records"])
        .arg(&records)
        .arg("--out")
        .arg(&out)
        .assert()
        .success();

    let html = fs::read_to_string(&out).unwrap();
    assert!(html.contains("@page { size: 210mm 297mm; margin: 0; }"));
    assert!(html.contains("width: 63.5mm; height: 88.9mm;"));
    assert!(html.contains("<span class=\"players\">2-5</span>"));
    assert!(html.contains("Design: Alan R. Moon"));
}

#[test]
fn layout_yaml_is_validated() {
    let temp = tempfile::tempdir().unwrap();
    let records = write_records(temp.path(), 1);
    let layout = temp.path().join("layout.yaml");
    fs::write(&layout, "columns: 0\n").unwrap();

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("bggdeck");
    cmd.args(["layout", "--records"])
        .arg(&records)
        .arg("--layout")
        .arg(&layout)
        .arg("--out")
        .arg(temp.path().join("sheets.json"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("at least one cell"));
}

#[test]
fn print_requires_ids_or_username() {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("bggdeck");
    cmd.args(["print", "--out", "deck.pdf"])
        .assert()
        .failure()
        .code(2);
}

#[test]
fn rust_log_debug_emits_debug_line_to_stderr() {
    let temp = tempfile::tempdir().unwrap();
    let records = write_records(temp.path(), 0);

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("bggdeck");
    cmd.env("RUST_LOG", "debug")
        .args(["layout", "--records"])
        .arg(&records)
        .arg("--out")
        .arg(temp.path().join("sheets.json"))
        .assert()
        .success()
        .stderr(predicate::str::contains("parsed cli"));
}
