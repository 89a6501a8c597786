use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const FIXTURE: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/corpus.xml");

/// Run `scaimc` against a database and data directory inside `dir`. The
/// corpus URLs point at the discard port so nothing reaches the network.
fn scaimc(dir: &Path) -> Command {
    let mut cmd: Command = cargo_bin_cmd!("scaimc").into();
    cmd.current_dir(dir);
    cmd.env("NO_COLOR", "1");
    cmd.env("SCAIMC_TRAIN_URL", "http://127.0.0.1:9/train.xml");
    cmd.env("SCAIMC_TEST_URL", "http://127.0.0.1:9/test.xml");
    cmd.env_remove("SCAIMC_FORCE_DOWNLOAD");
    cmd.arg("--data-dir").arg(dir.join("data"));
    cmd.arg("--db").arg(dir.join("scaimc.db"));
    cmd
}

fn populated() -> TempDir {
    let tmp = TempDir::new().unwrap();
    scaimc(tmp.path())
        .args(["populate", "--file", FIXTURE])
        .assert()
        .success();
    tmp
}

fn data_file(dir: &Path, name: &str) -> PathBuf {
    let data = dir.join("data");
    fs::create_dir_all(&data).unwrap();
    data.join(name)
}

// --- Binary startup ---

#[test]
fn binary_runs() {
    let mut cmd: Command = cargo_bin_cmd!("scaimc").into();
    cmd.arg("--version");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("scaimc"));
}

#[test]
fn help_lists_commands() {
    let mut cmd: Command = cargo_bin_cmd!("scaimc").into();
    cmd.arg("--help");
    cmd.assert().success().stdout(
        predicate::str::contains("populate")
            .and(predicate::str::contains("summarize"))
            .and(predicate::str::contains("export")),
    );
}

// --- Populate ---

#[test]
fn populate_from_file() {
    let tmp = TempDir::new().unwrap();
    scaimc(tmp.path())
        .args(["populate", "--file", FIXTURE])
        .assert()
        .success()
        .stderr(predicate::str::contains("Pairs: 3"));

    assert!(tmp.path().join("scaimc.db").exists());
}

#[test]
fn populate_twice_is_skipped() {
    let tmp = populated();
    scaimc(tmp.path())
        .args(["populate", "--file", FIXTURE])
        .assert()
        .success()
        .stderr(predicate::str::contains("already populated"));

    scaimc(tmp.path())
        .arg("summarize")
        .assert()
        .success()
        .stdout(predicate::str::contains("associations: 3"));
}

#[test]
fn populate_reset_reloads() {
    let tmp = populated();
    scaimc(tmp.path())
        .args(["populate", "--reset", "--file", FIXTURE])
        .assert()
        .success()
        .stderr(predicate::str::contains("Associations: 3"));

    scaimc(tmp.path())
        .arg("summarize")
        .assert()
        .success()
        .stdout(predicate::str::contains("associations: 3"));
}

#[test]
fn populate_reset_with_bad_file_keeps_data() {
    let tmp = populated();
    let bad = tmp.path().join("bad.xml");
    fs::write(&bad, "<corpus><document origId=\"1\">").unwrap();

    scaimc(tmp.path())
        .args(["populate", "--reset", "--file"])
        .arg(&bad)
        .assert()
        .failure();

    scaimc(tmp.path())
        .arg("summarize")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("mirnas: 1")
                .and(predicate::str::contains("associations: 3")),
        );
}

#[test]
fn populate_reset_without_corpus_keeps_data() {
    let tmp = populated();

    scaimc(tmp.path())
        .args(["populate", "--reset"])
        .assert()
        .failure();

    scaimc(tmp.path())
        .arg("summarize")
        .assert()
        .success()
        .stdout(predicate::str::contains("associations: 3"));
}

#[test]
fn populate_uses_cached_corpus() {
    let tmp = TempDir::new().unwrap();
    let corpus = fs::read_to_string(FIXTURE).unwrap();
    fs::write(data_file(tmp.path(), "miRNA-Train-Corpus.xml"), &corpus).unwrap();
    fs::write(
        data_file(tmp.path(), "miRNA-Test-Corpus.xml"),
        corpus.replace("12345", "11111").replace("67890", "22222"),
    )
    .unwrap();

    scaimc(tmp.path())
        .arg("populate")
        .assert()
        .success()
        .stderr(predicate::str::contains("Pairs: 6"));

    scaimc(tmp.path())
        .arg("summarize")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("mirnas: 1")
                .and(predicate::str::contains("diseases_or_genes: 2"))
                .and(predicate::str::contains("associations: 6")),
        );
}

#[test]
fn populate_without_corpus_fails_offline() {
    let tmp = TempDir::new().unwrap();
    scaimc(tmp.path()).arg("populate").assert().failure();

    scaimc(tmp.path())
        .arg("summarize")
        .assert()
        .success()
        .stdout(predicate::str::contains("associations: 0"));
}

#[test]
fn populate_malformed_file_commits_nothing() {
    let tmp = TempDir::new().unwrap();
    let bad = tmp.path().join("bad.xml");
    fs::write(&bad, "<corpus><document origId=\"1\">").unwrap();

    scaimc(tmp.path())
        .arg("populate")
        .arg("--file")
        .arg(&bad)
        .assert()
        .failure();

    scaimc(tmp.path())
        .arg("summarize")
        .assert()
        .success()
        .stdout(predicate::str::contains("mirnas: 0"));
}

// --- Summarize ---

#[test]
fn summarize_counts() {
    let tmp = populated();
    scaimc(tmp.path())
        .arg("summarize")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("mirnas: 1")
                .and(predicate::str::contains("diseases_or_genes: 2"))
                .and(predicate::str::contains("associations: 3")),
        );
}

#[test]
fn summarize_empty_database() {
    let tmp = TempDir::new().unwrap();
    scaimc(tmp.path())
        .arg("summarize")
        .assert()
        .success()
        .stdout(predicate::str::contains("associations: 0"));
}

// --- Export ---

#[test]
fn export_bel_to_stdout() {
    let tmp = populated();
    scaimc(tmp.path())
        .arg("export")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("m(SCAIMC:\"miR-21\") association path(SCAIMC:\"glioma\")")
                .and(predicate::str::contains("path(SCAIMC:\"PTEN\")"))
                .and(predicate::str::contains("SET Citation = {\"PubMed\", \"12345\"}"))
                .and(predicate::str::contains("SET InteractionType = \"inhibition\"")),
        );
}

#[test]
fn export_json_to_file() {
    let tmp = populated();
    let out = tmp.path().join("graph.json");
    scaimc(tmp.path())
        .args(["export", "--format", "json", "--output"])
        .arg(&out)
        .assert()
        .success()
        .stderr(predicate::str::contains("3 nodes and 3 edges"));

    let doc: serde_json::Value = serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(doc["nodes"].as_array().unwrap().len(), 3);
    assert_eq!(doc["links"].as_array().unwrap().len(), 3);
}

#[test]
fn export_rejects_unknown_format() {
    let tmp = TempDir::new().unwrap();
    scaimc(tmp.path())
        .args(["export", "--format", "graphml"])
        .assert()
        .failure();
}

// --- Drop ---

#[test]
fn drop_clears_database() {
    let tmp = populated();
    scaimc(tmp.path())
        .arg("drop")
        .assert()
        .success()
        .stderr(predicate::str::contains("Dropped"));

    scaimc(tmp.path())
        .arg("summarize")
        .assert()
        .success()
        .stdout(predicate::str::contains("associations: 0"));
}

// --- Download ---

#[test]
fn download_uses_cached_files() {
    let tmp = TempDir::new().unwrap();
    fs::write(data_file(tmp.path(), "miRNA-Train-Corpus.xml"), "<corpus/>").unwrap();
    fs::write(data_file(tmp.path(), "miRNA-Test-Corpus.xml"), "<corpus/>").unwrap();

    scaimc(tmp.path())
        .arg("download")
        .assert()
        .success()
        .stdout(predicate::str::contains("miRNA-Train-Corpus.xml"));
}

#[test]
fn download_failure_is_reported() {
    let tmp = TempDir::new().unwrap();
    scaimc(tmp.path()).arg("download").assert().failure();
}
