/// Integration test suite — drives the compiled `code-atlas` binary via subprocess
/// over throwaway git repositories.
///
/// The `CARGO_BIN_EXE_code-atlas` environment variable is automatically set by
/// Cargo during `cargo test` to point to the compiled binary for the current
/// profile (debug or release).
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_code-atlas"))
}

/// Run a code-atlas command and assert it exits successfully.
/// Returns stdout as a String.
fn run_success(args: &[&str]) -> String {
    let out = Command::new(binary())
        .args(args)
        .output()
        .expect("failed to invoke code-atlas binary");
    let stdout = String::from_utf8_lossy(&out.stdout).to_string();
    let stderr = String::from_utf8_lossy(&out.stderr).to_string();
    assert!(
        out.status.success(),
        "command {:?} failed with status {:?}\nstdout: {}\nstderr: {}",
        args,
        out.status,
        stdout,
        stderr
    );
    stdout
}

/// Run a code-atlas command and assert it exits with a non-zero status.
/// Returns (stdout, stderr) as Strings.
fn run_failure(args: &[&str]) -> (String, String) {
    let out = Command::new(binary())
        .args(args)
        .output()
        .expect("failed to invoke code-atlas binary");
    let stdout = String::from_utf8_lossy(&out.stdout).to_string();
    let stderr = String::from_utf8_lossy(&out.stderr).to_string();
    assert!(
        !out.status.success(),
        "command {:?} expected to fail but exited successfully\nstdout: {}\nstderr: {}",
        args,
        stdout,
        stderr
    );
    (stdout, stderr)
}

fn git(root: &Path, args: &[&str]) {
    let status = Command::new("git")
        .arg("-C")
        .arg(root)
        .args(args)
        .status()
        .expect("git invocation");
    assert!(status.success(), "git {:?} failed", args);
}

/// Initialize a throwaway git repository containing `files`.
fn fixture(files: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().expect("tempdir");
    git(dir.path(), &["init", "-q"]);
    git(dir.path(), &["config", "user.email", "test@example.com"]);
    git(dir.path(), &["config", "user.name", "test"]);
    for (rel, contents) in files {
        let path = dir.path().join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }
    git(dir.path(), &["add", "."]);
    dir
}

fn two_file_fixture() -> TempDir {
    fixture(&[
        (
            "pages/home.tsx",
            "import { formatDate } from '../utils/fmt';\nexport default function Home() { return null; }\n",
        ),
        ("utils/fmt.ts", "export function formatDate() { return ''; }\n"),
    ])
}

fn read_snapshot(root: &Path) -> serde_json::Value {
    let raw = fs::read_to_string(root.join(".code-atlas/index.json")).expect("snapshot exists");
    serde_json::from_str(&raw).expect("snapshot is valid JSON")
}

// ---------------------------------------------------------------------------
// index
// ---------------------------------------------------------------------------

#[test]
fn test_index_writes_snapshot_and_digest() {
    let dir = two_file_fixture();
    let path = dir.path().to_str().unwrap();

    let stdout = run_success(&["index", path]);
    assert!(
        stdout.contains("Indexed 2 files"),
        "unexpected summary: {stdout}"
    );
    assert!(dir.path().join(".code-atlas/index.json").is_file());
    assert!(dir.path().join(".code-atlas/digest.md").is_file());

    let digest = fs::read_to_string(dir.path().join(".code-atlas/digest.md")).unwrap();
    assert!(digest.contains("# Code atlas digest"));
    assert!(digest.contains("utils/fmt.ts"), "most-referenced section lists the shared module");
}

#[test]
fn test_index_json_summary() {
    let dir = two_file_fixture();
    let path = dir.path().to_str().unwrap();

    let stdout = run_success(&["index", "--json", path]);
    let parsed: serde_json::Value =
        serde_json::from_str(&stdout).expect("index --json output is not valid JSON");
    assert_eq!(parsed["file_count"].as_u64(), Some(2));
    assert_eq!(parsed["parsed"].as_u64(), Some(2));
    assert_eq!(parsed["carried"].as_u64(), Some(0));
}

#[test]
fn test_end_to_end_graph_facts() {
    let dir = two_file_fixture();
    let path = dir.path().to_str().unwrap();
    run_success(&["index", path]);

    let snapshot = read_snapshot(dir.path());
    assert_eq!(
        snapshot["graph"]["deps"]["pages/home.tsx"]["local"],
        serde_json::json!(["utils/fmt.ts"])
    );
    assert_eq!(
        snapshot["graph"]["reverse_deps"]["utils/fmt.ts"],
        serde_json::json!(["pages/home.tsx"])
    );
    assert_eq!(
        snapshot["files"]["utils/fmt.ts"]["exports"]["named"],
        serde_json::json!(["formatDate"])
    );
    assert_eq!(
        snapshot["files"]["pages/home.tsx"]["semantic"]["routes"],
        serde_json::json!(["/home"])
    );
    // Every file has a reverse_deps entry, even when empty.
    assert_eq!(
        snapshot["graph"]["reverse_deps"]["pages/home.tsx"],
        serde_json::json!([])
    );
}

#[test]
fn test_repeat_run_is_identical_apart_from_timestamp() {
    let dir = two_file_fixture();
    let path = dir.path().to_str().unwrap();

    run_success(&["index", path]);
    let mut first = read_snapshot(dir.path());

    let stdout = run_success(&["index", path]);
    assert!(stdout.contains("2 carried"), "second run carries everything: {stdout}");
    let mut second = read_snapshot(dir.path());

    first.as_object_mut().unwrap().remove("generated_at");
    second.as_object_mut().unwrap().remove("generated_at");
    assert_eq!(first, second);
}

#[test]
fn test_index_outside_git_repository_fails() {
    let dir = TempDir::new().unwrap();
    let isolated = dir.path().join("deep");
    fs::create_dir_all(&isolated).unwrap();
    // A bogus .git file makes git refuse the directory even when some
    // ancestor of the tempdir is itself a repository.
    fs::write(isolated.join(".git"), "gitdir: /nonexistent").unwrap();

    let (_, stderr) = run_failure(&["index", isolated.to_str().unwrap()]);
    assert!(
        stderr.contains("git"),
        "failure should mention git: {stderr}"
    );
    assert!(!isolated.join(".code-atlas").exists(), "no partial snapshot");
}

// ---------------------------------------------------------------------------
// describe
// ---------------------------------------------------------------------------

#[test]
fn test_describe_requires_snapshot() {
    let dir = two_file_fixture();
    let path = dir.path().to_str().unwrap();
    let (_, stderr) = run_failure(&["describe", path]);
    assert!(
        stderr.contains("index"),
        "error should point at the index command: {stderr}"
    );
}

#[test]
fn test_describe_generates_then_carries() {
    let dir = two_file_fixture();
    let path = dir.path().to_str().unwrap();
    run_success(&["index", path]);

    let stdout = run_success(&["describe", path]);
    assert!(stdout.contains("2 generated"), "first pass generates: {stdout}");
    assert!(dir.path().join(".code-atlas/descriptions.json").is_file());
    assert!(dir.path().join(".code-atlas/descriptions.md").is_file());

    let stdout = run_success(&["describe", path]);
    assert!(stdout.contains("2 carried"), "second pass carries: {stdout}");

    let raw = fs::read_to_string(dir.path().join(".code-atlas/descriptions.json")).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&raw).unwrap();
    let record = &parsed["descriptions"]["pages/home.tsx"];
    assert_eq!(record["needs_review"].as_bool(), Some(true));
    assert!(record["carried_from"].is_u64(), "carried record has provenance");
    assert!(
        record["description"]
            .as_str()
            .unwrap()
            .starts_with("Page-level view module."),
        "template opening clause present"
    );
}

#[test]
fn test_describe_digest_flags_review() {
    let dir = fixture(&[("utils/fmt.ts", "export const fmt = () => '';\n")]);
    let path = dir.path().to_str().unwrap();
    run_success(&["index", path]);
    run_success(&["describe", path]);

    let digest = fs::read_to_string(dir.path().join(".code-atlas/descriptions.md")).unwrap();
    assert!(digest.contains("## utility"));
    assert!(digest.contains("**utils/fmt.ts** (review)"));
}
