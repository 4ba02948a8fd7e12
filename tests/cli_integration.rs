//! Integration tests for the command-line interface
//!
//! Drives the built binary for the apply, check, and list commands.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

const DEFECTIVE: &str = include_str!("fixtures/service_defective.go");
const FIXED: &str = include_str!("fixtures/service_fixed.go");

fn sourcefix(args: &[&str], cwd: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_sourcefix"))
        .args(args)
        .current_dir(cwd)
        .env("NO_COLOR", "1")
        .output()
        .unwrap()
}

/// Helper to create a workspace laid out like the generated service
fn setup_workspace() -> TempDir {
    let dir = TempDir::new().unwrap();
    let module_dir = dir.path().join("internal/modules/convocations");
    fs::create_dir_all(&module_dir).unwrap();
    fs::write(module_dir.join("service.go"), DEFECTIVE).unwrap();
    dir
}

fn service_path(dir: &TempDir) -> std::path::PathBuf {
    dir.path().join("internal/modules/convocations/service.go")
}

#[test]
fn test_apply_help() {
    let dir = TempDir::new().unwrap();
    let output = sourcefix(&["apply", "--help"], dir.path());

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Apply rewrite rules to the target file"));
}

#[test]
fn test_apply_builtin_rules_default_target() {
    let workspace = setup_workspace();
    let output = sourcefix(&["apply"], workspace.path());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert!(stdout.contains("Target: internal/modules/convocations/service.go"));
    assert!(stdout.contains("split-builder-after-brace: applied (3 occurrences)"));
    assert!(stdout.contains("Summary:"));
    assert!(stdout.contains("Patched"));
    assert_eq!(fs::read_to_string(service_path(&workspace)).unwrap(), FIXED);
}

#[test]
fn test_apply_idempotent() {
    let workspace = setup_workspace();
    let first = sourcefix(&["apply"], workspace.path());
    assert!(first.status.success());

    let second = sourcefix(&["apply"], workspace.path());
    assert!(second.status.success());
    let stdout = String::from_utf8_lossy(&second.stdout);
    assert!(stdout.contains("already up to date"));
    assert!(!stdout.contains(": applied"));
    assert_eq!(fs::read_to_string(service_path(&workspace)).unwrap(), FIXED);
}

#[test]
fn test_apply_dry_run_with_diff() {
    let workspace = setup_workspace();
    let output = sourcefix(&["apply", "--dry-run", "--diff"], workspace.path());

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("DRY RUN"));
    assert!(stdout.contains("+\tcreateBuilder.SetHistorique(historiqueInitial)"));
    assert!(stdout.contains("nothing written"));
    assert_eq!(
        fs::read_to_string(service_path(&workspace)).unwrap(),
        DEFECTIVE
    );
}

#[test]
fn test_apply_missing_target_fails() {
    let dir = TempDir::new().unwrap();
    let output = sourcefix(&["apply", "--target", "missing.go"], dir.path());

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("failed to read missing.go"));
    assert!(!dir.path().join("missing.go").exists());
}

#[test]
fn test_apply_custom_rule_file() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("notes.txt"), "color colour color\n").unwrap();
    fs::write(
        dir.path().join("rules.toml"),
        r#"[meta]
name = "spelling"
target = "notes.txt"

[[rules]]
id = "british"
[rules.rewrite]
type = "literal"
search = "color"
replace = "colour"
"#,
    )
    .unwrap();

    let output = sourcefix(&["apply", "--rules", "rules.toml"], dir.path());
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("british: applied (2 occurrences)"));
    assert_eq!(
        fs::read_to_string(dir.path().join("notes.txt")).unwrap(),
        "colour colour colour\n"
    );
}

#[test]
fn test_apply_invalid_rule_file_leaves_target() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("notes.txt"), "abc\n").unwrap();
    fs::write(
        dir.path().join("rules.toml"),
        r#"[[rules]]
id = "broken"
[rules.rewrite]
type = "regex"
pattern = "(abc"
"#,
    )
    .unwrap();

    let output = sourcefix(
        &["apply", "--rules", "rules.toml", "--target", "notes.txt"],
        dir.path(),
    );
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("invalid regex"));
    assert_eq!(fs::read_to_string(dir.path().join("notes.txt")).unwrap(), "abc\n");
}

#[test]
fn test_apply_rule_directory_in_name_order() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("doc.txt"), "a\n").unwrap();
    let rules_dir = dir.path().join("rules");
    fs::create_dir(&rules_dir).unwrap();
    fs::write(
        rules_dir.join("20-second.toml"),
        r#"[[rules]]
id = "b-to-c"
[rules.rewrite]
type = "literal"
search = "b"
replace = "c"
"#,
    )
    .unwrap();
    fs::write(
        rules_dir.join("10-first.toml"),
        r#"[meta]
target = "doc.txt"

[[rules]]
id = "a-to-b"
[rules.rewrite]
type = "literal"
search = "a"
replace = "b"
"#,
    )
    .unwrap();

    let output = sourcefix(&["apply", "--rules", "rules"], dir.path());
    assert!(output.status.success());
    assert_eq!(fs::read_to_string(dir.path().join("doc.txt")).unwrap(), "c\n");
}

#[test]
fn test_check_reports_pending_then_clean() {
    let workspace = setup_workspace();

    let output = sourcefix(&["check"], workspace.path());
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("NOT PATCHED"));
    assert!(stderr.contains("create-historique"));
    assert_eq!(
        fs::read_to_string(service_path(&workspace)).unwrap(),
        DEFECTIVE
    );

    assert!(sourcefix(&["apply"], workspace.path()).status.success());

    let output = sourcefix(&["check"], workspace.path());
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("PATCHED"));
}

#[test]
fn test_list_builtin_rules() {
    let dir = TempDir::new().unwrap();
    let output = sourcefix(&["list"], dir.path());

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("type-corrections+line-breaks"));
    assert!(stdout.contains("1. create-donnees-completes [literal]"));
    assert!(stdout.contains("split-builder-after-brace [line-break]"));

    let first = stdout.find("create-donnees-completes").unwrap();
    let last = stdout.find("split-builder-after-brace").unwrap();
    assert!(first < last);
}
