use clap::Parser;
use dupewalk::cli::Cli;
use dupewalk::error::ExitCode;
use dupewalk::run_app;
use std::fs;
use std::path::Path;
use std::sync::PoisonError;
use tempfile::{tempdir, TempDir};

/// Run the app against `root`, writing the report into a scratch dir.
/// An empty config file keeps the user's own config out of the test.
fn run(root: &Path, extra: &[&str]) -> (anyhow::Result<ExitCode>, String) {
    let scratch = TempDir::new().unwrap();
    let report = scratch.path().join("report.out");
    let config = scratch.path().join("config.toml");
    fs::write(&config, "").unwrap();

    let mut args = vec![
        "dupewalk".to_string(),
        root.to_string_lossy().into_owned(),
        "-q".to_string(),
        "--config".to_string(),
        config.to_string_lossy().into_owned(),
        "--report".to_string(),
        report.to_string_lossy().into_owned(),
    ];
    args.extend(extra.iter().map(|s| s.to_string()));

    let cli = Cli::try_parse_from(args).unwrap();
    let result = {
        let _lock = crate::ENV_MUTEX.lock().unwrap_or_else(PoisonError::into_inner);
        run_app(cli)
    };
    let text = fs::read_to_string(&report).unwrap_or_default();
    (result, text)
}

fn setup_duplicates() -> TempDir {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.txt"), "hi").unwrap();
    fs::write(dir.path().join("b.txt"), "hi").unwrap();
    fs::write(dir.path().join("c.txt"), "bye").unwrap();
    dir
}

#[test]
fn test_exit_success_when_duplicates_found() {
    let dir = setup_duplicates();
    let (result, text) = run(dir.path(), &["--strategy", "content"]);

    assert_eq!(result.unwrap(), ExitCode::Success);
    assert!(text.contains("a.txt"));
    assert!(text.contains("b.txt"));
    assert!(!text.contains("c.txt"));
}

#[test]
fn test_exit_no_duplicates_with_name_strategy() {
    let dir = setup_duplicates();
    let (result, text) = run(dir.path(), &[]);

    assert_eq!(result.unwrap(), ExitCode::NoDuplicates);
    assert!(text.starts_with("3 files in 3 groups"));
}

#[test]
fn test_paths_output_with_all() {
    let dir = setup_duplicates();
    let (result, text) = run(dir.path(), &["--output", "paths", "--all"]);

    assert_eq!(result.unwrap(), ExitCode::NoDuplicates);
    let mut lines: Vec<&str> = text.lines().collect();
    lines.sort();
    assert_eq!(lines.len(), 3);
    assert!(lines.iter().all(|l| Path::new(l).is_absolute()));
}

#[test]
fn test_json_output() {
    let dir = setup_duplicates();
    let (result, text) = run(
        dir.path(),
        &["--strategy", "content", "--digest", "sha256", "--output", "json"],
    );

    assert_eq!(result.unwrap(), ExitCode::Success);
    let value: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(value["groups"].as_array().unwrap().len(), 1);
    assert_eq!(value["groups"][0]["files"].as_array().unwrap().len(), 2);
    assert_eq!(value["summary"]["total_files"], 3);
}

#[test]
fn test_filters_can_remove_all_duplicates() {
    let dir = setup_duplicates();

    let (result, _) = run(dir.path(), &["--strategy", "content", "--ext", "pdf"]);
    assert_eq!(result.unwrap(), ExitCode::NoDuplicates);

    let (result, _) = run(dir.path(), &["--strategy", "content", "--min-size", "10"]);
    assert_eq!(result.unwrap(), ExitCode::NoDuplicates);

    let (result, _) = run(dir.path(), &["--strategy", "content", "--ext", "TXT"]);
    assert_eq!(result.unwrap(), ExitCode::Success);
}

#[test]
fn test_skip_flag_prunes_directory() {
    let dir = setup_duplicates();
    let build = dir.path().join("build");
    fs::create_dir(&build).unwrap();
    fs::write(build.join("c.txt"), "bye").unwrap();

    let (result, text) = run(
        dir.path(),
        &["--strategy", "content", "--skip", "build", "--output", "paths", "--all"],
    );
    assert_eq!(result.unwrap(), ExitCode::Success);
    assert_eq!(text.lines().count(), 3);
    assert!(text.lines().all(|line| !line.contains("/build/")));

    let (result, text) = run(
        dir.path(),
        &["--strategy", "content", "--output", "paths"],
    );
    assert_eq!(result.unwrap(), ExitCode::Success);
    assert_eq!(text.lines().count(), 4);
    assert!(text.lines().any(|line| line.contains("/build/")));
}

#[test]
fn test_relative_path_is_resolved() {
    // The current directory is the package root, which has a src/ dir.
    let (result, _) = run(Path::new("src"), &["--workers", "2"]);
    assert!(result.is_ok());
}

#[test]
fn test_missing_path_is_error() {
    let dir = tempdir().unwrap();
    let (result, _) = run(&dir.path().join("missing"), &[]);

    let err = result.unwrap_err();
    assert!(format!("{err:#}").contains("Path not found"));
}

#[test]
fn test_zero_workers_is_error() {
    let dir = setup_duplicates();
    let (result, _) = run(dir.path(), &["--workers", "0"]);
    assert!(result.is_err());
}
