use clap::Parser;
use dupewalk::cli::Cli;
use dupewalk::config::{Config, Overrides};
use dupewalk::scanner::{DigestAlgorithm, Strategy};
use std::fs;
use std::sync::{MutexGuard, PoisonError};
use tempfile::tempdir;

fn lock_env() -> MutexGuard<'static, ()> {
    crate::ENV_MUTEX.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Clear all DUPEWALK_* environment variables to avoid interference.
fn clear_env() {
    for (key, _) in std::env::vars() {
        if key.starts_with("DUPEWALK_") {
            std::env::remove_var(key);
        }
    }
}

#[test]
fn test_load_from_file() {
    let _lock = lock_env();
    clear_env();
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(
        &path,
        r#"
workers = 6
skip_dirs = ["target", "dist"]
no_default_skip = true
strategy = "content"
digest = "sha256"
"#,
    )
    .unwrap();

    let config = Config::load(Some(&path), &Overrides::default()).unwrap();

    assert_eq!(config.workers, 6);
    assert_eq!(config.skip_dirs, vec!["target", "dist"]);
    assert!(config.no_default_skip);
    assert_eq!(config.strategy, Strategy::Content);
    assert_eq!(config.digest, DigestAlgorithm::Sha256);
}

#[test]
fn test_env_overrides_file() {
    let _lock = lock_env();
    clear_env();
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "workers = 6\nstrategy = \"name\"\n").unwrap();

    std::env::set_var("DUPEWALK_WORKERS", "9");
    std::env::set_var("DUPEWALK_STRATEGY", "content");
    let config = Config::load(Some(&path), &Overrides::default());
    clear_env();

    let config = config.unwrap();
    assert_eq!(config.workers, 9);
    assert_eq!(config.strategy, Strategy::Content);
}

#[test]
fn test_cli_overrides_env_and_file() {
    let _lock = lock_env();
    clear_env();
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "workers = 6\nskip_dirs = [\"target\"]\n").unwrap();

    std::env::set_var("DUPEWALK_WORKERS", "9");
    let cli = Cli::try_parse_from([
        "dupewalk",
        "/data",
        "-w",
        "2",
        "--skip",
        "build",
        "--digest",
        "sha256",
        "-v",
    ])
    .unwrap();
    let config = Config::load(Some(&path), &Overrides::from(&cli));
    clear_env();

    let config = config.unwrap();
    assert_eq!(config.workers, 2);
    assert_eq!(config.skip_dirs, vec!["target", "build"]);
    assert_eq!(config.digest, DigestAlgorithm::Sha256);
    assert_eq!(config.strategy, Strategy::Name);
    assert!(config.verbose);
}

#[test]
fn test_empty_file_gives_defaults() {
    let _lock = lock_env();
    clear_env();
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "").unwrap();

    let config = Config::load(Some(&path), &Overrides::default()).unwrap();
    assert_eq!(config, Config::default());
}

#[test]
fn test_invalid_env_value_is_error() {
    let _lock = lock_env();
    clear_env();
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "").unwrap();

    std::env::set_var("DUPEWALK_WORKERS", "many");
    let result = Config::load(Some(&path), &Overrides::default());
    clear_env();

    assert!(result.is_err());
}

#[test]
fn test_walk_config_from_loaded_config() {
    let _lock = lock_env();
    clear_env();
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "workers = 3\nstrategy = \"content\"\n").unwrap();

    let walk = Config::load(Some(&path), &Overrides::default())
        .unwrap()
        .to_walk_config();

    assert_eq!(walk.workers, 3);
    assert_eq!(walk.fingerprinter.name(), "blake3");
    assert!(walk.is_skipped("node_modules"));
}

#[test]
fn test_verbose_from_env_raises_log_level() {
    let _lock = lock_env();
    clear_env();
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "").unwrap();

    std::env::set_var("DUPEWALK_VERBOSE", "true");
    let config = Config::load(Some(&path), &Overrides::default());
    clear_env();

    let config = config.unwrap();
    assert!(config.verbose);
    assert_eq!(config.log_verbosity(0), 1);
    assert!(config.to_walk_config().verbose);
}
