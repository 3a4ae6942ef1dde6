use dupewalk::duplicates::ResultMap;
use dupewalk::scanner::{
    ContentDigest, DigestAlgorithm, Fingerprint, Fingerprinter, HashError, NameSize, ScanError,
    WalkConfig, WalkError, Walker,
};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tempfile::tempdir;

fn content_walker(workers: usize) -> Walker {
    Walker::new(
        WalkConfig::default()
            .with_workers(workers)
            .with_fingerprinter(Arc::new(ContentDigest::default())),
    )
}

fn group_names(map: &ResultMap) -> Vec<Vec<String>> {
    let mut groups: Vec<Vec<String>> = map
        .iter()
        .map(|(_, files)| {
            let mut names: Vec<String> = files.iter().map(|f| f.name()).collect();
            names.sort();
            names
        })
        .collect();
    groups.sort();
    groups
}

fn write_abc(dir: &Path) {
    fs::write(dir.join("a.txt"), "hi").unwrap();
    fs::write(dir.join("b.txt"), "hi").unwrap();
    fs::write(dir.join("c.txt"), "bye").unwrap();
}

#[test]
fn test_walk_empty_directory() {
    let dir = tempdir().unwrap();
    let results = Walker::default().walk(dir.path()).unwrap();
    assert!(results.is_empty());
    assert!(results.flatten().is_empty());
}

#[test]
fn test_name_size_keeps_distinct_names_apart() {
    let dir = tempdir().unwrap();
    write_abc(dir.path());

    let results = Walker::new(WalkConfig::default().with_workers(4))
        .walk(dir.path())
        .unwrap();

    assert_eq!(results.len(), 3);
    assert!(results.get(&Fingerprint::new("a.txt-2")).is_some());
    assert!(results.get(&Fingerprint::new("b.txt-2")).is_some());
    assert!(results.get(&Fingerprint::new("c.txt-3")).is_some());
}

#[test]
fn test_content_digest_groups_equal_content() {
    let dir = tempdir().unwrap();
    write_abc(dir.path());

    let results = content_walker(4).walk(dir.path()).unwrap();

    assert_eq!(
        group_names(&results),
        vec![
            vec!["a.txt".to_string(), "b.txt".to_string()],
            vec!["c.txt".to_string()],
        ]
    );
    assert_eq!(results.duplicates().count(), 1);
}

#[test]
fn test_sha256_digest_groups_like_blake3() {
    let dir = tempdir().unwrap();
    write_abc(dir.path());

    let config = WalkConfig::default()
        .with_workers(2)
        .with_fingerprinter(Arc::new(ContentDigest::new(DigestAlgorithm::Sha256)));
    let results = Walker::new(config).walk(dir.path()).unwrap();

    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|(key, _)| key.as_str().len() == 64));
}

#[test]
fn test_same_name_same_size_across_dirs() {
    let dir = tempdir().unwrap();
    for sub in ["one", "two", "three"] {
        let path = dir.path().join(sub);
        fs::create_dir(&path).unwrap();
        fs::write(path.join("report.pdf"), "12345").unwrap();
    }

    let results = Walker::new(WalkConfig::default().with_workers(3))
        .walk(dir.path())
        .unwrap();

    let group = results.get(&Fingerprint::new("report.pdf-5")).unwrap();
    assert_eq!(group.len(), 3);
}

#[test]
fn test_empty_files_never_collected() {
    let dir = tempdir().unwrap();
    write_abc(dir.path());
    fs::write(dir.path().join("empty1"), "").unwrap();
    let sub = dir.path().join("sub");
    fs::create_dir(&sub).unwrap();
    fs::write(sub.join("empty2"), "").unwrap();

    let results = content_walker(4).walk(dir.path()).unwrap();

    assert_eq!(results.total_files(), 3);
    assert!(results.flatten().iter().all(|f| f.stats.size > 0));
}

#[test]
fn test_every_file_flattened_exactly_once() {
    let dir = tempdir().unwrap();
    let mut expected = HashSet::new();
    for d in 0..5 {
        let mut path = dir.path().to_path_buf();
        for level in 0..=d {
            path.push(format!("level{level}"));
        }
        fs::create_dir_all(&path).unwrap();
        for f in 0..4 {
            let file = path.join(format!("f{f}.dat"));
            fs::write(&file, format!("{d}-{f}")).unwrap();
            expected.insert(file);
        }
    }

    let results = Walker::new(WalkConfig::default().with_workers(3))
        .walk(dir.path())
        .unwrap();
    let flattened: Vec<PathBuf> = results.flatten().into_iter().map(|f| f.path).collect();
    let unique: HashSet<PathBuf> = flattened.iter().cloned().collect();

    assert_eq!(flattened.len(), expected.len());
    assert_eq!(unique, expected);
}

#[test]
fn test_hidden_and_skip_dirs_contribute_nothing() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("keep.txt"), "keep").unwrap();
    for name in [".cache", "node_modules", "venv", "generated"] {
        let sub = dir.path().join(name).join("deep");
        fs::create_dir_all(&sub).unwrap();
        fs::write(sub.join("x.txt"), "pruned").unwrap();
    }

    let config = WalkConfig::default()
        .with_workers(4)
        .with_skip_dirs(["generated"]);
    let results = Walker::new(config).walk(dir.path()).unwrap();

    let names: Vec<String> = results.flatten().iter().map(|f| f.name()).collect();
    assert_eq!(names, vec!["keep.txt"]);
}

#[test]
fn test_no_default_skip_includes_node_modules() {
    let dir = tempdir().unwrap();
    let modules = dir.path().join("node_modules").join("left-pad");
    fs::create_dir_all(&modules).unwrap();
    fs::write(modules.join("index.js"), "module.exports = 1").unwrap();

    let skipped = Walker::new(WalkConfig::default().with_workers(2))
        .walk(dir.path())
        .unwrap();
    assert_eq!(skipped.total_files(), 0);

    let included = Walker::new(WalkConfig::default().with_workers(2).no_default_skip())
        .walk(dir.path())
        .unwrap();
    assert_eq!(included.total_files(), 1);
    assert_eq!(included.flatten()[0].name(), "index.js");
}

#[test]
fn test_root_is_never_its_own_child() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("only.txt"), "x").unwrap();

    let results = Walker::new(WalkConfig::default().with_workers(1))
        .walk(dir.path())
        .unwrap();

    assert_eq!(results.total_files(), 1);
}

#[test]
fn test_in_flight_never_exceeds_workers() {
    let dir = tempdir().unwrap();
    for d in 0..6 {
        let sub = dir.path().join(format!("dir{d}"));
        fs::create_dir(&sub).unwrap();
        for f in 0..20 {
            fs::write(sub.join(format!("{f}.bin")), [f as u8 + 1]).unwrap();
        }
    }

    let workers = 3;
    let active = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let fingerprinter = {
        let active = Arc::clone(&active);
        let peak = Arc::clone(&peak);
        move |path: &Path| -> Result<Fingerprint, HashError> {
            let now = active.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(1));
            active.fetch_sub(1, Ordering::SeqCst);
            NameSize.fingerprint(path)
        }
    };

    let config = WalkConfig::default()
        .with_workers(workers)
        .with_fingerprinter(Arc::new(fingerprinter));
    let results = Walker::new(config).walk(dir.path()).unwrap();

    assert_eq!(results.total_files(), 120);
    let observed = peak.load(Ordering::SeqCst);
    assert!(observed >= 1);
    assert!(observed <= workers, "peak {observed} exceeded {workers}");
}

#[test]
fn test_gate_peak_bounded_by_workers() {
    let dir = tempdir().unwrap();
    for d in 0..8 {
        let sub = dir.path().join(format!("dir{d}"));
        for n in 0..4 {
            let nested = sub.join(format!("nested{n}"));
            fs::create_dir_all(&nested).unwrap();
            for f in 0..10 {
                fs::write(nested.join(format!("{f}.bin")), [f as u8 + 1]).unwrap();
            }
        }
    }

    for workers in [1, 2, 3, 5] {
        let (results, stats) = Walker::new(WalkConfig::default().with_workers(workers))
            .walk_with_stats(dir.path())
            .unwrap();

        assert_eq!(results.total_files(), 320);
        assert_eq!(stats.files, 320);
        assert_eq!(stats.directories, 1 + 8 + 32);
        assert!(stats.peak_in_flight >= 1);
        assert!(
            stats.peak_in_flight <= workers,
            "peak {} exceeded {workers}",
            stats.peak_in_flight
        );
    }
}

#[test]
fn test_closure_fingerprinter() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("x.log"), "1").unwrap();
    fs::write(dir.path().join("y.log"), "22").unwrap();
    fs::write(dir.path().join("z.txt"), "333").unwrap();

    let by_extension = |path: &Path| -> Result<Fingerprint, HashError> {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Fingerprint::new(ext))
    };
    let config = WalkConfig::default()
        .with_workers(2)
        .with_fingerprinter(Arc::new(by_extension));
    let results = Walker::new(config).walk(dir.path()).unwrap();

    assert_eq!(results.get(&Fingerprint::new("log")).unwrap().len(), 2);
    assert_eq!(results.get(&Fingerprint::new("txt")).unwrap().len(), 1);
}

#[test]
fn test_missing_root_reported_before_walk() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("gone");

    let err = Walker::default().walk(&missing).unwrap_err();
    assert!(matches!(err, WalkError::Scan(ScanError::NotFound(ref p)) if *p == missing));
}

#[cfg(unix)]
#[test]
fn test_unreadable_file_fails_content_walk() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempdir().unwrap();
    write_abc(dir.path());
    let locked = dir.path().join("locked.bin");
    fs::write(&locked, "secret").unwrap();
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

    // Privileged users can read it anyway.
    if fs::File::open(&locked).is_ok() {
        return;
    }

    let err = content_walker(2).walk(dir.path()).unwrap_err();
    assert!(matches!(
        err,
        WalkError::Hash(HashError::PermissionDenied(ref p)) if *p == locked
    ));

    // Name+size never opens the file.
    let results = Walker::new(WalkConfig::default().with_workers(2))
        .walk(dir.path())
        .unwrap();
    assert_eq!(results.total_files(), 4);

    fs::set_permissions(&locked, fs::Permissions::from_mode(0o644)).unwrap();
}

#[cfg(unix)]
#[test]
fn test_unlistable_directory_fails_walk() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempdir().unwrap();
    let sub = dir.path().join("closed");
    fs::create_dir(&sub).unwrap();
    fs::write(sub.join("inside.txt"), "x").unwrap();
    fs::set_permissions(&sub, fs::Permissions::from_mode(0o000)).unwrap();

    if fs::read_dir(&sub).is_ok() {
        fs::set_permissions(&sub, fs::Permissions::from_mode(0o755)).unwrap();
        return;
    }

    let err = Walker::new(WalkConfig::default().with_workers(2))
        .walk(dir.path())
        .unwrap_err();
    assert!(matches!(err, WalkError::Scan(ScanError::PermissionDenied(_))));

    fs::set_permissions(&sub, fs::Permissions::from_mode(0o755)).unwrap();
}
