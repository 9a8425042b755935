use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use treeops_ops::{
    CleanOptions, DeleteOptions, ExecutionMode, FixNamesOptions, FlattenOptions, MoveOptions,
    ProtectionPolicy, TreeOps, TreeOpsError, clean_empty_directories, delete_files,
    fix_names, flatten_directory, move_files, sanitize,
};

fn policy() -> ProtectionPolicy {
    ProtectionPolicy::default()
        .with_depth_range(1, 64)
        .allow_protected(true)
}

/// root/
///   build/ (out.o, cache/ (blob))
///   src/ (main.rs, lib.rs, build.log)
///   notes.txt
///   build.log
fn project() -> TempDir {
    let temp = TempDir::new().unwrap();
    let root = temp.path();

    fs::create_dir_all(root.join("build/cache")).unwrap();
    fs::create_dir_all(root.join("src")).unwrap();
    fs::write(root.join("build/out.o"), "o").unwrap();
    fs::write(root.join("build/cache/blob"), "b").unwrap();
    fs::write(root.join("src/main.rs"), "fn main() {}").unwrap();
    fs::write(root.join("src/lib.rs"), "").unwrap();
    fs::write(root.join("src/build.log"), "log").unwrap();
    fs::write(root.join("notes.txt"), "n").unwrap();
    fs::write(root.join("build.log"), "log").unwrap();

    temp
}

fn snapshot(root: &Path) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        for entry in fs::read_dir(&dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                stack.push(path.clone());
            }
            paths.push(path);
        }
    }
    paths.sort();
    paths
}

#[test]
fn test_dry_run_delete_predicts_live() {
    let temp = project();
    let options = DeleteOptions {
        pattern: Some("^build".into()),
        recursive: true,
        include_subdirectories: true,
        ..DeleteOptions::new(temp.path())
    };

    let before = snapshot(temp.path());
    let preview = delete_files(&options, &policy(), ExecutionMode::DryRun).unwrap();
    assert_eq!(snapshot(temp.path()), before);

    let live = delete_files(&options, &policy(), ExecutionMode::Live).unwrap();
    assert_eq!(preview.affected, live.affected);

    let root = temp.path();
    assert_eq!(
        live.affected,
        vec![
            root.join("build"),
            root.join("build.log"),
            root.join("src/build.log"),
        ]
    );
}

#[test]
fn test_matched_directory_goes_with_descendants() {
    let temp = project();
    let options = DeleteOptions {
        pattern: Some("^build$".into()),
        include_files: false,
        include_subdirectories: true,
        ..DeleteOptions::new(temp.path())
    };

    let result = delete_files(&options, &policy(), ExecutionMode::Live).unwrap();

    assert_eq!(result.affected, vec![temp.path().join("build")]);
    assert!(!temp.path().join("build").exists());
    assert!(temp.path().join("build.log").exists());
    assert!(temp.path().join("src/main.rs").exists());
}

#[test]
fn test_delete_root() {
    let temp = project();
    let target = temp.path().join("src");
    let options = DeleteOptions {
        delete_root: true,
        ..DeleteOptions::new(&target)
    };

    let result = delete_files(&options, &policy(), ExecutionMode::Live).unwrap();
    assert_eq!(result.affected, vec![target.clone()]);
    assert!(!target.exists());
}

#[test]
fn test_invalid_mutation_pattern_is_rejected() {
    let temp = project();
    let before = snapshot(temp.path());
    let options = DeleteOptions {
        pattern: Some("(unclosed".into()),
        ..DeleteOptions::new(temp.path())
    };

    let err = delete_files(&options, &policy(), ExecutionMode::Live).unwrap_err();
    assert!(matches!(err, TreeOpsError::InvalidPattern { .. }));
    assert_eq!(snapshot(temp.path()), before);
}

#[test]
fn test_guard_rejection_has_no_side_effects() {
    let temp = project();
    let before = snapshot(temp.path());

    let too_shallow = policy().with_depth_range(60, 64);
    let options = DeleteOptions {
        recursive: true,
        include_subdirectories: true,
        ..DeleteOptions::new(temp.path())
    };
    let err = delete_files(&options, &too_shallow, ExecutionMode::Live).unwrap_err();
    assert!(matches!(err, TreeOpsError::DepthRange { .. }));

    let fenced = policy()
        .allow_protected(false)
        .protect(temp.path().to_string_lossy());
    let err = flatten_directory(&FlattenOptions::new(temp.path()), &fenced, ExecutionMode::Live)
        .unwrap_err();
    assert!(matches!(err, TreeOpsError::ProtectedPath { .. }));

    let err = move_files(
        &MoveOptions::new(temp.path().join("src"), temp.path().join("moved")),
        &fenced,
        ExecutionMode::Live,
    )
    .unwrap_err();
    assert!(err.is_policy_violation());

    assert_eq!(snapshot(temp.path()), before);
}

#[test]
fn test_dry_run_move_predicts_live() {
    let temp = project();
    let target = temp.path().join("archive");
    let options = MoveOptions {
        pattern: Some(r"\.(rs|log)$".into()),
        recursive: true,
        ..MoveOptions::new(temp.path().join("src"), &target)
    };

    let preview = move_files(&options, &policy(), ExecutionMode::DryRun).unwrap();
    assert!(!target.exists());

    let live = move_files(&options, &policy(), ExecutionMode::Live).unwrap();
    assert_eq!(preview.records, live.records);
    assert_eq!(live.records.len(), 3);
    assert!(target.join("main.rs").exists());
    assert!(target.join("build.log").exists());
    assert!(temp.path().join("src").is_dir());
}

#[test]
fn test_move_preserves_layout_and_leaves_siblings() {
    let temp = project();
    let target = temp.path().join("elsewhere/deep");
    let options = MoveOptions {
        pattern: Some("^(out|blob)".into()),
        recursive: true,
        ..MoveOptions::new(temp.path().join("build"), &target)
    };

    move_files(&options, &policy(), ExecutionMode::Live).unwrap();

    assert!(target.join("out.o").exists());
    assert!(target.join("cache/blob").exists());
    assert!(temp.path().join("build/cache").is_dir());
}

#[test]
fn test_rename_only_move() {
    let temp = project();
    let target = temp.path().join("vendor");
    let options = MoveOptions {
        rename_only: true,
        ..MoveOptions::new(temp.path().join("src"), &target)
    };

    let result = move_files(&options, &policy(), ExecutionMode::Live).unwrap();
    assert_eq!(result.records.len(), 1);
    assert!(target.join("src/main.rs").exists());
    assert!(!temp.path().join("src").exists());
}

#[test]
fn test_flatten_resolves_collisions() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    fs::create_dir_all(root.join("one/nested")).unwrap();
    fs::create_dir_all(root.join("two")).unwrap();
    fs::write(root.join("one/nested/a.txt"), "first").unwrap();
    fs::write(root.join("two/a.txt"), "second").unwrap();

    let result = flatten_directory(&FlattenOptions::new(root), &policy(), ExecutionMode::Live)
        .unwrap();

    assert!(result.is_success());
    assert_eq!(fs::read_to_string(root.join("a.txt")).unwrap(), "first");
    assert_eq!(fs::read_to_string(root.join("a_1.txt")).unwrap(), "second");

    let leftovers: Vec<_> = fs::read_dir(root)
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| p.is_dir())
        .collect();
    assert!(leftovers.is_empty(), "subdirectories left: {leftovers:?}");
}

#[test]
fn test_flatten_sanitizes_directories_first() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    fs::create_dir_all(root.join("bad:dir")).unwrap();
    fs::write(root.join("bad:dir/f.txt"), "").unwrap();

    let result = flatten_directory(&FlattenOptions::new(root), &policy(), ExecutionMode::Live)
        .unwrap();

    let first = &result.records[0];
    assert_eq!(first.new_path, root.join("bad_dir"));
    assert_eq!(result.records[1].original_path, root.join("bad_dir/f.txt"));
    assert!(root.join("f.txt").exists());
    assert!(!root.join("bad_dir").exists());
}

#[test]
fn test_dry_run_flatten_predicts_live() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    fs::create_dir_all(root.join("b:x/deep")).unwrap();
    fs::create_dir_all(root.join("b_a")).unwrap();
    fs::write(root.join("b:x/n.txt"), "x").unwrap();
    fs::write(root.join("b:x/deep/m.txt"), "").unwrap();
    fs::write(root.join("b_a/n.txt"), "a").unwrap();

    let options = FlattenOptions::new(root);
    let preview = flatten_directory(&options, &policy(), ExecutionMode::DryRun).unwrap();
    let live = flatten_directory(&options, &policy(), ExecutionMode::Live).unwrap();

    assert_eq!(preview.records, live.records);
    assert_eq!(preview.affected, live.affected);
    assert_eq!(
        live.affected,
        vec![root.join("b_a"), root.join("b_x/deep"), root.join("b_x")]
    );
    assert_eq!(fs::read_to_string(root.join("n.txt")).unwrap(), "a");
    assert_eq!(fs::read_to_string(root.join("n_1.txt")).unwrap(), "x");
}

#[test]
fn test_flatten_keeps_directory_of_file_that_cannot_move() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    // A numbered suffix pushes this name past the 255-byte limit.
    let long = "y".repeat(255);
    fs::create_dir_all(root.join("sub")).unwrap();
    fs::write(root.join(&long), "top").unwrap();
    fs::write(root.join("sub").join(&long), "nested").unwrap();
    fs::write(root.join("sub/ok.txt"), "").unwrap();

    let result = flatten_directory(&FlattenOptions::new(root), &policy(), ExecutionMode::Live)
        .unwrap();

    assert_eq!(result.succeeded(), 1);
    assert_eq!(result.failed(), 1);
    let failure = result.failures().next().unwrap();
    assert_eq!(failure.original_path, root.join("sub").join(&long));
    assert!(!failure.error.as_deref().unwrap().is_empty());

    assert!(root.join("ok.txt").exists());
    assert_eq!(
        fs::read_to_string(root.join("sub").join(&long)).unwrap(),
        "nested"
    );
    assert!(result.affected.is_empty());
}

#[test]
fn test_fix_names_records_failure_and_continues() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    // Sanitizes onto an existing 255-byte name; the timestamp suffix then
    // makes the destination too long.
    let taken = format!("{}_", "x".repeat(254));
    let clashing = format!("{}:", "x".repeat(254));
    fs::write(root.join(&taken), "").unwrap();
    fs::write(root.join(&clashing), "").unwrap();
    fs::write(root.join("ok?.txt"), "").unwrap();

    let result = fix_names(&FixNamesOptions::new(root), &policy(), ExecutionMode::Live).unwrap();

    assert_eq!(result.records.len(), 2);
    assert_eq!(result.succeeded(), 1);
    let failure = result.failures().next().unwrap();
    assert_eq!(failure.original_path, root.join(&clashing));
    assert!(failure.error.is_some());

    assert!(root.join("ok_.txt").exists());
    assert!(root.join(&clashing).exists());
    assert!(root.join(&taken).exists());
}

/// Names that are not valid UTF-8. Linux only: other Unix filesystems
/// refuse them.
#[cfg(target_os = "linux")]
mod raw_names {
    use super::*;
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    fn raw(bytes: &[u8]) -> &OsStr {
        OsStr::from_bytes(bytes)
    }

    #[test]
    fn test_delete_reaches_raw_names() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::write(root.join("a.txt"), "").unwrap();
        fs::write(root.join(raw(b"b\xff.txt")), "").unwrap();
        fs::write(root.join("c.txt"), "").unwrap();

        let options = DeleteOptions::new(root);
        let preview = delete_files(&options, &policy(), ExecutionMode::DryRun).unwrap();
        assert!(preview.affected.contains(&root.join(raw(b"b\xff.txt"))));

        let live = delete_files(&options, &policy(), ExecutionMode::Live).unwrap();
        assert_eq!(live.affected, preview.affected);
        assert_eq!(live.failed(), 0);
        assert!(snapshot(root).is_empty());
    }

    #[test]
    fn test_fix_names_repairs_raw_name() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::write(root.join(raw(b"caf\xe9.txt")), "menu").unwrap();

        let result = fix_names(&FixNamesOptions::new(root), &policy(), ExecutionMode::Live)
            .unwrap();

        assert_eq!(result.succeeded(), 1);
        assert_eq!(result.records[0].original_path, root.join(raw(b"caf\xe9.txt")));
        assert_eq!(fs::read_to_string(root.join("caf_.txt")).unwrap(), "menu");
    }

    #[test]
    fn test_flatten_moves_raw_name_unchanged() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("sub")).unwrap();
        fs::write(root.join("sub").join(raw(b"caf\xe9.txt")), "menu").unwrap();

        let result = flatten_directory(&FlattenOptions::new(root), &policy(), ExecutionMode::Live)
            .unwrap();

        assert!(result.is_success());
        assert_eq!(
            fs::read_to_string(root.join(raw(b"caf\xe9.txt"))).unwrap(),
            "menu"
        );
        assert!(!root.join("sub").exists());
    }
}

#[test]
fn test_fix_names_files_only() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join("test dir!");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("файл.txt"), "content").unwrap();

    let result = fix_names(&FixNamesOptions::new(&dir), &policy(), ExecutionMode::Live).unwrap();

    assert_eq!(result.succeeded(), 1);
    assert_eq!(result.failed(), 0);
    assert_eq!(result.records[0].new_path, dir.join("_.txt"));
    assert_eq!(fs::read_to_string(dir.join("_.txt")).unwrap(), "content");
    assert!(dir.exists());

    // From the parent, recursively, the directory's own name is kept.
    fs::write(dir.join("ещё.md"), "").unwrap();
    let options = FixNamesOptions {
        recursive: true,
        ..FixNamesOptions::new(temp.path())
    };
    let result = fix_names(&options, &policy(), ExecutionMode::Live).unwrap();
    assert_eq!(result.succeeded(), 1);
    assert!(temp.path().join("test dir!").is_dir());
}

#[test]
fn test_clean_empty_cascade() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    fs::create_dir_all(root.join("a/b/c/d")).unwrap();
    fs::create_dir_all(root.join("keep")).unwrap();
    fs::write(root.join("keep/file"), "").unwrap();

    let result = clean_empty_directories(&CleanOptions::new(root), &policy(), ExecutionMode::Live)
        .unwrap();

    assert_eq!(result.affected.len(), 4);
    assert!(!root.join("a").exists());
    assert!(root.join("keep/file").exists());
}

#[test]
fn test_sanitize_properties() {
    assert_eq!(sanitize("CON"), "_CON");
    assert_eq!(sanitize("a:b*c"), "a_b_c");
    let long = "x".repeat(300);
    for name in ["CON", "a:b*c", "файл.txt", "", long.as_str()] {
        let once = sanitize(name);
        assert_eq!(sanitize(&once), once);
    }
}

#[tokio::test]
async fn test_facade_runs_each_operation() {
    let temp = project();
    let ops = TreeOps::new(policy());

    let listed = ops
        .list_directory(treeops_scan::TraversalOptions::new(temp.path()))
        .await
        .unwrap();
    assert_eq!(listed.len(), 4);

    let preview = ops
        .clone()
        .dry_run()
        .flatten_directory(FlattenOptions::new(temp.path()))
        .await
        .unwrap();
    assert!(preview.mode.is_dry_run());
    assert_eq!(snapshot(temp.path()).len(), 10);

    let cleaned = ops
        .clean_empty_directories(CleanOptions::new(temp.path()))
        .await
        .unwrap();
    assert!(cleaned.affected.is_empty());
}

#[cfg(target_os = "linux")]
#[tokio::test]
async fn test_accelerated_delete_matches_in_process_selection() {
    let in_process = project();
    let accelerated = project();

    let options_for = |root: &Path| DeleteOptions {
        pattern: Some(r"^build".into()),
        extensions: vec!["rs".into()],
        recursive: true,
        include_subdirectories: true,
        ..DeleteOptions::new(root)
    };

    let pure = delete_files(
        &options_for(in_process.path()),
        &policy(),
        ExecutionMode::DryRun,
    )
    .unwrap();
    let via_find = TreeOps::new(policy())
        .delete_files_accelerated(options_for(accelerated.path()))
        .await
        .unwrap();

    let relative = |paths: &[PathBuf], root: &Path| -> Vec<PathBuf> {
        let mut rel: Vec<_> = paths
            .iter()
            .map(|p| p.strip_prefix(root).unwrap().to_path_buf())
            .collect();
        rel.sort();
        rel
    };
    assert_eq!(
        relative(&pure.affected, in_process.path()),
        relative(&via_find.affected, accelerated.path())
    );
    assert!(!accelerated.path().join("build").exists());
    assert!(!accelerated.path().join("src/main.rs").exists());
    assert!(accelerated.path().join("notes.txt").exists());
}
