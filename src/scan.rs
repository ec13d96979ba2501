//! Source discovery on disk.

use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Build output directory name, never descended into.
pub const BUILD_DIR_NAME: &str = "build";

/// Recursively collect files under `root` whose name ends with `suffix`.
///
/// Directories named in `excluded` (and any directory named `build`) are
/// pruned. A missing root yields an empty list. Results are sorted, since
/// directory iteration order differs between platforms.
pub fn scan(root: &Path, suffix: &str, excluded: &[&str]) -> Vec<PathBuf> {
    if !root.is_dir() {
        return Vec::new();
    }

    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_entry(|entry| {
            entry.depth() == 0
                || !entry.file_type().is_dir()
                || !is_excluded(entry.file_name(), excluded)
        })
        .filter_map(|e| e.ok())
        .filter(|entry| {
            entry.file_type().is_file() && entry.file_name().to_string_lossy().ends_with(suffix)
        })
        .map(|entry| entry.into_path())
        .collect();

    files.sort();
    files
}

fn is_excluded(name: &OsStr, excluded: &[&str]) -> bool {
    name == BUILD_DIR_NAME || excluded.iter().any(|dir| name == *dir)
}

/// Immediate subdirectories of `dir`, sorted. Missing directory => empty.
pub fn subdirs(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };

    let mut dirs: Vec<PathBuf> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect();
    dirs.sort();
    dirs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "").unwrap();
    }

    #[test]
    fn test_scan_is_recursive_and_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(&root.join("src/z.c"));
        touch(&root.join("src/a.c"));
        touch(&root.join("src/net/http.c"));
        touch(&root.join("src/notes.txt"));

        let found = scan(&root.join("src"), ".c", &[]);
        assert_eq!(
            found,
            vec![
                root.join("src/a.c"),
                root.join("src/net/http.c"),
                root.join("src/z.c"),
            ]
        );
    }

    #[test]
    fn test_scan_skips_excluded_and_build_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(&root.join("main.c"));
        touch(&root.join("core/shared.c"));
        touch(&root.join("build/app/debug/obj/gen.c"));

        let found = scan(root, ".c", &["core"]);
        assert_eq!(found, vec![root.join("main.c")]);
    }

    #[test]
    fn test_scan_missing_root_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(scan(&dir.path().join("nope"), ".c", &[]).is_empty());
    }

    #[test]
    fn test_scan_matches_full_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(&root.join("math_test.c"));
        touch(&root.join("helpers.c"));

        assert_eq!(scan(root, "_test.c", &[]), vec![root.join("math_test.c")]);
    }

    #[test]
    fn test_subdirs_lists_only_directories() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("gen")).unwrap();
        fs::create_dir_all(root.join("bench")).unwrap();
        touch(&root.join("README"));

        assert_eq!(subdirs(root), vec![root.join("bench"), root.join("gen")]);
        assert!(subdirs(&root.join("missing")).is_empty());
    }
}
