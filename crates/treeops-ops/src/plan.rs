//! Candidate selection shared by dry-run and live mutations.

use std::path::{Path, PathBuf};

use regex::Regex;

use treeops_core::{Entry, Result, TreeOpsError};
use treeops_scan::TreeWalker;

/// Compile a mutation pattern. Empty means "match everything"; an invalid
/// pattern is an error, since guessing what to delete is not acceptable.
pub fn compile_pattern(pattern: Option<&str>) -> Result<Option<Regex>> {
    match pattern.filter(|p| !p.is_empty()) {
        None => Ok(None),
        Some(p) => Regex::new(p)
            .map(Some)
            .map_err(|err| TreeOpsError::InvalidPattern {
                pattern: p.to_string(),
                message: err.to_string(),
            }),
    }
}

/// Which entries a bulk mutation acts on.
#[derive(Debug, Clone)]
pub struct Selector {
    pattern: Option<Regex>,
    extensions: Vec<String>,
    include_files: bool,
    include_directories: bool,
}

impl Selector {
    /// Build a selector. Fails only on an invalid pattern.
    pub fn new(
        pattern: Option<&str>,
        extensions: &[String],
        include_files: bool,
        include_directories: bool,
    ) -> Result<Self> {
        Ok(Self {
            pattern: compile_pattern(pattern)?,
            extensions: extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
                .filter(|e| !e.is_empty())
                .collect(),
            include_files,
            include_directories,
        })
    }

    /// Whether `entry` is selected.
    ///
    /// With neither pattern nor extensions every included entry matches.
    /// Otherwise a name matching the pattern, or a file carrying one of the
    /// extensions, is enough.
    pub fn selects(&self, entry: &Entry) -> bool {
        let kind_ok = if entry.is_dir() {
            self.include_directories
        } else {
            self.include_files
        };
        if !kind_ok {
            return false;
        }

        if self.pattern.is_none() && self.extensions.is_empty() {
            return true;
        }

        let name = entry.name.as_str();
        let by_pattern = self.pattern.as_ref().is_some_and(|re| re.is_match(name));
        let by_extension = entry.is_file() && self.has_extension(name);
        by_pattern || by_extension
    }

    fn has_extension(&self, name: &str) -> bool {
        let lower = name.to_ascii_lowercase();
        self.extensions
            .iter()
            .any(|ext| lower.len() > ext.len() + 1 && lower.ends_with(&format!(".{ext}")))
    }
}

/// Walk `root` and pick the entries to act on.
///
/// A selected directory is taken whole: nothing beneath it is reported on
/// its own. Without `recursive` only the root's children are considered.
pub fn select_candidates(root: &Path, recursive: bool, selector: &Selector) -> Result<Vec<Entry>> {
    let mut walker = TreeWalker::unbounded(root);
    if !recursive {
        walker = walker.shallow();
    }

    let mut taken_dir: Option<PathBuf> = None;
    let mut candidates = Vec::new();

    // The walk is pre-order, so a taken directory's descendants follow it
    // contiguously.
    for entry in walker.walk()? {
        let path = entry.fs_path();
        if let Some(dir) = &taken_dir {
            if path.starts_with(dir) {
                continue;
            }
            taken_dir = None;
        }

        if selector.selects(&entry) {
            if entry.is_dir() {
                taken_dir = Some(path);
            }
            candidates.push(entry);
        }
    }

    Ok(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn names(entries: &[Entry]) -> Vec<&str> {
        entries.iter().map(|e| e.name.as_str()).collect()
    }

    #[test]
    fn test_invalid_pattern_is_an_error() {
        let err = compile_pattern(Some("([bad")).unwrap_err();
        assert!(matches!(err, TreeOpsError::InvalidPattern { .. }));
        assert!(compile_pattern(Some("")).unwrap().is_none());
    }

    #[test]
    fn test_selected_directories_hide_descendants() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("cache/cache")).unwrap();
        fs::write(temp.path().join("cache/cache/x"), "").unwrap();
        fs::write(temp.path().join("cache.txt"), "").unwrap();
        fs::write(temp.path().join("keep"), "").unwrap();

        let selector = Selector::new(Some("^cache"), &[], true, true).unwrap();
        let selected = select_candidates(temp.path(), true, &selector).unwrap();
        assert_eq!(names(&selected), vec!["cache", "cache.txt"]);
    }

    #[test]
    fn test_files_only_recurses_into_directories() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("logs")).unwrap();
        fs::write(temp.path().join("logs/a.LOG"), "").unwrap();
        fs::write(temp.path().join("b.log"), "").unwrap();
        fs::write(temp.path().join("c.txt"), "").unwrap();

        let selector = Selector::new(None, &["log".to_string()], true, false).unwrap();

        let recursive = select_candidates(temp.path(), true, &selector).unwrap();
        assert_eq!(names(&recursive), vec!["b.log", "a.LOG"]);

        let shallow = select_candidates(temp.path(), false, &selector).unwrap();
        assert_eq!(names(&shallow), vec!["b.log"]);
    }
}
