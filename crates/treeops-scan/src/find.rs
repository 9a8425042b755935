//! Enumeration delegated to the OS `find` utility.
//!
//! Faster than the in-process walker on very large trees. Depth, type and
//! extension selection match [`TreeWalker`](crate::TreeWalker); name
//! patterns are applied afterwards by the filter, in-process. Requires GNU
//! `find` (for `-printf`) and is refused outside POSIX systems.

use std::path::PathBuf;
use std::time::{Duration, UNIX_EPOCH};

use treeops_core::{Entry, Result, TraversalOptions, TreeOpsError};

use crate::process::{ScopedCommand, path_from_bytes};
use crate::walker::{has_child_subdirectories, verify_root};

/// Record layout printed by `find`: type, size, mtime, depth, path.
const PRINTF_FORMAT: &str = "%y\\t%s\\t%T@\\t%d\\t%p\\0";

/// Walker backed by a `find` child process.
#[derive(Debug, Clone)]
pub struct FindWalker {
    options: TraversalOptions,
}

impl FindWalker {
    /// Create a walker for the given options.
    pub fn new(options: &TraversalOptions) -> Self {
        Self {
            options: options.clone(),
        }
    }

    /// The `find` invocation for these options.
    pub fn command(&self) -> ScopedCommand {
        let options = &self.options;
        let mut command = ScopedCommand::new("find")
            .arg(&options.root)
            .args(["-mindepth", "1", "-maxdepth"])
            .arg(options.effective_max_depth().to_string());

        let files = options.include_files;
        let dirs = options.include_directories;
        let extensions = extension_expression(&options.extensions);

        command = match (files, dirs, extensions.is_empty()) {
            (true, false, _) => command.args(["!", "-type", "d"]).args(extensions),
            (false, true, _) => command.args(["-type", "d"]),
            (true, true, false) => command
                .args(["(", "-type", "d", "-o", "("])
                .args(["!", "-type", "d"])
                .args(extensions)
                .args([")", ")"]),
            _ => command,
        };

        command.args(["-printf", PRINTF_FORMAT])
    }

    /// Run `find` and parse its output into entries ordered like the
    /// in-process walker (depth-first, names ascending).
    pub async fn walk(&self) -> Result<Vec<Entry>> {
        if !cfg!(unix) {
            return Err(TreeOpsError::UnsupportedPlatform {
                operation: "find-based listing",
            });
        }

        let root = self.options.root.clone();
        verify_root(&root)?;

        if !self.options.include_files && !self.options.include_directories {
            return Ok(Vec::new());
        }

        let output = self.command().output().await?;
        if !output.success() {
            if output.only_permission_errors() {
                tracing::warn!(
                    root = %root.display(),
                    stderr = %output.stderr.trim(),
                    "find skipped unreadable subtrees"
                );
            } else {
                return Err(output.into_error());
            }
        }

        let check_subdirectories = self.options.needs_subdirectory_check();
        let mut entries = Vec::new();

        for record in output.nul_records() {
            let Some(parsed) = parse_record(record) else {
                tracing::warn!(
                    record = %String::from_utf8_lossy(record),
                    "unparseable find record"
                );
                continue;
            };

            let modified = UNIX_EPOCH + Duration::from_secs_f64(parsed.mtime_secs.max(0.0));

            if parsed.is_dir {
                let has_subdirectories =
                    check_subdirectories.then(|| has_child_subdirectories(&parsed.path));
                if self.options.leaf_only && has_subdirectories == Some(true) {
                    continue;
                }
                entries.push(Entry::directory(
                    &parsed.path,
                    modified,
                    parsed.depth,
                    has_subdirectories,
                ));
            } else {
                entries.push(Entry::file(&parsed.path, parsed.size, modified, parsed.depth));
            }
        }

        entries.sort_by(|a, b| a.fs_path().cmp(&b.fs_path()));
        Ok(entries)
    }
}

/// `( -iname *.a -o -iname *.b )`, or nothing for an empty list.
fn extension_expression(extensions: &[String]) -> Vec<String> {
    if extensions.is_empty() {
        return Vec::new();
    }

    let mut expr = vec!["(".to_string()];
    for (i, ext) in extensions.iter().enumerate() {
        if i > 0 {
            expr.push("-o".to_string());
        }
        expr.push("-iname".to_string());
        expr.push(format!("*.{}", ext.trim_start_matches('.')));
    }
    expr.push(")".to_string());
    expr
}

#[derive(Debug, PartialEq)]
struct FindRecord {
    is_dir: bool,
    size: u64,
    mtime_secs: f64,
    depth: usize,
    path: PathBuf,
}

/// Parse one `PRINTF_FORMAT` record. The path is kept byte-exact.
fn parse_record(record: &[u8]) -> Option<FindRecord> {
    let mut fields = record.splitn(5, |b| *b == b'\t');
    let mut text = || std::str::from_utf8(fields.next()?).ok();
    let kind = text()?;
    let size = text()?.parse().ok()?;
    let mtime_secs = text()?.parse().ok()?;
    let depth = text()?.parse().ok()?;
    let path = path_from_bytes(fields.next()?);

    Some(FindRecord {
        is_dir: kind == "d",
        size,
        mtime_secs,
        depth,
        path,
    })
}
