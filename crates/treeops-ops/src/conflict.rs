//! Collision-free destination names.

use std::collections::HashSet;
use std::ffi::{OsStr, OsString};
use std::fs;
use std::path::{Path, PathBuf};

use crate::sanitize::split_extension;

/// Give up on a numbered suffix after this many attempts.
const MAX_SUFFIX_ATTEMPTS: usize = 100_000;

/// Insert `_{suffix}` before the extension of `name`.
///
/// For "file.txt" and "1", produces "file_1.txt". A stem that already ends
/// in `_` is not given a second one.
pub fn suffixed_name(name: &str, suffix: &str) -> String {
    let (stem, extension) = split_extension(name);
    let separator = if stem.ends_with('_') { "" } else { "_" };
    match extension {
        Some(ext) => format!("{stem}{separator}{suffix}.{ext}"),
        None => format!("{stem}{separator}{suffix}"),
    }
}

/// [`suffixed_name`] for names that may not be valid UTF-8. The name's
/// own bytes are kept on Unix.
fn suffixed_os_name(name: &OsStr, suffix: &str) -> OsString {
    if let Some(name) = name.to_str() {
        return suffixed_name(name, suffix).into();
    }

    #[cfg(unix)]
    {
        use std::os::unix::ffi::{OsStrExt, OsStringExt};

        let bytes = name.as_bytes();
        let (stem, extension) = match bytes.iter().rposition(|b| *b == b'.') {
            Some(idx) if idx > 0 => (&bytes[..idx], Some(&bytes[idx + 1..])),
            _ => (bytes, None),
        };
        let mut out = stem.to_vec();
        if !stem.ends_with(b"_") {
            out.push(b'_');
        }
        out.extend_from_slice(suffix.as_bytes());
        if let Some(ext) = extension {
            out.push(b'.');
            out.extend_from_slice(ext);
        }
        OsString::from_vec(out)
    }

    #[cfg(not(unix))]
    {
        suffixed_name(&name.to_string_lossy(), suffix).into()
    }
}

/// Check if something already occupies `path`, without following symlinks.
pub fn is_occupied(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

/// Destinations handed out during one run.
///
/// Dry runs leave the disk untouched, so later entries must also see the
/// names given to earlier ones; live runs use the same bookkeeping so both
/// modes resolve collisions identically.
#[derive(Debug, Default)]
pub struct Claims {
    taken: HashSet<PathBuf>,
}

impl Claims {
    /// Create an empty claim set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `path` is claimed in this run or occupied on disk.
    pub fn is_taken(&self, path: &Path) -> bool {
        self.taken.contains(path) || is_occupied(path)
    }

    /// Record `path` as claimed.
    pub fn claim(&mut self, path: impl Into<PathBuf>) {
        self.taken.insert(path.into());
    }

    /// Claim `dir/name`, or the first free `dir/name_N` (N from 1).
    pub fn claim_numbered(&mut self, dir: &Path, name: impl AsRef<OsStr>) -> PathBuf {
        let name = name.as_ref();
        let candidate = dir.join(name);
        if !self.is_taken(&candidate) {
            self.claim(candidate.clone());
            return candidate;
        }

        for n in 1..MAX_SUFFIX_ATTEMPTS {
            let candidate = dir.join(suffixed_os_name(name, &n.to_string()));
            if !self.is_taken(&candidate) {
                self.claim(candidate.clone());
                return candidate;
            }
        }

        // Practically unreachable; fall back to a timestamp.
        self.claim_stamped(dir, name, &timestamp())
    }

    /// Claim `dir/name`, or `dir/name_{stamp}`, then `dir/name_{stamp}_N`.
    pub fn claim_stamped(
        &mut self,
        dir: &Path,
        name: impl AsRef<OsStr>,
        stamp: &str,
    ) -> PathBuf {
        let name = name.as_ref();
        let candidate = dir.join(name);
        if !self.is_taken(&candidate) {
            self.claim(candidate.clone());
            return candidate;
        }

        let mut candidate = dir.join(suffixed_os_name(name, stamp));
        let mut n = 1;
        while self.is_taken(&candidate) {
            candidate = dir.join(suffixed_os_name(name, &format!("{stamp}_{n}")));
            n += 1;
        }
        self.claim(candidate.clone());
        candidate
    }
}

/// Local time as `YYYYMMDDHHMMSS`, used for collision suffixes.
pub fn timestamp() -> String {
    chrono::Local::now().format("%Y%m%d%H%M%S").to_string()
}
