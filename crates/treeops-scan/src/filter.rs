//! Name filtering, ordering and truncation of walk results.

use std::cmp::Ordering;

use regex::Regex;
use serde::{Deserialize, Serialize};

use treeops_core::{Entry, FilterOptions, SortDirection, SortKey};

/// Final shape of a listing: a list, or a single entry for lookups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Selection {
    /// All matching entries.
    Many(Vec<Entry>),
    /// First match, or [`Entry::placeholder`] when nothing matched.
    Single(Entry),
}

impl Selection {
    /// Flatten into a list. A placeholder becomes an empty list.
    pub fn into_vec(self) -> Vec<Entry> {
        match self {
            Self::Many(entries) => entries,
            Self::Single(entry) if entry.is_placeholder() => Vec::new(),
            Self::Single(entry) => vec![entry],
        }
    }

    /// Number of real entries.
    pub fn len(&self) -> usize {
        match self {
            Self::Many(entries) => entries.len(),
            Self::Single(entry) => usize::from(!entry.is_placeholder()),
        }
    }

    /// Check if nothing matched.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Compiled include/exclude filters plus ordering options.
#[derive(Debug, Clone)]
pub struct EntryFilter {
    include: Option<Regex>,
    exclude: Option<Regex>,
    options: FilterOptions,
}

impl EntryFilter {
    /// Compile the filter. Invalid patterns disable that filter instead of
    /// failing, so a listing never errors on a bad regex.
    pub fn new(options: &FilterOptions) -> Self {
        Self {
            include: compile_lenient(options.include_pattern.as_deref()),
            exclude: compile_lenient(options.exclude_pattern.as_deref()),
            options: options.clone(),
        }
    }

    /// Whether an entry passes both name filters.
    pub fn matches(&self, entry: &Entry) -> bool {
        let name = entry.name.as_str();
        self.include.as_ref().is_none_or(|re| re.is_match(name))
            && self.exclude.as_ref().is_none_or(|re| !re.is_match(name))
    }

    /// Filter, sort, truncate and shape the entries.
    pub fn apply(&self, entries: Vec<Entry>) -> Selection {
        let mut kept: Vec<Entry> = entries.into_iter().filter(|e| self.matches(e)).collect();

        sort_entries(&mut kept, self.options.sort_by, self.options.sort_direction);

        if let Some(max) = self.options.max_records {
            kept.truncate(max);
        }

        if self.options.single_result {
            Selection::Single(kept.into_iter().next().unwrap_or_else(Entry::placeholder))
        } else {
            Selection::Many(kept)
        }
    }
}

/// Filter, sort, truncate and shape `entries` per `options`.
pub fn apply(entries: Vec<Entry>, options: &FilterOptions) -> Selection {
    EntryFilter::new(options).apply(entries)
}

/// Compile a filter regex; empty or invalid patterns yield `None`.
pub fn compile_lenient(pattern: Option<&str>) -> Option<Regex> {
    let pattern = pattern.filter(|p| !p.is_empty())?;
    match Regex::new(pattern) {
        Ok(re) => Some(re),
        Err(err) => {
            tracing::warn!(pattern, error = %err, "ignoring invalid filter pattern");
            None
        }
    }
}

/// Stable sort by `key`; `Desc` reverses the comparison.
pub fn sort_entries(entries: &mut [Entry], key: SortKey, direction: SortDirection) {
    entries.sort_by(|a, b| {
        let ordering = compare(a, b, key);
        match direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    });
}

fn compare(a: &Entry, b: &Entry, key: SortKey) -> Ordering {
    match key {
        SortKey::Name => a.name.cmp(&b.name),
        SortKey::Mtime => a.mtime.cmp(&b.mtime),
        SortKey::Type => a.kind.cmp(&b.kind),
        SortKey::Size => a.size.cmp(&b.size),
        SortKey::Depth => a.depth.cmp(&b.depth),
        SortKey::Path => a.path.cmp(&b.path),
        SortKey::Parent => a.parent.cmp(&b.parent),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::time::{Duration, SystemTime};

    fn sample() -> Vec<Entry> {
        let base = SystemTime::UNIX_EPOCH + Duration::from_secs(1_000_000);
        vec![
            Entry::file(Path::new("/r/b.txt"), 30, base, 1),
            Entry::directory(Path::new("/r/a"), base + Duration::from_secs(5), 1, None),
            Entry::file(Path::new("/r/a/c.log"), 10, base + Duration::from_secs(9), 2),
            Entry::file(Path::new("/r/d.txt"), 30, base + Duration::from_secs(1), 1),
        ]
    }

    fn names(selection: Selection) -> Vec<String> {
        selection
            .into_vec()
            .into_iter()
            .map(|e| e.name.to_string())
            .collect()
    }

    #[test]
    fn test_include_and_exclude() {
        let options = FilterOptions {
            include_pattern: Some(r"\.txt$".to_string()),
            exclude_pattern: Some("^d".to_string()),
            ..Default::default()
        };
        assert_eq!(names(apply(sample(), &options)), vec!["b.txt"]);
    }

    #[test]
    fn test_invalid_patterns_are_ignored() {
        let options = FilterOptions {
            include_pattern: Some("([unclosed".to_string()),
            exclude_pattern: Some("*bad".to_string()),
            ..Default::default()
        };
        assert_eq!(apply(sample(), &options).len(), 4);
    }

    #[test]
    fn test_sort_is_stable() {
        let options = FilterOptions {
            sort_by: SortKey::Size,
            ..Default::default()
        };
        // b.txt and d.txt share a size and keep their input order.
        assert_eq!(
            names(apply(sample(), &options)),
            vec!["a", "c.log", "b.txt", "d.txt"]
        );
    }

    #[test]
    fn test_sort_by_mtime_desc_and_truncate() {
        let options = FilterOptions {
            sort_by: SortKey::Mtime,
            sort_direction: SortDirection::Desc,
            max_records: Some(2),
            ..Default::default()
        };
        assert_eq!(names(apply(sample(), &options)), vec!["c.log", "a"]);
    }

    #[test]
    fn test_sort_by_type_puts_directories_first() {
        let options = FilterOptions {
            sort_by: SortKey::Type,
            ..Default::default()
        };
        assert_eq!(names(apply(sample(), &options))[0], "a");
    }

    #[test]
    fn test_single_result() {
        let options = FilterOptions {
            single_result: true,
            ..Default::default()
        };
        match apply(sample(), &options) {
            Selection::Single(entry) => assert_eq!(entry.name, "a"),
            other => panic!("expected single, got {other:?}"),
        }

        let none = FilterOptions {
            include_pattern: Some("zzz".to_string()),
            single_result: true,
            ..Default::default()
        };
        let selection = apply(sample(), &none);
        assert!(selection.is_empty());
        match selection {
            Selection::Single(entry) => assert!(entry.is_placeholder()),
            other => panic!("expected placeholder, got {other:?}"),
        }
    }
}
