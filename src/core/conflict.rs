//! Post-rename path collision analysis
//!
//! Two working items conflict when their resulting `(directory, name)` pairs
//! are equal. The analysis is a full grouping pass over the whole set:
//! - O(N) with a map keyed by the normalized pair
//! - every member of a group larger than one is flagged
//! - optional pre-existing paths outside the batch count as occupants
//!
//! Case handling is a [`PathComparison`] choice, not hardcoded.

use std::borrow::Cow;
use std::collections::{HashMap, HashSet};
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

/// How two paths are compared for equality
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathComparison {
    /// Byte-exact comparison (Linux and most Unix file systems)
    Exact,
    /// Unicode lowercase folding (default Windows and macOS volumes)
    CaseInsensitive,
}

impl PathComparison {
    /// The comparison matching the host platform's default file systems
    pub fn platform() -> Self {
        if cfg!(any(windows, target_os = "macos")) {
            Self::CaseInsensitive
        } else {
            Self::Exact
        }
    }

    fn normalize<'a>(&self, s: &'a str) -> Cow<'a, str> {
        match self {
            Self::Exact => Cow::Borrowed(s),
            Self::CaseInsensitive => Cow::Owned(s.to_lowercase()),
        }
    }
}

impl Default for PathComparison {
    fn default() -> Self {
        Self::platform()
    }
}

/// One candidate after its name has been computed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkingItem {
    /// Containing directory (unchanged by renaming)
    pub directory: PathBuf,
    pub original_name: String,
    pub computed_name: String,
}

impl WorkingItem {
    pub fn new(
        directory: impl Into<PathBuf>,
        original_name: impl Into<String>,
        computed_name: impl Into<String>,
    ) -> Self {
        Self {
            directory: directory.into(),
            original_name: original_name.into(),
            computed_name: computed_name.into(),
        }
    }

    pub fn is_replaced(&self) -> bool {
        self.original_name != self.computed_name
    }

    pub fn original_path(&self) -> PathBuf {
        self.directory.join(&self.original_name)
    }

    pub fn computed_path(&self) -> PathBuf {
        self.directory.join(&self.computed_name)
    }
}

/// Set-wide outcome of a conflict pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConflictReport {
    /// Conflict flag per item, in input order
    pub per_item: Vec<bool>,
    /// Items whose computed name differs from the original
    pub count_replaced: usize,
    /// Items taking part in at least one collision
    pub count_conflicted: usize,
}

impl ConflictReport {
    pub fn is_conflicted(&self, index: usize) -> bool {
        self.per_item.get(index).copied().unwrap_or(false)
    }

    pub fn is_replaced_any(&self) -> bool {
        self.count_replaced > 0
    }

    pub fn is_conflicted_any(&self) -> bool {
        self.count_conflicted > 0
    }
}

/// Groups items by resulting path and flags duplicates
#[derive(Debug, Clone, Default)]
pub struct ConflictAnalyzer {
    comparison: PathComparison,
    /// Normalized (directory, name) keys of paths outside the batch
    existing: HashSet<(String, String)>,
}

type PathKey = (String, String);

impl ConflictAnalyzer {
    pub fn new(comparison: PathComparison) -> Self {
        Self {
            comparison,
            existing: HashSet::new(),
        }
    }

    pub fn comparison(&self) -> PathComparison {
        self.comparison
    }

    /// Also treat these pre-existing paths as occupied.
    /// Paths that are some batch item's original location are ignored at
    /// analysis time, since that item either keeps or vacates it.
    pub fn with_existing_paths<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        for path in paths {
            let path = path.as_ref();
            let Some(name) = path.file_name() else {
                continue;
            };
            let directory = path.parent().unwrap_or_else(|| Path::new(""));
            let key = self.key(directory, &name.to_string_lossy());
            self.existing.insert(key);
        }
        self
    }

    fn key(&self, directory: &Path, name: &str) -> PathKey {
        let directory = lexical_normal(directory);
        let directory = directory.to_string_lossy();
        (
            self.comparison.normalize(&directory).into_owned(),
            self.comparison.normalize(name).into_owned(),
        )
    }

    pub fn analyze(&self, items: &[WorkingItem]) -> ConflictReport {
        let mut groups: HashMap<PathKey, Vec<usize>> = HashMap::with_capacity(items.len());

        for (index, item) in items.iter().enumerate() {
            groups
                .entry(self.key(&item.directory, &item.computed_name))
                .or_default()
                .push(index);
        }

        let mut per_item = vec![false; items.len()];

        for members in groups.values().filter(|m| m.len() > 1) {
            for &index in members {
                per_item[index] = true;
            }
        }

        if !self.existing.is_empty() {
            let originals: HashSet<PathKey> = items
                .iter()
                .map(|item| self.key(&item.directory, &item.original_name))
                .collect();

            for (key, members) in &groups {
                if self.existing.contains(key) && !originals.contains(key) {
                    for &index in members {
                        per_item[index] = true;
                    }
                }
            }
        }

        ConflictReport {
            count_replaced: items.iter().filter(|i| i.is_replaced()).count(),
            count_conflicted: per_item.iter().filter(|&&c| c).count(),
            per_item,
        }
    }
}

/// `path` without `.` components, so `./sub` and `sub` compare equal.
/// `..` is kept; resolving it needs the file system.
pub fn lexical_normal(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

/// Batch-only analysis with the platform's path comparison
pub fn analyze_conflicts(items: &[WorkingItem]) -> ConflictReport {
    ConflictAnalyzer::default().analyze(items)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(dir: &str, original: &str, computed: &str) -> WorkingItem {
        WorkingItem::new(dir, original, computed)
    }

    #[test]
    fn test_duplicate_pair_flags_both_members() {
        let items = vec![
            item("dir1", "a.txt", "x.txt"),
            item("dir1", "b.txt", "x.txt"),
            item("dir1", "y.txt", "y.txt"),
        ];

        let report = ConflictAnalyzer::new(PathComparison::Exact).analyze(&items);

        assert_eq!(report.per_item, vec![true, true, false]);
        assert_eq!(report.count_conflicted, 2);
        assert_eq!(report.count_replaced, 2);
        assert!(report.is_conflicted_any());
    }

    #[test]
    fn test_current_dir_prefix_does_not_hide_collisions() {
        let items = vec![item("./sub", "a1.txt", "a.txt"), item("sub", "a2.txt", "a.txt")];
        let report = ConflictAnalyzer::new(PathComparison::Exact).analyze(&items);
        assert_eq!(report.per_item, vec![true, true]);

        let items = vec![item(".", "a1.txt", "a.txt"), item("", "a2.txt", "a.txt")];
        let report = ConflictAnalyzer::new(PathComparison::Exact).analyze(&items);
        assert_eq!(report.count_conflicted, 2);

        let report = ConflictAnalyzer::new(PathComparison::Exact)
            .with_existing_paths(["./a.txt"])
            .analyze(&[item("", "b.txt", "a.txt")]);
        assert_eq!(report.count_conflicted, 1);
    }

    #[test]
    fn test_lexical_normal() {
        assert_eq!(lexical_normal(Path::new("./sub/./x")), PathBuf::from("sub/x"));
        assert_eq!(lexical_normal(Path::new(".")), PathBuf::new());
        assert_eq!(lexical_normal(Path::new("../sub")), PathBuf::from("../sub"));
    }

    #[test]
    fn test_same_name_in_different_directories_is_fine() {
        let items = vec![item("a", "1", "x"), item("b", "2", "x")];
        let report = ConflictAnalyzer::new(PathComparison::Exact).analyze(&items);
        assert_eq!(report.count_conflicted, 0);
        assert!(!report.is_conflicted(0));
        assert!(!report.is_conflicted(7));
    }

    #[test]
    fn test_case_policy_is_configurable() {
        let items = vec![item("d", "a", "Report.txt"), item("d", "b", "report.TXT")];

        let exact = ConflictAnalyzer::new(PathComparison::Exact).analyze(&items);
        assert_eq!(exact.count_conflicted, 0);

        let folded = ConflictAnalyzer::new(PathComparison::CaseInsensitive).analyze(&items);
        assert_eq!(folded.count_conflicted, 2);
    }

    #[test]
    fn test_swapped_names_do_not_conflict() {
        let items = vec![item("d", "a", "b"), item("d", "b", "a")];
        let report = ConflictAnalyzer::new(PathComparison::Exact)
            .with_existing_paths(["d/a", "d/b"])
            .analyze(&items);
        assert_eq!(report.count_conflicted, 0);
        assert_eq!(report.count_replaced, 2);
    }

    #[test]
    fn test_existing_paths_outside_batch() {
        let items = vec![item("d", "a.txt", "keep.txt"), item("d", "b.txt", "new.txt")];

        let batch_only = ConflictAnalyzer::new(PathComparison::Exact).analyze(&items);
        assert_eq!(batch_only.count_conflicted, 0);

        let report = ConflictAnalyzer::new(PathComparison::Exact)
            .with_existing_paths(["d/keep.txt", "other/new.txt"])
            .analyze(&items);
        assert_eq!(report.per_item, vec![true, false]);
        assert_eq!(report.count_conflicted, 1);
    }

    #[test]
    fn test_empty_set() {
        let report = analyze_conflicts(&[]);
        assert_eq!(report, ConflictReport::default());
    }
}
