//! Filepath: src/infra/walk.rs
//! Gitignore-aware enumeration of rename candidates.
//! - Respects .gitignore, .git/info/exclude, and global gitignore
//! - Extra ignore globs (early prune + late filter)
//! - Optional directories as candidates, hidden file policy,
//!   following symlinks, and max depth
//! - Deterministic ordering for stable previews and tests
//!
//! Backed by ripgrep's `ignore` crate and `globset`.
//! The walk root itself is never a candidate.

use std::path::{Path, PathBuf};

use anyhow::Result;
use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::{DirEntry, WalkBuilder};

/// Gitignore-aware walker with optional extra ignore globs.
/// Extra globs are applied in two places:
///   1) Early: prune directories during traversal (filter_entry).
///   2) Late: filter out entries that still slipped through.
pub struct FileWalker
{
    /// Compiled set of additional ignore patterns
    ignore_patterns: GlobSet,

    /// Yield directories as well as files; default false
    include_dirs: bool,

    /// Include hidden (dot) files; default true
    include_hidden: bool,

    /// Follow symbolic links; default false
    follow_symlinks: bool,

    /// Maximum recursion depth; default None (unbounded)
    max_depth: Option<usize>,
}

impl FileWalker
{
    /// Build a walker with additional ignore patterns (e.g., "target/**",
    /// "**/*.bak"). Patterns match on (relative) paths.
    pub fn new(additional_ignores: &[String]) -> Result<Self>
    {
        let mut builder = GlobSetBuilder::new();

        for pattern in additional_ignores
        {
            builder.add(Glob::new(pattern)?);
        }

        Ok(Self {
            ignore_patterns: builder.build()?,
            include_dirs: false,
            include_hidden: true,
            follow_symlinks: false,
            max_depth: None,
        })
    }

    /// (Optional) Yield directories as candidates too.
    pub fn with_include_dirs(
        mut self,
        include_dirs: bool,
    ) -> Self
    {
        self.include_dirs = include_dirs;
        self
    }

    /// (Optional) Include or exclude hidden files (dotfiles).
    pub fn with_include_hidden(
        mut self,
        include_hidden: bool,
    ) -> Self
    {
        self.include_hidden = include_hidden;
        self
    }

    /// (Optional) Follow or skip symbolic links (default false).
    pub fn with_follow_symlinks(
        mut self,
        follow: bool,
    ) -> Self
    {
        self.follow_symlinks = follow;
        self
    }

    /// (Optional) Limit recursion depth (`None` = unbounded, 1 = direct children).
    pub fn with_max_depth(
        mut self,
        depth: Option<usize>,
    ) -> Self
    {
        self.max_depth = depth;
        self
    }

    /// Internal: construct a configured WalkBuilder for `root`.
    fn build_walk(
        &self,
        root: &Path,
    ) -> WalkBuilder
    {
        let mut b = WalkBuilder::new(root);

        // WalkBuilder::hidden(true) skips dotfiles
        b.hidden(!self.include_hidden);

        b.git_ignore(true);
        b.git_global(true);
        b.git_exclude(true);

        b.follow_links(self.follow_symlinks);
        b.max_depth(self.max_depth);

        // Early directory pruning using extra ignores
        let extra = self
            .ignore_patterns
            .clone();
        b.filter_entry(move |ent: &DirEntry| {
            let is_dir = ent
                .file_type()
                .map(|ft| ft.is_dir())
                .unwrap_or(false);

            !(is_dir && extra.is_match(ent.path()))
        });

        b
    }

    /// Traverse candidates under `root`, respecting ignore rules and extra
    /// globs. Returns a **sorted** list for determinism.
    pub fn walk_entries<P: AsRef<Path>>(
        &self,
        root: P,
    ) -> Vec<PathBuf>
    {
        let root_path = root.as_ref();
        let walker = self
            .build_walk(root_path)
            .build();

        let mut out: Vec<PathBuf> = walker
            // Unreadable entries are skipped
            .filter_map(|res| res.ok())
            .filter(|entry| entry.depth() > 0)
            .filter(|entry| {
                entry
                    .file_type()
                    .is_some_and(|ft| ft.is_file() || (self.include_dirs && ft.is_dir()))
            })
            .map(|entry| entry.into_path())
            // Late extra ignore filtering using RELATIVE path
            .filter(|abs| {
                let rel = abs
                    .strip_prefix(root_path)
                    .unwrap_or(abs);
                !self
                    .ignore_patterns
                    .is_match(rel)
            })
            .collect();

        out.sort();

        out
    }
}
