//! Batch preview: compute every candidate's new name, then analyze collisions.
//!
//! Names are computed in parallel with rayon (rules and patterns are shared
//! read-only); the collect is the barrier after which the conflict analysis
//! runs once over the whole set. Cancellation is checked before each item.

use std::borrow::Cow;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, instrument};

use crate::cli::{AppContext, OutputFormat, PreviewArgs};
use crate::core::chain::{ComputedName, RuleChain, RuleFallback};
use crate::core::conflict::{ConflictAnalyzer, PathComparison, WorkingItem, lexical_normal};
use crate::core::matcher::ItemContext;
use crate::core::render;
use crate::core::rules;
use crate::infra::config::{Config, load_config};
use crate::infra::walk::FileWalker;

/// One candidate after a preview pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreviewItem {
    pub directory: PathBuf,
    pub original_name: String,
    pub computed_name: String,
    pub is_replaced: bool,
    pub is_conflicted: bool,
    /// Rules that left this item unchanged because their expansion failed
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fallbacks: Vec<RuleFallback>,
}

/// Outcome of a full pass, items in input order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PreviewReport {
    pub items: Vec<PreviewItem>,
    pub count_replaced: usize,
    pub count_conflicted: usize,
    /// Items with at least one rule fallback
    pub count_fallbacks: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PreviewError {
    #[error("preview cancelled before all names were computed")]
    Cancelled,
}

/// One evaluation of a chain over a candidate set
pub struct PreviewPass<'a> {
    chain: &'a RuleChain,
    analyzer: ConflictAnalyzer,
    cancel: Option<&'a AtomicBool>,
    progress: ProgressBar,
}

impl<'a> PreviewPass<'a> {
    pub fn new(chain: &'a RuleChain, analyzer: ConflictAnalyzer) -> Self {
        Self {
            chain,
            analyzer,
            cancel: None,
            progress: ProgressBar::hidden(),
        }
    }

    /// Stop early once `flag` is set; a cancelled pass yields no report
    pub fn with_cancel(mut self, flag: &'a AtomicBool) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    fn cancelled(&self) -> bool {
        self.cancel.is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    #[instrument(skip_all, fields(items = paths.len(), rules = self.chain.len()))]
    pub fn run(&self, paths: &[PathBuf]) -> Result<PreviewReport, PreviewError> {
        let computed: Option<Vec<(WorkingItem, Vec<RuleFallback>)>> = paths
            .par_iter()
            .map(|path| {
                if self.cancelled() {
                    return None;
                }

                let original_name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                let directory = path.parent().map(Path::to_path_buf).unwrap_or_default();

                let directory_name = directory_name(path);
                let ComputedName { name, fallbacks } = self
                    .chain
                    .compute(&original_name, &ItemContext::new(&directory_name));

                self.progress.inc(1);
                Some((WorkingItem::new(directory, original_name, name), fallbacks))
            })
            .collect();

        let Some(computed) = computed else {
            debug!("preview pass cancelled");
            return Err(PreviewError::Cancelled);
        };

        let (working, fallbacks): (Vec<_>, Vec<_>) = computed.into_iter().unzip();
        let conflicts = self.analyzer.analyze(&working);

        let items: Vec<PreviewItem> = working
            .into_iter()
            .zip(fallbacks)
            .zip(&conflicts.per_item)
            .map(|((item, fallbacks), &is_conflicted)| PreviewItem {
                is_replaced: item.is_replaced(),
                directory: item.directory,
                original_name: item.original_name,
                computed_name: item.computed_name,
                is_conflicted,
                fallbacks,
            })
            .collect();

        Ok(PreviewReport {
            count_fallbacks: items.iter().filter(|i| !i.fallbacks.is_empty()).count(),
            count_replaced: conflicts.count_replaced,
            count_conflicted: conflicts.count_conflicted,
            items,
        })
    }
}

/// Name of the directory containing `path`.
///
/// Lexical first; parents such as `.` or `..` are resolved on disk, and an
/// unresolvable parent yields an empty name.
fn directory_name(path: &Path) -> Cow<'_, str> {
    let lexical = ItemContext::for_path(path).directory_name;
    if !lexical.is_empty() {
        return Cow::Borrowed(lexical);
    }

    let Some(parent) = path.parent() else {
        return Cow::Borrowed("");
    };
    let parent = if parent.as_os_str().is_empty() {
        Path::new(".")
    } else {
        parent
    };

    fs::canonicalize(parent)
        .ok()
        .and_then(|abs| abs.file_name().map(|n| n.to_string_lossy().into_owned()))
        .map_or(Cow::Borrowed(""), Cow::Owned)
}

/// Which rows of a report are shown
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RowFilter {
    pub replaced_only: bool,
    pub conflicted_only: bool,
}

impl RowFilter {
    /// `replaced_only` has no effect on a report where nothing changed
    pub fn effective(self, report: &PreviewReport) -> Self {
        Self {
            replaced_only: self.replaced_only && report.count_replaced > 0,
            ..self
        }
    }

    pub fn is_visible(&self, item: &PreviewItem) -> bool {
        let replaced_visible = !self.replaced_only || item.is_replaced;
        let conflicted_visible = !self.conflicted_only || item.is_conflicted;
        replaced_visible && conflicted_visible
    }

    pub fn visible<'r>(&self, report: &'r PreviewReport) -> impl Iterator<Item = &'r PreviewItem> {
        let filter = self.effective(report);
        report.items.iter().filter(move |item| filter.is_visible(item))
    }
}

/// `rendiff preview`: compute names for the candidates under `args.paths`
pub fn run(args: PreviewArgs, ctx: &AppContext) -> Result<()> {
    let config = load_config(ctx.config.as_deref())?;

    let definitions = rules::definitions(&config, &args.rules);
    let chain = rules::build_chain(&definitions)?;

    let candidates = collect_candidates(&args, &config)?;

    let comparison = if args.case_insensitive {
        PathComparison::CaseInsensitive
    } else {
        config.conflicts.comparison
    };
    let mut analyzer = ConflictAnalyzer::new(comparison);
    if args.check_existing || config.conflicts.include_existing {
        analyzer = analyzer.with_existing_paths(existing_siblings(&candidates)?);
    }

    let progress = if ctx.quiet || args.format == OutputFormat::Json {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new(candidates.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} names")
                .context("progress template")?
                .progress_chars("#>-"),
        );
        pb
    };

    let report = PreviewPass::new(&chain, analyzer)
        .with_progress(progress.clone())
        .run(&candidates)?;
    progress.finish_and_clear();

    let filter = RowFilter {
        replaced_only: args.changed_only,
        conflicted_only: args.conflicted_only,
    };
    render::print_report(&report, filter, args.format, chain.is_empty(), ctx)?;

    if args.strict && report.count_conflicted > 0 {
        anyhow::bail!("{} items would collide after renaming", report.count_conflicted);
    }
    Ok(())
}

/// Expand each argument into candidates: files as-is, directories walked
fn collect_candidates(args: &PreviewArgs, config: &Config) -> Result<Vec<PathBuf>> {
    let mut ignores = config.ignore_patterns.clone();
    ignores.extend(args.ignore.iter().cloned());

    let walker = FileWalker::new(&ignores)
        .context("invalid ignore pattern")?
        .with_include_dirs(args.dirs || config.preview.include_dirs)
        .with_include_hidden(args.hidden || config.preview.show_hidden)
        .with_max_depth(args.depth.or(config.preview.max_depth));

    let mut out = Vec::new();

    for arg in &args.paths {
        let root = PathBuf::from(shellexpand::tilde(&arg.to_string_lossy()).as_ref());

        if root.is_dir() {
            out.extend(walker.walk_entries(&root));
        } else if root.exists() {
            out.push(root);
        } else {
            anyhow::bail!("No such file or directory: {}", root.display());
        }
    }

    // `./a.txt` and `a.txt` name the same candidate
    let mut out: Vec<PathBuf> = out.into_iter().map(|p| lexical_normal(&p)).collect();
    out.sort();
    out.dedup();
    debug!(candidates = out.len(), "candidates collected");
    Ok(out)
}

/// Every entry living next to a candidate (the batch itself included)
fn existing_siblings(candidates: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let directories: BTreeSet<&Path> = candidates.iter().filter_map(|p| p.parent()).collect();

    let mut out = Vec::new();
    for dir in directories {
        let listing = if dir.as_os_str().is_empty() {
            fs::read_dir(".")
        } else {
            fs::read_dir(dir)
        };
        for entry in listing.with_context(|| format!("listing {}", dir.display()))? {
            out.push(dir.join(entry?.file_name()));
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::pattern::RuleDefinition;

    fn chain(rules: &[(&str, &str)]) -> RuleChain {
        let defs: Vec<_> = rules
            .iter()
            .map(|(p, r)| RuleDefinition::new(*p, *r, true, false))
            .collect();
        RuleChain::from_definitions(&defs).unwrap()
    }

    fn paths(list: &[&str]) -> Vec<PathBuf> {
        list.iter().map(PathBuf::from).collect()
    }

    #[test]
    fn test_pass_computes_and_flags_collisions() {
        let chain = chain(&[(r"^\d+_", "")]);
        let report = PreviewPass::new(&chain, ConflictAnalyzer::new(PathComparison::Exact))
            .run(&paths(&["a/01_x.txt", "a/02_x.txt", "a/y.txt", "b/03_x.txt"]))
            .unwrap();

        let names: Vec<_> = report.items.iter().map(|i| i.computed_name.as_str()).collect();
        assert_eq!(names, vec!["x.txt", "x.txt", "y.txt", "x.txt"]);

        let flags: Vec<_> = report.items.iter().map(|i| i.is_conflicted).collect();
        assert_eq!(flags, vec![true, true, false, false]);
        assert_eq!(report.count_replaced, 3);
        assert_eq!(report.count_conflicted, 2);
    }

    #[test]
    fn test_current_dir_spellings_still_collide() {
        let chain = chain(&[(r"\d", "")]);
        let report = PreviewPass::new(&chain, ConflictAnalyzer::new(PathComparison::Exact))
            .run(&paths(&["./sub/a1.txt", "sub/a2.txt"]))
            .unwrap();

        assert!(report.items.iter().all(|i| i.computed_name == "a.txt"));
        assert_eq!(report.count_conflicted, 2);
    }

    #[test]
    fn test_directory_token_uses_each_items_parent() {
        let chain = chain(&[("^", "$d_")]);

        let report = PreviewPass::new(&chain, ConflictAnalyzer::new(PathComparison::Exact))
            .run(&paths(&["Invoices/scan.pdf", "Receipts/scan.pdf"]))
            .unwrap();

        assert_eq!(report.items[0].computed_name, "Invoices_scan.pdf");
        assert_eq!(report.items[1].computed_name, "Receipts_scan.pdf");
        assert_eq!(report.count_conflicted, 0);
    }

    #[test]
    fn test_one_bad_expansion_does_not_stop_the_pass() {
        let chain = chain(&[("^", "$d-")]);
        let report = PreviewPass::new(&chain, ConflictAnalyzer::new(PathComparison::Exact))
            .run(&paths(&["ok/a.txt", "bad$1x/b.txt", "fine/c.txt"]))
            .unwrap();

        let names: Vec<_> = report.items.iter().map(|i| i.computed_name.as_str()).collect();
        assert_eq!(names, vec!["ok-a.txt", "b.txt", "fine-c.txt"]);
        assert_eq!(report.count_fallbacks, 1);
        assert_eq!(report.items[1].fallbacks[0].rule, 0);
        assert!(!report.items[1].is_replaced);
    }

    #[test]
    fn test_directory_name_resolves_dot_parents() {
        assert_eq!(directory_name(Path::new("Invoices/a.pdf")), "Invoices");

        let cwd = std::env::current_dir().unwrap();
        let expected = cwd.file_name().unwrap().to_string_lossy().into_owned();
        assert_eq!(directory_name(Path::new("./a.pdf")), expected);
        assert_eq!(directory_name(Path::new("a.pdf")), expected);
    }

    #[test]
    fn test_cancelled_pass_returns_no_report() {
        let chain = chain(&[("a", "b")]);
        let flag = AtomicBool::new(true);
        let result = PreviewPass::new(&chain, ConflictAnalyzer::default())
            .with_cancel(&flag)
            .run(&paths(&["d/a", "d/aa"]));
        assert_eq!(result, Err(PreviewError::Cancelled));

        flag.store(false, Ordering::Relaxed);
        let report = PreviewPass::new(&chain, ConflictAnalyzer::default())
            .with_cancel(&flag)
            .run(&paths(&["d/a"]))
            .unwrap();
        assert_eq!(report.items[0].computed_name, "b");
    }

    #[test]
    fn test_row_filter() {
        let chain = chain(&[("^a$", "b")]);
        let report = PreviewPass::new(&chain, ConflictAnalyzer::new(PathComparison::Exact))
            .run(&paths(&["d/a", "d/b", "d/c"]))
            .unwrap();

        let shown = |f: RowFilter| -> Vec<String> {
            f.visible(&report).map(|i| i.original_name.clone()).collect()
        };

        assert_eq!(shown(RowFilter::default()), vec!["a", "b", "c"]);
        assert_eq!(shown(RowFilter { replaced_only: true, ..Default::default() }), vec!["a"]);
        assert_eq!(
            shown(RowFilter { conflicted_only: true, ..Default::default() }),
            vec!["a", "b"]
        );
    }

    #[test]
    fn test_replaced_only_is_ignored_when_nothing_changed() {
        let chain = RuleChain::new();
        let report = PreviewPass::new(&chain, ConflictAnalyzer::default())
            .run(&paths(&["d/a", "d/b"]))
            .unwrap();

        let filter = RowFilter { replaced_only: true, ..Default::default() };
        assert!(!filter.effective(&report).replaced_only);
        assert_eq!(filter.visible(&report).count(), 2);
    }
}
