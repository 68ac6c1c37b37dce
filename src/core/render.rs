//! Output for preview reports: text with per-character name diffs, tables, JSON.

use anyhow::Result;
use owo_colors::OwoColorize;
use serde::Serialize;
use similar::{ChangeTag, TextDiff};
use tabled::{Table, Tabled};

use crate::cli::{AppContext, OutputFormat};
use crate::core::preview::{PreviewItem, PreviewReport, RowFilter};

/// Machine-readable view; only visible rows are listed, counts cover all
#[derive(Debug, Serialize)]
struct JsonReport<'r> {
    count_items: usize,
    count_replaced: usize,
    count_conflicted: usize,
    count_fallbacks: usize,
    items: Vec<&'r PreviewItem>,
}

#[derive(Tabled)]
struct Row {
    status: &'static str,
    directory: String,
    #[tabled(rename = "name")]
    original: String,
    #[tabled(rename = "new name")]
    computed: String,
}

/// Short status word for an item
pub fn status(item: &PreviewItem) -> &'static str {
    if item.is_conflicted {
        "conflict"
    } else if !item.fallbacks.is_empty() {
        "skipped"
    } else if item.is_replaced {
        "rename"
    } else {
        "same"
    }
}

pub fn print_report(
    report: &PreviewReport,
    filter: RowFilter,
    format: OutputFormat,
    empty_chain: bool,
    ctx: &AppContext,
) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let view = JsonReport {
                count_items: report.items.len(),
                count_replaced: report.count_replaced,
                count_conflicted: report.count_conflicted,
                count_fallbacks: report.count_fallbacks,
                items: filter.visible(report).collect(),
            };
            println!("{}", serde_json::to_string_pretty(&view)?);
            return Ok(());
        }
        OutputFormat::Table => {
            let rows: Vec<Row> = filter
                .visible(report)
                .map(|item| Row {
                    status: status(item),
                    directory: item.directory.display().to_string(),
                    original: item.original_name.clone(),
                    computed: item.computed_name.clone(),
                })
                .collect();
            println!("{}", Table::new(rows));
        }
        OutputFormat::Text => {
            for item in filter.visible(report) {
                println!("{}", text_line(item, !ctx.no_color));
            }
        }
    }

    if !ctx.quiet {
        if empty_chain {
            eprintln!("No rules configured; names are unchanged.");
        }
        eprintln!("{}", summary(report, !ctx.no_color));
    }
    Ok(())
}

fn text_line(item: &PreviewItem, color: bool) -> String {
    let marker = match status(item) {
        "conflict" => "!",
        "skipped" => "?",
        "rename" => "*",
        _ => " ",
    };
    let marker = if color && item.is_conflicted {
        marker.red().bold().to_string()
    } else {
        marker.to_string()
    };

    let path = item.directory.join(&item.original_name);
    if item.is_replaced {
        format!(
            "{marker} {}  ->  {}",
            path.display(),
            name_diff(&item.original_name, &item.computed_name, color)
        )
    } else {
        format!("{marker} {}", path.display())
    }
}

fn summary(report: &PreviewReport, color: bool) -> String {
    let mut line = format!(
        "{} items, {} renamed, {} conflicted",
        report.items.len(),
        report.count_replaced,
        report.count_conflicted
    );
    if report.count_fallbacks > 0 {
        line.push_str(&format!(", {} skipped by a rule", report.count_fallbacks));
    }

    match (color, report.count_conflicted) {
        (false, _) => line,
        (true, 0) => line.green().to_string(),
        (true, _) => line.yellow().to_string(),
    }
}

/// Render `new` against `old` character by character.
///
/// Without color, removed runs read `[-..-]` and inserted runs `{+..+}`.
pub fn name_diff(old: &str, new: &str, color: bool) -> String {
    let diff = TextDiff::from_chars(old, new);
    let mut out = String::with_capacity(new.len() + 8);
    let mut run = String::new();
    let mut run_tag = ChangeTag::Equal;

    for change in diff.iter_all_changes() {
        if change.tag() != run_tag {
            flush_run(&mut out, run_tag, &run, color);
            run.clear();
            run_tag = change.tag();
        }
        run.push_str(change.value());
    }
    flush_run(&mut out, run_tag, &run, color);

    out
}

fn flush_run(out: &mut String, tag: ChangeTag, run: &str, color: bool) {
    if run.is_empty() {
        return;
    }
    match (tag, color) {
        (ChangeTag::Equal, _) => out.push_str(run),
        (ChangeTag::Delete, true) => out.push_str(&run.red().strikethrough().to_string()),
        (ChangeTag::Insert, true) => out.push_str(&run.green().bold().to_string()),
        (ChangeTag::Delete, false) => {
            out.push_str("[-");
            out.push_str(run);
            out.push_str("-]");
        }
        (ChangeTag::Insert, false) => {
            out.push_str("{+");
            out.push_str(run);
            out.push_str("+}");
        }
    }
}
