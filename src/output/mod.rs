//! CLI output formatting and display helpers.

use harvester_core::orchestrator::{CollectionDisposition, HarvestPlan, PlanAction, RunReport};
use tracing::{info, warn};

/// Returns terminal width from COLUMNS, or 80 if unset/invalid.
pub fn terminal_width() -> usize {
    std::env::var("COLUMNS")
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
        .filter(|width| *width >= 20)
        .unwrap_or(80)
}

/// Truncates text to at most `width` chars, appending ellipsis if truncated.
pub fn truncate_to_width(text: &str, width: usize) -> String {
    let text_len = text.chars().count();
    if text_len <= width {
        return text.to_string();
    }
    if width == 0 {
        return String::new();
    }
    if width == 1 {
        return "…".to_string();
    }

    let mut output: String = text.chars().take(width - 1).collect();
    output.push('…');
    output
}

/// Lines describing a dry-run plan, one per listed collection.
pub(crate) fn render_plan_lines(plan: &HarvestPlan, width: usize) -> Vec<String> {
    let mut lines = Vec::with_capacity(plan.entries.len() + 2);
    if let Some(error) = &plan.listing_error {
        lines.push(truncate_to_width(&format!("Listing failed: {error}"), width));
        return lines;
    }

    let planned = plan.to_harvest().count();
    lines.push(truncate_to_width(
        &format!(
            "{} collections listed, {planned} to harvest",
            plan.entries.len()
        ),
        width,
    ));
    for entry in &plan.entries {
        let action = match entry.action {
            PlanAction::Harvest => "harvest".to_string(),
            PlanAction::Skip(reason) => format!("skip ({reason})"),
        };
        let line = format!(
            "- [{}] {} ({} items): {action} -> {}",
            entry.classification,
            entry.collection.title,
            entry.collection.announced_item_count,
            entry.folder.display()
        );
        lines.push(truncate_to_width(&line, width));
    }
    lines
}

pub(crate) fn print_plan(plan: &HarvestPlan) {
    for line in render_plan_lines(plan, terminal_width()) {
        println!("{line}");
    }
}

/// Lines summarizing a finished run.
pub(crate) fn render_run_summary_lines(report: &RunReport, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut push = |text: String| lines.push(truncate_to_width(&text, width));

    if let Some(error) = &report.listing_error {
        push(format!("Listing failed: {error}"));
    }
    push(format!(
        "Collections: {} listed, {} harvested",
        report.listed,
        report.harvested_collections()
    ));
    push(format!(
        "Items: {} downloaded, {} already done, {} failed, {} unrecoverable ({} processed)",
        report.downloaded(),
        report.skipped(),
        report.failed(),
        report.unrecoverable(),
        report.processed()
    ));
    let timing = match report.average_secs_per_download() {
        Some(avg) => format!(
            "Elapsed: {:.1}s ({avg:.1}s per downloaded item)",
            report.elapsed.as_secs_f64()
        ),
        None => format!("Elapsed: {:.1}s", report.elapsed.as_secs_f64()),
    };
    push(timing);

    for collection in report.short_collections() {
        push(format!(
            "Short harvest: {} ({} of {} announced, {} missing)",
            collection.title,
            collection.harvested,
            collection.announced_total,
            collection.shortfall()
        ));
    }
    for collection in report.collections.iter().filter(|c| c.faulted_passes > 0) {
        push(format!(
            "Listing faults: {} ({} passes ended early, will retry next run)",
            collection.title, collection.faulted_passes
        ));
    }
    for collection in &report.collections {
        if let CollectionDisposition::Errored(reason) = &collection.disposition {
            push(format!("Error: {}: {reason}", collection.title));
        }
    }

    let mut failures = std::collections::BTreeMap::<&str, usize>::new();
    for collection in &report.collections {
        for (category, count) in &collection.failures {
            *failures.entry(*category).or_insert(0) += count;
        }
    }
    if !failures.is_empty() {
        push("Failure summary by category:".to_string());
        for (category, count) in failures {
            push(format!("- {category}: {count}"));
        }
    }

    if report.interrupted {
        push("Interrupted. Run again to resume.".to_string());
    } else if report.budget_exhausted {
        push("Item limit reached. Run again to continue.".to_string());
    }
    lines
}

pub(crate) fn print_run_summary(report: &RunReport) {
    info!(
        listed = report.listed,
        downloaded = report.downloaded(),
        skipped = report.skipped(),
        failed = report.failed(),
        elapsed_secs = report.elapsed.as_secs(),
        "Harvest Summary"
    );
    for collection in report.short_collections() {
        warn!(
            collection = %collection.identity,
            announced = collection.announced_total,
            harvested = collection.harvested,
            "collection harvest fell short of announced total"
        );
    }
    for line in render_run_summary_lines(report, terminal_width()) {
        println!("{line}");
    }
}
