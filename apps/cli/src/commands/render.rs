//! Terminal rendering of progress events and plans.

use colored::Colorize;
use sitewright_core::{
    EventKind, PageStatus, Phase, PipelineResult, Plan, PlanStatus, ProgressEvent, ProgressObserver, progress,
};
use std::sync::Arc;

/// Observer printing each event as one line, combined with the tracing
/// observer so events also reach the log.
pub fn observer() -> ProgressObserver {
    let printer: ProgressObserver = Arc::new(|event: &ProgressEvent| println!("{}", event_line(event)));
    progress::combine(vec![printer, progress::logging()])
}

fn event_line(event: &ProgressEvent) -> String {
    let counter = if event.total > 0 { format!("[{}/{}] ", event.current, event.total) } else { String::new() };
    match event.kind {
        EventKind::Start => format!("{} {}", "→".cyan(), event.message.bold()),
        EventKind::PageStart => format!("  {} {counter}{}", "▸".dimmed(), event.message),
        EventKind::PageDone => format!("  {} {counter}{}", "✓".green(), event.message),
        EventKind::Skip => format!("  {} {counter}{}", "↷".yellow(), event.message.yellow()),
        EventKind::Retry => format!("  {} {}", "↻".yellow(), event.message.yellow()),
        EventKind::Error => format!("  {} {}", "✗".red(), event.message.red()),
        EventKind::Repair => format!("  {} {}", "+".blue(), event.message),
        EventKind::Complete if event.phase == Phase::Completed => {
            format!("{} {}", "■".cyan(), event.message.bold())
        }
        EventKind::Complete => format!("{} {}", "✓".green(), event.message),
    }
}

fn status_label(status: PageStatus) -> colored::ColoredString {
    let text = format!("{:<12}", status.to_string());
    match status {
        PageStatus::Completed => text.green(),
        PageStatus::Skipped => text.yellow(),
        PageStatus::Failed => text.red(),
        PageStatus::InProgress => text.cyan(),
        PageStatus::Pending => text.dimmed(),
    }
}

fn plan_status_label(status: PlanStatus) -> colored::ColoredString {
    let text = status.to_string();
    match status {
        PlanStatus::Completed => text.green().bold(),
        PlanStatus::Partial => text.yellow().bold(),
        PlanStatus::Failed => text.red().bold(),
        PlanStatus::Pending | PlanStatus::InProgress => text.cyan().bold(),
    }
}

/// Prints the plan header and one line per page.
pub fn print_plan(plan: &Plan) {
    println!("{}", format!("{} ({})", plan.site_name, plan.site_type).bold().cyan());
    println!("  Plan: {}", plan.id.dimmed());
    println!("  Status: {}", plan_status_label(plan.status));
    let stats = plan.stats;
    println!(
        "  Pages: {} total, {} completed, {} failed, {} skipped",
        stats.total_pages, stats.completed_pages, stats.failed_pages, stats.skipped_pages
    );
    println!();
    for page in &plan.pages {
        println!("  {} {} {}", status_label(page.status), page.path, format!("({})", page.page_type).dimmed());
        if let Some(error) = page.error.as_deref().filter(|_| page.status == PageStatus::Failed) {
            println!("               {}", error.red());
        }
    }
}

/// Prints the outcome of a run.
pub fn print_result(result: &PipelineResult) {
    println!();
    println!(
        "{} {} in {:.1}s{}",
        "Run".bold(),
        plan_status_label(result.plan.status),
        result.duration.as_secs_f64(),
        if result.resumed { " (resumed)" } else { "" }
    );
    println!("  {}", result.plan.summary());
    println!("  Plan saved to {}", result.plan_path.display().to_string().dimmed());
}
