//! Diff and verification display

use colored::Colorize;
use declarative::{Diff, DiffSummary, Reconciliation, VerificationReport, group_by_type};

use crate::ui;

/// Display a reconciliation's diffs grouped by resource type
pub fn display_diff(reconciliation: &Reconciliation) {
    let diffs = reconciliation.diffs();
    let failures: Vec<_> = reconciliation.failures().collect();

    if diffs.is_empty() && failures.is_empty() {
        println!();
        println!("  {} No changes needed", "✓".green());
        return;
    }

    println!();
    println!(
        "┌─ {} ─────────────────────────────────────────┐",
        "Configuration Diff".bold()
    );
    println!("│");

    for (kind, type_diffs) in &group_by_type(&diffs) {
        println!("│ {}", ui::type_heading(*kind).bold());
        for diff in type_diffs {
            print_diff_line(diff);
        }
        println!("│");
    }

    if !failures.is_empty() {
        println!("│ {}", "Unreadable".red().bold());
        for check in &failures {
            println!(
                "│   {} {:<30} {}",
                "✗".red(),
                check.id.to_string(),
                check.error.as_deref().unwrap_or_default().dimmed()
            );
        }
        println!("│");
    }

    let summary = DiffSummary::from_diffs(&diffs);
    println!("├─────────────────────────────────────────────────────┤");
    println!(
        "│ Summary: {} changes on {} resources ({} new, {} modified)",
        summary.total().to_string().bold(),
        summary.resources,
        summary.additions.to_string().green(),
        summary.modifications.to_string().yellow()
    );
    println!("└─────────────────────────────────────────────────────┘");
}

fn print_diff_line(diff: &Diff) {
    let (symbol, from) = match &diff.observed {
        None => ("+".green(), "(unset)".to_string()),
        Some(observed) => ("~".yellow(), observed.clone()),
    };
    println!(
        "│   {} {:<30} {} {}",
        symbol,
        format!("{} {}", diff.resource, diff.attribute),
        format!("{from} →").dimmed(),
        diff.desired
    );
}

/// Display per-resource verification verdicts
pub fn display_verification(report: &VerificationReport) {
    println!();
    for (id, verdict) in &report.verdicts {
        if verdict.passed {
            println!("  {} {}", "✓".green(), id);
            continue;
        }
        println!("  {} {}", "✗".red(), id);
        for mismatch in &verdict.mismatches {
            ui::dim(&format!(
                "  {}: expected {}, found {}",
                mismatch.attribute,
                mismatch.desired,
                mismatch.observed.as_deref().unwrap_or("(unset)")
            ));
        }
        if let Some(error) = &verdict.error {
            ui::dim(&format!("  {error}"));
        }
    }

    println!();
    let failed = report.failures().count();
    if failed == 0 {
        ui::success(&format!("All {} resources verified", report.len()));
    } else {
        ui::error(&format!(
            "{failed} of {} resources failed verification",
            report.len()
        ));
    }
}
