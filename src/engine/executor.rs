//! Apply with progress bar, confirmation and summary

use anyhow::Result;
use colored::Colorize;
use declarative::{
    ApplyResult, ExecuteSummary, ProgressCallback, Provider, Reconciliation, ReconcileOptions,
    ResourceId, ResourceOutcome, apply_with_progress, summarize,
};
use indicatif::{ProgressBar, ProgressStyle};

use super::differ::display_diff;

/// Options for execution (adds `yes` for confirmation skip)
#[derive(Debug, Clone, Default)]
pub struct ExecuteOptions {
    pub engine: ReconcileOptions,
    /// Skip confirmation prompts
    pub yes: bool,
    pub verbose: bool,
}

/// Progress bar fed by the engine's layer callbacks
struct BarProgress {
    bar: ProgressBar,
    verbose: bool,
}

impl BarProgress {
    fn new(total: usize, verbose: bool) -> Self {
        let bar = ProgressBar::new(total as u64);
        let style = ProgressStyle::with_template(
            "  {spinner:.cyan} {prefix} [{bar:30.cyan/blue}] {pos}/{len} {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ");
        bar.set_style(style);
        bar.set_prefix("Applying");
        Self { bar, verbose }
    }
}

impl ProgressCallback for BarProgress {
    fn on_layer_start(&mut self, layer: usize, count: usize) {
        self.bar
            .set_message(format!("layer {} ({count} resources)", layer + 1));
    }

    fn on_resource_complete(&mut self, id: &ResourceId, result: &ApplyResult) {
        if self.verbose || !result.is_success() {
            self.bar
                .println(format!("    {} {}", result_symbol(result), id));
        }
        self.bar.inc(1);
    }

    fn on_layer_complete(&mut self, _layer: usize) {}
}

fn result_symbol(result: &ApplyResult) -> colored::ColoredString {
    match result {
        ApplyResult::NoChange => "○".dimmed(),
        ApplyResult::Applied { .. } => "✓".green(),
        ApplyResult::Failed { .. } => "✗".red(),
        ApplyResult::Skipped { .. } => "⊘".yellow(),
    }
}

/// Show the diff, confirm, apply and print a summary
///
/// Returns `None` when nothing needed to change or the user declined.
pub fn execute<P: Provider + ?Sized>(
    reconciliation: &Reconciliation,
    provider: &P,
    opts: &ExecuteOptions,
) -> Result<Option<Vec<ResourceOutcome>>> {
    display_diff(reconciliation);

    if reconciliation.is_converged() {
        return Ok(None);
    }

    if opts.engine.dry_run {
        println!();
        println!("  {} Dry run - no changes made", "ℹ".blue());
        return Ok(None);
    }

    if !opts.yes && !confirm_proceed()? {
        println!();
        println!("  {} Aborted", "✗".red());
        return Ok(None);
    }

    println!();
    let catalog = reconciliation.catalog();
    let mut progress = BarProgress::new(catalog.len(), opts.verbose);
    let outcomes = apply_with_progress(reconciliation, provider, &opts.engine, &mut progress);
    progress.bar.finish_and_clear();

    print_outcomes(&outcomes);
    print_summary(&summarize(&outcomes));
    Ok(Some(outcomes))
}

/// Confirm with user
fn confirm_proceed() -> Result<bool> {
    use dialoguer::Confirm;

    let confirmed = Confirm::new()
        .with_prompt("Continue?")
        .default(true)
        .interact()?;

    Ok(confirmed)
}

fn print_outcomes(outcomes: &[ResourceOutcome]) {
    for outcome in outcomes {
        match &outcome.result {
            ApplyResult::Applied { changed } => println!(
                "  {} {} {}",
                "✓".green(),
                outcome.id,
                changed.join(", ").dimmed()
            ),
            ApplyResult::Failed { error } => {
                println!("  {} {} {}", "✗".red(), outcome.id, error.red());
            }
            ApplyResult::Skipped { reason } => {
                println!("  {} {} {}", "⊘".yellow(), outcome.id, reason.dimmed());
            }
            ApplyResult::NoChange => {}
        }
    }
}

/// Print final summary
fn print_summary(summary: &ExecuteSummary) {
    println!();
    if summary.is_success() {
        println!(
            "  {} Configuration applied successfully!",
            "✓".green().bold()
        );
    } else {
        println!(
            "  {} Configuration applied with errors",
            "⚠".yellow().bold()
        );
    }

    if summary.applied > 0 {
        println!("    • {} resources applied", summary.applied);
    }
    if summary.no_change > 0 {
        println!("    • {} resources unchanged", summary.no_change);
    }
    if summary.skipped > 0 {
        println!("    • {} resources skipped", summary.skipped);
    }
    if summary.failed > 0 {
        println!("    • {} {} failed", summary.failed, "resources".red());
    }
}
