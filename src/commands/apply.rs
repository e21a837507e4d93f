//! `bridgeward apply` - one reconcile pass per declared resource

use anyhow::{Result, bail};
use colored::Colorize;
use declarative::{
    AutoConfirm, ConfirmCallback, ExecuteOptions, ExecuteReport, Outcome, ProgressCallback,
    ReconcileSummary, execute,
};
use std::time::Duration;

use super::Session;
use crate::Context;
use crate::cli::ApplyArgs;
use crate::resource::build_plan;
use crate::ui;

pub fn run(ctx: &Context, args: ApplyArgs) -> Result<()> {
    if args.dry_run {
        ui::warn("Dry run - no changes will be made");
        return super::plan::run(ctx, args.target.as_deref());
    }

    let mut session = Session::open(ctx)?;
    let problems = session.manifest.validate();
    if let Some(first) = problems.first() {
        bail!("manifest has {} problem(s), first: {first}", problems.len());
    }

    let plan = build_plan(&session.manifest, &session.shared, args.prune)
        .filter_by_target(args.target.as_deref());
    if plan.is_empty() {
        ui::info("Nothing to reconcile");
        return Ok(());
    }

    if !ctx.quiet {
        ui::header("Reconciling");
        for stage in &plan.stages {
            ui::kv(&stage.name, &stage.resources.len().to_string());
        }
        println!();
    }

    let opts = ExecuteOptions {
        dry_run: false,
        jobs: args.jobs.unwrap_or(session.settings.jobs).max(1),
        verbose: ctx.verbose > 0,
    };
    let mut progress = ApplyProgress { quiet: ctx.quiet };
    let report = if args.yes {
        execute(plan, &opts, &mut progress, &mut AutoConfirm)?
    } else {
        execute(plan, &opts, &mut progress, &mut PromptConfirm)?
    };

    if report.reports.is_empty() && report.summary.skipped > 0 {
        ui::warn("Cancelled");
        return Ok(());
    }

    session.save()?;
    print_summary(&report.summary);

    if let Some(after) = next_pass(&report) {
        ui::info(&format!(
            "{} resource(s) need another pass; run apply again in {}s",
            report.summary.deferred + report.summary.total_changes(),
            after.as_secs().max(1)
        ));
    }

    if report.summary.failed > 0 {
        bail!("{} resource(s) failed", report.summary.failed);
    }
    Ok(())
}

/// Shortest requeue delay among the results, if any resource asked for one
fn next_pass(report: &ExecuteReport) -> Option<Duration> {
    report
        .reports
        .iter()
        .filter_map(|r| r.result.as_ref().ok())
        .filter_map(Outcome::requeue_after)
        .min()
}

// ============================================================================
// Callbacks
// ============================================================================

struct ApplyProgress {
    quiet: bool,
}

impl ProgressCallback for ApplyProgress {
    fn on_stage_start(&mut self, stage: &str, count: usize) {
        if !self.quiet {
            ui::section(&format!("{stage} ({count})"));
        }
    }

    fn on_resource_complete(&mut self, id: &str, result: &std::result::Result<Outcome, String>) {
        match result {
            Ok(Outcome::InSync) if self.quiet => {}
            Ok(outcome) => println!(
                "  {} {} {}",
                ui::outcome_symbol(outcome),
                id,
                outcome.to_string().dimmed()
            ),
            Err(err) => println!("  {} {} {}", "✗".red(), id, err.red()),
        }
    }

    fn on_stage_complete(&mut self, _stage: &str) {}
}

/// Confirmation through an interactive prompt
struct PromptConfirm;

impl ConfirmCallback for PromptConfirm {
    fn confirm(&mut self, prompt: &str) -> Result<bool> {
        use dialoguer::Confirm;

        let confirmed = Confirm::new()
            .with_prompt(prompt)
            .default(true)
            .interact()?;

        Ok(confirmed)
    }
}

fn print_summary(summary: &ReconcileSummary) {
    println!();
    if summary.is_success() {
        println!("  {} Reconcile pass complete", "✓".green().bold());
    } else {
        println!("  {} Reconcile pass finished with problems", "⚠".yellow().bold());
    }

    let lines = [
        (summary.created, "created"),
        (summary.updated, "updated"),
        (summary.deleted, "deleted"),
        (summary.in_sync, "in sync"),
        (summary.deferred, "deferred"),
    ];
    for (count, label) in lines {
        if count > 0 {
            println!("    • {count} {label}");
        }
    }
    if summary.rejected > 0 {
        println!("    • {} {}", summary.rejected, "rejected".red());
    }
    if summary.failed > 0 {
        println!("    • {} {}", summary.failed, "failed".red());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use declarative::{Requeue, ResourceReport};

    fn report(id: &str, result: std::result::Result<Outcome, String>) -> ResourceReport {
        ResourceReport {
            id: id.to_string(),
            kind: "Archive",
            result,
        }
    }

    #[test]
    fn test_next_pass_takes_shortest_delay() {
        let report = ExecuteReport {
            summary: ReconcileSummary::default(),
            reports: vec![
                report("a", Ok(Outcome::InSync)),
                report(
                    "b",
                    Ok(Outcome::Deferred(Requeue::new(Duration::from_secs(30), "CREATING"))),
                ),
                report(
                    "c",
                    Ok(Outcome::Created {
                        requeue_after: Duration::from_secs(5),
                    }),
                ),
                report("d", Err("boom".to_string())),
            ],
        };
        assert_eq!(next_pass(&report), Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_next_pass_none_when_settled() {
        let report = ExecuteReport {
            summary: ReconcileSummary::default(),
            reports: vec![report("a", Ok(Outcome::InSync)), report("b", Ok(Outcome::Deleted))],
        };
        assert_eq!(next_pass(&report), None);
    }
}
