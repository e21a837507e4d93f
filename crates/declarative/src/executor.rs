//! Execution engine - runs reconcile passes stage by stage
//!
//! Stages run sequentially so references resolve in dependency order.
//! Within a stage every identity gets its own pass on a rayon pool.

use crate::context::{ConfirmCallback, ProgressCallback};
use crate::planner::ExecutionPlan;
use crate::resource::Reconcilable;
use crate::types::{ExecuteOptions, ReconcileSummary, ResourceReport};
use anyhow::Result;
use rayon::prelude::*;

/// Summary plus per-resource results
#[derive(Debug, Default)]
pub struct ExecuteReport {
    pub summary: ReconcileSummary,
    pub reports: Vec<ResourceReport>,
}

/// Execute a plan with the given options and callbacks
pub fn execute<P, C>(
    plan: ExecutionPlan,
    opts: &ExecuteOptions,
    progress: &mut P,
    confirm: &mut C,
) -> Result<ExecuteReport>
where
    P: ProgressCallback,
    C: ConfirmCallback,
{
    let total = plan.total_resources();
    if total == 0 || opts.dry_run {
        return Ok(ExecuteReport::default());
    }

    if !confirm.confirm(&format!("Reconcile {total} resource(s)?"))? {
        return Ok(ExecuteReport {
            summary: ReconcileSummary {
                skipped: total,
                ..Default::default()
            },
            reports: Vec::new(),
        });
    }

    let mut report = ExecuteReport::default();
    for stage in &plan.stages {
        progress.on_stage_start(&stage.name, stage.resources.len());
        let results = execute_batch(&stage.resources, opts.jobs)?;
        for result in results {
            progress.on_resource_complete(&result.id, &result.result);
            report.summary.add_result(&result.result);
            report.reports.push(result);
        }
        progress.on_stage_complete(&stage.name);
    }

    Ok(report)
}

/// Run one batch, sequentially for a single job or resource
fn execute_batch(resources: &[Box<dyn Reconcilable>], jobs: usize) -> Result<Vec<ResourceReport>> {
    if jobs <= 1 || resources.len() <= 1 {
        return Ok(resources.iter().map(|r| run_resource(r.as_ref())).collect());
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(jobs)
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to create thread pool: {}", e))?;

    // `collect` on an indexed parallel iterator keeps input order
    Ok(pool.install(|| {
        resources
            .par_iter()
            .map(|r| run_resource(r.as_ref()))
            .collect()
    }))
}

fn run_resource(resource: &dyn Reconcilable) -> ResourceReport {
    let result = resource.reconcile().map_err(|e| {
        log::warn!("{} failed: {e:#}", resource.description());
        format!("{e:#}")
    });
    ResourceReport {
        id: resource.id(),
        kind: resource.kind(),
        result,
    }
}

/// Simple execution without callbacks
pub fn execute_simple(plan: ExecutionPlan, opts: &ExecuteOptions) -> Result<ExecuteReport> {
    use crate::context::{AutoConfirm, NoProgress};

    execute(plan, opts, &mut NoProgress, &mut AutoConfirm)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{AutoConfirm, AutoDecline, NoProgress};
    use crate::types::{Outcome, Rejection};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug)]
    struct TestResource {
        id: String,
        outcome: Option<Outcome>,
        calls: &'static AtomicUsize,
    }

    impl Reconcilable for TestResource {
        fn id(&self) -> String {
            self.id.clone()
        }

        fn kind(&self) -> &'static str {
            "test"
        }

        fn reconcile(&self) -> Result<Outcome> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.outcome
                .clone()
                .ok_or_else(|| anyhow::anyhow!("remote unavailable"))
        }
    }

    fn resource(id: &str, outcome: Option<Outcome>, calls: &'static AtomicUsize) -> Box<TestResource> {
        Box::new(TestResource {
            id: id.into(),
            outcome,
            calls,
        })
    }

    #[test]
    fn test_execute_empty_plan() {
        let report = execute_simple(ExecutionPlan::new(), &ExecuteOptions::default()).unwrap();
        assert_eq!(report.summary.total(), 0);
    }

    #[test]
    fn test_execute_collects_every_outcome() {
        static CALLS: AtomicUsize = AtomicUsize::new(0);
        let mut plan = ExecutionPlan::new();
        plan.add("first", resource("a", Some(Outcome::InSync), &CALLS));
        plan.add("second", resource("b", Some(Outcome::Deleted), &CALLS));
        plan.add(
            "second",
            resource("c", Some(Outcome::Rejected(Rejection::new("immutable"))), &CALLS),
        );
        plan.add("second", resource("d", None, &CALLS));

        let report = execute_simple(plan, &ExecuteOptions::default()).unwrap();
        assert_eq!(CALLS.load(Ordering::SeqCst), 4);
        assert_eq!(report.summary.in_sync, 1);
        assert_eq!(report.summary.deleted, 1);
        assert_eq!(report.summary.rejected, 1);
        assert_eq!(report.summary.failed, 1);
        let ids: Vec<&str> = report.reports.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c", "d"]);
        assert_eq!(
            report.reports[3].result,
            Err("remote unavailable".to_string())
        );
    }

    #[test]
    fn test_declined_confirmation_skips_everything() {
        static CALLS: AtomicUsize = AtomicUsize::new(0);
        let mut plan = ExecutionPlan::new();
        plan.add("only", resource("a", Some(Outcome::InSync), &CALLS));
        let report = execute(plan, &ExecuteOptions::default(), &mut NoProgress, &mut AutoDecline).unwrap();
        assert_eq!(report.summary.skipped, 1);
        assert_eq!(CALLS.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_dry_run_makes_no_passes() {
        static CALLS: AtomicUsize = AtomicUsize::new(0);
        let mut plan = ExecutionPlan::new();
        plan.add("only", resource("a", Some(Outcome::InSync), &CALLS));
        let opts = ExecuteOptions {
            dry_run: true,
            ..Default::default()
        };
        let report = execute(plan, &opts, &mut NoProgress, &mut AutoConfirm).unwrap();
        assert_eq!(report.summary.total(), 0);
        assert_eq!(CALLS.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_sequential_with_one_job() {
        static CALLS: AtomicUsize = AtomicUsize::new(0);
        let mut plan = ExecutionPlan::new();
        plan.add("only", resource("a", Some(Outcome::InSync), &CALLS));
        plan.add("only", resource("b", Some(Outcome::InSync), &CALLS));
        let opts = ExecuteOptions {
            jobs: 1,
            ..Default::default()
        };
        let report = execute_simple(plan, &opts).unwrap();
        assert_eq!(report.summary.in_sync, 2);
    }
}
