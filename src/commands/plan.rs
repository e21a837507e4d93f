//! `bridgeward plan` - what the next apply would do, without changing anything

use anyhow::Result;
use colored::{ColoredString, Colorize};
use declarative::{Outcome, Snapshot, Step, plan};
use eventbridge::kinds::{ArchiveKind, EndpointKind, EventBusKind, RuleKind};

use super::{Filter, Session};
use crate::Context;
use crate::resource::{Declared, undeclared};
use crate::ui;

#[derive(Debug, Default)]
struct Totals {
    changes: usize,
    waiting: usize,
    rejected: usize,
}

pub fn run(ctx: &Context, target: Option<&str>) -> Result<()> {
    let session = Session::open(ctx)?;
    let filter = Filter::new(target);

    ui::header("Plan");

    let mut totals = Totals::default();
    plan_kind::<EventBusKind>(&session, &filter, &mut totals)?;
    plan_kind::<RuleKind>(&session, &filter, &mut totals)?;
    plan_kind::<ArchiveKind>(&session, &filter, &mut totals)?;
    plan_kind::<EndpointKind>(&session, &filter, &mut totals)?;

    println!();
    ui::kv("Changes", &totals.changes.to_string());
    if totals.waiting > 0 {
        ui::kv("Waiting", &totals.waiting.to_string());
    }
    if totals.rejected > 0 {
        ui::kv("Rejected", &totals.rejected.to_string().red().to_string());
    }
    Ok(())
}

fn plan_kind<K: Declared>(session: &Session, filter: &Filter, totals: &mut Totals) -> Result<()> {
    if !filter.includes_kind(K::KIND) {
        return Ok(());
    }
    let specs: Vec<_> = K::declared(&session.manifest)
        .iter()
        .filter(|spec| filter.matches(K::KIND, K::identity(spec)))
        .collect();
    let pruned: Vec<String> = undeclared::<K>(&session.manifest, session.shared.recorded(K::KIND))
        .into_iter()
        .filter(|identity| filter.matches(K::KIND, identity))
        .collect();
    if specs.is_empty() && pruned.is_empty() {
        return Ok(());
    }

    ui::section(K::KIND);
    for spec in specs {
        let identity = K::identity(spec);
        let step = match K::resolve(spec, session.shared.as_ref()) {
            Ok(desired) => {
                let recorded = session.state.recorded_arn(K::KIND, identity);
                let latest = K::observe(session.client(), &desired, recorded)?;
                let desired = Snapshot::new(identity, desired);
                plan::<K>(Some(&desired), latest.as_ref())?
            }
            Err(err) => Step::Done(err.into_outcome(K::REQUEUE_AFTER)),
        };
        print_step(identity, &step, totals, "");
    }

    for identity in pruned {
        let recorded = session.state.recorded_arn(K::KIND, &identity);
        let latest = K::observe(session.client(), &K::named(&identity), recorded)?;
        let step = plan::<K>(None, latest.as_ref())?;
        print_step(&identity, &step, totals, " (with --prune)");
    }
    Ok(())
}

fn print_step<R>(identity: &str, step: &Step<R>, totals: &mut Totals, note: &str) {
    let (symbol, text) = describe(step);
    match step {
        Step::Create | Step::Delete | Step::Update { .. } => totals.changes += 1,
        Step::Done(Outcome::Deferred(_)) => totals.waiting += 1,
        Step::Done(Outcome::Rejected(_)) => totals.rejected += 1,
        Step::Done(_) => {}
    }
    println!("  {symbol} {identity} {}{}", text.dimmed(), note.dimmed());
}

/// Symbol and one-line description of a step
fn describe<R>(step: &Step<R>) -> (ColoredString, String) {
    match step {
        Step::Create => ("+".green(), "create".to_string()),
        Step::Delete => ("-".red(), "delete".to_string()),
        Step::Update { changed, plan } => {
            let paths: Vec<String> = changed.iter().map(ToString::to_string).collect();
            let mut text = format!("update {}", paths.join(", "));
            if plan.request.is_none() && !plan.collections.is_empty() {
                text.push_str(" (collections only)");
            }
            ("~".yellow(), text)
        }
        Step::Done(outcome) => (ui::outcome_symbol(outcome), outcome.to_string()),
    }
}
