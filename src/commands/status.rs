//! `bridgeward status` - observed resources with their recorded conditions

use anyhow::Result;
use colored::Colorize;
use eventbridge::kinds::{ArchiveKind, EndpointKind, EventBusKind, RuleKind};

use super::{Filter, Session};
use crate::Context;
use crate::resource::{Declared, undeclared};
use crate::state::Condition;
use crate::ui;

pub fn run(ctx: &Context, target: Option<&str>) -> Result<()> {
    let session = Session::open(ctx)?;
    let filter = Filter::new(target);

    ui::header("Bridgeward Status");
    ui::kv("Account", &session.state.backend.account_id);
    ui::kv("Region", &session.state.backend.region);
    ui::kv("State", &session.state_path.display().to_string());
    let pending = session.state.backend.pending();
    if pending > 0 {
        ui::kv("Pending", &format!("{pending} transition(s), run 'bridgeward settle'"));
    }

    show_kind::<EventBusKind>(ctx, &session, &filter)?;
    show_kind::<RuleKind>(ctx, &session, &filter)?;
    show_kind::<ArchiveKind>(ctx, &session, &filter)?;
    show_kind::<EndpointKind>(ctx, &session, &filter)?;
    Ok(())
}

fn show_kind<K: Declared>(ctx: &Context, session: &Session, filter: &Filter) -> Result<()> {
    if !filter.includes_kind(K::KIND) {
        return Ok(());
    }

    let mut rows: Vec<(String, K::Spec, bool)> = K::declared(&session.manifest)
        .iter()
        .map(|spec| {
            let lookup = K::resolve(spec, session.shared.as_ref()).unwrap_or_else(|_| spec.clone());
            (K::identity(spec).to_string(), lookup, true)
        })
        .collect();
    for identity in undeclared::<K>(&session.manifest, session.shared.recorded(K::KIND)) {
        let spec = K::named(&identity);
        rows.push((identity, spec, false));
    }
    rows.retain(|(identity, _, _)| filter.matches(K::KIND, identity));
    if rows.is_empty() {
        return Ok(());
    }

    ui::section(K::KIND);
    for (identity, lookup, declared) in rows {
        let condition = session.shared.condition(K::KIND, &identity);
        let recorded = condition.as_ref().and_then(|c| c.arn.as_deref());
        let latest = K::observe(session.client(), &lookup, recorded)?;

        let note = if declared { "" } else { " (undeclared)" };
        match &latest {
            Some(latest) => {
                let state = K::lifecycle_state(&latest.status)
                    .map(|s| format!(" {s}"))
                    .unwrap_or_default();
                println!(
                    "  {} {}{} {}{}",
                    condition_icon(condition.as_ref()),
                    identity.bold(),
                    note.dimmed(),
                    ui::movement(K::movement(&latest.status)),
                    state.dimmed()
                );
                if ctx.verbose > 0
                    && let Some(arn) = K::arn(&latest.status)
                {
                    ui::kv("    arn", arn);
                }
            }
            None => println!(
                "  {} {}{} {}",
                "✗".red(),
                identity.bold(),
                note.dimmed(),
                "absent".dimmed()
            ),
        }

        if let Some(condition) = &condition
            && !condition.synced
        {
            ui::dim(&format!(
                "  {} ({})",
                ui::truncate(&condition.message, 100),
                condition.updated_at.format("%Y-%m-%d %H:%M:%S")
            ));
        }
    }
    Ok(())
}

fn condition_icon(condition: Option<&Condition>) -> colored::ColoredString {
    match condition {
        Some(c) if c.synced => "✓".green(),
        Some(c) if c.terminal => "✗".red(),
        Some(_) => "⚠".yellow(),
        None => "?".dimmed(),
    }
}
