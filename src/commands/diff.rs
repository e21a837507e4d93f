//! `bridgeward diff` - field-level differences between manifest and remote

use anyhow::Result;
use colored::Colorize;
use declarative::{Difference, Snapshot};
use eventbridge::kinds::{ArchiveKind, EndpointKind, EventBusKind, RuleKind};
use serde_json::Value;

use super::{Filter, Session};
use crate::Context;
use crate::resource::Declared;
use crate::ui;

pub fn run(ctx: &Context, target: Option<&str>) -> Result<()> {
    let session = Session::open(ctx)?;
    let filter = Filter::new(target);

    ui::header("Differences");

    let mut changed = 0;
    changed += diff_kind::<EventBusKind>(&session, &filter)?;
    changed += diff_kind::<RuleKind>(&session, &filter)?;
    changed += diff_kind::<ArchiveKind>(&session, &filter)?;
    changed += diff_kind::<EndpointKind>(&session, &filter)?;

    println!();
    if changed == 0 {
        ui::success("Everything matches the manifest");
    } else {
        ui::info(&format!("{changed} resource(s) differ; run 'bridgeward apply' to reconcile"));
    }
    Ok(())
}

/// Print the delta of every matching resource of a kind; returns how many differ.
fn diff_kind<K: Declared>(session: &Session, filter: &Filter) -> Result<usize> {
    let specs: Vec<_> = K::declared(&session.manifest)
        .iter()
        .filter(|spec| filter.matches(K::KIND, K::identity(spec)))
        .collect();
    if specs.is_empty() {
        return Ok(0);
    }

    ui::section(K::KIND);
    let mut changed = 0;
    for spec in specs {
        let identity = K::identity(spec);
        let desired = match K::resolve(spec, session.shared.as_ref()) {
            Ok(desired) => desired,
            Err(err) => {
                println!("  {} {} {}", "…".blue(), identity, err.to_string().dimmed());
                changed += 1;
                continue;
            }
        };

        let recorded = session.state.recorded_arn(K::KIND, identity);
        let Some(latest) = K::observe(session.client(), &desired, recorded)? else {
            println!("  {} {} {}", "+".green(), identity, "(not created)".dimmed());
            changed += 1;
            continue;
        };

        let delta = K::delta(&Snapshot::new(identity, desired), &latest)?;
        if delta.is_empty() {
            println!("  {} {}", "○".dimmed(), identity);
            continue;
        }

        changed += 1;
        println!("  {} {}", "~".yellow(), identity.bold());
        for difference in delta.differences() {
            print_difference(difference);
        }
    }
    Ok(changed)
}

fn print_difference(difference: &Difference) {
    println!("    {}", difference.path.as_str().cyan());
    let latest = display_text(&difference.latest);
    let desired = display_text(&difference.desired);

    if latest.contains('\n') || desired.contains('\n') {
        let diff = similar::TextDiff::from_lines(&latest, &desired);
        for change in diff.iter_all_changes() {
            match change.tag() {
                similar::ChangeTag::Delete => {
                    print!("      {}", format!("- {change}").red());
                }
                similar::ChangeTag::Insert => {
                    print!("      {}", format!("+ {change}").green());
                }
                similar::ChangeTag::Equal => print!("        {}", change.to_string().dimmed()),
            }
        }
        return;
    }

    println!("      {}", format!("- {}", ui::truncate(&latest, 100)).red());
    println!("      {}", format!("+ {}", ui::truncate(&desired, 100)).green());
}

/// Text shown for a value; JSON documents inside strings are pretty printed
/// so event patterns diff line by line.
fn display_text(value: &Value) -> String {
    let text = match value {
        Value::Null => return "(unset)".to_string(),
        Value::String(s) => match serde_json::from_str::<Value>(s) {
            Ok(document) if document.is_object() || document.is_array() => {
                serde_json::to_string_pretty(&document).unwrap_or_else(|_| s.clone())
            }
            _ => s.clone(),
        },
        other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
    };
    if text.contains('\n') && !text.ends_with('\n') {
        format!("{text}\n")
    } else {
        text
    }
}
