//! `bridgeward validate` - check the manifest without contacting the remote

use anyhow::{Result, bail};
use colored::Colorize;
use eventbridge::kinds::{ArchiveKind, EndpointKind, EventBusKind, RuleKind};

use crate::Context;
use crate::config::{Manifest, Settings};
use crate::resource::Declared;
use crate::ui;

pub fn run(ctx: &Context) -> Result<()> {
    let settings = Settings::load()?;
    let path = settings.manifest_path(ctx.manifest.as_deref());
    let manifest = Manifest::load(&path)?;

    if !ctx.quiet {
        ui::header(&format!("Validating {}", path.display()));
    }

    let mut problems = 0;
    for err in manifest.validate() {
        ui::error(&err.to_string());
        problems += 1;
    }
    problems += report::<EventBusKind>(ctx, &manifest);
    problems += report::<RuleKind>(ctx, &manifest);
    problems += report::<ArchiveKind>(ctx, &manifest);
    problems += report::<EndpointKind>(ctx, &manifest);

    println!();
    if problems > 0 {
        bail!("{problems} problem(s) found in {}", path.display());
    }
    ui::success(&format!("{} resource(s) valid", manifest.len()));
    Ok(())
}

fn report<K: Declared>(ctx: &Context, manifest: &Manifest) -> usize {
    let specs = K::declared(manifest);
    if specs.is_empty() {
        return 0;
    }
    if !ctx.quiet {
        ui::section(K::KIND);
    }

    let mut problems = 0;
    for spec in specs {
        let identity = K::identity(spec);
        match check::<K>(spec) {
            Ok(()) if !ctx.quiet => println!("  {} {}", "✓".green(), identity),
            Ok(()) => {}
            Err(message) => {
                problems += 1;
                println!("  {} {} {}", "✗".red(), identity, message.red());
            }
        }
    }
    problems
}

/// Structural checks of one spec: kind validation, then references.
fn check<K: Declared>(spec: &K::Spec) -> Result<(), String> {
    K::validate(spec, None).map_err(|e| e.to_string())?;
    K::check_references(spec).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use declarative::ResourceReference;
    use eventbridge::kinds::{ArchiveSpec, RuleSpec};
    use eventbridge::Target;

    #[test]
    fn test_valid_rule() {
        let rule = RuleSpec {
            name: "ship".into(),
            schedule_expression: Some("rate(5 minutes)".into()),
            targets: vec![Target::new("fn", "arn:aws:lambda:us-east-1:123456789012:function:ship")],
            ..Default::default()
        };
        assert_eq!(check::<RuleKind>(&rule), Ok(()));
    }

    #[test]
    fn test_rule_without_pattern_or_schedule() {
        let rule = RuleSpec {
            name: "ship".into(),
            ..Default::default()
        };
        assert!(check::<RuleKind>(&rule).is_err());
    }

    #[test]
    fn test_archive_source_set_twice() {
        let archive = ArchiveSpec {
            archive_name: "audit".into(),
            event_source_arn: Some("arn:aws:events:us-east-1:123456789012:event-bus/orders".into()),
            event_source_ref: Some(ResourceReference::to("orders")),
            ..Default::default()
        };
        assert_eq!(
            check::<ArchiveKind>(&archive),
            Err("eventSourceARN and eventSourceRef cannot both be set".to_string())
        );
    }

    #[test]
    fn test_archive_source_required() {
        let archive = ArchiveSpec {
            archive_name: "audit".into(),
            ..Default::default()
        };
        assert_eq!(
            check::<ArchiveKind>(&archive),
            Err("one of eventSourceARN or eventSourceRef must be set".to_string())
        );
    }
}
