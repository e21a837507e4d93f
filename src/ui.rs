use colored::{ColoredString, Colorize};
use declarative::{Movement, Outcome};

/// Print an info message
pub fn info(msg: &str) {
    println!("{} {}", "ℹ".blue(), msg);
}

/// Print a success message
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

/// Print a warning message
pub fn warn(msg: &str) {
    println!("{} {}", "⚠".yellow(), msg);
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

/// Print a dim/muted message
pub fn dim(msg: &str) {
    println!("  {}", msg.dimmed());
}

/// Print a header/title
pub fn header(title: &str) {
    println!();
    println!("{}", title.bold());
    println!("{}", "─".repeat(title.chars().count()).dimmed());
}

/// Print a section header
pub fn section(title: &str) {
    println!();
    println!("{}", title.cyan().bold());
}

/// Print a key-value pair
pub fn kv(key: &str, value: &str) {
    println!("  {}: {}", key.dimmed(), value);
}

// ============================================================================
// Reconcile Symbols
// ============================================================================

/// Symbol for a pass outcome
pub fn outcome_symbol(outcome: &Outcome) -> ColoredString {
    match outcome {
        Outcome::InSync => "○".dimmed(),
        Outcome::Created { .. } => "+".green(),
        Outcome::Updated { .. } => "~".yellow(),
        Outcome::Deleted => "-".red(),
        Outcome::Deferred(_) => "…".blue(),
        Outcome::Rejected(_) => "✗".red(),
    }
}

/// Colored lifecycle movement
pub fn movement(movement: Movement) -> ColoredString {
    let label = movement.to_string();
    match movement {
        Movement::Stable => label.green(),
        Movement::Transitional => label.blue(),
        Movement::Terminal => label.red(),
        Movement::Unknown => label.dimmed(),
    }
}

/// Shorten a value for one-line display
pub fn truncate(value: &str, max_len: usize) -> String {
    if value.chars().count() <= max_len {
        value.to_string()
    } else if max_len <= 3 {
        "...".to_string()
    } else {
        let kept: String = value.chars().take(max_len - 3).collect();
        format!("{kept}...")
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_short() {
        assert_eq!(truncate("orders", 20), "orders");
        assert_eq!(truncate("exact", 5), "exact");
    }

    #[test]
    fn test_truncate_long() {
        assert_eq!(truncate(r#"{"source":["orders"]}"#, 10), "{\"sourc...");
    }

    #[test]
    fn test_truncate_edge_cases() {
        assert_eq!(truncate("test", 3), "...");
        assert_eq!(truncate("", 10), "");
    }
}
