use colored::Colorize;

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

/// Print wsadmin output indented under the resource it belongs to
pub fn output_block(output: &str) {
    for line in output.lines().filter(|l| !l.trim().is_empty()) {
        println!("    {}", line.dimmed());
    }
}

/// `1 resource`, `3 resources`
pub fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("{count} {noun}")
    } else {
        format!("{count} {noun}s")
    }
}

/// Truncate an identifier for display, keeping the end
pub fn truncate_id(id: &str, max_len: usize) -> String {
    let len = id.chars().count();
    if len <= max_len {
        id.to_string()
    } else if max_len <= 3 {
        "...".to_string()
    } else {
        let tail: String = id.chars().skip(len - (max_len - 3)).collect();
        format!("...{tail}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plural() {
        assert_eq!(plural(0, "resource"), "0 resources");
        assert_eq!(plural(1, "resource"), "1 resource");
        assert_eq!(plural(4, "change"), "4 changes");
    }

    #[test]
    fn test_truncate_id_short() {
        assert_eq!(truncate_id("variable:LOG_ROOT", 30), "variable:LOG_ROOT");
        assert_eq!(truncate_id("exact", 5), "exact");
    }

    #[test]
    fn test_truncate_id_keeps_the_name() {
        assert_eq!(
            truncate_id("jdbc_datasource:/Cell:CELL_01/:appDS", 15),
            "...LL_01/:appDS"
        );
    }

    #[test]
    fn test_truncate_id_edge_cases() {
        assert_eq!(truncate_id("test", 3), "...");
        assert_eq!(truncate_id("", 10), "");
    }
}
