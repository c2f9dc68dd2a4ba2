//! Display utilities for the ticket CLI

use std::path::Path;

use colored::Colorize;

/// Format the header naming the card image a command reads
pub(crate) fn card_title(path: &Path, uid: &str) -> String {
    format!(
        "\n{} {}",
        path.display().to_string().bold().underline(),
        format!("(UID {uid})").dimmed()
    )
}

/// Format a success message
pub(crate) fn success(message: &str) -> String {
    format!("✅ {}", message.green().bold())
}

/// Format a failure message
pub(crate) fn failure(message: &str) -> String {
    format!("❌ {}", message.red().bold())
}

/// Format a warning message
pub(crate) fn warning(message: &str) -> String {
    format!("⚠️  {}", message.yellow().bold())
}

/// Format an info message
pub(crate) fn info(message: &str) -> String {
    format!("ℹ️  {}", message.blue())
}

/// Format a key-value section
pub(crate) fn key_value_box(title: &str, items: Vec<(&str, String)>) -> String {
    let mut result = format!("{}", title.bold().underline());

    for (key, value) in items {
        result.push_str(&format!("\n  {}: {}", key.bold(), value));
    }

    result
}

/// Print a multi-line machine status, first line highlighted
pub(crate) fn status(ok: bool, message: &str) -> String {
    let (headline, rest) = message.split_once('\n').unwrap_or((message, ""));
    let mut result = if ok { success(headline) } else { failure(headline) };
    for line in rest.lines() {
        result.push_str(&format!("\n   {line}"));
    }
    result
}
