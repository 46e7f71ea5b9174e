//! Human-readable output.

use owo_colors::OwoColorize as _;
use rmcp::model::Tool;

pub fn tool_line(tool: &Tool, color: bool) -> String {
    let summary = tool.description.as_deref().map(first_sentence).unwrap_or_default();
    let marker = match tool.annotations.as_ref() {
        Some(a) if a.read_only_hint == Some(true) => "read",
        Some(a) if a.destructive_hint == Some(true) => "write",
        _ => "call",
    };
    if color {
        format!(
            "{:<64} {:<5} {}",
            tool.name.bold(),
            marker.dimmed(),
            summary
        )
    } else {
        format!("{:<64} {:<5} {}", tool.name, marker, summary)
    }
}

pub fn first_sentence(text: &str) -> &str {
    let text = text.trim();
    match text.find(". ") {
        Some(i) => &text[..=i],
        None => text,
    }
}
