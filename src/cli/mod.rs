//! Terminal commands that drive the engine without an MCP client.

pub mod add;
pub mod classify;
pub mod doctor;
pub mod search;

/// Shorten `text` to `max` characters for display, marking the cut with `...`.
fn preview(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let cut: String = text.chars().take(max).collect();
        format!("{cut}...")
    } else {
        text.to_string()
    }
}
