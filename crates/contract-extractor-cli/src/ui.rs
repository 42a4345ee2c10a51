//! Terminal output primitives.

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Color palette
pub mod colors {
    use console::Color;

    pub const CYAN: Color = Color::Color256(51);
    pub const MAGENTA: Color = Color::Color256(201);
    pub const AMBER: Color = Color::Color256(214);
    pub const VIOLET: Color = Color::Color256(135);
    pub const NEON_GREEN: Color = Color::Color256(82);
    pub const DIM: Color = Color::Color256(240);
}

pub mod symbols {
    pub const DIAMOND: &str = "\u{25C6}";          // ◆
    pub const DIAMOND_OUTLINE: &str = "\u{25C7}";  // ◇
    pub const TARGET_FILLED: &str = "\u{25C9}";    // ◉
    pub const TARGET_EMPTY: &str = "\u{25CE}";     // ◎
    pub const TRIANGLE: &str = "\u{25B8}";         // ▸
    pub const PROGRESS_FILLED: &str = "\u{25B0}";  // ▰
    pub const PROGRESS_EMPTY: &str = "\u{25B1}";   // ▱
    pub const DOT: &str = "\u{00B7}";              // ·
}

/// Print a success message
pub fn success(msg: &str) {
    println!(
        "  {} {}",
        style(symbols::TARGET_FILLED).fg(colors::NEON_GREEN),
        msg
    );
}

/// Print a non-fatal warning
pub fn warning(msg: &str) {
    println!(
        "  {} {}",
        style(symbols::DIAMOND_OUTLINE).fg(colors::AMBER),
        style(msg).fg(colors::AMBER)
    );
}

/// Print an error message
pub fn error(msg: &str) {
    println!(
        "  {} {}",
        style(symbols::DIAMOND).fg(colors::MAGENTA),
        style(msg).fg(colors::MAGENTA)
    );
}

/// Print an info message
pub fn info(msg: &str) {
    println!(
        "  {} {}",
        style(symbols::DIAMOND_OUTLINE).fg(colors::CYAN),
        msg
    );
}

/// Print a dim/secondary message
pub fn dim(msg: &str) {
    println!("  {}", style(msg).fg(colors::DIM));
}

/// Create a spinner. Hidden automatically when stderr is not a terminal.
pub fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    let style = ProgressStyle::default_spinner()
        .tick_chars("\u{25CE}\u{25C9}\u{25CE}\u{25C9}") // ◎◉◎◉
        .template("  {spinner:.cyan} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    pb.set_style(style);
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(150));
    pb
}

/// Print a box header
pub fn box_header(title: &str) {
    let width = 55;
    let title_padded = format!(" {} ", title);
    let title_len = title_padded.chars().count();
    let dashes = width - title_len - 4;

    println!(
        "  {}{}{}{}",
        style("\u{256D}\u{2500}").fg(colors::CYAN), // ╭─
        style(title_padded).fg(colors::CYAN).bold(),
        style("\u{2500}".repeat(dashes)).fg(colors::CYAN),
        style("\u{256E}").fg(colors::CYAN) // ╮
    );
}

/// Print a box line
pub fn box_line(content: &str) {
    let width: usize = 53;
    let content_len = console::measure_text_width(content);
    let padding = width.saturating_sub(content_len);
    println!(
        "  {} {}{}{}",
        style("\u{2502}").fg(colors::CYAN), // │
        content,
        " ".repeat(padding),
        style("\u{2502}").fg(colors::CYAN)
    );
}

/// Print a box footer
pub fn box_footer() {
    let width = 55;
    println!(
        "  {}{}{}",
        style("\u{2570}").fg(colors::CYAN), // ╰
        style("\u{2500}".repeat(width - 2)).fg(colors::CYAN),
        style("\u{256F}").fg(colors::CYAN) // ╯
    );
}

/// Print file tree item
pub fn tree_item(prefix: &str, name: &str, description: Option<&str>, is_last: bool) {
    let connector = if is_last {
        "\u{2570}\u{2500}\u{2500}" // ╰──
    } else {
        "\u{251C}\u{2500}\u{2500}" // ├──
    };

    if let Some(desc) = description {
        println!(
            "  {}{}  {}   {}",
            style(prefix).fg(colors::DIM),
            style(connector).fg(colors::DIM),
            style(name).fg(colors::CYAN),
            style(desc).dim()
        );
    } else {
        println!(
            "  {}{}  {}",
            style(prefix).fg(colors::DIM),
            style(connector).fg(colors::DIM),
            style(name).fg(colors::CYAN)
        );
    }
}

/// Print directory in tree
pub fn tree_dir(prefix: &str, name: &str) {
    println!(
        "  {}{} {}",
        style(prefix).fg(colors::DIM),
        style(symbols::TRIANGLE).fg(colors::CYAN),
        style(name).fg(colors::CYAN).bold()
    );
}

/// Print one graph node
pub fn node_line(marker: &str, path: &str) {
    println!("  {} {}", style(marker).fg(colors::VIOLET), style(path).bold());
}

/// Eight-cell bar showing how much of `total` is `part`.
fn share_bar(part: usize, total: usize) -> String {
    let filled = ((part * 8) / total.max(1)).min(8);
    format!(
        "{}{}",
        symbols::PROGRESS_FILLED.repeat(filled),
        symbols::PROGRESS_EMPTY.repeat(8 - filled)
    )
}

/// Print context summary line inside a box
pub fn context_line(
    name: &str,
    events: usize,
    commands: usize,
    queries: usize,
    files: usize,
    rewrites: usize,
) {
    let messages = events + commands + queries;
    let plain = format!(
        "{} {:12} {:>2}e {:>2}c {:>2}q  {:>3} files {:>3} rw ",
        symbols::TRIANGLE,
        name,
        events,
        commands,
        queries,
        files,
        rewrites
    );
    let line = format!("{}{}", plain, style(share_bar(messages, files)).fg(colors::VIOLET));
    box_line(&line);
}

/// Print timing information
pub fn timing(label: &str, duration_ms: u128) {
    println!(
        "  {} {} in {}ms",
        style(symbols::DIAMOND_OUTLINE).fg(colors::CYAN),
        label,
        duration_ms
    );
}

/// Print "Hold up" error header
pub fn error_header() {
    println!();
    println!(
        "  {} {}",
        style(symbols::DIAMOND).fg(colors::MAGENTA).bold(),
        style("Hold up.").fg(colors::MAGENTA).bold()
    );
    println!();
}

/// Print "Nope" error header (for check failures)
pub fn nope_header() {
    println!();
    println!(
        "  {} {}",
        style(symbols::DIAMOND).fg(colors::MAGENTA).bold(),
        style("Nope.").fg(colors::MAGENTA).bold()
    );
    println!();
}

/// Print "Looking good" success for check
pub fn looking_good() {
    println!(
        "  {} {}",
        style(symbols::TARGET_FILLED).fg(colors::NEON_GREEN),
        style("Looking good.").bold()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_share_bar() {
        assert_eq!(share_bar(0, 4), "\u{25B1}".repeat(8));
        assert_eq!(share_bar(4, 4), "\u{25B0}".repeat(8));
        assert_eq!(share_bar(2, 4), format!("{}{}", "\u{25B0}".repeat(4), "\u{25B1}".repeat(4)));
        // more messages than files caps at full
        assert_eq!(share_bar(9, 1), "\u{25B0}".repeat(8));
    }

    #[test]
    fn test_share_bar_empty_total() {
        assert_eq!(share_bar(0, 0), "\u{25B1}".repeat(8));
    }
}
