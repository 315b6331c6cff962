//! Terminal styling for rendered lines.

use std::io::IsTerminal;

use colored::{Color, Colorize};

use crate::observability::level::Severity;

/// A markup style in a brace template, or the per-level color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    /// Color of the record's severity.
    Level,
    Color(Color),
    Bold,
    Dim,
    Italic,
    Underline,
}

impl Style {
    /// Parse a markup tag name such as `green`, `level` or `bold`.
    pub fn from_tag(tag: &str) -> Option<Self> {
        let style = match tag {
            "level" => Style::Level,
            "bold" | "b" => Style::Bold,
            "dim" | "d" => Style::Dim,
            "italic" | "i" => Style::Italic,
            "underline" | "u" => Style::Underline,
            "black" | "k" => Style::Color(Color::Black),
            "red" | "r" => Style::Color(Color::Red),
            "green" | "g" => Style::Color(Color::Green),
            "yellow" | "y" => Style::Color(Color::Yellow),
            "blue" | "e" => Style::Color(Color::Blue),
            "magenta" | "m" => Style::Color(Color::Magenta),
            "cyan" | "c" => Style::Color(Color::Cyan),
            "white" | "w" => Style::Color(Color::White),
            "light-black" => Style::Color(Color::BrightBlack),
            "light-red" => Style::Color(Color::BrightRed),
            "light-green" => Style::Color(Color::BrightGreen),
            "light-yellow" => Style::Color(Color::BrightYellow),
            "light-blue" => Style::Color(Color::BrightBlue),
            "light-magenta" => Style::Color(Color::BrightMagenta),
            "light-cyan" => Style::Color(Color::BrightCyan),
            "light-white" => Style::Color(Color::BrightWhite),
            _ => return None,
        };
        Some(style)
    }

    /// Apply the style to `text` for a record of `severity`.
    pub fn apply(self, text: &str, severity: Severity) -> String {
        match self {
            Style::Level => colorize_level(text, severity),
            Style::Color(color) => text.color(color).to_string(),
            Style::Bold => text.bold().to_string(),
            Style::Dim => text.dimmed().to_string(),
            Style::Italic => text.italic().to_string(),
            Style::Underline => text.underline().to_string(),
        }
    }
}

/// Terminal color for a severity.
pub fn level_color(severity: Severity) -> Color {
    match severity {
        Severity::Trace => Color::Blue,
        Severity::Debug => Color::Cyan,
        Severity::Info => Color::Green,
        Severity::Warning => Color::Yellow,
        Severity::Error => Color::Red,
        Severity::Critical => Color::BrightRed,
    }
}

pub fn colorize_level(text: &str, severity: Severity) -> String {
    text.color(level_color(severity)).to_string()
}

/// Whether stdout is attached to a terminal. Checked once per formatter.
pub fn stdout_is_terminal() -> bool {
    std::io::stdout().is_terminal()
}

/// Whether stderr is attached to a terminal. Checked once per formatter.
pub fn stderr_is_terminal() -> bool {
    std::io::stderr().is_terminal()
}
