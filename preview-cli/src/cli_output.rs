// ABOUTME: Centralized CLI output utilities for consistent user-facing messages
// ABOUTME: Errors, warnings and notices go to stderr so stdout carries only scan results

use owo_colors::OwoColorize;
use std::io::IsTerminal;

pub struct CliOutput {
    use_color: bool,
}

impl CliOutput {
    /// Create new CLI output utility with TTY detection
    pub fn new() -> Self {
        Self {
            use_color: std::io::stderr().is_terminal(),
        }
    }

    pub fn with_color(use_color: bool) -> Self {
        Self { use_color }
    }

    pub fn error(&self, message: &str) {
        eprintln!("{}", self.label("error:", message, Tone::Error));
    }

    pub fn warning(&self, message: &str) {
        eprintln!("{}", self.label("warning:", message, Tone::Warning));
    }

    pub fn info(&self, message: &str) {
        eprintln!("{}", self.label("info:", message, Tone::Info));
    }

    /// Marker changes in watch mode, e.g. `+ line 3: /tmp/...`
    pub fn status(&self, icon: &str, message: &str) {
        if self.use_color {
            let icon = match icon {
                "+" => icon.green().to_string(),
                "-" => icon.red().to_string(),
                _ => icon.dimmed().to_string(),
            };
            eprintln!("{} {}", icon, message);
        } else {
            eprintln!("{} {}", icon, message);
        }
    }

    fn label(&self, prefix: &str, message: &str, tone: Tone) -> String {
        if !self.use_color {
            return format!("{} {}", prefix, message);
        }
        let prefix = match tone {
            Tone::Error => prefix.red().bold().to_string(),
            Tone::Warning => prefix.yellow().bold().to_string(),
            Tone::Info => prefix.blue().bold().to_string(),
        };
        format!("{} {}", prefix, message)
    }
}

enum Tone {
    Error,
    Warning,
    Info,
}

impl Default for CliOutput {
    fn default() -> Self {
        Self::new()
    }
}
