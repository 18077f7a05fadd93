//! Terminal rendering for the watch screens.

use std::io::Write;

use iw_weather::ConditionCategory;

use crate::screens::Display;

/// Writes each frame to a terminal-like sink, one block per redraw.
pub struct ConsoleDisplay<W> {
    out: W,
}

impl ConsoleDisplay<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write> ConsoleDisplay<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_line(&mut self, line: &str) {
        if let Err(e) = writeln!(self.out, "{line}") {
            tracing::warn!("Failed to write to display: {}", e);
        }
    }
}

impl<W: Write> Display for ConsoleDisplay<W> {
    fn show_text(&mut self, text: &str) {
        self.write_line(text);
    }

    fn show_icon(&mut self, category: ConditionCategory) {
        self.write_line(&format!("[{}]", category.icon_name()));
    }

    fn clear(&mut self) {
        self.write_line("----");
    }
}
