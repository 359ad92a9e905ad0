//! Reusable TUI widgets.

use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};

/// Bottom status bar.
pub(crate) fn status_bar(msg: &str) -> Paragraph<'_> {
    Paragraph::new(format!(" {msg}")).style(Style::default().bg(Color::DarkGray).fg(Color::White))
}

/// One-line message colored by outcome.
pub(crate) fn message_line(msg: &str, ok: bool) -> Paragraph<'_> {
    let color = if ok { Color::Green } else { Color::Red };
    Paragraph::new(msg).style(Style::default().fg(color))
}

/// Single-line text input rendered inside a titled box.
pub(crate) struct TextField {
    title: &'static str,
    value: String,
    masked: bool,
}

impl TextField {
    pub(crate) fn new(title: &'static str) -> Self {
        Self {
            title,
            value: String::new(),
            masked: false,
        }
    }

    /// A field whose contents are drawn as `*`.
    pub(crate) fn masked(title: &'static str) -> Self {
        Self {
            masked: true,
            ..Self::new(title)
        }
    }

    pub(crate) fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }

    pub(crate) fn value(&self) -> &str {
        &self.value
    }

    pub(crate) fn push(&mut self, c: char) {
        self.value.push(c);
    }

    pub(crate) fn pop(&mut self) {
        self.value.pop();
    }

    pub(crate) fn clear(&mut self) {
        self.value.clear();
    }

    pub(crate) fn render(&self, f: &mut Frame, area: Rect, focused: bool, editing: bool) {
        let border = match (focused, editing) {
            (true, true) => Style::default().fg(Color::Yellow),
            (true, false) => Style::default().fg(Color::Cyan),
            _ => Style::default(),
        };
        let shown = if self.masked {
            "*".repeat(self.value.chars().count())
        } else {
            self.value.clone()
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .title(format!(" {} ", self.title))
            .border_style(border);
        f.render_widget(Paragraph::new(shown).block(block), area);
    }
}
