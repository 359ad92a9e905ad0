//! "Enrich" screen: pick a table, column and query, then run the pipeline.

use std::path::PathBuf;

use crossterm::event::{KeyCode, KeyModifiers};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Cell, Paragraph, Row, Table};

use searchagent_shared::{RESULT_COLUMNS, ResultTable};

use super::{Action, EnrichRequest};
use crate::widgets::{TextField, message_line};

const INPUT: usize = 0;
const COLUMN: usize = 1;
const QUERY: usize = 2;
const SHEET_ID: usize = 3;
const RANGE: usize = 4;

/// What the lower pane shows.
enum Grid {
    Empty,
    Preview {
        headers: Vec<String>,
        rows: Vec<Vec<String>>,
    },
    Results(ResultTable),
}

pub(crate) struct EnrichScreen {
    fields: [TextField; 5],
    focused: usize,
    editing: bool,
    grid: Grid,
    /// One line per sink outcome, with success flag.
    sink_lines: Vec<(String, bool)>,
    message: Option<(String, bool)>,
}

impl EnrichScreen {
    pub(crate) fn new() -> Self {
        Self {
            fields: [
                TextField::new("Input CSV path"),
                TextField::new("Entity column"),
                TextField::new("Query"),
                TextField::new("Sheet ID (optional)"),
                TextField::new("Sheet range, e.g. Sheet1!A1:D10 (optional)"),
            ],
            focused: INPUT,
            editing: false,
            grid: Grid::Empty,
            sink_lines: Vec::new(),
            message: None,
        }
    }

    pub(crate) fn is_editing(&self) -> bool {
        self.editing
    }

    pub(crate) fn show_preview(&mut self, headers: Vec<String>, rows: Vec<Vec<String>>) {
        self.message = Some((format!("Previewing {} rows.", rows.len()), true));
        self.grid = Grid::Preview { headers, rows };
        self.sink_lines.clear();
    }

    pub(crate) fn show_results(&mut self, results: ResultTable, sink_lines: Vec<(String, bool)>) {
        self.message = Some((format!("Enriched {} rows.", results.len()), true));
        self.grid = Grid::Results(results);
        self.sink_lines = sink_lines;
    }

    pub(crate) fn report_error(&mut self, msg: impl Into<String>) {
        self.message = Some((msg.into(), false));
    }

    pub(crate) fn draw(&self, f: &mut Frame, area: Rect) {
        let sink_height = self.sink_lines.len() as u16;
        let mut constraints = vec![Constraint::Length(3); self.fields.len()];
        constraints.extend([
            Constraint::Length(1),           // Hint
            Constraint::Length(1),           // Message
            Constraint::Length(sink_height), // Sink outcomes
            Constraint::Min(3),              // Grid
        ]);
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .margin(1)
            .constraints(constraints)
            .split(area);

        for (i, field) in self.fields.iter().enumerate() {
            field.render(f, chunks[i], i == self.focused, self.editing);
        }
        let base = self.fields.len();

        let hint = if self.editing {
            "Type to edit · Esc/Enter to stop editing · Tab to next field"
        } else {
            "↑/↓ to move · Enter to edit · p to preview · r to run"
        };
        f.render_widget(
            Paragraph::new(hint)
                .style(Style::default().fg(Color::DarkGray))
                .alignment(Alignment::Center),
            chunks[base],
        );

        if let Some((msg, ok)) = &self.message {
            f.render_widget(message_line(msg, *ok), chunks[base + 1]);
        }

        let lines: Vec<Line> = self
            .sink_lines
            .iter()
            .map(|(line, ok)| {
                let color = if *ok { Color::Green } else { Color::Red };
                Line::from(line.as_str()).style(Style::default().fg(color))
            })
            .collect();
        f.render_widget(Paragraph::new(lines), chunks[base + 2]);

        self.draw_grid(f, chunks[base + 3]);
    }

    fn draw_grid(&self, f: &mut Frame, area: Rect) {
        let (title, headers, rows): (String, Vec<&str>, Vec<Vec<&str>>) = match &self.grid {
            Grid::Empty => {
                let empty = Paragraph::new("Press 'p' to preview the input or 'r' to run.")
                    .alignment(Alignment::Center)
                    .block(Block::default().borders(Borders::ALL).title(" Results "));
                f.render_widget(empty, area);
                return;
            }
            Grid::Preview { headers, rows } => (
                " Input preview ".to_string(),
                headers.iter().map(String::as_str).collect(),
                rows.iter()
                    .map(|r| r.iter().map(String::as_str).collect())
                    .collect(),
            ),
            Grid::Results(table) => (
                format!(" Results ({}) ", table.len()),
                RESULT_COLUMNS.to_vec(),
                table.iter().map(|r| r.cells().to_vec()).collect(),
            ),
        };

        let bold = Style::default().add_modifier(Modifier::BOLD);
        let header = Row::new(headers.iter().map(|h| Cell::from(*h))).style(bold);
        let body = rows
            .into_iter()
            .map(|r| Row::new(r.into_iter().map(Cell::from)));
        let columns = headers.len().max(1) as u32;
        let widths = vec![Constraint::Ratio(1, columns); columns as usize];

        let table = Table::new(body, widths)
            .header(header)
            .block(Block::default().borders(Borders::ALL).title(title));
        f.render_widget(table, area);
    }

    pub(crate) fn handle_key(&mut self, code: KeyCode, _modifiers: KeyModifiers) -> Option<Action> {
        if self.editing {
            match code {
                KeyCode::Esc | KeyCode::Enter => self.editing = false,
                KeyCode::Tab => self.focused = (self.focused + 1) % self.fields.len(),
                KeyCode::Backspace => self.fields[self.focused].pop(),
                KeyCode::Char(c) => self.fields[self.focused].push(c),
                _ => {}
            }
            return None;
        }

        match code {
            KeyCode::Enter => self.editing = true,
            KeyCode::Up => {
                self.focused = (self.focused + self.fields.len() - 1) % self.fields.len();
            }
            KeyCode::Down => self.focused = (self.focused + 1) % self.fields.len(),
            KeyCode::Char('p') => {
                let input = self.fields[INPUT].value().trim();
                if input.is_empty() {
                    self.report_error("Enter an input CSV path first.");
                    return None;
                }
                return Some(Action::Preview {
                    input: PathBuf::from(input),
                });
            }
            KeyCode::Char('r') => return self.request().map(Action::Enrich),
            _ => {}
        }
        None
    }

    fn request(&mut self) -> Option<EnrichRequest> {
        let value = |i: usize| self.fields[i].value().trim().to_string();
        let request = EnrichRequest {
            input: PathBuf::from(value(INPUT)),
            column: value(COLUMN),
            query: value(QUERY),
            sheet_id: value(SHEET_ID),
            range: value(RANGE),
        };

        if request.input.as_os_str().is_empty()
            || request.column.is_empty()
            || request.query.is_empty()
        {
            self.report_error("Input path, entity column and query are required.");
            return None;
        }
        Some(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use searchagent_shared::LookupResult;

    fn fill(screen: &mut EnrichScreen, values: &[&str]) {
        screen.handle_key(KeyCode::Enter, KeyModifiers::NONE);
        for (i, value) in values.iter().enumerate() {
            if i > 0 {
                screen.handle_key(KeyCode::Tab, KeyModifiers::NONE);
            }
            for c in value.chars() {
                screen.handle_key(KeyCode::Char(c), KeyModifiers::NONE);
            }
        }
        screen.handle_key(KeyCode::Esc, KeyModifiers::NONE);
    }

    #[test]
    fn run_requires_the_three_main_fields() {
        let mut screen = EnrichScreen::new();
        fill(&mut screen, &["entities.csv", "Company"]);

        assert_eq!(screen.handle_key(KeyCode::Char('r'), KeyModifiers::NONE), None);
        assert!(matches!(screen.message, Some((_, false))));
    }

    #[test]
    fn run_builds_request_with_trimmed_values() {
        let mut screen = EnrichScreen::new();
        fill(
            &mut screen,
            &["entities.csv ", "Company", "headquarters", " sheet-1", "Sheet1!A1"],
        );

        let action = screen.handle_key(KeyCode::Char('r'), KeyModifiers::NONE);
        assert_eq!(
            action,
            Some(Action::Enrich(EnrichRequest {
                input: PathBuf::from("entities.csv"),
                column: "Company".into(),
                query: "headquarters".into(),
                sheet_id: "sheet-1".into(),
                range: "Sheet1!A1".into(),
            }))
        );
    }

    #[test]
    fn keys_are_text_while_editing() {
        let mut screen = EnrichScreen::new();
        fill(&mut screen, &["rp"]);
        assert_eq!(screen.fields[INPUT].value(), "rp");
    }

    #[test]
    fn results_replace_preview() {
        let mut screen = EnrichScreen::new();
        screen.show_preview(vec!["Company".into()], vec![vec!["Acme".into()]]);
        let table: ResultTable = std::iter::once(LookupResult {
            entity: "Acme".into(),
            query: "hq".into(),
            result: "http://a".into(),
            summary: "In X".into(),
        })
        .collect();
        screen.show_results(table, vec![("Documents: wrote 1 rows".into(), true)]);

        assert!(matches!(screen.grid, Grid::Results(ref t) if t.len() == 1));
        assert_eq!(screen.sink_lines.len(), 1);
    }
}
