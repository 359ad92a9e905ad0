//! "News" screen: query input and the list of related articles.

use crossterm::event::{KeyCode, KeyModifiers};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, Paragraph};

use searchagent_shared::NewsItem;

use super::Action;
use crate::widgets::{TextField, message_line};

pub(crate) struct NewsScreen {
    query: TextField,
    editing: bool,
    items: Vec<NewsItem>,
    selected: usize,
    message: Option<(String, bool)>,
}

impl NewsScreen {
    pub(crate) fn new() -> Self {
        Self {
            query: TextField::new("Search for news"),
            editing: false,
            items: Vec::new(),
            selected: 0,
            message: None,
        }
    }

    pub(crate) fn is_editing(&self) -> bool {
        self.editing
    }

    pub(crate) fn show_items(&mut self, items: Vec<NewsItem>) {
        self.message = Some((format!("{} articles.", items.len()), true));
        self.items = items;
        self.selected = 0;
    }

    /// Provider errors replace the previous list.
    pub(crate) fn report_error(&mut self, msg: impl Into<String>) {
        self.items.clear();
        self.selected = 0;
        self.message = Some((msg.into(), false));
    }

    pub(crate) fn draw(&self, f: &mut Frame, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .margin(1)
            .constraints([
                Constraint::Length(3), // Query
                Constraint::Length(1), // Hint
                Constraint::Length(1), // Message
                Constraint::Min(1),    // Articles
            ])
            .split(area);

        self.query.render(f, chunks[0], true, self.editing);

        let hint = if self.editing {
            "Type to edit · Enter to search · Esc to stop editing"
        } else {
            "Enter to edit · r to search again · ↑/↓ to browse"
        };
        f.render_widget(
            Paragraph::new(hint)
                .style(Style::default().fg(Color::DarkGray))
                .alignment(Alignment::Center),
            chunks[1],
        );

        if let Some((msg, ok)) = &self.message {
            f.render_widget(message_line(msg, *ok), chunks[2]);
        }

        let items: Vec<ListItem> = self
            .items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                let selected = i == self.selected;
                let prefix = if selected { "▸ " } else { "  " };
                let title_style = if selected {
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
                } else {
                    Style::default().add_modifier(Modifier::BOLD)
                };
                let mut lines = vec![Line::from(format!("{prefix}{}. {}", i + 1, item.title))
                    .style(title_style)];
                if !item.description.is_empty() {
                    lines.push(Line::from(format!("     {}", item.description)));
                }
                lines.push(
                    Line::from(format!("     {}", item.url))
                        .style(Style::default().fg(Color::DarkGray)),
                );
                ListItem::new(lines)
            })
            .collect();

        let list = List::new(items).block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" Related News ({}) ", self.items.len())),
        );
        f.render_widget(list, chunks[3]);
    }

    pub(crate) fn handle_key(&mut self, code: KeyCode, _modifiers: KeyModifiers) -> Option<Action> {
        if self.editing {
            match code {
                KeyCode::Esc => self.editing = false,
                KeyCode::Enter => {
                    self.editing = false;
                    return self.fetch();
                }
                KeyCode::Backspace => self.query.pop(),
                KeyCode::Char(c) => self.query.push(c),
                _ => {}
            }
            return None;
        }

        match code {
            KeyCode::Enter => self.editing = true,
            KeyCode::Char('r') => return self.fetch(),
            KeyCode::Up | KeyCode::Char('k') => self.selected = self.selected.saturating_sub(1),
            KeyCode::Down | KeyCode::Char('j') => {
                if self.selected + 1 < self.items.len() {
                    self.selected += 1;
                }
            }
            _ => {}
        }
        None
    }

    fn fetch(&mut self) -> Option<Action> {
        let query = self.query.value().trim();
        if query.is_empty() {
            self.message = Some(("Enter a query first.".to_string(), false));
            return None;
        }
        Some(Action::FetchNews {
            query: query.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(title: &str) -> NewsItem {
        NewsItem {
            title: title.into(),
            description: String::new(),
            url: format!("https://news.example/{title}"),
        }
    }

    #[test]
    fn enter_after_typing_requests_news() {
        let mut screen = NewsScreen::new();
        screen.handle_key(KeyCode::Enter, KeyModifiers::NONE);
        for c in "acme".chars() {
            screen.handle_key(KeyCode::Char(c), KeyModifiers::NONE);
        }
        let action = screen.handle_key(KeyCode::Enter, KeyModifiers::NONE);
        assert_eq!(
            action,
            Some(Action::FetchNews {
                query: "acme".into()
            })
        );
    }

    #[test]
    fn blank_query_is_not_sent() {
        let mut screen = NewsScreen::new();
        assert_eq!(screen.handle_key(KeyCode::Char('r'), KeyModifiers::NONE), None);
    }

    #[test]
    fn selection_stays_in_bounds() {
        let mut screen = NewsScreen::new();
        screen.show_items(vec![item("a"), item("b")]);
        for _ in 0..5 {
            screen.handle_key(KeyCode::Down, KeyModifiers::NONE);
        }
        assert_eq!(screen.selected, 1);
        screen.report_error("Error fetching news: 500");
        assert!(screen.items.is_empty());
        assert_eq!(screen.selected, 0);
    }
}
