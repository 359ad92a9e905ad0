//! Login / sign-up screen shown until the session is authenticated.

use crossterm::event::{KeyCode, KeyModifiers};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};

use super::Action;
use crate::widgets::{TextField, message_line};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Login,
    Signup,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Mode,
    Identity,
    Secret,
}

pub(crate) struct LoginScreen {
    mode: Mode,
    identity: TextField,
    secret: TextField,
    focused: Field,
    editing: bool,
    /// Last outcome and whether it was a success.
    message: Option<(String, bool)>,
}

impl LoginScreen {
    pub(crate) fn new() -> Self {
        Self {
            mode: Mode::Login,
            identity: TextField::new("Email"),
            secret: TextField::masked("Password"),
            focused: Field::Identity,
            editing: false,
            message: None,
        }
    }

    pub(crate) fn is_editing(&self) -> bool {
        self.editing
    }

    pub(crate) fn report_error(&mut self, msg: impl Into<String>) {
        self.message = Some((msg.into(), false));
    }

    /// Account created: switch back to login with the identity kept.
    pub(crate) fn signup_succeeded(&mut self) {
        self.mode = Mode::Login;
        self.secret.clear();
        self.focused = Field::Secret;
        self.editing = false;
        self.message = Some((
            "Account created successfully! You can now log in.".to_string(),
            true,
        ));
    }

    /// Forget everything typed, e.g. after logging out.
    pub(crate) fn reset(&mut self, msg: &str) {
        *self = Self::new();
        self.message = Some((msg.to_string(), true));
    }

    pub(crate) fn draw(&self, f: &mut Frame, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .margin(1)
            .constraints([
                Constraint::Length(3), // Mode
                Constraint::Length(3), // Email
                Constraint::Length(3), // Password
                Constraint::Length(2), // Hint
                Constraint::Length(1), // Message
                Constraint::Min(0),
            ])
            .split(area);

        let mode_style = if self.focused == Field::Mode {
            Style::default().fg(Color::Cyan)
        } else {
            Style::default()
        };
        let (login, signup) = match self.mode {
            Mode::Login => ("[Login]", " Sign Up "),
            Mode::Signup => (" Login ", "[Sign Up]"),
        };
        let mode = Paragraph::new(format!("{login}   {signup}   (Enter to switch)")).block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Select Action ")
                .border_style(mode_style),
        );
        f.render_widget(mode, chunks[0]);

        self.identity.render(
            f,
            chunks[1],
            self.focused == Field::Identity,
            self.editing,
        );
        self.secret
            .render(f, chunks[2], self.focused == Field::Secret, self.editing);

        let verb = match self.mode {
            Mode::Login => "log in",
            Mode::Signup => "sign up",
        };
        let hint = if self.editing {
            format!("Type to edit · Esc to stop editing · Enter to {verb}")
        } else {
            format!("↑/↓ to move · Enter to edit · s to {verb} · q to quit")
        };
        f.render_widget(
            Paragraph::new(hint)
                .style(Style::default().fg(Color::DarkGray))
                .alignment(Alignment::Center),
            chunks[3],
        );

        if let Some((msg, ok)) = &self.message {
            f.render_widget(message_line(msg, *ok).alignment(Alignment::Center), chunks[4]);
        }
    }

    pub(crate) fn handle_key(&mut self, code: KeyCode, _modifiers: KeyModifiers) -> Option<Action> {
        if self.editing {
            match code {
                KeyCode::Esc => self.editing = false,
                KeyCode::Enter => {
                    self.editing = false;
                    return Some(self.submit());
                }
                KeyCode::Tab => self.next_field(),
                KeyCode::Backspace => {
                    if let Some(field) = self.current_field_mut() {
                        field.pop();
                    }
                }
                KeyCode::Char(c) => {
                    if let Some(field) = self.current_field_mut() {
                        field.push(c);
                    }
                }
                _ => {}
            }
            return None;
        }

        match code {
            KeyCode::Enter if self.focused == Field::Mode => self.toggle_mode(),
            KeyCode::Left | KeyCode::Right if self.focused == Field::Mode => self.toggle_mode(),
            KeyCode::Enter => self.editing = true,
            KeyCode::Char('s') => return Some(self.submit()),
            KeyCode::Up => self.prev_field(),
            KeyCode::Down => self.next_field(),
            _ => {}
        }
        None
    }

    fn submit(&mut self) -> Action {
        self.message = None;
        let identity = self.identity.value().to_string();
        let secret = self.secret.value().to_string();
        match self.mode {
            Mode::Login => Action::Login { identity, secret },
            Mode::Signup => Action::Signup { identity, secret },
        }
    }

    fn toggle_mode(&mut self) {
        self.mode = match self.mode {
            Mode::Login => Mode::Signup,
            Mode::Signup => Mode::Login,
        };
        self.message = None;
    }

    fn current_field_mut(&mut self) -> Option<&mut TextField> {
        match self.focused {
            Field::Mode => None,
            Field::Identity => Some(&mut self.identity),
            Field::Secret => Some(&mut self.secret),
        }
    }

    fn next_field(&mut self) {
        self.focused = match self.focused {
            Field::Mode => Field::Identity,
            Field::Identity => Field::Secret,
            Field::Secret => Field::Mode,
        };
        if self.focused == Field::Mode {
            self.editing = false;
        }
    }

    fn prev_field(&mut self) {
        self.focused = match self.focused {
            Field::Mode => Field::Secret,
            Field::Identity => Field::Mode,
            Field::Secret => Field::Identity,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn type_text(screen: &mut LoginScreen, text: &str) {
        for c in text.chars() {
            screen.handle_key(KeyCode::Char(c), KeyModifiers::NONE);
        }
    }

    #[test]
    fn enter_while_editing_submits_login() {
        let mut screen = LoginScreen::new();
        screen.handle_key(KeyCode::Enter, KeyModifiers::NONE);
        type_text(&mut screen, "a@x.com");
        screen.handle_key(KeyCode::Tab, KeyModifiers::NONE);
        type_text(&mut screen, "pw");

        let action = screen.handle_key(KeyCode::Enter, KeyModifiers::NONE);
        assert_eq!(
            action,
            Some(Action::Login {
                identity: "a@x.com".into(),
                secret: "pw".into(),
            })
        );
        assert!(!screen.is_editing());
    }

    #[test]
    fn mode_toggle_switches_to_signup() {
        let mut screen = LoginScreen::new();
        screen.handle_key(KeyCode::Up, KeyModifiers::NONE);
        screen.handle_key(KeyCode::Enter, KeyModifiers::NONE);

        let action = screen.handle_key(KeyCode::Char('s'), KeyModifiers::NONE);
        assert!(matches!(action, Some(Action::Signup { .. })));
    }

    #[test]
    fn signup_success_returns_to_login_without_secret() {
        let mut screen = LoginScreen::new();
        screen.handle_key(KeyCode::Enter, KeyModifiers::NONE);
        type_text(&mut screen, "a@x.com");
        screen.signup_succeeded();

        let action = screen.handle_key(KeyCode::Char('s'), KeyModifiers::NONE);
        assert_eq!(
            action,
            Some(Action::Login {
                identity: "a@x.com".into(),
                secret: String::new(),
            })
        );
    }
}
