//! Core TUI application state and event loop.
//!
//! Network work runs on a current-thread runtime via `block_on`, so the UI
//! is frozen while a lookup run or a news fetch is in flight.

use std::io;
use std::time::Duration;

use color_eyre::eyre::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Tabs};
use tokio::runtime::Runtime;
use tracing::{info, warn};

use searchagent_core::SessionGate;
use searchagent_google::{BearerToken, CredentialHolder};
use searchagent_shared::AppConfig;

use crate::screens::{Action, EnrichScreen, LoginScreen, NewsScreen, ScreenId};
use crate::tasks;
use crate::widgets::status_bar;

/// Application state.
pub(crate) struct App {
    config: AppConfig,
    runtime: Runtime,
    gate: SessionGate,
    /// Obtained on the first run that needs it, dropped on logout.
    token: Option<BearerToken>,
    /// Identity that passed the gate; `None` shows the login screen.
    identity: Option<String>,
    pub active_tab: usize,
    pub screens: Vec<ScreenId>,
    pub should_quit: bool,
    pub status: String,
    pub show_help: bool,
    login: LoginScreen,
    enrich: EnrichScreen,
    news: NewsScreen,
}

impl App {
    pub(crate) fn new(config: AppConfig, runtime: Runtime) -> Self {
        Self {
            config,
            runtime,
            gate: SessionGate::seeded(),
            token: None,
            identity: None,
            active_tab: 0,
            screens: vec![ScreenId::Enrich, ScreenId::News],
            should_quit: false,
            status: "Log in or sign up to continue. Press ? for help.".to_string(),
            show_help: false,
            login: LoginScreen::new(),
            enrich: EnrichScreen::new(),
            news: NewsScreen::new(),
        }
    }

    fn logged_in(&self) -> bool {
        self.identity.is_some()
    }

    fn is_editing(&self) -> bool {
        if !self.logged_in() {
            return self.login.is_editing();
        }
        match self.screens[self.active_tab] {
            ScreenId::Enrich => self.enrich.is_editing(),
            ScreenId::News => self.news.is_editing(),
        }
    }

    /// Carry out a screen's request. Blocks until it completes.
    fn perform(&mut self, action: Action) {
        match action {
            Action::Login { identity, secret } => {
                if let Err(e) = self.gate.login(&identity, &secret) {
                    self.login.report_error(e.to_string());
                    self.status = "Login failed.".to_string();
                    return;
                }
                self.enter_session();
            }
            Action::Signup { identity, secret } => match self.gate.signup(&identity, &secret) {
                Ok(()) => {
                    self.login.signup_succeeded();
                    self.status = "Account created.".to_string();
                }
                Err(e) => {
                    self.login.report_error(e.to_string());
                    self.status = "Sign up failed.".to_string();
                }
            },
            Action::Preview { input } => match tasks::preview(&input) {
                Ok((headers, rows)) => {
                    self.enrich.show_preview(headers, rows);
                    self.status = format!("Loaded {}", input.display());
                }
                Err(e) => {
                    self.enrich.report_error(e.to_string());
                    self.status = "Preview failed.".to_string();
                }
            },
            Action::Enrich(request) => {
                let token = match self.bearer_token() {
                    Ok(token) => token,
                    Err(e) => {
                        self.enrich.report_error(e.to_string());
                        self.status = "Could not obtain an access token.".to_string();
                        return;
                    }
                };
                let outcome = self
                    .runtime
                    .block_on(tasks::enrich(&self.config, &token, &request));
                match outcome {
                    Ok(outcome) => {
                        self.status = format!("Enriched {} rows.", outcome.results.len());
                        self.enrich.show_results(outcome.results, outcome.sink_lines);
                    }
                    Err(e) => {
                        warn!(error = %e, "enrichment failed");
                        self.enrich.report_error(e.to_string());
                        self.status = "Enrichment failed.".to_string();
                    }
                }
            }
            Action::FetchNews { query } => {
                match self.runtime.block_on(tasks::news(&self.config, &query)) {
                    Ok(items) => {
                        self.status = format!("{} articles for \"{query}\".", items.len());
                        self.news.show_items(items);
                    }
                    Err(msg) => {
                        self.news.report_error(msg);
                        self.status = "News fetch finished without articles.".to_string();
                    }
                }
            }
        }
    }

    /// The single gate check when leaving the login screen.
    fn enter_session(&mut self) {
        match self.gate.require_authenticated() {
            Ok(identity) => {
                info!(identity, "session started");
                self.status = format!("Logged in as {identity}. Ctrl-L to log out.");
                self.identity = Some(identity.to_string());
                self.active_tab = 0;
            }
            Err(e) => self.login.report_error(e.to_string()),
        }
    }

    fn logout(&mut self) {
        self.gate.logout();
        self.identity = None;
        self.token = None;
        self.enrich = EnrichScreen::new();
        self.news = NewsScreen::new();
        self.login.reset("Logged out.");
        self.status = "Log in or sign up to continue.".to_string();
    }

    /// Session token, obtained once and reused for every later run.
    fn bearer_token(&mut self) -> Result<BearerToken> {
        if let Some(token) = &self.token {
            return Ok(token.clone());
        }
        let mut holder = CredentialHolder::from_config(&self.config.generation)?;
        let token = self.runtime.block_on(holder.refresh())?;
        self.token = Some(token.clone());
        Ok(token)
    }
}

/// Entry point: sets up the terminal, runs the event loop, restores the terminal.
pub(crate) fn run(config: AppConfig) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, App::new(config, runtime));

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn run_app(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, mut app: App) -> Result<()> {
    loop {
        terminal.draw(|f| draw(f, &app))?;

        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                if let Some(action) = handle_key(&mut app, key.code, key.modifiers) {
                    // Show the busy message before blocking.
                    app.status = action.busy_message().to_string();
                    terminal.draw(|f| draw(f, &app))?;
                    app.perform(action);
                }
            }
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}

fn handle_key(app: &mut App, code: KeyCode, modifiers: KeyModifiers) -> Option<Action> {
    match code {
        KeyCode::Char('q') | KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
            app.should_quit = true;
            return None;
        }
        KeyCode::Char('l') if modifiers.contains(KeyModifiers::CONTROL) && app.logged_in() => {
            app.logout();
            return None;
        }
        KeyCode::Char('q') if !app.is_editing() => {
            app.should_quit = true;
            return None;
        }
        KeyCode::Char('?') if !app.is_editing() => {
            app.show_help = !app.show_help;
            return None;
        }
        KeyCode::Esc if app.show_help => {
            app.show_help = false;
            return None;
        }
        _ => {}
    }

    if app.show_help {
        app.show_help = false;
        return None;
    }

    if !app.logged_in() {
        return app.login.handle_key(code, modifiers);
    }

    match code {
        KeyCode::Char(c @ '1'..='2') if !app.is_editing() => {
            let idx = (c as usize) - ('1' as usize);
            if idx < app.screens.len() {
                app.active_tab = idx;
                app.status = format!("{}", app.screens[idx]);
            }
            None
        }
        KeyCode::Tab | KeyCode::BackTab if !app.is_editing() => {
            let n = app.screens.len();
            app.active_tab = if code == KeyCode::Tab {
                (app.active_tab + 1) % n
            } else {
                (app.active_tab + n - 1) % n
            };
            app.status = format!("{}", app.screens[app.active_tab]);
            None
        }
        _ => match app.screens[app.active_tab] {
            ScreenId::Enrich => app.enrich.handle_key(code, modifiers),
            ScreenId::News => app.news.handle_key(code, modifiers),
        },
    }
}

fn draw(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Tab bar
            Constraint::Min(1),    // Content
            Constraint::Length(1), // Status bar
        ])
        .split(f.area());

    match &app.identity {
        None => {
            let title = Paragraph::new("Log in to use the search agent").block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(" AI Search Agent "),
            );
            f.render_widget(title, chunks[0]);
            app.login.draw(f, chunks[1]);
        }
        Some(identity) => {
            let tab_titles: Vec<Line> = app
                .screens
                .iter()
                .map(|s| Line::from(format!("{s}")))
                .collect();
            let tabs = Tabs::new(tab_titles)
                .block(
                    Block::default()
                        .borders(Borders::ALL)
                        .title(format!(" AI Search Agent · {identity} ")),
                )
                .select(app.active_tab)
                .style(Style::default().fg(Color::White))
                .highlight_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
                .divider(" │ ");
            f.render_widget(tabs, chunks[0]);

            match app.screens[app.active_tab] {
                ScreenId::Enrich => app.enrich.draw(f, chunks[1]),
                ScreenId::News => app.news.draw(f, chunks[1]),
            }
        }
    }

    f.render_widget(status_bar(&app.status), chunks[2]);

    if app.show_help {
        draw_help_overlay(f);
    }
}

fn draw_help_overlay(f: &mut Frame) {
    let area = centered_rect(60, 60, f.area());

    let help_text = vec![
        Line::from("Keybindings").style(Style::default().add_modifier(Modifier::BOLD)),
        Line::from(""),
        Line::from("  1-2          Switch to screen"),
        Line::from("  Tab/S-Tab    Next/previous screen"),
        Line::from("  Ctrl-L       Log out"),
        Line::from("  ?            Toggle this help"),
        Line::from("  q / Ctrl-C   Quit"),
        Line::from(""),
        Line::from("Screen-specific:").style(Style::default().add_modifier(Modifier::BOLD)),
        Line::from("  Enter        Edit field / submit while editing"),
        Line::from("  Esc          Stop editing"),
        Line::from("  ↑/↓          Move between fields or articles"),
        Line::from("  p / r        Preview input / run"),
        Line::from("  s            Log in or sign up"),
    ];

    let help = Paragraph::new(help_text)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Help · press any key to close ")
                .style(Style::default().bg(Color::DarkGray)),
        )
        .style(Style::default().fg(Color::White).bg(Color::DarkGray));

    f.render_widget(ratatui::widgets::Clear, area);
    f.render_widget(help, area);
}

/// Create a centered rectangle with percentage width and height.
fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use searchagent_core::{SEEDED_IDENTITY, SEEDED_SECRET};

    fn app() -> App {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        App::new(AppConfig::default(), runtime)
    }

    #[test]
    fn starts_on_login_screen() {
        let app = app();
        assert!(!app.logged_in());
        assert!(!app.gate.is_authenticated());
    }

    #[test]
    fn seeded_login_enters_session() {
        let mut app = app();
        app.perform(Action::Login {
            identity: SEEDED_IDENTITY.into(),
            secret: SEEDED_SECRET.into(),
        });
        assert_eq!(app.identity.as_deref(), Some(SEEDED_IDENTITY));
    }

    #[test]
    fn wrong_secret_stays_on_login() {
        let mut app = app();
        app.perform(Action::Login {
            identity: SEEDED_IDENTITY.into(),
            secret: "nope".into(),
        });
        assert!(!app.logged_in());
        assert_eq!(app.status, "Login failed.");
    }

    #[test]
    fn logout_returns_to_login_and_drops_token() {
        let mut app = app();
        app.perform(Action::Login {
            identity: SEEDED_IDENTITY.into(),
            secret: SEEDED_SECRET.into(),
        });
        app.token = Some(BearerToken::new("t"));

        handle_key(&mut app, KeyCode::Char('l'), KeyModifiers::CONTROL);

        assert!(!app.logged_in());
        assert!(app.token.is_none());
        assert!(!app.gate.is_authenticated());
    }

    #[test]
    fn tabs_cycle_only_after_login() {
        let mut app = app();
        handle_key(&mut app, KeyCode::Tab, KeyModifiers::NONE);
        assert_eq!(app.active_tab, 0);

        app.perform(Action::Login {
            identity: SEEDED_IDENTITY.into(),
            secret: SEEDED_SECRET.into(),
        });
        handle_key(&mut app, KeyCode::Tab, KeyModifiers::NONE);
        assert_eq!(app.screens[app.active_tab], ScreenId::News);
    }
}
