use std::io::{self, Stdout, Write};

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use tracing::warn;

use crate::state::{ListedServer, ServerManager};
use crate::tui::{clear_screen, render, Painter, Theme};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Info(String),
    Error(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuAction {
    None,
    Toggle(String),
    Reload,
    Quit,
}

/// Selection and prompt state, independent of the terminal.
#[derive(Debug, Clone)]
pub struct MenuState {
    pub servers: Vec<ListedServer>,
    pub selected: usize,
    /// Name awaiting a y/n answer.
    pub confirming: Option<String>,
    pub notice: Option<Notice>,
    pub confirm_toggle: bool,
}

impl MenuState {
    pub fn new(servers: Vec<ListedServer>) -> Self {
        Self {
            servers,
            selected: 0,
            confirming: None,
            notice: None,
            confirm_toggle: true,
        }
    }

    pub fn selected_server(&self) -> Option<&ListedServer> {
        self.servers.get(self.selected)
    }

    /// Swaps in a fresh listing, keeping the cursor on the same name.
    pub fn replace_servers(&mut self, servers: Vec<ListedServer>) {
        let current = self.selected_server().map(|s| s.name.clone());
        self.servers = servers;
        self.selected = current
            .and_then(|name| self.servers.iter().position(|s| s.name == name))
            .unwrap_or(self.selected)
            .min(self.servers.len().saturating_sub(1));
    }

    pub fn handle_key(&mut self, code: KeyCode, modifiers: KeyModifiers) -> MenuAction {
        if code == KeyCode::Char('c') && modifiers.contains(KeyModifiers::CONTROL) {
            return MenuAction::Quit;
        }

        if let Some(name) = self.confirming.take() {
            return match code {
                KeyCode::Char('y') | KeyCode::Char('Y') => MenuAction::Toggle(name),
                _ => {
                    self.notice = Some(Notice::Info("Operation cancelled".to_string()));
                    MenuAction::None
                }
            };
        }

        match code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.move_by(-1);
                MenuAction::None
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.move_by(1);
                MenuAction::None
            }
            KeyCode::Enter | KeyCode::Char(' ') => {
                let Some(name) = self.selected_server().map(|s| s.name.clone()) else {
                    return MenuAction::None;
                };
                self.notice = None;
                if self.confirm_toggle {
                    self.confirming = Some(name);
                    MenuAction::None
                } else {
                    MenuAction::Toggle(name)
                }
            }
            KeyCode::Char('r') => MenuAction::Reload,
            KeyCode::Char('q') | KeyCode::Esc => MenuAction::Quit,
            _ => MenuAction::None,
        }
    }

    fn move_by(&mut self, delta: isize) {
        if self.servers.is_empty() {
            return;
        }
        let len = self.servers.len() as isize;
        self.selected = (self.selected as isize + delta).rem_euclid(len) as usize;
    }
}

/// Full-screen picker over the servers of a [`ServerManager`].
pub struct Menu<'a> {
    manager: &'a ServerManager,
    painter: Painter,
    theme: &'a Theme,
    state: MenuState,
}

impl<'a> Menu<'a> {
    pub fn new(manager: &'a ServerManager, painter: Painter, theme: &'a Theme) -> Self {
        Self {
            manager,
            painter,
            theme,
            state: MenuState::new(Vec::new()),
        }
    }

    pub fn confirm_toggle(mut self, confirm: bool) -> Self {
        self.state.confirm_toggle = confirm;
        self
    }

    pub fn run(&mut self) -> Result<()> {
        let mut stdout = io::stdout();
        enable_raw_mode()?;
        execute!(stdout, crossterm::cursor::Hide)?;
        let result = self.run_loop(&mut stdout);

        disable_raw_mode()?;
        execute!(stdout, crossterm::cursor::Show)?;
        write!(stdout, "{}", clear_screen())?;
        stdout.flush()?;

        result
    }

    fn run_loop(&mut self, stdout: &mut Stdout) -> Result<()> {
        self.reload();
        loop {
            self.draw(stdout)?;
            let Event::Key(key) = event::read()? else {
                continue;
            };
            if key.kind != KeyEventKind::Press {
                continue;
            }
            match self.state.handle_key(key.code, key.modifiers) {
                MenuAction::None => {}
                MenuAction::Reload => {
                    self.reload();
                    self.state.notice = Some(Notice::Info("Reloaded".to_string()));
                }
                MenuAction::Toggle(name) => self.toggle(&name),
                MenuAction::Quit => return Ok(()),
            }
        }
    }

    fn toggle(&mut self, name: &str) {
        self.state.notice = Some(match self.manager.toggle(name) {
            Ok(true) => Notice::Info(format!("✓ Server '{name}' enabled")),
            Ok(false) => Notice::Info(format!("✓ Server '{name}' disabled")),
            Err(e) => {
                if let Err(recover_err) = self.manager.recover() {
                    warn!(error = %recover_err, "recovery after failed toggle did not complete");
                }
                Notice::Error(e.to_string())
            }
        });
        self.reload();
    }

    fn reload(&mut self) {
        match self.manager.list_servers() {
            Ok(servers) => self.state.replace_servers(servers),
            Err(e) => self.state.notice = Some(Notice::Error(e.to_string())),
        }
    }

    fn draw(&self, stdout: &mut Stdout) -> Result<()> {
        let lines = render::menu(&self.state, self.painter, self.theme);
        write!(stdout, "{}{}\r\n", clear_screen(), lines.join("\r\n"))?;
        stdout.flush()?;
        Ok(())
    }
}
