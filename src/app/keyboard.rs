use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use super::{App, Screen};

impl App {
    /// The main entry point for handling keyboard events.
    ///
    /// The recovery screen captures all input while it is shown; otherwise
    /// global shortcuts are tried first and the rest edits the prompt line.
    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }

        if self.fatal.is_some() {
            self.handle_recovery_key(key);
            return;
        }

        if self.handle_global_shortcuts(key) {
            return;
        }

        self.handle_composer_key(key);
    }

    fn handle_recovery_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('r') => self.reload(),
            KeyCode::Char('x') => self.reset(),
            KeyCode::Char('q') => self.should_quit = true,
            _ => {}
        }
    }

    /// Returns `true` if the key was a shortcut.
    fn handle_global_shortcuts(&mut self, key: KeyEvent) -> bool {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('q') if ctrl => self.should_quit = true,
            KeyCode::Char('s') if ctrl => {
                if self.screen == Screen::Debate {
                    self.stop_debate();
                }
            }
            KeyCode::Char('x') if ctrl => self.cancel_current(),
            KeyCode::Char('l') if ctrl => {
                if self.screen == Screen::Training {
                    self.load_training_logs();
                }
            }
            KeyCode::Char('r') if ctrl => self.refresh_lists(),
            KeyCode::Tab => self.switch_screen(self.screen.next()),
            KeyCode::BackTab => self.switch_screen(self.screen.previous()),
            KeyCode::F(2) => self.toggle_theme(),
            KeyCode::F(3) => self.cycle_language(),
            KeyCode::F(4) => self.dismiss_http_notice(),
            KeyCode::PageUp if self.screen == Screen::Assistant => {
                self.controllers.assistant.move_selection(-1)
            }
            KeyCode::PageDown if self.screen == Screen::Assistant => {
                self.controllers.assistant.move_selection(1)
            }
            _ => return false,
        }
        true
    }

    fn handle_composer_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Enter => self.submit_prompt(),
            KeyCode::Esc => self.composer.clear(),
            KeyCode::Backspace => self.composer.backspace(),
            KeyCode::Delete => self.composer.delete(),
            KeyCode::Left => self.composer.move_left(),
            KeyCode::Right => self.composer.move_right(),
            KeyCode::Home => self.composer.move_home(),
            KeyCode::End => self.composer.move_end(),
            KeyCode::Up => {
                self.composer.history_previous();
            }
            KeyCode::Down => {
                self.composer.history_next();
            }
            KeyCode::Char(ch)
                if !key
                    .modifiers
                    .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) =>
            {
                if self.screen.takes_prompt() {
                    self.composer.insert_char(ch);
                }
            }
            _ => {}
        }
    }

    fn switch_screen(&mut self, screen: Screen) {
        self.screen = screen;
        let strings = self.store.snapshot().language.strings();
        self.status_message = match screen {
            Screen::Dashboard => strings.dashboard_title(),
            Screen::Brainstorm => strings.brainstorm_title(),
            Screen::Debate => strings.debate_title(),
            Screen::Training => strings.training_title(),
            Screen::Assistant => strings.assistant_title(),
        }
        .to_string();
    }
}
