//! Defines the core state structures for the application.
//!
//! `App` owns the controllers of every screen, the shared store and the
//! prompt composer. Background work reports back through `AppEvent`s which are
//! drained on every tick.

use std::path::PathBuf;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::mpsc;

use crate::backend::{ApiClient, ClientSettings, TransportMode};
use crate::controllers::{
    AssistantController, BrainstormController, DebateController, StopOutcome, TrainingController,
};
use crate::store::Store;

/// Key of the dismissable notice shown while running against the HTTP backend.
pub const HTTP_MODE_WARNING: &str = "http-mode";

/// The screens reachable with Tab / Shift-Tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Screen {
    #[default]
    Dashboard,
    Brainstorm,
    Debate,
    Training,
    Assistant,
}

impl Screen {
    pub const ALL: [Screen; 5] = [
        Screen::Dashboard,
        Screen::Brainstorm,
        Screen::Debate,
        Screen::Training,
        Screen::Assistant,
    ];

    pub fn next(self) -> Self {
        let index = Self::ALL.iter().position(|screen| *screen == self).unwrap_or(0);
        Self::ALL[(index + 1) % Self::ALL.len()]
    }

    pub fn previous(self) -> Self {
        let index = Self::ALL.iter().position(|screen| *screen == self).unwrap_or(0);
        Self::ALL[(index + Self::ALL.len() - 1) % Self::ALL.len()]
    }

    /// Whether Enter on this screen consumes the composer text.
    pub fn takes_prompt(self) -> bool {
        !matches!(self, Screen::Dashboard)
    }
}

/// Results of background tasks, applied to the state on the next tick.
#[derive(Debug)]
pub enum AppEvent {
    BackendResolved(TransportMode),
    ProvidersLoaded(Vec<Value>),
    ProfilesLoaded(Vec<Value>),
    UserLoaded(Option<Value>),
    DebateStopped(StopOutcome),
    /// Free-form text for the status line.
    Status(String),
}

/// Everything a screen controller needs, shared between reloads.
#[derive(Clone)]
pub struct Controllers {
    pub brainstorm: BrainstormController,
    pub debate: DebateController,
    pub training: TrainingController,
    pub assistant: AssistantController,
}

/// The main application state.
pub struct App {
    /// Flag to indicate if the application should quit.
    pub should_quit: bool,
    pub screen: Screen,
    pub composer: PromptComposer,
    /// The message currently displayed in the status bar.
    pub status_message: String,
    /// Set when a frame or handler panicked; the recovery screen is shown
    /// until the user reloads, resets or quits.
    pub fatal: Option<String>,

    pub workspace_root: PathBuf,
    pub settings: ClientSettings,
    pub store: Arc<Store>,
    pub(crate) client: ApiClient,
    pub(crate) controllers: Controllers,

    pub(crate) events_tx: mpsc::UnboundedSender<AppEvent>,
    pub(crate) events_rx: mpsc::UnboundedReceiver<AppEvent>,
}

/// State for the single-line prompt input shared by all screens.
///
/// Manages the text buffer, cursor position, and submission history.
#[derive(Clone, Default)]
pub struct PromptComposer {
    buffer: String,
    cursor: usize,
    history: Vec<String>,
    history_index: Option<usize>,
}

impl PromptComposer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    /// Byte offset of the cursor in the buffer.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Inserts a character at the current cursor position.
    pub fn insert_char(&mut self, ch: char) {
        self.buffer.insert(self.cursor, ch);
        self.cursor += ch.len_utf8();
        self.history_index = None;
    }

    /// Deletes the character before the cursor (backspace).
    pub fn backspace(&mut self) {
        if let Some((idx, _)) = self.buffer[..self.cursor].char_indices().next_back() {
            self.buffer.drain(idx..self.cursor);
            self.cursor = idx;
            self.history_index = None;
        }
    }

    /// Deletes the character at the cursor (delete).
    pub fn delete(&mut self) {
        if let Some(ch) = self.buffer[self.cursor..].chars().next() {
            self.buffer.drain(self.cursor..self.cursor + ch.len_utf8());
            self.history_index = None;
        }
    }

    pub fn move_left(&mut self) {
        if let Some((idx, _)) = self.buffer[..self.cursor].char_indices().next_back() {
            self.cursor = idx;
        }
    }

    pub fn move_right(&mut self) {
        if let Some(ch) = self.buffer[self.cursor..].chars().next() {
            self.cursor += ch.len_utf8();
        }
    }

    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor = self.buffer.len();
    }

    /// Clears the entire input buffer.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.cursor = 0;
        self.history_index = None;
    }

    /// Takes the content of the buffer, adds it to history, and clears the buffer.
    pub fn take(&mut self) -> String {
        let content = std::mem::take(&mut self.buffer);
        if !content.trim().is_empty() {
            self.history.push(content.clone());
        }
        self.cursor = 0;
        self.history_index = None;
        content
    }

    /// Navigates to the previous entry in the submission history.
    pub fn history_previous(&mut self) -> bool {
        if self.history.is_empty() {
            return false;
        }
        let target = match self.history_index {
            Some(idx) => idx.saturating_sub(1),
            None => self.history.len() - 1,
        };
        self.load_history(target)
    }

    /// Navigates to the next entry; past the newest entry the buffer is cleared.
    pub fn history_next(&mut self) -> bool {
        match self.history_index {
            Some(idx) if idx + 1 < self.history.len() => self.load_history(idx + 1),
            Some(_) => {
                self.clear();
                true
            }
            None => false,
        }
    }

    fn load_history(&mut self, index: usize) -> bool {
        let Some(entry) = self.history.get(index).cloned() else {
            return false;
        };
        self.buffer = entry;
        self.cursor = self.buffer.len();
        self.history_index = Some(index);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn composer_edits_multibyte_text() {
        let mut composer = PromptComposer::new();
        for ch in "辯論x".chars() {
            composer.insert_char(ch);
        }
        composer.backspace();
        composer.move_left();
        composer.insert_char('a');
        assert_eq!(composer.buffer(), "辯a論");
        composer.move_end();
        composer.delete();
        assert_eq!(composer.take(), "辯a論");
        assert!(composer.is_empty());
    }

    #[test]
    fn composer_history_walks_back_and_forth() {
        let mut composer = PromptComposer::new();
        for prompt in ["first", "second"] {
            for ch in prompt.chars() {
                composer.insert_char(ch);
            }
            composer.take();
        }
        assert!(composer.history_previous());
        assert_eq!(composer.buffer(), "second");
        assert!(composer.history_previous());
        assert_eq!(composer.buffer(), "first");
        assert!(composer.history_next());
        assert_eq!(composer.buffer(), "second");
        assert!(composer.history_next());
        assert!(composer.is_empty());
    }

    #[test]
    fn screens_cycle_both_ways() {
        assert_eq!(Screen::Assistant.next(), Screen::Dashboard);
        assert_eq!(Screen::Dashboard.previous(), Screen::Assistant);
    }
}
