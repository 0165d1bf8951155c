//! Process-wide client state.
//!
//! Everything the screens share lives here behind a plain `RwLock`; whichever
//! task writes last wins. A handful of keys are mirrored to a JSON file so they
//! survive restarts.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::{Context, Result};
use log::{debug, warn};
use serde_json::Value;

use crate::backend::TransportMode;
use crate::i18n::Language;

pub const CURRENT_USER_KEY: &str = "currentUserId";
const DISMISSED_PREFIX: &str = "dismissed.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

impl Theme {
    pub fn toggle(self) -> Self {
        match self {
            Theme::Dark => Theme::Light,
            Theme::Light => Theme::Dark,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Theme::Dark => "dark",
            Theme::Light => "light",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct StoreState {
    pub current_user: Option<Value>,
    pub current_user_id: Option<String>,
    pub theme: Theme,
    pub language: Language,
    /// Cached backend lists, refreshed on startup and on demand.
    pub providers: Vec<Value>,
    pub profiles: Vec<Value>,
    /// `None` until the transport resolver has finished.
    pub backend: Option<TransportMode>,
}

impl StoreState {
    /// Ids of every cached profile, in backend order.
    pub fn profile_ids(&self) -> Vec<String> {
        self.profiles
            .iter()
            .filter_map(|profile| match profile.get("id") {
                Some(Value::String(id)) => Some(id.clone()),
                Some(Value::Number(id)) => Some(id.to_string()),
                _ => None,
            })
            .collect()
    }
}

/// Small persisted key/value map, stored as a flat JSON object.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl LocalStorage {
    /// Loads the file at `path`. A missing or unreadable file starts empty.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|err| {
                warn!("ignoring corrupt local storage {}: {}", path.display(), err);
                BTreeMap::new()
            }),
            Err(_) => BTreeMap::new(),
        };
        Self { path, entries }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> Result<()> {
        self.entries.insert(key.into(), value.into());
        self.save()
    }

    pub fn remove(&mut self, key: &str) -> Result<()> {
        if self.entries.remove(key).is_some() {
            self.save()?;
        }
        Ok(())
    }

    /// Drops every key and deletes the backing file.
    pub fn clear(&mut self) -> Result<()> {
        self.entries.clear();
        if self.path.exists() {
            fs::remove_file(&self.path)
                .with_context(|| format!("failed to remove {}", self.path.display()))?;
        }
        Ok(())
    }

    pub fn save(&self) -> Result<()> {
        if let Some(dir) = self.path.parent()
            && !dir.as_os_str().is_empty()
        {
            fs::create_dir_all(dir)
                .with_context(|| format!("failed to create {}", dir.display()))?;
        }
        let raw = serde_json::to_string_pretty(&self.entries)?;
        fs::write(&self.path, raw)
            .with_context(|| format!("failed to write {}", self.path.display()))?;
        Ok(())
    }
}

/// The global store shared by every screen.
#[derive(Debug)]
pub struct Store {
    state: RwLock<StoreState>,
    storage: RwLock<LocalStorage>,
}

impl Store {
    pub fn new(storage: LocalStorage) -> Self {
        let state = StoreState {
            current_user_id: storage.get(CURRENT_USER_KEY).map(str::to_string),
            ..StoreState::default()
        };
        Self {
            state: RwLock::new(state),
            storage: RwLock::new(storage),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, StoreState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn storage(&self) -> RwLockWriteGuard<'_, LocalStorage> {
        self.storage.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> StoreState {
        self.read().clone()
    }

    /// Sets (or clears) the signed-in user and persists their id.
    pub fn set_current_user(&self, user: Option<Value>) -> Result<()> {
        let id = user.as_ref().and_then(|user| match user.get("id") {
            Some(Value::String(id)) => Some(id.clone()),
            Some(Value::Number(id)) => Some(id.to_string()),
            _ => None,
        });
        {
            let mut state = self.write();
            state.current_user = user;
            state.current_user_id = id.clone();
        }
        let mut storage = self.storage();
        match id {
            Some(id) => storage.set(CURRENT_USER_KEY, id),
            None => storage.remove(CURRENT_USER_KEY),
        }
    }

    pub fn set_theme(&self, theme: Theme) {
        self.write().theme = theme;
    }

    pub fn set_language(&self, language: Language) {
        self.write().language = language;
    }

    pub fn set_providers(&self, providers: Vec<Value>) {
        debug!("store: {} provider(s) cached", providers.len());
        self.write().providers = providers;
    }

    pub fn set_profiles(&self, profiles: Vec<Value>) {
        debug!("store: {} profile(s) cached", profiles.len());
        self.write().profiles = profiles;
    }

    pub fn set_backend(&self, mode: TransportMode) {
        self.write().backend = Some(mode);
    }

    pub fn dismiss_warning(&self, key: &str) -> Result<()> {
        self.storage().set(format!("{DISMISSED_PREFIX}{key}"), "true")
    }

    pub fn is_dismissed(&self, key: &str) -> bool {
        self.storage
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&format!("{DISMISSED_PREFIX}{key}"))
            == Some("true")
    }

    /// Forgets all persisted keys and resets in-memory state, keeping the
    /// resolved backend mode.
    pub fn reset(&self) -> Result<()> {
        self.storage().clear()?;
        let mut state = self.write();
        let backend = state.backend.take();
        *state = StoreState {
            backend,
            ..StoreState::default()
        };
        Ok(())
    }
}
