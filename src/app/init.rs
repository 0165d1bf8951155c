use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use log::{debug, info, warn};
use tokio::sync::mpsc;

use super::state::{AppEvent, Controllers};
use super::{App, PromptComposer, Screen};
use crate::backend::{ApiClient, ClientSettings, TransportMode, TransportResolver};
use crate::controllers::{
    AssistantController, BrainstormController, DebateController, TrainingController,
};
use crate::store::{LocalStorage, Store};

impl App {
    /// Builds the application from the config found under `workspace_root`.
    ///
    /// Must be called inside the tokio runtime: native backend detection starts
    /// the sidecar right away.
    pub fn from_workspace(workspace_root: PathBuf) -> Result<Self> {
        let canonical_root = workspace_root.canonicalize().unwrap_or(workspace_root);
        debug!("Initializing App with workspace: {}", canonical_root.display());

        let settings = ClientSettings::load(&canonical_root)?;
        let storage = LocalStorage::load(settings.local_storage_path(&canonical_root));
        let store = Arc::new(Store::new(storage));
        let resolver = Arc::new(TransportResolver::from_settings(settings.backend.clone()));
        Ok(Self::new(canonical_root, settings, store, ApiClient::new(resolver)))
    }

    /// Creates the state without starting any background work.
    pub fn new(
        workspace_root: PathBuf,
        settings: ClientSettings,
        store: Arc<Store>,
        client: ApiClient,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let controllers = build_controllers(&client, &settings);
        Self {
            should_quit: false,
            screen: Screen::default(),
            composer: PromptComposer::new(),
            status_message: String::from("Tab to switch screens, Ctrl+Q to quit"),
            fatal: None,
            workspace_root,
            settings,
            store,
            client,
            controllers,
            events_tx,
            events_rx,
        }
    }

    /// Resolves the backend and fills the store with the lists every screen
    /// relies on. Failures only end up in the status line.
    pub fn bootstrap(&self) {
        let client = self.client.clone();
        let events = self.events_tx.clone();
        let user_id = self.store.snapshot().current_user_id;
        tokio::spawn(async move {
            let mode = client.resolver().mode().await;
            info!("backend mode: {:?}", mode);
            let reachable = mode != TransportMode::Unreachable;
            let _ = events.send(AppEvent::BackendResolved(mode));
            if !reachable {
                return;
            }

            match client.list_providers().await {
                Ok(value) => {
                    let providers = value.as_array().cloned().unwrap_or_default();
                    let _ = events.send(AppEvent::ProvidersLoaded(providers));
                }
                Err(err) => {
                    warn!("failed to load providers: {}", err);
                    let _ = events.send(AppEvent::Status(format!("Providers: {err}")));
                }
            }
            match client.list_profiles().await {
                Ok(value) => {
                    let profiles = value.as_array().cloned().unwrap_or_default();
                    let _ = events.send(AppEvent::ProfilesLoaded(profiles));
                }
                Err(err) => {
                    warn!("failed to load profiles: {}", err);
                    let _ = events.send(AppEvent::Status(format!("Profiles: {err}")));
                }
            }
            if let Some(user_id) = user_id {
                match client.get_user(&user_id).await {
                    Ok(user) => {
                        let _ = events.send(AppEvent::UserLoaded(Some(user)));
                    }
                    Err(err) => {
                        warn!("stored user {} could not be loaded: {}", user_id, err);
                        let _ = events.send(AppEvent::UserLoaded(None));
                    }
                }
            }
        });
    }

    /// Rebuilds the per-screen state after a crash, keeping the store.
    pub fn reload(&mut self) {
        self.stop_all_polling();
        self.controllers.assistant.cancel();
        self.controllers = build_controllers(&self.client, &self.settings);
        self.composer = PromptComposer::new();
        self.screen = Screen::Dashboard;
        self.fatal = None;
        self.status_message = String::from("Reloaded");
        self.bootstrap();
    }

    /// Clears local storage, then reloads.
    pub fn reset(&mut self) {
        if let Err(err) = self.store.reset() {
            warn!("failed to clear local storage: {err:#}");
        }
        self.reload();
        self.status_message = String::from("Local data cleared");
    }

    /// Stops background work before exit.
    pub fn shutdown(&self) {
        self.stop_all_polling();
        self.controllers.assistant.cancel();
        info!("agentdeck shutting down");
    }

    pub(crate) fn stop_all_polling(&self) {
        self.controllers.brainstorm.stop_polling();
        self.controllers.debate.stop_polling();
        self.controllers.training.stop_polling();
    }
}

fn build_controllers(client: &ApiClient, settings: &ClientSettings) -> Controllers {
    let api = Arc::new(client.clone());
    let timing = &settings.timing;
    Controllers {
        brainstorm: BrainstormController::new(api.clone(), timing.poll_interval()),
        debate: DebateController::new(api.clone(), timing.poll_interval(), timing.stop_timeout()),
        training: TrainingController::new(api.clone(), timing.training_poll_interval()),
        assistant: AssistantController::new(api, timing.stream_timeout()),
    }
}
