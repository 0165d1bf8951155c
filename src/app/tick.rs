use log::warn;

use super::App;
use super::state::AppEvent;
use crate::backend::TransportMode;

// Implementation block for tick-related logic in the App.
impl App {
    /// Called on every tick of the application loop.
    ///
    /// Applies the results of background tasks and moves finished assistant
    /// replies into the transcript. Controller snapshots are read at draw time.
    pub fn on_tick(&mut self) {
        while let Ok(event) = self.events_rx.try_recv() {
            self.apply_event(event);
        }
        if self.controllers.assistant.tick() {
            self.status_message = String::from("Assistant reply finished");
        }
    }

    pub(crate) fn apply_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::BackendResolved(mode) => {
                self.status_message = match &mode {
                    TransportMode::Native => String::from("Connected to native backend"),
                    TransportMode::Http(base) => format!("Connected to {base}"),
                    TransportMode::Unreachable => String::from("Backend unreachable"),
                };
                self.store.set_backend(mode);
            }
            AppEvent::ProvidersLoaded(providers) => self.store.set_providers(providers),
            AppEvent::ProfilesLoaded(profiles) => self.store.set_profiles(profiles),
            AppEvent::UserLoaded(user) => {
                if let Err(err) = self.store.set_current_user(user) {
                    warn!("failed to persist current user: {err:#}");
                }
            }
            AppEvent::DebateStopped(outcome) => self.apply_stop_outcome(outcome),
            AppEvent::Status(message) => self.status_message = message,
        }
    }
}
