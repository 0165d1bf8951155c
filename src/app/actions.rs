use log::{info, warn};
use serde_json::{Value, json};

use super::state::AppEvent;
use super::{App, Screen};
use crate::controllers::StopOutcome;

/// Rounds used when a debate is started from the prompt line.
const DEFAULT_DEBATE_ROUNDS: u32 = 3;

// Implementation block for user actions that reach the backend.
impl App {
    /// Handles Enter: the composer text goes to whatever the current screen does.
    pub(crate) fn submit_prompt(&mut self) {
        if self.screen == Screen::Dashboard {
            self.refresh_lists();
            return;
        }
        let prompt = self.composer.buffer().trim().to_string();
        if prompt.is_empty() {
            self.status_message = String::from("Nothing to submit");
            return;
        }

        let profile_ids = self.store.snapshot().profile_ids();
        let needs_profiles = matches!(self.screen, Screen::Brainstorm | Screen::Debate);
        if needs_profiles && profile_ids.is_empty() {
            self.status_message = String::from("No agent profiles loaded");
            return;
        }
        self.composer.take();

        match self.screen {
            Screen::Brainstorm => {
                let controller = self.controllers.brainstorm.clone();
                self.spawn_action("Brainstorm", async move {
                    let run_id = controller.start(&prompt, &profile_ids).await?;
                    Ok(format!("Run {run_id} started"))
                });
            }
            Screen::Debate => {
                let controller = self.controllers.debate.clone();
                self.spawn_action("Debate", async move {
                    let id = controller
                        .start(&prompt, &profile_ids, DEFAULT_DEBATE_ROUNDS)
                        .await?;
                    Ok(format!("Debate {id} started"))
                });
            }
            Screen::Training => {
                let config = match serde_json::from_str::<Value>(&prompt) {
                    Ok(config @ Value::Object(_)) => config,
                    _ => json!({ "name": prompt }),
                };
                let controller = self.controllers.training.clone();
                self.spawn_action("Training", async move {
                    let job_id = controller.start(config).await?;
                    Ok(format!("Training job {job_id} submitted"))
                });
            }
            Screen::Assistant => {
                let user_id = self.store.snapshot().current_user_id;
                if self.controllers.assistant.submit(&prompt, user_id.as_deref()) {
                    self.status_message = String::from("Assistant is replying...");
                } else {
                    self.status_message = String::from("Wait for the current reply to finish");
                }
            }
            Screen::Dashboard => {}
        }
    }

    /// Ctrl+S on the debate screen.
    pub(crate) fn stop_debate(&mut self) {
        if self.controllers.debate.snapshot().debate_id.is_none() {
            self.status_message = String::from("No debate running");
            return;
        }
        self.status_message = String::from("Stopping debate...");
        let controller = self.controllers.debate.clone();
        let events = self.events_tx.clone();
        tokio::spawn(async move {
            let outcome = controller.stop().await;
            let _ = events.send(AppEvent::DebateStopped(outcome));
        });
    }

    pub(crate) fn apply_stop_outcome(&mut self, outcome: StopOutcome) {
        self.status_message = match outcome {
            StopOutcome::Stopped => String::from("Debate stop requested"),
            StopOutcome::TimedOut => String::from("Debate: stop timed out"),
            StopOutcome::Failed(message) => format!("Debate: {message}"),
        };
    }

    /// Ctrl+X: cancels whatever runs on the current screen.
    pub(crate) fn cancel_current(&mut self) {
        match self.screen {
            Screen::Brainstorm => {
                let controller = self.controllers.brainstorm.clone();
                self.spawn_action("Cancel", async move {
                    controller.cancel().await?;
                    Ok(String::from("Run cancellation requested"))
                });
            }
            Screen::Training => {
                let controller = self.controllers.training.clone();
                self.spawn_action("Cancel", async move {
                    controller.cancel().await?;
                    Ok(String::from("Training cancellation requested"))
                });
            }
            Screen::Assistant => {
                self.controllers.assistant.cancel();
                self.status_message = String::from("Reply cancelled");
            }
            Screen::Debate => self.stop_debate(),
            Screen::Dashboard => {}
        }
    }

    /// Ctrl+L on the training screen.
    pub(crate) fn load_training_logs(&mut self) {
        let controller = self.controllers.training.clone();
        self.spawn_action("Logs", async move {
            controller.logs().await?;
            Ok(String::from("Training logs loaded"))
        });
    }

    /// Reloads providers, profiles and the training job list.
    pub(crate) fn refresh_lists(&mut self) {
        self.status_message = String::from("Refreshing...");
        let client = self.client.clone();
        let events = self.events_tx.clone();
        let training = self.controllers.training.clone();
        tokio::spawn(async move {
            let result = async {
                let providers = client.list_providers().await?;
                let _ = events.send(AppEvent::ProvidersLoaded(
                    providers.as_array().cloned().unwrap_or_default(),
                ));
                let profiles = client.list_profiles().await?;
                let _ = events.send(AppEvent::ProfilesLoaded(
                    profiles.as_array().cloned().unwrap_or_default(),
                ));
                training.refresh().await
            }
            .await;
            let message = match result {
                Ok(()) => String::from("Lists refreshed"),
                Err(err) => {
                    warn!("refresh failed: {}", err);
                    format!("Refresh failed: {err}")
                }
            };
            let _ = events.send(AppEvent::Status(message));
        });
    }

    pub(crate) fn toggle_theme(&mut self) {
        let theme = self.store.snapshot().theme.toggle();
        self.store.set_theme(theme);
        self.status_message = format!("Theme: {}", theme.label());
    }

    pub(crate) fn cycle_language(&mut self) {
        let language = self.store.snapshot().language.next();
        self.store.set_language(language);
        self.status_message = format!("Language: {}", language.label());
    }

    /// F4: hides the HTTP-mode notice for good.
    pub(crate) fn dismiss_http_notice(&mut self) {
        match self.store.dismiss_warning(super::state::HTTP_MODE_WARNING) {
            Ok(()) => self.status_message = String::from("Notice dismissed"),
            Err(err) => {
                warn!("failed to persist dismissal: {err:#}");
                self.status_message = String::from("Could not save dismissal");
            }
        }
    }

    /// Runs `action` in the background and reports its outcome in the status line.
    fn spawn_action<F>(&mut self, label: &'static str, action: F)
    where
        F: Future<Output = crate::backend::ApiResult<String>> + Send + 'static,
    {
        self.status_message = format!("{label}...");
        let events = self.events_tx.clone();
        tokio::spawn(async move {
            let message = match action.await {
                Ok(message) => {
                    info!("{}: {}", label, message);
                    message
                }
                Err(err) => {
                    warn!("{} failed: {}", label, err);
                    format!("{label}: {err}")
                }
            };
            let _ = events.send(AppEvent::Status(message));
        });
    }
}
