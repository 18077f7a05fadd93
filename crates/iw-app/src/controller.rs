//! Foreground controller: decides what an activation does and drives the
//! fetch session from the event loop.
//!
//! All state is owned here and touched from one task. Fetch results come
//! back as tagged messages on a channel, so a late result for a session
//! that has already been replaced is recognised by its id and dropped.

use std::time::Duration;

use chrono::Utc;
use iw_core::Config;
use iw_weather::{
    Completion, ContextId, Delivery, FetchError, FetchResult, FetchSession, GlanceSlice,
    LauncherSummary, PersistentStore, RelayEvent, RelayLink, SessionId, WeatherCache,
    WeatherReading,
};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error_mapping::IntoAppError;
use crate::screens::{
    Display, LoadingScreen, MessageScreen, Screen, ScreenStack, WeatherScreen,
};

/// Shown once the controller stops retrying.
pub const GAVE_UP_MESSAGE: &str = "Couldn't update weather info.";

/// Why the app was started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    /// Opened by the user: show something
    User,
    /// Launched by the background worker: fetch, persist, exit
    Refresh,
}

/// Retry and expiry policy for a controller.
#[derive(Debug, Clone)]
pub struct FetchPolicy {
    /// Deadline for each fetch session
    pub timeout: Duration,
    /// Sessions to try before giving up; `None` retries while the loading
    /// screen stays on top
    pub max_attempts: Option<u32>,
    /// Lifetime of the launcher summary
    pub glance_ttl: chrono::Duration,
}

impl FetchPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            timeout: config.fetch.timeout(),
            max_attempts: config.fetch.max_attempts,
            glance_ttl: chrono::Duration::minutes(i64::from(config.glance.expiry_minutes)),
        }
    }
}

/// How an activation ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// A stored reading was shown; nothing was fetched
    Cached(WeatherReading),
    /// A fresh reading was fetched (and stored, if storage allowed)
    Fetched(WeatherReading),
    /// The fetch failed and no further retry will happen
    Failed(FetchError),
    /// A retry was due but the loading screen was no longer on top
    Suppressed,
    /// The fetch was abandoned (back button or shutdown)
    Cancelled,
}

/// Input from the UI side of the event loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiCommand {
    /// Back button: pop the top screen
    Back,
    /// Cover the app with a transient message, e.g. a notification
    ShowMessage(String),
}

pub struct Controller<S> {
    policy: FetchPolicy,
    cache: WeatherCache<S>,
    relay: RelayLink,
    glance: Box<dyn LauncherSummary>,
    display: Box<dyn Display>,
    screens: ScreenStack,
    session: Option<FetchSession>,
    loading: Option<ContextId>,
    attempts: u32,
    next_session: u32,
    results_tx: mpsc::UnboundedSender<(SessionId, FetchResult)>,
    results_rx: mpsc::UnboundedReceiver<(SessionId, FetchResult)>,
    ui_tx: mpsc::UnboundedSender<UiCommand>,
    ui_rx: mpsc::UnboundedReceiver<UiCommand>,
    shutdown: CancellationToken,
}

impl<S: PersistentStore> Controller<S> {
    pub fn new(
        policy: FetchPolicy,
        store: S,
        relay: RelayLink,
        glance: Box<dyn LauncherSummary>,
        display: Box<dyn Display>,
    ) -> Self {
        let (results_tx, results_rx) = mpsc::unbounded_channel();
        let (ui_tx, ui_rx) = mpsc::unbounded_channel();
        Self {
            policy,
            cache: WeatherCache::new(store),
            relay,
            glance,
            display,
            screens: ScreenStack::new(),
            session: None,
            loading: None,
            attempts: 0,
            next_session: 0,
            results_tx,
            results_rx,
            ui_tx,
            ui_rx,
            shutdown: CancellationToken::new(),
        }
    }

    /// Sender for UI input (buttons, notifications).
    pub fn ui_handle(&self) -> mpsc::UnboundedSender<UiCommand> {
        self.ui_tx.clone()
    }

    /// Token that abandons the current fetch when cancelled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn screens(&self) -> &ScreenStack {
        &self.screens
    }

    pub fn cache(&self) -> &WeatherCache<S> {
        &self.cache
    }

    /// Handle one activation to its end.
    pub async fn run(&mut self, activation: Activation) -> anyhow::Result<Outcome> {
        tracing::info!(?activation, "Instant Weather activated");

        if activation == Activation::User {
            if let Some(reading) = self.cache.load() {
                tracing::info!(
                    temperature = reading.temperature(),
                    conditions = %reading.condition_text(),
                    "Showing cached weather"
                );
                self.show_reading(&reading);
                return Ok(Outcome::Cached(reading));
            }

            let context = self
                .screens
                .push(Screen::Loading(LoadingScreen::new()), self.display.as_mut());
            self.loading = Some(context);
        }

        self.start_session();
        let outcome = self.event_loop(activation).await;
        tracing::info!(?outcome, "Activation finished");
        Ok(outcome)
    }

    async fn event_loop(&mut self, activation: Activation) -> Outcome {
        loop {
            let deadline = self.session.as_ref().and_then(FetchSession::deadline);

            tokio::select! {
                event = self.relay.next_event() => match event {
                    Some(event) => self.dispatch(&event),
                    None => {
                        tracing::warn!("Relay closed, abandoning fetch");
                        self.abandon();
                    }
                },
                _ = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    if let Some(session) = self.session.as_mut() {
                        session.check_deadline(&mut self.relay, Instant::now());
                    }
                }
                Some(command) = self.ui_rx.recv() => self.handle_ui(command),
                _ = self.shutdown.cancelled(), if self.session.as_ref().is_some_and(|s| !s.is_finished()) => {
                    tracing::info!("Shutdown requested");
                    self.abandon();
                }
            }

            while let Ok((id, result)) = self.results_rx.try_recv() {
                if let Some(outcome) = self.on_result(activation, id, result) {
                    return outcome;
                }
            }
        }
    }

    fn dispatch(&mut self, event: &RelayEvent) {
        let Some(session) = self.session.as_mut() else {
            return;
        };

        match session.handle_event(&mut self.relay, event) {
            Ok(Delivery::Ignored(reason)) => {
                tracing::debug!(session = %session.id(), ?reason, "Relay event ignored");
            }
            Ok(_) => {}
            Err(e) => {
                // Not fatal: the session's deadline still decides when to retry
                let error = e.into_app_error();
                tracing::warn!(session = %session.id(), "Relay failure: {}", error);
                self.set_loading_status(error.user_message());
            }
        }
    }

    fn handle_ui(&mut self, command: UiCommand) {
        match command {
            UiCommand::Back => {
                let Some((id, _)) = self.screens.pop(self.display.as_mut()) else {
                    return;
                };
                if self.loading == Some(id) {
                    self.loading = None;
                    self.abandon();
                }
            }
            UiCommand::ShowMessage(text) => {
                self.screens.push(
                    Screen::Message(MessageScreen::new(text)),
                    self.display.as_mut(),
                );
            }
        }
    }

    fn on_result(
        &mut self,
        activation: Activation,
        id: SessionId,
        result: FetchResult,
    ) -> Option<Outcome> {
        if self.session.as_ref().map(FetchSession::id) != Some(id) {
            tracing::debug!(session = %id, "Dropping result of a replaced session");
            return None;
        }

        match result {
            Ok(reading) => {
                self.persist(&reading);
                self.publish_glance(&reading);
                if activation == Activation::User {
                    if let Some(context) = self.loading.take() {
                        self.screens.remove(context, self.display.as_mut());
                    }
                    self.show_reading(&reading);
                }
                Some(Outcome::Fetched(reading))
            }
            Err(FetchError::Abandoned) => Some(Outcome::Cancelled),
            Err(e) if activation == Activation::Refresh => {
                tracing::warn!(session = %id, "Background refresh failed: {}", e);
                Some(Outcome::Failed(e))
            }
            Err(e) => self.retry_or_stop(id, e),
        }
    }

    fn retry_or_stop(&mut self, id: SessionId, error: FetchError) -> Option<Outcome> {
        let Some(context) = self.loading else {
            return Some(Outcome::Failed(error));
        };

        if !self.screens.is_top(context) {
            tracing::info!(session = %id, "Loading screen not on top, retry suppressed");
            return Some(Outcome::Suppressed);
        }

        let app_error = error.clone().into_app_error();
        if !app_error.is_retryable() {
            tracing::error!(session = %id, "Weather fetch failed: {}", app_error);
            self.set_loading_status(GAVE_UP_MESSAGE);
            return Some(Outcome::Failed(error));
        }

        if let Some(max) = self.policy.max_attempts {
            if self.attempts >= max {
                tracing::error!(attempts = self.attempts, "Giving up on weather fetch");
                self.set_loading_status(GAVE_UP_MESSAGE);
                return Some(Outcome::Failed(error));
            }
        }

        self.set_loading_status(app_error.user_message());
        self.start_session();
        None
    }

    fn start_session(&mut self) {
        self.next_session = self.next_session.wrapping_add(1);
        self.attempts += 1;

        let id = SessionId(self.next_session);
        let mut session = FetchSession::new(
            id,
            self.loading,
            self.policy.timeout,
            Completion::channel(self.results_tx.clone()),
        );

        tracing::info!(session = %id, attempt = self.attempts, "Requesting weather from phone");
        if let Err(e) = session.begin(&mut self.relay, Instant::now()) {
            let error = e.into_app_error();
            tracing::warn!(session = %id, "Weather request not sent: {}", error);
            self.set_loading_status(error.user_message());
        }
        self.session = Some(session);
    }

    fn abandon(&mut self) {
        if let Some(session) = self.session.as_mut() {
            session.abandon(&mut self.relay);
        }
    }

    fn persist(&self, reading: &WeatherReading) {
        if let Err(e) = self.cache.store(reading) {
            let error = e.into_app_error();
            tracing::warn!("Weather not saved: {}", error);
        }
    }

    fn publish_glance(&mut self, reading: &WeatherReading) {
        let slice = GlanceSlice::for_reading(reading, Utc::now(), self.policy.glance_ttl);
        tracing::debug!(subtitle = %slice.subtitle, expires_at = %slice.expires_at, "Publishing app glance");
        if let Err(e) = self.glance.publish(slice) {
            tracing::warn!("Failed to publish app glance: {:#}", e);
        }
    }

    fn set_loading_status(&mut self, status: &str) {
        let Some(context) = self.loading else {
            return;
        };
        if let Some(Screen::Loading(screen)) = self.screens.get_mut(context) {
            screen.set_status(status, self.display.as_mut());
        }
    }

    fn show_reading(&mut self, reading: &WeatherReading) {
        self.screens.push(
            Screen::Weather(WeatherScreen::new(reading.clone())),
            self.display.as_mut(),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_from_default_config() {
        let config = Config::default();
        let policy = FetchPolicy::from_config(&config);
        assert_eq!(policy.timeout, Duration::from_secs(60));
        assert_eq!(policy.max_attempts, None);
        assert_eq!(policy.glance_ttl, chrono::Duration::hours(1));
    }
}
