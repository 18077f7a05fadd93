//! One outstanding weather request to the phone.
//!
//! A session sends a handshake over the relay, sends the real request once
//! the phone is ready, and resolves its completion exactly once: with a reading, on
//! timeout, or when abandoned. Sessions are single-use; retrying means
//! creating a new session with a new id.

use std::fmt;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::error::{ChannelError, FetchError};
use crate::relay::{Dictionary, MessageKey, RelayChannel, RelayEvent};
use crate::types::WeatherReading;

/// Identifies a session on the wire (echoed by the phone as `REQUEST_ID`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub u32);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Opaque handle for the UI context (screen) that started a fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextId(pub u32);

pub type FetchResult = Result<WeatherReading, FetchError>;

/// Single-use completion handler.
pub struct Completion(Box<dyn FnOnce(SessionId, FetchResult) + Send>);

impl Completion {
    pub fn new(f: impl FnOnce(SessionId, FetchResult) + Send + 'static) -> Self {
        Self(Box::new(f))
    }

    /// Deliver the result as a tagged message on `tx`.
    pub fn channel(tx: mpsc::UnboundedSender<(SessionId, FetchResult)>) -> Self {
        Self::new(move |id, result| {
            if tx.send((id, result)).is_err() {
                tracing::debug!(session = %id, "Fetch result receiver gone");
            }
        })
    }

    fn complete(self, id: SessionId, result: FetchResult) {
        (self.0)(id, result)
    }
}

impl fmt::Debug for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Completion")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchState {
    Idle,
    AwaitingHandshake,
    AwaitingResponse,
    Completed,
    TimedOut,
    Abandoned,
}

impl FetchState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::TimedOut | Self::Abandoned)
    }

    fn is_awaiting(self) -> bool {
        matches!(self, Self::AwaitingHandshake | Self::AwaitingResponse)
    }
}

/// Why an inbound event didn't affect the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// The session isn't waiting on the phone (not started, failed, or finished)
    NotAwaiting,
    /// Carried some weather fields but not all of them
    Malformed,
    /// A reading tagged for a different session
    StaleRequest,
    /// Nothing this session cares about in its current state
    Unrelated,
}

/// Outcome of feeding an inbound event to a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// The phone is ready; the weather request went out
    RequestSent,
    /// A reading was delivered to the completion
    Delivered,
    Ignored(IgnoreReason),
}

pub struct FetchSession {
    id: SessionId,
    context: Option<ContextId>,
    state: FetchState,
    completion: Option<Completion>,
    timeout: Duration,
    deadline: Option<Instant>,
}

impl fmt::Debug for FetchSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchSession")
            .field("id", &self.id)
            .field("context", &self.context)
            .field("state", &self.state)
            .field("deadline", &self.deadline)
            .finish()
    }
}

impl FetchSession {
    pub fn new(
        id: SessionId,
        context: Option<ContextId>,
        timeout: Duration,
        completion: Completion,
    ) -> Self {
        Self {
            id,
            context,
            state: FetchState::Idle,
            completion: Some(completion),
            timeout,
            deadline: None,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn context(&self) -> Option<ContextId> {
        self.context
    }

    pub fn state(&self) -> FetchState {
        self.state
    }

    pub fn is_finished(&self) -> bool {
        self.state.is_terminal()
    }

    /// When the session times out, if it's still live.
    pub fn deadline(&self) -> Option<Instant> {
        if self.state.is_terminal() {
            None
        } else {
            self.deadline
        }
    }

    /// Register for inbound messages and send the handshake.
    ///
    /// The deadline is armed by the first call and kept across calls, so a
    /// caller retrying after a channel failure doesn't extend it. On a send
    /// failure the session returns to `Idle`.
    pub fn begin<R: RelayChannel + ?Sized>(
        &mut self,
        relay: &mut R,
        now: Instant,
    ) -> Result<(), FetchError> {
        match self.state {
            FetchState::Idle => {}
            FetchState::AwaitingHandshake | FetchState::AwaitingResponse => return Ok(()),
            _ => return Err(FetchError::Finished),
        }

        if !relay.is_registered() {
            relay.register_inbox();
        }
        let deadline = *self.deadline.get_or_insert(now + self.timeout);

        tracing::debug!(session = %self.id, ?deadline, "Sending weather handshake");
        self.send(relay)?;
        self.state = FetchState::AwaitingHandshake;
        Ok(())
    }

    /// Feed one relay event to the session.
    ///
    /// Channel failures come back as `Err` and are never fatal: a failed
    /// send returns the session to `Idle`, a dropped inbound message leaves
    /// it waiting. An earlier message may still have reached the phone, so
    /// an `Idle` session with a running deadline accepts a reading tagged
    /// with its own id.
    pub fn handle_event<R: RelayChannel + ?Sized>(
        &mut self,
        relay: &mut R,
        event: &RelayEvent,
    ) -> Result<Delivery, FetchError> {
        if let RelayEvent::Received(message) = event {
            if self.is_correlated_reply_while_idle(message) {
                return self.handle_message(relay, message);
            }
        }
        if !self.state.is_awaiting() {
            return Ok(Delivery::Ignored(IgnoreReason::NotAwaiting));
        }

        match event {
            RelayEvent::Received(message) => self.handle_message(relay, message),
            RelayEvent::Sent => self.handle_ack(relay),
            RelayEvent::SendFailed(reason) => {
                tracing::warn!(session = %self.id, %reason, "Outbox send failed");
                self.state = FetchState::Idle;
                Err(ChannelError::SendFailed(*reason).into())
            }
            RelayEvent::Dropped(reason) => {
                tracing::warn!(session = %self.id, %reason, "Inbound message dropped");
                Err(ChannelError::Dropped(*reason).into())
            }
        }
    }

    /// Time the session out if its deadline has passed. Returns true if
    /// this call fired the completion.
    pub fn check_deadline<R: RelayChannel + ?Sized>(&mut self, relay: &mut R, now: Instant) -> bool {
        match self.deadline() {
            Some(deadline) if now >= deadline => {
                tracing::info!(session = %self.id, "Weather fetch timed out");
                self.finish(relay, FetchState::TimedOut, Err(FetchError::Timeout));
                true
            }
            _ => false,
        }
    }

    /// Give up on the session, e.g. because its screen went away.
    pub fn abandon<R: RelayChannel + ?Sized>(&mut self, relay: &mut R) {
        if !self.state.is_terminal() {
            tracing::debug!(session = %self.id, "Abandoning weather fetch");
            self.finish(relay, FetchState::Abandoned, Err(FetchError::Abandoned));
        }
    }

    fn is_correlated_reply_while_idle(&self, message: &Dictionary) -> bool {
        self.state == FetchState::Idle
            && self.deadline.is_some()
            && message.int(MessageKey::RequestId) == Some(self.id.0 as i32)
    }

    fn handle_message<R: RelayChannel + ?Sized>(
        &mut self,
        relay: &mut R,
        message: &Dictionary,
    ) -> Result<Delivery, FetchError> {
        if let Some(reading) = message.reading() {
            if let Some(request_id) = message.int(MessageKey::RequestId) {
                if request_id != self.id.0 as i32 {
                    tracing::debug!(session = %self.id, request_id, "Ignoring stale response");
                    return Ok(Delivery::Ignored(IgnoreReason::StaleRequest));
                }
            }

            tracing::info!(
                session = %self.id,
                temperature = reading.temperature(),
                conditions = %reading.condition_text(),
                "Weather received"
            );
            self.finish(relay, FetchState::Completed, Ok(reading));
            return Ok(Delivery::Delivered);
        }

        if message.has_weather_fields() {
            tracing::warn!(session = %self.id, ?message, "Ignoring malformed weather response");
            return Ok(Delivery::Ignored(IgnoreReason::Malformed));
        }

        // Anything else from the phone means it's listening
        self.handle_ack(relay)
    }

    fn handle_ack<R: RelayChannel + ?Sized>(&mut self, relay: &mut R) -> Result<Delivery, FetchError> {
        if self.state != FetchState::AwaitingHandshake {
            return Ok(Delivery::Ignored(IgnoreReason::Unrelated));
        }

        tracing::debug!(session = %self.id, "Handshake acknowledged, requesting weather");
        self.send(relay)?;
        self.state = FetchState::AwaitingResponse;
        Ok(Delivery::RequestSent)
    }

    fn send<R: RelayChannel + ?Sized>(&mut self, relay: &mut R) -> Result<(), FetchError> {
        relay
            .send(Dictionary::weather_request(self.id.0))
            .map_err(|e| {
                tracing::warn!(session = %self.id, error = %e, "Weather request not sent");
                self.state = FetchState::Idle;
                FetchError::from(e)
            })
    }

    fn finish<R: RelayChannel + ?Sized>(
        &mut self,
        relay: &mut R,
        terminal: FetchState,
        result: FetchResult,
    ) {
        relay.deregister_inbox();
        // Taken before the call so nothing can deliver twice
        if let Some(completion) = self.completion.take() {
            completion.complete(self.id, result);
        }
        self.state = terminal;
    }
}
