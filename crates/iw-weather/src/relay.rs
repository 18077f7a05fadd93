//! Phone-relay channel: the lossy message link between the watch and the
//! companion process on the phone that performs the internet request.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::ChannelError;
use crate::types::{bounded_text, WeatherReading};

/// Marker byte meaning "weather requested".
pub const WEATHER_REQUESTED: u8 = 1;

/// Keys understood by both ends of the relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageKey {
    Temperature,
    Conditions,
    ConditionsId,
    RequestWeather,
    RequestId,
}

/// A single dictionary value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Tuple {
    Int(i32),
    Str(String),
    Byte(u8),
}

impl Tuple {
    pub fn as_int(&self) -> Option<i32> {
        match self {
            Tuple::Int(v) => Some(*v),
            Tuple::Byte(b) => Some(i32::from(*b)),
            Tuple::Str(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Tuple::Str(s) => Some(s),
            _ => None,
        }
    }
}

/// A relay message: a small keyed dictionary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Dictionary(BTreeMap<MessageKey, Tuple>);

impl Dictionary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, key: MessageKey, value: Tuple) -> Self {
        self.0.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: MessageKey, value: Tuple) {
        self.0.insert(key, value);
    }

    pub fn find(&self, key: MessageKey) -> Option<&Tuple> {
        self.0.get(&key)
    }

    pub fn int(&self, key: MessageKey) -> Option<i32> {
        self.find(key).and_then(Tuple::as_int)
    }

    pub fn string(&self, key: MessageKey) -> Option<&str> {
        self.find(key).and_then(Tuple::as_str)
    }

    /// The handshake or request the watch sends, tagged with its request id.
    pub fn weather_request(request_id: u32) -> Self {
        Self::new()
            .with(MessageKey::RequestWeather, Tuple::Byte(WEATHER_REQUESTED))
            .with(MessageKey::RequestId, Tuple::Int(request_id as i32))
    }

    /// The phone's answer to a request.
    pub fn weather_response(
        temperature: i32,
        conditions: &str,
        condition_code: i32,
        request_id: Option<i32>,
    ) -> Self {
        let mut message = Self::new()
            .with(MessageKey::Temperature, Tuple::Int(temperature))
            .with(MessageKey::Conditions, Tuple::Str(bounded_text(conditions)))
            .with(MessageKey::ConditionsId, Tuple::Int(condition_code));
        if let Some(id) = request_id {
            message.insert(MessageKey::RequestId, Tuple::Int(id));
        }
        message
    }

    /// Parse a weather reading. Temperature, conditions and condition code
    /// are all required.
    pub fn reading(&self) -> Option<WeatherReading> {
        let temperature = self.int(MessageKey::Temperature)?;
        let conditions = self.string(MessageKey::Conditions)?;
        let code = self.int(MessageKey::ConditionsId)?;
        Some(WeatherReading::new(temperature, code, conditions))
    }

    /// True if the message carries any weather field at all.
    pub fn has_weather_fields(&self) -> bool {
        self.find(MessageKey::Temperature).is_some()
            || self.find(MessageKey::Conditions).is_some()
            || self.find(MessageKey::ConditionsId).is_some()
    }
}

/// Why a relay message didn't make it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayFailure {
    NotConnected,
    Busy,
    BufferOverflow,
    Closed,
}

impl fmt::Display for RelayFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            RelayFailure::NotConnected => "phone not connected",
            RelayFailure::Busy => "outbox busy",
            RelayFailure::BufferOverflow => "message too large",
            RelayFailure::Closed => "channel closed",
        };
        f.write_str(reason)
    }
}

/// Events the relay delivers to the watch side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayEvent {
    /// A message arrived from the phone
    Received(Dictionary),
    /// The phone acknowledged an outbound message
    Sent,
    /// An outbound message was not delivered
    SendFailed(RelayFailure),
    /// An inbound message was lost before the watch could read it
    Dropped(RelayFailure),
}

/// Outbound half of the relay as seen by a fetch session.
pub trait RelayChannel {
    /// Queue a message for the phone. Fails immediately if it can't be queued.
    fn send(&mut self, message: Dictionary) -> Result<(), ChannelError>;

    /// Start delivering inbound events.
    fn register_inbox(&mut self);

    /// Stop delivering inbound events; anything arriving is discarded.
    fn deregister_inbox(&mut self);

    fn is_registered(&self) -> bool;
}

/// Watch end of an in-process relay.
#[derive(Debug)]
pub struct RelayLink {
    outbox: mpsc::Sender<Dictionary>,
    events_tx: mpsc::UnboundedSender<RelayEvent>,
    events: mpsc::UnboundedReceiver<RelayEvent>,
    registered: bool,
}

/// Phone end of an in-process relay.
#[derive(Debug)]
pub struct PhoneEnd {
    requests: mpsc::Receiver<Dictionary>,
    events: mpsc::UnboundedSender<RelayEvent>,
}

/// Create a connected watch/phone pair whose outbox holds `outbox_capacity`
/// messages.
pub fn pair(outbox_capacity: usize) -> (RelayLink, PhoneEnd) {
    let (outbox, requests) = mpsc::channel(outbox_capacity.max(1));
    let (events_tx, events) = mpsc::unbounded_channel();

    let link = RelayLink {
        outbox,
        events_tx: events_tx.clone(),
        events,
        registered: false,
    };
    let phone = PhoneEnd {
        requests,
        events: events_tx,
    };
    (link, phone)
}

impl RelayLink {
    /// Next event for the registered inbox. Events arriving while no inbox
    /// is registered are discarded.
    pub async fn next_event(&mut self) -> Option<RelayEvent> {
        loop {
            let event = self.events.recv().await?;
            if self.registered {
                return Some(event);
            }
            tracing::debug!(?event, "Discarding relay event with no registered inbox");
        }
    }
}

impl RelayChannel for RelayLink {
    fn send(&mut self, message: Dictionary) -> Result<(), ChannelError> {
        match self.outbox.try_send(message) {
            Ok(()) => {
                // In-process delivery: the ack is immediate
                let _ = self.events_tx.send(RelayEvent::Sent);
                Ok(())
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                Err(ChannelError::SendFailed(RelayFailure::Busy))
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                Err(ChannelError::SendFailed(RelayFailure::NotConnected))
            }
        }
    }

    fn register_inbox(&mut self) {
        // A fresh registration never sees messages that arrived before it
        while let Ok(event) = self.events.try_recv() {
            tracing::debug!(?event, "Discarding relay event queued before registration");
        }
        self.registered = true;
    }

    fn deregister_inbox(&mut self) {
        self.registered = false;
    }

    fn is_registered(&self) -> bool {
        self.registered
    }
}

impl PhoneEnd {
    /// Wait for the next message from the watch.
    pub async fn recv(&mut self) -> Option<Dictionary> {
        self.requests.recv().await
    }

    /// Send a message to the watch. Returns false if the watch is gone.
    pub fn reply(&self, message: Dictionary) -> bool {
        self.events.send(RelayEvent::Received(message)).is_ok()
    }

    /// Simulate the watch losing an inbound message.
    pub fn drop_inbound(&self, reason: RelayFailure) {
        let _ = self.events.send(RelayEvent::Dropped(reason));
    }

    /// Report that a previously queued outbound message never arrived.
    pub fn fail_outbound(&self, reason: RelayFailure) {
        let _ = self.events.send(RelayEvent::SendFailed(reason));
    }
}
