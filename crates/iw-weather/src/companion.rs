//! Phone-side companion: answers every message from the watch with the
//! current weather.

use crate::error::ProviderError;
use crate::provider::{Observation, OpenWeatherMapProvider};
use crate::relay::{Dictionary, MessageKey, PhoneEnd};

/// Where the companion gets its weather from.
#[derive(Debug, Clone)]
pub enum WeatherSource {
    OpenWeatherMap {
        provider: OpenWeatherMapProvider,
        latitude: f64,
        longitude: f64,
    },
    /// Always reports the same observation (offline use and tests)
    Fixed(Observation),
}

impl WeatherSource {
    pub async fn lookup(&self) -> Result<Observation, ProviderError> {
        match self {
            WeatherSource::OpenWeatherMap {
                provider,
                latitude,
                longitude,
            } => provider.current(*latitude, *longitude).await,
            WeatherSource::Fixed(observation) => Ok(observation.clone()),
        }
    }
}

pub struct Companion {
    phone: PhoneEnd,
    source: WeatherSource,
}

impl Companion {
    pub fn new(phone: PhoneEnd, source: WeatherSource) -> Self {
        Self { phone, source }
    }

    /// Serve requests until the watch end goes away.
    pub async fn run(mut self) {
        tracing::debug!("Companion listening");
        while let Some(request) = self.phone.recv().await {
            self.handle(&request).await;
        }
        tracing::debug!("Watch disconnected, companion stopping");
    }

    /// Answer one message. Returns true if a reply was sent.
    pub async fn handle(&self, request: &Dictionary) -> bool {
        tracing::debug!(?request, "Message received from watch");

        let observation = match self.source.lookup().await {
            Ok(observation) => observation,
            Err(e) => {
                // No reply: the watch's deadline takes care of it
                tracing::warn!("Weather lookup failed: {}", e);
                return false;
            }
        };

        let response = Dictionary::weather_response(
            observation.temperature,
            &observation.conditions,
            observation.condition_code,
            request.int(MessageKey::RequestId),
        );

        if self.phone.reply(response) {
            tracing::info!(
                temperature = observation.temperature,
                conditions = %observation.conditions,
                "Weather info sent to watch"
            );
            true
        } else {
            tracing::warn!("Error sending weather info to watch");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use crate::relay::{pair, RelayChannel, RelayEvent};

    fn clear_skies() -> Observation {
        Observation {
            temperature: 21,
            conditions: "Clear".to_string(),
            condition_code: 800,
        }
    }

    #[tokio::test]
    async fn test_fixed_source_replies_with_request_id() {
        let (mut link, phone) = pair(4);
        link.register_inbox();
        let companion = Companion::new(phone, WeatherSource::Fixed(clear_skies()));

        assert!(companion.handle(&Dictionary::weather_request(12)).await);

        let Some(RelayEvent::Received(reply)) = link.next_event().await else {
            panic!("expected a weather reply");
        };
        assert_eq!(reply.int(MessageKey::RequestId), Some(12));
        let reading = reply.reading().unwrap();
        assert_eq!(reading.temperature(), 21);
        assert_eq!(reading.condition_code(), 800);
    }

    #[tokio::test]
    async fn test_run_stops_when_watch_disconnects() {
        let (link, phone) = pair(4);
        let companion = Companion::new(phone, WeatherSource::Fixed(clear_skies()));
        let task = tokio::spawn(companion.run());

        drop(link);
        task.await.unwrap();
    }
}
