//! OpenWeatherMap current-conditions lookup, run on the phone side.

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

use crate::error::ProviderError;

const KELVIN_OFFSET: f64 = 273.15;

/// What the phone learned about the weather, ready to be relayed.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    /// Whole degrees Celsius
    pub temperature: i32,
    /// Short label such as "Clouds"
    pub conditions: String,
    /// OpenWeatherMap condition id
    pub condition_code: i32,
}

#[derive(Debug, Deserialize)]
struct CurrentWeatherResponse {
    main: MainBlock,
    weather: Vec<ConditionBlock>,
}

#[derive(Debug, Deserialize)]
struct MainBlock {
    /// Kelvin
    temp: f64,
}

#[derive(Debug, Deserialize)]
struct ConditionBlock {
    id: i32,
    main: String,
}

#[derive(Debug, Clone)]
pub struct OpenWeatherMapProvider {
    client: Arc<Client>,
    api_url: String,
    api_key: String,
}

impl OpenWeatherMapProvider {
    pub fn new(api_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()?;

        Ok(Self {
            client: Arc::new(client),
            api_url: api_url.into(),
            api_key: api_key.into(),
        })
    }

    /// Fetch current conditions at the given coordinates.
    pub async fn current(&self, latitude: f64, longitude: f64) -> Result<Observation, ProviderError> {
        let response = self
            .client
            .get(&self.api_url)
            .query(&[
                ("lat", latitude.to_string()),
                ("lon", longitude.to_string()),
                ("appid", self.api_key.clone()),
            ])
            .send()
            .await?;

        match response.status() {
            StatusCode::UNAUTHORIZED => return Err(ProviderError::Unauthorized),
            status if !status.is_success() => return Err(ProviderError::Status(status.as_u16())),
            _ => {}
        }

        let body: CurrentWeatherResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;
        tracing::debug!(?body, "OpenWeatherMap response");

        parse_observation(body)
    }
}

fn parse_observation(body: CurrentWeatherResponse) -> Result<Observation, ProviderError> {
    let condition = body
        .weather
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::Parse("response has no weather entries".into()))?;

    Ok(Observation {
        temperature: kelvin_to_celsius(body.main.temp),
        conditions: condition.main,
        condition_code: condition.id,
    })
}

/// Kelvin to whole degrees Celsius, rounding half away from zero.
pub fn kelvin_to_celsius(kelvin: f64) -> i32 {
    (kelvin - KELVIN_OFFSET).round() as i32
}
