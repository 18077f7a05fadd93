use iw_core::{AppError, ConfigError, WeatherError};
use iw_weather::ProviderError;

use super::IntoAppError;

impl IntoAppError for ProviderError {
    fn into_app_error(self) -> AppError {
        match self {
            ProviderError::Unauthorized => AppError::Weather(WeatherError::InvalidApiKey),
            ProviderError::Parse(s) => AppError::Weather(WeatherError::MalformedResponse(s)),
            ProviderError::NotConfigured(s) => AppError::Config(ConfigError::Invalid(s)),
            ProviderError::Network(_) | ProviderError::Status(_) => {
                AppError::Weather(WeatherError::ApiError(self.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unauthorized_maps_to_invalid_key() {
        let err = ProviderError::Unauthorized.into_app_error();
        assert_eq!(
            err.user_message(),
            "Weather API key is invalid. Check settings."
        );
    }

    #[test]
    fn test_status_maps_to_api_error() {
        let err = ProviderError::Status(503).into_app_error();
        assert!(matches!(err, AppError::Weather(WeatherError::ApiError(_))));
    }
}
