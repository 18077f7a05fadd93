use iw_core::{AppError, RelayError};
use iw_weather::{ChannelError, FetchError};

use super::IntoAppError;

impl IntoAppError for FetchError {
    fn into_app_error(self) -> AppError {
        match self {
            FetchError::Channel(ChannelError::SendFailed(reason)) => {
                AppError::Relay(RelayError::SendFailed(reason.to_string()))
            }
            FetchError::Channel(ChannelError::Dropped(reason)) => {
                AppError::Relay(RelayError::Dropped(reason.to_string()))
            }
            FetchError::Timeout => AppError::Relay(RelayError::Timeout),
            FetchError::Abandoned => AppError::Relay(RelayError::Abandoned),
            FetchError::Finished => AppError::Other(anyhow::anyhow!("{}", FetchError::Finished)),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::panic)]
    use super::*;
    use iw_weather::RelayFailure;

    #[test]
    fn test_timeout_maps_to_relay_timeout() {
        let err = FetchError::Timeout.into_app_error();
        assert!(matches!(err, AppError::Relay(RelayError::Timeout)));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_only_live_failures_are_retryable() {
        let cases = [
            (FetchError::Channel(ChannelError::SendFailed(RelayFailure::Busy)), true),
            (FetchError::Channel(ChannelError::Dropped(RelayFailure::NotConnected)), true),
            (FetchError::Timeout, true),
            (FetchError::Abandoned, false),
            (FetchError::Finished, false),
        ];
        for (error, retryable) in cases {
            let label = error.to_string();
            assert_eq!(error.into_app_error().is_retryable(), retryable, "{label}");
        }
    }

    #[test]
    fn test_channel_failures_keep_reason() {
        let err = FetchError::Channel(ChannelError::Dropped(RelayFailure::BufferOverflow))
            .into_app_error();
        match err {
            AppError::Relay(RelayError::Dropped(reason)) => assert_eq!(reason, "message too large"),
            other => panic!("unexpected mapping: {other:?}"),
        }
    }
}
