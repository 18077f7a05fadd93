use iw_core::{AppError, StorageError as CoreStorageError};
use iw_weather::StorageError;

use super::IntoAppError;

impl IntoAppError for StorageError {
    fn into_app_error(self) -> AppError {
        let mapped = match self {
            StorageError::Full { .. } => CoreStorageError::Full(self.to_string()),
            StorageError::Unavailable(_) | StorageError::Database(_) => {
                CoreStorageError::Unavailable(self.to_string())
            }
        };
        AppError::Storage(mapped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_store_maps_to_full() {
        let err = StorageError::Full {
            needed: 10,
            available: 2,
        }
        .into_app_error();
        assert!(matches!(err, AppError::Storage(CoreStorageError::Full(_))));
        assert!(!err.is_retryable());
    }
}
