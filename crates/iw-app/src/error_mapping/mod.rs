//! Maps weather-lifecycle errors to iw_core::AppError for consistent
//! user-facing messages. One module per source error type.

use iw_core::AppError;

mod fetch;
mod provider;
mod storage;

/// Convert a lifecycle error into the application error type.
///
/// Both sides live in other crates, so this is an extension trait rather
/// than a `From` impl.
pub trait IntoAppError {
    fn into_app_error(self) -> AppError;
}
