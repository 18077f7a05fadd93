//! Instant Weather application: foreground controller, screens and the
//! background refresh worker.

pub mod controller;
pub mod display;
pub mod error_mapping;
pub mod glance_file;
pub mod screens;
pub mod worker;

pub use controller::{Activation, Controller, FetchPolicy, Outcome, UiCommand};
pub use display::ConsoleDisplay;
pub use error_mapping::IntoAppError;
pub use glance_file::FileGlance;
pub use screens::{Display, Screen, ScreenHandlers, ScreenStack};
pub use worker::{Launcher, ProcessLauncher, RefreshTrigger};
