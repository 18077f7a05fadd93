use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use iw_core::Config;
use iw_weather::relay::{self, PhoneEnd};
use iw_weather::{Companion, OpenWeatherMapProvider, ProviderError, SqliteStore, WeatherSource};
use tokio_util::sync::CancellationToken;

use iw_app::{
    Activation, ConsoleDisplay, Controller, FetchPolicy, FileGlance, IntoAppError, Outcome,
    ProcessLauncher, RefreshTrigger,
};

/// Instant Weather: current conditions from your phone, cached on the watch.
#[derive(Debug, Parser)]
#[command(name = "instant-weather", version)]
struct Cli {
    /// Configuration file (defaults to the per-user config directory).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Clone, Copy, Subcommand)]
enum Command {
    /// Open the app: show the saved reading, or fetch one.
    Show,
    /// Fetch and save a reading without any UI, then exit.
    Refresh,
    /// Run the background worker that triggers `refresh` periodically.
    Worker,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    iw_core::init()?;

    let (config, _) = Config::load_validated(cli.config.as_deref())?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to create tokio runtime")?;

    match cli.command.unwrap_or(Command::Show) {
        Command::Show => runtime.block_on(activate(&config, Activation::User)),
        Command::Refresh => runtime.block_on(activate(&config, Activation::Refresh)),
        Command::Worker => runtime.block_on(run_worker(&config, cli.config)),
    }
}

async fn activate(config: &Config, activation: Activation) -> anyhow::Result<()> {
    let store = SqliteStore::new(config.storage_path()).context("Failed to open weather storage")?;
    let (link, phone) = relay::pair(config.fetch.outbox_capacity);
    start_companion(config, phone);

    let mut controller = Controller::new(
        FetchPolicy::from_config(config),
        store,
        link,
        Box::new(FileGlance::new(config.glance_path())),
        Box::new(ConsoleDisplay::stdout()),
    );
    cancel_on_ctrl_c(controller.shutdown_token());

    match controller.run(activation).await? {
        Outcome::Failed(e) => tracing::warn!("No weather this time: {}", e.into_app_error()),
        outcome => tracing::debug!(?outcome, "Done"),
    }
    Ok(())
}

async fn run_worker(config: &Config, config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let launcher = ProcessLauncher::current(config_path)?;
    let trigger = RefreshTrigger::new(launcher, config.refresh.interval());

    let shutdown = CancellationToken::new();
    cancel_on_ctrl_c(shutdown.clone());
    trigger.run(shutdown).await;
    Ok(())
}

/// Serve the phone end of the relay in this process. Without a usable
/// weather source the phone end is dropped and every send reports
/// "not connected".
fn start_companion(config: &Config, phone: PhoneEnd) {
    match weather_source(config) {
        Ok(source) => {
            tokio::spawn(Companion::new(phone, source).run());
        }
        Err(e) => {
            let error = e.into_app_error();
            tracing::warn!("Companion unavailable ({}): {}", error, error.user_message());
        }
    }
}

fn weather_source(config: &Config) -> Result<WeatherSource, ProviderError> {
    let companion = &config.companion;
    let Some(api_key) = companion.api_key.as_deref().filter(|_| companion.is_configured()) else {
        return Err(ProviderError::NotConfigured(
            "companion.api_key (or OPENWEATHERMAP_API_KEY)".to_string(),
        ));
    };

    Ok(WeatherSource::OpenWeatherMap {
        provider: OpenWeatherMapProvider::new(companion.api_url.clone(), api_key)?,
        latitude: companion.latitude,
        longitude: companion.longitude,
    })
}

fn cancel_on_ctrl_c(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            token.cancel();
        }
    });
}
