//! Background refresh trigger.
//!
//! Holds no weather data and never touches the relay: on each tick it asks
//! the launcher to start the app in refresh mode, and that process does the
//! fetch and the write.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use anyhow::Context;
use tokio::process::Command;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Starts the foreground process for a refresh pass.
pub trait Launcher {
    fn launch_refresh(&self) -> anyhow::Result<()>;
}

/// Launches `<exe> [--config PATH] refresh` as a detached child process.
///
/// Must be used from inside a tokio runtime, which reaps the children.
#[derive(Debug, Clone)]
pub struct ProcessLauncher {
    exe: PathBuf,
    config_path: Option<PathBuf>,
}

impl ProcessLauncher {
    pub fn new(exe: PathBuf, config_path: Option<PathBuf>) -> Self {
        Self { exe, config_path }
    }

    /// Launcher for the currently running executable.
    pub fn current(config_path: Option<PathBuf>) -> anyhow::Result<Self> {
        let exe = std::env::current_exe().context("Failed to locate current executable")?;
        Ok(Self::new(exe, config_path))
    }
}

impl Launcher for ProcessLauncher {
    fn launch_refresh(&self) -> anyhow::Result<()> {
        let mut command = Command::new(&self.exe);
        if let Some(path) = &self.config_path {
            command.arg("--config").arg(path);
        }
        command.arg("refresh").stdin(Stdio::null());

        let child = command
            .spawn()
            .with_context(|| format!("Failed to launch {}", self.exe.display()))?;
        tracing::debug!(pid = child.id(), "Launched refresh process");
        Ok(())
    }
}

/// Periodic timer that requests a refresh activation on every tick.
pub struct RefreshTrigger<L> {
    launcher: L,
    interval: Duration,
}

impl<L: Launcher> RefreshTrigger<L> {
    pub fn new(launcher: L, interval: Duration) -> Self {
        Self { launcher, interval }
    }

    /// Tick until `shutdown` is cancelled. Returns how many launches
    /// succeeded.
    ///
    /// The first tick fires one full interval after start. Ticks missed
    /// while the process was suspended are skipped rather than replayed.
    /// A zero interval launches nothing and returns at once.
    pub async fn run(&self, shutdown: CancellationToken) -> u64 {
        if self.interval.is_zero() {
            tracing::warn!("Refresh interval is zero, worker not started");
            return 0;
        }

        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!(interval_secs = self.interval.as_secs(), "Refresh worker started");
        let mut launched = 0;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => match self.launcher.launch_refresh() {
                    Ok(()) => {
                        launched += 1;
                        tracing::info!(launched, "Refresh activation requested");
                    }
                    Err(e) => tracing::warn!("Refresh launch failed: {:#}", e),
                },
            }
        }

        tracing::info!(launched, "Refresh worker stopped");
        launched
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[derive(Clone, Default)]
    struct CountingLauncher {
        calls: Arc<AtomicU32>,
        fail: bool,
    }

    impl Launcher for CountingLauncher {
        fn launch_refresh(&self) -> anyhow::Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                anyhow::bail!("no such process");
            }
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_launches_once_per_interval() {
        let launcher = CountingLauncher::default();
        let calls = launcher.calls.clone();
        let trigger = RefreshTrigger::new(launcher, Duration::from_secs(3600));
        let shutdown = CancellationToken::new();

        let stopper = shutdown.clone();
        tokio::spawn(async move {
            // Just past the third tick
            tokio::time::sleep(Duration::from_secs(3 * 3600 + 1)).await;
            stopper.cancel();
        });

        let launched = trigger.run(shutdown).await;
        assert_eq!(launched, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_launch_failures_do_not_stop_the_worker() {
        let launcher = CountingLauncher {
            fail: true,
            ..Default::default()
        };
        let calls = launcher.calls.clone();
        let trigger = RefreshTrigger::new(launcher, Duration::from_secs(60));
        let shutdown = CancellationToken::new();

        let stopper = shutdown.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(150)).await;
            stopper.cancel();
        });

        assert_eq!(trigger.run(shutdown).await, 0);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_launch_before_first_interval() {
        let launcher = CountingLauncher::default();
        let calls = launcher.calls.clone();
        let trigger = RefreshTrigger::new(launcher, Duration::from_secs(3600));
        let shutdown = CancellationToken::new();
        shutdown.cancel();

        assert_eq!(trigger.run(shutdown).await, 0);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_interval_returns_without_launching() {
        let launcher = CountingLauncher::default();
        let calls = launcher.calls.clone();
        let trigger = RefreshTrigger::new(launcher, Duration::ZERO);

        assert_eq!(trigger.run(CancellationToken::new()).await, 0);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_process_launcher_reports_missing_executable() {
        let launcher = ProcessLauncher::new(PathBuf::from("/nonexistent/instant-weather"), None);
        let err = launcher.launch_refresh().unwrap_err();
        assert!(err.to_string().contains("Failed to launch"));
    }
}
