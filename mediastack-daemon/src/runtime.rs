use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::broadcast;

use mediastack_core::{config, StackConfig};
use mediastack_sync::{pipeline, RunOptions, SyncReport};

use crate::error::{io_err, DaemonError};
use crate::log_rotation::{rotate_daemon_log, RotationPolicy};
use crate::paths::{log_path, logs_dir, MIN_INTERVAL, ROTATION_CHECK};

#[derive(Debug, Clone)]
pub struct DaemonOptions {
    pub interval: Duration,
    /// Re-read before every iteration; `None` re-resolves from the cwd.
    pub config_path: Option<PathBuf>,
    /// Log to `<state_dir>/logs/daemon.log` instead of stderr.
    pub log_to_file: bool,
    pub json_logs: bool,
    pub rotation: RotationPolicy,
}

impl Default for DaemonOptions {
    fn default() -> Self {
        Self {
            interval: crate::paths::DEFAULT_INTERVAL,
            config_path: None,
            log_to_file: false,
            json_logs: false,
            rotation: RotationPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct IterationSummary {
    pub iteration: u64,
    pub status: String,
    pub exit_code: i32,
    pub duration_ms: u128,
}

impl IterationSummary {
    fn from_report(iteration: u64, report: &SyncReport, elapsed: Duration) -> Self {
        Self {
            iteration,
            status: report.status_label().to_string(),
            exit_code: report.exit_code(false),
            duration_ms: elapsed.as_millis(),
        }
    }
}

/// Re-reads the config each iteration, keeping the last good one on error.
///
/// The config usually lives in the tracked repository, so an apply can
/// change it between iterations.
#[derive(Debug)]
pub struct ConfigReloader {
    explicit: Option<PathBuf>,
    last_good: Mutex<StackConfig>,
}

impl ConfigReloader {
    pub fn new(explicit: Option<PathBuf>, initial: StackConfig) -> Self {
        Self {
            explicit,
            last_good: Mutex::new(initial),
        }
    }

    pub fn current(&self) -> StackConfig {
        let mut guard = self.last_good.lock().unwrap_or_else(|p| p.into_inner());
        match config::resolve(self.explicit.as_deref()) {
            Ok(fresh) => *guard = fresh,
            Err(err) => tracing::warn!(error = %err, "config reload failed, keeping previous"),
        }
        guard.clone()
    }
}

/// Start the scheduler and block the current thread until it exits.
pub fn start_blocking(config: StackConfig, options: DaemonOptions) -> Result<(), DaemonError> {
    if options.interval < MIN_INTERVAL {
        return Err(DaemonError::InvalidInterval(format!(
            "{}s is below the minimum of {}s",
            options.interval.as_secs(),
            MIN_INTERVAL.as_secs()
        )));
    }

    let log_file = if options.log_to_file {
        let dir = logs_dir(&config.state_path());
        std::fs::create_dir_all(&dir).map_err(|e| io_err(&dir, e))?;
        Some(log_path(&config.state_path()))
    } else {
        None
    };
    init_tracing("info", log_file.as_deref(), options.json_logs);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| io_err("tokio-runtime", e))?;
    runtime.block_on(run(config, options))
}

/// Run sync iterations every `options.interval` until ctrl-c.
pub async fn run(config: StackConfig, options: DaemonOptions) -> Result<(), DaemonError> {
    let state_dir = config.state_path();
    let reloader = Arc::new(ConfigReloader::new(options.config_path.clone(), config));
    let iteration = Arc::new(move || {
        let config = reloader.current();
        pipeline::run(&config, RunOptions::default())
    });

    tracing::info!(
        interval_secs = options.interval.as_secs(),
        state_dir = %state_dir.display(),
        "mediastack daemon started"
    );

    let (shutdown_tx, _) = broadcast::channel::<()>(4);

    let scheduler_handle = {
        let shutdown = shutdown_tx.clone();
        let interval = options.interval;
        tokio::spawn(async move {
            let result = scheduler_task(interval, iteration, shutdown.subscribe()).await;
            let _ = shutdown.send(());
            result.map(|_| ())
        })
    };

    let rotation_handle = {
        let shutdown = shutdown_tx.clone();
        let policy = options.rotation;
        tokio::spawn(async move {
            let result = log_rotation_task(state_dir, policy, shutdown.subscribe()).await;
            let _ = shutdown.send(());
            result
        })
    };

    let signal_handle = {
        let shutdown = shutdown_tx.clone();
        tokio::spawn(async move {
            let mut shutdown_rx = shutdown.subscribe();
            tokio::select! {
                _ = shutdown_rx.recv() => Ok(()),
                signal = tokio::signal::ctrl_c() => {
                    match signal {
                        Ok(()) => {
                            tracing::info!("received ctrl-c, finishing current iteration");
                            let _ = shutdown.send(());
                            Ok(())
                        }
                        Err(err) => Err(DaemonError::Task {
                            task: "signal_handler",
                            reason: format!("ctrl-c handler failed: {err}"),
                        }),
                    }
                }
            }
        })
    };

    let (scheduler_result, rotation_result, signal_result) =
        tokio::join!(scheduler_handle, rotation_handle, signal_handle);

    handle_join("scheduler", scheduler_result)?;
    handle_join("log_rotation", rotation_result)?;
    handle_join("signal_handler", signal_result)?;
    tracing::info!("mediastack daemon stopped");
    Ok(())
}

/// Run `iteration` on every tick, one at a time. Returns the iteration count.
///
/// A tick that arrives while an iteration is still running is delayed, never
/// run concurrently.
async fn scheduler_task<F>(
    interval: Duration,
    iteration: Arc<F>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<u64, DaemonError>
where
    F: Fn() -> SyncReport + Send + Sync + 'static,
{
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    let mut count = 0u64;

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            _ = ticker.tick() => {
                count += 1;
                let started = Instant::now();
                let job = iteration.clone();
                match tokio::task::spawn_blocking(move || job()).await {
                    Ok(report) => {
                        let summary = IterationSummary::from_report(count, &report, started.elapsed());
                        tracing::info!(
                            iteration = summary.iteration,
                            status = %summary.status,
                            exit_code = summary.exit_code,
                            duration_ms = summary.duration_ms,
                            "sync iteration finished",
                        );
                    }
                    Err(err) => {
                        tracing::error!(iteration = count, error = %err, "sync iteration aborted");
                    }
                }
            }
        }
    }

    Ok(count)
}

async fn log_rotation_task(
    state_dir: PathBuf,
    policy: RotationPolicy,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), DaemonError> {
    let mut interval = tokio::time::interval(ROTATION_CHECK);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    interval.tick().await;

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            _ = interval.tick() => {
                let state_dir = state_dir.clone();
                tokio::task::spawn_blocking(move || rotate_daemon_log(&state_dir, policy))
                    .await
                    .ok();
            }
        }
    }
    Ok(())
}

fn handle_join(
    task: &'static str,
    result: Result<Result<(), DaemonError>, tokio::task::JoinError>,
) -> Result<(), DaemonError> {
    match result {
        Ok(inner) => inner,
        Err(err) => Err(DaemonError::Task {
            task,
            reason: err.to_string(),
        }),
    }
}

/// Install the global subscriber: `RUST_LOG` filter (else `default_filter`),
/// plain or JSON lines, to stderr or appended to `log_file`.
///
/// Also captures records from crates logging through the `log` facade.
pub fn init_tracing(default_filter: &str, log_file: Option<&Path>, json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let builder = fmt().with_env_filter(filter).with_target(false);
    let _ = match (log_file, json) {
        (Some(path), true) => builder.json().with_writer(file_writer(path)).try_init(),
        (Some(path), false) => builder
            .with_ansi(false)
            .with_writer(file_writer(path))
            .try_init(),
        (None, true) => builder.json().with_writer(std::io::stderr).try_init(),
        (None, false) => builder.with_writer(std::io::stderr).try_init(),
    };
}

/// Reopens the file per event so rotation never leaves a stale handle.
fn file_writer(path: &Path) -> impl Fn() -> Box<dyn Write> + Send + Sync + 'static {
    let path = path.to_path_buf();
    move || match OpenOptions::new().create(true).append(true).open(&path) {
        Ok(file) => Box::new(file) as Box<dyn Write>,
        Err(_) => Box::new(std::io::stderr()),
    }
}
