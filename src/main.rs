//! MIDI OBS Bridge
//!
//! Drive OBS Studio scenes, sources and audio from a MIDI controller.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use midi_obs_bridge::config::ConfigWatcher;
use midi_obs_bridge::drivers::{ObsConnection, ObsInbound};
use midi_obs_bridge::midi::input::{MidiEvent, MidiInputDriver};
use midi_obs_bridge::{Router, SharedBindings, StartupError};

/// MIDI OBS Bridge - control OBS Studio from a MIDI controller
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (YAML, or JSON with a .json extension)
    #[arg(env = "MIDI_OBS_CONFIG", default_value = "config.yaml")]
    config: String,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Also write logs to this file
    #[arg(long, env = "LOG_FILE")]
    log_file: Option<PathBuf>,

    /// Override the OBS WebSocket host from the config file
    #[arg(long, env = "OBS_HOST")]
    obs_host: Option<String>,

    /// Override the OBS WebSocket port from the config file
    #[arg(long, env = "OBS_PORT")]
    obs_port: Option<u16>,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load environment variables
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let _log_guard = match init_logging(&args.log_level, args.log_file.as_deref()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    match run_app(args).await {
        Ok(()) => {
            info!("Exiting...");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{:#}", e);
            match e.downcast_ref::<StartupError>() {
                Some(startup) => ExitCode::from(startup.exit_code()),
                None => ExitCode::FAILURE,
            }
        }
    }
}

async fn run_app(args: Args) -> Result<()> {
    info!("Starting MIDI OBS bridge...");
    info!("Configuration file: {}", args.config);

    let (mut config_watcher, mut config) = ConfigWatcher::new(args.config.clone())
        .await
        .map_err(|e| StartupError::Config {
            path: args.config.clone(),
            reason: format!("{:#}", e),
        })?;

    if let Some(host) = args.obs_host {
        config.obs.host = host;
    }
    if let Some(port) = args.obs_port {
        config.obs.port = port;
    }

    let problems = config.report_binding_problems();
    info!(
        "Successfully parsed config file: {} binding(s), {} problem(s)",
        config.bindings.len(),
        problems
    );

    let bindings = SharedBindings::new(config.bindings.clone());

    // MIDI first: without the controller there is nothing to do
    let (midi_tx, mut midi_rx) = mpsc::channel::<MidiEvent>(1000);
    let mut midi = MidiInputDriver::connect(&config.midi.input_port, midi_tx)?;
    info!("Listening on MIDI port '{}'", midi.port_name());

    let (obs_tx, mut obs_rx) = mpsc::channel::<ObsInbound>(1000);
    let (obs, sender) = match ObsConnection::connect(&config.obs, obs_tx).await {
        Ok(connected) => connected,
        Err(e) => {
            midi.close();
            return Err(e.into());
        }
    };

    let router = Router::new(Arc::new(bindings.clone()), Arc::new(sender));
    info!("Ready to process MIDI events!");

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            Some(event) = midi_rx.recv() => {
                let outcome = router.on_midi(&event.message);
                debug!("Dispatch {:?} in {:?}", outcome, event.timestamp.elapsed());
            }

            inbound = obs_rx.recv() => match inbound {
                Some(ObsInbound::Message(text)) => {
                    router.on_obs_message(&text);
                }
                Some(ObsInbound::Closed(reason)) => {
                    error!(
                        "OBS has disconnected, timed out or isn't running{}",
                        reason.map(|r| format!(" ({})", r)).unwrap_or_default()
                    );
                    error!("Please reopen OBS and restart the bridge");
                    break;
                }
                None => break,
            },

            Some(new_config) = config_watcher.next_config() => {
                if new_config.midi.input_port != config.midi.input_port {
                    warn!("MIDI port change to '{}' needs a restart", new_config.midi.input_port);
                }
                bindings.replace(new_config.bindings);
                if bindings.is_empty() {
                    warn!("Reloaded config has no bindings, MIDI input will be ignored");
                } else {
                    info!("✅ Binding table reloaded ({} binding(s))", bindings.len());
                }
            }

            _ = &mut shutdown => {
                info!("Shutdown signal received, stopping event loop");
                break;
            }
        }
    }

    // Cleanup: both sides are always attempted
    info!("Shutting down...");
    midi.close();
    info!("Closing OBS connection to {}", obs.url());
    obs.close().await;
    router.shutdown();

    Ok(())
}

/// Console logging, plus a plain-text file when `log_file` is set.
///
/// The returned guard flushes the file writer when dropped.
fn init_logging(level: &str, log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let file_name = path
                .file_name()
                .with_context(|| format!("Log file path has no file name: {}", path.display()))?;

            let appender = tracing_appender::rolling::never(dir, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_writer(writer).with_ansi(false)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_thread_names(false),
        )
        .with(file_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(guard)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to install CTRL+C signal handler: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Keyboard interrupt received, gracefully exiting...");
}
