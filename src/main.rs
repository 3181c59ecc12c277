//! hotkey-timer: background elapsed-time tracker
//!
//! Wires the pieces together:
//! - Global hotkey listener (Shift+1/2/3)
//! - Timer controller with its tick loop and plain-text persistence
//! - IPC server for whatever window or menu bar app renders the timer

use anyhow::Result;
use tokio::sync::{broadcast, mpsc};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use hotkey_timer::config::Config;
use hotkey_timer::events::StateEvent;
use hotkey_timer::hotkey::HotkeyListener;
use hotkey_timer::ipc::{ControlHandles, Server};
use hotkey_timer::lifecycle::ShutdownSignal;
use hotkey_timer::state::TimerController;
use hotkey_timer::store::TimerStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "hotkey-timer starting"
    );

    // Load configuration
    let config = Config::load()?;
    if let Err(e) = config.ensure_dirs() {
        warn!(?e, "data directory unavailable, persistence will fail");
    }
    info!(?config.data_dir, "configuration loaded");

    // Create shutdown signal handler
    let mut shutdown = ShutdownSignal::new()?;

    // Hotkey listener and IPC -> controller
    let (command_tx, command_rx) = mpsc::channel(32);
    let (request_tx, request_rx) = mpsc::channel(32);
    // Controller -> IPC subscribers
    let (event_tx, _event_rx) = broadcast::channel::<StateEvent>(64);

    // Restore the saved output path and elapsed time
    let (store, outcome) = TimerStore::load(&config);
    for warning in &outcome.warnings {
        warn!(%warning, "timer state not fully restored");
    }
    let mut controller = TimerController::new(store, outcome.elapsed, event_tx.clone());
    info!(
        elapsed_secs = controller.elapsed(),
        output_path = %controller.output_path().display(),
        "timer restored"
    );

    // Start the hotkey listener (runs on dedicated thread)
    let mut hotkey_listener = HotkeyListener::new(command_tx.clone());
    let hotkeys_active = match hotkey_listener.start() {
        Ok(()) => true,
        Err(e) => {
            error!(?e, "failed to start hotkey listener");
            warn!("continuing without hotkey support - the timer is still controllable over IPC");
            false
        }
    };

    // Create IPC server
    let server = Server::new(
        &config.socket_path,
        ControlHandles {
            commands: command_tx,
            requests: request_tx,
            events: event_tx,
        },
    )?;
    server.set_hotkeys_active(hotkeys_active).await;

    info!("daemon initialized, entering main loop");

    tokio::select! {
        // Run the controller (processes hotkey and IPC commands, ticks)
        _ = controller.run(command_rx, request_rx) => {
            info!("timer controller exited");
        }

        // Run the IPC server (accepts client connections)
        result = server.run() => {
            if let Err(e) = result {
                error!(?e, "IPC server error");
            }
        }

        // Wait for shutdown signal
        _ = shutdown.wait() => {
            info!("shutdown signal received");
        }
    }

    // Cleanup
    info!("shutting down...");

    hotkey_listener.stop();
    controller.shutdown();
    server.shutdown().await;

    info!("hotkey-timer stopped");

    Ok(())
}
