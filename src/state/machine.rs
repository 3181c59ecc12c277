//! Core timer state machine
//!
//! Handles transitions between Idle and Running, owns the elapsed counter and
//! the store, and turns ticks into display events and saves.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::events::{StateEvent, TimerCommand};
use crate::store::{format_hms, StoreError, TimerStore};

use super::ticker::{Tick, TimerRun};

/// The two possible states of the timer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum State {
    /// No tick loop exists
    #[default]
    Idle,
    /// A tick loop is counting seconds
    Running,
}

impl std::fmt::Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            State::Idle => write!(f, "Idle"),
            State::Running => write!(f, "Running"),
        }
    }
}

/// Point-in-time view of the controller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerSnapshot {
    pub state: State,
    pub elapsed_secs: u64,
    pub output_path: PathBuf,
}

/// Requests that need an answer from the controller loop
#[derive(Debug)]
pub enum ControllerRequest {
    /// Current state, counter and output path
    Snapshot { reply: oneshot::Sender<TimerSnapshot> },
    /// Persist to a different output file
    SetOutputPath {
        path: PathBuf,
        reply: oneshot::Sender<Result<PathBuf, String>>,
    },
}

/// The timer controller
pub struct TimerController {
    /// Seconds counted so far, shared with the tick loop
    elapsed: Arc<AtomicU64>,
    /// Output file and settings
    store: TimerStore,
    /// Active tick loop, if any
    run: Option<TimerRun>,
    /// Id handed to the next run, so ticks from cancelled runs are recognised
    next_run_id: u64,
    /// Ticks travel from the loop task to this controller's context
    tick_tx: mpsc::UnboundedSender<Tick>,
    tick_rx: mpsc::UnboundedReceiver<Tick>,
    /// Channel for emitting state events
    event_tx: broadcast::Sender<StateEvent>,
}

impl TimerController {
    /// Create a controller starting at `elapsed` seconds, Idle
    pub fn new(store: TimerStore, elapsed: u64, event_tx: broadcast::Sender<StateEvent>) -> Self {
        let (tick_tx, tick_rx) = mpsc::unbounded_channel();
        Self {
            elapsed: Arc::new(AtomicU64::new(elapsed)),
            store,
            run: None,
            next_run_id: 1,
            tick_tx,
            tick_rx,
            event_tx,
        }
    }

    /// Get the current state
    pub fn state(&self) -> State {
        if self.run.is_some() {
            State::Running
        } else {
            State::Idle
        }
    }

    /// Seconds counted so far
    pub fn elapsed(&self) -> u64 {
        self.elapsed.load(Ordering::SeqCst)
    }

    pub fn output_path(&self) -> &Path {
        self.store.output_path()
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        TimerSnapshot {
            state: self.state(),
            elapsed_secs: self.elapsed(),
            output_path: self.output_path().to_path_buf(),
        }
    }

    /// Run the controller, processing commands, requests and ticks
    ///
    /// Returns once the command channel closes.
    pub async fn run(
        &mut self,
        mut commands: mpsc::Receiver<TimerCommand>,
        mut requests: mpsc::Receiver<ControllerRequest>,
    ) {
        info!(elapsed_secs = self.elapsed(), "timer controller started in Idle state");
        let mut requests_open = true;

        loop {
            // Commands queued before a request are applied before it is answered
            tokio::select! {
                biased;

                Some(tick) = self.tick_rx.recv() => {
                    self.handle_tick(tick);
                }
                command = commands.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => break,
                },
                request = requests.recv(), if requests_open => match request {
                    Some(request) => self.handle_request(request),
                    None => requests_open = false,
                },
            }
        }

        info!("timer controller stopped");
    }

    /// Apply a start/stop/reset command
    pub fn handle_command(&mut self, command: TimerCommand) {
        debug!(%command, "command received");
        match command {
            TimerCommand::Start => self.start(),
            TimerCommand::Stop => self.stop(),
            TimerCommand::Reset => self.reset(),
        }
    }

    fn handle_request(&mut self, request: ControllerRequest) {
        match request {
            ControllerRequest::Snapshot { reply } => {
                let _ = reply.send(self.snapshot());
            }
            ControllerRequest::SetOutputPath { path, reply } => {
                let result = match self.set_output_path(path) {
                    Ok(warnings) if warnings.is_empty() => Ok(self.output_path().to_path_buf()),
                    Ok(warnings) => Err(warnings
                        .iter()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>()
                        .join("; ")),
                    Err(e) => Err(e.to_string()),
                };
                let _ = reply.send(result);
            }
        }
    }

    /// Begin ticking. No-op when already Running.
    pub fn start(&mut self) {
        if self.run.is_some() {
            debug!("start ignored, already running");
            return;
        }

        let run_id = self.next_run_id;
        self.next_run_id += 1;
        self.run = Some(TimerRun::spawn(
            run_id,
            Arc::clone(&self.elapsed),
            self.tick_tx.clone(),
        ));

        info!(from = %State::Idle, to = %State::Running, run_id, "state transition");
        self.emit(StateEvent::Started);
    }

    /// Stop ticking. No-op when already Idle.
    ///
    /// The current value is saved once more. A tick already past its
    /// cancellation check on another worker can still increment after this
    /// save; that tick is discarded, so the file may lag the counter by one
    /// second until the next save.
    pub fn stop(&mut self) {
        let Some(run) = self.run.take() else {
            debug!("stop ignored, already idle");
            return;
        };

        let run_id = run.id();
        drop(run.cancel());

        let elapsed_secs = self.elapsed();
        info!(from = %State::Running, to = %State::Idle, run_id, elapsed_secs, "state transition");
        self.persist(elapsed_secs);
        self.emit(StateEvent::Stopped { elapsed_secs });
    }

    /// Zero the counter, refresh the display and persist. State is unchanged.
    pub fn reset(&mut self) {
        self.elapsed.store(0, Ordering::SeqCst);
        info!(state = %self.state(), "timer reset");
        self.refresh(0);
        self.persist(0);
    }

    /// Switch to a new output file and write the current value there
    ///
    /// A relative path is rejected. Otherwise the path is adopted and any
    /// write failures are reported once each and returned.
    pub fn set_output_path(&mut self, path: PathBuf) -> Result<Vec<StoreError>, StoreError> {
        let elapsed = self.elapsed();
        let warnings = self.store.set_output_path(path, elapsed)?;

        self.emit(StateEvent::OutputPathChanged {
            path: self.output_path().to_path_buf(),
        });
        for warning in &warnings {
            self.report(warning);
        }
        Ok(warnings)
    }

    /// Stop, then save the counter and the settings
    pub fn shutdown(&mut self) {
        self.stop();
        self.persist(self.elapsed());
        if let Err(e) = self.store.save_settings() {
            self.report(&e);
        }
        info!(elapsed_secs = self.elapsed(), "timer state saved");
    }

    fn handle_tick(&mut self, tick: Tick) {
        let current = self.run.as_ref().map(TimerRun::id);
        if current != Some(tick.run_id) {
            debug!(run_id = tick.run_id, "discarding tick from cancelled run");
            return;
        }

        // Counter may have been reset between the increment and now
        let elapsed = self.elapsed();
        debug!(run_id = tick.run_id, ticked = tick.elapsed, elapsed, "tick");
        self.refresh(elapsed);
        self.persist(elapsed);
    }

    fn refresh(&self, elapsed_secs: u64) {
        self.emit(StateEvent::ElapsedChanged {
            elapsed_secs,
            display: format_hms(elapsed_secs),
        });
    }

    fn persist(&self, elapsed_secs: u64) {
        if let Err(e) = self.store.save(elapsed_secs) {
            self.report(&e);
        }
    }

    /// Surface a non-fatal error once
    fn report(&self, error: &StoreError) {
        warn!(%error, "persistence failed");
        self.emit(StateEvent::Warning {
            message: error.to_string(),
        });
    }

    fn emit(&self, event: StateEvent) {
        debug!(?event, "emitting event");
        let _ = self.event_tx.send(event);
    }
}
