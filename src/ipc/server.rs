//! Unix domain socket server for IPC
//!
//! A window, menu bar item or script drives the timer through this socket:
//! the same start/stop/reset intents as the hotkeys, output path changes,
//! status queries, and a subscription that pushes every state event.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::unix::OwnedReadHalf;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{broadcast, mpsc, oneshot, RwLock};
use tracing::{debug, error, info, warn};

use crate::events::{StateEvent, TimerCommand};
use crate::state::ControllerRequest;

use super::protocol::{Notification, Request, Response, TimerStatus};

/// Largest accepted frame
const MAX_FRAME_LEN: usize = 1024 * 1024;

/// Channels connecting the server to the timer controller
#[derive(Clone)]
pub struct ControlHandles {
    pub commands: mpsc::Sender<TimerCommand>,
    pub requests: mpsc::Sender<ControllerRequest>,
    pub events: broadcast::Sender<StateEvent>,
}

/// IPC Server handling client connections
pub struct Server {
    socket_path: PathBuf,
    listener: Option<UnixListener>,
    state: Arc<RwLock<ServerState>>,
    handles: ControlHandles,
    shutdown_tx: broadcast::Sender<()>,
}

/// Shared server state
struct ServerState {
    start_time: Instant,
    hotkeys_active: bool,
}

impl Server {
    /// Create a new IPC server
    pub fn new(socket_path: &Path, handles: ControlHandles) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = socket_path.parent() {
            std::fs::create_dir_all(parent).context("failed to create socket directory")?;
        }

        // Remove stale socket if it exists
        if socket_path.exists() {
            std::fs::remove_file(socket_path).context("failed to remove stale socket")?;
        }

        let listener = UnixListener::bind(socket_path).context("failed to bind Unix socket")?;

        // Set socket permissions to owner-only (0600)
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(socket_path, std::fs::Permissions::from_mode(0o600))?;
        }

        let (shutdown_tx, _) = broadcast::channel(1);

        let state = Arc::new(RwLock::new(ServerState {
            start_time: Instant::now(),
            hotkeys_active: false,
        }));

        info!(?socket_path, "IPC server listening");

        Ok(Self {
            socket_path: socket_path.to_owned(),
            listener: Some(listener),
            state,
            handles,
            shutdown_tx,
        })
    }

    /// Record whether the global hotkeys are installed
    pub async fn set_hotkeys_active(&self, active: bool) {
        self.state.write().await.hotkeys_active = active;
    }

    /// Run the server, accepting connections
    pub async fn run(&self) -> Result<()> {
        let listener = self.listener.as_ref().context("server not initialized")?;

        loop {
            match listener.accept().await {
                Ok((stream, _addr)) => {
                    debug!("client connected");
                    let state = Arc::clone(&self.state);
                    let handles = self.handles.clone();
                    let mut shutdown_rx = self.shutdown_tx.subscribe();

                    tokio::spawn(async move {
                        tokio::select! {
                            result = Self::handle_client(stream, state, handles) => {
                                if let Err(e) = result {
                                    warn!(?e, "client handler error");
                                }
                            }
                            _ = shutdown_rx.recv() => {
                                debug!("client handler shutting down");
                            }
                        }
                    });
                }
                Err(e) => {
                    error!(?e, "accept error");
                }
            }
        }
    }

    /// Handle a single client connection
    async fn handle_client(
        stream: UnixStream,
        state: Arc<RwLock<ServerState>>,
        handles: ControlHandles,
    ) -> Result<()> {
        let (reader, mut writer) = stream.into_split();

        // Frames are read on their own task so a half-read frame is never
        // abandoned when an event is pushed
        let (request_tx, mut request_rx) = mpsc::channel(8);
        let reader_task = tokio::spawn(Self::read_requests(reader, request_tx));

        let mut events: Option<broadcast::Receiver<StateEvent>> = None;

        let result = loop {
            tokio::select! {
                request = request_rx.recv() => {
                    let Some(request) = request else {
                        break Ok(());
                    };

                    let response = match request {
                        Ok(request) => {
                            debug!(?request, "received request");
                            let (response, subscribe) =
                                Self::process_request(request, &state, &handles).await;
                            if subscribe && events.is_none() {
                                events = Some(handles.events.subscribe());
                                debug!("client subscribed to notifications");
                            }
                            response
                        }
                        Err(message) => Response::error("bad_request", message),
                    };

                    if let Err(e) = Self::send_message(&mut writer, &response).await {
                        break Err(e);
                    }
                }

                event = next_event(&mut events) => match event {
                    Ok(event) => {
                        let note = Notification::Event { event };
                        if let Err(e) = Self::send_message(&mut writer, &note).await {
                            break Err(e);
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(skipped = n, "subscriber lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        events = None;
                    }
                },
            }
        };

        reader_task.abort();
        result
    }

    /// Read length-prefixed requests until the peer disconnects
    ///
    /// Undecodable frames are forwarded as `Err` so the client gets an error
    /// response instead of a dropped connection.
    async fn read_requests(
        mut reader: OwnedReadHalf,
        request_tx: mpsc::Sender<Result<Request, String>>,
    ) -> Result<()> {
        let mut len_buf = [0u8; 4];

        loop {
            // Read message length (4-byte little-endian)
            match reader.read_exact(&mut len_buf).await {
                Ok(_) => {}
                Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                    debug!("client disconnected");
                    return Ok(());
                }
                Err(e) => return Err(e.into()),
            }

            let len = u32::from_le_bytes(len_buf) as usize;
            if len > MAX_FRAME_LEN {
                warn!(len, "message too large, disconnecting");
                return Ok(());
            }

            // Read message body
            let mut msg_buf = vec![0u8; len];
            reader.read_exact(&mut msg_buf).await?;

            let request = serde_json::from_slice::<Request>(&msg_buf)
                .map_err(|e| format!("failed to parse request: {}", e));

            if request_tx.send(request).await.is_err() {
                return Ok(());
            }
        }
    }

    /// Send a length-prefixed JSON message
    async fn send_message<W, T>(writer: &mut W, msg: &T) -> Result<()>
    where
        W: AsyncWrite + Unpin,
        T: serde::Serialize,
    {
        let msg_bytes = serde_json::to_vec(msg)?;
        let msg_len = (msg_bytes.len() as u32).to_le_bytes();

        writer.write_all(&msg_len).await?;
        writer.write_all(&msg_bytes).await?;

        Ok(())
    }

    /// Process a request and return a response
    /// Returns (Response, should_subscribe)
    async fn process_request(
        request: Request,
        state: &Arc<RwLock<ServerState>>,
        handles: &ControlHandles,
    ) -> (Response, bool) {
        match request {
            Request::Ping => (Response::Pong, false),

            Request::Start => (Self::forward(TimerCommand::Start, handles).await, false),
            Request::Stop => (Self::forward(TimerCommand::Stop, handles).await, false),
            Request::Reset => (Self::forward(TimerCommand::Reset, handles).await, false),

            Request::GetStatus => {
                let (reply, rx) = oneshot::channel();
                let snapshot = match handles.requests.send(ControllerRequest::Snapshot { reply }).await {
                    Ok(()) => rx.await.ok(),
                    Err(_) => None,
                };
                let response = match snapshot {
                    Some(snapshot) => {
                        let state = state.read().await;
                        Response::Status(TimerStatus::from_snapshot(
                            snapshot,
                            state.hotkeys_active,
                            state.start_time.elapsed().as_secs(),
                        ))
                    }
                    None => Response::error("unavailable", "timer controller has stopped"),
                };
                (response, false)
            }

            Request::SetOutputPath { path } => {
                let (reply, rx) = oneshot::channel();
                let request = ControllerRequest::SetOutputPath { path, reply };
                let outcome = match handles.requests.send(request).await {
                    Ok(()) => rx.await.ok(),
                    Err(_) => None,
                };
                let response = match outcome {
                    Some(Ok(path)) => Response::OutputPath { path },
                    Some(Err(message)) => Response::error("output_path_failed", message),
                    None => Response::error("unavailable", "timer controller has stopped"),
                };
                (response, false)
            }

            Request::Subscribe => (Response::Subscribed, true),
        }
    }

    /// Hand a start/stop/reset to the controller, same as a hotkey would
    async fn forward(command: TimerCommand, handles: &ControlHandles) -> Response {
        info!(%command, "command received via IPC");
        match handles.commands.send(command).await {
            Ok(()) => Response::Ok,
            Err(_) => Response::error("unavailable", "timer controller has stopped"),
        }
    }

    /// Gracefully shutdown the server
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());

        // Remove socket file
        if self.socket_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.socket_path) {
                warn!(?e, "failed to remove socket file");
            }
        }

        info!("IPC server shutdown complete");
    }
}

/// Next event for a subscribed client; pends forever when not subscribed
async fn next_event(
    events: &mut Option<broadcast::Receiver<StateEvent>>,
) -> Result<StateEvent, broadcast::error::RecvError> {
    match events {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde::de::DeserializeOwned;
    use tempfile::TempDir;

    use super::*;
    use crate::config::Config;
    use crate::state::{State, TimerController};
    use crate::store::TimerStore;

    struct Harness {
        tmp: TempDir,
        server: Arc<Server>,
    }

    /// Real controller and server wired together in a temp directory
    async fn harness() -> Harness {
        let tmp = tempfile::tempdir().unwrap();
        let config = Config::with_data_dir(tmp.path());
        let (store, outcome) = TimerStore::load(&config);

        let (command_tx, command_rx) = mpsc::channel(32);
        let (request_tx, request_rx) = mpsc::channel(32);
        let (event_tx, _) = broadcast::channel(64);

        let mut controller = TimerController::new(store, outcome.elapsed, event_tx.clone());
        tokio::spawn(async move { controller.run(command_rx, request_rx).await });

        let handles = ControlHandles {
            commands: command_tx,
            requests: request_tx,
            events: event_tx,
        };
        let server = Arc::new(Server::new(&config.socket_path, handles).unwrap());
        let running = Arc::clone(&server);
        tokio::spawn(async move { running.run().await });

        Harness { tmp, server }
    }

    async fn connect(harness: &Harness) -> UnixStream {
        UnixStream::connect(harness.tmp.path().join("timer.sock")).await.unwrap()
    }

    async fn send(stream: &mut UnixStream, request: &Request) {
        Server::send_message(stream, request).await.unwrap();
    }

    async fn recv<T: DeserializeOwned>(stream: &mut UnixStream) -> T {
        let mut len_buf = [0u8; 4];
        stream.read_exact(&mut len_buf).await.unwrap();
        let mut buf = vec![0u8; u32::from_le_bytes(len_buf) as usize];
        stream.read_exact(&mut buf).await.unwrap();
        serde_json::from_slice(&buf).unwrap()
    }

    #[tokio::test]
    async fn test_ping() {
        let harness = harness().await;
        let mut stream = connect(&harness).await;

        send(&mut stream, &Request::Ping).await;
        assert_eq!(recv::<Response>(&mut stream).await, Response::Pong);
    }

    #[tokio::test]
    async fn test_status_reflects_commands() {
        let harness = harness().await;
        harness.server.set_hotkeys_active(true).await;
        let mut stream = connect(&harness).await;

        send(&mut stream, &Request::Start).await;
        assert_eq!(recv::<Response>(&mut stream).await, Response::Ok);

        send(&mut stream, &Request::GetStatus).await;
        let Response::Status(status) = recv::<Response>(&mut stream).await else {
            panic!("expected status");
        };
        assert_eq!(status.state, State::Running);
        assert!(status.hotkeys_active);
        assert_eq!(status.output_path, harness.tmp.path().join("TimerOutput.txt"));

        send(&mut stream, &Request::Stop).await;
        assert_eq!(recv::<Response>(&mut stream).await, Response::Ok);
    }

    #[tokio::test]
    async fn test_subscriber_receives_events() {
        let harness = harness().await;
        let mut stream = connect(&harness).await;

        send(&mut stream, &Request::Subscribe).await;
        assert_eq!(recv::<Response>(&mut stream).await, Response::Subscribed);

        send(&mut stream, &Request::Reset).await;
        // The ack and the pushed event race; collect both
        let mut got_ok = false;
        let mut got_event = false;
        for _ in 0..2 {
            let value: serde_json::Value = tokio::time::timeout(Duration::from_secs(5), recv(&mut stream))
                .await
                .unwrap();
            match value["type"].as_str() {
                Some("ok") => got_ok = true,
                Some("event") => {
                    assert_eq!(value["event"]["type"], "elapsed_changed");
                    assert_eq!(value["event"]["display"], "00:00:00");
                    got_event = true;
                }
                other => panic!("unexpected frame {:?}", other),
            }
        }
        assert!(got_ok && got_event);
    }

    #[tokio::test]
    async fn test_set_output_path() {
        let harness = harness().await;
        let mut stream = connect(&harness).await;
        let target = harness.tmp.path().join("chosen.txt");

        send(&mut stream, &Request::SetOutputPath { path: target.clone() }).await;
        assert_eq!(
            recv::<Response>(&mut stream).await,
            Response::OutputPath { path: target.clone() }
        );
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "00:00:00");

        send(&mut stream, &Request::SetOutputPath { path: PathBuf::from("rel.txt") }).await;
        assert!(matches!(
            recv::<Response>(&mut stream).await,
            Response::Error { code, .. } if code == "output_path_failed"
        ));
    }

    #[tokio::test]
    async fn test_malformed_request_gets_error() {
        let harness = harness().await;
        let mut stream = connect(&harness).await;

        let body = br#"{"type":"launch_rockets"}"#;
        stream.write_all(&(body.len() as u32).to_le_bytes()).await.unwrap();
        stream.write_all(body).await.unwrap();
        assert!(matches!(
            recv::<Response>(&mut stream).await,
            Response::Error { code, .. } if code == "bad_request"
        ));

        // Connection stays usable
        send(&mut stream, &Request::Ping).await;
        assert_eq!(recv::<Response>(&mut stream).await, Response::Pong);
    }

    #[tokio::test]
    async fn test_shutdown_removes_socket() {
        let harness = harness().await;
        let socket = harness.tmp.path().join("timer.sock");
        assert!(socket.exists());

        harness.server.shutdown().await;
        assert!(!socket.exists());
    }
}
