//! Unix domain socket server for IPC
//!
//! Provides request-response communication and push notifications of
//! session events to subscribed clients.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::net::unix::OwnedReadHalf;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{broadcast, mpsc, watch};
use tracing::{debug, error, info, warn};

use crate::events::{Command, SessionEvent};
use crate::state::Session;

use super::protocol::{read_message, write_message, Notification, Request, Response};

/// Handles a client needs to reach the running session
#[derive(Clone)]
pub struct SessionLink {
    pub snapshots: watch::Receiver<Session>,
    pub commands: mpsc::Sender<Command>,
    pub events: broadcast::Sender<SessionEvent>,
}

/// IPC Server handling client connections
pub struct Server {
    socket_path: PathBuf,
    listener: Option<UnixListener>,
    link: SessionLink,
    shutdown_tx: broadcast::Sender<()>,
}

impl Server {
    /// Create a new IPC server bound to `socket_path`
    pub fn new(socket_path: &Path, link: SessionLink) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = socket_path.parent() {
            std::fs::create_dir_all(parent).context("failed to create socket directory")?;
        }

        // Remove stale socket if it exists
        if socket_path.exists() {
            std::fs::remove_file(socket_path).context("failed to remove stale socket")?;
        }

        let listener = UnixListener::bind(socket_path).context("failed to bind Unix socket")?;

        // Owner-only access (0600)
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(socket_path, std::fs::Permissions::from_mode(0o600))?;
        }

        let (shutdown_tx, _) = broadcast::channel(1);

        info!(?socket_path, "IPC server listening");

        Ok(Self {
            socket_path: socket_path.to_owned(),
            listener: Some(listener),
            link,
            shutdown_tx,
        })
    }

    /// Run the server, accepting connections
    pub async fn run(&self) -> Result<()> {
        let listener = self.listener.as_ref().context("server not initialized")?;

        loop {
            match listener.accept().await {
                Ok((stream, _addr)) => {
                    debug!("client connected");
                    let link = self.link.clone();
                    let mut shutdown_rx = self.shutdown_tx.subscribe();

                    tokio::spawn(async move {
                        tokio::select! {
                            result = Self::handle_client(stream, link) => {
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
    ///
    /// Requests are read on their own task so a pending read is never
    /// cut short by a notification being pushed.
    async fn handle_client(stream: UnixStream, link: SessionLink) -> Result<()> {
        let (reader, mut writer) = stream.into_split();
        let (request_tx, mut requests) = mpsc::channel(8);
        let reader_task = tokio::spawn(Self::read_requests(reader, request_tx));
        let mut events: Option<broadcast::Receiver<SessionEvent>> = None;

        let result = loop {
            tokio::select! {
                request = requests.recv() => {
                    let Some(request) = request else {
                        debug!("client disconnected");
                        break Ok(());
                    };
                    debug!(?request, "received request");
                    let response = Self::process_request(request, &link, &mut events).await;
                    if let Err(e) = write_message(&mut writer, &response).await {
                        break Err(e);
                    }
                }
                event = Self::next_event(&mut events) => {
                    let notification = match event {
                        Ok(event) => Notification::Event { event },
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!(skipped, "subscriber lagged");
                            Notification::Lagged { skipped }
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            events = None;
                            continue;
                        }
                    };
                    if let Err(e) = write_message(&mut writer, &notification).await {
                        break Err(e);
                    }
                }
            }
        };

        reader_task.abort();
        result
    }

    async fn read_requests(mut reader: OwnedReadHalf, requests: mpsc::Sender<Request>) {
        loop {
            match read_message::<_, Request>(&mut reader).await {
                Ok(Some(request)) => {
                    if requests.send(request).await.is_err() {
                        return;
                    }
                }
                Ok(None) => return,
                Err(e) => {
                    warn!(?e, "dropping client after bad message");
                    return;
                }
            }
        }
    }

    async fn next_event(
        events: &mut Option<broadcast::Receiver<SessionEvent>>,
    ) -> Result<SessionEvent, broadcast::error::RecvError> {
        match events {
            Some(rx) => rx.recv().await,
            None => std::future::pending().await,
        }
    }

    /// Process a request and return a response
    async fn process_request(
        request: Request,
        link: &SessionLink,
        events: &mut Option<broadcast::Receiver<SessionEvent>>,
    ) -> Response {
        match request {
            Request::Ping => Response::Pong,

            Request::GetSnapshot => {
                let session = link.snapshots.borrow().clone();
                Response::Snapshot { session }
            }

            Request::Command { command } => {
                info!(%command, "command received via IPC");
                match link.commands.send(command).await {
                    Ok(()) => Response::Accepted,
                    Err(_) => Response::Error {
                        code: "session_closed".to_string(),
                        message: "the session is no longer running".to_string(),
                    },
                }
            }

            Request::Subscribe => {
                if events.is_none() {
                    *events = Some(link.events.subscribe());
                    debug!("client subscribed to notifications");
                }
                Response::Subscribed
            }
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Phase;

    fn socket_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("mock-interview-{}-{}.sock", name, std::process::id()))
    }

    fn link() -> (SessionLink, watch::Sender<Session>, mpsc::Receiver<Command>) {
        let (snapshot_tx, snapshots) = watch::channel(Session::default());
        let (commands, command_rx) = mpsc::channel(8);
        let (events, _) = broadcast::channel(16);
        (
            SessionLink {
                snapshots,
                commands,
                events,
            },
            snapshot_tx,
            command_rx,
        )
    }

    async fn roundtrip(stream: &mut UnixStream, request: Request) -> Response {
        write_message(stream, &request).await.unwrap();
        read_message(stream).await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn test_requests_over_socket() {
        let path = socket_path("requests");
        let (link, snapshot_tx, mut command_rx) = link();
        let server = Server::new(&path, link).unwrap();

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }

        let client = async {
            let mut stream = UnixStream::connect(&path).await.unwrap();
            assert_eq!(roundtrip(&mut stream, Request::Ping).await, Response::Pong);

            snapshot_tx.send_modify(|s| s.phase = Phase::Capturing);
            let Response::Snapshot { session } = roundtrip(&mut stream, Request::GetSnapshot).await
            else {
                panic!("expected a snapshot");
            };
            assert_eq!(session.phase, Phase::Capturing);

            assert_eq!(
                roundtrip(
                    &mut stream,
                    Request::Command {
                        command: Command::SubmitAnswer
                    }
                )
                .await,
                Response::Accepted
            );
            assert_eq!(command_rx.recv().await, Some(Command::SubmitAnswer));
        };

        tokio::select! {
            _ = server.run() => panic!("server stopped"),
            _ = client => {}
        }

        server.shutdown().await;
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_subscriber_receives_events() {
        let path = socket_path("subscribe");
        let (link, _snapshot_tx, _command_rx) = link();
        let events = link.events.clone();
        let server = Server::new(&path, link).unwrap();

        let client = async {
            let mut stream = UnixStream::connect(&path).await.unwrap();
            assert_eq!(
                roundtrip(&mut stream, Request::Subscribe).await,
                Response::Subscribed
            );

            events.send(SessionEvent::CameraStarted).unwrap();
            let note: Notification = read_message(&mut stream).await.unwrap().unwrap();
            assert_eq!(
                note,
                Notification::Event {
                    event: SessionEvent::CameraStarted
                }
            );
        };

        tokio::select! {
            _ = server.run() => panic!("server stopped"),
            _ = client => {}
        }
        server.shutdown().await;
    }
}
