//! Unix domain socket server for IPC
//!
//! Provides request-response communication and push notifications for
//! engine events to subscribed clients.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use tokio::io::AsyncRead;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};

use crate::display::Feature;
use crate::events::{EngineEvent, Trigger};
use crate::keytap::{KeyGate, MediaKeyEvent};
use crate::prefs::{PrefKey, Preferences, PrefsError};
use crate::topology::SharedRoster;

use super::protocol::{
    read_frame, write_message, DaemonStatus, DisplayStatus, ErrorCode, PreferenceStatus,
    Request, Response,
};

/// Handles to the daemon state a client may read or change
#[derive(Clone)]
pub struct ServerContext {
    pub roster: SharedRoster,
    pub prefs: Preferences,
    pub gate: Arc<KeyGate>,
    pub trigger_tx: mpsc::Sender<Trigger>,
    pub event_tx: broadcast::Sender<EngineEvent>,
    pub start_time: Instant,
}

impl ServerContext {
    fn status(&self) -> DaemonStatus {
        DaemonStatus {
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_secs: self.start_time.elapsed().as_secs(),
            displays: self
                .roster
                .snapshot()
                .iter()
                .map(|d| DisplayStatus::from(d.as_ref()))
                .collect(),
            active_keys: self.gate.active(),
            preferences: PreferenceStatus::from(&self.prefs),
        }
    }

    async fn forward(&self, trigger: Trigger) -> Response {
        match self.trigger_tx.send(trigger).await {
            Ok(()) => Response::Ok,
            Err(_) => Response::error(ErrorCode::EngineUnavailable, "engine is not running"),
        }
    }

    /// Run a preference write on the blocking pool
    async fn write_prefs<F>(&self, key: &PrefKey, write: F) -> Option<Response>
    where
        F: FnOnce(&Preferences) -> std::result::Result<(), PrefsError> + Send + 'static,
    {
        let prefs = self.prefs.clone();
        match tokio::task::spawn_blocking(move || write(&prefs)).await {
            Ok(Ok(())) => None,
            Ok(Err(e)) => {
                warn!(error = %e, %key, "preference write failed");
                Some(Response::error(ErrorCode::PrefsWriteFailed, e.to_string()))
            }
            Err(e) => {
                error!(?e, %key, "preference write task failed");
                Some(Response::error(
                    ErrorCode::PrefsWriteFailed,
                    "preference write did not complete",
                ))
            }
        }
    }

    async fn media_key(&self, key: MediaKeyEvent) -> Response {
        if !self.gate.admits(key) {
            debug!(%key, "key not registered, rejecting");
            return Response::KeyRejected { key };
        }
        match self.forward(Trigger::Key(key)).await {
            Response::Ok => Response::KeyAccepted,
            other => other,
        }
    }

    /// Process a request and return a response
    pub async fn process(&self, request: Request) -> Response {
        match request {
            Request::Ping => Response::Pong,

            Request::GetStatus => Response::Status(self.status()),

            Request::Subscribe => Response::Subscribed,

            Request::MediaKey { key } => self.media_key(key).await,

            Request::SetFeature {
                display,
                feature,
                value,
            } => {
                let Some(target) = self.roster.find(&display) else {
                    return Response::error(
                        ErrorCode::UnknownDisplay,
                        format!("no display {display} in roster"),
                    );
                };
                if feature == Feature::Contrast && !target.has_contrast_tracking() {
                    return Response::error(
                        ErrorCode::ContrastNotTracked,
                        format!("contrast is not tracked for {display}"),
                    );
                }
                self.forward(Trigger::SetFeature {
                    display,
                    feature,
                    value,
                })
                .await
            }

            Request::SetPreference { key, value } => {
                let Some(pref) = PrefKey::parse(&key) else {
                    return Response::error(
                        ErrorCode::UnknownPreference,
                        format!("unknown preference {key}"),
                    );
                };
                let target = pref.clone();
                if let Some(failed) = self
                    .write_prefs(&pref, move |prefs| prefs.set(&target, value))
                    .await
                {
                    return failed;
                }
                info!(%pref, ?value, "preference changed via IPC");
                self.forward(Trigger::PreferenceChanged { key: pref }).await
            }

            Request::SetDisplayEnabled {
                display: id,
                enabled,
            } => {
                let key = PrefKey::DisplayState(id.clone());
                if let Some(failed) = self
                    .write_prefs(&key, move |prefs| prefs.set_display_enabled(&id, enabled))
                    .await
                {
                    return failed;
                }
                debug!(%key, enabled, "display state changed via IPC");
                self.forward(Trigger::PreferenceChanged { key }).await
            }

            Request::Rescan => self.forward(Trigger::TopologyChanged).await,
        }
    }
}

/// IPC Server handling client connections
pub struct Server {
    socket_path: PathBuf,
    listener: Option<UnixListener>,
    ctx: ServerContext,
    shutdown_tx: broadcast::Sender<()>,
}

impl Server {
    /// Create a new IPC server
    pub fn new(socket_path: &Path, ctx: ServerContext) -> Result<Self> {
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

        info!(?socket_path, "IPC server listening");

        Ok(Self {
            socket_path: socket_path.to_owned(),
            listener: Some(listener),
            ctx,
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
                    let ctx = self.ctx.clone();
                    let mut shutdown_rx = self.shutdown_tx.subscribe();

                    tokio::spawn(async move {
                        tokio::select! {
                            result = Self::handle_client(stream, ctx) => {
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
    async fn handle_client(stream: UnixStream, ctx: ServerContext) -> Result<()> {
        let (reader, mut writer) = stream.into_split();
        let (request_tx, mut request_rx) = mpsc::channel(8);
        let reader_task = tokio::spawn(Self::read_requests(reader, request_tx));

        let mut events: Option<broadcast::Receiver<EngineEvent>> = None;

        let result = loop {
            tokio::select! {
                incoming = request_rx.recv() => {
                    let Some(incoming) = incoming else {
                        debug!("client disconnected");
                        break Ok(());
                    };
                    let response = match incoming {
                        Ok(request) => {
                            debug!(?request, "received request");
                            if request == Request::Subscribe && events.is_none() {
                                events = Some(ctx.event_tx.subscribe());
                                debug!("client subscribed to notifications");
                            }
                            ctx.process(request).await
                        }
                        Err(e) => Response::error(ErrorCode::BadRequest, e.to_string()),
                    };
                    if let Err(e) = write_message(&mut writer, &response).await {
                        break Err(e);
                    }
                }
                event = next_event(&mut events) => match event {
                    Ok(event) => {
                        let notification = Response::Notification { event };
                        if let Err(e) = write_message(&mut writer, &notification).await {
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

    /// Decode frames until the client hangs up or sends garbage framing
    async fn read_requests<R>(
        mut reader: R,
        request_tx: mpsc::Sender<std::result::Result<Request, serde_json::Error>>,
    ) where
        R: AsyncRead + Unpin,
    {
        loop {
            let body = match read_frame(&mut reader).await {
                Ok(Some(body)) => body,
                Ok(None) => return,
                Err(e) => {
                    warn!(?e, "unreadable frame, disconnecting");
                    return;
                }
            };
            if request_tx.send(serde_json::from_slice(&body)).await.is_err() {
                return;
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

/// Next event for a subscribed client; pending forever otherwise
async fn next_event(
    events: &mut Option<broadcast::Receiver<EngineEvent>>,
) -> std::result::Result<EngineEvent, broadcast::error::RecvError> {
    match events {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}
