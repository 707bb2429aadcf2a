//! IPC message protocol definitions
//!
//! All messages are JSON-encoded, prefixed with a 4-byte little-endian length.

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::display::{Display, DisplayId, Feature};
use crate::events::EngineEvent;
use crate::keytap::{KeySet, MediaKeyEvent};
use crate::prefs::{PrefValue, Preferences};
use crate::routing::ListenFor;

/// Largest accepted frame body
pub const MAX_FRAME_LEN: usize = 1024 * 1024;

/// Requests from UI to daemon
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    /// Ping to check connectivity
    Ping,

    /// Request current daemon status
    GetStatus,

    /// Subscribe to engine event notifications
    Subscribe,

    /// A media key captured by a desktop key binding
    MediaKey { key: MediaKeyEvent },

    /// Slider value for one display
    SetFeature {
        display: DisplayId,
        feature: Feature,
        value: i32,
    },

    /// Write a preference by its store key
    SetPreference { key: String, value: PrefValue },

    /// Enable or disable key handling for one display
    SetDisplayEnabled { display: DisplayId, enabled: bool },

    /// Force a topology rescan
    Rescan,
}

/// Machine-readable error kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    BadRequest,
    UnknownDisplay,
    ContrastNotTracked,
    UnknownPreference,
    PrefsWriteFailed,
    EngineUnavailable,
}

/// Responses from daemon to UI
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Pong response to ping
    Pong,

    /// Current daemon status
    Status(DaemonStatus),

    /// Subscription confirmed
    Subscribed,

    /// Key forwarded to the engine
    KeyAccepted,

    /// Key not admitted by the live registration
    KeyRejected { key: MediaKeyEvent },

    /// Request applied
    Ok,

    /// Error response
    Error { code: ErrorCode, message: String },

    /// Pushed to subscribed clients
    Notification { event: EngineEvent },
}

impl Response {
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Response::Error {
            code,
            message: message.into(),
        }
    }
}

/// Full daemon status snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaemonStatus {
    /// Daemon version
    pub version: String,

    /// Uptime in seconds
    pub uptime_secs: u64,

    /// Displays in the current roster
    pub displays: Vec<DisplayStatus>,

    /// Keys of the live registration, `None` when nothing is registered
    pub active_keys: Option<KeySet>,

    pub preferences: PreferenceStatus,
}

/// One roster entry; feature values are present once read or written
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayStatus {
    pub id: DisplayId,
    pub name: String,
    pub enabled: bool,
    pub brightness: Option<u8>,
    pub volume: Option<u8>,
    pub contrast: Option<u8>,
    pub contrast_tracking: bool,
}

impl From<&Display> for DisplayStatus {
    fn from(display: &Display) -> Self {
        Self {
            id: display.id().clone(),
            name: display.name().to_string(),
            enabled: display.is_enabled(),
            brightness: display.cached(Feature::Brightness),
            volume: display.cached(Feature::Volume),
            contrast: display.cached(Feature::Contrast),
            contrast_tracking: display.has_contrast_tracking(),
        }
    }
}

/// Preference values the UI renders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferenceStatus {
    pub all_screens: bool,
    pub listen_for: ListenFor,
    pub show_contrast: bool,
    pub lower_contrast: bool,
}

impl From<&Preferences> for PreferenceStatus {
    fn from(prefs: &Preferences) -> Self {
        Self {
            all_screens: prefs.all_screens(),
            listen_for: prefs.listen_for(),
            show_contrast: prefs.show_contrast(),
            lower_contrast: prefs.lower_contrast(),
        }
    }
}

/// Read one frame body, `None` on a clean end of stream
pub async fn read_frame<R>(reader: &mut R) -> std::io::Result<Option<Vec<u8>>>
where
    R: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e),
    }

    let len = u32::from_le_bytes(len_buf) as usize;
    if len > MAX_FRAME_LEN {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("frame of {len} bytes exceeds limit"),
        ));
    }

    let mut body = vec![0u8; len];
    reader.read_exact(&mut body).await?;
    Ok(Some(body))
}

/// Write a length-prefixed JSON message
pub async fn write_message<W, T>(writer: &mut W, msg: &T) -> anyhow::Result<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let msg_bytes = serde_json::to_vec(msg)?;
    let msg_len = (msg_bytes.len() as u32).to_le_bytes();

    writer.write_all(&msg_len).await?;
    writer.write_all(&msg_bytes).await?;
    writer.flush().await?;

    Ok(())
}
