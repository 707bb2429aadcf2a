//! Default audio output through PulseAudio / PipeWire `pactl`

use std::process::{Command, Stdio};
use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::events::Trigger;
use crate::routing::{AudioOutput, AudioRoute};

/// `pactl subscribe` lines that can move the default output
static ROUTE_EVENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^Event '(new|remove)' on sink #|^Event 'change' on server #")
        .expect("valid route event regex")
});

/// A `Ports:` entry: `name: description (type: ..., priority: ...)`
static PORT_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([^\s:]+):\s+(.+?)(?:\s+\((?:type|priority):.*)?$").expect("valid port regex")
});

/// [`AudioRoute`] backed by `pactl`
#[derive(Debug, Clone)]
pub struct PactlAudio {
    program: String,
}

impl Default for PactlAudio {
    fn default() -> Self {
        Self {
            program: "pactl".to_string(),
        }
    }
}

impl PactlAudio {
    pub fn new() -> Self {
        Self::default()
    }

    fn run(&self, args: &[&str]) -> Option<String> {
        let out = match Command::new(&self.program)
            .args(args)
            .stderr(Stdio::null())
            .output()
        {
            Ok(out) => out,
            Err(e) => {
                debug!(?e, program = %self.program, "audio query failed");
                return None;
            }
        };
        if !out.status.success() {
            debug!(status = %out.status, ?args, "audio query failed");
            return None;
        }
        Some(String::from_utf8_lossy(&out.stdout).into_owned())
    }
}

impl AudioRoute for PactlAudio {
    fn current_output(&self) -> Option<AudioOutput> {
        let sink = self.run(&["get-default-sink"])?.trim().to_string();
        if sink.is_empty() {
            return None;
        }
        let name = self
            .run(&["list", "sinks"])
            .and_then(|sinks| output_name(&sinks, &sink))
            .unwrap_or_else(|| sink.clone());

        Some(AudioOutput { id: sink, name })
    }
}

/// Name of what the sink called `sink` plays into, from `pactl list sinks`
///
/// HDMI and DisplayPort sinks are described by sound card and profile; the
/// monitor name (from its ELD) is the description of the active port. Falls
/// back to the sink description when there is no named active port.
fn output_name(listing: &str, sink: &str) -> Option<String> {
    let block = listing.split("Sink #").find(|block| {
        block
            .lines()
            .any(|line| line.trim().strip_prefix("Name:").map(str::trim) == Some(sink))
    })?;

    let mut description = None;
    let mut active = None;
    let mut ports = Vec::new();
    let mut in_ports = false;
    for line in block.lines() {
        let nested = line.starts_with("\t\t") || line.starts_with("        ");
        let line = line.trim();
        if in_ports && nested {
            if let Some(caps) = PORT_LINE.captures(line) {
                ports.push((caps[1].to_string(), caps[2].to_string()));
            }
            continue;
        }
        in_ports = false;
        if let Some(value) = line.strip_prefix("Description:") {
            description = Some(value.trim().to_string());
        } else if let Some(value) = line.strip_prefix("Active Port:") {
            active = Some(value.trim().to_string());
        } else if line == "Ports:" {
            in_ports = true;
        }
    }

    let port_name = active.and_then(|active| {
        ports
            .into_iter()
            .find(|(name, _)| *name == active)
            .map(|(_, description)| description)
    });
    port_name.or(description)
}

fn is_route_event(line: &str) -> bool {
    ROUTE_EVENT.is_match(line)
}

/// Follow `pactl subscribe` and send `AudioRouteChanged` on route events
///
/// Returns when `pactl` exits or the engine goes away.
pub async fn watch_audio_route(program: &str, trigger_tx: mpsc::Sender<Trigger>) -> Result<()> {
    let mut child = tokio::process::Command::new(program)
        .arg("subscribe")
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()
        .with_context(|| format!("failed to run {program} subscribe"))?;
    let stdout = child
        .stdout
        .take()
        .context("pactl subscribe has no stdout")?;

    info!("watching audio route changes");
    let mut lines = BufReader::new(stdout).lines();
    while let Some(line) = lines.next_line().await? {
        if !is_route_event(&line) {
            continue;
        }
        debug!(%line, "audio route event");
        if trigger_tx.send(Trigger::AudioRouteChanged).await.is_err() {
            return Ok(());
        }
    }

    warn!("pactl subscribe exited");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SINKS: &str = "\
Sink #47
\tState: SUSPENDED
\tName: alsa_output.pci-0000_00_1f.3.analog-stereo
\tDescription: Built-in Audio Analog Stereo
\tDriver: PipeWire
\tSample Specification: s32le 2ch 48000Hz
\tMute: no
\tProperties:
\t\talsa.card_name = \"HDA Intel PCH\"
\t\tdevice.description = \"Built-in Audio\"
\tPorts:
\t\tanalog-output-speaker: Speakers (type: Speaker, priority: 10000, availability unknown)
\t\tanalog-output-headphones: Headphones (type: Headphones, priority: 9900, not available)
\tActive Port: analog-output-speaker
\tFormats:
\t\tpcm

Sink #52
\tState: RUNNING
\tName: alsa_output.pci-0000_01_00.1.hdmi-stereo-extra1
\tDescription: GA102 High Definition Audio Controller Digital Stereo (HDMI 2)
\tDriver: PipeWire
\tSample Specification: s32le 2ch 48000Hz
\tMute: no
\tProperties:
\t\talsa.card_name = \"HDA NVidia\"
\t\tdevice.description = \"GA102 High Definition Audio Controller\"
\tPorts:
\t\thdmi-output-0: HDMI / DisplayPort (type: HDMI, priority: 5900, availability group: Legacy 1, not available)
\t\thdmi-output-1: DELL U2720Q (type: HDMI, priority: 5800, availability group: Legacy 2, available)
\tActive Port: hdmi-output-1
\tFormats:
\t\tpcm

Sink #60
\tState: IDLE
\tName: bluez_output.00_1B_66_AA_BB_CC.1
\tDescription: Headphones
\tDriver: PipeWire
\tProperties:
\t\tdevice.description = \"Headphones\"
\tFormats:
\t\tpcm
";

    #[test]
    fn test_hdmi_sink_named_by_active_port() {
        assert_eq!(
            output_name(SINKS, "alsa_output.pci-0000_01_00.1.hdmi-stereo-extra1").as_deref(),
            Some("DELL U2720Q")
        );
    }

    #[test]
    fn test_output_name_fallbacks() {
        assert_eq!(
            output_name(SINKS, "alsa_output.pci-0000_00_1f.3.analog-stereo").as_deref(),
            Some("Speakers")
        );
        // No ports: the sink description
        assert_eq!(
            output_name(SINKS, "bluez_output.00_1B_66_AA_BB_CC.1").as_deref(),
            Some("Headphones")
        );
        assert_eq!(output_name(SINKS, "alsa_output.usb-headset"), None);
    }

    #[test]
    fn test_port_line() {
        let caps = PORT_LINE
            .captures("hdmi-output-1: LG HDR 4K (type: HDMI, priority: 5800, available)")
            .unwrap();
        assert_eq!((&caps[1], &caps[2]), ("hdmi-output-1", "LG HDR 4K"));

        let caps = PORT_LINE
            .captures("hdmi-output-0: HDMI / DisplayPort (priority: 5900, available)")
            .unwrap();
        assert_eq!(&caps[2], "HDMI / DisplayPort");
    }

    #[test]
    fn test_route_events() {
        assert!(is_route_event("Event 'change' on server #0"));
        assert!(is_route_event("Event 'new' on sink #61"));
        assert!(is_route_event("Event 'remove' on sink #61"));
        assert!(!is_route_event("Event 'change' on sink #52"));
        assert!(!is_route_event("Event 'new' on sink-input #301"));
        assert!(!is_route_event("Event 'change' on source #53"));
    }

    #[test]
    fn test_missing_pactl_means_no_output() {
        let audio = PactlAudio {
            program: "/nonexistent/pactl".to_string(),
        };
        assert_eq!(audio.current_output(), None);
        assert_eq!(audio.current_output_name(), None);
    }

    #[tokio::test]
    async fn test_watcher_fails_without_pactl() {
        let (tx, _rx) = mpsc::channel(1);
        let err = watch_audio_route("/nonexistent/pactl", tx).await.unwrap_err();
        assert!(err.to_string().contains("subscribe"));
    }
}
