//! Hardware links over the `ddcutil` command line tool
//!
//! The I2C bus of a connector is found in sysfs, either through its `ddc`
//! link or an `i2c-N` child. Values are scaled between the monitor's
//! reported maximum and `0..=100`.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::{Arc, LazyLock, Mutex};

use regex::Regex;
use tracing::debug;

use crate::display::{Feature, HardwareLink, LinkError, LinkFactory, MAX_VALUE};
use crate::topology::Screen;

/// `VCP code 0x10 (Brightness): current value =    50, max value =   100`
static VCP_REPLY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"current value =\s*(\d+),\s*max value =\s*(\d+)").expect("valid VCP regex")
});

/// Opens [`DdcutilLink`]s for DRM connectors
pub struct DdcutilLinks {
    drm_root: PathBuf,
    program: String,
}

impl DdcutilLinks {
    pub fn new(drm_root: impl Into<PathBuf>) -> Self {
        Self {
            drm_root: drm_root.into(),
            program: "ddcutil".to_string(),
        }
    }
}

impl LinkFactory for DdcutilLinks {
    fn open(&self, screen: &Screen) -> Result<Arc<dyn HardwareLink>, LinkError> {
        let connector = self.drm_root.join(screen.id.as_str());
        let bus = resolve_bus(&connector).ok_or_else(|| LinkError::NoBus(screen.id.to_string()))?;
        debug!(display = %screen.id, bus, "resolved I2C bus");

        Ok(Arc::new(DdcutilLink {
            program: self.program.clone(),
            bus,
            edid_path: connector.join("edid"),
            max: Mutex::new([None; Feature::ALL.len()]),
        }))
    }
}

/// I2C bus number behind a DRM connector directory
fn resolve_bus(connector: &Path) -> Option<u32> {
    if let Ok(target) = std::fs::read_link(connector.join("ddc")) {
        if let Some(bus) = target.file_name().and_then(|n| n.to_str()).and_then(bus_number) {
            return Some(bus);
        }
    }

    std::fs::read_dir(connector)
        .ok()?
        .filter_map(Result::ok)
        .filter_map(|entry| entry.file_name().to_str().and_then(bus_number))
        .min()
}

fn bus_number(name: &str) -> Option<u32> {
    name.strip_prefix("i2c-")?.parse().ok()
}

/// Parse `(current, max)` out of a `getvcp` reply
fn parse_vcp(output: &str) -> Option<(u16, u16)> {
    let caps = VCP_REPLY.captures(output)?;
    Some((caps[1].parse().ok()?, caps[2].parse().ok()?))
}

fn to_percent(raw: u16, max: u16) -> u8 {
    if max == 0 {
        return 0;
    }
    let scaled = (u32::from(raw) * u32::from(MAX_VALUE) + u32::from(max) / 2) / u32::from(max);
    scaled.min(u32::from(MAX_VALUE)) as u8
}

fn from_percent(value: u8, max: u16) -> u16 {
    let value = u32::from(value.min(MAX_VALUE));
    ((value * u32::from(max) + u32::from(MAX_VALUE) / 2) / u32::from(MAX_VALUE)) as u16
}

/// One monitor addressed by I2C bus
pub struct DdcutilLink {
    program: String,
    bus: u32,
    edid_path: PathBuf,
    /// Reported maximum per feature, learned from reads
    max: Mutex<[Option<u16>; Feature::ALL.len()]>,
}

impl DdcutilLink {
    fn run(&self, args: &[&str]) -> Result<String, LinkError> {
        let out = Command::new(&self.program)
            .arg("--bus")
            .arg(self.bus.to_string())
            .args(args)
            .output()?;

        if !out.status.success() {
            return Err(LinkError::Tool {
                program: self.program.clone(),
                status: out.status.to_string(),
                stderr: String::from_utf8_lossy(&out.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&out.stdout).into_owned())
    }

    fn read_raw(&self, feature: Feature) -> Result<(u16, u16), LinkError> {
        let code = format!("0x{:02x}", feature.vcp_code());
        let out = self.run(&["getvcp", &code])?;
        let (current, max) = parse_vcp(&out).ok_or_else(|| LinkError::Parse(out.trim().to_string()))?;

        self.max.lock().unwrap_or_else(|e| e.into_inner())[feature.index()] = Some(max);
        Ok((current, max))
    }
}

impl HardwareLink for DdcutilLink {
    fn probe(&self) -> Result<Option<Vec<u8>>, LinkError> {
        match std::fs::read(&self.edid_path) {
            Ok(edid) if edid.is_empty() => Ok(None),
            Ok(edid) => Ok(Some(edid)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn get(&self, feature: Feature) -> Result<u8, LinkError> {
        let (current, max) = self.read_raw(feature)?;
        Ok(to_percent(current, max))
    }

    fn set(&self, feature: Feature, value: u8) -> Result<(), LinkError> {
        let known = self.max.lock().unwrap_or_else(|e| e.into_inner())[feature.index()];
        let max = match known {
            Some(max) => max,
            None => self.read_raw(feature)?.1,
        };

        let code = format!("0x{:02x}", feature.vcp_code());
        let raw = from_percent(value, max).to_string();
        self.run(&["setvcp", &code, &raw])?;
        Ok(())
    }
}
