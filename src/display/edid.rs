//! Display naming from EDID blocks

/// Offset of the first 18-byte descriptor block
const DESCRIPTOR_START: usize = 54;
/// Length of one descriptor block
const DESCRIPTOR_LEN: usize = 18;
/// End of the base block descriptors (checksum area follows)
const DESCRIPTOR_END: usize = 126;
/// Descriptor tag for the monitor name string
const TAG_MONITOR_NAME: u8 = 0xFC;

/// Name used when the EDID carries nothing usable
pub const UNKNOWN_NAME: &str = "Unknown Display";

/// Derive a human-readable name from a raw EDID block
///
/// Prefers the monitor-name descriptor, then the manufacturer id with the
/// product code, then [`UNKNOWN_NAME`].
pub fn display_name(edid: &[u8]) -> String {
    if let Some(name) = monitor_name(edid) {
        return name;
    }
    match (manufacturer_id(edid), product_code(edid)) {
        (Some(mfg), Some(code)) => format!("{mfg} {code:04X}"),
        _ => UNKNOWN_NAME.to_string(),
    }
}

fn monitor_name(edid: &[u8]) -> Option<String> {
    let mut offset = DESCRIPTOR_START;
    while offset + DESCRIPTOR_LEN <= edid.len().min(DESCRIPTOR_END) {
        let block = &edid[offset..offset + DESCRIPTOR_LEN];
        if block[0] == 0 && block[1] == 0 && block[3] == TAG_MONITOR_NAME {
            let text = descriptor_text(&block[5..]);
            if !text.is_empty() {
                return Some(text);
            }
        }
        offset += DESCRIPTOR_LEN;
    }
    None
}

fn descriptor_text(bytes: &[u8]) -> String {
    let raw: Vec<u8> = bytes
        .iter()
        .copied()
        .take_while(|&b| b != 0x0A && b != 0x00)
        .collect();
    String::from_utf8_lossy(&raw).trim().to_string()
}

/// Three-letter PNP id packed into bytes 8-9 (big-endian, 5 bits per letter)
fn manufacturer_id(edid: &[u8]) -> Option<String> {
    let packed = u16::from_be_bytes([*edid.get(8)?, *edid.get(9)?]);
    let letters: String = [10u16, 5, 0]
        .iter()
        .map(|shift| (((packed >> shift) & 0x1F) as u8 + 0x40) as char)
        .collect();
    letters
        .chars()
        .all(|c| c.is_ascii_uppercase())
        .then_some(letters)
}

fn product_code(edid: &[u8]) -> Option<u16> {
    Some(u16::from_le_bytes([*edid.get(10)?, *edid.get(11)?]))
}
