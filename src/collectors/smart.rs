use crate::collectors::{command, TemperatureProbe};
use crate::error::{ProbeError, ProbeResult};
use crate::models::device::Celsius;
use serde_json::Value;
use std::time::Duration;

/// ATA attribute ids that carry the drive temperature in the raw value.
const ATA_TEMPERATURE_IDS: [u64; 2] = [194, 190];

/// smartctl exit-status bit 1: device open failed.
const EXIT_OPEN_FAILED: i32 = 0b10;

/// Temperature through `smartctl --json=c -a /dev/<id>`.
pub struct SmartctlProbe {
    timeout: Duration,
}

impl SmartctlProbe {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl TemperatureProbe for SmartctlProbe {
    fn read_temperature(&mut self, device_id: &str) -> ProbeResult<Option<Celsius>> {
        let device = format!("/dev/{}", device_id);
        let out = command::run("smartctl", &["--json=c", "-a", &device], self.timeout)?;

        // smartctl returns non-zero exit codes even on success when some bits
        // are set, so we parse regardless of exit code.
        let stdout = String::from_utf8_lossy(&out.stdout);
        match serde_json::from_str::<Value>(&stdout) {
            Ok(v) => {
                let exit = out.status.code().unwrap_or(0);
                parse_json(&v, exit)
            }
            // smartctl older than 7.0 has no JSON output.
            Err(_) => Ok(parse_text_temperature(&stdout)),
        }
    }
}

/// Pull the current temperature out of a smartctl JSON document.
pub fn parse_json(v: &Value, exit_code: i32) -> ProbeResult<Option<Celsius>> {
    if let Some(t) = v["temperature"]["current"].as_i64() {
        return Ok(Some(t as Celsius));
    }
    if let Some(t) = v["nvme_smart_health_information_log"]["temperature"].as_i64() {
        return Ok(Some(t as Celsius));
    }
    if let Some(t) = ata_temperature(v) {
        return Ok(Some(t));
    }

    let messages: Vec<&str> = v["smartctl"]["messages"]
        .as_array()
        .map(|msgs| msgs.iter().filter_map(|m| m["string"].as_str()).collect())
        .unwrap_or_default();

    if messages.iter().any(|m| m.contains("Permission denied") || m.contains("Operation not permitted")) {
        return Err(ProbeError::permission_denied(messages.join("; ")));
    }
    if exit_code & EXIT_OPEN_FAILED != 0 {
        return Err(ProbeError::transient(format!("device open failed: {}", messages.join("; "))));
    }

    // Device answered but exposes no temperature (no SMART, or a bridge
    // that hides it).
    Ok(None)
}

fn ata_temperature(v: &Value) -> Option<Celsius> {
    let table = v["ata_smart_attributes"]["table"].as_array()?;
    table.iter()
        .filter(|entry| entry["id"].as_u64().map(|id| ATA_TEMPERATURE_IDS.contains(&id)).unwrap_or(false))
        .find_map(|entry| entry["raw"]["value"].as_u64())
        // Upper bytes hold min/max on many drives.
        .map(|raw| (raw & 0xFF) as Celsius)
}

/// Plain-text fallback: first line mentioning temperature with a "<n> C"
/// or "<n> Celsius" reading.
pub fn parse_text_temperature(text: &str) -> Option<Celsius> {
    for line in text.lines() {
        if !line.to_lowercase().contains("temperature") { continue; }
        let tokens: Vec<&str> = line.split_whitespace().collect();
        for (i, tok) in tokens.iter().enumerate() {
            let next = tokens.get(i + 1).copied().unwrap_or("");
            if let Ok(n) = tok.parse::<Celsius>() {
                if next.starts_with('C') {
                    return Some(n);
                }
            }
            if let Some(n) = tok.strip_suffix('C').and_then(|s| s.parse::<Celsius>().ok()) {
                return Some(n);
            }
        }
    }
    None
}
