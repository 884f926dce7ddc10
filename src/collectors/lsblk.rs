use crate::collectors::{command, mdraid, DeviceProbe};
use crate::error::{ProbeError, ProbeResult};
use crate::models::device::{DeviceInfo, Topology};
use serde_json::Value;
use std::time::Duration;

const EXTERNAL_TRANSPORTS: [&str; 3] = ["usb", "ieee1394", "thunderbolt"];

/// Linux device listing: `lsblk` for disks, `/proc/mdstat` for RAID sets.
pub struct LsblkProbe {
    timeout: Duration,
}

impl LsblkProbe {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl DeviceProbe for LsblkProbe {
    fn list_external_devices(&mut self) -> ProbeResult<Topology> {
        let out = command::run_checked(
            "lsblk",
            &["--json", "--bytes", "-o", "NAME,TYPE,SIZE,MODEL,VENDOR,TRAN,HOTPLUG"],
            self.timeout,
        )?;
        let v: Value = serde_json::from_str(&out)
            .map_err(|e| ProbeError::transient(format!("lsblk output: {}", e)))?;

        Ok(Topology {
            devices:     parse_lsblk(&v),
            raid_groups: mdraid::read_mdstat(),
        })
    }
}

/// Top-level external disks from `lsblk --json` output.
pub fn parse_lsblk(v: &Value) -> Vec<DeviceInfo> {
    let devices = match v["blockdevices"].as_array() {
        Some(d) => d,
        None    => return Vec::new(),
    };

    let mut disks = Vec::new();
    for dev in devices {
        let name     = dev["name"].as_str().unwrap_or("").to_string();
        let dev_type = dev["type"].as_str().unwrap_or("");
        if name.is_empty() { continue; }
        if dev_type != "disk" { continue; }

        let tran    = str_opt(&dev["tran"]);
        let hotplug = json_bool(&dev["hotplug"]);
        let external = hotplug
            || tran.as_deref().map(|t| EXTERNAL_TRANSPORTS.contains(&t)).unwrap_or(false);
        if !external { continue; }

        let size = json_u64(&dev["size"]);
        let display = match (str_opt(&dev["vendor"]), str_opt(&dev["model"])) {
            (Some(v), Some(m)) if !m.starts_with(&v) => format!("{} {}", v, m),
            (_, Some(m))    => m,
            (Some(v), None) => v,
            (None, None)    => name.clone(),
        };

        disks.push(DeviceInfo::new(name, display, size));
    }
    disks
}

fn str_opt(v: &Value) -> Option<String> {
    v.as_str()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

// Older lsblk releases print booleans and sizes as strings ("1", "0").
fn json_bool(v: &Value) -> bool {
    v.as_bool().unwrap_or_else(|| v.as_str() == Some("1"))
}

fn json_u64(v: &Value) -> u64 {
    v.as_u64()
        .or_else(|| v.as_str().and_then(|s| s.parse().ok()))
        .unwrap_or(0)
}
