use crate::collectors::{command, DeviceProbe};
use crate::error::ProbeResult;
use crate::models::device::{DeviceInfo, Topology};
use crate::models::raid::RaidGroup;
use std::time::Duration;
use tracing::debug;

/// macOS device listing through `diskutil`.
pub struct DiskutilProbe {
    timeout: Duration,
}

impl DiskutilProbe {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl DeviceProbe for DiskutilProbe {
    fn list_external_devices(&mut self) -> ProbeResult<Topology> {
        let list = command::run_checked("diskutil", &["list"], self.timeout)?;

        let mut devices = Vec::new();
        for id in parse_external_disks(&list) {
            // A disk that vanished between `list` and `info` is simply skipped.
            match command::run_checked("diskutil", &["info", &id], self.timeout) {
                Ok(info) => devices.push(parse_info(&id, &info)),
                Err(e)   => debug!(device = %id, error = %e, "diskutil info failed"),
            }
        }

        // No AppleRAID sets is reported as a failure on some releases.
        let raid_groups = match command::run_checked("diskutil", &["appleRAID", "list"], self.timeout) {
            Ok(text) => parse_raid_list(&text),
            Err(e)   => {
                debug!(error = %e, "diskutil appleRAID list failed");
                Vec::new()
            }
        };

        Ok(Topology { devices, raid_groups })
    }
}

/// Whole-disk ids from `/dev/diskN (external, physical):` header lines.
pub fn parse_external_disks(text: &str) -> Vec<String> {
    text.lines()
        .filter(|l| l.starts_with("/dev/disk") && l.contains("(external, physical)"))
        .filter_map(|l| l.split_whitespace().next())
        .filter_map(|dev| dev.strip_prefix("/dev/"))
        .map(str::to_string)
        .collect()
}

/// Parse `diskutil info diskN` key/value lines.
pub fn parse_info(id: &str, text: &str) -> DeviceInfo {
    let mut info = DeviceInfo::new(id, id, 0);
    for line in text.lines() {
        let Some((key, val)) = line.split_once(':') else { continue };
        let val = val.trim();
        match key.trim() {
            "Device / Media Name" if !val.is_empty() => info.name = val.to_string(),
            "Disk Size" => info.capacity_bytes = parse_exact_bytes(val).unwrap_or(0),
            _ => {}
        }
    }
    info
}

/// "2.0 TB (2000398934016 Bytes) (exactly ...)" → 2000398934016
fn parse_exact_bytes(val: &str) -> Option<u64> {
    let start = val.find('(')? + 1;
    let end   = start + val[start..].find(" Bytes")?;
    val[start..end].trim().parse().ok()
}

/// Parse `diskutil appleRAID list`.
///
/// Each set opens with `Name:`; member rows look like
/// `0  disk4s2  7C3F...  Online  2000...` and are reduced to the whole disk.
pub fn parse_raid_list(text: &str) -> Vec<RaidGroup> {
    let mut groups: Vec<RaidGroup> = Vec::new();

    for line in text.lines() {
        let line = line.trim();
        if let Some(name) = line.strip_prefix("Name:") {
            let name = name.trim();
            groups.push(RaidGroup::new(name, name, Vec::new()));
            continue;
        }
        let Some(current) = groups.last_mut() else { continue };

        if let Some(uuid) = line.strip_prefix("Unique ID:") {
            current.id = uuid.trim().to_string();
        } else if let Some(size) = line.strip_prefix("Size:") {
            current.capacity_bytes = parse_exact_bytes(size.trim());
        } else {
            let mut tokens = line.split_whitespace();
            let is_member_row = tokens
                .next()
                .map(|t| !t.is_empty() && t.chars().all(|c| c.is_ascii_digit()))
                .unwrap_or(false);
            if !is_member_row { continue; }
            if let Some(disk) = tokens.next().and_then(whole_disk) {
                if !current.members.contains(&disk) {
                    current.members.push(disk);
                }
            }
        }
    }

    groups.retain(|g| !g.members.is_empty());
    groups
}

/// "disk4s2" → "disk4"; "disk4" → "disk4"; anything else → None.
pub fn whole_disk(node: &str) -> Option<String> {
    let node   = node.strip_prefix("/dev/").unwrap_or(node);
    let digits = node.strip_prefix("disk")?;
    let n: String = digits.chars().take_while(|c| c.is_ascii_digit()).collect();
    if n.is_empty() { return None; }
    Some(format!("disk{}", n))
}
