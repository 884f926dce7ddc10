use crate::models::raid::RaidGroup;
use crate::models::snapshot::Sample;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;
use tracing::warn;

/// Whole degrees Celsius as reported by SMART.
pub type Celsius = i32;

/// Static attributes of one attached external device.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceInfo {
    /// Short kernel / BSD name: `disk4`, `sdb`.
    pub id:             String,
    pub name:           String,
    pub capacity_bytes: u64,
}

impl DeviceInfo {
    pub fn new(id: impl Into<String>, name: impl Into<String>, capacity_bytes: u64) -> Self {
        Self { id: id.into(), name: name.into(), capacity_bytes }
    }
}

/// Cumulative bytes transferred since the device was attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Counters {
    pub read_bytes:  u64,
    pub write_bytes: u64,
}

impl Counters {
    pub fn new(read_bytes: u64, write_bytes: u64) -> Self {
        Self { read_bytes, write_bytes }
    }
}

/// A counter pair together with the moment it was read.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    pub counters: Counters,
    pub at:       DateTime<Utc>,
}

/// One tracked device: static info plus everything the scheduler remembers
/// between ticks.
#[derive(Debug, Clone)]
pub struct Device {
    pub info:         DeviceInfo,
    pub temperature:  Option<Celsius>,
    pub temperature_polled_at: Option<DateTime<Utc>>,
    pub last_reading: Option<Reading>,
    pub last_sample:  Option<Sample>,
    /// Consecutive successful polls this device was missing from.
    pub missed_polls: u32,
}

impl Device {
    pub fn new(info: DeviceInfo) -> Self {
        Self {
            info,
            temperature:  None,
            temperature_polled_at: None,
            last_reading: None,
            last_sample:  None,
            missed_polls: 0,
        }
    }

    pub fn id(&self) -> &str {
        &self.info.id
    }

    pub fn read_rate(&self) -> f64 {
        self.last_sample.as_ref().map(|s| s.read_bytes_per_sec).unwrap_or(0.0)
    }

    pub fn write_rate(&self) -> f64 {
        self.last_sample.as_ref().map(|s| s.write_bytes_per_sec).unwrap_or(0.0)
    }
}

/// Everything one device-listing call reports.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Topology {
    pub devices:     Vec<DeviceInfo>,
    pub raid_groups: Vec<RaidGroup>,
}

impl Topology {
    /// Enforce the membership rules: a group only keeps members that are
    /// attached, a device belongs to the first group that claims it, and
    /// groups left without members are dropped.
    pub fn normalize(mut self) -> Self {
        let attached: HashSet<String> = self.devices.iter().map(|d| d.id.clone()).collect();
        let mut claimed: HashSet<String> = HashSet::new();

        for group in &mut self.raid_groups {
            group.members.retain(|m| {
                if !attached.contains(m) {
                    return false;
                }
                if !claimed.insert(m.clone()) {
                    warn!(device = %m, group = %group.id, "device already claimed by another RAID set");
                    return false;
                }
                true
            });
        }
        self.raid_groups.retain(|g| !g.members.is_empty());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(id: &str, members: &[&str]) -> RaidGroup {
        RaidGroup::new(id, id, members.iter().map(|s| s.to_string()).collect())
    }

    fn owners<'a>(topo: &'a Topology, id: &str) -> Vec<&'a str> {
        topo.raid_groups
            .iter()
            .filter(|g| g.members.iter().any(|m| m == id))
            .map(|g| g.id.as_str())
            .collect()
    }

    #[test]
    fn normalize_keeps_attached_members() {
        let topo = Topology {
            devices: vec![
                DeviceInfo::new("disk4", "A", 10),
                DeviceInfo::new("disk5", "B", 10),
                DeviceInfo::new("disk6", "C", 10),
            ],
            raid_groups: vec![group("Stripe", &["disk4", "disk5"])],
        }
        .normalize();

        assert_eq!(owners(&topo, "disk4"), vec!["Stripe"]);
        assert_eq!(owners(&topo, "disk5"), vec!["Stripe"]);
        assert!(owners(&topo, "disk6").is_empty());
    }

    #[test]
    fn normalize_keeps_device_in_first_group_only() {
        let topo = Topology {
            devices: vec![DeviceInfo::new("disk4", "A", 10), DeviceInfo::new("disk5", "B", 10)],
            raid_groups: vec![group("first", &["disk4"]), group("second", &["disk4", "disk5"])],
        }
        .normalize();

        assert_eq!(topo.raid_groups[0].members, vec!["disk4"]);
        assert_eq!(topo.raid_groups[1].members, vec!["disk5"]);
        assert_eq!(owners(&topo, "disk4"), vec!["first"]);
    }

    #[test]
    fn normalize_drops_groups_without_attached_members() {
        let topo = Topology {
            devices: vec![DeviceInfo::new("disk4", "A", 10)],
            raid_groups: vec![group("internal", &["disk0", "disk1"])],
        }
        .normalize();

        assert!(topo.raid_groups.is_empty());
        assert_eq!(topo.devices.len(), 1);
    }
}
