use crate::models::device::Celsius;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Throughput of one device (or one RAID set) over the last interval.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sample {
    pub device_id:           String,
    pub read_bytes_per_sec:  f64,
    pub write_bytes_per_sec: f64,
    pub at:                  DateTime<Utc>,
}

impl Sample {
    pub fn idle(device_id: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self { device_id: device_id.into(), read_bytes_per_sec: 0.0, write_bytes_per_sec: 0.0, at }
    }
}

/// One line of the published view: a standalone device or a RAID set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Row {
    pub id:                  String,
    pub name:                String,
    pub capacity_bytes:      u64,
    /// `None` means unavailable, which is not the same as 0°C.
    pub temperature:         Option<Celsius>,
    pub read_bytes_per_sec:  f64,
    pub write_bytes_per_sec: f64,
    /// Member rows for a RAID set, empty for a plain device.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub members:             Vec<Row>,
}

impl Row {
    pub fn is_group(&self) -> bool {
        !self.members.is_empty()
    }
}

/// Immutable result of one refresh tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub tick:     u64,
    pub taken_at: DateTime<Utc>,
    pub rows:     Vec<Row>,
    /// Set when a probe failed this tick and older values are shown.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice:   Option<String>,
}

impl Snapshot {
    /// Finds a top-level row or a RAID member row by id.
    pub fn find(&self, id: &str) -> Option<&Row> {
        self.rows.iter().find_map(|r| {
            if r.id == id {
                Some(r)
            } else {
                r.members.iter().find(|m| m.id == id)
            }
        })
    }
}
