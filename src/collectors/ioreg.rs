use crate::collectors::{command, diskutil, CounterProbe};
use crate::error::ProbeResult;
use crate::models::device::Counters;
use std::collections::HashMap;
use std::time::Duration;

/// macOS cumulative I/O counters from the IOBlockStorageDriver statistics.
pub struct IoregProbe {
    timeout: Duration,
}

impl IoregProbe {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl CounterProbe for IoregProbe {
    fn read_counters(&mut self, ids: &[String]) -> ProbeResult<HashMap<String, Counters>> {
        let text = command::run_checked(
            "ioreg",
            &["-r", "-c", "IOBlockStorageDriver", "-l", "-w", "0"],
            self.timeout,
        )?;
        let mut all = parse_ioreg(&text);
        all.retain(|id, _| ids.iter().any(|i| i == id));
        Ok(all)
    }
}

/// Pair each driver's `"Statistics"` dictionary with the first whole-disk
/// `"BSD Name"` that follows it in the registry tree.
pub fn parse_ioreg(text: &str) -> HashMap<String, Counters> {
    let mut map     = HashMap::new();
    let mut pending: Option<Counters> = None;

    for line in text.lines() {
        if line.contains("\"Statistics\"") {
            let read  = stat_value(line, "\"Bytes (Read)\"");
            let write = stat_value(line, "\"Bytes (Write)\"");
            pending = match (read, write) {
                (Some(r), Some(w)) => Some(Counters::new(r, w)),
                _                  => None,
            };
            continue;
        }

        if line.contains("\"BSD Name\"") {
            let Some(name) = quoted_value(line) else { continue };
            let is_whole = diskutil::whole_disk(name).as_deref() == Some(name);
            if is_whole {
                if let Some(c) = pending.take() {
                    map.insert(name.to_string(), c);
                }
            }
        }
    }
    map
}

/// `..."Bytes (Read)"=123456,...` → 123456
fn stat_value(line: &str, key: &str) -> Option<u64> {
    let start = line.find(key)? + key.len();
    let rest  = line[start..].trim_start().strip_prefix('=')?;
    let digits: String = rest.trim_start().chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

/// `"BSD Name" = "disk4"` → disk4
fn quoted_value(line: &str) -> Option<&str> {
    let (_, rhs) = line.split_once('=')?;
    let rhs = rhs.trim();
    rhs.strip_prefix('"')?.strip_suffix('"')
}
