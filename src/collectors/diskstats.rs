use crate::collectors::CounterProbe;
use crate::error::ProbeResult;
use crate::models::device::Counters;
use std::collections::HashMap;

const SECTOR_BYTES: u64 = 512;

/// Linux cumulative I/O counters from /proc/diskstats.
pub struct DiskstatsProbe;

impl CounterProbe for DiskstatsProbe {
    fn read_counters(&mut self, ids: &[String]) -> ProbeResult<HashMap<String, Counters>> {
        let content = std::fs::read_to_string("/proc/diskstats")?;
        let mut all = parse_diskstats(&content);
        all.retain(|id, _| ids.iter().any(|i| i == id));
        Ok(all)
    }
}

/// Device name → cumulative bytes. Sectors are always 512 bytes here,
/// whatever the device's physical block size.
pub fn parse_diskstats(content: &str) -> HashMap<String, Counters> {
    let mut map = HashMap::new();

    for line in content.lines() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 14 { continue; }

        let name = fields[2];
        if name.starts_with("loop") || name.starts_with("ram") || name.starts_with("zram") {
            continue;
        }

        let (Ok(sectors_read), Ok(sectors_written)) = (fields[5].parse::<u64>(), fields[9].parse::<u64>()) else {
            continue;
        };
        map.insert(
            name.to_string(),
            Counters::new(sectors_read * SECTOR_BYTES, sectors_written * SECTOR_BYTES),
        );
    }
    map
}
