use crate::models::raid::RaidGroup;
use std::fs;

/// Parse /proc/mdstat into RAID groups keyed by their md device.
/// A missing file (no md driver loaded) means no RAID sets.
pub fn read_mdstat() -> Vec<RaidGroup> {
    match fs::read_to_string("/proc/mdstat") {
        Ok(c)  => parse_mdstat(&c),
        Err(_) => Vec::new(),
    }
}

pub fn parse_mdstat(content: &str) -> Vec<RaidGroup> {
    let mut groups = Vec::new();
    let mut lines  = content.lines().peekable();

    while let Some(line) = lines.next() {
        // Each array starts with "mdX : "
        if !line.starts_with("md") || !line.contains(" : ") { continue; }

        let Some((name, rest)) = line.split_once(" : ") else { continue };
        let name = name.trim().to_string();

        // e.g. "active raid1 sdb1[0] sdc1[1]"
        let tokens: Vec<&str> = rest.split_whitespace().collect();
        let level = tokens.iter()
            .find(|t| t.starts_with("raid") || **t == "linear")
            .copied();

        // Member entries like "sdb1[0]" or "sdc1[2](F)", reduced to the disk.
        let mut members: Vec<String> = Vec::new();
        for t in tokens.iter().filter(|t| t.contains('[')) {
            let end  = t.find('[').unwrap_or(t.len());
            let disk = parent_disk(&t[..end]);
            if !members.contains(&disk) {
                members.push(disk);
            }
        }

        // Next line: "976762584 blocks super 1.2 [2/2] [UU]" (1 KiB blocks)
        let mut capacity_bytes = None;
        if let Some(detail) = lines.peek() {
            let detail = detail.trim();
            if detail.starts_with(|c: char| c.is_ascii_digit()) {
                capacity_bytes = detail
                    .split_whitespace()
                    .next()
                    .and_then(|s| s.parse::<u64>().ok())
                    .and_then(|blocks| blocks.checked_mul(1024));
                lines.next();
            }
        }

        let display = match level {
            Some(l) => format!("{} {}", name, l),
            None    => name.clone(),
        };
        let mut group = RaidGroup::new(name, display, members);
        group.capacity_bytes = capacity_bytes;
        groups.push(group);
    }

    groups
}

/// "sda1" → "sda", "nvme0n1p2" → "nvme0n1", "sdb" → "sdb".
pub fn parent_disk(name: &str) -> String {
    if name.starts_with("nvme") || name.starts_with("mmcblk") {
        if let Some(p) = name.rfind('p') {
            let suffix = &name[p + 1..];
            if p > 0 && !suffix.is_empty() && suffix.chars().all(|c| c.is_ascii_digit()) {
                return name[..p].to_string();
            }
        }
        return name.to_string();
    }
    name.trim_end_matches(|c: char| c.is_ascii_digit()).to_string()
}
