use crate::models::raid::RaidGroup;
use crate::models::snapshot::{Row, Sample};
use chrono::{DateTime, Utc};

/// Merge member samples into one sample for the whole set. Rates are the
/// plain sum of member rates.
pub fn aggregate(group: &RaidGroup, members: &[Sample], at: DateTime<Utc>) -> Sample {
    Sample {
        device_id:           group.id.clone(),
        read_bytes_per_sec:  members.iter().map(|s| s.read_bytes_per_sec).sum(),
        write_bytes_per_sec: members.iter().map(|s| s.write_bytes_per_sec).sum(),
        at,
    }
}

/// Build the published row for a RAID set from its member rows. RAID sets
/// carry no temperature of their own.
pub fn group_row(group: &RaidGroup, name: Option<&str>, members: Vec<Row>, at: DateTime<Utc>) -> Row {
    let samples: Vec<Sample> = members
        .iter()
        .map(|m| Sample {
            device_id:           m.id.clone(),
            read_bytes_per_sec:  m.read_bytes_per_sec,
            write_bytes_per_sec: m.write_bytes_per_sec,
            at,
        })
        .collect();
    let total = aggregate(group, &samples, at);

    let capacity_bytes = group
        .capacity_bytes
        .unwrap_or_else(|| members.iter().map(|m| m.capacity_bytes).sum());

    Row {
        id:                  group.id.clone(),
        name:                name.map(str::to_string).unwrap_or_else(|| group.display_name()),
        capacity_bytes,
        temperature:         None,
        read_bytes_per_sec:  total.read_bytes_per_sec,
        write_bytes_per_sec: total.write_bytes_per_sec,
        members,
    }
}
