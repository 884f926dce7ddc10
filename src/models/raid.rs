use serde::Serialize;

/// One RAID set presented as a single logical volume.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RaidGroup {
    pub id:             String,
    pub name:           String,
    /// Member device ids in the order the platform lists them.
    pub members:        Vec<String>,
    /// Logical size of the set when the platform reports one.
    pub capacity_bytes: Option<u64>,
}

impl RaidGroup {
    pub fn new(id: impl Into<String>, name: impl Into<String>, members: Vec<String>) -> Self {
        Self { id: id.into(), name: name.into(), members, capacity_bytes: None }
    }

    /// "Backup (disk4, disk5)"
    pub fn display_name(&self) -> String {
        let mut short: Vec<&str> = self.members.iter().map(String::as_str).collect();
        short.sort();
        format!("{} ({})", self.name, short.join(", "))
    }
}
