use crate::models::snapshot::{Row, Snapshot};
use crate::util::human::{fmt_bytes, fmt_rate, fmt_temp};
use std::fmt::Write;
use std::time::Duration;

const RULE: &str = "────────────────────────────────────────────────────────────";

/// Text block per row for the `--plain` refresh mode.
pub fn render(snapshot: &Snapshot, interval: Duration) -> String {
    let mut out = String::new();
    let when = snapshot.taken_at.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M:%S");
    let _ = writeln!(out, "External disk monitor  {}", when);
    let _ = writeln!(out, "{}", RULE);

    if let Some(notice) = &snapshot.notice {
        let _ = writeln!(out, "! {}", notice);
    }
    if snapshot.rows.is_empty() {
        let _ = writeln!(out, "No external disks found.");
    }

    for row in &snapshot.rows {
        write_row(&mut out, row, "");
        for m in &row.members {
            write_row(&mut out, m, "    ");
        }
        let _ = writeln!(out);
    }

    let _ = writeln!(out, "Next update in {:.1}s (Ctrl+C to quit)", interval.as_secs_f64());
    out
}

fn write_row(out: &mut String, row: &Row, indent: &str) {
    let title = if row.is_group() { format!("RAID {}", row.name) } else { format!("/dev/{}  {}", row.id, row.name) };
    let _ = writeln!(out, "{}┌─ {}", indent, title);
    let _ = writeln!(out, "{}│  Size:   {}", indent, fmt_bytes(row.capacity_bytes));
    if !row.is_group() {
        let _ = writeln!(out, "{}│  Temp:   {}", indent, fmt_temp(row.temperature));
    }
    let _ = writeln!(out, "{}│  Read:   {}", indent, fmt_rate(row.read_bytes_per_sec));
    let _ = writeln!(out, "{}│  Write:  {}", indent, fmt_rate(row.write_bytes_per_sec));
    let _ = writeln!(out, "{}└─", indent);
}
