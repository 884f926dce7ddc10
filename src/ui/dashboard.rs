use crate::models::snapshot::{Row as SnapshotRow, Snapshot};
use crate::util::human::{fmt_bytes, fmt_rate, fmt_temp};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame,
};

const HEADER: Style = Style::new().fg(Color::Cyan).add_modifier(Modifier::BOLD);
const DIM:    Style = Style::new().fg(Color::DarkGray);
const WARN:   Style = Style::new().fg(Color::Yellow);

pub fn render(f: &mut Frame, snapshot: Option<&Snapshot>, state: &mut TableState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),   // title / clock
            Constraint::Min(3),      // device table
            Constraint::Length(1),   // footer
        ])
        .split(f.area());

    render_title(f, chunks[0], snapshot);
    render_table(f, chunks[1], snapshot, state);
    render_footer(f, chunks[2]);
}

fn render_title(f: &mut Frame, area: Rect, snapshot: Option<&Snapshot>) {
    let clock = snapshot
        .map(|s| s.taken_at.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "waiting for first sample…".to_string());
    let mut spans = vec![
        Span::styled(" xdmon ", HEADER),
        Span::styled("external disks  ", DIM),
        Span::raw(clock),
    ];
    if let Some(notice) = snapshot.and_then(|s| s.notice.as_deref()) {
        spans.push(Span::styled("  │ ", DIM));
        spans.push(Span::styled(notice.to_string(), WARN));
    }
    let line = Line::from(spans);
    f.render_widget(Paragraph::new(line), area);
}

fn render_table(f: &mut Frame, area: Rect, snapshot: Option<&Snapshot>, state: &mut TableState) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(Span::styled("Devices", HEADER));

    let rows: Vec<Row> = match snapshot {
        Some(s) if !s.rows.is_empty() => s.rows.iter().flat_map(table_rows).collect(),
        Some(_) => vec![Row::new(vec![Cell::from(Span::styled("No external disks found", DIM))])],
        None    => Vec::new(),
    };

    let widths = [
        Constraint::Min(24),
        Constraint::Length(10),
        Constraint::Length(6),
        Constraint::Length(12),
        Constraint::Length(12),
    ];
    let header = Row::new(vec!["Name", "Size", "Temp", "Read", "Write"]).style(HEADER);

    let table = Table::new(rows, widths)
        .header(header)
        .block(block)
        .column_spacing(2)
        .row_highlight_style(Style::new().add_modifier(Modifier::REVERSED));
    f.render_stateful_widget(table, area, state);
}

/// Number of table lines a snapshot expands to.
pub fn line_count(snapshot: &Snapshot) -> usize {
    snapshot.rows.iter().map(|r| 1 + r.members.len()).sum()
}

/// A RAID set expands to its own row followed by indented member rows.
fn table_rows(row: &SnapshotRow) -> Vec<Row<'static>> {
    let mut out = Vec::with_capacity(1 + row.members.len());
    let style = if row.is_group() { Style::new().add_modifier(Modifier::BOLD) } else { Style::default() };
    out.push(table_row(row.name.clone(), row, style));

    let last = row.members.len().saturating_sub(1);
    for (i, m) in row.members.iter().enumerate() {
        let branch = if i == last { "└" } else { "├" };
        out.push(table_row(format!("  {} {} ({})", branch, m.name, m.id), m, DIM));
    }
    out
}

fn table_row(name: String, row: &SnapshotRow, style: Style) -> Row<'static> {
    let temp_style = if row.temperature.is_some() { style } else { DIM };
    Row::new(vec![
        Cell::from(name),
        Cell::from(fmt_bytes(row.capacity_bytes)),
        Cell::from(Span::styled(fmt_temp(row.temperature), temp_style)),
        Cell::from(fmt_rate(row.read_bytes_per_sec)),
        Cell::from(fmt_rate(row.write_bytes_per_sec)),
    ])
    .style(style)
}

fn render_footer(f: &mut Frame, area: Rect) {
    let spans = vec![
        Span::styled(" q ", HEADER),
        Span::styled("Quit  ", DIM),
        Span::styled(" ↑↓/jk ", HEADER),
        Span::styled("Scroll  ", DIM),
    ];
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}
