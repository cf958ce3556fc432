use crate::model::{ContainerRecord, DisplayRow, RowStyle};

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Column {
    pub title: &'static str,
    pub width: u16,
}

pub const COLUMNS: [Column; 7] = [
    Column {
        title: "Container ID",
        width: 20,
    },
    Column {
        title: "Image",
        width: 20,
    },
    Column {
        title: "Command",
        width: 20,
    },
    Column {
        title: "Created",
        width: 20,
    },
    Column {
        title: "Status",
        width: 20,
    },
    Column {
        title: "Ports",
        width: 20,
    },
    Column {
        title: "Names",
        width: 15,
    },
];

pub fn headers() -> Vec<String> {
    COLUMNS.iter().map(|column| column.title.to_string()).collect()
}

/// Maps records to display rows, one per record and in source order.
/// Styling is derived from the status text alone, so calling this again on
/// the same records always yields the same rows.
pub fn project(records: &[ContainerRecord], selection: Option<usize>) -> Vec<DisplayRow> {
    records
        .iter()
        .enumerate()
        .map(|(index, record)| DisplayRow {
            cells: cells_for(record),
            style: style_for(record),
            selected: selection == Some(index),
        })
        .collect()
}

fn cells_for(record: &ContainerRecord) -> Vec<String> {
    [
        &record.id,
        &record.image,
        &record.command,
        &record.created,
        &record.status,
        &record.ports,
        &record.names,
    ]
    .into_iter()
    .zip(COLUMNS)
    .map(|(value, column)| compact_text(value, column.width as usize))
    .collect()
}

fn style_for(record: &ContainerRecord) -> RowStyle {
    if record.state().is_terminal() {
        RowStyle::Muted
    } else {
        RowStyle::Default
    }
}

/// Plain fixed-width rendering used by the non-interactive `ps` command.
pub fn format_plain(rows: &[DisplayRow]) -> String {
    let mut out = String::new();
    push_padded_line(&mut out, COLUMNS.iter().map(|column| column.title));
    for row in rows {
        push_padded_line(&mut out, row.cells.iter().map(String::as_str));
    }
    out
}

fn push_padded_line<'a>(out: &mut String, cells: impl Iterator<Item = &'a str>) {
    let line = cells
        .zip(COLUMNS)
        .map(|(cell, column)| {
            let padding = (column.width as usize).saturating_sub(cell.chars().count());
            format!("{cell}{}", " ".repeat(padding))
        })
        .collect::<Vec<_>>()
        .join(" ");
    out.push_str(line.trim_end());
    out.push('\n');
}

pub fn compact_text(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }

    if max_chars <= 1 {
        return "…".to_string();
    }

    let mut out = value
        .chars()
        .take(max_chars.saturating_sub(1))
        .collect::<String>();
    out.push('…');
    out
}
