use crate::model::ContainerRecord;
use tracing::warn;

pub const FIELD_DELIMITER: char = '\t';
pub const FIELD_COUNT: usize = 7;

/// Go template handed to `docker ps --format`; the field order must match [`parse`].
pub const PS_FORMAT: &str =
    "{{.ID}}\t{{.Image}}\t{{.Command}}\t{{.CreatedAt}}\t{{.Status}}\t{{.Ports}}\t{{.Names}}";

#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct ParsedRows {
    pub records: Vec<ContainerRecord>,
    pub skipped: usize,
}

/// Parses `docker ps` output into records. Lines with the wrong number of
/// fields are skipped and counted instead of failing the whole refresh.
pub fn parse(raw: &str) -> ParsedRows {
    let mut parsed = ParsedRows::default();

    for (index, line) in raw.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }

        match parse_line(line) {
            Some(record) => parsed.records.push(record),
            None => {
                warn!(
                    "skipping malformed container row {}: expected {FIELD_COUNT} fields",
                    index + 1
                );
                parsed.skipped += 1;
            }
        }
    }

    parsed
}

fn parse_line(line: &str) -> Option<ContainerRecord> {
    let fields = line
        .split(FIELD_DELIMITER)
        .map(str::trim)
        .collect::<Vec<_>>();
    let [id, image, command, created, status, ports, names] = fields.as_slice() else {
        return None;
    };

    Some(ContainerRecord {
        id: id.to_string(),
        image: image.to_string(),
        command: command.to_string(),
        created: created.to_string(),
        status: status.to_string(),
        ports: ports.to_string(),
        names: names.to_string(),
    })
}
