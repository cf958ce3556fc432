use chrono::{DateTime, Local};
use std::fmt::{Display, Formatter};

/// Status keywords that mark a container as no longer running.
pub const TERMINAL_STATUS_KEYWORDS: [&str; 2] = ["Exited", "Stopped"];

#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct ContainerRecord {
    pub id: String,
    pub image: String,
    pub command: String,
    pub created: String,
    pub status: String,
    pub ports: String,
    pub names: String,
}

impl ContainerRecord {
    pub fn state(&self) -> ContainerState {
        ContainerState::classify(&self.status)
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ContainerState {
    Running,
    Stopped,
    Other,
}

impl ContainerState {
    pub fn classify(status: &str) -> Self {
        if TERMINAL_STATUS_KEYWORDS
            .iter()
            .any(|keyword| status.contains(keyword))
        {
            Self::Stopped
        } else if status.trim_start().starts_with("Up") {
            Self::Running
        } else {
            Self::Other
        }
    }

    pub fn is_terminal(self) -> bool {
        self == Self::Stopped
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum ActionKind {
    Attach,
    Stop,
    Restart,
    Delete,
    Open,
}

impl ActionKind {
    pub fn title(self) -> &'static str {
        match self {
            Self::Attach => "Attach",
            Self::Stop => "Stop",
            Self::Restart => "Restart",
            Self::Delete => "Delete",
            Self::Open => "Open",
        }
    }

    pub fn progress_label(self) -> &'static str {
        match self {
            Self::Attach => "Attaching to",
            Self::Stop => "Stopping",
            Self::Restart => "Restarting",
            Self::Delete => "Deleting",
            Self::Open => "Opening endpoint of",
        }
    }

    pub fn done_label(self) -> &'static str {
        match self {
            Self::Attach => "Shell session closed for",
            Self::Stop => "Stopped",
            Self::Restart => "Restarted",
            Self::Delete => "Deleted",
            Self::Open => "Opened endpoint of",
        }
    }

    /// Actions that change container state and therefore need a refresh once done.
    pub fn is_mutating(self) -> bool {
        matches!(self, Self::Stop | Self::Restart | Self::Delete | Self::Attach)
    }

    pub fn is_interactive(self) -> bool {
        self == Self::Attach
    }
}

impl Display for ActionKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.title().to_ascii_lowercase())
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct PendingAction {
    pub kind: ActionKind,
    pub target: String,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ActionRequest {
    pub kind: ActionKind,
    pub target: String,
    pub endpoint: Option<String>,
}

impl ActionRequest {
    pub fn pending_key(&self) -> PendingAction {
        PendingAction {
            kind: self.kind,
            target: self.target.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum RowStyle {
    Default,
    Muted,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct DisplayRow {
    pub cells: Vec<String>,
    pub style: RowStyle,
    pub selected: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ContainerTable {
    pub records: Vec<ContainerRecord>,
    pub selected: usize,
    pub skipped: usize,
    pub last_refreshed: Option<DateTime<Local>>,
    pub error: Option<String>,
}

impl ContainerTable {
    pub fn set_records(
        &mut self,
        records: Vec<ContainerRecord>,
        skipped: usize,
        refreshed_at: DateTime<Local>,
    ) {
        let previous_id = self.selected_record().map(|record| record.id.clone());
        self.records = records;
        self.skipped = skipped;
        self.last_refreshed = Some(refreshed_at);
        self.error = None;

        let followed = previous_id
            .and_then(|id| self.records.iter().position(|record| record.id == id));
        self.selected = followed.unwrap_or(self.selected);
        self.clamp_selection();
    }

    pub fn set_error(&mut self, error: impl Into<String>, refreshed_at: DateTime<Local>) {
        self.records.clear();
        self.skipped = 0;
        self.error = Some(error.into());
        self.last_refreshed = Some(refreshed_at);
        self.selected = 0;
    }

    pub fn selected_record(&self) -> Option<&ContainerRecord> {
        self.records.get(self.selected)
    }

    pub fn move_selection(&mut self, delta: isize) {
        if self.records.is_empty() {
            self.selected = 0;
            return;
        }
        let max_index = self.records.len().saturating_sub(1) as isize;
        self.selected = (self.selected as isize + delta).clamp(0, max_index) as usize;
    }

    fn clamp_selection(&mut self) {
        self.selected = self.selected.min(self.records.len().saturating_sub(1));
    }
}

#[cfg(test)]
mod tests {
    use super::{ActionKind, ContainerRecord, ContainerState, ContainerTable};
    use chrono::Local;

    fn record(id: &str, status: &str) -> ContainerRecord {
        ContainerRecord {
            id: id.to_string(),
            status: status.to_string(),
            ..ContainerRecord::default()
        }
    }

    #[test]
    fn status_classification_recognizes_terminal_keywords() {
        assert_eq!(
            ContainerState::classify("Up 2 hours"),
            ContainerState::Running
        );
        assert_eq!(
            ContainerState::classify("Exited (0) 3 hours ago"),
            ContainerState::Stopped
        );
        assert_eq!(ContainerState::classify("Stopped"), ContainerState::Stopped);
        assert_eq!(ContainerState::classify("Created"), ContainerState::Other);
        assert!(!ContainerState::classify("Up 1 second (Paused)").is_terminal());
    }

    #[test]
    fn selection_is_clamped_when_rows_shrink() {
        let mut table = ContainerTable::default();
        table.set_records(
            vec![record("a", "Up"), record("b", "Up"), record("c", "Up")],
            0,
            Local::now(),
        );
        table.move_selection(5);
        assert_eq!(table.selected, 2);

        table.set_records(vec![record("x", "Up")], 0, Local::now());
        assert_eq!(table.selected, 0);

        table.set_records(Vec::new(), 0, Local::now());
        assert_eq!(table.selected, 0);
        assert!(table.selected_record().is_none());
    }

    #[test]
    fn selection_follows_identifier_across_refresh() {
        let mut table = ContainerTable::default();
        table.set_records(
            vec![record("a", "Up"), record("b", "Up"), record("c", "Up")],
            0,
            Local::now(),
        );
        table.move_selection(1);
        assert_eq!(table.selected_record().map(|r| r.id.as_str()), Some("b"));

        table.set_records(
            vec![record("new", "Up"), record("a", "Up"), record("b", "Up")],
            0,
            Local::now(),
        );
        assert_eq!(table.selected, 2);
    }

    #[test]
    fn error_clears_records_and_selection() {
        let mut table = ContainerTable::default();
        table.set_records(vec![record("a", "Up"), record("b", "Up")], 1, Local::now());
        table.move_selection(1);
        table.set_error("daemon not running", Local::now());
        assert!(table.records.is_empty());
        assert_eq!(table.selected, 0);
        assert_eq!(table.skipped, 0);
        assert_eq!(table.error.as_deref(), Some("daemon not running"));
    }

    #[test]
    fn open_is_the_only_non_mutating_action() {
        assert!(!ActionKind::Open.is_mutating());
        assert!(ActionKind::Stop.is_mutating());
        assert!(ActionKind::Delete.is_mutating());
        assert!(ActionKind::Attach.is_interactive());
    }
}
