use crate::docker::{DispatchError, prepare_request};
use crate::input::Action;
use crate::model::{
    ActionKind, ActionRequest, ContainerRecord, ContainerTable, DisplayRow, PendingAction,
};
use crate::{parser, table};
use chrono::{DateTime, Local};
use std::collections::HashSet;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Phase {
    Loading,
    Ready,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum StatusLevel {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    None,
    Refresh { generation: u64 },
    Dispatch(ActionRequest),
    Attach(ActionRequest),
}

#[derive(Debug, Clone)]
pub enum AppEvent {
    RefreshCompleted {
        generation: u64,
        result: Result<String, DispatchError>,
    },
    ActionCompleted {
        request: ActionRequest,
        result: Result<String, DispatchError>,
    },
}

pub struct App {
    running: bool,
    phase: Phase,
    focused: bool,
    table: ContainerTable,
    pending: HashSet<PendingAction>,
    spinner_phase: usize,
    status: String,
    status_level: StatusLevel,
    issued_generation: u64,
    applied_generation: u64,
    explicit_refresh: Option<u64>,
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

impl App {
    pub fn new() -> Self {
        Self {
            running: true,
            phase: Phase::Loading,
            focused: true,
            table: ContainerTable::default(),
            pending: HashSet::new(),
            spinner_phase: 0,
            status: "Loading containers".to_string(),
            status_level: StatusLevel::Info,
            issued_generation: 0,
            applied_generation: 0,
            explicit_refresh: None,
        }
    }

    /// Issues the initial refresh. The app stays in `Loading` until it completes.
    pub fn start(&mut self) -> AppCommand {
        self.phase = Phase::Loading;
        self.next_refresh()
    }

    pub fn running(&self) -> bool {
        self.running
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn focused(&self) -> bool {
        self.focused
    }

    pub fn records(&self) -> &[ContainerRecord] {
        &self.table.records
    }

    pub fn selected_index(&self) -> Option<usize> {
        if self.table.records.is_empty() {
            None
        } else {
            Some(self.table.selected)
        }
    }

    pub fn display_rows(&self) -> Vec<DisplayRow> {
        table::project(&self.table.records, self.selected_index())
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn status_level(&self) -> StatusLevel {
        self.status_level
    }

    pub fn refresh_error(&self) -> Option<&str> {
        self.table.error.as_deref()
    }

    pub fn skipped_rows(&self) -> usize {
        self.table.skipped
    }

    pub fn last_refreshed(&self) -> Option<DateTime<Local>> {
        self.table.last_refreshed
    }

    pub fn spinner_phase(&self) -> usize {
        self.spinner_phase
    }

    /// True while a user-requested refresh has not been answered yet.
    pub fn refreshing(&self) -> bool {
        self.explicit_refresh.is_some()
    }

    #[cfg(test)]
    pub fn is_pending(&self, kind: ActionKind, target: &str) -> bool {
        self.pending.contains(&PendingAction {
            kind,
            target: target.to_string(),
        })
    }

    pub fn pending_summary(&self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }

        let mut entries = self
            .pending
            .iter()
            .map(|pending| format!("{} {}", pending.kind, pending.target))
            .collect::<Vec<_>>();
        entries.sort();
        Some(format!("pending: {}", entries.join(", ")))
    }

    pub fn tick(&mut self) {
        if self.phase == Phase::Loading || self.refreshing() {
            self.spinner_phase = self.spinner_phase.wrapping_add(1);
        }
    }

    pub fn apply_action(&mut self, action: Action) -> AppCommand {
        match action {
            Action::Quit => {
                self.running = false;
                if !self.pending.is_empty() {
                    info!(
                        "quitting with {} pending container actions",
                        self.pending.len()
                    );
                }
                AppCommand::None
            }
            Action::Down => {
                if self.focused {
                    self.table.move_selection(1);
                }
                AppCommand::None
            }
            Action::Up => {
                if self.focused {
                    self.table.move_selection(-1);
                }
                AppCommand::None
            }
            Action::ToggleFocus => {
                self.focused = !self.focused;
                AppCommand::None
            }
            Action::Refresh => {
                let command = self.next_refresh();
                if let AppCommand::Refresh { generation } = command {
                    self.explicit_refresh = Some(generation);
                }
                self.set_status("Refreshing containers");
                command
            }
            Action::Container(kind) => self.request_container_action(kind),
        }
    }

    pub fn handle_event(&mut self, event: AppEvent) -> AppCommand {
        match event {
            AppEvent::RefreshCompleted { generation, result } => {
                self.apply_refresh(generation, result);
                AppCommand::None
            }
            AppEvent::ActionCompleted { request, result } => {
                self.complete_action(request, result)
            }
        }
    }

    fn request_container_action(&mut self, kind: ActionKind) -> AppCommand {
        let Some(record) = self.table.selected_record() else {
            return AppCommand::None;
        };

        let request = match prepare_request(kind, record) {
            Ok(request) => request,
            Err(error) => {
                let message = format!("{} rejected: {error}", kind.title());
                self.set_error_status(message);
                return AppCommand::None;
            }
        };

        let key = request.pending_key();
        if self.conflicts_with_pending(&key) {
            debug!("dropping duplicate {} for {}", key.kind, key.target);
            return AppCommand::None;
        }

        self.set_status(format!("{} {}", kind.progress_label(), request.target));
        self.pending.insert(key);
        if kind.is_interactive() {
            AppCommand::Attach(request)
        } else {
            AppCommand::Dispatch(request)
        }
    }

    /// Mutating actions share one slot per target; open only dedupes itself.
    fn conflicts_with_pending(&self, key: &PendingAction) -> bool {
        if self.pending.contains(key) {
            return true;
        }
        key.kind.is_mutating()
            && self
                .pending
                .iter()
                .any(|pending| pending.target == key.target && pending.kind.is_mutating())
    }

    fn apply_refresh(&mut self, generation: u64, result: Result<String, DispatchError>) {
        if generation <= self.applied_generation {
            debug!(
                "discarding stale refresh {generation} (applied {})",
                self.applied_generation
            );
            return;
        }
        self.applied_generation = generation;
        let answers_explicit = self
            .explicit_refresh
            .is_some_and(|requested| requested <= generation);
        if answers_explicit {
            self.explicit_refresh = None;
        }

        let now = Local::now();
        match result {
            Ok(raw) => {
                let parsed = parser::parse(&raw);
                debug!(
                    "refresh {generation}: {} containers, {} skipped",
                    parsed.records.len(),
                    parsed.skipped
                );
                self.table.set_records(parsed.records, parsed.skipped, now);
                if self.phase == Phase::Loading || answers_explicit {
                    self.set_status(format!("Loaded {} containers", self.table.records.len()));
                }
            }
            Err(error) => {
                warn!("container refresh failed: {error}");
                if answers_explicit {
                    self.set_error_status("Refresh failed");
                }
                self.table
                    .set_error(summarize_error_line(&error.to_string()), now);
            }
        }
        self.phase = Phase::Ready;
    }

    fn complete_action(
        &mut self,
        request: ActionRequest,
        result: Result<String, DispatchError>,
    ) -> AppCommand {
        self.pending.remove(&request.pending_key());

        match result {
            Ok(_) => {
                info!("{} {} completed", request.kind, request.target);
                self.set_status(format!("{} {}", request.kind.done_label(), request.target));
            }
            Err(error) => {
                warn!("{} {} failed: {error}", request.kind, request.target);
                self.set_error_status(format!(
                    "{} failed for {}: {}",
                    request.kind.title(),
                    request.target,
                    summarize_error_line(&error.to_string())
                ));
            }
        }

        if request.kind.is_mutating() {
            self.next_refresh()
        } else {
            AppCommand::None
        }
    }

    fn next_refresh(&mut self) -> AppCommand {
        self.issued_generation += 1;
        AppCommand::Refresh {
            generation: self.issued_generation,
        }
    }

    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = normalize_status_text(status.into());
        self.status_level = StatusLevel::Info;
    }

    fn set_error_status(&mut self, status: impl Into<String>) {
        self.status = normalize_status_text(status.into());
        self.status_level = StatusLevel::Error;
    }
}

fn summarize_error_line(error: &str) -> String {
    error
        .lines()
        .find(|line| !line.trim().is_empty())
        .map(|line| line.trim().to_string())
        .unwrap_or_else(|| "unknown error".to_string())
}

fn normalize_status_text(status: String) -> String {
    const MAX_STATUS_LEN: usize = 180;
    if status.chars().count() <= MAX_STATUS_LEN {
        return status;
    }

    let mut shortened = status
        .chars()
        .take(MAX_STATUS_LEN.saturating_sub(1))
        .collect::<String>();
    shortened.push('…');
    shortened
}
