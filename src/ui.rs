use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState};

use crate::app::{App, Phase, StatusLevel};
use crate::input;
use crate::model::RowStyle;
use crate::table::{self, COLUMNS};

pub const DOTS_SPINNER: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Colours used by the renderer; loaded from the config file, never mutated at runtime.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Theme {
    pub accent: Color,
    pub header: Color,
    pub muted: Color,
    pub selected_fg: Color,
    pub selected_bg: Color,
    pub legend: Color,
    pub error: Color,
    pub spinner: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            accent: Color::Indexed(240),
            header: Color::White,
            muted: Color::Indexed(8),
            selected_fg: Color::Indexed(229),
            selected_bg: Color::Indexed(57),
            legend: Color::Indexed(241),
            error: Color::Rgb(248, 113, 113),
            spinner: Color::Indexed(205),
        }
    }
}

pub fn spinner_frame(index: usize) -> &'static str {
    DOTS_SPINNER[index % DOTS_SPINNER.len()]
}

pub fn render(frame: &mut Frame, app: &App, theme: &Theme) {
    let area = frame.area();
    match app.phase() {
        Phase::Loading => render_loading(frame, area, app, theme),
        Phase::Ready => render_ready(frame, area, app, theme),
    }
}

fn render_loading(frame: &mut Frame, area: Rect, app: &App, theme: &Theme) {
    let line = Line::from(vec![
        Span::raw(" "),
        Span::styled(
            spinner_frame(app.spinner_phase()),
            Style::default().fg(theme.spinner),
        ),
        Span::raw(" Loading..."),
    ]);
    let text = Text::from(vec![Line::from(""), Line::from(""), line]);
    frame.render_widget(Paragraph::new(text), area);
}

fn render_ready(frame: &mut Frame, area: Rect, app: &App, theme: &Theme) {
    let root = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(3),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(area);

    render_table(frame, root[0], app, theme);
    render_status(frame, root[1], app, theme);
    render_legend(frame, root[2], theme);
}

fn render_table(frame: &mut Frame, area: Rect, app: &App, theme: &Theme) {
    let header_row = Row::new(
        table::headers()
            .into_iter()
            .map(|header| Cell::from(header).style(Style::default().fg(theme.header))),
    )
    .height(1)
    .style(Style::default().add_modifier(Modifier::BOLD));

    let rows = app.display_rows().into_iter().map(|row| {
        let style = match row.style {
            RowStyle::Muted => Style::default().fg(theme.muted),
            RowStyle::Default => Style::default(),
        };
        Row::new(row.cells.into_iter().map(|cell| Cell::from(cell).style(style)))
    });

    let border_style = if app.focused() {
        Style::default().fg(theme.accent)
    } else {
        Style::default().fg(theme.muted)
    };
    let block = Block::default()
        .title(table_title(app, theme))
        .borders(Borders::ALL)
        .border_style(border_style);

    let highlight = if app.focused() {
        Style::default()
            .fg(theme.selected_fg)
            .bg(theme.selected_bg)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().add_modifier(Modifier::BOLD)
    };

    let table = Table::new(
        rows,
        COLUMNS
            .iter()
            .map(|column| Constraint::Length(column.width))
            .collect::<Vec<_>>(),
    )
    .header(header_row)
    .block(block)
    .column_spacing(1)
    .row_highlight_style(highlight);

    let mut state = TableState::default();
    state.select(app.selected_index());
    frame.render_stateful_widget(table, area, &mut state);
}

fn table_title(app: &App, theme: &Theme) -> Line<'static> {
    let mut spans = vec![Span::raw(format!(" Containers ({}) ", app.records().len()))];

    if let Some(error) = app.refresh_error() {
        spans.push(Span::styled(
            format!("refresh failed: {} ", table::compact_text(error, 80)),
            Style::default().fg(theme.error),
        ));
    } else if let Some(refreshed) = app.last_refreshed() {
        spans.push(Span::raw(format!("updated {} ", refreshed.format("%H:%M:%S"))));
    }

    if app.refreshing() {
        spans.push(Span::styled(
            format!("{} refreshing ", spinner_frame(app.spinner_phase())),
            Style::default().fg(theme.spinner),
        ));
    }

    Line::from(spans)
}

fn render_status(frame: &mut Frame, area: Rect, app: &App, theme: &Theme) {
    let status_style = match app.status_level() {
        StatusLevel::Info => Style::default(),
        StatusLevel::Error => Style::default().fg(theme.error),
    };
    let mut spans = vec![Span::styled(format!("  {}", app.status()), status_style)];
    if app.skipped_rows() > 0 {
        spans.push(Span::styled(
            format!("  ({} malformed rows skipped)", app.skipped_rows()),
            Style::default().fg(theme.error),
        ));
    }
    if let Some(pending) = app.pending_summary() {
        spans.push(Span::styled(
            format!("  [{pending}]"),
            Style::default().fg(theme.legend),
        ));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_legend(frame: &mut Frame, area: Rect, theme: &Theme) {
    let legend = Paragraph::new(format!("  {}", input::legend()))
        .style(Style::default().fg(theme.legend));
    frame.render_widget(legend, area);
}

#[cfg(test)]
mod tests {
    use super::{Theme, render};
    use crate::app::{App, AppCommand, AppEvent};
    use crate::input::{self, Action};
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;
    use ratatui::buffer::Buffer;

    const TWO_ROWS: &str = "abc123\tnginx\tnginx -g daemon\t2024-01-01\tUp 2 hours\t0.0.0.0:8080->80/tcp\tweb\n\
                            def456\tredis\tredis-server\t2024-01-02\tExited (0) 3 hours ago\t\tcache\n";

    fn ready_app(raw: &str) -> App {
        let mut app = App::new();
        let AppCommand::Refresh { generation } = app.start() else {
            panic!("expected refresh");
        };
        app.handle_event(AppEvent::RefreshCompleted {
            generation,
            result: Ok(raw.to_string()),
        });
        app
    }

    fn draw(app: &App, theme: &Theme) -> Buffer {
        let mut terminal = Terminal::new(TestBackend::new(170, 12)).unwrap();
        terminal.draw(|frame| render(frame, app, theme)).unwrap();
        terminal.backend().buffer().clone()
    }

    fn lines(buffer: &Buffer) -> Vec<String> {
        (0..buffer.area.height)
            .map(|y| {
                (0..buffer.area.width)
                    .map(|x| buffer[(x, y)].symbol().to_string())
                    .collect::<String>()
            })
            .collect()
    }

    fn find_text(buffer: &Buffer, needle: &str) -> Option<(u16, u16)> {
        let wanted = needle.chars().map(|c| c.to_string()).collect::<Vec<_>>();
        for y in 0..buffer.area.height {
            let symbols = (0..buffer.area.width)
                .map(|x| buffer[(x, y)].symbol().to_string())
                .collect::<Vec<_>>();
            if let Some(x) = symbols
                .windows(wanted.len())
                .position(|window| window == wanted.as_slice())
            {
                return Some((x as u16, y));
            }
        }
        None
    }

    #[test]
    fn loading_renders_single_indicator_line() {
        let mut app = App::new();
        let _ = app.start();
        let buffer = draw(&app, &Theme::default());
        let lines = lines(&buffer);
        let non_blank = lines
            .iter()
            .filter(|line| !line.trim().is_empty())
            .collect::<Vec<_>>();
        assert_eq!(non_blank.len(), 1);
        assert!(non_blank[0].contains("Loading..."));
    }

    #[test]
    fn empty_table_renders_header_and_legend_only() {
        let app = ready_app("");
        let buffer = draw(&app, &Theme::default());
        let lines = lines(&buffer);
        assert!(lines[1].contains("Container ID"));
        assert!(lines[1].contains("Names"));
        assert!(lines[2].trim_matches(|c: char| c == '│' || c == ' ').is_empty());
        assert!(lines.last().is_some_and(|line| line.contains(&input::legend())));
        assert!(lines[0].contains("Containers (0)"));
    }

    #[test]
    fn exited_rows_use_muted_color() {
        let theme = Theme::default();
        let app = ready_app(TWO_ROWS);
        let buffer = draw(&app, &theme);

        let (x, y) = find_text(&buffer, "def456").expect("exited row rendered");
        assert_eq!(buffer[(x, y)].fg, theme.muted);

        let (x, y) = find_text(&buffer, "nginx -g").expect("running row rendered");
        assert_ne!(buffer[(x, y)].fg, theme.muted);
    }

    #[test]
    fn rendering_twice_is_identical() {
        let theme = Theme::default();
        let mut app = ready_app(TWO_ROWS);
        app.apply_action(Action::Down);
        assert_eq!(draw(&app, &theme), draw(&app, &theme));
    }

    #[test]
    fn rejected_action_is_shown_in_status_line() {
        let theme = Theme::default();
        let mut app = ready_app(TWO_ROWS);
        app.apply_action(Action::Down);
        app.apply_action(Action::Container(crate::model::ActionKind::Attach));
        let buffer = draw(&app, &theme);
        let (x, y) = find_text(&buffer, "cannot attach").expect("status rendered");
        assert_eq!(buffer[(x, y)].fg, theme.error);
    }
}
