mod app;
mod cli;
mod config;
mod docker;
mod input;
mod model;
mod parser;
mod table;
mod ui;

use anyhow::{Context, Result};
use app::{App, AppCommand, AppEvent};
use clap::Parser;
use cli::{CliArgs, Command};
use config::RuntimeConfig;
use crossterm::event::{
    Event, EventStream, KeyEventKind, KeyboardEnhancementFlags, PopKeyboardEnhancementFlags,
    PushKeyboardEnhancementFlags,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
    supports_keyboard_enhancement,
};
use docker::{DispatchError, DockerGateway};
use futures::StreamExt;
use model::ActionRequest;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use std::fs::OpenOptions;
use std::io::{self, Stdout, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::time::{Duration, MissedTickBehavior, interval};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;
use ui::Theme;

type TuiTerminal = Terminal<CrosstermBackend<Stdout>>;

const MIN_TICK_MS: u64 = 16;
const KEYBOARD_FLAGS: KeyboardEnhancementFlags =
    KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES;

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();
    init_tracing(&args.log_filter, args.log_file.as_deref())?;

    let config = resolve_config(&args)?;
    if let Some(source) = &config.source {
        info!("loaded config from {source}");
    }
    let gateway = Arc::new(DockerGateway::new(
        config.docker_bin.clone(),
        config.opener.clone(),
        config.exec_shell.clone(),
    ));

    match args.command {
        Some(Command::Ps) => print_containers(&gateway).await,
        None => run(&gateway, &config.theme, args.tick_ms.max(MIN_TICK_MS)).await,
    }
}

fn init_tracing(level_filter: &str, log_file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_new(level_filter)
        .or_else(|_| EnvFilter::try_new("info"))
        .context("failed to initialize tracing filter")?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact();

    match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open log file {}", path.display()))?;
            let _ = builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init();
        }
        None => {
            let _ = builder.with_writer(std::io::sink).try_init();
        }
    }

    Ok(())
}

fn resolve_config(args: &CliArgs) -> Result<RuntimeConfig> {
    let mut config = config::load(args.config.as_deref())?;
    if let Some(docker_bin) = &args.docker_bin {
        config.docker_bin = docker_bin.clone();
    }
    Ok(config)
}

async fn print_containers(gateway: &DockerGateway) -> Result<()> {
    let raw = gateway.list().await.context("failed to list containers")?;
    let parsed = parser::parse(&raw);
    if parsed.skipped > 0 {
        warn!("skipped {} malformed lines", parsed.skipped);
    }
    let rows = table::project(&parsed.records, None);
    print!("{}", table::format_plain(&rows));
    Ok(())
}

async fn run(gateway: &Arc<DockerGateway>, theme: &Theme, tick_ms: u64) -> Result<()> {
    let mut app = App::new();
    let (mut terminal, keyboard_enhanced) = init_terminal()?;
    let run_result = run_loop(
        &mut terminal,
        &mut app,
        gateway,
        theme,
        tick_ms,
        keyboard_enhanced,
    )
    .await;
    let restore_result = restore_terminal(&mut terminal, keyboard_enhanced);

    match (run_result, restore_result) {
        (Err(run_error), Err(restore_error)) => Err(anyhow::anyhow!(
            "{run_error:#}\nterminal restore error: {restore_error:#}"
        )),
        (Err(error), _) => Err(error),
        (_, Err(error)) => Err(error),
        (Ok(()), Ok(())) => Ok(()),
    }
}

fn init_terminal() -> Result<(TuiTerminal, bool)> {
    enable_raw_mode().context("failed to enable raw mode")?;
    let mut stdout = io::stdout();
    let keyboard_enhanced = matches!(supports_keyboard_enhancement(), Ok(true));
    if keyboard_enhanced {
        execute!(stdout, EnterAlternateScreen, PushKeyboardEnhancementFlags(KEYBOARD_FLAGS))
            .context("failed to enter alternate screen with keyboard enhancement")?;
    } else {
        execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
    }
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("failed to create terminal backend")?;
    terminal.clear().context("failed to clear terminal")?;
    Ok((terminal, keyboard_enhanced))
}

fn restore_terminal(terminal: &mut TuiTerminal, keyboard_enhanced: bool) -> Result<()> {
    if keyboard_enhanced {
        execute!(terminal.backend_mut(), PopKeyboardEnhancementFlags)
            .context("failed to pop keyboard enhancement flags")?;
    }
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("failed to leave alternate screen")?;
    terminal.show_cursor().context("failed to show cursor")?;
    Ok(())
}

async fn run_loop(
    terminal: &mut TuiTerminal,
    app: &mut App,
    gateway: &Arc<DockerGateway>,
    theme: &Theme,
    tick_ms: u64,
    keyboard_enhanced: bool,
) -> Result<()> {
    let mut reader = EventStream::new();
    let mut ticker = interval(Duration::from_millis(tick_ms));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<AppEvent>();

    let command = app.start();
    execute_app_command(terminal, app, gateway, &event_tx, keyboard_enhanced, command).await?;

    loop {
        terminal
            .draw(|frame| ui::render(frame, app, theme))
            .context("failed to render terminal frame")?;

        if !app.running() {
            break;
        }

        tokio::select! {
            maybe_event = reader.next() => {
                match maybe_event {
                    Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                        if let Some(action) = input::map_key(key) {
                            debug!("action={action:?}");
                            let command = app.apply_action(action);
                            terminal
                                .draw(|frame| ui::render(frame, app, theme))
                                .context("failed to render terminal frame")?;
                            execute_app_command(
                                terminal,
                                app,
                                gateway,
                                &event_tx,
                                keyboard_enhanced,
                                command,
                            )
                            .await?;
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(error)) => {
                        app.set_status(format!("terminal event error: {error}"));
                    }
                    None => {
                        app.set_status("terminal event stream closed");
                        break;
                    }
                }
            }
            _ = ticker.tick() => {
                app.tick();
            }
            maybe_event = event_rx.recv() => {
                if let Some(event) = maybe_event {
                    let command = app.handle_event(event);
                    execute_app_command(
                        terminal,
                        app,
                        gateway,
                        &event_tx,
                        keyboard_enhanced,
                        command,
                    )
                    .await?;
                }
            }
        }
    }

    Ok(())
}

/// Runs the effect requested by the controller. Captured work is spawned and
/// reports back through `event_tx`; an interactive attach holds the loop
/// until the child exits.
async fn execute_app_command(
    terminal: &mut TuiTerminal,
    app: &mut App,
    gateway: &Arc<DockerGateway>,
    event_tx: &mpsc::UnboundedSender<AppEvent>,
    keyboard_enhanced: bool,
    mut command: AppCommand,
) -> Result<()> {
    loop {
        match command {
            AppCommand::None => return Ok(()),
            AppCommand::Refresh { generation } => {
                let gateway = Arc::clone(gateway);
                let event_tx = event_tx.clone();
                tokio::spawn(async move {
                    let result = gateway.list().await;
                    let _ = event_tx.send(AppEvent::RefreshCompleted { generation, result });
                });
                return Ok(());
            }
            AppCommand::Dispatch(request) => {
                let gateway = Arc::clone(gateway);
                let event_tx = event_tx.clone();
                tokio::spawn(async move {
                    let result = gateway.invoke(&request).await;
                    let _ = event_tx.send(AppEvent::ActionCompleted { request, result });
                });
                return Ok(());
            }
            AppCommand::Attach(request) => {
                let result = run_attached(terminal, gateway, &request, keyboard_enhanced).await?;
                command = app.handle_event(AppEvent::ActionCompleted { request, result });
            }
        }
    }
}

/// Hands the terminal to an interactive child. Failing to take the terminal
/// back is fatal; anything the child itself does is reported as an outcome.
async fn run_attached(
    terminal: &mut TuiTerminal,
    gateway: &DockerGateway,
    request: &ActionRequest,
    keyboard_enhanced: bool,
) -> Result<Result<String, DispatchError>> {
    let invocation = match gateway.invocation(request) {
        Ok(invocation) => invocation,
        Err(error) => return Ok(Err(error)),
    };
    info!("attaching: {}", invocation.display());

    suspend_terminal_for_subprocess(terminal, keyboard_enhanced)?;
    let run_result = invocation.command().status().await;
    resume_terminal_after_subprocess(terminal, keyboard_enhanced)?;

    let outcome = match run_result {
        Ok(status) if status.success() => Ok(String::new()),
        Ok(status) => Err(docker::non_zero_exit(&invocation, status, String::new())),
        Err(error) => Err(DispatchError::Launch {
            program: invocation.program.clone(),
            reason: error.to_string(),
        }),
    };
    Ok(outcome)
}

fn suspend_terminal_for_subprocess(
    terminal: &mut TuiTerminal,
    keyboard_enhanced: bool,
) -> Result<()> {
    release_keyboard(terminal.backend_mut(), keyboard_enhanced)
        .context("failed to pop keyboard enhancement flags for subprocess")?;
    disable_raw_mode().context("failed to disable raw mode for subprocess")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("failed to leave alternate screen for subprocess")?;
    terminal
        .show_cursor()
        .context("failed to show cursor for subprocess")?;
    Ok(())
}

fn resume_terminal_after_subprocess(
    terminal: &mut TuiTerminal,
    keyboard_enhanced: bool,
) -> Result<()> {
    enable_raw_mode().context("failed to re-enable raw mode after subprocess")?;
    execute!(terminal.backend_mut(), EnterAlternateScreen)
        .context("failed to re-enter alternate screen after subprocess")?;
    reclaim_keyboard(terminal.backend_mut(), keyboard_enhanced)
        .context("failed to push keyboard enhancement flags after subprocess")?;
    terminal
        .clear()
        .context("failed to clear terminal after subprocess")?;
    Ok(())
}

/// The attached child must see plain key encodings, not the enhanced ones.
fn release_keyboard(writer: &mut impl Write, keyboard_enhanced: bool) -> io::Result<()> {
    if keyboard_enhanced {
        execute!(writer, PopKeyboardEnhancementFlags)?;
    }
    Ok(())
}

fn reclaim_keyboard(writer: &mut impl Write, keyboard_enhanced: bool) -> io::Result<()> {
    if keyboard_enhanced {
        execute!(writer, PushKeyboardEnhancementFlags(KEYBOARD_FLAGS))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{reclaim_keyboard, release_keyboard};

    #[test]
    fn keyboard_flags_are_popped_and_pushed_around_handoff() {
        let mut released = Vec::new();
        release_keyboard(&mut released, true).expect("pop flags");
        assert_eq!(released, b"\x1b[<1u");

        let mut reclaimed = Vec::new();
        reclaim_keyboard(&mut reclaimed, true).expect("push flags");
        assert_eq!(reclaimed, b"\x1b[>1u");
    }

    #[test]
    fn plain_terminals_get_no_keyboard_sequences() {
        let mut out = Vec::new();
        release_keyboard(&mut out, false).expect("noop");
        reclaim_keyboard(&mut out, false).expect("noop");
        assert!(out.is_empty());
    }
}
