use std::io::{self, Stdout};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use parking_lot::Mutex;
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tokio::runtime::Handle;

use crate::config::{AppConfig, OfflineConfig};
use crate::core::commands as core_commands;
use crate::host::{install_prompt, Host, TerminalWindows};
use crate::services::{spawn_reminders, InstallPrompt, TasksService};
use crate::storage::FileStore;

mod app;
mod buffer;
mod constants;
mod helpers;

use app::App;
use constants::TICK_RATE;

type Backend = CrosstermBackend<Stdout>;

/// Task list shared between the shell and the reminder task.
pub(crate) type SharedTasks = Arc<Mutex<TasksService<FileStore>>>;

/// Everything the shell drives: the task list, the host capabilities and the
/// runtime handle used to await them.
pub(crate) struct Session {
    pub(crate) handle: Handle,
    pub(crate) tasks: SharedTasks,
    pub(crate) host: Host,
    pub(crate) install: InstallPrompt,
}

impl Session {
    pub(crate) fn open(config: &AppConfig, handle: Handle) -> Result<Self> {
        Ok(Self {
            handle,
            tasks: Arc::new(Mutex::new(core_commands::open_tasks(config)?)),
            host: Host::open(config)?,
            install: install_prompt(config),
        })
    }
}

pub fn run(config: AppConfig, offline: Option<OfflineConfig>) -> Result<()> {
    let first_run = !config.store_path().exists();
    let store_path = config.store_path().display().to_string();

    let runtime = crate::runtime()?;
    let mut session = Session::open(&config, runtime.handle().clone())?;

    if let Some(offline) = offline {
        let worker = session
            .host
            .offline_worker(&config, &offline, TerminalWindows::attached())?;
        runtime.block_on(session.host.attach_offline(worker));
    }

    let reminders = {
        let _guard = runtime.enter();
        let tasks = session.tasks.clone();
        spawn_reminders(
            session.host.gateway.clone(),
            move || tasks.lock().pending_count(),
            config.reminder_interval(),
        )
    };
    tracing::info!(
        every_secs = config.reminder_interval().as_secs(),
        "reminders scheduled"
    );

    let mut stdout = io::stdout();
    enable_raw_mode().context("failed to enable raw mode")?;
    execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("failed to initialize terminal")?;
    terminal.hide_cursor().context("failed to hide cursor")?;

    let mut app = App::new(config, session);
    if first_run {
        app.set_status_info(format!("Initialized tasklight store at {}", store_path));
    }
    let result = run_app(&mut terminal, &mut app);

    reminders.abort();
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("failed to leave alternate screen")?;
    terminal.show_cursor().context("failed to show cursor")?;

    result
}

fn run_app(terminal: &mut Terminal<Backend>, app: &mut App) -> Result<()> {
    let mut last_tick = Instant::now();
    loop {
        terminal.draw(|f| app.draw(f))?;
        if app.should_quit() {
            break;
        }

        let timeout = TICK_RATE
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_secs(0));

        if event::poll(timeout)? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => app.on_key(key),
                Event::Resize(_, _) => {}
                _ => {}
            }
        }

        if last_tick.elapsed() >= TICK_RATE {
            app.on_tick();
            last_tick = Instant::now();
        }
    }

    Ok(())
}
