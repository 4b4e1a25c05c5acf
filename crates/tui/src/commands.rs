use std::fmt;
use std::io::Write;

use anyhow::{anyhow, bail, Context, Result};
use tasklight_core::services::{Delivery, InstallChoice, InstallState, Notification, Permission};
use tasklight_offline::{FetchSource, OfflineWorker, Request};

use crate::cli::{AddArgs, CacheAction, CacheArgs, CliCommand, DeleteArgs, ListArgs, NotifyAction};
use crate::config::{self, AppConfig};
use crate::core::commands as core_commands;
use crate::host::{install_prompt, Host, TerminalWindows};
use crate::model::{DeleteResult, Task, TaskId};
use crate::runtime;

pub fn execute<W: Write>(config: &AppConfig, command: CliCommand, mut writer: W) -> Result<()> {
    match command {
        CliCommand::Add(args) => handle_add(config, &args, &mut writer),
        CliCommand::List(args) => handle_list(config, &args, &mut writer),
        CliCommand::Toggle(args) => handle_toggle(config, args.id, &mut writer),
        CliCommand::Delete(args) => handle_delete(config, &args, &mut writer),
        CliCommand::Notify(args) => handle_notify(config, args.action, &mut writer),
        CliCommand::Install => handle_install(config, &mut writer),
        CliCommand::Cache(args) => handle_cache(config, &args, &mut writer),
        CliCommand::Tui(_) => Err(anyhow!("launch interactive surfaces directly")),
    }
}

fn handle_add<W: Write>(config: &AppConfig, args: &AddArgs, mut writer: W) -> Result<()> {
    let mut service = core_commands::open_tasks(config)?;
    let Some(outcome) = service.add(&args.joined())? else {
        writeln!(writer, "Nothing added: task text is empty")?;
        return Ok(());
    };
    writeln!(writer, "Added [{}] {}", outcome.id, outcome.text)?;

    match announce_added(config, &outcome.text) {
        Ok(Some(shown)) => writeln!(writer, "{}", NotificationLine(&shown))?,
        Ok(None) => {}
        Err(err) => tracing::warn!(error = %err, "task added without notification"),
    }
    Ok(())
}

/// The task is already saved here, so a missing notification host only disables the
/// notification.
fn announce_added(config: &AppConfig, text: &str) -> Result<Option<Notification>> {
    let host = Host::open(config)?;
    let delivery = runtime()?.block_on(host.gateway.deliver(&Notification::task_added(text)));
    if delivery == Delivery::Skipped {
        return Ok(None);
    }
    Ok(host.display.latest())
}

fn handle_list<W: Write>(config: &AppConfig, args: &ListArgs, mut writer: W) -> Result<()> {
    let mut service = core_commands::open_tasks(config)?;
    let snapshot = service.set_filter(args.filter);

    if args.json {
        serde_json::to_writer_pretty(&mut writer, &snapshot.tasks)?;
        writeln!(writer)?;
        return Ok(());
    }

    if snapshot.is_empty() {
        writeln!(writer, "{}", snapshot.empty_message())?;
        return Ok(());
    }
    for task in &snapshot.tasks {
        writeln!(writer, "{}", TaskLine(task))?;
    }
    writeln!(
        writer,
        "{} of {} task{} unfinished",
        snapshot.pending,
        snapshot.total,
        if snapshot.total == 1 { "" } else { "s" }
    )?;
    Ok(())
}

fn handle_toggle<W: Write>(config: &AppConfig, id: TaskId, mut writer: W) -> Result<()> {
    let mut service = core_commands::open_tasks(config)?;
    let update = service.toggle(id)?;
    match (update.changed, update.completed) {
        (false, _) => writeln!(writer, "Not found: {}", id)?,
        (true, true) => writeln!(writer, "Completed {}", id)?,
        (true, false) => writeln!(writer, "Reopened {}", id)?,
    }
    Ok(())
}

fn handle_delete<W: Write>(config: &AppConfig, args: &DeleteArgs, mut writer: W) -> Result<()> {
    let results = core_commands::delete_tasks(config, &args.ids)?;
    let summary = DeleteSummary::from_results(&results);
    summary.write_to(&mut writer)?;
    Ok(())
}

fn handle_notify<W: Write>(config: &AppConfig, action: NotifyAction, mut writer: W) -> Result<()> {
    let host = Host::open(config)?;
    match action {
        NotifyAction::Status => {
            let control = host.gateway.check_permission();
            writeln!(writer, "{} ({})", control.label, host.platform.stored_permission())?;
        }
        NotifyAction::Enable => {
            let control = runtime()?.block_on(host.gateway.request_permission());
            writeln!(writer, "{}", control.label)?;
        }
        NotifyAction::Disable => {
            host.platform.set_permission(Permission::Denied)?;
            writeln!(writer, "{}", host.gateway.check_permission().label)?;
        }
        NotifyAction::Test => {
            let pending = core_commands::open_tasks(config)?.pending_count();
            if pending == 0 {
                writeln!(writer, "No unfinished tasks to remind about")?;
                return Ok(());
            }
            let delivery = runtime()?.block_on(host.gateway.deliver(&Notification::reminder(pending)));
            match (delivery, host.display.latest()) {
                (Delivery::Skipped, _) | (_, None) => writeln!(
                    writer,
                    "Reminder not shown: {}",
                    host.gateway.check_permission().label
                )?,
                (_, Some(shown)) => writeln!(writer, "{}", NotificationLine(&shown))?,
            }
        }
    }
    Ok(())
}

fn handle_install<W: Write>(config: &AppConfig, mut writer: W) -> Result<()> {
    let mut prompt = install_prompt(config);
    if prompt.state() == InstallState::Installed {
        writeln!(writer, "Already installed")?;
        return Ok(());
    }
    match runtime()?.block_on(prompt.trigger()) {
        Some(InstallChoice::Accepted) => writeln!(
            writer,
            "Installed (marker: {})",
            config.install_marker_path().display()
        )?,
        Some(InstallChoice::Dismissed) | None => writeln!(writer, "Install dismissed")?,
    }
    Ok(())
}

fn handle_cache<W: Write>(config: &AppConfig, args: &CacheArgs, mut writer: W) -> Result<()> {
    let host = Host::open(config)?;
    let offline = config::cache_offline(args);
    let worker = host.offline_worker(config, &offline, TerminalWindows::detached())?;
    let runtime = runtime()?;

    runtime.block_on(async {
        match &args.action {
            CacheAction::Install => {
                let cached = worker.install().await?;
                let evicted = worker.activate().await?;
                writeln!(writer, "Cached {} assets into {}", cached, worker.cache_name())?;
                write_evicted(&mut writer, &evicted)?;
            }
            CacheAction::Activate => {
                require_generation(&worker).await?;
                let evicted = worker.activate().await?;
                writeln!(writer, "Activated {}", worker.cache_name())?;
                write_evicted(&mut writer, &evicted)?;
            }
            CacheAction::Fetch { path } => {
                if !worker.resume().await? {
                    tracing::debug!(cache = worker.cache_name(), "no generation installed, passing through");
                }
                let url = offline
                    .resolve(path)
                    .with_context(|| format!("invalid path '{}'", path))?;
                let served = worker.handle_fetch(&Request::get(url)).await?;
                let source = match served.source {
                    FetchSource::Cache => "cache",
                    FetchSource::Network if served.stored => "network, stored",
                    FetchSource::Network => "network",
                };
                writeln!(
                    writer,
                    "{} {} {} ({} bytes, {})",
                    served.response.status,
                    served.response.kind.as_str(),
                    served.response.url,
                    served.response.body.len(),
                    source
                )?;
            }
            CacheAction::List => {
                let generations = worker.generations().await?;
                if generations.is_empty() {
                    writeln!(writer, "No cache generations")?;
                    return Ok(());
                }
                for name in &generations {
                    let marker = if name == worker.cache_name() { "*" } else { " " };
                    writeln!(writer, "{} {}", marker, name)?;
                }
                for key in worker.cached_entries().await? {
                    writeln!(writer, "    {}", key)?;
                }
            }
            CacheAction::Push { payload } => {
                let shown = worker.handle_push(payload.as_bytes()).await?;
                writeln!(writer, "{}", NotificationLine(&shown))?;
            }
        }
        Ok::<(), anyhow::Error>(())
    })
}

async fn require_generation(worker: &OfflineWorker) -> Result<()> {
    if !worker.resume().await? {
        bail!(
            "cache generation {} is not installed; run `tasklight cache install` first",
            worker.cache_name()
        );
    }
    Ok(())
}

fn write_evicted<W: Write>(mut writer: W, evicted: &[String]) -> Result<()> {
    if !evicted.is_empty() {
        writeln!(writer, "Evicted: {}", evicted.join(", "))?;
    }
    Ok(())
}

struct TaskLine<'a>(&'a Task);

impl fmt::Display for TaskLine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mark = if self.0.completed { "x" } else { " " };
        write!(f, "[{}] {:>13}  {}", mark, self.0.id, self.0.text)
    }
}

struct NotificationLine<'a>(&'a Notification);

impl fmt::Display for NotificationLine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Notification: {} - {}", self.0.title, self.0.body)
    }
}

struct DeleteSummary {
    deleted: usize,
    missing: Vec<TaskId>,
}

impl DeleteSummary {
    fn from_results(results: &[DeleteResult]) -> Self {
        let mut deleted = 0usize;
        let mut missing = Vec::new();
        for result in results {
            if result.deleted {
                deleted += 1;
            } else {
                missing.push(result.id);
            }
        }
        Self { deleted, missing }
    }

    fn write_to<W: Write>(&self, mut writer: W) -> Result<()> {
        writeln!(writer, "{}", SummaryLine::deleted(self.deleted))?;
        if !self.missing.is_empty() {
            let missing: Vec<String> = self.missing.iter().map(TaskId::to_string).collect();
            writeln!(writer, "Not found: {}", missing.join(", "))?;
        }
        Ok(())
    }
}

enum SummaryLine {
    Deleted(usize),
    NoneDeleted,
}

impl SummaryLine {
    fn deleted(count: usize) -> Self {
        if count > 0 {
            SummaryLine::Deleted(count)
        } else {
            SummaryLine::NoneDeleted
        }
    }
}

impl fmt::Display for SummaryLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SummaryLine::Deleted(count) => {
                write!(
                    f,
                    "Deleted {} task{}",
                    count,
                    if *count == 1 { "" } else { "s" }
                )
            }
            SummaryLine::NoneDeleted => write!(f, "No tasks deleted"),
        }
    }
}
