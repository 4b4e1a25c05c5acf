use std::time::Instant;

use ratatui::style::{Color, Style};
use ratatui::widgets::ListState;
use tokio::runtime::Handle;

use super::buffer::TextBuffer;
use super::constants::*;
use super::{Session, SharedTasks};
use crate::config::AppConfig;
use crate::host::{Host, NotificationLog};
use crate::model::{TaskFilter, TaskId};
use crate::services::{
    Delivery, InstallChoice, InstallPrompt, InstallState, Notification, NotificationGateway,
    NotifyControl, ViewSnapshot,
};
use crate::storage::StoreError;

mod input;
mod render;
#[cfg(test)]
mod tests;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InputMode {
    Normal,
    Add,
    ConfirmInstall,
    Help,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConfirmChoice {
    Yes,
    No,
}

impl ConfirmChoice {
    fn toggle(self) -> Self {
        match self {
            ConfirmChoice::Yes => ConfirmChoice::No,
            ConfirmChoice::No => ConfirmChoice::Yes,
        }
    }
}

#[derive(Debug, Clone)]
struct StatusMessage {
    text: String,
    kind: StatusKind,
    created_at: Instant,
}

impl StatusMessage {
    fn new<T: Into<String>>(text: T, kind: StatusKind) -> Self {
        Self {
            text: text.into(),
            kind,
            created_at: Instant::now(),
        }
    }

    fn style(&self) -> Style {
        match self.kind {
            StatusKind::Info => Style::default().fg(Color::Cyan),
            StatusKind::Error => Style::default().fg(Color::Red),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum StatusKind {
    Info,
    Error,
}

pub(crate) struct App {
    config: AppConfig,
    handle: Handle,
    tasks: SharedTasks,
    gateway: NotificationGateway,
    display: std::sync::Arc<NotificationLog>,
    install: InstallPrompt,
    snapshot: ViewSnapshot,
    counts: [usize; 3],
    notify_control: NotifyControl,
    last_notification: Option<Notification>,
    seen_notifications: usize,
    selected: usize,
    list_state: ListState,
    input_mode: InputMode,
    input: TextBuffer,
    status: Option<StatusMessage>,
    confirm_choice: ConfirmChoice,
    should_quit: bool,
}

impl App {
    pub(crate) fn new(config: AppConfig, session: Session) -> Self {
        let Session {
            handle,
            tasks,
            host: Host {
                display, gateway, ..
            },
            install,
        } = session;

        let snapshot = tasks.lock().snapshot();
        let notify_control = gateway.check_permission();
        let seen_notifications = display.len();
        let mut app = Self {
            config,
            handle,
            tasks,
            gateway,
            display,
            install,
            snapshot,
            counts: [0; 3],
            notify_control,
            last_notification: None,
            seen_notifications,
            selected: 0,
            list_state: ListState::default(),
            input_mode: InputMode::Normal,
            input: TextBuffer::new(),
            status: None,
            confirm_choice: ConfirmChoice::Yes,
            should_quit: false,
        };
        app.refresh();
        if app.install.has_offer() {
            app.set_status_info(STATUS_INSTALL_OFFER);
        }
        app
    }

    pub(crate) fn refresh(&mut self) {
        let tasks = self.tasks.lock();
        self.snapshot = tasks.snapshot();
        for (slot, filter) in self.counts.iter_mut().zip(TaskFilter::ALL) {
            *slot = tasks.visible_for(filter).len();
        }
        drop(tasks);

        if self.snapshot.is_empty() {
            self.selected = 0;
            self.list_state.select(None);
        } else {
            if self.selected >= self.snapshot.tasks.len() {
                self.selected = self.snapshot.tasks.len() - 1;
            }
            self.list_state.select(Some(self.selected));
        }
    }

    pub(crate) fn on_tick(&mut self) {
        self.collect_notifications();
        if let Some(status) = &self.status {
            if status.created_at.elapsed() > STATUS_TTL {
                self.status = None;
            }
        }
    }

    pub(crate) fn should_quit(&self) -> bool {
        self.should_quit
    }

    /// Picks up notifications shown since the last check, including reminders
    /// delivered from the background task.
    fn collect_notifications(&mut self) {
        if self.display.len() == self.seen_notifications {
            return;
        }
        let fresh = self.display.since(self.seen_notifications);
        self.seen_notifications += fresh.len();
        if let Some(latest) = fresh.into_iter().last() {
            self.last_notification = Some(latest);
        }
    }

    fn selected_id(&self) -> Option<TaskId> {
        self.snapshot.tasks.get(self.selected).map(|task| task.id)
    }

    fn select_next(&mut self) {
        if self.snapshot.is_empty() {
            return;
        }
        self.selected = (self.selected + 1).min(self.snapshot.tasks.len() - 1);
        self.list_state.select(Some(self.selected));
    }

    fn select_prev(&mut self) {
        if self.snapshot.is_empty() {
            return;
        }
        self.selected = self.selected.saturating_sub(1);
        self.list_state.select(Some(self.selected));
    }

    fn select_task_by_id(&mut self, id: TaskId) {
        if let Some(idx) = self.snapshot.tasks.iter().position(|task| task.id == id) {
            self.selected = idx;
            self.list_state.select(Some(idx));
        }
    }

    fn set_filter(&mut self, filter: TaskFilter) {
        if filter == self.snapshot.filter {
            return;
        }
        self.tasks.lock().set_filter(filter);
        self.selected = 0;
        self.refresh();
    }

    fn add_task(&mut self) {
        if self.input.is_blank() {
            self.set_status_error(STATUS_EMPTY_ADD);
            return;
        }

        let result = self.tasks.lock().add(self.input.as_str());
        let outcome = match result {
            Ok(Some(outcome)) => outcome,
            Ok(None) => return,
            Err(err) => {
                self.store_failed("Add", &err);
                return;
            }
        };
        self.input.clear();
        self.input_mode = InputMode::Normal;

        self.refresh();
        self.select_task_by_id(outcome.id);
        self.set_status_info(format!("Added: {}", outcome.text));

        let delivery = self
            .handle
            .block_on(self.gateway.deliver(&Notification::task_added(&outcome.text)));
        if delivery != Delivery::Skipped {
            self.collect_notifications();
        }
    }

    fn toggle_selected(&mut self) {
        let Some(id) = self.selected_id() else {
            self.set_status_info(STATUS_NOTHING_SELECTED);
            return;
        };
        let result = self.tasks.lock().toggle(id);
        match result {
            Ok(update) => {
                self.refresh();
                self.select_task_by_id(id);
                if update.changed {
                    self.set_status_info(if update.completed {
                        "Marked task as completed"
                    } else {
                        "Marked task as active"
                    });
                }
            }
            Err(err) => self.store_failed("Update", &err),
        }
    }

    fn delete_selected(&mut self) {
        let Some(id) = self.selected_id() else {
            self.set_status_info(STATUS_NOTHING_SELECTED);
            return;
        };
        let result = self.tasks.lock().delete(id);
        match result {
            Ok(result) => {
                self.refresh();
                if result.deleted {
                    self.set_status_info("Deleted task");
                }
            }
            Err(err) => self.store_failed("Delete", &err),
        }
    }

    /// The service has already undone the change; keep the shell running and say why.
    fn store_failed(&mut self, action: &str, err: &StoreError) {
        tracing::warn!(error = %err, "{} not saved", action.to_lowercase());
        self.refresh();
        self.set_status_error(format!("{} failed: {}", action, err));
    }

    fn enable_notifications(&mut self) {
        if !self.notify_control.enabled {
            self.set_status_info(self.notify_control.label);
            return;
        }
        self.notify_control = self.handle.block_on(self.gateway.request_permission());
        self.set_status_info(self.notify_control.label);
    }

    fn prompt_install(&mut self) {
        match self.install.state() {
            InstallState::Installed => self.set_status_info(STATUS_ALREADY_INSTALLED),
            _ if self.install.has_offer() => {
                self.confirm_choice = ConfirmChoice::Yes;
                self.input_mode = InputMode::ConfirmInstall;
                self.set_status_info(STATUS_CONFIRM_INSTALL);
            }
            _ => self.set_status_info(STATUS_INSTALL_UNAVAILABLE),
        }
    }

    fn resolve_install(&mut self, accept: bool) {
        self.input_mode = InputMode::Normal;
        if !accept {
            self.install.dismiss();
            self.set_status_info("Install dismissed");
            return;
        }
        match self.handle.block_on(self.install.trigger()) {
            Some(InstallChoice::Accepted) => self.set_status_info(format!(
                "Installed tasklight (marker at {})",
                self.config.install_marker_path().display()
            )),
            Some(InstallChoice::Dismissed) => self.set_status_error("Install did not complete"),
            None => self.set_status_info(STATUS_INSTALL_UNAVAILABLE),
        }
    }

    pub(crate) fn set_status_info<T: Into<String>>(&mut self, message: T) {
        let mut text = String::from("ℹ️  ");
        text.push_str(&message.into());
        self.status = Some(StatusMessage::new(text, StatusKind::Info));
    }

    pub(crate) fn set_status_error<T: Into<String>>(&mut self, message: T) {
        let mut text = String::from("⚠️  ");
        text.push_str(&message.into());
        self.status = Some(StatusMessage::new(text, StatusKind::Error));
    }
}
