use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use pretty_assertions::assert_eq;
use tempfile::TempDir;
use tokio::runtime::Runtime;

use super::{App, InputMode};
use crate::config::AppConfig;
use crate::model::TaskFilter;
use crate::services::InstallState;
use crate::tui::Session;

struct Fixture {
    app: App,
    config: AppConfig,
    // Kept alive for the app's runtime handle and data directory.
    _runtime: Runtime,
    _dir: TempDir,
}

fn fixture() -> Fixture {
    let dir = TempDir::new().expect("temp dir");
    let config = AppConfig::from_data_dir(dir.path().to_path_buf()).expect("config");
    let runtime = crate::runtime().expect("runtime");
    let session = Session::open(&config, runtime.handle().clone()).expect("session");
    Fixture {
        app: App::new(config.clone(), session),
        config,
        _runtime: runtime,
        _dir: dir,
    }
}

fn press(app: &mut App, code: KeyCode) {
    app.on_key(KeyEvent::new(code, KeyModifiers::NONE));
}

fn type_task(app: &mut App, text: &str) {
    press(app, KeyCode::Char('a'));
    for ch in text.chars() {
        press(app, KeyCode::Char(ch));
    }
    press(app, KeyCode::Enter);
}

fn visible_texts(app: &App) -> Vec<String> {
    app.snapshot
        .tasks
        .iter()
        .map(|task| task.text.clone())
        .collect()
}

#[test]
fn starts_empty_with_install_offer() {
    let fx = fixture();
    let app = &fx.app;

    assert!(app.snapshot.is_empty());
    assert_eq!(app.snapshot.empty_message(), "No tasks yet. Add one!");
    assert_eq!(app.install.state(), InstallState::Offered);
    let status = app.status.as_ref().expect("install offer status");
    assert!(status.text.contains("press I"));
}

#[test]
fn add_toggle_and_filter_scenario() {
    let mut fx = fixture();
    let app = &mut fx.app;

    type_task(app, "Buy milk");
    type_task(app, "Walk dog");
    assert_eq!(visible_texts(app), vec!["Walk dog", "Buy milk"]);
    assert_eq!(app.input_mode, InputMode::Normal);

    press(app, KeyCode::Home);
    press(app, KeyCode::Char(' '));
    assert_eq!(app.snapshot.pending, 1);

    press(app, KeyCode::Char('2'));
    assert_eq!(app.snapshot.filter, TaskFilter::Active);
    assert_eq!(visible_texts(app), vec!["Buy milk"]);

    press(app, KeyCode::Tab);
    assert_eq!(app.snapshot.filter, TaskFilter::Completed);
    assert_eq!(visible_texts(app), vec!["Walk dog"]);
    assert_eq!(app.counts, [2, 1, 1]);
}

#[test]
fn blank_input_keeps_the_overlay_open() {
    let mut fx = fixture();
    let app = &mut fx.app;

    type_task(app, "   ");

    assert_eq!(app.input_mode, InputMode::Add);
    assert!(app.snapshot.is_empty());
    press(app, KeyCode::Esc);
    assert_eq!(app.input_mode, InputMode::Normal);
}

#[test]
fn delete_removes_the_selected_task() {
    let mut fx = fixture();
    let config = fx.config.clone();
    let app = &mut fx.app;

    type_task(app, "Buy milk");
    type_task(app, "Walk dog");
    press(app, KeyCode::Char('x'));

    assert_eq!(visible_texts(app), vec!["Buy milk"]);
    let stored = std::fs::read_to_string(config.store_path()).expect("store file");
    assert!(!stored.contains("Walk dog"));

    press(app, KeyCode::Delete);
    press(app, KeyCode::Delete);
    assert!(app.snapshot.is_empty());
}

#[test]
fn unwritable_store_reports_error_and_keeps_running() {
    let mut fx = fixture();
    let config = fx.config.clone();
    let app = &mut fx.app;
    type_task(app, "Buy milk");
    std::fs::create_dir(config.store_path().with_extension("json.tmp")).expect("block temp file");

    type_task(app, "Walk dog");
    assert_eq!(app.input_mode, InputMode::Add);
    assert_eq!(visible_texts(app), vec!["Buy milk"]);
    let status = app.status.as_ref().expect("error status");
    assert!(status.text.contains("Add failed"));

    press(app, KeyCode::Esc);
    press(app, KeyCode::Char(' '));
    assert_eq!(app.snapshot.pending, 1);
    press(app, KeyCode::Char('x'));
    assert_eq!(visible_texts(app), vec!["Buy milk"]);
    assert!(!app.should_quit());

    let stored = std::fs::read_to_string(config.store_path()).expect("store file");
    assert!(stored.contains("Buy milk"));
    assert!(!stored.contains("Walk dog"));
}

#[test]
fn notifications_follow_permission() {
    let mut fx = fixture();
    let app = &mut fx.app;

    type_task(app, "Before permission");
    assert!(app.last_notification.is_none());

    press(app, KeyCode::Char('n'));
    assert_eq!(app.notify_control.label, "Notifications enabled");
    assert!(!app.notify_control.enabled);

    type_task(app, "Walk dog");
    let shown = app.last_notification.as_ref().expect("task added notification");
    assert!(shown.body.contains("Walk dog"));
}

#[test]
fn install_confirm_writes_marker() {
    let mut fx = fixture();
    let config = fx.config.clone();
    let app = &mut fx.app;

    press(app, KeyCode::Char('I'));
    assert_eq!(app.input_mode, InputMode::ConfirmInstall);
    press(app, KeyCode::Enter);

    assert_eq!(app.input_mode, InputMode::Normal);
    assert_eq!(app.install.state(), InstallState::Installed);
    assert!(config.install_marker_path().exists());

    press(app, KeyCode::Char('I'));
    assert_eq!(app.input_mode, InputMode::Normal);
}

#[test]
fn install_dismiss_hides_the_offer() {
    let mut fx = fixture();
    let config = fx.config.clone();
    let app = &mut fx.app;

    press(app, KeyCode::Char('I'));
    press(app, KeyCode::Esc);

    assert_eq!(app.install.state(), InstallState::Dismissed);
    assert!(!config.install_marker_path().exists());
    press(app, KeyCode::Char('I'));
    assert_eq!(app.input_mode, InputMode::Normal);
}

#[test]
fn help_overlay_opens_and_closes() {
    let mut fx = fixture();
    let app = &mut fx.app;

    press(app, KeyCode::Char('?'));
    assert_eq!(app.input_mode, InputMode::Help);
    press(app, KeyCode::Esc);
    assert_eq!(app.input_mode, InputMode::Normal);

    press(app, KeyCode::Char('q'));
    assert!(app.should_quit());
}

#[test]
fn selection_is_clamped() {
    let mut fx = fixture();
    let app = &mut fx.app;

    press(app, KeyCode::Char('j'));
    assert_eq!(app.list_state.selected(), None);

    type_task(app, "one");
    type_task(app, "two");
    press(app, KeyCode::Char('j'));
    press(app, KeyCode::Char('j'));
    assert_eq!(app.selected, 1);
    press(app, KeyCode::Char('k'));
    press(app, KeyCode::Char('k'));
    assert_eq!(app.selected, 0);
}
