use std::time::Duration;

pub(crate) const APP_VERSION: &str = env!("CARGO_PKG_VERSION");
pub(crate) const TICK_RATE: Duration = Duration::from_millis(200);
pub(crate) const STATUS_TTL: Duration = Duration::from_secs(5);

pub(crate) const STATUS_ENTER_ADD: &str = "What needs to be done? (Enter to add, Esc to cancel)";
pub(crate) const STATUS_EMPTY_ADD: &str = "Enter some text before adding a task";
pub(crate) const STATUS_NOTHING_SELECTED: &str = "No task selected";
pub(crate) const STATUS_CONFIRM_INSTALL: &str =
    "Install tasklight? arrows choose, Enter confirms, Esc dismisses";
pub(crate) const STATUS_INSTALL_OFFER: &str = "tasklight can be installed: press I";
pub(crate) const STATUS_INSTALL_UNAVAILABLE: &str = "Install is not available right now";
pub(crate) const STATUS_ALREADY_INSTALLED: &str = "tasklight is already installed";
pub(crate) const STATUS_HELP: &str = "Keyboard reference (Enter/Esc to close)";
