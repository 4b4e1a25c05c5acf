use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::model::TaskFilter;
use crate::tui::constants::{STATUS_ENTER_ADD, STATUS_HELP};

use super::{App, ConfirmChoice, InputMode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NormalAction {
    Quit,
    EnterAdd,
    Toggle,
    Delete,
    NextFilter,
    PrevFilter,
    Filter(TaskFilter),
    EnableNotifications,
    Install,
    SelectNext,
    SelectPrev,
    SelectFirst,
    SelectLast,
    ShowHelp,
}

impl NormalAction {
    fn from_event(key: &KeyEvent) -> Option<Self> {
        if matches!(key.code, KeyCode::Char('c')) && key.modifiers.contains(KeyModifiers::CONTROL) {
            return Some(Self::Quit);
        }

        match key.code {
            KeyCode::Char('q') => Some(Self::Quit),
            KeyCode::Char('a') => Some(Self::EnterAdd),
            KeyCode::Char(' ') => Some(Self::Toggle),
            KeyCode::Char('x') | KeyCode::Delete => Some(Self::Delete),
            KeyCode::Tab | KeyCode::Right | KeyCode::Char('l') => Some(Self::NextFilter),
            KeyCode::BackTab | KeyCode::Left => Some(Self::PrevFilter),
            KeyCode::Char('1') => Some(Self::Filter(TaskFilter::All)),
            KeyCode::Char('2') => Some(Self::Filter(TaskFilter::Active)),
            KeyCode::Char('3') => Some(Self::Filter(TaskFilter::Completed)),
            KeyCode::Char('n') => Some(Self::EnableNotifications),
            KeyCode::Char('I') => Some(Self::Install),
            KeyCode::Char('j') | KeyCode::Down => Some(Self::SelectNext),
            KeyCode::Char('k') | KeyCode::Up => Some(Self::SelectPrev),
            KeyCode::Home => Some(Self::SelectFirst),
            KeyCode::End => Some(Self::SelectLast),
            KeyCode::Char('h') | KeyCode::Char('?') => Some(Self::ShowHelp),
            _ => None,
        }
    }
}

impl App {
    pub(crate) fn on_key(&mut self, key: KeyEvent) {
        match self.input_mode {
            InputMode::Normal => self.handle_normal_mode(key),
            InputMode::Add => self.handle_add_mode(key),
            InputMode::ConfirmInstall => self.handle_confirm_install_mode(key),
            InputMode::Help => self.handle_help_mode(key),
        }
    }

    fn handle_normal_mode(&mut self, key: KeyEvent) {
        if let Some(action) = NormalAction::from_event(&key) {
            self.execute_normal_action(action);
        }
    }

    fn execute_normal_action(&mut self, action: NormalAction) {
        match action {
            NormalAction::Quit => self.should_quit = true,
            NormalAction::EnterAdd => {
                self.input.clear();
                self.input_mode = InputMode::Add;
                self.set_status_info(STATUS_ENTER_ADD);
            }
            NormalAction::Toggle => self.toggle_selected(),
            NormalAction::Delete => self.delete_selected(),
            NormalAction::NextFilter => self.set_filter(self.snapshot.filter.next()),
            NormalAction::PrevFilter => self.set_filter(self.snapshot.filter.prev()),
            NormalAction::Filter(filter) => self.set_filter(filter),
            NormalAction::EnableNotifications => self.enable_notifications(),
            NormalAction::Install => self.prompt_install(),
            NormalAction::SelectNext => self.select_next(),
            NormalAction::SelectPrev => self.select_prev(),
            NormalAction::SelectFirst => {
                if !self.snapshot.is_empty() {
                    self.selected = 0;
                    self.list_state.select(Some(self.selected));
                }
            }
            NormalAction::SelectLast => {
                if !self.snapshot.is_empty() {
                    self.selected = self.snapshot.tasks.len() - 1;
                    self.list_state.select(Some(self.selected));
                }
            }
            NormalAction::ShowHelp => {
                self.input_mode = InputMode::Help;
                self.set_status_info(STATUS_HELP);
            }
        }
    }

    fn handle_add_mode(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Enter => self.add_task(),
            KeyCode::Esc => {
                self.input.clear();
                self.input_mode = InputMode::Normal;
                self.status = None;
            }
            KeyCode::Backspace => self.input.backspace(),
            KeyCode::Delete => self.input.delete_char(),
            KeyCode::Left => self.input.move_left(),
            KeyCode::Right => self.input.move_right(),
            KeyCode::Home => self.input.move_home(),
            KeyCode::End => self.input.move_end(),
            KeyCode::Char(c) => self.input.insert_char(c),
            _ => {}
        }
    }

    fn handle_confirm_install_mode(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => self.resolve_install(false),
            KeyCode::Left | KeyCode::Right | KeyCode::Tab | KeyCode::Char(' ') => {
                self.confirm_choice = self.confirm_choice.toggle();
            }
            KeyCode::Char('y') => self.resolve_install(true),
            KeyCode::Char('n') => self.resolve_install(false),
            KeyCode::Enter => self.resolve_install(self.confirm_choice == ConfirmChoice::Yes),
            _ => {}
        }
    }

    fn handle_help_mode(&mut self, key: KeyEvent) {
        if matches!(
            key.code,
            KeyCode::Esc | KeyCode::Enter | KeyCode::Char('h') | KeyCode::Char('?')
        ) {
            self.input_mode = InputMode::Normal;
            self.status = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[rstest]
    #[case(KeyCode::Char('q'), NormalAction::Quit)]
    #[case(KeyCode::Char('a'), NormalAction::EnterAdd)]
    #[case(KeyCode::Char(' '), NormalAction::Toggle)]
    #[case(KeyCode::Delete, NormalAction::Delete)]
    #[case(KeyCode::Tab, NormalAction::NextFilter)]
    #[case(KeyCode::BackTab, NormalAction::PrevFilter)]
    #[case(KeyCode::Char('3'), NormalAction::Filter(TaskFilter::Completed))]
    #[case(KeyCode::Char('I'), NormalAction::Install)]
    #[case(KeyCode::Char('?'), NormalAction::ShowHelp)]
    fn keys_map_to_actions(#[case] code: KeyCode, #[case] expected: NormalAction) {
        assert_eq!(NormalAction::from_event(&key(code)), Some(expected));
    }

    #[test]
    fn ctrl_c_quits_and_unknown_keys_are_ignored() {
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(NormalAction::from_event(&ctrl_c), Some(NormalAction::Quit));
        assert_eq!(NormalAction::from_event(&key(KeyCode::Char('z'))), None);
    }
}
