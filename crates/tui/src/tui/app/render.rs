use std::cmp::min;

use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Tabs, Wrap};
use ratatui::Frame;

use crate::model::TaskFilter;
use crate::tui::constants::APP_VERSION;
use crate::tui::helpers::{
    accent_title, build_help_lines, centered_rect, inset_rect, task_line, BG_ACCENT, BG_BASE,
    BG_PANEL, FG_ACCENT,
};

use super::{App, ConfirmChoice, InputMode};

impl App {
    pub(crate) fn draw(&mut self, f: &mut Frame<'_>) {
        let size = f.size();
        f.render_widget(Clear, size);
        f.render_widget(Block::default().style(Style::default().bg(BG_BASE)), size);
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Length(3),
                Constraint::Min(5),
                Constraint::Length(2),
            ])
            .split(size);

        self.draw_header(f, chunks[0]);
        self.draw_tabs(f, chunks[1]);
        self.draw_tasks(f, chunks[2]);
        self.draw_footer(f, chunks[3]);

        match self.input_mode {
            InputMode::Add => self.draw_input_overlay(f, size),
            InputMode::ConfirmInstall => self.draw_confirm_overlay(f, size),
            InputMode::Help => self.draw_help_overlay(f, size),
            InputMode::Normal => {}
        }
    }

    fn draw_header(&self, f: &mut Frame<'_>, area: Rect) {
        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(65), Constraint::Percentage(35)])
            .split(area);

        let left_line = Line::from(vec![
            Span::styled(
                format!(" tasklight v{} ", APP_VERSION),
                Style::default()
                    .fg(Color::Green)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw(format!(
                "{} of {} unfinished",
                self.snapshot.pending, self.snapshot.total
            )),
            Span::raw("  "),
            Span::styled(
                format!("💾 {}", self.config.store_path().display()),
                Style::default().fg(Color::DarkGray),
            ),
        ]);
        f.render_widget(
            Paragraph::new(left_line).style(Style::default().bg(BG_BASE)),
            cols[0],
        );

        let control_style = if self.notify_control.enabled {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        let mut right_spans = vec![Span::styled(
            format!("🔔 {}", self.notify_control.label),
            control_style,
        )];
        if self.install.is_trigger_visible() {
            right_spans.push(Span::raw("  "));
            right_spans.push(Span::styled(
                "[I] Install",
                Style::default().fg(FG_ACCENT).add_modifier(Modifier::BOLD),
            ));
        }
        right_spans.push(Span::raw(" "));
        f.render_widget(
            Paragraph::new(Line::from(right_spans))
                .alignment(Alignment::Right)
                .style(Style::default().bg(BG_BASE)),
            cols[1],
        );
    }

    fn draw_tabs(&self, f: &mut Frame<'_>, area: Rect) {
        let titles: Vec<Line> = TaskFilter::ALL
            .iter()
            .zip(self.counts)
            .map(|(filter, count)| Line::from(format!("{} ({})", filter.label(), count)))
            .collect();
        let selected = TaskFilter::ALL
            .iter()
            .position(|filter| *filter == self.snapshot.filter)
            .unwrap_or(0);
        let tabs = Tabs::new(titles)
            .select(selected)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(accent_title("Show"))
                    .border_style(Style::default().fg(Color::DarkGray))
                    .style(Style::default().bg(BG_PANEL)),
            )
            .highlight_style(
                Style::default()
                    .fg(Color::Green)
                    .bg(BG_ACCENT)
                    .add_modifier(Modifier::BOLD),
            );
        f.render_widget(tabs, area);
    }

    fn draw_tasks(&mut self, f: &mut Frame<'_>, area: Rect) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title(accent_title("Tasks"))
            .border_style(Style::default().fg(Color::DarkGray))
            .style(Style::default().bg(BG_PANEL));

        if self.snapshot.is_empty() {
            let inner = block.inner(area);
            f.render_widget(block, area);
            if inner.width == 0 || inner.height == 0 {
                return;
            }
            let content_area = centered_rect(inner.width.min(60), 1, inner);
            f.render_widget(
                Paragraph::new(self.snapshot.empty_message())
                    .alignment(Alignment::Center)
                    .style(Style::default().fg(Color::DarkGray).bg(BG_PANEL)),
                content_area,
            );
            return;
        }

        let items: Vec<ListItem> = self
            .snapshot
            .tasks
            .iter()
            .map(|task| ListItem::new(task_line(task)))
            .collect();
        let list = List::new(items)
            .block(block)
            .highlight_style(Style::default().bg(BG_ACCENT).add_modifier(Modifier::BOLD))
            .highlight_symbol("› ");
        f.render_stateful_widget(list, area, &mut self.list_state);
    }

    fn draw_footer(&self, f: &mut Frame<'_>, area: Rect) {
        let lines = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(1), Constraint::Length(1)])
            .split(area);

        let status_line = if let Some(status) = &self.status {
            Line::from(vec![Span::styled(status.text.clone(), status.style())])
        } else if let Some(notification) = &self.last_notification {
            Line::from(vec![
                Span::styled("🔔 ", Style::default().fg(Color::Yellow)),
                Span::styled(
                    notification.title.clone(),
                    Style::default().add_modifier(Modifier::BOLD),
                ),
                Span::raw(" - "),
                Span::raw(notification.body.clone()),
            ])
        } else {
            Line::from(vec![Span::raw("Ready")])
        };
        f.render_widget(Paragraph::new(status_line), lines[0]);

        let help = match self.input_mode {
            InputMode::Normal => {
                "a add ✚ | space toggle ✅ | x delete 🗑️ | tab/1-3 filter | j/k move | n notify 🔔 | I install | h help ❔ | q quit"
            }
            InputMode::Add => "Enter to add ✍️ • Esc to cancel",
            InputMode::ConfirmInstall => "←/→ choose • Enter confirm • Esc dismiss",
            InputMode::Help => "Enter/Esc to close ❔",
        };
        let help_line = Line::from(vec![Span::styled(
            help,
            Style::default().fg(Color::DarkGray),
        )]);
        f.render_widget(Paragraph::new(help_line), lines[1]);
    }

    fn draw_input_overlay(&self, f: &mut Frame<'_>, area: Rect) {
        let width = min(area.width.saturating_sub(10), 80);
        let popup_area = centered_rect(width, 3, area);
        f.render_widget(Clear, popup_area);

        let input_block = Block::default()
            .borders(Borders::ALL)
            .title(accent_title("➕ What needs to be done?"))
            .border_style(Style::default().fg(Color::DarkGray))
            .style(Style::default().bg(BG_PANEL));
        let input_area = input_block.inner(popup_area);
        f.render_widget(input_block, popup_area);
        f.render_widget(
            Paragraph::new(self.input.as_str()).style(Style::default().bg(BG_PANEL)),
            input_area,
        );

        if input_area.width > 0 {
            let column = (self.input.cursor_column() as u16).min(input_area.width - 1);
            f.set_cursor(input_area.x + column, input_area.y);
        }
    }

    fn draw_confirm_overlay(&self, f: &mut Frame<'_>, area: Rect) {
        let width = min(area.width.saturating_sub(20), 60).max(40);
        let popup_area = centered_rect(width, 8, area);
        f.render_widget(Clear, popup_area);

        let block = Block::default()
            .borders(Borders::ALL)
            .title(accent_title("📦 Install tasklight"))
            .border_style(Style::default().fg(FG_ACCENT))
            .style(Style::default().bg(BG_PANEL));
        let inner = block.inner(popup_area);
        f.render_widget(block, popup_area);

        let selected = Style::default()
            .fg(Color::Black)
            .bg(Color::Green)
            .add_modifier(Modifier::BOLD);
        let (yes_style, no_style) = match self.confirm_choice {
            ConfirmChoice::Yes => (selected, Style::default().fg(Color::Gray)),
            ConfirmChoice::No => (Style::default().fg(Color::Green), selected.bg(Color::Gray)),
        };

        let lines = vec![
            Line::from(Span::styled(
                "Add a launcher marker so tasklight counts as installed?",
                Style::default().fg(Color::White),
            )),
            Line::default(),
            Line::from(vec![
                Span::styled("  Install  ", yes_style),
                Span::raw("    "),
                Span::styled("  Not now  ", no_style),
            ]),
        ];

        f.render_widget(
            Paragraph::new(lines)
                .wrap(Wrap { trim: true })
                .alignment(Alignment::Center)
                .style(Style::default().bg(BG_PANEL)),
            inset_rect(inner, 1),
        );
    }

    fn draw_help_overlay(&self, f: &mut Frame<'_>, area: Rect) {
        let lines = build_help_lines();
        let width = min(area.width.saturating_sub(10), 70);
        let height = min(lines.len() as u16 + 4, area.height.saturating_sub(2)).max(10);
        let popup_area = centered_rect(width, height, area);
        f.render_widget(Clear, popup_area);

        let block = Block::default()
            .borders(Borders::ALL)
            .title(accent_title("⌨️ Keyboard Reference"))
            .border_style(Style::default().fg(Color::DarkGray))
            .style(Style::default().bg(BG_PANEL));
        let inner = block.inner(popup_area);
        f.render_widget(block, popup_area);

        if inner.width < 3 || inner.height < 3 {
            return;
        }

        let help_lines: Vec<Line> = lines
            .into_iter()
            .map(|(combo, desc)| {
                Line::from(vec![
                    Span::styled(format!("{combo:<18}"), Style::default().fg(Color::Cyan)),
                    Span::raw(desc),
                ])
            })
            .collect();
        f.render_widget(
            Paragraph::new(help_lines)
                .wrap(Wrap { trim: true })
                .style(Style::default().bg(BG_PANEL)),
            inset_rect(inner, 1),
        );
    }
}
