use std::cmp::min;

use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};

use crate::model::Task;

pub const BG_BASE: Color = Color::Rgb(14, 17, 23);
pub const BG_PANEL: Color = Color::Rgb(22, 26, 34);
pub const BG_ACCENT: Color = Color::Rgb(32, 37, 47);
pub const FG_ACCENT: Color = Color::Rgb(120, 161, 255);

pub fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let w = min(width, area.width);
    let h = min(height, area.height);
    Rect {
        x: area.x + (area.width.saturating_sub(w)) / 2,
        y: area.y + (area.height.saturating_sub(h)) / 2,
        width: w,
        height: h,
    }
}

pub fn inset_rect(area: Rect, padding: u16) -> Rect {
    if area.width == 0 || area.height == 0 {
        return area;
    }
    let px = padding.min(area.width / 2);
    let py = padding.min(area.height / 2);
    Rect {
        x: area.x + px,
        y: area.y + py,
        width: area.width.saturating_sub(px * 2),
        height: area.height.saturating_sub(py * 2),
    }
}

pub fn accent_title(text: &str) -> Line<'static> {
    Line::from(vec![Span::styled(
        text.to_owned(),
        Style::default().fg(FG_ACCENT).add_modifier(Modifier::BOLD),
    )])
}

/// Checkbox row for a task; completed tasks are struck through.
pub fn task_line(task: &Task) -> Line<'static> {
    let (checkbox, text_style) = if task.completed {
        (
            "[x] ",
            Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::CROSSED_OUT),
        )
    } else {
        ("[ ] ", Style::default().fg(Color::White))
    };
    Line::from(vec![
        Span::styled(checkbox, Style::default().fg(Color::Green)),
        Span::styled(task.text.clone(), text_style),
    ])
}

pub fn build_help_lines() -> Vec<(&'static str, &'static str)> {
    vec![
        ("Tab / Shift+Tab", "Switch filter"),
        ("1 / 2 / 3", "All, Active, Completed"),
        ("j / k or ↓ / ↑", "Move selection"),
        ("a", "Add a task"),
        ("Space", "Toggle completed"),
        ("x / Delete", "Delete task"),
        ("n", "Enable notifications"),
        ("I", "Install tasklight"),
        ("h / ?", "Toggle this help overlay"),
        ("q", "Quit"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TaskId;

    #[test]
    fn centered_rect_keeps_within_bounds() {
        let area = Rect {
            x: 0,
            y: 0,
            width: 80,
            height: 24,
        };
        let rect = centered_rect(40, 10, area);
        assert_eq!((rect.x, rect.y, rect.width, rect.height), (20, 7, 40, 10));

        let clipped = centered_rect(200, 50, area);
        assert_eq!((clipped.width, clipped.height), (80, 24));
    }

    #[test]
    fn completed_tasks_are_struck_through() {
        let mut task = Task::new(TaskId(1), "Buy milk");
        let open = task_line(&task);
        assert_eq!(open.spans[0].content, "[ ] ");
        assert!(!open.spans[1].style.add_modifier.contains(Modifier::CROSSED_OUT));

        task.completed = true;
        let done = task_line(&task);
        assert_eq!(done.spans[0].content, "[x] ");
        assert!(done.spans[1].style.add_modifier.contains(Modifier::CROSSED_OUT));
    }
}
