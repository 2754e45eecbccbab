use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, ListState};
use ratatui::Frame;

use crate::models::Reminder;
use crate::tui::widgets::color::{get_contrast_text_color, parse_color};
use crate::tui::widgets::truncate;
use crate::utils;
use crate::Config;

/// Which half of the partition a list shows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Upcoming,
    Past,
}

impl Section {
    pub fn title(self) -> &'static str {
        match self {
            Section::Upcoming => "Upcoming",
            Section::Past => "Past",
        }
    }
}

/// One list row: `text — formatted time`
pub fn reminder_line(reminder: &Reminder, time_format: &str) -> String {
    format!(
        "{} — {}",
        reminder.text,
        utils::format_time(&reminder.time, time_format)
    )
}

/// Render one section. `selected` is an index into `reminders` when the
/// selection falls inside this section.
pub fn render_reminder_list(
    f: &mut Frame,
    area: Rect,
    section: Section,
    reminders: &[Reminder],
    selected: Option<usize>,
    config: &Config,
) {
    if area.height == 0 {
        return;
    }

    let active_theme = config.get_active_theme();
    let fg_color = parse_color(&active_theme.fg);
    let bg_color = parse_color(&active_theme.bg);
    let highlight_bg = parse_color(&active_theme.highlight_bg);
    let highlight_fg = get_contrast_text_color(highlight_bg);
    // Past reminders are dimmed
    let (title_color, item_color) = match section {
        Section::Upcoming => (parse_color(&active_theme.accent), fg_color),
        Section::Past => {
            let muted = parse_color(&active_theme.muted);
            (muted, muted)
        }
    };

    let max_width = area.width.saturating_sub(4) as usize; // 2 for borders, 2 for padding

    let items: Vec<ListItem> = if reminders.is_empty() {
        vec![ListItem::new(Line::from(Span::styled(
            "No reminders.",
            Style::default().fg(parse_color(&active_theme.muted)),
        )))]
    } else {
        reminders
            .iter()
            .map(|reminder| {
                let line = truncate(&reminder_line(reminder, &config.time_format), max_width);
                ListItem::new(line).style(Style::default().fg(item_color))
            })
            .collect()
    };

    let title = Span::styled(
        format!(" {} ({}) ", section.title(), reminders.len()),
        Style::default().fg(title_color).add_modifier(Modifier::BOLD),
    );

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(title)
                .style(Style::default().fg(fg_color).bg(bg_color)),
        )
        .style(Style::default().fg(fg_color).bg(bg_color))
        .highlight_style(Style::default().fg(highlight_fg).bg(highlight_bg));

    let mut list_state = ListState::default();
    list_state.select(selected.filter(|_| !reminders.is_empty()));
    f.render_stateful_widget(list, area, &mut list_state);
}


