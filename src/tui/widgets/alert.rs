use ratatui::layout::{Alignment, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use ratatui::Frame;

use crate::tui::widgets::color::{get_contrast_text_color, parse_color};
use crate::tui::widgets::popup_area;
use crate::Config;

/// Blocking alert for a reminder that could not be sent as a notification.
/// `pending` counts the alerts queued behind this one.
pub fn render_alert(f: &mut Frame, area: Rect, message: &str, pending: usize, config: &Config) {
    let active_theme = config.get_active_theme();
    let accent = parse_color(&active_theme.accent);
    let text_fg = get_contrast_text_color(accent);
    let style = Style::default().fg(text_fg).bg(accent);

    let popup_area = popup_area(area, 50, 30);
    f.render_widget(Clear, popup_area);

    let mut lines = vec![
        Line::from(""),
        Line::from(Span::styled(message.to_string(), style.add_modifier(Modifier::BOLD))),
        Line::from(""),
    ];
    if pending > 0 {
        lines.push(Line::from(Span::styled(format!("{} more waiting", pending), style)));
    }
    lines.push(Line::from(Span::styled("Press Enter to dismiss", style)));

    let paragraph = Paragraph::new(lines)
        .block(Block::default()
            .borders(Borders::ALL)
            .title("Reminder")
            .title_alignment(Alignment::Center)
            .style(style))
        .style(style)
        .wrap(Wrap { trim: true })
        .alignment(Alignment::Center);

    f.render_widget(paragraph, popup_area);
}
