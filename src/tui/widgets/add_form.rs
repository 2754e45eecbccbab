use ratatui::layout::{Alignment, Constraint, Layout, Position, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};
use ratatui::Frame;

use crate::tui::app::{AddForm, FormField};
use crate::tui::widgets::color::parse_color;
use crate::tui::widgets::popup_area;
use crate::Config;

const TIME_HINT: &str = "YYYY-MM-DD HH:MM, or +10m / +2h / +1d";

pub fn render_add_form(f: &mut Frame, area: Rect, form: &AddForm, config: &Config) {
    let active_theme = config.get_active_theme();
    let fg_color = parse_color(&active_theme.fg);
    let bg_color = parse_color(&active_theme.bg);
    let accent = parse_color(&active_theme.accent);
    let muted = parse_color(&active_theme.muted);

    let popup_area = popup_area(area, 60, 50);
    f.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .title("New Reminder")
        .title_alignment(Alignment::Center)
        .style(Style::default().fg(fg_color).bg(bg_color));
    let inner = block.inner(popup_area);
    f.render_widget(block, popup_area);

    let [text_area, time_area, hint_area, _, keys_area] = Layout::vertical([
        Constraint::Length(3),
        Constraint::Length(3),
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(inner);

    let fields = [
        (FormField::Text, "Reminder", &form.text, text_area),
        (FormField::Time, "When", &form.time, time_area),
    ];
    for (field, label, editor, field_area) in fields {
        let is_active = form.current_field == field;
        let border_style = if is_active {
            Style::default().fg(accent).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(fg_color)
        };
        let field_block = Block::default()
            .borders(Borders::ALL)
            .title(label)
            .border_style(border_style);
        let field_inner = field_block.inner(field_area);

        let (visible, cursor_col) = editor.visible(field_inner.width as usize);
        f.render_widget(
            Paragraph::new(visible)
                .block(field_block)
                .style(Style::default().fg(fg_color).bg(bg_color)),
            field_area,
        );

        if is_active && field_inner.width > 0 && field_inner.height > 0 {
            f.set_cursor_position(Position::new(
                field_inner.x + cursor_col as u16,
                field_inner.y,
            ));
        }
    }

    f.render_widget(
        Paragraph::new(Line::from(Span::styled(TIME_HINT, Style::default().fg(muted)))),
        hint_area,
    );
    f.render_widget(
        Paragraph::new(format!(
            "Tab: next field • Enter/{}: save • Esc: cancel",
            config.key_bindings.save
        ))
        .style(Style::default().fg(muted))
        .alignment(Alignment::Center),
        keys_area,
    );
}
