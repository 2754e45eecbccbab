use ratatui::Frame;
use ratatui::widgets::{Block, Borders};
use ratatui::style::Style;
use crate::tui::app::Mode;
use crate::tui::{App, Layout};
use crate::tui::widgets::{
    add_form::render_add_form,
    alert::render_alert,
    color::parse_color,
    confirm_delete::render_confirm_delete,
    help::render_help,
    reminder_list::{render_reminder_list, Section},
    status_bar::render_status_bar,
};

pub fn render(f: &mut Frame, app: &App, layout: &Layout) {
    let active_theme = app.config.get_active_theme();
    let fg_color = parse_color(&active_theme.fg);
    let bg_color = parse_color(&active_theme.bg);
    let outer_block = Block::default()
        .borders(Borders::ALL)
        .title("My Reminders")
        .title_alignment(ratatui::layout::Alignment::Center)
        .style(Style::default().fg(fg_color).bg(bg_color));
    f.render_widget(outer_block, f.area());

    // Selection indexes upcoming first, then past
    let partition = app.partition();
    let selected = app.ui.selected_index;
    let upcoming_len = partition.upcoming.len();
    render_reminder_list(
        f,
        layout.upcoming_area,
        Section::Upcoming,
        &partition.upcoming,
        (selected < upcoming_len).then_some(selected),
        &app.config,
    );
    if !partition.past.is_empty() {
        render_reminder_list(
            f,
            layout.past_area,
            Section::Past,
            &partition.past,
            selected.checked_sub(upcoming_len),
            &app.config,
        );
    }

    let key_hints = key_hints(app);
    render_status_bar(f, layout.status_area, app.status.message.as_ref(), &key_hints, &app.config);

    // Overlays, lowest first
    if app.ui.mode == Mode::Create {
        if let Some(ref form) = app.form.add_form {
            render_add_form(f, f.area(), form, &app.config);
        }
    }
    if app.ui.mode == Mode::Help {
        render_help(f, f.area(), &app.config);
    }
    if let Some(ref reminder) = app.modals.delete_confirmation {
        render_confirm_delete(f, f.area(), reminder, app.modals.delete_modal_selection, &app.config);
    }
    if let Some(message) = app.current_alert() {
        let pending = app.modals.alerts.len().saturating_sub(1);
        render_alert(f, f.area(), message, pending, &app.config);
    }
}

fn key_hints(app: &App) -> Vec<String> {
    let keys = &app.config.key_bindings;
    if app.current_alert().is_some() {
        return vec!["Enter: Dismiss".to_string()];
    }
    if app.modals.delete_confirmation.is_some() {
        return vec!["↑↓: Choose".to_string(), "Enter: Confirm".to_string(), "Esc: Cancel".to_string()];
    }
    match app.ui.mode {
        Mode::Create => vec![
            "Tab: Next field".to_string(),
            format!("{}: Save", keys.save),
            "Esc: Cancel".to_string(),
        ],
        Mode::Help => vec![format!("{}/Esc: Close help", keys.help)],
        Mode::View => vec![
            format!("{}: New", keys.new),
            format!("{}: Delete", keys.delete),
            format!("{}/{}: Move", keys.list_down, keys.list_up),
            format!("{}: Help", keys.help),
            format!("{}: Quit", keys.quit),
        ],
    }
}
