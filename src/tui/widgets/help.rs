use ratatui::widgets::{Block, Borders, Paragraph, Clear};
use ratatui::style::Style;
use ratatui::Frame;
use ratatui::layout::{Rect, Alignment};
use crate::Config;
use crate::tui::widgets::color::parse_color;
use crate::tui::widgets::popup_area;

pub fn render_help(f: &mut Frame, area: Rect, config: &Config) {
    let active_theme = config.get_active_theme();
    let fg_color = parse_color(&active_theme.fg);
    let bg_color = parse_color(&active_theme.bg);

    let popup_area = popup_area(area, 60, 70);
    f.render_widget(Clear, popup_area);

    let paragraph = Paragraph::new(build_help_text(config))
        .block(Block::default()
            .borders(Borders::ALL)
            .title("Help - Key Bindings")
            .title_alignment(Alignment::Center)
            .style(Style::default().fg(fg_color).bg(bg_color)))
        .style(Style::default().fg(fg_color).bg(bg_color))
        .wrap(ratatui::widgets::Wrap { trim: true });

    f.render_widget(paragraph, popup_area);
}

fn build_help_text(config: &Config) -> String {
    let keys = &config.key_bindings;
    let mut text = String::new();

    text.push_str("Navigation:\n");
    text.push_str(&format!("  {} / {} or ↑ / ↓: Move selection\n", keys.list_up, keys.list_down));
    text.push('\n');

    text.push_str("Actions:\n");
    text.push_str(&format!("  {}: New reminder\n", keys.new));
    text.push_str(&format!("  {}: Delete selected reminder\n", keys.delete));
    text.push('\n');

    text.push_str("New reminder form:\n");
    text.push_str("  Tab / Shift+Tab: Switch field\n");
    text.push_str(&format!("  Enter on When, or {}: Save\n", keys.save));
    text.push_str("  Esc: Cancel\n");
    text.push_str("  Times: YYYY-MM-DD HH:MM, or +10m / +2h / +1d\n");
    text.push('\n');

    text.push_str("General:\n");
    text.push_str(&format!("  {}: Toggle this help\n", keys.help));
    text.push_str(&format!("  {} / Ctrl+C: Quit\n", keys.quit));

    text
}


