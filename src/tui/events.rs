use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen, size as terminal_size};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::Rect;
use ratatui::Terminal;
use std::io;
use tracing::{debug, info};
use crate::tui::app::{FormField, Mode};
use crate::tui::error::TuiError;
use crate::tui::layout::Layout;
use crate::tui::widgets::confirm_delete::DELETE_OPTIONS;
use crate::tui::App;
use crate::utils::parse_key_binding;

/// Guard that ensures terminal state is restored even on panic.
/// If the terminal is left in raw mode or the alternate screen, the
/// user's shell is unusable.
struct TerminalGuard {
    raw_mode_enabled: bool,
    alternate_screen_enabled: bool,
}

impl TerminalGuard {
    fn new() -> Result<Self, TuiError> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;

        Ok(Self {
            raw_mode_enabled: true,
            alternate_screen_enabled: true,
        })
    }

    /// Restore terminal state on normal exit. The guard does nothing on drop afterwards.
    fn restore(&mut self) -> Result<(), TuiError> {
        if self.raw_mode_enabled {
            disable_raw_mode()?;
            self.raw_mode_enabled = false;
        }
        if self.alternate_screen_enabled {
            execute!(io::stdout(), LeaveAlternateScreen)?;
            self.alternate_screen_enabled = false;
        }
        Ok(())
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        // Already cleaning up, errors have nowhere to go
        if self.raw_mode_enabled {
            let _ = disable_raw_mode();
        }
        if self.alternate_screen_enabled {
            let _ = execute!(io::stdout(), LeaveAlternateScreen);
        }
    }
}

pub fn run_event_loop(mut app: App) -> Result<(), TuiError> {
    // Check terminal size before entering alternate screen so the error
    // prints in the normal terminal
    let (width, height) = terminal_size()?;
    let min_width_with_border = Layout::MIN_WIDTH + 2;
    let min_height_with_border = Layout::MIN_HEIGHT + 2;

    if width < min_width_with_border || height < min_height_with_border {
        return Err(TuiError::RenderError(format!(
            "Terminal size too small. Current: {}x{}, Minimum required: {}x{}. Please resize your terminal window.",
            width, height, min_width_with_border, min_height_with_border
        )));
    }

    let mut guard = TerminalGuard::new()?;

    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend)?;
    info!("tui started");

    loop {
        app.check_status_message_timeout();

        // Deliver anything that came due since the last pass
        app.tick();

        let terminal_size = terminal.size()?;
        let terminal_rect = Rect::new(0, 0, terminal_size.width, terminal_size.height);
        terminal.draw(|f| {
            let partition = app.partition();
            let layout = Layout::calculate(terminal_rect, partition.upcoming.len(), partition.past.len());
            crate::tui::render::render(f, &app, &layout);
        })?;

        // Wake up for input or for the next deadline, whichever comes first
        if event::poll(app.poll_timeout())? {
            match event::read()? {
                Event::Key(key_event) => {
                    // Only Press events; Windows also reports Release
                    if key_event.kind == KeyEventKind::Press && handle_key_event(&mut app, key_event)? {
                        break;
                    }
                }
                Event::Resize(_width, _height) => {
                    // terminal.size() picks up the new size on the next draw
                }
                _ => {}
            }
        }
    }

    app.scheduler.cancel_all();
    guard.restore()?;
    info!("tui stopped");

    Ok(())
}

/// Handle one key press. Returns true when the app should quit.
pub fn handle_key_event(app: &mut App, key_event: KeyEvent) -> Result<bool, TuiError> {
    // Alerts block everything until acknowledged
    if app.current_alert().is_some() {
        return Ok(handle_alert_modal(app, key_event));
    }

    if app.modals.delete_confirmation.is_some() {
        return Ok(handle_delete_confirmation_modal(app, key_event));
    }

    match app.ui.mode {
        Mode::Create => handle_create_mode(app, key_event),
        Mode::Help => handle_help_mode(app, key_event),
        Mode::View => handle_view_mode(app, key_event),
    }
}

fn handle_alert_modal(app: &mut App, key_event: KeyEvent) -> bool {
    if matches!(key_event.code, KeyCode::Enter | KeyCode::Esc | KeyCode::Char(' ')) {
        app.dismiss_alert();
    }
    false
}

fn handle_delete_confirmation_modal(app: &mut App, key_event: KeyEvent) -> bool {
    let last = DELETE_OPTIONS.len() - 1;
    match key_event.code {
        KeyCode::Up => {
            // Wraps from the first option to the last
            app.modals.delete_modal_selection = match app.modals.delete_modal_selection {
                0 => last,
                n => n - 1,
            };
        }
        KeyCode::Down => {
            app.modals.delete_modal_selection = if app.modals.delete_modal_selection >= last {
                0
            } else {
                app.modals.delete_modal_selection + 1
            };
        }
        KeyCode::Enter => app.confirm_delete(),
        KeyCode::Esc => app.cancel_delete(),
        _ => {}
    }
    false
}

fn handle_create_mode(app: &mut App, key_event: KeyEvent) -> Result<bool, TuiError> {
    let save = parse_key_binding(&app.config.key_bindings.save)
        .map_err(TuiError::KeyBindingError)?;
    if save.matches(key_event.code, key_event.modifiers) {
        app.save_add_form();
        return Ok(false);
    }

    match key_event.code {
        KeyCode::Esc => app.exit_create_mode(),
        KeyCode::Tab | KeyCode::BackTab => app.navigate_form_field(),
        KeyCode::Enter => {
            let on_time_field = app
                .form
                .add_form
                .as_ref()
                .is_some_and(|form| form.current_field == FormField::Time);
            if on_time_field {
                app.save_add_form();
            } else {
                app.navigate_form_field();
            }
        }
        code => {
            if let Some(editor) = app.get_current_form_editor() {
                match code {
                    KeyCode::Char(c) if !key_event.modifiers.contains(KeyModifiers::CONTROL) => {
                        editor.insert_char(c)
                    }
                    KeyCode::Backspace => editor.delete_char(),
                    KeyCode::Delete => editor.delete_forward(),
                    KeyCode::Left => editor.move_left(),
                    KeyCode::Right => editor.move_right(),
                    KeyCode::Home => editor.move_home(),
                    KeyCode::End => editor.move_end(),
                    _ => {}
                }
            }
        }
    }
    Ok(false)
}

fn handle_help_mode(app: &mut App, key_event: KeyEvent) -> Result<bool, TuiError> {
    let help = parse_key_binding(&app.config.key_bindings.help)
        .map_err(TuiError::KeyBindingError)?;
    if key_event.code == KeyCode::Esc || help.matches(key_event.code, key_event.modifiers) {
        app.exit_help_mode();
    }
    Ok(false)
}

fn handle_view_mode(app: &mut App, key_event: KeyEvent) -> Result<bool, TuiError> {
    if key_event.code == KeyCode::Char('c') && key_event.modifiers.contains(KeyModifiers::CONTROL) {
        return Ok(true);
    }

    let keys = &app.config.key_bindings;
    let bindings = [
        (&keys.quit, ViewAction::Quit),
        (&keys.new, ViewAction::New),
        (&keys.delete, ViewAction::Delete),
        (&keys.list_up, ViewAction::Up),
        (&keys.list_down, ViewAction::Down),
        (&keys.help, ViewAction::Help),
    ];
    let mut action = None;
    for (binding, candidate) in bindings {
        let parsed = parse_key_binding(binding).map_err(TuiError::KeyBindingError)?;
        if parsed.matches(key_event.code, key_event.modifiers) {
            action = Some(candidate);
            break;
        }
    }
    let action = action.or(match key_event.code {
        KeyCode::Up => Some(ViewAction::Up),
        KeyCode::Down => Some(ViewAction::Down),
        _ => None,
    });

    if let Some(action) = action {
        debug!(?action, "view action");
        match action {
            ViewAction::Quit => return Ok(true),
            ViewAction::New => app.enter_create_mode(),
            ViewAction::Delete => app.request_delete(),
            ViewAction::Up => app.move_selection_up(),
            ViewAction::Down => app.move_selection_down(),
            ViewAction::Help => app.enter_help_mode(),
        }
    }
    Ok(false)
}

#[derive(Debug, Clone, Copy)]
enum ViewAction {
    Quit,
    New,
    Delete,
    Up,
    Down,
    Help,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::DEFAULT_STORAGE_KEY;
    use crate::{Config, Notifier, Reminder, ReminderStore, SqliteStore};

    fn app() -> App {
        let storage = SqliteStore::open_in_memory().unwrap();
        let store = ReminderStore::load(storage, DEFAULT_STORAGE_KEY);
        App::new(Config::default(), store, Notifier::alerts_only())
    }

    fn press(app: &mut App, code: KeyCode) -> bool {
        handle_key_event(app, KeyEvent::new(code, KeyModifiers::NONE)).unwrap()
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            press(app, KeyCode::Char(c));
        }
    }

    #[test]
    fn typing_a_reminder_and_pressing_enter_saves_it() {
        let mut app = app();
        press(&mut app, KeyCode::Char('n'));
        assert_eq!(app.ui.mode, Mode::Create);

        type_text(&mut app, "Pay rent");
        press(&mut app, KeyCode::Enter);
        type_text(&mut app, "+2h");
        press(&mut app, KeyCode::Enter);

        assert_eq!(app.ui.mode, Mode::View);
        assert_eq!(app.store.items()[0].text, "Pay rent");
        assert_eq!(app.scheduler.armed_count(), 1);
    }

    #[test]
    fn ctrl_s_saves_from_either_field() {
        let mut app = app();
        press(&mut app, KeyCode::Char('n'));
        type_text(&mut app, "Stretch");
        press(&mut app, KeyCode::Tab);
        type_text(&mut app, "+5m");
        press(&mut app, KeyCode::BackTab);
        handle_key_event(&mut app, KeyEvent::new(KeyCode::Char('s'), KeyModifiers::CONTROL)).unwrap();
        assert_eq!(app.store.len(), 1);
    }

    #[test]
    fn escape_discards_the_form() {
        let mut app = app();
        press(&mut app, KeyCode::Char('n'));
        type_text(&mut app, "q");
        press(&mut app, KeyCode::Esc);
        assert_eq!(app.ui.mode, Mode::View);
        assert!(app.store.is_empty());
    }

    #[test]
    fn delete_goes_through_confirmation() {
        let mut app = app();
        press(&mut app, KeyCode::Char('n'));
        type_text(&mut app, "Stretch");
        press(&mut app, KeyCode::Tab);
        type_text(&mut app, "+5m");
        press(&mut app, KeyCode::Enter);

        press(&mut app, KeyCode::Char('d'));
        // Keys other than the modal's own are swallowed
        assert!(!press(&mut app, KeyCode::Char('q')));
        press(&mut app, KeyCode::Down);
        assert_eq!(app.modals.delete_modal_selection, 1);
        press(&mut app, KeyCode::Up);
        press(&mut app, KeyCode::Enter);

        assert!(app.store.is_empty());
        assert_eq!(app.scheduler.armed_count(), 0);
    }

    #[test]
    fn alerts_block_input_until_dismissed() {
        let mut app = app();
        app.modals.alerts.push_back(crate::notify::alert_message(&Reminder::new(
            "Call mom".to_string(),
            "2030-01-01T09:00".to_string(),
        )));

        assert!(!press(&mut app, KeyCode::Char('q')));
        assert!(!press(&mut app, KeyCode::Char('n')));
        assert_eq!(app.ui.mode, Mode::View);

        press(&mut app, KeyCode::Enter);
        assert!(app.current_alert().is_none());
        assert!(press(&mut app, KeyCode::Char('q')));
    }

    #[test]
    fn help_toggles() {
        let mut app = app();
        press(&mut app, KeyCode::F(1));
        assert_eq!(app.ui.mode, Mode::Help);
        press(&mut app, KeyCode::F(1));
        assert_eq!(app.ui.mode, Mode::View);
    }

    #[test]
    fn ctrl_c_quits() {
        let mut app = app();
        assert!(handle_key_event(&mut app, KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)).unwrap());
    }

    #[test]
    fn bad_binding_is_reported() {
        let mut app = app();
        app.config.key_bindings.quit = "Hyper+q".to_string();
        assert!(matches!(
            handle_key_event(&mut app, KeyEvent::new(KeyCode::Char('x'), KeyModifiers::NONE)),
            Err(TuiError::KeyBindingError(_))
        ));
    }
}
