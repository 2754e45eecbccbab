use std::collections::VecDeque;
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::clock::Clock;
use crate::notify::{Delivery, Notifier};
use crate::scheduler::{send_on_fire, TimerScheduler};
use crate::store::{Partition, ReminderStore, StoreError};
use crate::tui::widgets::editor::Editor;
use crate::{Config, Reminder, SqliteStore};

/// Upper bound on how long the event loop waits for input
pub const TICK_RATE: Duration = Duration::from_millis(250);

const STATUS_MESSAGE_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    View,
    Create,
    Help,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Text,
    Time,
}

#[derive(Debug, Clone)]
pub struct AddForm {
    pub current_field: FormField,
    pub text: Editor,
    pub time: Editor,
}

impl Default for AddForm {
    fn default() -> Self {
        Self {
            current_field: FormField::Text,
            text: Editor::new(),
            time: Editor::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct UiState {
    pub mode: Mode,
    /// Index into upcoming followed by past, as displayed
    pub selected_index: usize,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            mode: Mode::View,
            selected_index: 0,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ModalState {
    pub delete_confirmation: Option<Reminder>,
    /// 0 = Delete, 1 = Cancel
    pub delete_modal_selection: usize,
    /// Blocking alerts waiting to be acknowledged, oldest first
    pub alerts: VecDeque<String>,
}

#[derive(Debug, Clone, Default)]
pub struct StatusState {
    pub message: Option<String>,
    pub message_time: Option<Instant>,
}

#[derive(Debug, Clone, Default)]
pub struct FormState {
    pub add_form: Option<AddForm>,
}

pub struct App {
    pub config: Config,
    pub store: ReminderStore<SqliteStore>,
    pub scheduler: TimerScheduler,
    pub notifier: Notifier,
    fired_tx: Sender<Reminder>,
    fired_rx: Receiver<Reminder>,
    /// When storage was last checked for outside changes, in epoch millis
    last_sync: i64,

    pub ui: UiState,
    pub modals: ModalState,
    pub status: StatusState,
    pub form: FormState,
}

impl App {
    /// Build the app and arm timers for every pending reminder in the store
    pub fn new(config: Config, store: ReminderStore<SqliteStore>, notifier: Notifier) -> Self {
        let (fired_tx, fired_rx) = mpsc::channel();
        let mut app = Self {
            config,
            store,
            scheduler: TimerScheduler::new(),
            notifier,
            fired_tx,
            fired_rx,
            last_sync: 0,
            ui: UiState::default(),
            modals: ModalState::default(),
            status: StatusState::default(),
            form: FormState::default(),
        };
        app.last_sync = app.now_millis();
        let armed = app.resync_timers();
        info!(reminders = app.store.len(), armed, "reminders restored");
        app
    }

    pub fn now_millis(&self) -> i64 {
        self.scheduler.clock().now_millis()
    }

    /// Re-arm one timer per future reminder
    pub fn resync_timers(&mut self) -> usize {
        self.scheduler.resync(self.store.items(), send_on_fire(&self.fired_tx))
    }

    /// Pick up reminders added or deleted by other `rmd` processes. Ones
    /// that appeared after their time already came are delivered right away.
    pub fn sync_with_storage(&mut self) {
        let now = self.now_millis();
        let since = std::mem::replace(&mut self.last_sync, now);
        if let Some(added) = self.store.refresh() {
            let armed = self.resync_timers();
            let caught_up = self.scheduler.fire_missed(&added, since, send_on_fire(&self.fired_tx));
            info!(armed, caught_up, "storage changed, timers resynced");
            self.clamp_selection();
        }
    }

    /// Sync with storage, fire due timers and deliver whatever fired.
    /// Returns the number delivered.
    pub fn tick(&mut self) -> usize {
        self.sync_with_storage();
        self.scheduler.fire_due();

        let mut delivered = 0;
        while let Ok(reminder) = self.fired_rx.try_recv() {
            self.deliver(&reminder);
            delivered += 1;
        }
        if delivered > 0 {
            self.clamp_selection();
        }
        let failed = self.notifier.take_failed();
        self.modals.alerts.extend(failed);
        delivered
    }

    fn deliver(&mut self, reminder: &Reminder) {
        match self.notifier.deliver(reminder) {
            Delivery::System => {
                self.set_status_message(format!("Reminder: {}", reminder.text));
            }
            Delivery::Alert(message) => self.modals.alerts.push_back(message),
        }
    }

    /// How long the event loop may block waiting for input
    pub fn poll_timeout(&self) -> Duration {
        self.scheduler
            .time_until_next()
            .map_or(TICK_RATE, |next| next.min(TICK_RATE))
    }

    pub fn partition(&self) -> Partition {
        self.store.partition(self.now_millis())
    }

    /// Upcoming then past, in display order
    pub fn display_items(&self) -> Vec<Reminder> {
        let Partition { mut upcoming, past } = self.partition();
        upcoming.extend(past);
        upcoming
    }

    pub fn selected_reminder(&self) -> Option<Reminder> {
        self.display_items().into_iter().nth(self.ui.selected_index)
    }

    pub fn move_selection_up(&mut self) {
        self.ui.selected_index = self.ui.selected_index.saturating_sub(1);
    }

    pub fn move_selection_down(&mut self) {
        let len = self.store.len();
        if self.ui.selected_index + 1 < len {
            self.ui.selected_index += 1;
        }
    }

    pub fn clamp_selection(&mut self) {
        let len = self.store.len();
        if self.ui.selected_index >= len {
            self.ui.selected_index = len.saturating_sub(1);
        }
    }

    pub fn set_status_message(&mut self, message: String) {
        self.status.message = Some(message);
        self.status.message_time = Some(Instant::now());
    }

    pub fn clear_status_message(&mut self) {
        self.status.message = None;
        self.status.message_time = None;
    }

    /// Check if status message should be auto-cleared
    pub fn check_status_message_timeout(&mut self) {
        if let Some(time) = self.status.message_time {
            if time.elapsed() >= STATUS_MESSAGE_TIMEOUT {
                self.clear_status_message();
            }
        }
    }

    pub fn enter_create_mode(&mut self) {
        self.form.add_form = Some(AddForm::default());
        self.ui.mode = Mode::Create;
    }

    pub fn exit_create_mode(&mut self) {
        self.form.add_form = None;
        self.ui.mode = Mode::View;
    }

    pub fn navigate_form_field(&mut self) {
        if let Some(ref mut form) = self.form.add_form {
            form.current_field = match form.current_field {
                FormField::Text => FormField::Time,
                FormField::Time => FormField::Text,
            };
        }
    }

    pub fn get_current_form_editor(&mut self) -> Option<&mut Editor> {
        self.form.add_form.as_mut().map(|form| match form.current_field {
            FormField::Text => &mut form.text,
            FormField::Time => &mut form.time,
        })
    }

    /// Submit the add form. On a validation error the form stays open with
    /// its contents so the user can correct them.
    pub fn save_add_form(&mut self) {
        // Catch up first so the add cannot hide another process's reminders
        self.sync_with_storage();
        let Some((text, time)) = self
            .form
            .add_form
            .as_ref()
            .map(|form| (form.text.to_string(), form.time.to_string()))
        else {
            return;
        };

        match self.store.add(&text, &time) {
            Ok(reminder) => {
                self.resync_timers();
                self.exit_create_mode();
                self.select_by_id(&reminder.id);
                self.set_status_message("Reminder added".to_string());
            }
            Err(StoreError::Validation(e)) => {
                self.set_status_message(format!("Validation error: {}", e));
            }
            Err(e) => {
                warn!(error = %e, "failed to save reminder");
                self.set_status_message(format!("Failed to save reminder: {}", e));
            }
        }
    }

    fn select_by_id(&mut self, id: &str) {
        if let Some(index) = self.display_items().iter().position(|r| r.id == id) {
            self.ui.selected_index = index;
        }
    }

    /// Open the delete confirmation for the selected reminder
    pub fn request_delete(&mut self) {
        if let Some(reminder) = self.selected_reminder() {
            self.modals.delete_confirmation = Some(reminder);
            self.modals.delete_modal_selection = 0;
        }
    }

    pub fn cancel_delete(&mut self) {
        self.modals.delete_confirmation = None;
    }

    /// Act on the confirmation modal's current selection
    pub fn confirm_delete(&mut self) {
        if let Some(reminder) = self.modals.delete_confirmation.take() {
            if self.modals.delete_modal_selection == 0 {
                self.delete_reminder(&reminder.id);
            }
        }
    }

    /// Cancel the reminder's timer, remove it, persist, then resync
    pub fn delete_reminder(&mut self, id: &str) {
        self.sync_with_storage();
        self.scheduler.cancel(id);
        match self.store.delete(id) {
            Ok(Some(reminder)) => {
                self.resync_timers();
                self.clamp_selection();
                self.set_status_message(format!("Deleted: {}", reminder.text));
            }
            Ok(None) => {}
            Err(e) => {
                // Still in the store, so it needs its timer back
                self.resync_timers();
                warn!(id, error = %e, "failed to delete reminder");
                self.set_status_message(format!("Failed to delete reminder: {}", e));
            }
        }
    }

    pub fn current_alert(&self) -> Option<&String> {
        self.modals.alerts.front()
    }

    pub fn dismiss_alert(&mut self) {
        self.modals.alerts.pop_front();
    }

    pub fn enter_help_mode(&mut self) {
        self.ui.mode = Mode::Help;
    }

    pub fn exit_help_mode(&mut self) {
        self.ui.mode = Mode::View;
    }

    #[cfg(test)]
    pub(crate) fn fired_sender(&self) -> Sender<Reminder> {
        self.fired_tx.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::DEFAULT_STORAGE_KEY;

    fn app() -> App {
        let storage = SqliteStore::open_in_memory().unwrap();
        let store = ReminderStore::load(storage, DEFAULT_STORAGE_KEY);
        App::new(Config::default(), store, Notifier::alerts_only())
    }

    fn app_on(path: &std::path::Path) -> App {
        let store = ReminderStore::load(SqliteStore::open(path).unwrap(), DEFAULT_STORAGE_KEY);
        App::new(Config::default(), store, Notifier::alerts_only())
    }

    #[test]
    fn reminders_added_from_another_process_survive_a_tui_add() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reminders.db");
        let mut app = app_on(&path);

        let mut cli = ReminderStore::load(SqliteStore::open(&path).unwrap(), DEFAULT_STORAGE_KEY);
        cli.add("from cli", "+1h").unwrap();

        fill_form(&mut app, "from tui", "+2h");
        app.save_add_form();

        let texts: Vec<String> = ReminderStore::load(SqliteStore::open(&path).unwrap(), DEFAULT_STORAGE_KEY)
            .items()
            .iter()
            .map(|r| r.text.clone())
            .collect();
        assert_eq!(texts, ["from cli", "from tui"]);
        assert_eq!(app.scheduler.armed_count(), 2);
    }

    #[test]
    fn tick_arms_reminders_added_from_another_process() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reminders.db");
        let mut app = app_on(&path);

        let mut cli = ReminderStore::load(SqliteStore::open(&path).unwrap(), DEFAULT_STORAGE_KEY);
        cli.add("from cli", "+1h").unwrap();

        app.tick();
        assert_eq!(app.store.len(), 1);
        assert_eq!(app.scheduler.armed_count(), 1);
    }

    fn fill_form(app: &mut App, text: &str, time: &str) {
        app.enter_create_mode();
        text.chars().for_each(|c| app.get_current_form_editor().unwrap().insert_char(c));
        app.navigate_form_field();
        time.chars().for_each(|c| app.get_current_form_editor().unwrap().insert_char(c));
    }

    #[test]
    fn adding_through_the_form_arms_a_timer() {
        let mut app = app();
        fill_form(&mut app, "Pay rent", "+1h");
        app.save_add_form();

        assert_eq!(app.ui.mode, Mode::View);
        assert_eq!(app.store.len(), 1);
        assert_eq!(app.scheduler.armed_count(), 1);
        assert_eq!(app.partition().upcoming.len(), 1);
    }

    #[test]
    fn past_reminders_are_listed_but_not_armed() {
        let mut app = app();
        fill_form(&mut app, "Call mom", "2001-01-01 09:00");
        app.save_add_form();

        assert_eq!(app.scheduler.armed_count(), 0);
        assert_eq!(app.partition().past.len(), 1);
    }

    #[test]
    fn invalid_form_stays_open() {
        let mut app = app();
        fill_form(&mut app, "   ", "+1h");
        app.save_add_form();

        assert_eq!(app.ui.mode, Mode::Create);
        assert!(app.store.is_empty());
        assert_eq!(
            app.status.message.as_deref(),
            Some("Validation error: Reminder text is required")
        );
    }

    #[test]
    fn confirmed_delete_cancels_the_timer() {
        let mut app = app();
        fill_form(&mut app, "Stretch", "+1h");
        app.save_add_form();

        app.request_delete();
        assert!(app.modals.delete_confirmation.is_some());
        app.confirm_delete();

        assert!(app.store.is_empty());
        assert_eq!(app.scheduler.armed_count(), 0);
        assert!(app.modals.delete_confirmation.is_none());
    }

    #[test]
    fn cancelled_delete_keeps_the_reminder() {
        let mut app = app();
        fill_form(&mut app, "Stretch", "+1h");
        app.save_add_form();

        app.request_delete();
        app.modals.delete_modal_selection = 1;
        app.confirm_delete();
        assert_eq!(app.store.len(), 1);
        assert_eq!(app.scheduler.armed_count(), 1);
    }

    #[test]
    fn fired_reminders_queue_blocking_alerts_without_notifications() {
        let mut app = app();
        let reminder = Reminder::new("Pay rent".to_string(), "2030-01-01T09:00".to_string());
        app.fired_sender().send(reminder).unwrap();

        assert_eq!(app.tick(), 1);
        assert_eq!(app.current_alert().map(String::as_str), Some("Reminder: Pay rent"));
        app.dismiss_alert();
        assert!(app.current_alert().is_none());
    }

    #[test]
    fn selection_stays_in_bounds() {
        let mut app = app();
        app.move_selection_down();
        assert_eq!(app.ui.selected_index, 0);
        for text in ["a", "b"] {
            fill_form(&mut app, text, "+1h");
            app.save_add_form();
        }
        app.ui.selected_index = 0;
        app.move_selection_down();
        app.move_selection_down();
        assert_eq!(app.ui.selected_index, 1);
    }

    #[test]
    fn poll_timeout_is_bounded_by_tick_rate() {
        let mut app = app();
        assert_eq!(app.poll_timeout(), TICK_RATE);
        fill_form(&mut app, "soon", "+1s");
        app.save_add_form();
        assert!(app.poll_timeout() <= TICK_RATE);
    }
}
