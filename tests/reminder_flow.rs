use std::sync::mpsc;

use chrono::{Local, TimeZone};
use rmd::cli::Watcher;
use rmd::scheduler::send_on_fire;
use rmd::store::DEFAULT_STORAGE_KEY;
use rmd::{
    Clock, KeyValueStore, ManualClock, MemoryStore, Reminder, ReminderStore, SqliteStore,
    TimerScheduler,
};
use tempfile::TempDir;

const NOW: i64 = 1_900_000_000_000;
const HOUR: i64 = 60 * 60 * 1000;

fn local(millis: i64) -> chrono::DateTime<Local> {
    Local.timestamp_millis_opt(millis).unwrap()
}

#[test]
fn future_reminder_is_delivered_exactly_once() {
    let clock = ManualClock::new(NOW);
    let mut scheduler = TimerScheduler::with_clock(clock.clone());
    let (tx, rx) = mpsc::channel::<Reminder>();
    let mut store = ReminderStore::load(MemoryStore::new(), DEFAULT_STORAGE_KEY);

    let rent = store.add_at("Pay rent", "+1h", local(NOW)).unwrap();
    store.add_at("Call mom", "+2h", local(NOW)).unwrap();
    store.add_at("Old news", "2001-01-01 09:00", local(NOW)).unwrap();
    assert_eq!(scheduler.resync(store.items(), send_on_fire(&tx)), 2);

    let partition = store.partition(clock.now_millis());
    let upcoming: Vec<_> = partition.upcoming.iter().map(|r| r.text.as_str()).collect();
    assert_eq!(upcoming, ["Pay rent", "Call mom"]);
    assert_eq!(partition.past.len(), 1);

    clock.advance(HOUR - 1);
    scheduler.fire_due();
    assert!(rx.try_recv().is_err());

    clock.advance(1);
    scheduler.fire_due();
    assert_eq!(rx.try_recv().unwrap().id, rent.id);
    assert!(rx.try_recv().is_err());

    // A later resync must not re-arm what already fired
    assert_eq!(scheduler.resync(store.items(), send_on_fire(&tx)), 1);
    scheduler.fire_due();
    assert!(rx.try_recv().is_err());

    let partition = store.partition(clock.now_millis());
    assert_eq!(partition.upcoming.len(), 2, "due time equal to now is still upcoming");
}

#[test]
fn deleting_an_armed_reminder_prevents_delivery() {
    let clock = ManualClock::new(NOW);
    let mut scheduler = TimerScheduler::with_clock(clock.clone());
    let (tx, rx) = mpsc::channel::<Reminder>();
    let mut store = ReminderStore::load(MemoryStore::new(), DEFAULT_STORAGE_KEY);

    let reminder = store.add_at("Stretch", "+10m", local(NOW)).unwrap();
    scheduler.resync(store.items(), send_on_fire(&tx));
    assert!(scheduler.is_armed(&reminder.id));

    scheduler.cancel(&reminder.id);
    store.delete(&reminder.id).unwrap();
    scheduler.resync(store.items(), send_on_fire(&tx));

    clock.advance(HOUR);
    assert_eq!(scheduler.fire_due(), 0);
    assert!(rx.try_recv().is_err());
}

#[test]
fn corrupt_storage_loads_empty_and_recovers_on_add() {
    let storage = MemoryStore::with_value(DEFAULT_STORAGE_KEY, "{not json");
    let mut store = ReminderStore::load(storage, DEFAULT_STORAGE_KEY);
    assert!(store.is_empty());

    store.add_at("Water plants", "+1d", local(NOW)).unwrap();
    let raw = store.storage().get(DEFAULT_STORAGE_KEY).unwrap().unwrap();
    let saved: Vec<Reminder> = serde_json::from_str(&raw).unwrap();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].text, "Water plants");
}

#[test]
fn reminders_survive_a_restart() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("data").join("reminders.db");

    let added = {
        let mut store = ReminderStore::load(SqliteStore::open(&path).unwrap(), DEFAULT_STORAGE_KEY);
        store.add_at("Dentist", "2030-03-04 14:30", local(NOW)).unwrap()
    };

    let store = ReminderStore::load(SqliteStore::open(&path).unwrap(), DEFAULT_STORAGE_KEY);
    assert_eq!(store.items(), &[added.clone()]);

    // Restored reminders get their timers back
    let (tx, _rx) = mpsc::channel::<Reminder>();
    let mut scheduler = TimerScheduler::with_clock(ManualClock::new(NOW));
    assert_eq!(scheduler.resync(store.items(), send_on_fire(&tx)), 1);
    assert!(scheduler.is_armed(&added.id));
}

#[test]
fn reload_sees_writes_from_another_handle() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("reminders.db");

    let mut reader = ReminderStore::load(SqliteStore::open(&path).unwrap(), DEFAULT_STORAGE_KEY);
    let mut writer = ReminderStore::load(SqliteStore::open(&path).unwrap(), DEFAULT_STORAGE_KEY);

    assert_eq!(reader.reload(), None);
    let bins = writer.add_at("Take out bins", "+3h", local(NOW)).unwrap();
    assert_eq!(reader.reload(), Some(vec![bins]));
    assert_eq!(reader.len(), 1);
}

#[test]
fn stale_handle_keeps_reminders_written_by_another() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("reminders.db");

    let mut cli = ReminderStore::load(SqliteStore::open(&path).unwrap(), DEFAULT_STORAGE_KEY);
    let mut tui = ReminderStore::load(SqliteStore::open(&path).unwrap(), DEFAULT_STORAGE_KEY);

    let from_cli = cli.add_at("from cli", "+1h", local(NOW)).unwrap();
    let from_tui = tui.add_at("from tui", "+2h", local(NOW)).unwrap();
    assert_eq!(tui.items(), &[from_cli.clone(), from_tui.clone()]);

    // Deletes also act on what is stored
    cli.delete(&from_tui.id).unwrap();
    tui.delete("unknown").unwrap();
    let stored = ReminderStore::load(SqliteStore::open(&path).unwrap(), DEFAULT_STORAGE_KEY);
    assert_eq!(stored.items(), &[from_cli]);
}

#[test]
fn reminder_that_comes_due_before_the_next_sync_is_still_delivered() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("reminders.db");
    let clock = ManualClock::new(NOW);

    let mut watched = ReminderStore::load(SqliteStore::open(&path).unwrap(), DEFAULT_STORAGE_KEY);
    let mut watcher = Watcher::with_clock(&mut watched, clock.clone());

    clock.advance(1_000);
    let mut other = ReminderStore::load(SqliteStore::open(&path).unwrap(), DEFAULT_STORAGE_KEY);
    let soon = other.add_at("soon", "+2s", local(NOW + 1_000)).unwrap();

    clock.advance(4_000);
    watcher.sync();
    assert_eq!(watcher.due(), vec![soon]);
}
