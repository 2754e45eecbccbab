use clap::{Parser, Subcommand};
use std::fmt::Write as _;
use std::io::Write as _;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

use crate::clock::{Clock, SystemClock};
use crate::models::Reminder;
use crate::notify::{Delivery, Notifier};
use crate::scheduler::{send_on_fire, TimerScheduler};
use crate::storage::{KeyValueStore, StorageError};
use crate::store::{Partition, ReminderStore, StoreError};
use crate::utils;

/// Longest `watch` sleeps between checks for reminders added elsewhere
const WATCH_POLL_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Parser)]
#[command(name = "rmd")]
#[command(about = "A terminal reminder list with desktop notifications")]
#[command(version)]
pub struct Cli {
    /// Custom config file path
    #[arg(short, long)]
    pub config: Option<String>,

    /// Use development mode (uses separate dev config/storage)
    #[arg(long)]
    pub dev: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Launch interactive TUI (default if no subcommand)
    Tui,
    /// Add a reminder
    Add {
        /// What to be reminded of
        text: String,
        /// When: YYYY-MM-DD HH:MM, YYYY-MM-DDTHH:MM, RFC 3339, or +10m / +2h / +1d
        #[arg(long)]
        at: String,
    },
    /// List upcoming and past reminders
    List,
    /// Delete a reminder by ID
    Delete {
        /// Reminder ID (as shown by `list`)
        id: String,
    },
    /// Stay in the foreground and deliver reminders as they come due
    Watch,
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error("{0}")]
    StoreError(#[from] StoreError),
    #[error("Storage error: {0}")]
    StorageError(#[from] StorageError),
    #[error("No reminder with ID {0}")]
    NotFound(String),
}

/// Handle the add command
pub fn handle_add<S: KeyValueStore>(
    text: String,
    at: String,
    store: &mut ReminderStore<S>,
    time_format: &str,
) -> Result<Reminder, CliError> {
    let reminder = store.add(&text, &at)?;
    println!(
        "Reminder set for {} (ID: {})",
        utils::format_time(&reminder.time, time_format),
        reminder.id
    );
    Ok(reminder)
}

/// Handle the list command
pub fn handle_list<S: KeyValueStore>(store: &ReminderStore<S>, time_format: &str) {
    let now = chrono::Utc::now().timestamp_millis();
    print!("{}", format_partition(&store.partition(now), time_format));
}

/// Handle the delete command
pub fn handle_delete<S: KeyValueStore>(
    id: String,
    store: &mut ReminderStore<S>,
) -> Result<Reminder, CliError> {
    match store.delete(&id)? {
        Some(reminder) => {
            println!("Deleted: {}", reminder.text);
            Ok(reminder)
        }
        None => Err(CliError::NotFound(id)),
    }
}

/// Keeps a scheduler in step with storage that other processes also write
pub struct Watcher<'a, S: KeyValueStore, C: Clock = SystemClock> {
    store: &'a mut ReminderStore<S>,
    scheduler: TimerScheduler<C>,
    tx: Sender<Reminder>,
    rx: Receiver<Reminder>,
    /// When storage was last read, in epoch millis
    last_sync: i64,
}

impl<'a, S: KeyValueStore> Watcher<'a, S> {
    pub fn new(store: &'a mut ReminderStore<S>) -> Self {
        Self::with_clock(store, SystemClock)
    }
}

impl<'a, S: KeyValueStore, C: Clock> Watcher<'a, S, C> {
    pub fn with_clock(store: &'a mut ReminderStore<S>, clock: C) -> Self {
        let (tx, rx) = mpsc::channel();
        let mut scheduler = TimerScheduler::with_clock(clock);
        scheduler.resync(store.items(), send_on_fire(&tx));
        let last_sync = scheduler.clock().now_millis();
        Self {
            store,
            scheduler,
            tx,
            rx,
            last_sync,
        }
    }

    pub fn armed_count(&self) -> usize {
        self.scheduler.armed_count()
    }

    /// Pick up outside changes. Reminders that appeared and came due since
    /// the previous sync fire immediately. Returns whether anything changed.
    pub fn sync(&mut self) -> bool {
        let now = self.scheduler.clock().now_millis();
        let since = std::mem::replace(&mut self.last_sync, now);
        let Some(added) = self.store.refresh() else {
            return false;
        };
        let armed = self.scheduler.resync(self.store.items(), send_on_fire(&self.tx));
        let caught_up = self.scheduler.fire_missed(&added, since, send_on_fire(&self.tx));
        info!(armed, caught_up, "storage changed, timers resynced");
        true
    }

    /// Fire what is due and return the reminders to deliver
    pub fn due(&mut self) -> Vec<Reminder> {
        self.scheduler.fire_due();
        self.rx.try_iter().collect()
    }

    /// How long to sleep before the next pass
    pub fn wait_time(&self) -> Duration {
        self.scheduler
            .time_until_next()
            .map_or(WATCH_POLL_INTERVAL, |next| next.min(WATCH_POLL_INTERVAL))
    }
}

/// Handle the watch command. Runs until the process is interrupted.
pub fn handle_watch<S: KeyValueStore>(
    store: &mut ReminderStore<S>,
    notifier: &Notifier,
) -> Result<(), CliError> {
    let mut watcher = Watcher::new(store);
    let armed = watcher.armed_count();
    println!("Watching {} pending reminder(s). Press Ctrl+C to stop.", armed);
    info!(armed, "watch started");

    loop {
        thread::sleep(watcher.wait_time());
        watcher.sync();

        for reminder in watcher.due() {
            match notifier.deliver(&reminder) {
                Delivery::System => println!("Notified: {}", reminder.text),
                Delivery::Alert(message) => print_alert(&message),
            }
        }
        for message in notifier.take_failed() {
            print_alert(&message);
        }
        let _ = std::io::stdout().flush();
    }
}

fn print_alert(message: &str) {
    // Terminal bell, then the alert itself
    print!("\x07");
    println!("{}", message);
}

/// Render both partitions as plain text
pub fn format_partition(partition: &Partition, time_format: &str) -> String {
    let mut out = String::new();
    for (heading, reminders) in [("Upcoming", &partition.upcoming), ("Past", &partition.past)] {
        if heading == "Past" && reminders.is_empty() {
            continue;
        }
        let _ = writeln!(out, "{}", heading);
        if reminders.is_empty() {
            let _ = writeln!(out, "  No reminders.");
        }
        for reminder in reminders.iter() {
            let _ = writeln!(
                out,
                "  {} — {}  [{}]",
                reminder.text,
                utils::format_time(&reminder.time, time_format),
                reminder.id
            );
        }
    }
    out
}


