pub mod cli;
pub mod clock;
pub mod config;
pub mod logging;
pub mod models;
pub mod notify;
pub mod scheduler;
pub mod storage;
pub mod store;
pub mod tui;
pub mod utils;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use models::Reminder;
pub use notify::{Delivery, Notifier};
pub use scheduler::TimerScheduler;
pub use storage::{KeyValueStore, MemoryStore, SqliteStore};
pub use store::{Partition, ReminderStore, StoreError, ValidationError};
pub use utils::Profile;
