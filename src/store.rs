use chrono::{DateTime, Local};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::models::Reminder;
use crate::storage::{KeyValueStore, StorageError};
use crate::utils;

/// Storage key used when none is configured
pub const DEFAULT_STORAGE_KEY: &str = "reminders";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Reminder text is required")]
    EmptyText,
    #[error("Reminder time is required")]
    MissingTime,
    #[error("Invalid time '{0}' (use YYYY-MM-DD HH:MM or +10m)")]
    InvalidTime(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Reminders split around an instant, each side ordered by time ascending
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Partition {
    pub upcoming: Vec<Reminder>,
    pub past: Vec<Reminder>,
}

/// Check raw add input. Returns the trimmed text and the canonical time.
pub fn validate_input(
    text: &str,
    time: &str,
    now: DateTime<Local>,
) -> Result<(String, String), ValidationError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ValidationError::EmptyText);
    }

    let time = time.trim();
    if time.is_empty() {
        return Err(ValidationError::MissingTime);
    }
    let parsed = utils::parse_time_input(time, now)
        .ok_or_else(|| ValidationError::InvalidTime(time.to_string()))?;

    Ok((text.to_string(), utils::canonical_time(parsed)))
}

/// The ordered reminder collection, mirrored to one storage key
pub struct ReminderStore<S: KeyValueStore> {
    storage: S,
    key: String,
    items: Vec<Reminder>,
}

impl<S: KeyValueStore> ReminderStore<S> {
    /// Read the persisted collection. Never fails: missing or unreadable
    /// data yields an empty collection.
    pub fn load(storage: S, key: impl Into<String>) -> Self {
        let key = key.into();
        let items = read_items(&storage, &key);
        info!(count = items.len(), key = %key, "reminders loaded");
        Self { storage, key, items }
    }

    /// Re-read storage, picking up changes written by another process.
    /// Returns the reminders not seen before when the collection changed,
    /// `None` when it did not.
    pub fn reload(&mut self) -> Option<Vec<Reminder>> {
        let items = read_items(&self.storage, &self.key);
        if items == self.items {
            return None;
        }
        debug!(before = self.items.len(), after = items.len(), "reminders changed on disk");
        let added = items
            .iter()
            .filter(|r| !self.items.iter().any(|known| known.id == r.id))
            .cloned()
            .collect();
        self.items = items;
        Some(added)
    }

    /// Like [`reload`](Self::reload), but skips the read when storage
    /// reports no outside writes
    pub fn refresh(&mut self) -> Option<Vec<Reminder>> {
        match self.storage.changed() {
            Ok(false) => None,
            Ok(true) => self.reload(),
            Err(e) => {
                warn!(error = %e, "could not check storage for changes");
                self.reload()
            }
        }
    }

    /// Write the whole collection under the storage key
    pub fn persist(&mut self) -> Result<(), StorageError> {
        self.storage.set(&self.key, &to_json(&self.items))?;
        debug!(count = self.items.len(), "reminders persisted");
        Ok(())
    }

    pub fn add(&mut self, text: &str, time: &str) -> Result<Reminder, StoreError> {
        self.add_at(text, time, Local::now())
    }

    /// Validate and append a new reminder. Relative times are resolved
    /// against `now`.
    ///
    /// The append happens against what is in storage right now, so reminders
    /// written by other processes are kept. Nothing changes if the write fails.
    pub fn add_at(
        &mut self,
        text: &str,
        time: &str,
        now: DateTime<Local>,
    ) -> Result<Reminder, StoreError> {
        let (text, time) = validate_input(text, time, now)?;
        let reminder = Reminder::new(text, time);

        let items = self.storage.update(&self.key, |current| {
            let mut items = parse_items(current.as_deref());
            items.push(reminder.clone());
            (Some(to_json(&items)), items)
        })?;
        self.items = items;

        info!(id = %reminder.id, time = %reminder.time, "reminder added");
        Ok(reminder)
    }

    /// Remove the reminder with `id` from storage and return it. An unknown
    /// id is not an error and writes nothing.
    pub fn delete(&mut self, id: &str) -> Result<Option<Reminder>, StorageError> {
        let (removed, items) = self.storage.update(&self.key, |current| {
            let mut items = parse_items(current.as_deref());
            match items.iter().position(|r| r.id == id) {
                Some(index) => {
                    let removed = items.remove(index);
                    (Some(to_json(&items)), (Some(removed), items))
                }
                None => (None, (None, items)),
            }
        })?;
        self.items = items;

        if removed.is_some() {
            info!(id, "reminder deleted");
        }
        Ok(removed)
    }

    /// Split into upcoming (time >= now) and past (time < now or invalid)
    pub fn partition(&self, now_millis: i64) -> Partition {
        let (mut upcoming, mut past): (Vec<Reminder>, Vec<Reminder>) = self
            .items
            .iter()
            .cloned()
            .partition(|r| r.is_upcoming(now_millis));

        // Invalid times sort after everything else
        let by_time = |r: &Reminder| (r.due_at_millis().is_none(), r.due_at_millis());
        upcoming.sort_by_key(by_time);
        past.sort_by_key(by_time);
        Partition { upcoming, past }
    }

    pub fn get(&self, id: &str) -> Option<&Reminder> {
        self.items.iter().find(|r| r.id == id)
    }

    pub fn items(&self) -> &[Reminder] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    #[cfg(test)]
    pub(crate) fn into_storage(self) -> S {
        self.storage
    }
}

fn read_items<S: KeyValueStore>(storage: &S, key: &str) -> Vec<Reminder> {
    match storage.get(key) {
        Ok(raw) => parse_items(raw.as_deref()),
        Err(e) => {
            warn!(error = %e, "failed to read stored reminders, starting empty");
            Vec::new()
        }
    }
}

fn parse_items(raw: Option<&str>) -> Vec<Reminder> {
    let Some(raw) = raw else {
        return Vec::new();
    };
    match serde_json::from_str(raw) {
        Ok(items) => items,
        Err(e) => {
            warn!(error = %e, "discarding malformed stored reminders");
            Vec::new()
        }
    }
}

fn to_json(items: &[Reminder]) -> String {
    // Serializing plain string fields cannot fail
    serde_json::to_string(items).unwrap_or_else(|_| "[]".to_string())
}


