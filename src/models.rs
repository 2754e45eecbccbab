use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::utils;

/// A single reminder as persisted in durable storage.
///
/// `time` is kept as the stored string; it is only interpreted when a
/// timestamp is needed, so records written with an unparseable time survive
/// a load and simply never arm a timer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reminder {
    pub id: String,
    pub text: String,
    pub time: String,
}

impl Reminder {
    pub fn new(text: String, time: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            text,
            time,
        }
    }

    /// Target instant in milliseconds since the epoch, `None` if `time` does not parse
    pub fn due_at_millis(&self) -> Option<i64> {
        utils::timestamp_millis(&self.time)
    }

    /// Whether the reminder is still ahead of `now_millis`.
    /// Reminders without a valid time are never upcoming.
    pub fn is_upcoming(&self, now_millis: i64) -> bool {
        self.due_at_millis().is_some_and(|due| due >= now_millis)
    }
}


