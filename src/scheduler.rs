//! One-shot reminder timers driven by the host event loop.
//!
//! The scheduler never sleeps or spawns anything. The event loop asks for
//! [`TimerScheduler::next_deadline`] to bound its poll timeout and calls
//! [`TimerScheduler::fire_due`] after each wake-up; a timer fires on the first
//! call made at or after its deadline.

use std::collections::HashMap;
use std::fmt;
use std::sync::mpsc::Sender;
use std::time::Duration;

use tracing::{debug, trace, warn};

use crate::clock::{Clock, SystemClock};
use crate::models::Reminder;
use crate::utils;

pub type FireCallback = Box<dyn FnOnce()>;

/// Lifecycle of a single timer. Only `Armed` timers live in the scheduler;
/// both other states are terminal and the entry is gone once reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    Armed,
    Fired,
    Cancelled,
}

struct Timer {
    deadline: i64,
    on_fire: FireCallback,
}

impl Timer {
    fn fire(self) -> TimerState {
        (self.on_fire)();
        TimerState::Fired
    }

    fn cancel(self) -> TimerState {
        TimerState::Cancelled
    }
}

/// Delay until `time`, or `None` when no timer should be armed.
///
/// An unparseable time has no meaningful delay and is treated the same as a
/// time that has already passed.
pub fn delay_millis(time: &str, now_millis: i64) -> Option<i64> {
    let due = utils::timestamp_millis(time)?;
    let delay = due.checked_sub(now_millis)?;
    (delay > 0).then_some(delay)
}

/// Callback factory for [`TimerScheduler::resync`] that sends each fired
/// reminder down `tx`, leaving delivery to whoever drains the channel
pub fn send_on_fire(tx: &Sender<Reminder>) -> impl FnMut(&Reminder) -> FireCallback + '_ {
    move |reminder: &Reminder| -> FireCallback {
        let tx = tx.clone();
        let reminder = reminder.clone();
        Box::new(move || {
            if tx.send(reminder).is_err() {
                warn!("fired reminder dropped, nobody is listening");
            }
        })
    }
}

pub struct TimerScheduler<C: Clock = SystemClock> {
    clock: C,
    timers: HashMap<String, Timer>,
}

impl TimerScheduler<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for TimerScheduler<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> TimerScheduler<C> {
    pub fn with_clock(clock: C) -> Self {
        Self {
            clock,
            timers: HashMap::new(),
        }
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Replace any timer for `id` with a new one firing at `time`.
    ///
    /// Returns whether a timer was armed; past, present and unparseable
    /// times arm nothing.
    pub fn schedule<F>(&mut self, id: &str, time: &str, on_fire: F) -> bool
    where
        F: FnOnce() + 'static,
    {
        self.cancel(id);

        let now = self.clock.now_millis();
        let Some(delay) = delay_millis(time, now) else {
            trace!(id, time, "not arming timer for due or invalid time");
            return false;
        };

        self.timers.insert(
            id.to_string(),
            Timer {
                deadline: now + delay,
                on_fire: Box::new(on_fire),
            },
        );
        debug!(id, delay_ms = delay, "timer armed");
        true
    }

    /// Cancel the timer for `id`. Returns `false` if none was armed.
    pub fn cancel(&mut self, id: &str) -> bool {
        match self.timers.remove(id) {
            Some(timer) => {
                let state = timer.cancel();
                debug!(id, ?state, "timer cancelled");
                true
            }
            None => false,
        }
    }

    pub fn cancel_all(&mut self) {
        let ids: Vec<String> = self.timers.keys().cloned().collect();
        for id in ids {
            self.cancel(&id);
        }
    }

    /// Cancel everything, then schedule every reminder with a callback built
    /// by `on_fire_factory`. Returns the number of armed timers.
    pub fn resync<'a, I, M, F>(&mut self, reminders: I, mut on_fire_factory: M) -> usize
    where
        I: IntoIterator<Item = &'a Reminder>,
        M: FnMut(&Reminder) -> F,
        F: FnOnce() + 'static,
    {
        self.cancel_all();
        for reminder in reminders {
            self.schedule(&reminder.id, &reminder.time, on_fire_factory(reminder));
        }
        debug!(armed = self.timers.len(), "timers resynced");
        self.timers.len()
    }

    /// Run the callback right away for each reminder whose time fell in
    /// `since..=now`. For reminders first seen after their time came, which
    /// `resync` would no longer arm. Returns the number fired.
    pub fn fire_missed<'a, I, M, F>(&self, reminders: I, since: i64, mut on_fire_factory: M) -> usize
    where
        I: IntoIterator<Item = &'a Reminder>,
        M: FnMut(&Reminder) -> F,
        F: FnOnce(),
    {
        let now = self.clock.now_millis();
        let mut fired = 0;
        for reminder in reminders {
            let due = utils::timestamp_millis(&reminder.time);
            if due.is_some_and(|due| (since..=now).contains(&due)) {
                debug!(id = %reminder.id, "firing reminder that came due before it was seen");
                on_fire_factory(reminder)();
                fired += 1;
            }
        }
        fired
    }

    /// Fire every timer whose deadline has been reached, earliest first.
    /// Each timer leaves the scheduler before its callback runs.
    pub fn fire_due(&mut self) -> usize {
        let now = self.clock.now_millis();
        let mut due: Vec<(i64, String)> = self
            .timers
            .iter()
            .filter(|(_, timer)| timer.deadline <= now)
            .map(|(id, timer)| (timer.deadline, id.clone()))
            .collect();
        due.sort();

        let mut fired = 0;
        for (_, id) in due {
            if let Some(timer) = self.timers.remove(&id) {
                let state = timer.fire();
                debug!(id, ?state, "timer fired");
                fired += 1;
            }
        }
        fired
    }

    /// Earliest armed deadline, in epoch millis
    pub fn next_deadline(&self) -> Option<i64> {
        self.timers.values().map(|timer| timer.deadline).min()
    }

    /// Time left until the earliest deadline, zero if it has already passed
    pub fn time_until_next(&self) -> Option<Duration> {
        let now = self.clock.now_millis();
        self.next_deadline()
            .map(|deadline| Duration::from_millis(deadline.saturating_sub(now).max(0) as u64))
    }

    pub fn is_armed(&self, id: &str) -> bool {
        self.timers.contains_key(id)
    }

    pub fn armed_count(&self) -> usize {
        self.timers.len()
    }
}

impl<C: Clock> fmt::Debug for TimerScheduler<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut deadlines: Vec<(&String, i64)> = self
            .timers
            .iter()
            .map(|(id, timer)| (id, timer.deadline))
            .collect();
        deadlines.sort_by_key(|(_, deadline)| *deadline);
        f.debug_struct("TimerScheduler")
            .field("timers", &deadlines)
            .finish()
    }
}
