use std::path::PathBuf;
use std::cell::RefCell;
use std::process::{Child, Command, Stdio};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::NotificationSettings;
use crate::models::Reminder;

const NOTIFICATION_TITLE: &str = "Reminder";

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("System notifications unavailable: {0}")]
    Unavailable(String),
    #[error("Notification command failed: {0}")]
    CommandFailed(String),
}

/// How a fired reminder reached the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// Shown as a desktop notification
    System,
    /// The caller must raise a blocking alert with this message
    Alert(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Backend {
    NotifySend,
    Osascript,
    /// User-configured program, called as `<program> <title> <body>`
    Custom,
}

#[derive(Debug, Clone)]
struct NotifyCommand {
    program: PathBuf,
    backend: Backend,
}

impl NotifyCommand {
    fn build(&self, title: &str, body: &str) -> Command {
        let mut command = Command::new(&self.program);
        match self.backend {
            Backend::NotifySend | Backend::Custom => {
                command.arg(title).arg(body);
            }
            Backend::Osascript => {
                command.arg("-e").arg(format!(
                    "display notification \"{}\" with title \"{}\"",
                    escape_applescript(body),
                    escape_applescript(title)
                ));
            }
        }
        command
    }
}

fn escape_applescript(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Delivers fired reminders, preferring desktop notifications
#[derive(Debug)]
pub struct Notifier {
    command: Option<NotifyCommand>,
    /// Notification processes still running, with the reminder each one shows
    pending: RefCell<Vec<(Child, Reminder)>>,
}

impl Notifier {
    /// One-time probe for desktop notification support. Never fails; when
    /// notifications are disabled or no program is found every delivery
    /// falls back to an alert.
    pub fn request_permission(settings: &NotificationSettings) -> Self {
        match probe(settings) {
            Ok(command) => {
                info!(program = %command.program.display(), "desktop notifications available");
                Self::with_command(Some(command))
            }
            Err(e) => {
                info!(reason = %e, "falling back to alerts");
                Self::alerts_only()
            }
        }
    }

    /// A notifier that always asks for a blocking alert
    pub fn alerts_only() -> Self {
        Self::with_command(None)
    }

    fn with_command(command: Option<NotifyCommand>) -> Self {
        Self {
            command,
            pending: RefCell::new(Vec::new()),
        }
    }

    pub fn has_system_notifications(&self) -> bool {
        self.command.is_some()
    }

    /// Start a desktop notification without waiting for it. When none can be
    /// started the caller gets the alert to raise instead. A notification
    /// that fails later turns up in [`take_failed`](Self::take_failed).
    pub fn deliver(&self, reminder: &Reminder) -> Delivery {
        match self.spawn_system(&reminder.text) {
            Ok(child) => {
                debug!(id = %reminder.id, "reminder handed to notification command");
                self.pending.borrow_mut().push((child, reminder.clone()));
                Delivery::System
            }
            Err(e) => {
                if self.command.is_some() {
                    warn!(id = %reminder.id, error = %e, "notification failed, using alert");
                }
                Delivery::Alert(alert_message(reminder))
            }
        }
    }

    /// Alert messages for notification processes that have exited
    /// unsuccessfully since the last call. Never blocks.
    pub fn take_failed(&self) -> Vec<String> {
        let mut failed = Vec::new();
        self.pending.borrow_mut().retain_mut(|(child, reminder)| {
            let error = match child.try_wait() {
                Ok(None) => return true,
                Ok(Some(status)) if status.success() => return false,
                Ok(Some(status)) => status.to_string(),
                Err(e) => e.to_string(),
            };
            let e = NotificationError::CommandFailed(error);
            warn!(id = %reminder.id, error = %e, "notification failed, using alert");
            failed.push(alert_message(reminder));
            false
        });
        failed
    }

    fn spawn_system(&self, body: &str) -> Result<Child, NotificationError> {
        let command = self
            .command
            .as_ref()
            .ok_or_else(|| NotificationError::Unavailable("not available".to_string()))?;

        command
            .build(NOTIFICATION_TITLE, body)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| {
                NotificationError::CommandFailed(format!("{}: {}", command.program.display(), e))
            })
    }
}

/// Text of the fallback alert for a reminder
pub fn alert_message(reminder: &Reminder) -> String {
    format!("Reminder: {}", reminder.text)
}

fn probe(settings: &NotificationSettings) -> Result<NotifyCommand, NotificationError> {
    if !settings.enabled {
        return Err(NotificationError::Unavailable("disabled in config".to_string()));
    }

    if let Some(custom) = settings.command.as_deref().filter(|c| !c.trim().is_empty()) {
        let program = which::which(custom.trim())
            .map_err(|e| NotificationError::Unavailable(format!("{}: {}", custom, e)))?;
        return Ok(NotifyCommand { program, backend: Backend::Custom });
    }

    let (name, backend) = if cfg!(target_os = "macos") {
        ("osascript", Backend::Osascript)
    } else {
        ("notify-send", Backend::NotifySend)
    };
    let program = which::which(name)
        .map_err(|e| NotificationError::Unavailable(format!("{}: {}", name, e)))?;
    Ok(NotifyCommand { program, backend })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reminder(text: &str) -> Reminder {
        Reminder::new(text.to_string(), "2030-01-01T09:00".to_string())
    }

    #[test]
    fn disabled_notifications_fall_back_to_alert() {
        let settings = NotificationSettings { enabled: false, command: None };
        let notifier = Notifier::request_permission(&settings);
        assert!(!notifier.has_system_notifications());
        assert_eq!(
            notifier.deliver(&reminder("Pay rent")),
            Delivery::Alert("Reminder: Pay rent".to_string())
        );
    }

    #[test]
    fn missing_custom_program_falls_back_to_alert() {
        let settings = NotificationSettings {
            enabled: true,
            command: Some("definitely-not-a-real-notifier-binary".to_string()),
        };
        let notifier = Notifier::request_permission(&settings);
        assert!(!notifier.has_system_notifications());
        assert!(matches!(notifier.deliver(&reminder("x")), Delivery::Alert(_)));
    }

    fn custom(program: PathBuf) -> Notifier {
        Notifier::with_command(Some(NotifyCommand {
            program,
            backend: Backend::Custom,
        }))
    }

    /// Poll until every notification process has been reaped
    fn settle(notifier: &Notifier) -> Vec<String> {
        let mut failed = Vec::new();
        for _ in 0..250 {
            failed.extend(notifier.take_failed());
            if notifier.pending.borrow().is_empty() {
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(20));
        }
        failed
    }

    #[test]
    fn unstartable_command_falls_back_to_alert() {
        let notifier = custom(PathBuf::from("/nonexistent/notifier"));
        assert_eq!(
            notifier.deliver(&reminder("Call mom")),
            Delivery::Alert("Reminder: Call mom".to_string())
        );
        assert!(notifier.pending.borrow().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn command_exiting_with_failure_turns_into_alert() {
        let notifier = custom(which::which("false").unwrap());
        assert_eq!(notifier.deliver(&reminder("Call mom")), Delivery::System);
        assert_eq!(settle(&notifier), vec!["Reminder: Call mom".to_string()]);
        assert!(notifier.take_failed().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn successful_command_raises_no_alert() {
        let notifier = custom(which::which("true").unwrap());
        assert_eq!(notifier.deliver(&reminder("Stretch")), Delivery::System);
        assert!(settle(&notifier).is_empty());
    }

    #[test]
    fn applescript_strings_are_escaped() {
        assert_eq!(escape_applescript(r#"say "hi" \ bye"#), r#"say \"hi\" \\ bye"#);
    }
}
