//! Alarm lifecycle.
//!
//! The firing flag is persisted independently of the timer checkpoint so it
//! survives a full reload even if the checkpoint was already consumed: if the
//! segment elapsed while the tab was closed, reopening the app still shows
//! the firing state. The flag is keyed to the completion event that raised
//! it, so a reset while firing cannot leave an ambiguous banner.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CoreError, StoreError};

/// Durable alarm state. Cleared only by an explicit stop.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlarmFlag {
    pub firing: bool,
    /// Completion event that raised the alarm.
    #[serde(default)]
    pub completion_id: Option<Uuid>,
}

/// Durable storage for the alarm flag, independent of the checkpoint record.
pub trait AlarmFlagStore: Send + Sync {
    fn load_alarm(&self) -> Result<AlarmFlag, StoreError>;
    fn save_alarm(&self, flag: &AlarmFlag) -> Result<(), StoreError>;
}

/// Notification trigger contract. Delivery mechanics are the collaborator's
/// concern; the timer only ever invokes this interface.
pub trait Notifier: Send + Sync {
    fn show_timer_notification(&self, title: &str, body: &str) -> Result<(), CoreError>;

    fn request_notification_permission(&self) -> Result<bool, CoreError> {
        Ok(true)
    }
}

/// Notifier that records the trigger in the log. Used by the CLI, where no
/// notification channel is wired up.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn show_timer_notification(&self, title: &str, body: &str) -> Result<(), CoreError> {
        tracing::info!(title, body, "timer notification");
        Ok(())
    }
}

/// Tracks the binary "alarm firing" flag and the notification trigger.
pub struct AlarmManager {
    store: Arc<dyn AlarmFlagStore>,
    notifier: Arc<dyn Notifier>,
}

impl AlarmManager {
    pub fn new(store: Arc<dyn AlarmFlagStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self { store, notifier }
    }

    /// Whether the alarm is currently firing. A read failure degrades to
    /// "not firing" rather than crashing the caller.
    pub fn is_alarm_active(&self) -> bool {
        match self.store.load_alarm() {
            Ok(flag) => flag.firing,
            Err(e) => {
                tracing::warn!("alarm flag read failed: {e}");
                false
            }
        }
    }

    pub fn current(&self) -> AlarmFlag {
        self.store.load_alarm().unwrap_or_default()
    }

    /// Raise the alarm for a completion. Idempotent: raising for the same
    /// completion again is a no-op; a newer completion takes over the flag.
    pub fn start_alarm(&self, completion_id: Uuid) -> Result<(), StoreError> {
        let current = self.store.load_alarm().unwrap_or_default();
        if current.firing && current.completion_id == Some(completion_id) {
            return Ok(());
        }
        self.store.save_alarm(&AlarmFlag {
            firing: true,
            completion_id: Some(completion_id),
        })
    }

    /// Clear the alarm. Idempotent.
    pub fn stop_alarm(&self) -> Result<(), StoreError> {
        let current = self.store.load_alarm().unwrap_or_default();
        if !current.firing && current.completion_id.is_none() {
            return Ok(());
        }
        self.store.save_alarm(&AlarmFlag::default())
    }

    pub fn notify(&self, title: &str, body: &str) -> Result<(), CoreError> {
        self.notifier.show_timer_notification(title, body)
    }

    pub fn request_notification_permission(&self) -> Result<bool, CoreError> {
        self.notifier.request_notification_permission()
    }
}
