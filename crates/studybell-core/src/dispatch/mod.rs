//! Alert fan-out.
//!
//! Every alert goes to three independent sinks: the active-alert slot the UI
//! renders, the alarm player, and the platform notifier. A failure in one
//! sink never stops the others.

mod slot;

use std::panic::{catch_unwind, AssertUnwindSafe};

use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

pub use slot::AlertSlot;

use crate::audio::AlarmStyle;
use crate::error::NotifyError;
use crate::reminder::AlertEvent;

/// Plays the audible part of an alert. Fire-and-forget.
pub trait AlarmPlayer: Send {
    fn play_alarm(&mut self, style: AlarmStyle);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationPermission {
    /// Not asked yet.
    #[default]
    Default,
    Granted,
    Denied,
    /// The platform has no notification support.
    Unsupported,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformNotification {
    pub title: String,
    pub body: String,
    /// Platforms coalesce notifications that share a tag.
    pub tag: String,
    pub icon: Option<String>,
}

/// OS-level notification surface.
pub trait PlatformNotifier: Send {
    /// Current permission, without prompting.
    fn permission(&self) -> NotificationPermission;

    /// Prompt the user. Called at most once per session by the dispatcher.
    fn request_permission(&mut self) -> NotificationPermission;

    fn notify(&mut self, notification: &PlatformNotification) -> Result<(), NotifyError>;
}

pub struct AlertDispatcher {
    slot: AlertSlot,
    player: Box<dyn AlarmPlayer>,
    notifier: Box<dyn PlatformNotifier>,
    permission: NotificationPermission,
    permission_requested: bool,
    icon: Option<String>,
}

impl AlertDispatcher {
    pub fn new(player: Box<dyn AlarmPlayer>, notifier: Box<dyn PlatformNotifier>) -> Self {
        let permission = notifier.permission();
        Self {
            slot: AlertSlot::default(),
            player,
            notifier,
            permission,
            permission_requested: false,
            icon: None,
        }
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    /// Handle to the active-alert slot.
    pub fn slot(&self) -> AlertSlot {
        self.slot.clone()
    }

    pub fn permission(&self) -> NotificationPermission {
        self.permission
    }

    /// Ask for notification permission once, if still undecided.
    ///
    /// Later calls return the cached answer; a denial is never re-prompted.
    pub fn init_permission(&mut self) -> NotificationPermission {
        if self.permission == NotificationPermission::Default && !self.permission_requested {
            self.permission_requested = true;
            self.permission = self.notifier.request_permission();
            debug!(permission = ?self.permission, "notification permission decided");
        }
        self.permission
    }

    /// Deliver `event` to all three sinks. A failing sound sink does not
    /// keep the notification from going out.
    pub fn dispatch(&mut self, event: &AlertEvent, style: AlarmStyle) {
        self.show_visual_alert(event.clone());
        if catch_unwind(AssertUnwindSafe(|| self.play_sound(style))).is_err() {
            error!(tag = %event.dedup_tag, "alarm player panicked");
        }
        self.request_platform_notification(&event.title, &event.message, &event.dedup_tag);
    }

    /// Replace the active alert.
    pub fn show_visual_alert(&self, event: AlertEvent) {
        self.slot.show(event);
    }

    /// Clear the active alert. Sound already playing is left alone.
    pub fn dismiss(&self) {
        self.slot.dismiss();
    }

    pub fn active_alert(&self) -> Option<AlertEvent> {
        self.slot.current()
    }

    pub fn play_sound(&mut self, style: AlarmStyle) {
        self.player.play_alarm(style);
    }

    /// Returns true if the notification was handed to the platform.
    pub fn request_platform_notification(&mut self, title: &str, body: &str, tag: &str) -> bool {
        if self.permission != NotificationPermission::Granted {
            debug!(tag, permission = ?self.permission, "platform notification skipped");
            return false;
        }
        let notification = PlatformNotification {
            title: title.to_string(),
            body: body.to_string(),
            tag: tag.to_string(),
            icon: self.icon.clone(),
        };
        match self.notifier.notify(&notification) {
            Ok(()) => true,
            Err(e) => {
                warn!(tag, error = %e, "platform notification failed");
                false
            }
        }
    }
}
