//! Terminal stand-in for OS notifications: a banner on stderr.

use std::io::{BufRead, IsTerminal, Write};

use studybell_core::dispatch::{NotificationPermission, PlatformNotification, PlatformNotifier};
use studybell_core::error::NotifyError;

/// Every notification gets its own banner. Alert text shares the terminal
/// through stdout, so an earlier banner is never redrawn in place.
pub struct TerminalNotifier {
    permission: NotificationPermission,
    out: Box<dyn Write + Send>,
    interactive: bool,
}

impl TerminalNotifier {
    pub fn new(permission: NotificationPermission) -> Self {
        Self {
            permission,
            out: Box::new(std::io::stderr()),
            interactive: std::io::stdin().is_terminal(),
        }
    }

    #[cfg(test)]
    fn with_writer(permission: NotificationPermission, out: Box<dyn Write + Send>) -> Self {
        Self {
            permission,
            out,
            interactive: false,
        }
    }

    fn banner(n: &PlatformNotification) -> Vec<String> {
        let width = n
            .title
            .chars()
            .count()
            .max(n.body.chars().count())
            + 2;
        let rule = "─".repeat(width);
        vec![
            format!("┌{rule}┐"),
            format!("│ {:<w$} │", n.title, w = width - 2),
            format!("│ {:<w$} │", n.body, w = width - 2),
            format!("└{rule}┘"),
        ]
    }
}

impl PlatformNotifier for TerminalNotifier {
    fn permission(&self) -> NotificationPermission {
        self.permission
    }

    /// Ask on the terminal. Without a terminal the answer stays undecided.
    fn request_permission(&mut self) -> NotificationPermission {
        if !self.interactive {
            return self.permission;
        }
        eprint!("Show reminder banners in this terminal? [y/N] ");
        let mut line = String::new();
        self.permission = match std::io::stdin().lock().read_line(&mut line) {
            Ok(_) if matches!(line.trim(), "y" | "Y" | "yes") => NotificationPermission::Granted,
            Ok(_) => NotificationPermission::Denied,
            Err(_) => NotificationPermission::Default,
        };
        self.permission
    }

    fn notify(&mut self, notification: &PlatformNotification) -> Result<(), NotifyError> {
        if self.permission != NotificationPermission::Granted {
            return Err(NotifyError::NotPermitted);
        }
        let mut text = String::new();
        for line in Self::banner(notification) {
            text.push_str(&line);
            text.push('\n');
        }
        self.out
            .write_all(text.as_bytes())
            .and_then(|()| self.out.flush())
            .map_err(|e| NotifyError::DeliveryFailed(e.to_string()))?;
        Ok(())
    }
}
