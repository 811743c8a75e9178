//! Fire-and-forget desktop notifications.
//!
//! Delivery failures never reach the frame loop: [`dispatch`] logs them and
//! moves on.

use std::process::{Command, Stdio};
use thiserror::Error;

use crate::storage::{NotificationBackend, NotificationsConfig};

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("Notifications are not supported on this platform")]
    Unsupported,

    #[error("Failed to launch {program}: {source}")]
    Spawn {
        program: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {status}")]
    Failed { program: &'static str, status: String },
}

/// A single notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub message: String,
    pub timeout_secs: u32,
}

impl Notification {
    pub fn new(title: impl Into<String>, message: impl Into<String>, timeout_secs: u32) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            timeout_secs,
        }
    }

    pub fn break_started(timeout_secs: u32) -> Self {
        Self::new("20-20-20 Rule", "Look 20 feet away for 20 seconds!", timeout_secs)
    }

    pub fn break_ended(timeout_secs: u32) -> Self {
        Self::new("Break Over", "You can return to the screen", timeout_secs)
    }
}

/// Notification sink.
pub trait Notifier: Send {
    fn notify(&self, notification: &Notification) -> Result<(), NotifyError>;
}

/// Native notifications through `notify-send` (Linux) or `osascript` (macOS).
#[derive(Debug, Default, Clone, Copy)]
pub struct DesktopNotifier;

impl DesktopNotifier {
    fn command(notification: &Notification) -> Result<(&'static str, Command), NotifyError> {
        if cfg!(target_os = "linux") {
            let mut cmd = Command::new("notify-send");
            cmd.arg("--app-name=LookAlive")
                .arg(format!("--expire-time={}", notification.timeout_secs.saturating_mul(1000)))
                .arg(&notification.title)
                .arg(&notification.message);
            Ok(("notify-send", cmd))
        } else if cfg!(target_os = "macos") {
            let script = format!(
                "display notification {} with title {}",
                applescript_string(&notification.message),
                applescript_string(&notification.title)
            );
            let mut cmd = Command::new("osascript");
            cmd.arg("-e").arg(script);
            Ok(("osascript", cmd))
        } else {
            Err(NotifyError::Unsupported)
        }
    }
}

fn applescript_string(s: &str) -> String {
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}

impl Notifier for DesktopNotifier {
    fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        let (program, cmd) = Self::command(notification)?;
        spawn_detached(program, cmd)
    }
}

/// Launch `cmd` without waiting for it. A reaper thread collects the exit
/// status and logs non-zero exits.
fn spawn_detached(program: &'static str, mut cmd: Command) -> Result<(), NotifyError> {
    let mut child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|source| NotifyError::Spawn { program, source })?;

    std::thread::spawn(move || match child.wait() {
        Ok(status) if status.success() => {}
        Ok(status) => {
            let err = NotifyError::Failed {
                program,
                status: status.to_string(),
            };
            tracing::warn!("notification not delivered: {err}");
        }
        Err(e) => tracing::warn!("failed to wait for {program}: {e}"),
    });
    Ok(())
}

/// Writes notifications to the log instead of the desktop.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        tracing::info!(title = %notification.title, "{}", notification.message);
        Ok(())
    }
}

/// Notifier selected by configuration, or `None` when disabled.
pub fn from_config(config: &NotificationsConfig) -> Option<Box<dyn Notifier>> {
    if !config.enabled {
        return None;
    }
    Some(match config.backend {
        NotificationBackend::Desktop => Box::new(DesktopNotifier),
        NotificationBackend::Log => Box::new(LogNotifier),
    })
}

/// Send a notification, logging instead of failing.
///
/// Returns whether it was delivered.
pub fn dispatch(notifier: &dyn Notifier, notification: &Notification) -> bool {
    match notifier.notify(notification) {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!("notification '{}' not delivered: {e}", notification.title);
            false
        }
    }
}
