use log::Level;
use serde::Serialize;
use std::time::{Duration, Instant};

/// How long a toast stays fully visible
pub const DISPLAY_DURATION: Duration = Duration::from_millis(4000);

/// Length of the slide-in and slide-out transitions
pub const TRANSITION_DURATION: Duration = Duration::from_millis(300);

/// Notification severity; picks the log level and the toast colour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Success,
    Error,
    Warning,
    Info,
}

impl Severity {
    pub fn log_level(&self) -> Level {
        match self {
            Severity::Success | Severity::Info => Level::Info,
            Severity::Warning => Level::Warn,
            Severity::Error => Level::Error,
        }
    }

    /// Prefix used on the diagnostic console
    pub fn label(&self) -> &'static str {
        match self {
            Severity::Success => "SUCCESS",
            Severity::Error => "ERROR",
            Severity::Warning => "WARNING",
            Severity::Info => "INFO",
        }
    }

    /// Start and end colours of the toast background gradient
    pub fn gradient(&self) -> (&'static str, &'static str) {
        match self {
            Severity::Success => ("#4CAF50", "#45a049"),
            Severity::Error => ("#f44336", "#d32f2f"),
            Severity::Warning => ("#ff9800", "#f57c00"),
            Severity::Info => ("#2196F3", "#1976D2"),
        }
    }
}

/// Fixed-position box style shared by all toasts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ToastStyle {
    pub top_px: u32,
    pub right_px: u32,
    pub max_width_px: u32,
    pub padding: (u32, u32),
    pub border_radius_px: u32,
    pub z_index: u32,
}

pub const TOAST_STYLE: ToastStyle = ToastStyle {
    top_px: 20,
    right_px: 20,
    max_width_px: 300,
    padding: (15, 20),
    border_radius_px: 8,
    z_index: 1001,
};

/// Where a toast is in its lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastPhase {
    Entering,
    Visible,
    Leaving,
    Expired,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Toast {
    pub id: u64,
    pub message: String,
    pub severity: Severity,
    pub shown_at: Instant,
}

impl Toast {
    pub fn phase(&self, now: Instant) -> ToastPhase {
        let age = now.saturating_duration_since(self.shown_at);
        if age < TRANSITION_DURATION {
            ToastPhase::Entering
        } else if age < DISPLAY_DURATION {
            ToastPhase::Visible
        } else if age < DISPLAY_DURATION + TRANSITION_DURATION {
            ToastPhase::Leaving
        } else {
            ToastPhase::Expired
        }
    }

    /// Instant after which the toast is gone
    pub fn removed_at(&self) -> Instant {
        self.shown_at + DISPLAY_DURATION + TRANSITION_DURATION
    }

    /// CSS for the toast element, background picked by severity
    pub fn css(&self) -> String {
        let (from, to) = self.severity.gradient();
        let s = TOAST_STYLE;
        format!(
            "position: fixed; top: {}px; right: {}px; padding: {}px {}px; border-radius: {}px; \
             color: white; font-weight: 500; z-index: {}; max-width: {}px; word-wrap: break-word; \
             background: linear-gradient(45deg, {}, {});",
            s.top_px,
            s.right_px,
            s.padding.0,
            s.padding.1,
            s.border_radius_px,
            s.z_index,
            s.max_width_px,
            from,
            to
        )
    }
}

/// Logs messages and keeps the transient toasts currently on screen.
#[derive(Debug, Default)]
pub struct Notifier {
    next_id: u64,
    toasts: Vec<Toast>,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notify(&mut self, message: impl Into<String>, severity: Severity) -> Toast {
        self.notify_at(message, severity, Instant::now())
    }

    /// Logs `message` at the level matching `severity` and queues a toast
    /// shown from `now`.
    ///
    /// # Returns
    /// * `Toast` - A copy of the queued toast for the view to display
    pub fn notify_at(
        &mut self,
        message: impl Into<String>,
        severity: Severity,
        now: Instant,
    ) -> Toast {
        let message = message.into();
        log::log!(severity.log_level(), "[{}] {}", severity.label(), message);

        self.prune(now);
        self.next_id += 1;
        let toast = Toast {
            id: self.next_id,
            message,
            severity,
            shown_at: now,
        };
        self.toasts.push(toast.clone());
        toast
    }

    /// Drops toasts whose exit transition has finished.
    pub fn prune(&mut self, now: Instant) {
        self.toasts
            .retain(|toast| toast.phase(now) != ToastPhase::Expired);
    }

    /// Toasts still on screen at `now`, oldest first
    pub fn active(&self, now: Instant) -> impl Iterator<Item = &Toast> {
        self.toasts
            .iter()
            .filter(move |toast| toast.phase(now) != ToastPhase::Expired)
    }

    /// Most recent toast, expired or not
    pub fn last(&self) -> Option<&Toast> {
        self.toasts.last()
    }
}
