//! User-facing failure notifications.
//!
//! The orchestration decides *when* and *what* to notify; actual delivery
//! (banner, toast, system tray) is a collaborator behind the
//! [`NotificationSink`] trait. Genuine failures emit one global and one
//! local notification; user-initiated cancellations emit nothing.

use tracing::{error, warn};

/// Notification severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Something failed and the user should know about it.
    Error,
    /// Degraded but recoverable condition.
    Warning,
}

/// Where the notification should surface.
///
/// `Global` is an app-wide banner; `Local` is bound to the context that
/// initiated the transfer (e.g. the attachment row in an open note).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationScope {
    /// App-wide banner.
    Global,
    /// Context-specific surface near the initiating view.
    Local,
}

/// A single user-facing notification.
#[derive(Debug, Clone)]
pub struct Notification {
    /// Short title, e.g. "Download failed".
    pub heading: String,
    /// Detail message; failure reasons are surfaced verbatim.
    pub message: String,
    /// Severity of the event.
    pub severity: Severity,
    /// Delivery scope.
    pub scope: NotificationScope,
}

impl Notification {
    /// Creates an error notification.
    #[must_use]
    pub fn error(
        heading: impl Into<String>,
        message: impl Into<String>,
        scope: NotificationScope,
    ) -> Self {
        Self {
            heading: heading.into(),
            message: message.into(),
            severity: Severity::Error,
            scope,
        }
    }

    /// Returns a copy of this notification re-scoped to `scope`.
    #[must_use]
    pub fn with_scope(&self, scope: NotificationScope) -> Self {
        Self {
            scope,
            ..self.clone()
        }
    }
}

/// Receives notifications the transfer pipeline decides to emit.
pub trait NotificationSink: Send + Sync {
    /// Delivers a single notification.
    fn notify(&self, notification: &Notification);
}

/// Default sink that forwards notifications to the tracing log.
///
/// Useful for headless deployments and as a stand-in until a UI sink is
/// wired up.
#[derive(Debug, Default)]
pub struct TracingNotificationSink;

impl TracingNotificationSink {
    /// Creates a new tracing-backed sink.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl NotificationSink for TracingNotificationSink {
    fn notify(&self, notification: &Notification) {
        match notification.severity {
            Severity::Error => error!(
                heading = %notification.heading,
                scope = ?notification.scope,
                "{}",
                notification.message
            ),
            Severity::Warning => warn!(
                heading = %notification.heading,
                scope = ?notification.scope,
                "{}",
                notification.message
            ),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    struct CollectingSink {
        received: Mutex<Vec<Notification>>,
    }

    impl NotificationSink for CollectingSink {
        fn notify(&self, notification: &Notification) {
            self.received.lock().unwrap().push(notification.clone());
        }
    }

    #[test]
    fn test_error_constructor_sets_severity() {
        let notification = Notification::error("Download failed", "boom", NotificationScope::Global);
        assert_eq!(notification.severity, Severity::Error);
        assert_eq!(notification.scope, NotificationScope::Global);
        assert_eq!(notification.heading, "Download failed");
        assert_eq!(notification.message, "boom");
    }

    #[test]
    fn test_with_scope_rescopes_copy() {
        let global = Notification::error("Download failed", "boom", NotificationScope::Global);
        let local = global.with_scope(NotificationScope::Local);
        assert_eq!(local.scope, NotificationScope::Local);
        assert_eq!(global.scope, NotificationScope::Global);
        assert_eq!(local.message, global.message);
    }

    #[test]
    fn test_sink_receives_notifications_through_trait_object() {
        let sink = CollectingSink {
            received: Mutex::new(Vec::new()),
        };
        let dyn_sink: &dyn NotificationSink = &sink;
        dyn_sink.notify(&Notification::error(
            "Download failed",
            "boom",
            NotificationScope::Global,
        ));
        assert_eq!(sink.received.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_tracing_sink_does_not_panic() {
        let sink = TracingNotificationSink::new();
        sink.notify(&Notification::error(
            "Download failed",
            "boom",
            NotificationScope::Local,
        ));
    }
}
