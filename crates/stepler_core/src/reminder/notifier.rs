//! Notification delivery delegates.
//!
//! # Responsibility
//! - Define the `notify(title, body) -> bool` contract hosts implement.
//! - Chain a primary channel with a fallback channel.
//!
//! # Invariants
//! - Delivery is never retried; a reminder both channels reject is dropped.

use log::warn;

/// Title used for every reminder notification.
pub const NOTIFICATION_TITLE: &str = "Stepler";

/// Host-provided notification channel.
pub trait Notifier {
    /// Attempts delivery; `false` when the channel is unavailable or denied.
    fn notify(&self, title: &str, body: &str) -> bool;
}

impl<N: Notifier + ?Sized> Notifier for &N {
    fn notify(&self, title: &str, body: &str) -> bool {
        (**self).notify(title, body)
    }
}

impl<N: Notifier + ?Sized> Notifier for Box<N> {
    fn notify(&self, title: &str, body: &str) -> bool {
        (**self).notify(title, body)
    }
}

/// Tries `primary`, then `fallback`.
pub struct FallbackNotifier<P, F> {
    primary: P,
    fallback: F,
}

impl<P: Notifier, F: Notifier> FallbackNotifier<P, F> {
    pub fn new(primary: P, fallback: F) -> Self {
        Self { primary, fallback }
    }
}

impl<P: Notifier, F: Notifier> Notifier for FallbackNotifier<P, F> {
    fn notify(&self, title: &str, body: &str) -> bool {
        if self.primary.notify(title, body) {
            return true;
        }
        if self.fallback.notify(title, body) {
            return true;
        }
        warn!("event=reminder_drop module=reminder status=error reason=no_channel");
        false
    }
}

/// Channel that is always unavailable.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify(&self, _title: &str, _body: &str) -> bool {
        false
    }
}
