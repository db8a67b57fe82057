//! Relay observers
//!
//! The relay reports closures and reconnects through a [`RelayObserver`]
//! instead of logging directly, so each instance can be observed (or
//! silenced) independently.

use crate::selector::Selector;
use crate::subscription::CloseReason;
use tracing::{debug, trace};

/// Receives diagnostic notifications from a running relay.
///
/// Notifications are purely observational and never change relay behavior.
pub trait RelayObserver: Send + Sync {
    /// A subscription stopped producing events.
    fn on_closed(&self, resource: &str, reason: &CloseReason);

    /// The relay is about to open subscription number `attempt` (1-based
    /// count of re-subscriptions, the initial open is not reported).
    fn on_reconnect(&self, resource: &str, selector: &Selector, attempt: u64);
}

/// Default observer: closures at `debug`, reconnects at `trace`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl RelayObserver for TracingObserver {
    fn on_closed(&self, resource: &str, reason: &CloseReason) {
        debug!("{} watcher channel closed ({})", resource, reason);
    }

    fn on_reconnect(&self, resource: &str, selector: &Selector, attempt: u64) {
        trace!("Reopening {} watch ({}), attempt {}", resource, selector, attempt);
    }
}
