//! Subscription traits
//!
//! These traits are the seam between the relay and whatever opens watches.
//! The kube-backed implementation lives in [`crate::kube_watch`]; tests use the
//! scripted mock in `mock`.
//! All async methods must be `Send` to work with Tokio's work-stealing runtime.

use crate::selector::Selector;
use std::fmt;

/// Why a subscription stopped producing events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    /// The remote side ended the stream
    Ended,
    /// The stream broke with an error after opening
    Failed(String),
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CloseReason::Ended => write!(f, "ended by remote"),
            CloseReason::Failed(detail) => write!(f, "failed: {detail}"),
        }
    }
}

/// Result of waiting on a subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionOutcome<E> {
    /// One event, in remote order
    Delivered(E),
    /// No more events will come from this subscription
    Closed(CloseReason),
}

/// A single-use, open watch.
///
/// Once [`Subscription::next`] has returned `Closed` the subscription is
/// spent and must be dropped. Dropping it releases the remote connection.
#[async_trait::async_trait]
pub trait Subscription: Send {
    /// Event record produced by this subscription
    type Event: Send + 'static;

    /// Wait for the next event or for the end of the stream.
    ///
    /// Must be cancel-safe: the relay drops this future when cancellation
    /// wins the race.
    async fn next(&mut self) -> SubscriptionOutcome<Self::Event>;
}

/// Opens fresh subscriptions on demand.
///
/// Called once per reconnect with the same selector, so implementations must
/// tolerate repeated calls.
#[async_trait::async_trait]
pub trait SubscriptionFactory: Send + Sync {
    /// Event record produced by opened subscriptions
    type Event: Send + 'static;
    /// Subscription type returned by [`SubscriptionFactory::open`]
    type Subscription: Subscription<Event = Self::Event>;
    /// Open failure
    type Error: std::error::Error + Send + Sync + 'static;

    /// Open a new subscription filtered by `selector`.
    async fn open(&self, selector: &Selector) -> Result<Self::Subscription, Self::Error>;
}
