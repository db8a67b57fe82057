//! The watch relay control loop.
//!
//! A [`WatchRelay`] opens a subscription, forwards every event it yields to
//! a sink in arrival order, and opens a fresh subscription whenever the
//! previous one closes. It stops when the cancellation token fires (success)
//! or when the factory cannot open a subscription (fatal).
//!
//! ```text
//! OPENING ──open ok──▶ STREAMING ──closed──▶ OPENING
//!    │                     │
//!    └─open err─▶ CLOSED-FATAL   └─cancel─▶ CLOSED-CANCELLED
//! ```

use crate::error::RelayError;
use crate::observer::{RelayObserver, TracingObserver};
use crate::reconnect::{Immediate, ReconnectPolicy};
use crate::selector::Selector;
use crate::subscription::{Subscription, SubscriptionFactory, SubscriptionOutcome};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Self-reconnecting relay from a subscription factory to an event sink.
pub struct WatchRelay<F, P = Immediate> {
    resource: String,
    factory: F,
    observer: Arc<dyn RelayObserver>,
    policy: P,
}

impl<F> WatchRelay<F, Immediate>
where
    F: SubscriptionFactory,
{
    /// Creates a relay labelled `resource` that reconnects immediately and
    /// reports through [`TracingObserver`].
    pub fn new(resource: impl Into<String>, factory: F) -> Self {
        Self {
            resource: resource.into(),
            factory,
            observer: Arc::new(TracingObserver),
            policy: Immediate,
        }
    }
}

impl<F, P> WatchRelay<F, P>
where
    F: SubscriptionFactory,
    P: ReconnectPolicy,
{
    /// Replaces the observer.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn RelayObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Replaces the reconnect delay policy.
    pub fn with_reconnect_policy<Q: ReconnectPolicy>(self, policy: Q) -> WatchRelay<F, Q> {
        WatchRelay {
            resource: self.resource,
            factory: self.factory,
            observer: self.observer,
            policy,
        }
    }

    /// Label used in errors and observer notifications
    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// Relays events until `cancel` fires or a subscription fails to open.
    ///
    /// Every subscription is opened with `selector`. Events are pushed to
    /// `sink` one at a time; a full sink blocks the relay, which in turn stops
    /// reading from the subscription.
    ///
    /// # Errors
    ///
    /// * [`RelayError::Open`] - the factory could not open a subscription
    /// * [`RelayError::SinkClosed`] - the receiving end of `sink` was dropped
    pub async fn run(
        &mut self,
        selector: Selector,
        sink: mpsc::Sender<F::Event>,
        cancel: CancellationToken,
    ) -> Result<(), RelayError> {
        let mut reconnects: u64 = 0;

        loop {
            if reconnects > 0 {
                self.observer.on_reconnect(&self.resource, &selector, reconnects);
            }

            let opened = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(()),
                opened = self.factory.open(&selector) => opened,
            };
            let mut subscription = opened.map_err(|e| RelayError::Open {
                resource: self.resource.clone(),
                source: Box::new(e),
            })?;

            let mut delivered = false;
            let reason = loop {
                // Cancellation wins ties so shutdown never waits on a busy stream
                let outcome = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Ok(()),
                    outcome = subscription.next() => outcome,
                };

                match outcome {
                    SubscriptionOutcome::Delivered(event) => {
                        delivered = true;
                        if sink.send(event).await.is_err() {
                            return Err(RelayError::SinkClosed {
                                resource: self.resource.clone(),
                            });
                        }
                    }
                    SubscriptionOutcome::Closed(reason) => break reason,
                }
            };
            drop(subscription);
            self.observer.on_closed(&self.resource, &reason);

            let delay = self.policy.next_delay(delivered);
            if delay.is_zero() {
                // Lets the caller's cancel reach us even if the remote closes instantly
                tokio::task::yield_now().await;
            } else {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Ok(()),
                    () = tokio::time::sleep(delay) => {}
                }
            }
            reconnects += 1;
        }
    }
}

impl<F, P> WatchRelay<F, P>
where
    F: SubscriptionFactory + 'static,
    P: ReconnectPolicy + 'static,
{
    /// Runs the relay on its own Tokio task.
    pub fn spawn(
        mut self,
        selector: Selector,
        sink: mpsc::Sender<F::Event>,
        cancel: CancellationToken,
    ) -> JoinHandle<Result<(), RelayError>> {
        tokio::spawn(async move { self.run(selector, sink, cancel).await })
    }
}

impl<F, P> std::fmt::Debug for WatchRelay<F, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchRelay")
            .field("resource", &self.resource)
            .finish_non_exhaustive()
    }
}
