//! Mock subscription factory for unit testing
//!
//! This module provides a scripted implementation of [`SubscriptionFactory`]
//! that can be used in tests without a running API server. Each call to
//! `open` consumes the next [`Script`] entry; once the script is exhausted,
//! `open` never completes.

use crate::observer::RelayObserver;
use crate::selector::Selector;
use crate::subscription::{CloseReason, Subscription, SubscriptionFactory, SubscriptionOutcome};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::sync::mpsc;

/// Behavior of one `open` call.
#[derive(Debug)]
pub enum Script<E> {
    /// Open, deliver the events, then close cleanly
    Events(Vec<E>),
    /// Open, deliver the events, then close with a stream failure
    EventsThenFail(Vec<E>, String),
    /// Open, deliver the events, then stay open forever
    EventsThenHang(Vec<E>),
    /// Open a subscription fed by a test-driven channel; it closes cleanly
    /// when every sender is dropped
    Channel(mpsc::UnboundedReceiver<E>),
    /// Fail to open with the given message
    OpenError(String),
    /// Never finish opening
    HangOnOpen,
}

/// Error returned for [`Script::OpenError`]
#[derive(Debug, Error)]
#[error("{0}")]
pub struct MockOpenError(pub String);

#[derive(Debug)]
enum Tail<E> {
    Close(CloseReason),
    Hang,
    Channel(mpsc::UnboundedReceiver<E>),
}

/// Subscription produced by [`MockSubscriptionFactory`]
#[derive(Debug)]
pub struct MockSubscription<E> {
    events: VecDeque<E>,
    tail: Tail<E>,
}

#[async_trait::async_trait]
impl<E: Send + 'static> Subscription for MockSubscription<E> {
    type Event = E;

    async fn next(&mut self) -> SubscriptionOutcome<E> {
        if let Some(event) = self.events.pop_front() {
            return SubscriptionOutcome::Delivered(event);
        }
        match &mut self.tail {
            Tail::Close(reason) => SubscriptionOutcome::Closed(reason.clone()),
            Tail::Hang => std::future::pending().await,
            Tail::Channel(rx) => match rx.recv().await {
                Some(event) => SubscriptionOutcome::Delivered(event),
                None => SubscriptionOutcome::Closed(CloseReason::Ended),
            },
        }
    }
}

/// Scripted subscription factory for testing
///
/// Clones share the script and the record of selectors passed to `open`.
#[derive(Debug)]
pub struct MockSubscriptionFactory<E> {
    scripts: Arc<Mutex<VecDeque<Script<E>>>>,
    selectors: Arc<Mutex<Vec<Selector>>>,
}

impl<E> Clone for MockSubscriptionFactory<E> {
    fn clone(&self) -> Self {
        Self {
            scripts: Arc::clone(&self.scripts),
            selectors: Arc::clone(&self.selectors),
        }
    }
}

impl<E> MockSubscriptionFactory<E> {
    /// Create a factory that plays `scripts` in order
    pub fn new(scripts: impl IntoIterator<Item = Script<E>>) -> Self {
        Self {
            scripts: Arc::new(Mutex::new(scripts.into_iter().collect())),
            selectors: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Append a script entry (for test setup)
    pub fn push(&self, script: Script<E>) {
        self.scripts.lock().unwrap().push_back(script);
    }

    /// Number of `open` calls so far
    pub fn open_count(&self) -> usize {
        self.selectors.lock().unwrap().len()
    }

    /// Selectors passed to `open`, in call order
    pub fn selectors(&self) -> Vec<Selector> {
        self.selectors.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl<E: Send + 'static> SubscriptionFactory for MockSubscriptionFactory<E> {
    type Event = E;
    type Subscription = MockSubscription<E>;
    type Error = MockOpenError;

    async fn open(&self, selector: &Selector) -> Result<MockSubscription<E>, MockOpenError> {
        self.selectors.lock().unwrap().push(selector.clone());
        let script = self.scripts.lock().unwrap().pop_front();

        let (events, tail) = match script {
            Some(Script::Events(events)) => (events, Tail::Close(CloseReason::Ended)),
            Some(Script::EventsThenFail(events, detail)) => {
                (events, Tail::Close(CloseReason::Failed(detail)))
            }
            Some(Script::EventsThenHang(events)) => (events, Tail::Hang),
            Some(Script::Channel(rx)) => (Vec::new(), Tail::Channel(rx)),
            Some(Script::OpenError(message)) => return Err(MockOpenError(message)),
            Some(Script::HangOnOpen) | None => std::future::pending().await,
        };

        Ok(MockSubscription {
            events: events.into(),
            tail,
        })
    }
}

/// Notification captured by [`RecordingObserver`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// `on_closed`
    Closed(String, CloseReason),
    /// `on_reconnect`
    Reconnect(String, Selector, u64),
}

/// Observer that records every notification
#[derive(Debug, Clone, Default)]
pub struct RecordingObserver {
    notifications: Arc<Mutex<Vec<Notification>>>,
}

impl RecordingObserver {
    /// Create an empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Notifications received so far
    pub fn notifications(&self) -> Vec<Notification> {
        self.notifications.lock().unwrap().clone()
    }
}

impl RelayObserver for RecordingObserver {
    fn on_closed(&self, resource: &str, reason: &CloseReason) {
        self.notifications
            .lock()
            .unwrap()
            .push(Notification::Closed(resource.to_string(), reason.clone()));
    }

    fn on_reconnect(&self, resource: &str, selector: &Selector, attempt: u64) {
        self.notifications.lock().unwrap().push(Notification::Reconnect(
            resource.to_string(),
            selector.clone(),
            attempt,
        ));
    }
}
