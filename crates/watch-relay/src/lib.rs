//! Watch Relay
//!
//! Subscribes to a Kubernetes watch, forwards every change event to a local
//! channel, and re-subscribes whenever the API server closes the stream,
//! until cancelled.
//!
//! # Example
//!
//! ```no_run
//! use k8s_openapi::api::core::v1::Pod;
//! use tokio::sync::mpsc;
//! use tokio_util::sync::CancellationToken;
//! use watch_relay::{KubeSubscriptionFactory, Selector, WatchRelay};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = kube::Client::try_default().await?;
//! let factory = KubeSubscriptionFactory::<Pod>::namespaced(client);
//!
//! let (tx, mut rx) = mpsc::channel(64);
//! let cancel = CancellationToken::new();
//! let relay = WatchRelay::new("Pod", factory)
//!     .spawn(Selector::local_node("worker-1"), tx, cancel.clone());
//!
//! while let Some(event) = rx.recv().await {
//!     println!("{event:?}");
//! }
//! cancel.cancel();
//! relay.await??;
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! - **Generic engine**: one relay for any [`SubscriptionFactory`]
//! - **Prompt shutdown**: cancellation wins every race with incoming events
//! - **Swappable reconnect policy**: immediate by default, Fibonacci backoff available
//! - **Injected observer**: closures and reconnects reported through [`RelayObserver`]

pub mod error;
pub mod kube_watch;
#[cfg(any(test, feature = "test-util"))]
pub mod mock;
pub mod observer;
pub mod reconnect;
pub mod relay;
#[cfg(test)]
mod relay_test;
pub mod selector;
pub mod subscription;

pub use error::{BoxError, RelayError};
pub use kube_watch::{KubeSubscription, KubeSubscriptionFactory};
#[cfg(any(test, feature = "test-util"))]
pub use mock::{MockSubscriptionFactory, RecordingObserver, Script};
pub use observer::{RelayObserver, TracingObserver};
pub use reconnect::{FibonacciBackoff, Immediate, ReconnectPolicy};
pub use relay::WatchRelay;
pub use selector::Selector;
pub use subscription::{CloseReason, Subscription, SubscriptionFactory, SubscriptionOutcome};
