//! Main controller implementation.
//!
//! This module contains the `Controller` struct that starts one relay and
//! one consumer per resource kind, and stops them all on shutdown.

use crate::config::Config;
use crate::error::ControllerError;
use crate::events::drain_events;
use crate::watcher::Watcher;
use kube::Client;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use watch_relay::RelayError;

type RelayResult = (&'static str, Result<(), RelayError>);

/// Main controller for the watch relays.
pub struct Controller {
    cancel: CancellationToken,
    relays: JoinSet<RelayResult>,
    consumers: JoinSet<(&'static str, u64)>,
}

impl Controller {
    /// Creates a new controller instance and starts its relays.
    pub async fn new(config: Config) -> Result<Self, ControllerError> {
        info!("Initializing watch relays");

        // Create Kubernetes client
        let kube_client = Client::try_default().await?;
        let watcher = Arc::new(Watcher::new(kube_client, &config));

        let cancel = CancellationToken::new();
        let mut relays = JoinSet::new();
        let mut consumers = JoinSet::new();

        let (policy_tx, policy_rx) = mpsc::channel(config.buffer_size);
        let (pod_tx, pod_rx) = mpsc::channel(config.buffer_size);
        let (namespace_tx, namespace_rx) = mpsc::channel(config.buffer_size);

        // Relays share nothing but the cancellation token
        let policy_watcher = Arc::clone(&watcher);
        let token = cancel.clone();
        relays.spawn(async move {
            ("NetworkPolicy", policy_watcher.watch_policies(policy_tx, token).await)
        });

        let pod_watcher = Arc::clone(&watcher);
        let token = cancel.clone();
        relays.spawn(async move { ("Pod", pod_watcher.watch_local_pods(pod_tx, token).await) });

        let token = cancel.clone();
        relays.spawn(async move {
            ("Namespace", watcher.watch_namespaces(namespace_tx, token).await)
        });

        consumers.spawn(async move {
            ("NetworkPolicy", drain_events("NetworkPolicy", policy_rx).await)
        });
        consumers.spawn(async move { ("Pod", drain_events("Pod", pod_rx).await) });
        consumers.spawn(async move { ("Namespace", drain_events("Namespace", namespace_rx).await) });

        Ok(Self {
            cancel,
            relays,
            consumers,
        })
    }

    /// Runs the controller until shutdown.
    ///
    /// A relay that fails does not stop the others; the controller returns
    /// once every relay has stopped, reporting the first failure.
    pub async fn run(mut self) -> Result<(), ControllerError> {
        info!("Watch relays running");

        let first_error = supervise_relays(&mut self.relays, &self.cancel, shutdown_signal()).await;

        // Every relay is gone, so every sender is dropped and consumers finish
        while let Some(joined) = self.consumers.join_next().await {
            match joined {
                Ok((resource, count)) => debug!("{} consumer drained {} events", resource, count),
                Err(e) => error!("Event consumer task panicked: {}", e),
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Waits for every relay to stop, cancelling them all once `shutdown`
/// completes. Returns the first failure; a failed relay does not stop the
/// others.
async fn supervise_relays<S>(
    relays: &mut JoinSet<RelayResult>,
    cancel: &CancellationToken,
    shutdown: S,
) -> Option<ControllerError>
where
    S: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    let mut first_error: Option<ControllerError> = None;

    loop {
        tokio::select! {
            () = &mut shutdown, if !cancel.is_cancelled() => {
                info!("Shutdown signal received, stopping watch relays");
                cancel.cancel();
            }
            joined = relays.join_next() => match joined {
                None => break,
                Some(Ok((resource, Ok(())))) => info!("{} relay stopped", resource),
                Some(Ok((resource, Err(e)))) => {
                    error!("{} relay failed: {}", resource, e);
                    first_error.get_or_insert(ControllerError::Relay(e));
                }
                Some(Err(e)) => {
                    error!("Watch relay task panicked: {}", e);
                    first_error.get_or_insert(ControllerError::Watch(format!(
                        "relay task panicked: {e}"
                    )));
                }
            },
        }
    }

    first_error
}

/// Completes on Ctrl-C or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
