//! Kubernetes resource watchers.
//!
//! One relay per resource kind, all driven by the same
//! [`WatchRelay`](watch_relay::WatchRelay) engine:
//! - `NetworkPolicy`: configured namespace, or every namespace
//! - `Pod`: pods scheduled on the local node
//! - `Namespace`: no filter

use crate::config::Config;
use k8s_openapi::api::core::v1::{Namespace, Pod};
use k8s_openapi::api::networking::v1::NetworkPolicy;
use kube::Client;
use kube::api::WatchEvent;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;
use watch_relay::{KubeSubscriptionFactory, RelayError, Selector, WatchRelay};

/// Starts watch relays for the resource kinds the agent consumes.
pub struct Watcher {
    client: Client,
    namespace: Option<String>,
    node_name: String,
    watch_timeout_secs: Option<u32>,
}

impl Watcher {
    /// Creates a new watcher instance.
    pub fn new(client: Client, config: &Config) -> Self {
        Self {
            client,
            namespace: config.namespace.clone(),
            node_name: config.node_name.clone(),
            watch_timeout_secs: config.watch_timeout_secs,
        }
    }

    fn with_timeout<K>(&self, factory: KubeSubscriptionFactory<K>) -> KubeSubscriptionFactory<K> {
        match self.watch_timeout_secs {
            Some(secs) => factory.with_timeout(secs),
            None => factory,
        }
    }

    /// Relays NetworkPolicy events until cancelled.
    pub async fn watch_policies(
        &self,
        sink: mpsc::Sender<WatchEvent<NetworkPolicy>>,
        cancel: CancellationToken,
    ) -> Result<(), RelayError> {
        let selector = policy_selector(self.namespace.as_deref());
        info!("Starting NetworkPolicy watcher ({})", selector);

        let factory = self.with_timeout(KubeSubscriptionFactory::<NetworkPolicy>::namespaced(
            self.client.clone(),
        ));
        WatchRelay::new("NetworkPolicy", factory)
            .run(selector, sink, cancel)
            .await
    }

    /// Relays events for pods scheduled on the local node until cancelled.
    pub async fn watch_local_pods(
        &self,
        sink: mpsc::Sender<WatchEvent<Pod>>,
        cancel: CancellationToken,
    ) -> Result<(), RelayError> {
        let selector = local_pod_selector(&self.node_name, self.namespace.as_deref());
        info!("Starting Pod watcher ({})", selector);

        let factory =
            self.with_timeout(KubeSubscriptionFactory::<Pod>::namespaced(self.client.clone()));
        WatchRelay::new("Pod", factory)
            .run(selector, sink, cancel)
            .await
    }

    /// Relays Namespace events until cancelled.
    pub async fn watch_namespaces(
        &self,
        sink: mpsc::Sender<WatchEvent<Namespace>>,
        cancel: CancellationToken,
    ) -> Result<(), RelayError> {
        let selector = Selector::all();
        info!("Starting Namespace watcher ({})", selector);

        let factory = self.with_timeout(KubeSubscriptionFactory::<Namespace>::cluster(self.client.clone()));
        WatchRelay::new("Namespace", factory)
            .run(selector, sink, cancel)
            .await
    }
}

fn policy_selector(namespace: Option<&str>) -> Selector {
    match namespace {
        Some(ns) => Selector::namespace(ns),
        None => Selector::all(),
    }
}

fn local_pod_selector(node_name: &str, namespace: Option<&str>) -> Selector {
    let selector = Selector::local_node(node_name);
    match namespace {
        Some(ns) => selector.in_namespace(ns),
        None => selector,
    }
}
