//! Kubernetes-backed subscriptions
//!
//! Opens raw watches through [`kube::Api::watch`]. Every open starts from
//! resource version `"0"`, so each reconnect is a fresh subscription that
//! replays the current state before streaming changes.
//!
//! Selector mapping:
//! - namespace: namespaced `Api` for namespaced kinds, `metadata.name`
//!   field selector for cluster-scoped kinds
//! - node: `spec.nodeName` field selector
//! - nothing set: cluster-wide `Api`
//!
//! The API server reports a rejected watch (RBAC, unknown resource) as a
//! `Status` body rather than a failed request, so `open` waits for the first
//! item and turns an API error there into an open failure. Errors after that
//! close the subscription and the relay reconnects.

use crate::selector::Selector;
use crate::subscription::{CloseReason, Subscription, SubscriptionFactory, SubscriptionOutcome};
use futures::StreamExt;
use futures::stream::{BoxStream, Fuse};
use k8s_openapi::{ClusterResourceScope, NamespaceResourceScope};
use kube::api::{Api, WatchEvent, WatchParams};
use kube::{Client, Resource};
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use std::marker::PhantomData;
use tracing::debug;

/// Resource version that asks the API server for a full initial listing
const FRESH_RESOURCE_VERSION: &str = "0";

type ApiBuilder<K> = fn(Client, Option<&str>) -> Api<K>;

fn namespaced_api<K>(client: Client, namespace: Option<&str>) -> Api<K>
where
    K: Resource<Scope = NamespaceResourceScope>,
    K::DynamicType: Default,
{
    match namespace {
        Some(ns) => Api::namespaced(client, ns),
        None => Api::all(client),
    }
}

fn cluster_api<K>(client: Client, _namespace: Option<&str>) -> Api<K>
where
    K: Resource<Scope = ClusterResourceScope>,
    K::DynamicType: Default,
{
    Api::all(client)
}

/// Opens `Api::watch` subscriptions for resource kind `K`.
pub struct KubeSubscriptionFactory<K> {
    client: Client,
    api_for: ApiBuilder<K>,
    cluster_scoped: bool,
    timeout_secs: Option<u32>,
    _kind: PhantomData<fn() -> K>,
}

impl<K> KubeSubscriptionFactory<K>
where
    K: Resource<Scope = NamespaceResourceScope>,
    K::DynamicType: Default,
{
    /// Factory for a namespaced kind (pods, network policies, ...).
    pub fn namespaced(client: Client) -> Self {
        Self {
            client,
            api_for: namespaced_api::<K>,
            cluster_scoped: false,
            timeout_secs: None,
            _kind: PhantomData,
        }
    }
}

impl<K> KubeSubscriptionFactory<K>
where
    K: Resource<Scope = ClusterResourceScope>,
    K::DynamicType: Default,
{
    /// Factory for a cluster-scoped kind (namespaces, nodes, ...).
    pub fn cluster(client: Client) -> Self {
        Self {
            client,
            api_for: cluster_api::<K>,
            cluster_scoped: true,
            timeout_secs: None,
            _kind: PhantomData,
        }
    }
}

impl<K> KubeSubscriptionFactory<K> {
    /// Ask the API server to end each subscription after `timeout_secs`.
    ///
    /// The relay reconnects when the server closes the watch.
    #[must_use]
    pub fn with_timeout(mut self, timeout_secs: u32) -> Self {
        self.timeout_secs = Some(timeout_secs);
        self
    }

    /// Translate a selector into watch parameters
    pub fn watch_params(&self, selector: &Selector) -> WatchParams {
        watch_params(selector, self.cluster_scoped, self.timeout_secs)
    }
}

fn watch_params(selector: &Selector, cluster_scoped: bool, timeout_secs: Option<u32>) -> WatchParams {
    let mut fields = Vec::new();
    if let Some(node) = selector.node_name() {
        fields.push(format!("spec.nodeName={node}"));
    }
    if cluster_scoped {
        if let Some(ns) = selector.namespace_name() {
            fields.push(format!("metadata.name={ns}"));
        }
    }

    let mut params = WatchParams::default();
    if !fields.is_empty() {
        params = params.fields(&fields.join(","));
    }
    if let Some(timeout) = timeout_secs {
        params = params.timeout(timeout);
    }
    params
}

impl<K> Debug for KubeSubscriptionFactory<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeSubscriptionFactory")
            .field("cluster_scoped", &self.cluster_scoped)
            .field("timeout_secs", &self.timeout_secs)
            .finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl<K> SubscriptionFactory for KubeSubscriptionFactory<K>
where
    K: Resource + Clone + DeserializeOwned + Debug + Send + Sync + 'static,
{
    type Event = WatchEvent<K>;
    type Subscription = KubeSubscription<K>;
    type Error = kube::Error;

    async fn open(&self, selector: &Selector) -> Result<KubeSubscription<K>, kube::Error> {
        let api = (self.api_for)(self.client.clone(), selector.namespace_name());
        let params = self.watch_params(selector);
        debug!("Opening watch ({})", selector);

        let mut stream = api.watch(&params, FRESH_RESOURCE_VERSION).await?.boxed().fuse();
        let first = match stream.next().await {
            Some(Err(e @ kube::Error::Api(_))) => return Err(e),
            first => first,
        };
        Ok(KubeSubscription { first, stream })
    }
}

/// One open `Api::watch` stream.
pub struct KubeSubscription<K> {
    /// Item read while opening, handed out before the rest of the stream
    first: Option<kube::Result<WatchEvent<K>>>,
    stream: Fuse<BoxStream<'static, kube::Result<WatchEvent<K>>>>,
}

#[async_trait::async_trait]
impl<K> Subscription for KubeSubscription<K>
where
    K: Send + 'static,
{
    type Event = WatchEvent<K>;

    async fn next(&mut self) -> SubscriptionOutcome<WatchEvent<K>> {
        let item = match self.first.take() {
            Some(item) => Some(item),
            None => self.stream.next().await,
        };
        match item {
            Some(Ok(event)) => SubscriptionOutcome::Delivered(event),
            Some(Err(e)) => SubscriptionOutcome::Closed(CloseReason::Failed(e.to_string())),
            None => SubscriptionOutcome::Closed(CloseReason::Ended),
        }
    }
}

impl<K> Debug for KubeSubscription<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeSubscription").finish_non_exhaustive()
    }
}
