//! Event consumers.
//!
//! Drains a relay's channel and logs every event it carries.

use kube::Resource;
use kube::api::WatchEvent;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Logs events from `events` until the relay drops its sender.
///
/// Returns the number of events consumed.
pub async fn drain_events<K>(resource: &str, mut events: mpsc::Receiver<WatchEvent<K>>) -> u64
where
    K: Resource,
{
    let mut count: u64 = 0;
    while let Some(event) = events.recv().await {
        let (action, subject) = describe(&event);
        match event {
            WatchEvent::Error(_) => warn!("{} {}: {}", resource, action, subject),
            _ => info!("{} {}: {}", resource, action, subject),
        }
        count += 1;
    }
    debug!("{} event stream finished after {} events", resource, count);
    count
}

/// Short action name and subject for an event.
pub fn describe<K: Resource>(event: &WatchEvent<K>) -> (&'static str, String) {
    match event {
        WatchEvent::Added(obj) => ("added", object_name(obj)),
        WatchEvent::Modified(obj) => ("modified", object_name(obj)),
        WatchEvent::Deleted(obj) => ("deleted", object_name(obj)),
        WatchEvent::Bookmark(bookmark) => ("bookmark", bookmark.metadata.resource_version.clone()),
        WatchEvent::Error(err) => ("error", format!("{err:?}")),
    }
}

fn object_name<K: Resource>(obj: &K) -> String {
    let meta = obj.meta();
    match (meta.namespace.as_deref(), meta.name.as_deref()) {
        (Some(ns), Some(name)) => format!("{ns}/{name}"),
        (None, Some(name)) => name.to_string(),
        _ => "<unknown>".to_string(),
    }
}
