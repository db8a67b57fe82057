//! Watch selectors
//!
//! A [`Selector`] describes which resources a subscription observes. It is
//! built once per relay and handed unchanged to every reconnect.

use std::fmt;

/// Immutable filter applied to every subscription a relay opens.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Selector {
    namespace: Option<String>,
    node_name: Option<String>,
}

impl Selector {
    /// No filter: every object of the kind, cluster-wide.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Objects in (or, for cluster-scoped kinds, named after) `namespace`.
    #[must_use]
    pub fn namespace(namespace: impl Into<String>) -> Self {
        Self {
            namespace: Some(namespace.into()),
            node_name: None,
        }
    }

    /// Objects bound to the node `node_name`.
    #[must_use]
    pub fn local_node(node_name: impl Into<String>) -> Self {
        Self {
            namespace: None,
            node_name: Some(node_name.into()),
        }
    }

    /// Narrows an existing selector to a namespace.
    #[must_use]
    pub fn in_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Target namespace, if any
    pub fn namespace_name(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Target node, if any
    pub fn node_name(&self) -> Option<&str> {
        self.node_name.as_deref()
    }

    /// True when the selector does not filter anything.
    pub fn is_all(&self) -> bool {
        self.namespace.is_none() && self.node_name.is_none()
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.namespace, &self.node_name) {
            (None, None) => write!(f, "all"),
            (Some(ns), None) => write!(f, "namespace={ns}"),
            (None, Some(node)) => write!(f, "node={node}"),
            (Some(ns), Some(node)) => write!(f, "namespace={ns},node={node}"),
        }
    }
}
