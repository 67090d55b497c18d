//! GlobalScope - named bindings visible across the sandbox boundary.
//!
//! Depending on the host, code inside the realm resolves globals either
//! from its own scope or from its parent's. The bridge therefore binds
//! the audio context on both sides, and looks the worker's node up on
//! both sides. This registry makes both scopes explicit.

use std::sync::Arc;

use dashmap::DashMap;
use spnproto::ContextUid;
use tracing::debug;

use crate::audio::{AudioContext, AudioNode};

/// Which side of the sandbox boundary a binding lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    /// Inside the realm.
    Realm,
    /// The hosting (parent) scope.
    Parent,
}

/// A value bound under a global key.
#[derive(Clone)]
pub enum Binding {
    Context(Arc<dyn AudioContext>),
    Node(Arc<dyn AudioNode>),
}

impl Binding {
    pub fn as_context(&self) -> Option<Arc<dyn AudioContext>> {
        match self {
            Binding::Context(ctx) => Some(Arc::clone(ctx)),
            Binding::Node(_) => None,
        }
    }

    pub fn as_node(&self) -> Option<Arc<dyn AudioNode>> {
        match self {
            Binding::Node(node) => Some(Arc::clone(node)),
            Binding::Context(_) => None,
        }
    }
}

impl std::fmt::Debug for Binding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Binding::Context(ctx) => write!(f, "Context({})", ctx.id()),
            Binding::Node(node) => write!(f, "Node({})", node.id()),
        }
    }
}

/// Two-sided key/value registry shared by the controller and the realm.
#[derive(Debug, Default)]
pub struct GlobalScope {
    realm: DashMap<String, Binding>,
    parent: DashMap<String, Binding>,
}

impl GlobalScope {
    pub fn new() -> Self {
        Self::default()
    }

    fn side(&self, side: Side) -> &DashMap<String, Binding> {
        match side {
            Side::Realm => &self.realm,
            Side::Parent => &self.parent,
        }
    }

    /// Bind `key` on `side`, returning what it replaced.
    pub fn bind(&self, side: Side, key: impl Into<String>, binding: Binding) -> Option<Binding> {
        let key = key.into();
        debug!(?side, %key, "bind global");
        self.side(side).insert(key, binding)
    }

    pub fn get(&self, side: Side, key: &str) -> Option<Binding> {
        self.side(side).get(key).map(|b| b.value().clone())
    }

    pub fn remove(&self, side: Side, key: &str) -> Option<Binding> {
        self.side(side).remove(key).map(|(_, b)| b)
    }

    pub fn contains(&self, side: Side, key: &str) -> bool {
        self.side(side).contains_key(key)
    }

    pub fn len(&self, side: Side) -> usize {
        self.side(side).len()
    }

    pub fn is_empty(&self) -> bool {
        self.realm.is_empty() && self.parent.is_empty()
    }

    /// Drop every binding on one side.
    pub fn clear(&self, side: Side) {
        self.side(side).clear();
    }

    /// Bind a session's audio context on both sides.
    pub fn bind_context(&self, uid: &ContextUid, context: Arc<dyn AudioContext>) {
        self.bind(
            Side::Realm,
            uid.as_str(),
            Binding::Context(Arc::clone(&context)),
        );
        self.bind(Side::Parent, uid.parent_key(), Binding::Context(context));
    }

    /// The session's audio context, realm side first.
    pub fn context(&self, uid: &ContextUid) -> Option<Arc<dyn AudioContext>> {
        self.get(Side::Realm, uid.as_str())
            .or_else(|| self.get(Side::Parent, &uid.parent_key()))
            .and_then(|b| b.as_context())
    }

    /// The worker-created node for a session, realm side first.
    pub fn lookup_node(&self, uid: &ContextUid) -> Option<Arc<dyn AudioNode>> {
        self.get(Side::Realm, &uid.node_key())
            .and_then(|b| b.as_node())
            .or_else(|| {
                self.get(Side::Parent, &uid.parent_node_key())
                    .and_then(|b| b.as_node())
            })
    }

    /// Disconnect and unbind the parent-side node of a session.
    ///
    /// Returns whether anything was bound.
    pub fn release_parent_node(&self, uid: &ContextUid) -> bool {
        match self.remove(Side::Parent, &uid.parent_node_key()) {
            Some(Binding::Node(node)) => {
                node.disconnect();
                true
            }
            Some(other) => {
                debug!(%uid, ?other, "parent node key held a non-node binding");
                true
            }
            None => false,
        }
    }
}
