//! Session identifiers and the global keys derived from them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of one audio session, `audioWorklet<N>`.
///
/// `N` comes from a counter owned by the realm context; identifiers are
/// strictly increasing until that context is torn down.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContextUid(String);

impl ContextUid {
    pub const PREFIX: &'static str = "audioWorklet";

    /// Prefix of bindings made visible on the parent side of the sandbox.
    pub const PARENT_PREFIX: &'static str = "__spn_parent_";

    pub fn from_counter(n: u64) -> Self {
        Self(format!("{}{}", Self::PREFIX, n))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Counter value this id was built from, if it has the standard shape.
    pub fn counter(&self) -> Option<u64> {
        self.0.strip_prefix(Self::PREFIX)?.parse().ok()
    }

    /// Key of the worker-created audio node inside the realm.
    pub fn node_key(&self) -> String {
        format!("{}Node", self.0)
    }

    /// Key of the audio context on the parent side.
    pub fn parent_key(&self) -> String {
        format!("{}{}", Self::PARENT_PREFIX, self.0)
    }

    /// Key of the worker-created audio node on the parent side.
    pub fn parent_node_key(&self) -> String {
        format!("{}{}Node", Self::PARENT_PREFIX, self.0)
    }
}

impl fmt::Display for ContextUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_derive_from_uid() {
        let uid = ContextUid::from_counter(3);
        assert_eq!(uid.as_str(), "audioWorklet3");
        assert_eq!(uid.counter(), Some(3));
        assert_eq!(uid.node_key(), "audioWorklet3Node");
        assert_eq!(uid.parent_key(), "__spn_parent_audioWorklet3");
        assert_eq!(uid.parent_node_key(), "__spn_parent_audioWorklet3Node");
    }
}
