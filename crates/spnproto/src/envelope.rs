//! Call and reply envelopes exchanged over a [`crate::MessageEndpoint`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A named remote procedure invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteCall {
    /// Correlation id, unique per proxy.
    pub id: u64,
    pub method: String,
    pub payload: Value,
}

/// How a remote call ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CallOutcome {
    Ok { value: Value },
    Error { message: String },
}

/// Reply to a [`RemoteCall`], echoing its id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteReply {
    pub id: u64,
    pub outcome: CallOutcome,
}

impl RemoteReply {
    pub fn ok(id: u64, value: Value) -> Self {
        Self {
            id,
            outcome: CallOutcome::Ok { value },
        }
    }

    pub fn error(id: u64, message: impl Into<String>) -> Self {
        Self {
            id,
            outcome: CallOutcome::Error {
                message: message.into(),
            },
        }
    }
}
