//! Play states shared by the controller and the worker realm.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle state of a performance.
///
/// Transitions are driven by the external engine and mirrored into the
/// realm. Wire names match what the worker bootstrap expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlayState {
    #[serde(rename = "realtimePerformanceStarted")]
    PerformanceStarted,
    #[serde(rename = "realtimePerformanceEnded")]
    PerformanceEnded,
    #[serde(rename = "realtimePerformancePaused")]
    PerformancePaused,
    #[serde(rename = "realtimePerformanceResumed")]
    PerformanceResumed,
    #[serde(rename = "renderStarted")]
    RenderStarted,
    #[serde(rename = "renderEnded")]
    RenderEnded,
}

impl PlayState {
    pub const ALL: [PlayState; 6] = [
        PlayState::PerformanceStarted,
        PlayState::PerformanceEnded,
        PlayState::PerformancePaused,
        PlayState::PerformanceResumed,
        PlayState::RenderStarted,
        PlayState::RenderEnded,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PlayState::PerformanceStarted => "realtimePerformanceStarted",
            PlayState::PerformanceEnded => "realtimePerformanceEnded",
            PlayState::PerformancePaused => "realtimePerformancePaused",
            PlayState::PerformanceResumed => "realtimePerformanceResumed",
            PlayState::RenderStarted => "renderStarted",
            PlayState::RenderEnded => "renderEnded",
        }
    }

    /// Whether a change into this state is mirrored to the realm with
    /// `setPlayState`. Start states reach the realm through `initialize`.
    pub fn forwards_to_realm(&self) -> bool {
        !matches!(self, PlayState::PerformanceStarted | PlayState::RenderStarted)
    }
}

impl fmt::Display for PlayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown play state: {0}")]
pub struct ParsePlayStateError(pub String);

impl FromStr for PlayState {
    type Err = ParsePlayStateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PlayState::ALL
            .iter()
            .copied()
            .find(|state| state.as_str() == s)
            .ok_or_else(|| ParsePlayStateError(s.to_string()))
    }
}
