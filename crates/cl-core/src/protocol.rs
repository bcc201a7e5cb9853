//! Message protocol between the popup/background and the live engine.
//!
//! Requests are tagged by `action`; responses are plain objects. The
//! host runtime dispatches one message at a time, so handlers never
//! interleave.

use serde::{Deserialize, Serialize};

use crate::types::{DetectionSnapshot, FeatureSet};

/// Incoming request, keyed by the `action` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Request {
    /// Liveness probe used to detect prior injection.
    Ping,
    /// Snapshot plus current enabled/feature state.
    GetDetectionInfo,
    /// Apply new enabled/feature state if the hostname matches the page.
    ToggleSite {
        hostname: String,
        enabled: bool,
        #[serde(default)]
        features: Option<FeatureSet>,
    },
    /// Apply a feature change; only honored while enabled.
    UpdateFeatures {
        hostname: String,
        features: FeatureSet,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pong {
    pub pong: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionInfo {
    pub detection_results: Option<DetectionSnapshot>,
    pub is_enabled: bool,
    pub features: FeatureSet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateAck {
    pub success: bool,
}

/// Any response the engine can send.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Response {
    Pong(Pong),
    DetectionInfo(DetectionInfo),
    UpdateAck(UpdateAck),
}
