use serde::{Deserialize, Serialize};

/// Affects which media tracks are negotiated if the remote endpoint is not
/// bundle-aware, and what ICE candidates are gathered.
#[derive(Default, Debug, PartialEq, Eq, Copy, Clone, Serialize, Deserialize)]
pub enum RTCBundlePolicy {
    /// Platform default, no forced bundling.
    #[default]
    Unspecified = 0,

    /// One transport per media kind in use.
    #[serde(rename = "balanced")]
    Balanced = 1,

    /// Every section stays on its own transport and no `a=group:BUNDLE` line
    /// is offered.
    #[serde(rename = "max-compat")]
    MaxCompat = 2,

    /// Everything is bundled on the first section's transport.
    #[serde(rename = "max-bundle")]
    MaxBundle = 3,
}
