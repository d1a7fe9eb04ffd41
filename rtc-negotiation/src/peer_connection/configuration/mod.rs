//! Connection configuration.
//!
//! [`RTCConfiguration`] is either assembled with [`RTCConfigurationBuilder`]
//! or deserialized from the W3C JSON dictionary:
//!
//! ```
//! use rtc_negotiation::peer_connection::configuration::RTCConfiguration;
//! use rtc_negotiation::peer_connection::configuration::ice_transport_policy::RTCIceTransportPolicy;
//!
//! let cfg: RTCConfiguration = serde_json::from_str(r#"{
//!     "iceServers": [{"urls": ["stun:stun.example.com:19302"]}],
//!     "iceTransportPolicy": "all"
//! }"#).unwrap();
//!
//! assert_eq!(cfg.ice_transport_policy(), RTCIceTransportPolicy::All);
//! assert!(cfg.validate().is_ok());
//! ```

pub mod bundle_policy;
pub mod ice_transport_policy;
pub mod offer_answer_options;

use serde::{Deserialize, Serialize};

use crate::peer_connection::transport::ice_server::{RTCIceServer, RTCIceServerUrl};
use bundle_policy::RTCBundlePolicy;
use ice_transport_policy::RTCIceTransportPolicy;
use shared::error::Result;

pub(crate) const UNSPECIFIED_STR: &str = "Unspecified";

/// A Configuration defines how peer-to-peer communication via a connection is
/// established or re-established. Absent options mean "platform default".
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RTCConfiguration {
    /// STUN and TURN servers available to be used by ICE, in order of
    /// preference.
    pub(crate) ice_servers: Vec<RTCIceServer>,

    /// Which candidates the transport is allowed to use.
    pub(crate) ice_transport_policy: RTCIceTransportPolicy,

    /// Media-bundling policy used when gathering ICE candidates.
    pub(crate) bundle_policy: RTCBundlePolicy,

    /// Size of the prefetched ICE pool.
    pub(crate) ice_candidate_pool_size: u8,
}

impl RTCConfiguration {
    pub fn ice_servers(&self) -> &[RTCIceServer] {
        &self.ice_servers
    }

    pub fn ice_transport_policy(&self) -> RTCIceTransportPolicy {
        self.ice_transport_policy
    }

    pub fn bundle_policy(&self) -> RTCBundlePolicy {
        self.bundle_policy
    }

    pub fn ice_candidate_pool_size(&self) -> u8 {
        self.ice_candidate_pool_size
    }

    /// Returns the ICE servers with any query stripped from STUN URLs.
    #[allow(clippy::assigning_clones)]
    pub(crate) fn get_ice_servers(&self) -> Vec<RTCIceServer> {
        let mut ice_servers = self.ice_servers.clone();

        for ice_server in &mut ice_servers {
            for raw_url in &mut ice_server.urls {
                if raw_url.starts_with("stun") {
                    // strip the query from "stun(s):" if present
                    let parts: Vec<&str> = raw_url.split('?').collect();
                    *raw_url = parts[0].to_owned();
                }
            }
        }

        ice_servers
    }

    /// Parses every ICE server URL, failing on the first malformed one.
    pub fn validate(&self) -> Result<Vec<RTCIceServerUrl>> {
        let mut urls = vec![];
        for ice_server in self.get_ice_servers() {
            urls.extend(ice_server.urls()?);
        }
        Ok(urls)
    }
}

#[derive(Default)]
pub struct RTCConfigurationBuilder {
    ice_servers: Vec<RTCIceServer>,
    ice_transport_policy: RTCIceTransportPolicy,
    bundle_policy: RTCBundlePolicy,
    ice_candidate_pool_size: u8,
}

impl RTCConfigurationBuilder {
    pub fn new() -> Self {
        RTCConfigurationBuilder::default()
    }

    pub fn with_ice_servers(mut self, ice_servers: Vec<RTCIceServer>) -> Self {
        self.ice_servers = ice_servers;
        self
    }

    pub fn with_ice_transport_policy(
        mut self,
        ice_transport_policy: RTCIceTransportPolicy,
    ) -> Self {
        self.ice_transport_policy = ice_transport_policy;
        self
    }

    pub fn with_bundle_policy(mut self, bundle_policy: RTCBundlePolicy) -> Self {
        self.bundle_policy = bundle_policy;
        self
    }

    pub fn with_ice_candidate_pool_size(mut self, ice_candidate_pool_size: u8) -> Self {
        self.ice_candidate_pool_size = ice_candidate_pool_size;
        self
    }

    pub fn build(self) -> RTCConfiguration {
        RTCConfiguration {
            ice_servers: self.ice_servers,
            ice_transport_policy: self.ice_transport_policy,
            bundle_policy: self.bundle_policy,
            ice_candidate_pool_size: self.ice_candidate_pool_size,
        }
    }
}
