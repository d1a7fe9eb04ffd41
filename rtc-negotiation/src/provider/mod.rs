//! Transport provider seam.
//!
//! The connection never touches sockets or SDP grammar itself. It asks a
//! [`TransportProvider`] for one [`IceTransport`] per connection, calls it on
//! the worker context (description generation) or the network context
//! (everything else), and receives its callbacks through a
//! [`TransportEventSink`], which re-enters the connection on the signaling
//! context.

pub mod loopback;

use std::sync::Arc;

use log::trace;
use shared::error::Result;

use crate::data_channel::state::RTCDataChannelState;
use crate::data_channel::{DataChannelParameters, RTCDataChannelId};
use crate::peer_connection::configuration::bundle_policy::RTCBundlePolicy;
use crate::peer_connection::configuration::ice_transport_policy::RTCIceTransportPolicy;
use crate::peer_connection::internal::PeerConnectionInternal;
use crate::peer_connection::sdp::{RTCSdpType, RTCSessionDescription};
use crate::peer_connection::state::RTCIceConnectionState;
use crate::peer_connection::transport::{
    RTCIceCandidate, RTCIceCandidateInit, RTCIceServer, RTCIceServerUrl,
};
use crate::runtime::Confined;

pub use loopback::LoopbackTransportProvider;

/// Per-connection settings handed to [`TransportProvider::create_transport`].
#[derive(Default, Debug, Clone)]
pub struct TransportConfig {
    pub ice_servers: Vec<RTCIceServer>,
    /// `ice_servers` already parsed and validated.
    pub ice_urls: Vec<RTCIceServerUrl>,
    pub ice_transport_policy: RTCIceTransportPolicy,
    pub bundle_policy: RTCBundlePolicy,
    pub ice_candidate_pool_size: u8,
    /// `sha-256 ab:cd:..` fingerprint of the process DTLS identity.
    pub fingerprint: String,
}

/// What the connection wants a generated description to contain.
#[derive(Default, Debug, Clone)]
pub struct DescriptionRequest {
    pub sdp_type: RTCSdpType,
    pub session_id: u64,
    pub session_version: u64,
    /// Regenerate ICE credentials.
    pub ice_restart: bool,
    /// Include an application (data channel) section.
    pub data_channels: bool,
    /// Include a receive-only audio section.
    pub audio: bool,
    pub bundle_policy: RTCBundlePolicy,
    /// The remote offer being answered, if any.
    pub remote_sdp: Option<String>,
}

pub trait TransportProvider: Send + Sync {
    /// Creates the transport of one connection. `sink` is how the transport
    /// reports back; it stays valid for the transport's whole lifetime.
    fn create_transport(
        &self,
        config: &TransportConfig,
        sink: TransportEventSink,
    ) -> Result<Arc<dyn IceTransport>>;
}

pub trait IceTransport: Send + Sync {
    /// Runs on the worker context.
    fn create_description(&self, request: &DescriptionRequest) -> Result<String>;

    /// Starts candidate gathering. Runs on the network context.
    fn start_gathering(&self) -> Result<()>;

    /// Runs on the network context.
    fn set_remote_description(&self, description: &RTCSessionDescription) -> Result<()>;

    /// Runs on the network context.
    fn add_remote_candidate(&self, candidate: &RTCIceCandidateInit) -> Result<()>;

    /// Registers a channel. The transport reports it open through the sink
    /// once it can carry data. Runs on the network context.
    fn open_data_channel(&self, params: &DataChannelParameters) -> Result<()>;

    /// Runs on the network context.
    fn close_data_channel(&self, id: RTCDataChannelId) -> Result<()>;

    /// Shuts the transport down. Runs on the network context.
    fn stop(&self);
}

/// Callback surface of an [`IceTransport`].
///
/// Every method posts to the owning connection's signaling context and returns
/// immediately. Calls made after the connection was closed or dropped are
/// ignored.
#[derive(Clone, Debug)]
pub struct TransportEventSink {
    connection: Confined<PeerConnectionInternal>,
}

impl TransportEventSink {
    pub(crate) fn new(connection: Confined<PeerConnectionInternal>) -> Self {
        Self { connection }
    }

    pub fn on_local_candidate(&self, candidate: RTCIceCandidate, url: Option<String>) {
        self.post(move |pc| pc.handle_local_candidate(candidate, url));
    }

    pub fn on_gathering_complete(&self) {
        self.post(|pc| pc.handle_gathering_complete());
    }

    pub fn on_ice_connection_state_change(&self, state: RTCIceConnectionState) {
        self.post(move |pc| pc.handle_ice_connection_state_change(state));
    }

    pub fn on_data_channel_state_change(&self, id: RTCDataChannelId, state: RTCDataChannelState) {
        self.post(move |pc| pc.handle_data_channel_state_change(id, state));
    }

    fn post<F>(&self, f: F)
    where
        F: FnOnce(&mut PeerConnectionInternal) + Send + 'static,
    {
        if let Err(err) = self.connection.post(f) {
            trace!("transport event dropped: {err}");
        }
    }
}
