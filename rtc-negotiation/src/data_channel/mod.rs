//! Data channels.
//!
//! A channel is created synchronously by
//! [`RTCPeerConnection::create_data_channel`](crate::peer_connection::RTCPeerConnection::create_data_channel)
//! and starts out `connecting`. The transport opens and closes it; the
//! connection relays each change as an
//! [`RTCDataChannelEvent`](crate::peer_connection::event::data_channel_event::RTCDataChannelEvent).

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use shared::error::Result;

use crate::peer_connection::internal::PeerConnectionInternal;
use crate::runtime::Confined;
use state::RTCDataChannelState;

pub mod init;
pub(crate) mod internal;
pub mod state;

pub type RTCDataChannelId = u16;

/// Channel parameters, as handed to the transport.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct DataChannelParameters {
    pub id: RTCDataChannelId,
    pub label: String,
    pub protocol: String,
    pub ordered: bool,
    pub max_packet_life_time: Option<u16>,
    pub max_retransmits: Option<u16>,
    pub negotiated: bool,
}

/// Caller handle to a data channel.
#[derive(Clone)]
pub struct RTCDataChannel {
    pub(crate) params: DataChannelParameters,
    pub(crate) ready_state: Arc<AtomicU8>,
    pub(crate) connection: Confined<PeerConnectionInternal>,
}

impl fmt::Debug for RTCDataChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RTCDataChannel")
            .field("params", &self.params)
            .field("ready_state", &self.ready_state())
            .finish()
    }
}

impl RTCDataChannel {
    pub fn id(&self) -> RTCDataChannelId {
        self.params.id
    }

    pub fn label(&self) -> &str {
        &self.params.label
    }

    pub fn ordered(&self) -> bool {
        self.params.ordered
    }

    pub fn protocol(&self) -> &str {
        &self.params.protocol
    }

    pub fn negotiated(&self) -> bool {
        self.params.negotiated
    }

    pub fn max_packet_life_time(&self) -> Option<u16> {
        self.params.max_packet_life_time
    }

    pub fn max_retransmits(&self) -> Option<u16> {
        self.params.max_retransmits
    }

    pub fn ready_state(&self) -> RTCDataChannelState {
        self.ready_state.load(Ordering::SeqCst).into()
    }

    /// Starts the closing procedure. Closing an already closing or closed
    /// channel is a no-op.
    pub fn close(&self) -> Result<()> {
        let id = self.params.id;
        self.connection.post(move |pc| pc.close_data_channel(id))
    }
}
