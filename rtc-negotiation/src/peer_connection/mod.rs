pub mod configuration;
pub mod event;
pub(crate) mod internal;
pub mod observer;
pub mod sdp;
pub mod state;
pub mod transport;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex};

use log::trace;
use shared::error::{Error, Result};

use crate::data_channel::init::RTCDataChannelInit;
use crate::data_channel::internal::RTCDataChannelInternal;
use crate::data_channel::state::RTCDataChannelState;
use crate::data_channel::{DataChannelParameters, RTCDataChannel, RTCDataChannelId};
use crate::runtime::Confined;
use configuration::offer_answer_options::{RTCAnswerOptions, RTCOfferOptions};
use internal::{PeerConnectionInternal, StateMirror};
use observer::{CompletionObserver, Pending};
use sdp::RTCSessionDescription;
use state::{RTCIceConnectionState, RTCIceGatheringState, RTCSignalingState};
use transport::{RTCIceCandidate, RTCIceCandidateInit};

/// Label and protocol are limited to 65535 bytes, the size of their length
/// field in the DCEP open message.
const MAX_DATA_CHANNEL_STRING_LEN: usize = 65535;

/// Ready states of the channels created through this handle, by id.
type DataChannelStates = BTreeMap<RTCDataChannelId, Arc<AtomicU8>>;

/// Lowest even id not held by a live channel.
fn generate_data_channel_id(data_channels: &DataChannelStates) -> Result<RTCDataChannelId> {
    let mut id: RTCDataChannelId = 0;
    while id < RTCDataChannelId::MAX - 1 {
        if data_channels.contains_key(&id) {
            id += 2;
        } else {
            return Ok(id);
        }
    }

    Err(Error::ErrMaxDataChannelID)
}

/// A connection between the local process and one remote peer.
///
/// Every operation is asynchronous: it is queued on the signaling context and
/// its outcome is delivered through the returned [`Pending`]. State getters
/// read a mirror the signaling context keeps current, so they never block.
///
/// Dropping the handle closes the connection.
pub struct RTCPeerConnection {
    connection: Confined<PeerConnectionInternal>,
    mirror: Arc<StateMirror>,
    data_channels: Mutex<DataChannelStates>,
}

impl fmt::Debug for RTCPeerConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RTCPeerConnection")
            .field("signaling_state", &self.signaling_state())
            .field("ice_connection_state", &self.ice_connection_state())
            .field("ice_gathering_state", &self.ice_gathering_state())
            .finish()
    }
}

impl RTCPeerConnection {
    pub(crate) fn new(connection: Confined<PeerConnectionInternal>, mirror: Arc<StateMirror>) -> Self {
        Self {
            connection,
            mirror,
            data_channels: Mutex::new(BTreeMap::new()),
        }
    }

    /// Queues `f` on the signaling context with a fresh observer. If the
    /// context is gone the observer is dropped and the pending resolves to
    /// `ErrConnectionClosed`.
    fn call<T, F>(&self, f: F) -> Pending<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut PeerConnectionInternal, CompletionObserver<T>) + Send + 'static,
    {
        let (observer, pending) = CompletionObserver::channel();
        if let Err(err) = self.connection.post(move |pc| f(pc, observer)) {
            trace!("connection call dropped: {err}");
        }
        pending
    }

    /// Creates an offer. Resolves with the description, or fails with
    /// `ErrOperationInProgress` if another create is still outstanding.
    pub fn create_offer(&self, options: Option<RTCOfferOptions>) -> Pending<RTCSessionDescription> {
        let options = options.unwrap_or_default();
        self.call(move |pc, observer| pc.create_offer(options, observer))
    }

    /// Creates an answer to the pending remote offer.
    pub fn create_answer(
        &self,
        options: Option<RTCAnswerOptions>,
    ) -> Pending<RTCSessionDescription> {
        let options = options.unwrap_or_default();
        self.call(move |pc, observer| pc.create_answer(options, observer))
    }

    /// Applies a local description. An empty `sdp` stands for the last
    /// created offer or answer of the same type.
    pub fn set_local_description(&self, desc: RTCSessionDescription) -> Pending<()> {
        self.call(move |pc, observer| pc.set_local_description(desc, observer))
    }

    pub fn set_remote_description(&self, desc: RTCSessionDescription) -> Pending<()> {
        self.call(move |pc, observer| pc.set_remote_description(desc, observer))
    }

    /// Hands a remote candidate to the transport. Requires a remote
    /// description.
    pub fn add_ice_candidate(&self, candidate: RTCIceCandidateInit) -> Pending<()> {
        self.call(move |pc, observer| pc.add_ice_candidate(candidate, observer))
    }

    /// Pending local description if any, the current one otherwise.
    pub fn local_description(&self) -> Pending<Option<RTCSessionDescription>> {
        self.call(|pc, observer| pc.local_description(observer))
    }

    /// Pending remote description if any, the current one otherwise.
    pub fn remote_description(&self) -> Pending<Option<RTCSessionDescription>> {
        self.call(|pc, observer| pc.remote_description(observer))
    }

    /// Every local candidate gathered so far.
    pub fn local_candidates(&self) -> Pending<Vec<RTCIceCandidate>> {
        self.call(|pc, observer| pc.local_candidates(observer))
    }

    /// Creates a data channel.
    ///
    /// The handle is returned right away in `connecting`; the channel is
    /// registered with the connection asynchronously and opens once the
    /// transport can carry it. Without `negotiated` the lowest free even id
    /// is used. A `negotiated` id held by a channel that is not closed yet
    /// fails with `ErrStreamIdInUse`.
    pub fn create_data_channel(
        &self,
        label: &str,
        options: Option<RTCDataChannelInit>,
    ) -> Result<RTCDataChannel> {
        if self.is_closed() {
            return Err(Error::ErrConnectionClosed);
        }

        let options = options.unwrap_or_default();
        if label.len() > MAX_DATA_CHANNEL_STRING_LEN {
            return Err(Error::ErrStringSizeLimit);
        }
        let protocol = options.protocol.unwrap_or_default();
        if protocol.len() > MAX_DATA_CHANNEL_STRING_LEN {
            return Err(Error::ErrProtocolTooLarge);
        }
        if options.max_packet_life_time.is_some() && options.max_retransmits.is_some() {
            return Err(Error::ErrRetransmitsOrPacketLifeTime);
        }

        let mut data_channels = self.data_channels.lock()?;
        data_channels.retain(|_, ready_state| {
            RTCDataChannelState::from(ready_state.load(Ordering::SeqCst))
                != RTCDataChannelState::Closed
        });
        let (id, negotiated) = match options.negotiated {
            Some(id) if data_channels.contains_key(&id) => {
                return Err(Error::ErrStreamIdInUse(id));
            }
            Some(id) => (id, true),
            None => (generate_data_channel_id(&data_channels)?, false),
        };

        let internal = RTCDataChannelInternal::new(DataChannelParameters {
            id,
            label: label.to_owned(),
            protocol,
            ordered: options.ordered.unwrap_or(true),
            max_packet_life_time: options.max_packet_life_time,
            max_retransmits: options.max_retransmits,
            negotiated,
        });
        let data_channel = RTCDataChannel {
            params: internal.params.clone(),
            ready_state: Arc::clone(&internal.ready_state),
            connection: self.connection.clone(),
        };

        let ready_state = Arc::clone(&internal.ready_state);
        self.connection
            .post(move |pc| pc.add_data_channel(internal))
            .map_err(|_| Error::ErrConnectionClosed)?;
        data_channels.insert(id, ready_state);

        Ok(data_channel)
    }

    /// Closes the connection. Idempotent; `is_closed` reports true as soon
    /// as this returns.
    pub fn close(&self) -> Result<()> {
        self.mirror.close_requested.store(true, Ordering::SeqCst);
        self.connection.post(|pc| pc.close())
    }

    pub fn is_closed(&self) -> bool {
        self.mirror.close_requested.load(Ordering::SeqCst)
    }

    pub fn signaling_state(&self) -> RTCSignalingState {
        self.mirror.signaling_state.load(Ordering::SeqCst).into()
    }

    pub fn ice_connection_state(&self) -> RTCIceConnectionState {
        self.mirror.ice_connection_state.load(Ordering::SeqCst).into()
    }

    pub fn ice_gathering_state(&self) -> RTCIceGatheringState {
        self.mirror.ice_gathering_state.load(Ordering::SeqCst).into()
    }
}

impl Drop for RTCPeerConnection {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            trace!("close on drop skipped: {err}");
        }
        if let Err(err) = self.connection.release() {
            trace!("release on drop skipped: {err}");
        }
    }
}
