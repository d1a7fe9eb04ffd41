use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use log::{debug, error, trace, warn};
use shared::error::{Error, Result};

use crate::api::media_engine::{MediaEngine, RTCMediaKind};
use crate::api::secure_transport::SecureTransport;
use crate::data_channel::RTCDataChannelId;
use crate::data_channel::internal::RTCDataChannelInternal;
use crate::data_channel::state::RTCDataChannelState;
use crate::peer_connection::configuration::bundle_policy::RTCBundlePolicy;
use crate::peer_connection::configuration::offer_answer_options::{
    RTCAnswerOptions, RTCOfferOptions,
};
use crate::peer_connection::event::RTCPeerConnectionEvent;
use crate::peer_connection::event::data_channel_event::RTCDataChannelEvent;
use crate::peer_connection::event::ice_event::RTCPeerConnectionIceEvent;
use crate::peer_connection::observer::{
    CompletionObserver, CreateSessionDescriptionObserver, PeerConnectionObserver,
    SetSessionDescriptionObserver,
};
use crate::peer_connection::sdp::{RTCSdpType, RTCSessionDescription};
use crate::peer_connection::state::signaling_state::{StateChangeOp, check_next_signaling_state};
use crate::peer_connection::state::{
    RTCIceConnectionState, RTCIceGatheringState, RTCSignalingState,
};
use crate::peer_connection::transport::{RTCIceCandidate, RTCIceCandidateInit};
use crate::provider::{DescriptionRequest, IceTransport};
use crate::runtime::{Confined, ExecutionContext};

/// Caller-visible copy of the connection states.
///
/// Written only from the signaling context, read from anywhere.
#[derive(Debug)]
pub(crate) struct StateMirror {
    pub(crate) signaling_state: AtomicU8,
    pub(crate) ice_connection_state: AtomicU8,
    pub(crate) ice_gathering_state: AtomicU8,
    pub(crate) close_requested: AtomicBool,
}

impl Default for StateMirror {
    fn default() -> Self {
        Self {
            signaling_state: AtomicU8::new(RTCSignalingState::Stable as u8),
            ice_connection_state: AtomicU8::new(RTCIceConnectionState::New as u8),
            ice_gathering_state: AtomicU8::new(RTCIceGatheringState::New as u8),
            close_requested: AtomicBool::new(false),
        }
    }
}

/// Everything a connection needs from its factory.
pub(crate) struct InternalConfig {
    pub(crate) mirror: Arc<StateMirror>,
    pub(crate) events: PeerConnectionObserver,
    pub(crate) worker: ExecutionContext,
    pub(crate) network: ExecutionContext,
    pub(crate) media_engine: Arc<dyn MediaEngine>,
    pub(crate) bundle_policy: RTCBundlePolicy,
    pub(crate) secure_transport: SecureTransport,
}

/// The connection state machine. Lives on, and is only touched by, the
/// signaling context.
pub(crate) struct PeerConnectionInternal {
    this: Confined<PeerConnectionInternal>,
    mirror: Arc<StateMirror>,
    events: Option<PeerConnectionObserver>,

    signaling_state: RTCSignalingState,
    ice_connection_state: RTCIceConnectionState,
    ice_gathering_state: RTCIceGatheringState,
    is_closed: bool,

    current_local_description: Option<RTCSessionDescription>,
    pending_local_description: Option<RTCSessionDescription>,
    current_remote_description: Option<RTCSessionDescription>,
    pending_remote_description: Option<RTCSessionDescription>,
    /// A remote description is with the transport and not yet committed.
    remote_in_flight: bool,

    last_offer: String,
    last_answer: String,
    last_offer_has_data: bool,
    last_answer_has_data: bool,
    pending_create: Option<CreateSessionDescriptionObserver>,
    session_id: u64,
    session_version: u64,

    data_channels: BTreeMap<RTCDataChannelId, RTCDataChannelInternal>,
    /// A negotiated description with a data section has been applied.
    has_data_section: bool,
    /// The description currently being negotiated carries a data section.
    negotiating_data_section: bool,
    negotiation_needed: bool,

    gathering_started: bool,
    local_candidates: Vec<RTCIceCandidate>,

    transport: Option<Arc<dyn IceTransport>>,
    worker: ExecutionContext,
    network: ExecutionContext,
    media_engine: Arc<dyn MediaEngine>,
    bundle_policy: RTCBundlePolicy,
    _secure_transport: SecureTransport,
}

impl PeerConnectionInternal {
    pub(crate) fn new(this: Confined<PeerConnectionInternal>, config: InternalConfig) -> Self {
        Self {
            this,
            mirror: config.mirror,
            events: Some(config.events),

            signaling_state: RTCSignalingState::Stable,
            ice_connection_state: RTCIceConnectionState::New,
            ice_gathering_state: RTCIceGatheringState::New,
            is_closed: false,

            current_local_description: None,
            pending_local_description: None,
            current_remote_description: None,
            pending_remote_description: None,
            remote_in_flight: false,

            last_offer: String::new(),
            last_answer: String::new(),
            last_offer_has_data: false,
            last_answer_has_data: false,
            pending_create: None,
            session_id: shared::util::generate_session_id(),
            session_version: 0,

            data_channels: BTreeMap::new(),
            has_data_section: false,
            negotiating_data_section: false,
            negotiation_needed: false,

            gathering_started: false,
            local_candidates: vec![],

            transport: None,
            worker: config.worker,
            network: config.network,
            media_engine: config.media_engine,
            bundle_policy: config.bundle_policy,
            _secure_transport: config.secure_transport,
        }
    }

    pub(crate) fn attach_transport(&mut self, transport: Arc<dyn IceTransport>) {
        if self.is_closed {
            let result = self.network.post(move || transport.stop());
            if let Err(err) = result {
                trace!("transport stop skipped: {err}");
            }
            return;
        }

        for dc in self.data_channels.values() {
            Self::open_data_channel_on(&self.network, &transport, dc);
        }
        self.transport = Some(transport);
    }

    fn emit(&self, event: RTCPeerConnectionEvent) {
        if let Some(events) = &self.events {
            events.notify(event);
        }
    }

    fn set_signaling_state(&mut self, next: RTCSignalingState) {
        if next == self.signaling_state {
            return;
        }
        debug!("signaling state {} -> {next}", self.signaling_state);
        self.signaling_state = next;
        self.mirror
            .signaling_state
            .store(next as u8, Ordering::SeqCst);
        self.emit(RTCPeerConnectionEvent::OnSignalingStateChangeEvent(next));
    }

    fn set_ice_connection_state(&mut self, next: RTCIceConnectionState) {
        debug!("ice connection state {} -> {next}", self.ice_connection_state);
        self.ice_connection_state = next;
        self.mirror
            .ice_connection_state
            .store(next as u8, Ordering::SeqCst);
        self.emit(RTCPeerConnectionEvent::OnIceConnectionStateChangeEvent(next));
    }

    fn set_ice_gathering_state(&mut self, next: RTCIceGatheringState) {
        debug!("ice gathering state {} -> {next}", self.ice_gathering_state);
        self.ice_gathering_state = next;
        self.mirror
            .ice_gathering_state
            .store(next as u8, Ordering::SeqCst);
        self.emit(RTCPeerConnectionEvent::OnIceGatheringStateChangeEvent(next));
    }

    fn update_negotiation_needed(&mut self) {
        if self.is_closed || self.signaling_state != RTCSignalingState::Stable {
            return;
        }
        if self.has_data_section {
            self.negotiation_needed = false;
        }
        if self.negotiation_needed {
            self.negotiation_needed = false;
            debug!("negotiation needed");
            self.emit(RTCPeerConnectionEvent::OnNegotiationNeededEvent);
        }
    }

    fn fail_if_closed<T>(&self, observer: CompletionObserver<T>) -> Option<CompletionObserver<T>> {
        if self.is_closed {
            observer.on_failure(Error::ErrConnectionClosed);
            None
        } else {
            Some(observer)
        }
    }

    pub(crate) fn create_offer(
        &mut self,
        options: RTCOfferOptions,
        observer: CreateSessionDescriptionObserver,
    ) {
        let Some(observer) = self.fail_if_closed(observer) else {
            return;
        };
        if self.pending_create.is_some() {
            observer.on_failure(Error::ErrOperationInProgress);
            return;
        }
        if !matches!(
            self.signaling_state,
            RTCSignalingState::Stable | RTCSignalingState::HaveLocalOffer
        ) {
            observer.on_failure(Error::ErrIncorrectSignalingState);
            return;
        }
        for (requested, kind) in [
            (options.offer_to_receive_audio, RTCMediaKind::Audio),
            (options.offer_to_receive_video, RTCMediaKind::Video),
        ] {
            if requested && !self.media_engine.supports(kind) {
                observer.on_failure(Error::ErrConstraintsUnsatisfiable(format!(
                    "media engine has no {kind} support"
                )));
                return;
            }
        }

        let request = self.description_request(RTCSdpType::Offer, options.ice_restart);
        let request = DescriptionRequest {
            audio: options.offer_to_receive_audio,
            ..request
        };
        self.schedule_create(request, observer);
    }

    pub(crate) fn create_answer(
        &mut self,
        _options: RTCAnswerOptions,
        observer: CreateSessionDescriptionObserver,
    ) {
        let Some(observer) = self.fail_if_closed(observer) else {
            return;
        };
        if self.pending_create.is_some() {
            observer.on_failure(Error::ErrOperationInProgress);
            return;
        }
        if !matches!(
            self.signaling_state,
            RTCSignalingState::HaveRemoteOffer | RTCSignalingState::HaveLocalPranswer
        ) {
            observer.on_failure(Error::ErrIncorrectSignalingState);
            return;
        }
        let Some(remote_sdp) = self.pending_remote_description.as_ref().map(|d| d.sdp.clone())
        else {
            observer.on_failure(Error::ErrNoRemoteDescription);
            return;
        };

        let request = self.description_request(RTCSdpType::Answer, false);
        let request = DescriptionRequest {
            data_channels: request.data_channels || remote_sdp.contains("m=application"),
            remote_sdp: Some(remote_sdp),
            ..request
        };
        self.schedule_create(request, observer);
    }

    fn description_request(&mut self, sdp_type: RTCSdpType, ice_restart: bool) -> DescriptionRequest {
        self.session_version += 1;
        DescriptionRequest {
            sdp_type,
            session_id: self.session_id,
            session_version: self.session_version,
            ice_restart,
            data_channels: !self.data_channels.is_empty() || self.has_data_section,
            audio: false,
            bundle_policy: self.bundle_policy,
            remote_sdp: None,
        }
    }

    /// Generates the description on the worker context and resolves
    /// `observer` back on the signaling context.
    fn schedule_create(
        &mut self,
        request: DescriptionRequest,
        observer: CreateSessionDescriptionObserver,
    ) {
        let Some(transport) = self.transport.clone() else {
            observer.on_failure(Error::ErrNoDependencies);
            return;
        };

        self.pending_create = Some(observer);
        let this = self.this.clone();
        let result = self.worker.post(move || {
            let result = transport.create_description(&request);
            let has_data = request.data_channels;
            let sdp_type = request.sdp_type;
            if let Err(err) =
                this.post(move |pc| pc.on_description_created(sdp_type, has_data, result))
            {
                trace!("created description dropped: {err}");
            }
        });

        if let Err(err) = result {
            warn!("worker unavailable for {}: {err}", self.signaling_state);
            if let Some(observer) = self.pending_create.take() {
                observer.on_failure(Error::ErrNoDependencies);
            }
        }
    }

    fn on_description_created(&mut self, sdp_type: RTCSdpType, has_data: bool, result: Result<String>) {
        let Some(observer) = self.pending_create.take() else {
            trace!("created {sdp_type} has no waiting observer");
            return;
        };

        match result {
            Ok(sdp) => {
                if sdp_type == RTCSdpType::Offer {
                    self.last_offer.clone_from(&sdp);
                    self.last_offer_has_data = has_data;
                } else {
                    self.last_answer.clone_from(&sdp);
                    self.last_answer_has_data = has_data;
                }
                debug!("created {sdp_type}, {} bytes", sdp.len());
                observer.on_success(RTCSessionDescription { sdp_type, sdp });
            }
            Err(err) => {
                warn!("create {sdp_type} failed: {err}");
                observer.on_failure(err);
            }
        }
    }

    /// Returns the signaling state `sd` leads to, without applying it.
    fn next_signaling_state(
        &self,
        sd: &RTCSessionDescription,
        op: StateChangeOp,
    ) -> Result<RTCSignalingState> {
        let next = match (op, sd.sdp_type) {
            (_, RTCSdpType::Unspecified) => return Err(Error::ErrPeerConnSDPTypeInvalidValue),
            (_, RTCSdpType::Rollback) => RTCSignalingState::Stable,
            // stable->SetLocal(offer)->have-local-offer
            (StateChangeOp::SetLocal, RTCSdpType::Offer) => {
                if sd.sdp.is_empty() || sd.sdp != self.last_offer {
                    return Err(Error::ErrSDPDoesNotMatchOffer);
                }
                RTCSignalingState::HaveLocalOffer
            }
            // have-remote-offer->SetLocal(answer)->stable
            // have-local-pranswer->SetLocal(answer)->stable
            (StateChangeOp::SetLocal, RTCSdpType::Answer) => {
                if sd.sdp.is_empty() || sd.sdp != self.last_answer {
                    return Err(Error::ErrSDPDoesNotMatchAnswer);
                }
                RTCSignalingState::Stable
            }
            // have-remote-offer->SetLocal(pranswer)->have-local-pranswer
            (StateChangeOp::SetLocal, RTCSdpType::Pranswer) => {
                if sd.sdp.is_empty() || sd.sdp != self.last_answer {
                    return Err(Error::ErrSDPDoesNotMatchAnswer);
                }
                RTCSignalingState::HaveLocalPranswer
            }
            // stable->SetRemote(offer)->have-remote-offer
            (StateChangeOp::SetRemote, RTCSdpType::Offer) => RTCSignalingState::HaveRemoteOffer,
            // have-local-offer->SetRemote(answer)->stable
            // have-remote-pranswer->SetRemote(answer)->stable
            (StateChangeOp::SetRemote, RTCSdpType::Answer) => RTCSignalingState::Stable,
            // have-local-offer->SetRemote(pranswer)->have-remote-pranswer
            (StateChangeOp::SetRemote, RTCSdpType::Pranswer) => {
                RTCSignalingState::HaveRemotePranswer
            }
        };

        check_next_signaling_state(self.signaling_state, next, op, sd.sdp_type)
    }

    fn apply_description(&mut self, sd: RTCSessionDescription, op: StateChangeOp) {
        match (op, sd.sdp_type) {
            (StateChangeOp::SetLocal, RTCSdpType::Offer) => {
                self.negotiating_data_section = self.last_offer_has_data;
                self.pending_local_description = Some(sd);
            }
            (StateChangeOp::SetLocal, RTCSdpType::Pranswer) => {
                self.pending_local_description = Some(sd);
            }
            (StateChangeOp::SetLocal, RTCSdpType::Answer) => {
                self.negotiating_data_section = self.last_answer_has_data;
                self.pending_local_description = None;
                self.current_remote_description = self.pending_remote_description.take();
                self.current_local_description = Some(sd);
            }
            (StateChangeOp::SetRemote, RTCSdpType::Offer | RTCSdpType::Pranswer) => {
                self.pending_remote_description = Some(sd);
            }
            (StateChangeOp::SetRemote, RTCSdpType::Answer) => {
                self.pending_remote_description = None;
                self.current_local_description = self.pending_local_description.take();
                self.current_remote_description = Some(sd);
            }
            (_, RTCSdpType::Rollback) => {
                self.negotiating_data_section = false;
                self.pending_local_description = None;
                self.pending_remote_description = None;
            }
            (_, RTCSdpType::Unspecified) => {}
        }
    }

    fn commit_description(
        &mut self,
        sd: RTCSessionDescription,
        op: StateChangeOp,
        next: RTCSignalingState,
    ) {
        let sdp_type = sd.sdp_type;
        self.apply_description(sd, op);

        if next == RTCSignalingState::Stable && sdp_type != RTCSdpType::Rollback {
            self.has_data_section |= self.negotiating_data_section;
        }
        self.set_signaling_state(next);

        if op == StateChangeOp::SetLocal && sdp_type != RTCSdpType::Rollback {
            self.start_gathering();
        }
    }

    pub(crate) fn set_local_description(
        &mut self,
        mut desc: RTCSessionDescription,
        observer: SetSessionDescriptionObserver,
    ) {
        let Some(observer) = self.fail_if_closed(observer) else {
            return;
        };
        if self.remote_in_flight {
            observer.on_failure(Error::ErrOperationInProgress);
            return;
        }

        // JSEP 5.4: an empty description means the last one created
        if desc.sdp.is_empty() {
            match desc.sdp_type {
                RTCSdpType::Answer | RTCSdpType::Pranswer => {
                    desc.sdp.clone_from(&self.last_answer)
                }
                RTCSdpType::Offer => desc.sdp.clone_from(&self.last_offer),
                RTCSdpType::Rollback => {}
                _ => {
                    observer.on_failure(Error::ErrPeerConnSDPTypeInvalidValueSetLocalDescription(
                        desc.sdp_type.to_string(),
                    ));
                    return;
                }
            }
        }

        match self.next_signaling_state(&desc, StateChangeOp::SetLocal) {
            Ok(next) => {
                self.commit_description(desc, StateChangeOp::SetLocal, next);
                observer.on_success(());
                self.update_negotiation_needed();
            }
            Err(err) => {
                debug!("set local {} rejected: {err}", desc.sdp_type);
                observer.on_failure(err);
            }
        }
    }

    pub(crate) fn set_remote_description(
        &mut self,
        desc: RTCSessionDescription,
        observer: SetSessionDescriptionObserver,
    ) {
        let Some(observer) = self.fail_if_closed(observer) else {
            return;
        };
        if self.remote_in_flight {
            observer.on_failure(Error::ErrOperationInProgress);
            return;
        }
        if let Err(err) = self.next_signaling_state(&desc, StateChangeOp::SetRemote) {
            debug!("set remote {} rejected: {err}", desc.sdp_type);
            observer.on_failure(err);
            return;
        }
        if desc.sdp_type == RTCSdpType::Rollback {
            self.on_remote_description_applied(desc, Ok(()), observer);
            return;
        }
        let Some(transport) = self.transport.clone() else {
            observer.on_failure(Error::ErrNoDependencies);
            return;
        };

        // The transport sees the description first and state only moves once
        // it accepted it. Until then no other description may be set, so the
        // transition checked above still holds when the result comes back.
        self.remote_in_flight = true;
        let this = self.this.clone();
        let result = self.network.post(move || {
            let result = transport.set_remote_description(&desc);
            if let Err(err) =
                this.post(move |pc| pc.on_remote_description_applied(desc, result, observer))
            {
                trace!("remote description result dropped: {err}");
            }
        });
        if let Err(err) = result {
            warn!("network unavailable for remote description: {err}");
            self.remote_in_flight = false;
        }
    }

    fn on_remote_description_applied(
        &mut self,
        desc: RTCSessionDescription,
        result: Result<()>,
        observer: SetSessionDescriptionObserver,
    ) {
        self.remote_in_flight = false;
        let Some(observer) = self.fail_if_closed(observer) else {
            return;
        };
        if let Err(err) = result {
            warn!("transport rejected remote {}: {err}", desc.sdp_type);
            observer.on_failure(err);
            return;
        }

        match self.next_signaling_state(&desc, StateChangeOp::SetRemote) {
            Ok(next) => {
                self.commit_description(desc, StateChangeOp::SetRemote, next);
                observer.on_success(());
                self.update_negotiation_needed();
            }
            Err(err) => observer.on_failure(err),
        }
    }

    pub(crate) fn add_ice_candidate(
        &mut self,
        candidate: RTCIceCandidateInit,
        observer: SetSessionDescriptionObserver,
    ) {
        let Some(observer) = self.fail_if_closed(observer) else {
            return;
        };
        if self.pending_remote_description.is_none() && self.current_remote_description.is_none() {
            observer.on_failure(Error::ErrNoRemoteDescription);
            return;
        }
        if candidate.candidate.is_empty() {
            observer.on_failure(Error::ErrEmptyCandidate);
            return;
        }
        let Some(transport) = self.transport.clone() else {
            observer.on_failure(Error::ErrNoDependencies);
            return;
        };

        let this = self.this.clone();
        let result = self.network.post(move || {
            let result = transport.add_remote_candidate(&candidate);
            if let Err(err) = this.post(move |_| observer.resolve(result)) {
                trace!("remote candidate result dropped: {err}");
            }
        });
        if let Err(err) = result {
            warn!("network unavailable for remote candidate: {err}");
        }
    }

    fn start_gathering(&mut self) {
        if self.gathering_started {
            return;
        }
        let Some(transport) = self.transport.clone() else {
            return;
        };
        self.gathering_started = true;
        if self.ice_gathering_state == RTCIceGatheringState::New {
            self.set_ice_gathering_state(RTCIceGatheringState::Gathering);
        }

        let this = self.this.clone();
        let result = self.network.post(move || {
            if let Err(err) = transport.start_gathering() {
                error!("ice gathering failed to start: {err}");
                if let Err(err) = this.post(|pc| pc.handle_gathering_complete()) {
                    trace!("gathering completion dropped: {err}");
                }
            }
        });
        if let Err(err) = result {
            warn!("network unavailable for gathering: {err}");
        }
    }

    pub(crate) fn handle_local_candidate(&mut self, candidate: RTCIceCandidate, url: Option<String>) {
        if self.is_closed || self.ice_gathering_state == RTCIceGatheringState::Complete {
            trace!(
                "ignoring local candidate {candidate} in gathering state {}",
                self.ice_gathering_state
            );
            return;
        }
        if self.ice_gathering_state == RTCIceGatheringState::New {
            self.set_ice_gathering_state(RTCIceGatheringState::Gathering);
        }

        debug!("local candidate {candidate}");
        self.local_candidates.push(candidate.clone());
        self.emit(RTCPeerConnectionEvent::OnIceCandidateEvent(
            RTCPeerConnectionIceEvent {
                candidate,
                url: url.unwrap_or_default(),
            },
        ));
    }

    pub(crate) fn handle_gathering_complete(&mut self) {
        if self.is_closed
            || !self
                .ice_gathering_state
                .can_advance_to(RTCIceGatheringState::Complete)
        {
            trace!(
                "ignoring gathering complete in state {}",
                self.ice_gathering_state
            );
            return;
        }
        self.set_ice_gathering_state(RTCIceGatheringState::Complete);
    }

    pub(crate) fn handle_ice_connection_state_change(&mut self, next: RTCIceConnectionState) {
        if self.is_closed {
            trace!("ignoring ice connection state {next} after close");
            return;
        }
        if !self.ice_connection_state.can_transition_to(next) {
            if self.ice_connection_state.is_terminal() || next == self.ice_connection_state {
                trace!(
                    "ignoring ice connection state {} -> {next}",
                    self.ice_connection_state
                );
            } else {
                warn!(
                    "illegal ice connection state {} -> {next}",
                    self.ice_connection_state
                );
            }
            return;
        }
        self.set_ice_connection_state(next);
    }

    pub(crate) fn handle_data_channel_state_change(
        &mut self,
        id: RTCDataChannelId,
        next: RTCDataChannelState,
    ) {
        if self.is_closed {
            trace!("ignoring data channel {id} state {next} after close");
            return;
        }
        let Some(dc) = self.data_channels.get(&id) else {
            warn!("state {next} for unknown data channel {id}");
            return;
        };
        if !dc.set_ready_state(next) {
            return;
        }

        let event = match next {
            RTCDataChannelState::Open => RTCDataChannelEvent::OnOpen(id),
            RTCDataChannelState::Closing => RTCDataChannelEvent::OnClosing(id),
            RTCDataChannelState::Closed => RTCDataChannelEvent::OnClose(id),
            _ => return,
        };
        self.emit(RTCPeerConnectionEvent::OnDataChannel(event));
    }

    fn open_data_channel_on(
        network: &ExecutionContext,
        transport: &Arc<dyn IceTransport>,
        dc: &RTCDataChannelInternal,
    ) {
        let transport = Arc::clone(transport);
        let params = dc.params.clone();
        let result = network.post(move || {
            if let Err(err) = transport.open_data_channel(&params) {
                warn!("data channel {} failed to open: {err}", params.id);
            }
        });
        if let Err(err) = result {
            warn!("network unavailable for data channel: {err}");
        }
    }

    pub(crate) fn add_data_channel(&mut self, dc: RTCDataChannelInternal) {
        if self.is_closed {
            dc.set_ready_state(RTCDataChannelState::Closed);
            return;
        }

        let id = dc.params.id;
        if let Some(previous) = self.data_channels.get(&id) {
            if previous.ready_state() != RTCDataChannelState::Closed {
                warn!("data channel id {id} already in use, closing the new channel");
                dc.set_ready_state(RTCDataChannelState::Closed);
                return;
            }
        }

        debug!("data channel {id} ({}) created", dc.params.label);
        if let Some(transport) = &self.transport {
            Self::open_data_channel_on(&self.network, transport, &dc);
        }
        self.data_channels.insert(id, dc);

        if !self.has_data_section {
            self.negotiation_needed = true;
            self.update_negotiation_needed();
        }
    }

    pub(crate) fn close_data_channel(&mut self, id: RTCDataChannelId) {
        if self.is_closed {
            return;
        }
        let Some(dc) = self.data_channels.get(&id) else {
            return;
        };
        if dc.ready_state() >= RTCDataChannelState::Closing {
            return;
        }

        dc.set_ready_state(RTCDataChannelState::Closing);
        self.emit(RTCPeerConnectionEvent::OnDataChannel(
            RTCDataChannelEvent::OnClosing(id),
        ));

        match self.transport.clone() {
            Some(transport) => {
                let result = self.network.post(move || {
                    if let Err(err) = transport.close_data_channel(id) {
                        warn!("data channel {id} failed to close: {err}");
                    }
                });
                if let Err(err) = result {
                    warn!("network unavailable for data channel close: {err}");
                }
            }
            None => self.handle_data_channel_state_change(id, RTCDataChannelState::Closed),
        }
    }

    /// Stops ICE, closes every data channel, moves signaling to closed and
    /// delivers the last connection event.
    pub(crate) fn close(&mut self) {
        if self.is_closed {
            trace!("connection already closed");
            return;
        }
        debug!("closing connection");
        self.is_closed = true;
        self.mirror.close_requested.store(true, Ordering::SeqCst);

        if let Some(observer) = self.pending_create.take() {
            observer.on_failure(Error::ErrConnectionClosed);
        }

        if let Some(transport) = self.transport.take() {
            let result = self.network.post(move || transport.stop());
            if let Err(err) = result {
                warn!("network unavailable for transport stop: {err}");
            }
        }

        if self
            .ice_connection_state
            .can_transition_to(RTCIceConnectionState::Closed)
        {
            self.set_ice_connection_state(RTCIceConnectionState::Closed);
        }

        let closed: Vec<RTCDataChannelId> = self
            .data_channels
            .values()
            .filter(|dc| dc.set_ready_state(RTCDataChannelState::Closed))
            .map(|dc| dc.params.id)
            .collect();
        for id in closed {
            self.emit(RTCPeerConnectionEvent::OnDataChannel(
                RTCDataChannelEvent::OnClose(id),
            ));
        }

        self.set_signaling_state(RTCSignalingState::Closed);
        self.events = None;
    }

    pub(crate) fn local_description(
        &self,
        observer: CompletionObserver<Option<RTCSessionDescription>>,
    ) {
        observer.on_success(
            self.pending_local_description
                .clone()
                .or_else(|| self.current_local_description.clone()),
        );
    }

    pub(crate) fn remote_description(
        &self,
        observer: CompletionObserver<Option<RTCSessionDescription>>,
    ) {
        observer.on_success(
            self.pending_remote_description
                .clone()
                .or_else(|| self.current_remote_description.clone()),
        );
    }

    pub(crate) fn local_candidates(&self, observer: CompletionObserver<Vec<RTCIceCandidate>>) {
        observer.on_success(self.local_candidates.clone());
    }
}
