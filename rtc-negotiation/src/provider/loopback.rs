//! In-process transport provider.
//!
//! Generates real session descriptions and binds one real UDP socket per
//! connection for its host candidate, but never sends a packet: connectivity
//! checks are simulated from what the connection has told the transport.

use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::net::UdpSocket;
use std::sync::{Arc, Mutex};

use log::{debug, trace, warn};
use shared::error::Result;
use shared::util::{generate_pwd, generate_ufrag};

use super::{DescriptionRequest, IceTransport, TransportConfig, TransportEventSink, TransportProvider};
use crate::data_channel::state::RTCDataChannelState;
use crate::data_channel::{DataChannelParameters, RTCDataChannelId};
use crate::peer_connection::configuration::bundle_policy::RTCBundlePolicy;
use crate::peer_connection::configuration::ice_transport_policy::RTCIceTransportPolicy;
use crate::peer_connection::sdp::{RTCSdpType, RTCSessionDescription};
use crate::peer_connection::state::RTCIceConnectionState;
use crate::peer_connection::transport::{RTCIceCandidate, RTCIceCandidateInit};

const LOOPBACK_ADDRESS: &str = "127.0.0.1";
const SCTP_PORT: u16 = 5000;
const HOST_CANDIDATE_PRIORITY: u32 = 2130706431;

#[derive(Default, Debug, Clone)]
pub struct LoopbackTransportProvider;

impl LoopbackTransportProvider {
    pub fn new() -> Self {
        LoopbackTransportProvider
    }
}

impl TransportProvider for LoopbackTransportProvider {
    fn create_transport(
        &self,
        config: &TransportConfig,
        sink: TransportEventSink,
    ) -> Result<Arc<dyn IceTransport>> {
        Ok(Arc::new(LoopbackTransport::new(config.clone(), sink)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct IceCredentials {
    ufrag: String,
    pwd: String,
}

impl IceCredentials {
    fn generate() -> Self {
        Self {
            ufrag: generate_ufrag(),
            pwd: generate_pwd(),
        }
    }
}

#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
enum ChecksState {
    #[default]
    Idle,
    Connected,
    Failed,
}

#[derive(Debug)]
struct LoopbackState {
    credentials: IceCredentials,
    socket: Option<UdpSocket>,
    local_candidates: usize,
    gathering_complete: bool,
    has_remote_description: bool,
    remote_candidates: usize,
    checks: ChecksState,
    data_channels: BTreeSet<RTCDataChannelId>,
    stopped: bool,
}

struct LoopbackTransport {
    config: TransportConfig,
    sink: TransportEventSink,
    state: Mutex<LoopbackState>,
}

impl LoopbackTransport {
    fn new(config: TransportConfig, sink: TransportEventSink) -> Self {
        Self {
            config,
            sink,
            state: Mutex::new(LoopbackState {
                credentials: IceCredentials::generate(),
                socket: None,
                local_candidates: 0,
                gathering_complete: false,
                has_remote_description: false,
                remote_candidates: 0,
                checks: ChecksState::Idle,
                data_channels: BTreeSet::new(),
                stopped: false,
            }),
        }
    }

    /// Runs the simulated connectivity checks once everything they need is
    /// known.
    fn maybe_run_checks(&self, state: &mut LoopbackState) {
        if state.stopped
            || state.checks != ChecksState::Idle
            || !state.gathering_complete
            || !state.has_remote_description
            || state.remote_candidates == 0
        {
            return;
        }

        self.sink
            .on_ice_connection_state_change(RTCIceConnectionState::Checking);
        if state.local_candidates == 0 {
            debug!("no local candidates, connectivity checks failed");
            state.checks = ChecksState::Failed;
            self.sink
                .on_ice_connection_state_change(RTCIceConnectionState::Failed);
            return;
        }

        state.checks = ChecksState::Connected;
        self.sink
            .on_ice_connection_state_change(RTCIceConnectionState::Connected);
        self.sink
            .on_ice_connection_state_change(RTCIceConnectionState::Completed);
        for id in &state.data_channels {
            self.sink
                .on_data_channel_state_change(*id, RTCDataChannelState::Open);
        }
    }

    fn gather_host_candidate(&self, state: &mut LoopbackState) -> Result<()> {
        let socket = UdpSocket::bind((LOOPBACK_ADDRESS, 0))?;
        let port = socket.local_addr()?.port();
        state.socket = Some(socket);
        state.local_candidates += 1;

        let candidate = RTCIceCandidate {
            sdp_mid: "0".to_owned(),
            sdp_mline_index: 0,
            candidate: format!(
                "candidate:{} 1 udp {HOST_CANDIDATE_PRIORITY} {LOOPBACK_ADDRESS} {port} typ host",
                rand::random::<u32>()
            ),
        };
        debug!("gathered host candidate {candidate}");
        self.sink.on_local_candidate(candidate, None);
        Ok(())
    }
}

impl IceTransport for LoopbackTransport {
    fn create_description(&self, request: &DescriptionRequest) -> Result<String> {
        let mut state = self.state.lock()?;
        if request.ice_restart {
            debug!("ice restart, regenerating credentials");
            state.credentials = IceCredentials::generate();
        }
        Ok(build_description(
            request,
            &state.credentials,
            &self.config.fingerprint,
        ))
    }

    fn start_gathering(&self) -> Result<()> {
        let mut state = self.state.lock()?;
        if state.stopped || state.gathering_complete {
            return Ok(());
        }

        if self.config.ice_transport_policy == RTCIceTransportPolicy::Relay {
            debug!("relay only policy, skipping host candidates");
        } else if let Err(err) = self.gather_host_candidate(&mut state) {
            warn!("host candidate gathering failed: {err}");
        }

        state.gathering_complete = true;
        self.sink.on_gathering_complete();
        self.maybe_run_checks(&mut state);
        Ok(())
    }

    fn set_remote_description(&self, description: &RTCSessionDescription) -> Result<()> {
        let mut state = self.state.lock()?;
        if description.sdp_type == RTCSdpType::Rollback {
            return Ok(());
        }

        state.has_remote_description = true;
        state.remote_candidates += description
            .sdp
            .lines()
            .filter(|line| line.starts_with("a=candidate:"))
            .count();
        self.maybe_run_checks(&mut state);
        Ok(())
    }

    fn add_remote_candidate(&self, candidate: &RTCIceCandidateInit) -> Result<()> {
        let mut state = self.state.lock()?;
        trace!("remote candidate {}", candidate.candidate);
        state.remote_candidates += 1;
        self.maybe_run_checks(&mut state);
        Ok(())
    }

    fn open_data_channel(&self, params: &DataChannelParameters) -> Result<()> {
        let mut state = self.state.lock()?;
        if state.stopped {
            return Ok(());
        }
        state.data_channels.insert(params.id);
        if state.checks == ChecksState::Connected {
            self.sink
                .on_data_channel_state_change(params.id, RTCDataChannelState::Open);
        }
        Ok(())
    }

    fn close_data_channel(&self, id: RTCDataChannelId) -> Result<()> {
        let mut state = self.state.lock()?;
        state.data_channels.remove(&id);
        self.sink
            .on_data_channel_state_change(id, RTCDataChannelState::Closed);
        Ok(())
    }

    fn stop(&self) {
        match self.state.lock() {
            Ok(mut state) => {
                state.stopped = true;
                state.socket = None;
                state.data_channels.clear();
                debug!("loopback transport stopped");
            }
            Err(err) => warn!("loopback transport state poisoned: {err}"),
        }
    }
}

/// Renders a session description. An answer mirrors the sections of the
/// offer it answers.
fn build_description(
    request: &DescriptionRequest,
    credentials: &IceCredentials,
    fingerprint: &str,
) -> String {
    let (data, audio) = match &request.remote_sdp {
        Some(remote) => (
            remote.contains("m=application"),
            remote.contains("m=audio"),
        ),
        None => (request.data_channels, request.audio),
    };
    let setup = if request.sdp_type == RTCSdpType::Offer {
        "actpass"
    } else {
        "active"
    };

    let mut mids = vec![];
    if data {
        mids.push("0");
    }
    if audio {
        mids.push(if data { "1" } else { "0" });
    }

    let mut sdp = String::new();
    let _ = write!(
        sdp,
        "v=0\r\no=- {} {} IN IP4 {LOOPBACK_ADDRESS}\r\ns=-\r\nt=0 0\r\n",
        request.session_id, request.session_version
    );
    if !mids.is_empty() && request.bundle_policy != RTCBundlePolicy::MaxCompat {
        let _ = write!(sdp, "a=group:BUNDLE {}\r\n", mids.join(" "));
    }
    let _ = write!(
        sdp,
        "a=ice-ufrag:{}\r\na=ice-pwd:{}\r\na=fingerprint:{fingerprint}\r\n",
        credentials.ufrag, credentials.pwd
    );

    let mut mids = mids.into_iter();
    if data {
        let _ = write!(
            sdp,
            "m=application 9 UDP/DTLS/SCTP webrtc-datachannel\r\nc=IN IP4 0.0.0.0\r\na=setup:{setup}\r\na=mid:{}\r\na=sctp-port:{SCTP_PORT}\r\n",
            mids.next().unwrap_or("0")
        );
    }
    if audio {
        let direction = if request.remote_sdp.is_some() {
            "sendonly"
        } else {
            "recvonly"
        };
        let _ = write!(
            sdp,
            "m=audio 9 UDP/TLS/RTP/SAVPF 111\r\nc=IN IP4 0.0.0.0\r\na=setup:{setup}\r\na=mid:{}\r\na={direction}\r\na=rtpmap:111 opus/48000/2\r\n",
            mids.next().unwrap_or("0")
        );
    }

    sdp
}

#[cfg(test)]
mod test {
    use super::*;

    fn credentials() -> IceCredentials {
        IceCredentials {
            ufrag: "ufrag".to_owned(),
            pwd: "pwd".to_owned(),
        }
    }

    #[test]
    fn test_build_description_sections() {
        let fingerprint = "sha-256 ab:cd";
        let tests = vec![
            (
                "offer with data",
                DescriptionRequest {
                    sdp_type: RTCSdpType::Offer,
                    data_channels: true,
                    ..Default::default()
                },
                vec![
                    "a=group:BUNDLE 0",
                    "m=application 9 UDP/DTLS/SCTP webrtc-datachannel",
                    "a=setup:actpass",
                    "a=sctp-port:5000",
                ],
                vec!["m=audio"],
            ),
            (
                "offer with data and audio",
                DescriptionRequest {
                    sdp_type: RTCSdpType::Offer,
                    data_channels: true,
                    audio: true,
                    ..Default::default()
                },
                vec!["a=group:BUNDLE 0 1", "a=mid:1", "a=recvonly"],
                vec![],
            ),
            (
                "empty offer",
                DescriptionRequest {
                    sdp_type: RTCSdpType::Offer,
                    ..Default::default()
                },
                vec!["a=ice-ufrag:ufrag", "a=ice-pwd:pwd"],
                vec!["a=group:BUNDLE", "m="],
            ),
            (
                "max-compat has no bundle group",
                DescriptionRequest {
                    sdp_type: RTCSdpType::Offer,
                    data_channels: true,
                    bundle_policy: RTCBundlePolicy::MaxCompat,
                    ..Default::default()
                },
                vec!["m=application"],
                vec!["a=group:BUNDLE"],
            ),
            (
                "answer mirrors offer",
                DescriptionRequest {
                    sdp_type: RTCSdpType::Answer,
                    remote_sdp: Some("v=0\r\nm=application 9 UDP/DTLS/SCTP webrtc-datachannel\r\n".to_owned()),
                    ..Default::default()
                },
                vec!["m=application", "a=setup:active"],
                vec!["m=audio", "a=setup:actpass"],
            ),
        ];

        for (name, request, present, absent) in tests {
            let sdp = build_description(&request, &credentials(), fingerprint);
            assert!(sdp.starts_with("v=0\r\n"), "{name}");
            assert!(sdp.contains("a=fingerprint:sha-256 ab:cd\r\n"), "{name}");
            for line in present {
                assert!(sdp.contains(line), "{name}: missing {line}");
            }
            for line in absent {
                assert!(!sdp.contains(line), "{name}: unexpected {line}");
            }
        }
    }

    #[test]
    fn test_build_description_origin() {
        let request = DescriptionRequest {
            sdp_type: RTCSdpType::Offer,
            session_id: 42,
            session_version: 3,
            ..Default::default()
        };
        let sdp = build_description(&request, &credentials(), "sha-256 00");
        assert!(sdp.contains("o=- 42 3 IN IP4 127.0.0.1\r\n"));
    }
}
