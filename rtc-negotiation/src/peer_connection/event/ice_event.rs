use crate::peer_connection::transport::ice_candidate::RTCIceCandidate;

#[derive(Default, Clone, Debug, PartialEq, Eq)]
pub struct RTCPeerConnectionIceEvent {
    pub candidate: RTCIceCandidate,
    /// STUN or TURN server the candidate was gathered from, empty for host
    /// candidates.
    pub url: String,
}
