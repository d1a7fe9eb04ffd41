pub(crate) mod ice_connection_state;
pub(crate) mod ice_gathering_state;
pub(crate) mod signaling_state;

pub use ice_connection_state::RTCIceConnectionState;
pub use ice_gathering_state::RTCIceGatheringState;
pub use signaling_state::RTCSignalingState;
