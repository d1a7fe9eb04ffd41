pub mod ice_candidate;
pub mod ice_server;

pub use ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
pub use ice_server::{ProtoType, RTCIceServer, RTCIceServerUrl, SchemeType};
