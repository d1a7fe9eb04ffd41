use std::fmt;

use crate::peer_connection::configuration::UNSPECIFIED_STR;

/// Indicates the state of the ICE connection.
///
/// The transport drives this state through connectivity checks:
///
/// ```text
/// new → checking → {connected | failed} → {completed | disconnected} → closed
/// ```
///
/// `Failed` and `Closed` are terminal. Once either is reached the connection
/// ignores any further change reported by the transport.
///
/// ```
/// use rtc_negotiation::peer_connection::state::RTCIceConnectionState;
///
/// fn is_ice_active(state: RTCIceConnectionState) -> bool {
///     matches!(
///         state,
///         RTCIceConnectionState::Connected | RTCIceConnectionState::Completed
///     )
/// }
///
/// assert!(is_ice_active(RTCIceConnectionState::Completed));
/// assert!(RTCIceConnectionState::Failed.is_terminal());
/// assert_eq!(RTCIceConnectionState::from("checking"), RTCIceConnectionState::Checking);
/// ```
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
pub enum RTCIceConnectionState {
    /// State not specified. This should not occur in normal operation.
    #[default]
    Unspecified,

    /// Waiting for remote candidates, no checks performed yet.
    New,

    /// Connectivity checks are running.
    Checking,

    /// A usable candidate pair was found.
    Connected,

    /// Checks finished and a pair was selected.
    Completed,

    /// Connectivity was lost. May recover.
    Disconnected,

    /// All candidate pairs failed. Terminal.
    Failed,

    /// The transport was shut down. Terminal.
    Closed,
}

const ICE_CONNECTION_STATE_NEW_STR: &str = "new";
const ICE_CONNECTION_STATE_CHECKING_STR: &str = "checking";
const ICE_CONNECTION_STATE_CONNECTED_STR: &str = "connected";
const ICE_CONNECTION_STATE_COMPLETED_STR: &str = "completed";
const ICE_CONNECTION_STATE_DISCONNECTED_STR: &str = "disconnected";
const ICE_CONNECTION_STATE_FAILED_STR: &str = "failed";
const ICE_CONNECTION_STATE_CLOSED_STR: &str = "closed";

impl From<&str> for RTCIceConnectionState {
    fn from(raw: &str) -> Self {
        match raw {
            ICE_CONNECTION_STATE_NEW_STR => RTCIceConnectionState::New,
            ICE_CONNECTION_STATE_CHECKING_STR => RTCIceConnectionState::Checking,
            ICE_CONNECTION_STATE_CONNECTED_STR => RTCIceConnectionState::Connected,
            ICE_CONNECTION_STATE_COMPLETED_STR => RTCIceConnectionState::Completed,
            ICE_CONNECTION_STATE_DISCONNECTED_STR => RTCIceConnectionState::Disconnected,
            ICE_CONNECTION_STATE_FAILED_STR => RTCIceConnectionState::Failed,
            ICE_CONNECTION_STATE_CLOSED_STR => RTCIceConnectionState::Closed,
            _ => RTCIceConnectionState::Unspecified,
        }
    }
}

impl From<u8> for RTCIceConnectionState {
    fn from(v: u8) -> Self {
        match v {
            1 => RTCIceConnectionState::New,
            2 => RTCIceConnectionState::Checking,
            3 => RTCIceConnectionState::Connected,
            4 => RTCIceConnectionState::Completed,
            5 => RTCIceConnectionState::Disconnected,
            6 => RTCIceConnectionState::Failed,
            7 => RTCIceConnectionState::Closed,
            _ => RTCIceConnectionState::Unspecified,
        }
    }
}

impl fmt::Display for RTCIceConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            RTCIceConnectionState::New => ICE_CONNECTION_STATE_NEW_STR,
            RTCIceConnectionState::Checking => ICE_CONNECTION_STATE_CHECKING_STR,
            RTCIceConnectionState::Connected => ICE_CONNECTION_STATE_CONNECTED_STR,
            RTCIceConnectionState::Completed => ICE_CONNECTION_STATE_COMPLETED_STR,
            RTCIceConnectionState::Disconnected => ICE_CONNECTION_STATE_DISCONNECTED_STR,
            RTCIceConnectionState::Failed => ICE_CONNECTION_STATE_FAILED_STR,
            RTCIceConnectionState::Closed => ICE_CONNECTION_STATE_CLOSED_STR,
            RTCIceConnectionState::Unspecified => UNSPECIFIED_STR,
        };
        write!(f, "{s}")
    }
}

impl RTCIceConnectionState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RTCIceConnectionState::Failed | RTCIceConnectionState::Closed
        )
    }

    /// Whether a change reported by the transport may be applied.
    ///
    /// Follows the graph above. `Disconnected` may recover to `Connected`
    /// or give up with `Failed`, and every non-terminal state may close.
    pub(crate) fn can_transition_to(self, next: RTCIceConnectionState) -> bool {
        use RTCIceConnectionState::*;

        match (self, next) {
            (Unspecified | Failed | Closed, _) => false,
            (_, Closed) => true,
            (New, Checking)
            | (Checking, Connected | Failed)
            | (Connected, Completed | Disconnected)
            | (Completed, Disconnected)
            | (Disconnected, Connected | Failed) => true,
            _ => false,
        }
    }
}
