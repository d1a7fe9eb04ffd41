#![allow(dead_code)]

use std::fmt;
use std::io;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification of [`Error`] values.
///
/// Callers that only care about *why* an operation was refused, not the exact
/// variant, match on this instead of the error itself.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The connection configuration was rejected.
    ConfigInvalid,
    /// A required execution context, provider or engine is not available.
    DependenciesUnmet,
    /// The connection has been closed.
    ClosedConnection,
    /// Another create operation is still outstanding.
    OperationInProgress,
    /// The requested change is not legal in the current signaling state.
    InvalidStateTransition,
    /// The requested offer/answer options cannot be met.
    ConstraintsUnsatisfiable,
    /// A subsystem failed to initialize.
    InitFailure,
    /// A create operation could not reach its worker.
    NoDependencies,
    Other,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            ErrorKind::ConfigInvalid => "ConfigInvalid",
            ErrorKind::DependenciesUnmet => "DependenciesUnmet",
            ErrorKind::ClosedConnection => "ClosedConnection",
            ErrorKind::OperationInProgress => "OperationInProgress",
            ErrorKind::InvalidStateTransition => "InvalidStateTransition",
            ErrorKind::ConstraintsUnsatisfiable => "ConstraintsUnsatisfiable",
            ErrorKind::InitFailure => "InitFailure",
            ErrorKind::NoDependencies => "NoDependencies",
            ErrorKind::Other => "Other",
        };
        write!(f, "{s}")
    }
}

#[derive(Error, Debug, PartialEq)]
#[non_exhaustive]
pub enum Error {
    //ICE server URL
    #[error("invalid ice server url: {0}")]
    ErrInvalidIceServerUrl(String),
    #[error("unknown scheme type: {0}")]
    ErrSchemeType(String),
    #[error("missing protocol scheme")]
    ErrMissingProtocolScheme,
    #[error("invalid transport protocol type: {0}")]
    ErrProtoType(String),
    #[error("invalid port number")]
    ErrInvalidPortNumber,
    #[error("queries not supported in stun address")]
    ErrStunQuery,

    /// ErrNoTurnCredentials indicates that a TURN server URL was provided
    /// without required credentials.
    #[error("turn server credentials required")]
    ErrNoTurnCredentials,

    //Runtime
    #[error("execution context {0} is stopped")]
    ErrExecutionContextStopped(String),
    #[error("failed to spawn execution context {0}: {1}")]
    ErrExecutionContextSpawn(String, String),

    //Factory
    #[error("secure transport initialization failed: {0}")]
    ErrSecureTransportInit(String),
    #[error("media engine initialization failed: {0}")]
    ErrMediaEngineInit(String),
    #[error("media engine is required")]
    ErrMediaEngineRequired,
    #[error("transport provider is required")]
    ErrTransportProviderRequired,
    #[error("transport provider failed to create transport: {0}")]
    ErrTransportUnavailable(String),

    //PeerConnection
    /// ErrConnectionClosed indicates an operation executed after connection
    /// has already been closed.
    #[error("connection closed")]
    ErrConnectionClosed,

    /// ErrOperationInProgress indicates that create_offer or create_answer was
    /// called while a previous create operation had not resolved yet, or that a
    /// description was set while a remote description was still being applied.
    #[error("another negotiation operation is in progress")]
    ErrOperationInProgress,

    /// ErrNoDependencies indicates that the worker context needed to produce a
    /// session description is not available.
    #[error("session description dependencies are not available")]
    ErrNoDependencies,

    /// ErrConstraintsUnsatisfiable indicates that the requested offer/answer
    /// options cannot be satisfied.
    #[error("constraints unsatisfiable: {0}")]
    ErrConstraintsUnsatisfiable(String),

    /// ErrIncorrectSignalingState indicates that the signaling state of PeerConnection is not correct
    #[error("operation can not be run in current signaling state")]
    ErrIncorrectSignalingState,

    /// ErrNoRemoteDescription indicates that an operation was rejected because
    /// the remote description is not set
    #[error("remote description is not set")]
    ErrNoRemoteDescription,

    #[error("can't rollback from stable state")]
    ErrSignalingStateCannotRollback,
    #[error("invalid proposed signaling state transition: {0}")]
    ErrSignalingStateProposedTransitionInvalid(String),
    #[error("invalid SDP type supplied to SetLocalDescription(): {0}")]
    ErrPeerConnSDPTypeInvalidValueSetLocalDescription(String),
    #[error("unspecified SDP type")]
    ErrPeerConnSDPTypeInvalidValue,
    #[error("new sdp does not match previous offer")]
    ErrSDPDoesNotMatchOffer,
    #[error("new sdp does not match previous answer")]
    ErrSDPDoesNotMatchAnswer,
    #[error("ice candidate string is empty")]
    ErrEmptyCandidate,

    //DataChannel
    /// ErrStreamIdInUse indicates that a negotiated data channel id is already
    /// taken by a channel that is not closed.
    #[error("data channel id {0} is already in use")]
    ErrStreamIdInUse(u16),
    #[error("Max Data Channel ID")]
    ErrMaxDataChannelID,

    /// ErrStringSizeLimit indicates that the character size limit of string is
    /// exceeded. The limit is 65535 bytes.
    #[error("data channel label exceeds size limit")]
    ErrStringSizeLimit,

    /// ErrProtocolTooLarge indicates that value given for a DataChannelInit protocol is
    /// longer then 65535 bytes
    #[error("protocol is larger then 65535 bytes")]
    ErrProtocolTooLarge,

    /// ErrRetransmitsOrPacketLifeTime indicates that an attempt to create a data
    /// channel was made with both options max_packet_life_time and max_retransmits
    /// set together. The two options are mutually exclusive.
    #[error("both max_packet_life_time and max_retransmits was set")]
    ErrRetransmitsOrPacketLifeTime,

    //Third Party Error
    #[error("url parse: {0}")]
    Url(#[from] url::ParseError),
    #[error("{0}")]
    RcGen(#[from] rcgen::Error),
    #[error("{0}")]
    Io(#[source] IoError),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Classifies this error into one of the caller-facing kinds.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::ErrInvalidIceServerUrl(_)
            | Error::ErrSchemeType(_)
            | Error::ErrMissingProtocolScheme
            | Error::ErrProtoType(_)
            | Error::ErrInvalidPortNumber
            | Error::ErrStunQuery
            | Error::ErrNoTurnCredentials
            | Error::Url(_) => ErrorKind::ConfigInvalid,

            Error::ErrExecutionContextStopped(_) | Error::ErrTransportUnavailable(_) => {
                ErrorKind::DependenciesUnmet
            }

            Error::ErrExecutionContextSpawn(_, _)
            | Error::ErrSecureTransportInit(_)
            | Error::ErrMediaEngineInit(_)
            | Error::ErrMediaEngineRequired
            | Error::ErrTransportProviderRequired
            | Error::RcGen(_) => ErrorKind::InitFailure,

            Error::ErrConnectionClosed => ErrorKind::ClosedConnection,

            Error::ErrOperationInProgress => ErrorKind::OperationInProgress,

            Error::ErrIncorrectSignalingState
            | Error::ErrNoRemoteDescription
            | Error::ErrSignalingStateCannotRollback
            | Error::ErrSignalingStateProposedTransitionInvalid(_)
            | Error::ErrPeerConnSDPTypeInvalidValueSetLocalDescription(_)
            | Error::ErrPeerConnSDPTypeInvalidValue
            | Error::ErrSDPDoesNotMatchOffer
            | Error::ErrSDPDoesNotMatchAnswer => ErrorKind::InvalidStateTransition,

            Error::ErrConstraintsUnsatisfiable(_) => ErrorKind::ConstraintsUnsatisfiable,

            Error::ErrNoDependencies => ErrorKind::NoDependencies,

            _ => ErrorKind::Other,
        }
    }
}

#[derive(Debug, Error)]
#[error("io error: {0}")]
pub struct IoError(#[from] pub io::Error);

// Workaround for wanting PartialEq for io::Error.
impl PartialEq for IoError {
    fn eq(&self, other: &Self) -> bool {
        self.0.kind() == other.0.kind()
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(IoError(e))
    }
}

impl<T> From<std::sync::PoisonError<T>> for Error {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        Error::Other(e.to_string())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_error_kind() {
        let tests = vec![
            (
                Error::ErrInvalidIceServerUrl("stun:".to_owned()),
                ErrorKind::ConfigInvalid,
            ),
            (Error::ErrNoTurnCredentials, ErrorKind::ConfigInvalid),
            (
                Error::ErrExecutionContextStopped("signaling".to_owned()),
                ErrorKind::DependenciesUnmet,
            ),
            (Error::ErrMediaEngineRequired, ErrorKind::InitFailure),
            (Error::ErrConnectionClosed, ErrorKind::ClosedConnection),
            (Error::ErrOperationInProgress, ErrorKind::OperationInProgress),
            (
                Error::ErrSignalingStateProposedTransitionInvalid("x".to_owned()),
                ErrorKind::InvalidStateTransition,
            ),
            (
                Error::ErrConstraintsUnsatisfiable("video".to_owned()),
                ErrorKind::ConstraintsUnsatisfiable,
            ),
            (Error::ErrNoDependencies, ErrorKind::NoDependencies),
            (Error::ErrStreamIdInUse(2), ErrorKind::Other),
            (Error::ErrMaxDataChannelID, ErrorKind::Other),
            (Error::Other("x".to_owned()), ErrorKind::Other),
        ];

        for (err, expected_kind) in tests {
            assert_eq!(err.kind(), expected_kind, "{err}");
        }
    }

    #[test]
    fn test_io_error_eq() {
        let a: Error = io::Error::new(io::ErrorKind::AddrInUse, "a").into();
        let b: Error = io::Error::new(io::ErrorKind::AddrInUse, "b").into();
        assert_eq!(a, b);
    }
}
