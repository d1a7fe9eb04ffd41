//! Observer contracts.
//!
//! Create and set operations hand a one-shot [`CompletionObserver`] to the
//! connection and return the matching [`Pending`] to the caller. The observer
//! is consumed by exactly one of `on_success` / `on_failure`; if the connection
//! drops it unresolved (for example because it was torn down), the caller sees
//! `ErrConnectionClosed` instead of waiting forever.
//!
//! Connection events flow through the long-lived [`PeerConnectionObserver`] /
//! [`PeerConnectionEvents`] pair. The connection drops its side right after
//! the final `Closed` signaling event, so `recv` then yields `None`.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use log::trace;
use shared::error::{Error, Result};
use tokio::sync::{mpsc, oneshot};

use crate::peer_connection::event::RTCPeerConnectionEvent;
use crate::peer_connection::sdp::RTCSessionDescription;

/// Sending half of a one-shot operation result.
#[derive(Debug)]
pub struct CompletionObserver<T> {
    tx: Option<oneshot::Sender<Result<T>>>,
}

pub type CreateSessionDescriptionObserver = CompletionObserver<RTCSessionDescription>;
pub type SetSessionDescriptionObserver = CompletionObserver<()>;

impl<T> CompletionObserver<T> {
    /// Creates a connected observer/pending pair.
    pub fn channel() -> (Self, Pending<T>) {
        let (tx, rx) = oneshot::channel();
        (CompletionObserver { tx: Some(tx) }, Pending { rx })
    }

    pub fn on_success(self, value: T) {
        self.resolve(Ok(value));
    }

    pub fn on_failure(self, err: Error) {
        self.resolve(Err(err));
    }

    pub fn resolve(mut self, result: Result<T>) {
        if let Some(tx) = self.tx.take() {
            if tx.send(result).is_err() {
                trace!("operation result dropped, caller stopped waiting");
            }
        }
    }
}

impl<T> Drop for CompletionObserver<T> {
    fn drop(&mut self) {
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(Err(Error::ErrConnectionClosed));
        }
    }
}

/// Receiving half of a one-shot operation result.
///
/// Await it from async code, or call [`Pending::blocking_wait`] from a plain
/// thread.
#[derive(Debug)]
#[must_use = "the operation outcome is only observable through Pending"]
pub struct Pending<T> {
    rx: oneshot::Receiver<Result<T>>,
}

impl<T> Pending<T> {
    /// Returns an already resolved result.
    pub fn ready(result: Result<T>) -> Self {
        let (observer, pending) = CompletionObserver::channel();
        observer.resolve(result);
        pending
    }

    /// Blocks the current thread until the result is available.
    ///
    /// Panics if called from within an async runtime, like
    /// [`oneshot::Receiver::blocking_recv`].
    pub fn blocking_wait(self) -> Result<T> {
        self.rx
            .blocking_recv()
            .unwrap_or(Err(Error::ErrConnectionClosed))
    }

    /// Returns the result if it is already available.
    pub fn try_result(&mut self) -> Option<Result<T>> {
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => Some(Err(Error::ErrConnectionClosed)),
        }
    }
}

impl<T> Future for Pending<T> {
    type Output = Result<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|result| result.unwrap_or(Err(Error::ErrConnectionClosed)))
    }
}

/// Connection side of the event stream.
#[derive(Debug)]
pub(crate) struct PeerConnectionObserver {
    tx: mpsc::UnboundedSender<RTCPeerConnectionEvent>,
}

impl PeerConnectionObserver {
    pub(crate) fn channel() -> (Self, PeerConnectionEvents) {
        let (tx, rx) = mpsc::unbounded_channel();
        (PeerConnectionObserver { tx }, PeerConnectionEvents { rx })
    }

    pub(crate) fn notify(&self, event: RTCPeerConnectionEvent) {
        if let Err(err) = self.tx.send(event) {
            trace!("connection event {:?} dropped, nobody listening", err.0);
        }
    }
}

/// Caller side of the event stream.
#[derive(Debug)]
pub struct PeerConnectionEvents {
    rx: mpsc::UnboundedReceiver<RTCPeerConnectionEvent>,
}

impl PeerConnectionEvents {
    /// Waits for the next event. `None` once the connection has closed and
    /// every event before that has been received.
    pub async fn recv(&mut self) -> Option<RTCPeerConnectionEvent> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<RTCPeerConnectionEvent> {
        self.rx.try_recv().ok()
    }

    pub fn blocking_recv(&mut self) -> Option<RTCPeerConnectionEvent> {
        self.rx.blocking_recv()
    }
}
