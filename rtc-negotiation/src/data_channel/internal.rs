use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use log::{debug, trace};

use super::DataChannelParameters;
use super::state::RTCDataChannelState;

/// Connection-side record of a data channel, owned by the signaling context.
#[derive(Debug)]
pub(crate) struct RTCDataChannelInternal {
    pub(crate) params: DataChannelParameters,
    pub(crate) ready_state: Arc<AtomicU8>,
}

impl RTCDataChannelInternal {
    pub(crate) fn new(params: DataChannelParameters) -> Self {
        Self {
            params,
            ready_state: Arc::new(AtomicU8::new(RTCDataChannelState::Connecting as u8)),
        }
    }

    pub(crate) fn ready_state(&self) -> RTCDataChannelState {
        self.ready_state.load(Ordering::SeqCst).into()
    }

    /// Moves the channel forward. Returns false if `next` does not advance it.
    pub(crate) fn set_ready_state(&self, next: RTCDataChannelState) -> bool {
        let cur = self.ready_state();
        if next <= cur {
            trace!(
                "data channel {} ignoring {cur} -> {next}",
                self.params.id
            );
            return false;
        }

        debug!(
            "data channel {} ({}) state {cur} -> {next}",
            self.params.id, self.params.label
        );
        self.ready_state.store(next as u8, Ordering::SeqCst);
        true
    }
}
