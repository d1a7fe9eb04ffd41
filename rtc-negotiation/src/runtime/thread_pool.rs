use shared::error::Result;

use super::ExecutionContext;

pub const NETWORK_THREAD_NAME: &str = "network";
pub const WORKER_THREAD_NAME: &str = "worker";
pub const SIGNALING_THREAD_NAME: &str = "signaling";

/// The three execution contexts a peer connection factory runs on.
///
/// * network: transport I/O and candidate gathering
/// * worker: session description generation
/// * signaling: connection state, observer delivery
#[derive(Debug, Clone)]
pub struct ThreadPool {
    pub network: ExecutionContext,
    pub worker: ExecutionContext,
    pub signaling: ExecutionContext,
}

impl Default for ThreadPool {
    fn default() -> Self {
        Self::new()
    }
}

impl ThreadPool {
    pub fn new() -> Self {
        Self {
            network: ExecutionContext::new(NETWORK_THREAD_NAME),
            worker: ExecutionContext::new(WORKER_THREAD_NAME),
            signaling: ExecutionContext::new(SIGNALING_THREAD_NAME),
        }
    }

    /// Starts network, worker and signaling, in that order.
    pub fn start(&self) -> Result<()> {
        self.network.start()?;
        self.worker.start()?;
        self.signaling.start()?;
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.network.is_running() && self.worker.is_running() && self.signaling.is_running()
    }

    /// Stops the contexts in reverse start order.
    pub fn stop(&self) {
        self.signaling.stop();
        self.worker.stop();
        self.network.stop();
    }
}
