pub mod media_engine;
pub mod secure_transport;

use std::fmt;
use std::sync::Arc;

use log::{debug, warn};
use shared::error::{Error, Result};

use crate::peer_connection::RTCPeerConnection;
use crate::peer_connection::configuration::RTCConfiguration;
use crate::peer_connection::internal::{InternalConfig, PeerConnectionInternal, StateMirror};
use crate::peer_connection::observer::{PeerConnectionEvents, PeerConnectionObserver};
use crate::provider::{TransportConfig, TransportEventSink, TransportProvider};
use crate::runtime::{ExecutionContext, ThreadPool};
use media_engine::MediaEngine;
use secure_transport::SecureTransport;

/// The only way to create connections.
///
/// Binds the three execution contexts, a media engine and a transport
/// provider. Holds no per-connection state and can create any number of
/// connections.
#[derive(Clone)]
pub struct RTCPeerConnectionFactory {
    thread_pool: ThreadPool,
    media_engine: Arc<dyn MediaEngine>,
    transport_provider: Arc<dyn TransportProvider>,
    secure_transport: SecureTransport,
}

impl fmt::Debug for RTCPeerConnectionFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RTCPeerConnectionFactory")
            .field("thread_pool", &self.thread_pool)
            .field("secure_transport", &self.secure_transport)
            .finish()
    }
}

impl RTCPeerConnectionFactory {
    /// Creates a connection and the stream its events are delivered on.
    pub fn create_peer_connection(
        &self,
        configuration: RTCConfiguration,
    ) -> Result<(RTCPeerConnection, PeerConnectionEvents)> {
        let ice_urls = configuration.validate()?;

        if !self.thread_pool.is_running() {
            let stopped = [
                &self.thread_pool.network,
                &self.thread_pool.worker,
                &self.thread_pool.signaling,
            ]
            .into_iter()
            .find(|ctx| !ctx.is_running())
            .map(|ctx| ctx.name().to_owned())
            .unwrap_or_default();
            return Err(Error::ErrExecutionContextStopped(stopped));
        }

        let mirror = Arc::new(StateMirror::default());
        let (events_observer, events) = PeerConnectionObserver::channel();
        let internal_config = InternalConfig {
            mirror: Arc::clone(&mirror),
            events: events_observer,
            worker: self.thread_pool.worker.clone(),
            network: self.thread_pool.network.clone(),
            media_engine: Arc::clone(&self.media_engine),
            bundle_policy: configuration.bundle_policy(),
            secure_transport: self.secure_transport.clone(),
        };
        let connection = self
            .thread_pool
            .signaling
            .confine_with(move |this| PeerConnectionInternal::new(this, internal_config))?;

        let transport_config = TransportConfig {
            ice_servers: configuration.get_ice_servers(),
            ice_urls,
            ice_transport_policy: configuration.ice_transport_policy(),
            bundle_policy: configuration.bundle_policy(),
            ice_candidate_pool_size: configuration.ice_candidate_pool_size(),
            fingerprint: self.secure_transport.fingerprint().to_string(),
        };
        let sink = TransportEventSink::new(connection.clone());
        let transport = match self
            .transport_provider
            .create_transport(&transport_config, sink)
        {
            Ok(transport) => transport,
            Err(err) => {
                warn!("transport provider failed: {err}");
                let _ = connection.release();
                return Err(Error::ErrTransportUnavailable(err.to_string()));
            }
        };
        connection.post(move |pc| pc.attach_transport(transport))?;

        debug!(
            "peer connection created with {} ice server urls",
            transport_config.ice_urls.len()
        );
        Ok((RTCPeerConnection::new(connection, mirror), events))
    }

    /// Creates an audio source through the media engine.
    pub fn create_audio_source(&self, label: &str) -> Result<String> {
        self.media_engine.create_audio_source(label)
    }

    pub fn thread_pool(&self) -> &ThreadPool {
        &self.thread_pool
    }

    pub fn secure_transport(&self) -> &SecureTransport {
        &self.secure_transport
    }

    pub fn media_engine(&self) -> &Arc<dyn MediaEngine> {
        &self.media_engine
    }
}

#[derive(Default)]
pub struct RTCPeerConnectionFactoryBuilder {
    network: Option<ExecutionContext>,
    worker: Option<ExecutionContext>,
    signaling: Option<ExecutionContext>,
    media_engine: Option<Arc<dyn MediaEngine>>,
    transport_provider: Option<Arc<dyn TransportProvider>>,
}

impl RTCPeerConnectionFactoryBuilder {
    pub fn new() -> Self {
        RTCPeerConnectionFactoryBuilder::default()
    }

    /// Uses all three contexts of `thread_pool`.
    pub fn with_thread_pool(self, thread_pool: &ThreadPool) -> Self {
        self.with_network_context(thread_pool.network.clone())
            .with_worker_context(thread_pool.worker.clone())
            .with_signaling_context(thread_pool.signaling.clone())
    }

    pub fn with_network_context(mut self, network: ExecutionContext) -> Self {
        self.network = Some(network);
        self
    }

    pub fn with_worker_context(mut self, worker: ExecutionContext) -> Self {
        self.worker = Some(worker);
        self
    }

    pub fn with_signaling_context(mut self, signaling: ExecutionContext) -> Self {
        self.signaling = Some(signaling);
        self
    }

    pub fn with_media_engine(mut self, media_engine: Arc<dyn MediaEngine>) -> Self {
        self.media_engine = Some(media_engine);
        self
    }

    pub fn with_transport_provider(mut self, transport_provider: Arc<dyn TransportProvider>) -> Self {
        self.transport_provider = Some(transport_provider);
        self
    }

    /// Builds the factory, starting any context that is not running yet.
    ///
    /// The factory keeps a clone of `secure_transport`, so the subsystem stays
    /// initialized for as long as the factory or any of its connections live.
    pub fn build(self, secure_transport: &SecureTransport) -> Result<RTCPeerConnectionFactory> {
        let media_engine = self.media_engine.ok_or(Error::ErrMediaEngineRequired)?;
        let transport_provider = self
            .transport_provider
            .ok_or(Error::ErrTransportProviderRequired)?;

        media_engine
            .init()
            .map_err(|err| Error::ErrMediaEngineInit(err.to_string()))?;

        let defaults = ThreadPool::new();
        let thread_pool = ThreadPool {
            network: self.network.unwrap_or(defaults.network),
            worker: self.worker.unwrap_or(defaults.worker),
            signaling: self.signaling.unwrap_or(defaults.signaling),
        };
        for ctx in [
            &thread_pool.network,
            &thread_pool.worker,
            &thread_pool.signaling,
        ] {
            if !ctx.is_running() {
                ctx.start()?;
            }
        }

        Ok(RTCPeerConnectionFactory {
            thread_pool,
            media_engine,
            transport_provider,
            secure_transport: secure_transport.clone(),
        })
    }
}
