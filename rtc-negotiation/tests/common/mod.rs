#![allow(dead_code)]

use std::sync::{Arc, Mutex, mpsc};
use std::time::Duration;

use anyhow::{Result, anyhow};
use tokio::time::timeout;

use rtc_negotiation::{Error as RtcError, Result as RtcResult};
use rtc_negotiation::api::media_engine::DummyMediaEngine;
use rtc_negotiation::api::secure_transport::SecureTransport;
use rtc_negotiation::api::{RTCPeerConnectionFactory, RTCPeerConnectionFactoryBuilder};
use rtc_negotiation::data_channel::{DataChannelParameters, RTCDataChannelId};
use rtc_negotiation::peer_connection::configuration::{RTCConfiguration, RTCConfigurationBuilder};
use rtc_negotiation::peer_connection::event::RTCPeerConnectionEvent;
use rtc_negotiation::peer_connection::observer::PeerConnectionEvents;
use rtc_negotiation::peer_connection::sdp::{RTCSdpType, RTCSessionDescription};
use rtc_negotiation::peer_connection::transport::{RTCIceCandidateInit, RTCIceServer};
use rtc_negotiation::provider::{
    DescriptionRequest, IceTransport, TransportConfig, TransportEventSink, TransportProvider,
};

pub const DEFAULT_TIMEOUT_DURATION: Duration = Duration::from_secs(10);

pub fn init_logging() {
    env_logger::builder()
        .filter_level(log::LevelFilter::Debug)
        .is_test(true)
        .try_init()
        .ok();
}

pub fn new_factory(
    secure_transport: &SecureTransport,
    provider: Arc<dyn TransportProvider>,
) -> Result<RTCPeerConnectionFactory> {
    Ok(RTCPeerConnectionFactoryBuilder::new()
        .with_media_engine(Arc::new(DummyMediaEngine))
        .with_transport_provider(provider)
        .build(secure_transport)?)
}

pub fn stun_config(url: &str) -> RTCConfiguration {
    RTCConfigurationBuilder::new()
        .with_ice_servers(vec![RTCIceServer {
            urls: vec![url.to_owned()],
            ..Default::default()
        }])
        .build()
}

/// Waits for the next connection event.
pub async fn next_event(events: &mut PeerConnectionEvents) -> Result<Option<RTCPeerConnectionEvent>> {
    Ok(timeout(DEFAULT_TIMEOUT_DURATION, events.recv()).await?)
}

/// Receives events until one matches `done`, returning all of them.
pub async fn collect_until<F>(
    events: &mut PeerConnectionEvents,
    mut done: F,
) -> Result<Vec<RTCPeerConnectionEvent>>
where
    F: FnMut(&RTCPeerConnectionEvent) -> bool,
{
    let mut seen = vec![];
    loop {
        match next_event(events).await? {
            Some(event) => {
                let stop = done(&event);
                seen.push(event);
                if stop {
                    return Ok(seen);
                }
            }
            None => return Err(anyhow!("event stream ended, got {seen:?}")),
        }
    }
}

/// Receives every remaining event until the stream ends.
pub async fn drain(events: &mut PeerConnectionEvents) -> Result<Vec<RTCPeerConnectionEvent>> {
    let mut seen = vec![];
    while let Some(event) = next_event(events).await? {
        seen.push(event);
    }
    Ok(seen)
}

#[derive(Default)]
struct ScriptedInner {
    sink: Mutex<Option<TransportEventSink>>,
    gate: Mutex<Option<mpsc::Receiver<()>>>,
    remote_gate: Mutex<Option<mpsc::Receiver<()>>>,
    remote_descriptions: Mutex<Vec<RTCSdpType>>,
    fail_gathering: Mutex<bool>,
    stopped: Mutex<bool>,
}

/// Transport provider driven by the test: it never gathers by itself and
/// hands out its sink so events can be injected.
#[derive(Default, Clone)]
pub struct ScriptedTransportProvider {
    inner: Arc<ScriptedInner>,
}

impl ScriptedTransportProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `create_description` blocks until the returned sender sends
    /// (or is dropped).
    pub fn gated() -> (Self, mpsc::Sender<()>) {
        let (tx, rx) = mpsc::channel();
        let provider = Self::default();
        *provider.inner.gate.lock().unwrap() = Some(rx);
        (provider, tx)
    }

    /// Every `set_remote_description` blocks until the returned sender sends
    /// (or is dropped).
    pub fn remote_gated() -> (Self, mpsc::Sender<()>) {
        let (tx, rx) = mpsc::channel();
        let provider = Self::default();
        *provider.inner.remote_gate.lock().unwrap() = Some(rx);
        (provider, tx)
    }

    /// `start_gathering` fails right away.
    pub fn failing_gathering() -> Self {
        let provider = Self::default();
        *provider.inner.fail_gathering.lock().unwrap() = true;
        provider
    }

    /// Types of the remote descriptions the transport accepted, in order.
    pub fn remote_descriptions(&self) -> Vec<RTCSdpType> {
        self.inner.remote_descriptions.lock().unwrap().clone()
    }

    pub fn sink(&self) -> TransportEventSink {
        self.inner
            .sink
            .lock()
            .unwrap()
            .clone()
            .expect("no transport created yet")
    }

    pub fn is_stopped(&self) -> bool {
        *self.inner.stopped.lock().unwrap()
    }
}

impl TransportProvider for ScriptedTransportProvider {
    fn create_transport(
        &self,
        _config: &TransportConfig,
        sink: TransportEventSink,
    ) -> RtcResult<Arc<dyn IceTransport>> {
        *self.inner.sink.lock().unwrap() = Some(sink);
        Ok(Arc::new(ScriptedTransport {
            inner: Arc::clone(&self.inner),
        }))
    }
}

struct ScriptedTransport {
    inner: Arc<ScriptedInner>,
}

impl IceTransport for ScriptedTransport {
    fn create_description(&self, request: &DescriptionRequest) -> RtcResult<String> {
        if let Some(gate) = self.inner.gate.lock().unwrap().as_ref() {
            let _ = gate.recv();
        }

        let mut sdp = format!(
            "v=0\r\no=- {} {} IN IP4 127.0.0.1\r\ns=-\r\nt=0 0\r\n",
            request.session_id, request.session_version
        );
        if request.data_channels {
            sdp += "m=application 9 UDP/DTLS/SCTP webrtc-datachannel\r\na=mid:0\r\n";
        }
        Ok(sdp)
    }

    fn start_gathering(&self) -> RtcResult<()> {
        if *self.inner.fail_gathering.lock().unwrap() {
            return Err(RtcError::Other("no network interfaces".to_owned()));
        }
        Ok(())
    }

    fn set_remote_description(&self, description: &RTCSessionDescription) -> RtcResult<()> {
        if let Some(gate) = self.inner.remote_gate.lock().unwrap().as_ref() {
            let _ = gate.recv();
        }

        self.inner
            .remote_descriptions
            .lock()
            .unwrap()
            .push(description.sdp_type);
        Ok(())
    }

    fn add_remote_candidate(&self, _candidate: &RTCIceCandidateInit) -> RtcResult<()> {
        Ok(())
    }

    fn open_data_channel(&self, _params: &DataChannelParameters) -> RtcResult<()> {
        Ok(())
    }

    fn close_data_channel(&self, _id: RTCDataChannelId) -> RtcResult<()> {
        Ok(())
    }

    fn stop(&self) {
        *self.inner.stopped.lock().unwrap() = true;
    }
}
