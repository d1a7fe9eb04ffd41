//! # rtc-negotiation - asynchronous WebRTC offer/answer negotiation
//!
//! The negotiation core of a WebRTC peer connection: the JSEP signaling state
//! machine, ICE connection and gathering state, data channel bookkeeping and
//! the observers that report all of it, running on three dedicated execution
//! contexts.
//!
//! ## Threading model
//!
//! A [`ThreadPool`](runtime::ThreadPool) owns three single-threaded run loops:
//!
//! - **signaling**: owns every connection's state; all observers fire here
//! - **worker**: generates session descriptions
//! - **network**: drives the transport (gathering, remote descriptions, candidates)
//!
//! Connection state is [`Confined`](runtime::Confined) to the signaling
//! context. The caller-facing [`RTCPeerConnection`](peer_connection::RTCPeerConnection)
//! is a `Send + Sync` handle that only posts work there, so no lock guards the
//! negotiation state and no operation ever blocks the caller.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use rtc_negotiation::api::RTCPeerConnectionFactoryBuilder;
//! use rtc_negotiation::api::media_engine::DummyMediaEngine;
//! use rtc_negotiation::api::secure_transport::SecureTransport;
//! use rtc_negotiation::peer_connection::configuration::RTCConfigurationBuilder;
//! use rtc_negotiation::peer_connection::event::RTCPeerConnectionEvent;
//! use rtc_negotiation::peer_connection::sdp::RTCSessionDescription;
//! use rtc_negotiation::peer_connection::state::RTCIceGatheringState;
//! use rtc_negotiation::peer_connection::transport::RTCIceServer;
//! use rtc_negotiation::provider::LoopbackTransportProvider;
//! use rtc_negotiation::runtime::ThreadPool;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let secure_transport = SecureTransport::initialize()?;
//! let thread_pool = ThreadPool::new();
//! thread_pool.start()?;
//!
//! let factory = RTCPeerConnectionFactoryBuilder::new()
//!     .with_thread_pool(&thread_pool)
//!     .with_media_engine(Arc::new(DummyMediaEngine))
//!     .with_transport_provider(Arc::new(LoopbackTransportProvider::new()))
//!     .build(&secure_transport)?;
//!
//! let config = RTCConfigurationBuilder::new()
//!     .with_ice_servers(vec![RTCIceServer {
//!         urls: vec!["stun:stun.l.google.com:19302".to_string()],
//!         ..Default::default()
//!     }])
//!     .build();
//! let (pc, mut events) = factory.create_peer_connection(config)?;
//!
//! let _dc = pc.create_data_channel("test_channel", None)?;
//! let offer = pc.create_offer(None).await?;
//! pc.set_local_description(offer).await?;
//!
//! while let Some(event) = events.recv().await {
//!     if let RTCPeerConnectionEvent::OnIceCandidateEvent(ice) = &event {
//!         println!("candidate: {}", ice.candidate);
//!     }
//!     if event
//!         == RTCPeerConnectionEvent::OnIceGatheringStateChangeEvent(
//!             RTCIceGatheringState::Complete,
//!         )
//!     {
//!         break;
//!     }
//! }
//!
//! pc.close()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`api`]: factory, secure transport subsystem and media engine
//! - [`peer_connection`]: the connection, its configuration, states, events and observers
//! - [`data_channel`]: data channel handles and state
//! - [`provider`]: the transport seam and the in-process loopback provider
//! - [`runtime`]: execution contexts and confined state

#![warn(rust_2018_idioms)]
#![allow(dead_code)]

pub mod api;
pub mod data_channel;
pub mod peer_connection;
pub mod provider;
pub mod runtime;

pub use shared::error::{Error, ErrorKind, Result};
