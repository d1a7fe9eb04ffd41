//! End-to-end negotiation over the loopback transport provider.

mod common;

use std::sync::Arc;

use anyhow::Result;

use common::{collect_until, init_logging, new_factory, stun_config};
use rtc_negotiation::api::secure_transport::SecureTransport;
use rtc_negotiation::data_channel::state::RTCDataChannelState;
use rtc_negotiation::peer_connection::configuration::RTCConfigurationBuilder;
use rtc_negotiation::peer_connection::configuration::ice_transport_policy::RTCIceTransportPolicy;
use rtc_negotiation::peer_connection::configuration::offer_answer_options::RTCOfferOptions;
use rtc_negotiation::peer_connection::event::RTCPeerConnectionEvent;
use rtc_negotiation::peer_connection::event::data_channel_event::RTCDataChannelEvent;
use rtc_negotiation::peer_connection::sdp::{RTCSdpType, RTCSessionDescription};
use rtc_negotiation::peer_connection::state::{
    RTCIceConnectionState, RTCIceGatheringState, RTCSignalingState,
};
use rtc_negotiation::peer_connection::transport::RTCIceServer;
use rtc_negotiation::provider::LoopbackTransportProvider;

fn is_gathering_complete(event: &RTCPeerConnectionEvent) -> bool {
    *event
        == RTCPeerConnectionEvent::OnIceGatheringStateChangeEvent(RTCIceGatheringState::Complete)
}

fn ice_ufrag(sdp: &str) -> Option<&str> {
    sdp.lines().find_map(|line| line.strip_prefix("a=ice-ufrag:"))
}

#[tokio::test]
async fn test_offer_with_data_channel_gathers_candidates() -> Result<()> {
    init_logging();
    let secure_transport = SecureTransport::initialize()?;
    let factory = new_factory(&secure_transport, Arc::new(LoopbackTransportProvider::new()))?;

    let (pc, mut events) =
        factory.create_peer_connection(stun_config("stun:stun.example.com:19302"))?;
    assert_eq!(pc.signaling_state(), RTCSignalingState::Stable);
    assert_eq!(pc.ice_connection_state(), RTCIceConnectionState::New);

    let dc = pc.create_data_channel("test_channel", None)?;
    assert_eq!(dc.label(), "test_channel");
    assert_eq!(dc.ready_state(), RTCDataChannelState::Connecting);

    let offer = pc.create_offer(None).await?;
    assert_eq!(offer.sdp_type, RTCSdpType::Offer);
    assert!(!offer.sdp.is_empty());
    assert!(offer.sdp.contains("m=application"));
    assert!(offer.sdp.contains(&format!(
        "a=fingerprint:{}",
        secure_transport.fingerprint()
    )));

    pc.set_local_description(offer).await?;
    assert_eq!(pc.signaling_state(), RTCSignalingState::HaveLocalOffer);

    let seen = collect_until(&mut events, is_gathering_complete).await?;
    log::info!("events until gathering complete: {seen:?}");
    assert_eq!(seen[0], RTCPeerConnectionEvent::OnNegotiationNeededEvent);
    assert_eq!(
        seen.iter().filter(|event| is_gathering_complete(event)).count(),
        1
    );
    assert!(
        seen.iter()
            .any(|event| matches!(event, RTCPeerConnectionEvent::OnIceCandidateEvent(_))),
        "{seen:?}"
    );
    assert_eq!(pc.ice_gathering_state(), RTCIceGatheringState::Complete);
    assert_eq!(pc.local_candidates().await?.len(), 1);

    pc.close()?;
    factory.thread_pool().stop();
    Ok(())
}

#[tokio::test]
async fn test_offer_answer_between_two_connections() -> Result<()> {
    init_logging();
    let secure_transport = SecureTransport::initialize()?;
    let factory = new_factory(&secure_transport, Arc::new(LoopbackTransportProvider::new()))?;

    let (offerer, mut offerer_events) =
        factory.create_peer_connection(stun_config("stun:stun.l.google.com:19302"))?;
    let (answerer, mut answerer_events) =
        factory.create_peer_connection(stun_config("stun:stun.l.google.com:19302"))?;

    let dc = offerer.create_data_channel("test_channel", None)?;

    let offer = offerer.create_offer(None).await?;
    offerer.set_local_description(offer.clone()).await?;
    answerer.set_remote_description(offer).await?;
    assert_eq!(answerer.signaling_state(), RTCSignalingState::HaveRemoteOffer);

    let answer = answerer.create_answer(None).await?;
    assert!(answer.sdp.contains("m=application"));
    assert!(answer.sdp.contains("a=setup:active"));
    answerer.set_local_description(answer.clone()).await?;
    offerer.set_remote_description(answer).await?;
    assert_eq!(offerer.signaling_state(), RTCSignalingState::Stable);
    assert_eq!(answerer.signaling_state(), RTCSignalingState::Stable);

    collect_until(&mut offerer_events, is_gathering_complete).await?;
    collect_until(&mut answerer_events, is_gathering_complete).await?;

    for candidate in offerer.local_candidates().await? {
        answerer.add_ice_candidate(candidate.to_json()).await?;
    }
    for candidate in answerer.local_candidates().await? {
        offerer.add_ice_candidate(candidate.to_json()).await?;
    }

    let seen = collect_until(&mut offerer_events, |event| {
        matches!(
            event,
            RTCPeerConnectionEvent::OnDataChannel(RTCDataChannelEvent::OnOpen(_))
        )
    })
    .await?;
    assert!(seen.contains(&RTCPeerConnectionEvent::OnIceConnectionStateChangeEvent(
        RTCIceConnectionState::Completed
    )));
    assert_eq!(dc.ready_state(), RTCDataChannelState::Open);

    collect_until(&mut answerer_events, |event| {
        *event
            == RTCPeerConnectionEvent::OnIceConnectionStateChangeEvent(
                RTCIceConnectionState::Completed,
            )
    })
    .await?;
    assert_eq!(offerer.ice_connection_state(), RTCIceConnectionState::Completed);
    assert_eq!(answerer.ice_connection_state(), RTCIceConnectionState::Completed);

    offerer.close()?;
    answerer.close()?;
    factory.thread_pool().stop();
    Ok(())
}

#[tokio::test]
async fn test_ice_restart_regenerates_credentials() -> Result<()> {
    init_logging();
    let secure_transport = SecureTransport::initialize()?;
    let factory = new_factory(&secure_transport, Arc::new(LoopbackTransportProvider::new()))?;
    let (pc, _events) = factory.create_peer_connection(stun_config("stun:stun.example.com"))?;

    let first = pc.create_offer(None).await?;
    let second = pc.create_offer(None).await?;
    let restarted = pc
        .create_offer(Some(RTCOfferOptions {
            ice_restart: true,
            ..Default::default()
        }))
        .await?;

    let ufrag = ice_ufrag(&first.sdp);
    assert!(ufrag.is_some());
    assert_eq!(ufrag, ice_ufrag(&second.sdp));
    assert_ne!(ufrag, ice_ufrag(&restarted.sdp));

    factory.thread_pool().stop();
    Ok(())
}

#[tokio::test]
async fn test_relay_policy_without_candidates_fails() -> Result<()> {
    init_logging();
    let secure_transport = SecureTransport::initialize()?;
    let factory = new_factory(&secure_transport, Arc::new(LoopbackTransportProvider::new()))?;

    let config = RTCConfigurationBuilder::new()
        .with_ice_servers(vec![RTCIceServer {
            urls: vec!["turn:turn.example.com:3478".to_owned()],
            username: "user".to_owned(),
            credential: "pass".to_owned(),
        }])
        .with_ice_transport_policy(RTCIceTransportPolicy::Relay)
        .build();
    let (pc, mut events) = factory.create_peer_connection(config)?;

    let offer = pc.create_offer(None).await?;
    pc.set_local_description(offer).await?;
    let seen = collect_until(&mut events, is_gathering_complete).await?;
    assert!(
        !seen
            .iter()
            .any(|event| matches!(event, RTCPeerConnectionEvent::OnIceCandidateEvent(_))),
        "{seen:?}"
    );

    let answer = RTCSessionDescription::answer(
        "v=0\r\no=- 1 1 IN IP4 127.0.0.1\r\ns=-\r\nt=0 0\r\na=candidate:1 1 udp 2130706431 127.0.0.1 9 typ host\r\n"
            .to_owned(),
    );
    pc.set_remote_description(answer).await?;

    let seen = collect_until(&mut events, |event| {
        *event
            == RTCPeerConnectionEvent::OnIceConnectionStateChangeEvent(
                RTCIceConnectionState::Failed,
            )
    })
    .await?;
    assert!(seen.contains(&RTCPeerConnectionEvent::OnIceConnectionStateChangeEvent(
        RTCIceConnectionState::Checking
    )));
    assert_eq!(pc.ice_connection_state(), RTCIceConnectionState::Failed);

    factory.thread_pool().stop();
    Ok(())
}
