use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, bail};
use clap::Parser;
use log::{error, info, warn};
use tokio::sync::broadcast;

use negotiation::api::RTCPeerConnectionFactoryBuilder;
use negotiation::api::media_engine::DummyMediaEngine;
use negotiation::api::secure_transport::SecureTransport;
use negotiation::peer_connection::configuration::{RTCConfiguration, RTCConfigurationBuilder};
use negotiation::peer_connection::event::RTCPeerConnectionEvent;
use negotiation::peer_connection::state::RTCIceGatheringState;
use negotiation::peer_connection::transport::RTCIceServer;
use negotiation::provider::LoopbackTransportProvider;
use negotiation::runtime::ThreadPool;

#[derive(Parser)]
#[command(name = "rtc-harness")]
#[command(author = "Rusty Rain <y@liu.mx>")]
#[command(version = "0.1.0")]
#[command(about = "Creates one connection with one data channel, offers it and logs every event", long_about = None)]
struct Cli {
    #[arg(short, long)]
    debug: bool,
    /// STUN/TURN server URI, may be repeated
    #[arg(long = "ice-server", default_values_t = vec![format!("stun:stun.l.google.com:19302")])]
    ice_servers: Vec<String>,
    /// JSON RTCConfiguration file, takes precedence over --ice-server
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long, default_value_t = format!("test_channel"))]
    label: String,
    #[arg(long, default_value_t = 10)]
    timeout_secs: u64,
}

fn init_logging(debug: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    builder.format(|buf, record| {
        writeln!(
            buf,
            "{}:{} [{}] {} - {}",
            record.file().unwrap_or("unknown"),
            record.line().unwrap_or(0),
            record.level(),
            chrono::Local::now().format("%H:%M:%S.%6f"),
            record.args()
        )
    });
    if debug {
        builder.filter(None, log::LevelFilter::Trace);
    }
    builder.init();
}

fn load_configuration(cli: &Cli) -> Result<RTCConfiguration> {
    if let Some(path) = &cli.config {
        let data = std::fs::read_to_string(path)?;
        return Ok(serde_json::from_str::<RTCConfiguration>(&data)?);
    }

    Ok(RTCConfigurationBuilder::new()
        .with_ice_servers(vec![RTCIceServer {
            urls: cli.ice_servers.clone(),
            ..Default::default()
        }])
        .build())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.debug);

    let (stop_tx, stop_rx) = broadcast::channel::<()>(1);
    info!("Press Ctrl-C to stop");
    let mut stop_tx = Some(stop_tx);
    ctrlc::set_handler(move || {
        if let Some(stop_tx) = stop_tx.take() {
            let _ = stop_tx.send(());
        }
    })?;

    let configuration = load_configuration(&cli)?;
    let timeout = Duration::from_secs(cli.timeout_secs);

    let secure_transport = SecureTransport::initialize()?;
    let thread_pool = ThreadPool::new();
    thread_pool.start()?;

    let result = run(
        &secure_transport,
        &thread_pool,
        configuration,
        &cli.label,
        timeout,
        stop_rx,
    )
    .await;

    thread_pool.stop();
    drop(secure_transport);
    if SecureTransport::is_initialized() {
        warn!("secure transport still referenced after shutdown");
    }

    if let Err(err) = &result {
        error!("run got error: {err}");
    }
    result
}

async fn run(
    secure_transport: &SecureTransport,
    thread_pool: &ThreadPool,
    configuration: RTCConfiguration,
    label: &str,
    timeout: Duration,
    mut stop_rx: broadcast::Receiver<()>,
) -> Result<()> {
    let factory = RTCPeerConnectionFactoryBuilder::new()
        .with_thread_pool(thread_pool)
        .with_media_engine(Arc::new(DummyMediaEngine))
        .with_transport_provider(Arc::new(LoopbackTransportProvider::new()))
        .build(secure_transport)?;
    info!(
        "audio source {} ready",
        factory.create_audio_source("audio_label")?
    );

    let (peer_connection, mut events) = factory.create_peer_connection(configuration)?;

    let data_channel = peer_connection.create_data_channel(label, None)?;
    info!(
        "data channel {} '{}' created, {}",
        data_channel.id(),
        data_channel.label(),
        data_channel.ready_state()
    );

    let offer = peer_connection.create_offer(None).await?;
    info!("offer created: {:?}", offer.sdp);
    peer_connection.set_local_description(offer).await?;
    info!(
        "local description set, signaling state {}",
        peer_connection.signaling_state()
    );

    let deadline = tokio::time::sleep(timeout);
    tokio::pin!(deadline);

    let mut gathered = false;
    let mut interrupted = false;
    loop {
        tokio::select! {
            _ = stop_rx.recv() => {
                warn!("interrupted");
                interrupted = true;
                break;
            }
            _ = &mut deadline => {
                warn!(
                    "no gathering completion after {timeout:?}, gathering state {}",
                    peer_connection.ice_gathering_state()
                );
                break;
            }
            event = events.recv() => {
                let Some(event) = event else {
                    break;
                };
                if log_event(&event) {
                    gathered = true;
                    break;
                }
            }
        };
    }

    if let Some(local) = peer_connection.local_description().await? {
        println!("{}", serde_json::to_string(&local)?);
    }
    for candidate in peer_connection.local_candidates().await? {
        println!("{}", serde_json::to_string(&candidate.to_json())?);
    }

    peer_connection.close()?;
    while let Some(event) = events.recv().await {
        log_event(&event);
    }

    if !gathered && !interrupted {
        bail!("ice gathering did not complete within {timeout:?}");
    }
    Ok(())
}

/// Logs one connection event. Returns true once gathering is complete.
fn log_event(event: &RTCPeerConnectionEvent) -> bool {
    match event {
        RTCPeerConnectionEvent::OnNegotiationNeededEvent => info!("negotiation needed"),
        RTCPeerConnectionEvent::OnIceCandidateEvent(ice) => {
            info!("ice candidate {} {}", ice.candidate, ice.url)
        }
        RTCPeerConnectionEvent::OnSignalingStateChangeEvent(state) => {
            info!("signaling state has changed to {state}")
        }
        RTCPeerConnectionEvent::OnIceConnectionStateChangeEvent(state) => {
            info!("ice connection state has changed to {state}")
        }
        RTCPeerConnectionEvent::OnIceGatheringStateChangeEvent(state) => {
            info!("ice gathering state has changed to {state}");
            return *state == RTCIceGatheringState::Complete;
        }
        RTCPeerConnectionEvent::OnDataChannel(event) => info!("data channel event {event:?}"),
    }
    false
}
