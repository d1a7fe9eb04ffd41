//! The secure transport subsystem is process-wide, so its lifetime is checked
//! in a test binary of its own.

mod common;

use std::sync::Arc;

use anyhow::Result;

use common::{ScriptedTransportProvider, init_logging, new_factory, stun_config};
use rtc_negotiation::api::secure_transport::SecureTransport;

#[test]
fn test_secure_transport_outlives_factory_and_connections() -> Result<()> {
    init_logging();
    assert!(!SecureTransport::is_initialized());

    let first = SecureTransport::initialize()?;
    let second = SecureTransport::initialize()?;
    assert!(SecureTransport::is_initialized());
    assert_eq!(first.fingerprint(), second.fingerprint());
    assert_eq!(first.fingerprint().algorithm, "sha-256");
    assert_eq!(first.fingerprint().value.split(':').count(), 32);
    let fingerprint = first.fingerprint().clone();
    drop(first);
    assert!(SecureTransport::is_initialized());

    let factory = new_factory(&second, Arc::new(ScriptedTransportProvider::new()))?;
    drop(second);
    assert!(SecureTransport::is_initialized());

    let (pc, _events) = factory.create_peer_connection(stun_config("stun:stun.example.com"))?;
    let thread_pool = factory.thread_pool().clone();
    drop(factory);
    assert!(SecureTransport::is_initialized());

    // the connection state holds the last guard and is released on the
    // signaling context
    drop(pc);
    thread_pool.stop();
    assert!(!SecureTransport::is_initialized());

    let again = SecureTransport::initialize()?;
    assert_ne!(again.fingerprint(), &fingerprint);

    Ok(())
}
