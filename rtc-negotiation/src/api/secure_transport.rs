//! Process-wide secure transport subsystem.
//!
//! The first [`SecureTransport::initialize`] generates the DTLS identity that
//! every connection in the process advertises. Later calls share it for as
//! long as any guard is alive. Dropping the last guard, including the clones
//! held by factories and connections, runs cleanup exactly once; a later
//! `initialize` starts over with a fresh identity.

use std::fmt;
use std::sync::{Arc, Mutex, Weak};

use log::{debug, info};
use rcgen::{CertificateParams, KeyPair};
use sha2::{Digest, Sha256};
use shared::error::{Error, Result};
use shared::util::math_rand_alpha;

static SECURE_TRANSPORT: Mutex<Weak<SecureTransportInner>> = Mutex::new(Weak::new());

/// Certificate fingerprint advertised in the `a=fingerprint` SDP attribute.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct RTCDtlsFingerprint {
    /// Hash function name, always `sha-256` here.
    pub algorithm: String,
    /// Lowercase colon-separated hex digest.
    pub value: String,
}

impl fmt::Display for RTCDtlsFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.algorithm, self.value)
    }
}

struct SecureTransportInner {
    certificate_pem: String,
    fingerprint: RTCDtlsFingerprint,
}

impl SecureTransportInner {
    fn generate() -> Result<Self> {
        let key_pair = KeyPair::generate_for(&rcgen::PKCS_ECDSA_P256_SHA256)
            .map_err(|err| Error::ErrSecureTransportInit(err.to_string()))?;
        let params = CertificateParams::new(vec![math_rand_alpha(16)])
            .map_err(|err| Error::ErrSecureTransportInit(err.to_string()))?;
        let certificate = params
            .self_signed(&key_pair)
            .map_err(|err| Error::ErrSecureTransportInit(err.to_string()))?;

        let mut h = Sha256::new();
        h.update(certificate.der().as_ref());
        let hashed = h.finalize();
        let values: Vec<String> = hashed.iter().map(|x| format!("{x:02x}")).collect();

        Ok(SecureTransportInner {
            certificate_pem: certificate.pem(),
            fingerprint: RTCDtlsFingerprint {
                algorithm: "sha-256".to_owned(),
                value: values.join(":"),
            },
        })
    }
}

impl Drop for SecureTransportInner {
    fn drop(&mut self) {
        info!("secure transport cleanup");
    }
}

/// Guard over the initialized secure transport subsystem.
#[derive(Clone)]
pub struct SecureTransport {
    inner: Arc<SecureTransportInner>,
}

impl fmt::Debug for SecureTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecureTransport")
            .field("fingerprint", &self.inner.fingerprint)
            .finish()
    }
}

impl SecureTransport {
    /// Acquires the subsystem, initializing it if no guard is alive.
    pub fn initialize() -> Result<Self> {
        let mut state = SECURE_TRANSPORT.lock()?;
        if let Some(inner) = state.upgrade() {
            debug!("secure transport already initialized, sharing it");
            return Ok(SecureTransport { inner });
        }

        let inner = Arc::new(SecureTransportInner::generate()?);
        *state = Arc::downgrade(&inner);
        info!(
            "secure transport initialized, fingerprint {}",
            inner.fingerprint
        );

        Ok(SecureTransport { inner })
    }

    /// Reports whether any guard is currently alive in this process.
    pub fn is_initialized() -> bool {
        SECURE_TRANSPORT
            .lock()
            .map(|state| state.strong_count() > 0)
            .unwrap_or(false)
    }

    pub fn fingerprint(&self) -> &RTCDtlsFingerprint {
        &self.inner.fingerprint
    }

    pub fn certificate_pem(&self) -> &str {
        &self.inner.certificate_pem
    }
}
