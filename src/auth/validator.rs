//! Lazily compiled client-certificate trust validation.
//!
//! Trust-anchor material is read at startup but parsed and compiled into a
//! webpki verifier only on the first request that needs it. A [`OnceLock`]
//! guarantees exactly one compilation across concurrent first callers, and
//! the outcome is cached for the process lifetime. A cached failure rejects
//! every later certificate check instead of recompiling or letting traffic
//! through unvalidated.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

use rustls::RootCertStore;
use rustls::pki_types::{CertificateDer, UnixTime};
use rustls::server::WebPkiClientVerifier;
use rustls::server::danger::ClientCertVerifier;
use thiserror::Error;
use tracing::{debug, warn};

use crate::auth::identity::CertIdentity;
use crate::{Error, Result};

// ─────────────────────────────────────────────────────────────────────────────
// Verification errors
// ─────────────────────────────────────────────────────────────────────────────

/// Rejection reasons from [`ClientCertValidator::verify`].
#[derive(Debug, Error)]
pub enum VerifyError {
    /// The trust store failed to compile; all verification fails closed.
    #[error("trust store unavailable: {0}")]
    Unavailable(String),

    /// The presented chain is empty, malformed, or does not verify to a
    /// configured anchor.
    #[error("certificate chain rejected: {0}")]
    InvalidChain(String),

    /// The chain verified but its subject is not in the allowed set.
    #[error("certificate subject '{0}' is not trusted")]
    SubjectNotTrusted(String),
}

// ─────────────────────────────────────────────────────────────────────────────
// Validator
// ─────────────────────────────────────────────────────────────────────────────

/// Client-certificate validator with one-shot lazy trust-store compilation.
#[derive(Debug)]
pub struct ClientCertValidator {
    /// PEM-encoded anchor material, read at startup, parsed on first use.
    anchors_pem: Vec<Vec<u8>>,
    /// Subject common names accepted after chain verification (empty = any).
    trusted_subjects: Vec<String>,
    /// Compiled verifier, or the compile failure, set exactly once.
    store: OnceLock<std::result::Result<Arc<dyn ClientCertVerifier>, String>>,
    /// Number of compilations performed. Stays at 0 until first use, 1 after.
    compilations: AtomicUsize,
}

impl ClientCertValidator {
    /// Create a validator over PEM anchor material. No parsing happens here.
    #[must_use]
    pub fn new(anchors_pem: Vec<Vec<u8>>, trusted_subjects: Vec<String>) -> Self {
        Self {
            anchors_pem,
            trusted_subjects,
            store: OnceLock::new(),
            compilations: AtomicUsize::new(0),
        }
    }

    /// Verify a client certificate chain and extract the caller identity.
    ///
    /// The first element of `chain` is the end-entity certificate, the rest
    /// intermediates. Triggers trust-store compilation on first use.
    ///
    /// # Errors
    ///
    /// Returns [`VerifyError::Unavailable`] when the trust store did not
    /// compile, [`VerifyError::InvalidChain`] when the chain does not verify,
    /// and [`VerifyError::SubjectNotTrusted`] when a subject allow-list is
    /// configured and the verified subject is not on it.
    pub fn verify(
        &self,
        chain: &[CertificateDer<'static>],
    ) -> std::result::Result<CertIdentity, VerifyError> {
        let verifier = match self.compiled() {
            Ok(v) => v,
            Err(reason) => return Err(VerifyError::Unavailable(reason)),
        };

        let Some((end_entity, intermediates)) = chain.split_first() else {
            return Err(VerifyError::InvalidChain(
                "empty certificate chain".to_string(),
            ));
        };

        verifier
            .verify_client_cert(end_entity, intermediates, UnixTime::now())
            .map_err(|e| VerifyError::InvalidChain(e.to_string()))?;

        let identity = CertIdentity::from_der(end_entity.as_ref())
            .map_err(|e| VerifyError::InvalidChain(e.to_string()))?;

        if !self.trusted_subjects.is_empty() {
            let subject_ok = identity
                .common_name
                .as_deref()
                .is_some_and(|cn| self.trusted_subjects.iter().any(|s| s == cn));
            if !subject_ok {
                return Err(VerifyError::SubjectNotTrusted(identity.display_name));
            }
        }

        Ok(identity)
    }

    /// Whether a compiled trust store is available. Compiles on first call.
    pub fn is_ready(&self) -> bool {
        self.compiled().is_ok()
    }

    /// Number of trust-store compilations performed so far.
    pub fn compilations(&self) -> usize {
        self.compilations.load(Ordering::SeqCst)
    }

    /// Compiled verifier, or the cached failure. Compiles exactly once;
    /// concurrent first callers block on the single compilation and all
    /// observe the same outcome.
    fn compiled(&self) -> std::result::Result<Arc<dyn ClientCertVerifier>, String> {
        self.store
            .get_or_init(|| {
                self.compilations.fetch_add(1, Ordering::SeqCst);
                match compile_trust_store(&self.anchors_pem) {
                    Ok(verifier) => {
                        debug!(anchors = self.anchors_pem.len(), "Client trust store compiled");
                        Ok(verifier)
                    }
                    Err(e) => {
                        warn!(
                            error = %e,
                            "Client trust store compilation failed; certificate checks will be rejected"
                        );
                        Err(e.to_string())
                    }
                }
            })
            .clone()
    }
}

/// Parse PEM anchor material and build a webpki client-certificate verifier.
fn compile_trust_store(anchors_pem: &[Vec<u8>]) -> Result<Arc<dyn ClientCertVerifier>> {
    let mut roots = RootCertStore::empty();
    let mut anchor_count = 0usize;

    for pem in anchors_pem {
        let certs: Vec<CertificateDer<'static>> = rustls_pemfile::certs(&mut pem.as_slice())
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| Error::Certificate(format!("Failed to parse trust anchor: {e}")))?;

        for cert in certs {
            roots
                .add(cert)
                .map_err(|e| Error::Certificate(format!("Failed to add trust anchor: {e}")))?;
            anchor_count += 1;
        }
    }

    if anchor_count == 0 {
        return Err(Error::Certificate(
            "No certificates found in trust anchor material".to_string(),
        ));
    }

    WebPkiClientVerifier::builder(Arc::new(roots))
        .build()
        .map_err(|e| Error::Certificate(format!("Failed to build client verifier: {e}")))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
