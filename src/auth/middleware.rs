//! Request authentication middleware for the gated endpoint classes.
//!
//! [`AuthContext`] is built once at startup from validated settings and shared
//! across requests. [`require_auth`] runs in front of every gated route,
//! applies the configured mode's decision table via [`authorize`], and either
//! forwards the request or converts the [`AuthRejection`] into a response.
//! Rejection bodies are generic; the reason goes to the log, never the wire.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rustls::pki_types::CertificateDer;
use tracing::{debug, warn};

use crate::auth::basic::BasicCredentials;
use crate::auth::identity::CertIdentity;
use crate::auth::validator::ClientCertValidator;
use crate::config::{AuthMode, AuthSettings};
use crate::{Error, Result};

/// Header carrying the forwarded client chain as comma-separated base64 DER,
/// end-entity certificate first. Set by a TLS-terminating front proxy.
pub const FORWARDED_CERT_HEADER: &str = "x-forwarded-client-cert";

// ─────────────────────────────────────────────────────────────────────────────
// Shared authentication state
// ─────────────────────────────────────────────────────────────────────────────

/// Client certificate chain recovered from local TLS termination, end-entity
/// first. Inserted into request extensions by the connection acceptor.
#[derive(Clone, Debug)]
pub struct PeerCertificates(pub Arc<Vec<CertificateDer<'static>>>);

/// Immutable authentication state derived from [`AuthSettings`].
#[derive(Debug)]
pub struct AuthContext {
    mode: AuthMode,
    credentials: Option<BasicCredentials>,
    validator: Option<Arc<ClientCertValidator>>,
}

impl AuthContext {
    /// Validate settings and build the shared context.
    ///
    /// Fails fast when the selected mode lacks its material: Basic modes need
    /// both credential halves, mTLS modes need at least one readable trust
    /// anchor file. Anchor files are read here but not parsed; parsing is
    /// deferred to the validator's first use.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when required material is missing or a trust
    /// anchor file cannot be read.
    pub fn from_settings(settings: &AuthSettings) -> Result<Self> {
        let credentials = if settings.mode.requires_basic() {
            let user = settings.basic_user.as_deref().unwrap_or_default();
            let secret = settings.basic_secret.as_deref().unwrap_or_default();
            if user.is_empty() || secret.is_empty() {
                return Err(Error::Config("missing basic credentials".to_string()));
            }
            Some(BasicCredentials::new(user, secret))
        } else {
            None
        };

        let validator = if settings.mode.requires_mtls() {
            if settings.trust_anchor_paths.is_empty() {
                return Err(Error::Config("missing trust anchors".to_string()));
            }
            let mut anchors = Vec::with_capacity(settings.trust_anchor_paths.len());
            for path in &settings.trust_anchor_paths {
                let pem = std::fs::read(path)
                    .map_err(|e| Error::Config(format!("cannot read trust anchor '{path}': {e}")))?;
                anchors.push(pem);
            }
            Some(Arc::new(ClientCertValidator::new(
                anchors,
                settings.trusted_subjects.clone(),
            )))
        } else {
            None
        };

        Ok(Self {
            mode: settings.mode,
            credentials,
            validator,
        })
    }

    /// Configured authentication mode.
    #[must_use]
    pub fn mode(&self) -> AuthMode {
        self.mode
    }

    /// Certificate validator, present in the mTLS-capable modes.
    #[must_use]
    pub fn validator(&self) -> Option<&Arc<ClientCertValidator>> {
        self.validator.as_ref()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Outcomes and rejections
// ─────────────────────────────────────────────────────────────────────────────

/// How a request cleared the authentication gate.
#[derive(Debug, Clone)]
pub enum AuthOutcome {
    /// No authentication configured.
    Open,
    /// Valid Basic credentials.
    Basic {
        /// Username the caller presented.
        username: String,
    },
    /// Valid client certificate chain.
    Certificate(Box<CertIdentity>),
}

/// A refused request: status, optional Basic challenge, and a log-only reason.
#[derive(Debug)]
pub struct AuthRejection {
    status: StatusCode,
    challenge_basic: bool,
    reason: String,
}

impl AuthRejection {
    fn unauthorized(reason: impl Into<String>, challenge_basic: bool) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            challenge_basic,
            reason: reason.into(),
        }
    }

    fn forbidden(reason: impl Into<String>) -> Self {
        Self {
            status: StatusCode::FORBIDDEN,
            challenge_basic: false,
            reason: reason.into(),
        }
    }

    /// Response status for this rejection.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Why the request was refused. Logged, never sent to the client.
    #[must_use]
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        if self.status == StatusCode::UNAUTHORIZED {
            let mut response = (StatusCode::UNAUTHORIZED, "Unauthorized").into_response();
            if self.challenge_basic {
                response.headers_mut().insert(
                    header::WWW_AUTHENTICATE,
                    HeaderValue::from_static("Basic realm=\"ord\""),
                );
            }
            response
        } else {
            (self.status, "Forbidden").into_response()
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Decision table
// ─────────────────────────────────────────────────────────────────────────────

/// Apply the configured mode's decision table to a request.
///
/// # Errors
///
/// Returns an [`AuthRejection`] describing the refusal; see the module
/// documentation in [`crate::auth`] for the per-mode table.
pub fn authorize(
    auth: &AuthContext,
    request: &Request<Body>,
) -> std::result::Result<AuthOutcome, AuthRejection> {
    match auth.mode {
        AuthMode::Open => Ok(AuthOutcome::Open),
        AuthMode::Basic => check_basic(auth, request),
        AuthMode::Mtls => check_mtls(auth, client_chain(request)),
        // A presented certificate selects the certificate path, but its
        // failures surface as 401 with a Basic challenge so the caller can
        // retry with the other scheme.
        AuthMode::BasicOrMtls => match client_chain(request) {
            Ok(None) => check_basic(auth, request),
            chain => check_mtls(auth, chain)
                .map_err(|rejection| AuthRejection::unauthorized(rejection.reason, true)),
        },
    }
}

fn check_basic(
    auth: &AuthContext,
    request: &Request<Body>,
) -> std::result::Result<AuthOutcome, AuthRejection> {
    let Some(expected) = auth.credentials.as_ref() else {
        return Err(AuthRejection::unauthorized(
            "basic credentials are not configured",
            true,
        ));
    };

    let presented = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(BasicCredentials::from_header);

    match presented {
        Some(presented) if expected.matches(&presented) => Ok(AuthOutcome::Basic {
            username: presented.username().to_string(),
        }),
        Some(_) => Err(AuthRejection::unauthorized(
            "basic credentials do not match",
            true,
        )),
        None => Err(AuthRejection::unauthorized(
            "missing or malformed Basic authorization",
            true,
        )),
    }
}

fn check_mtls(
    auth: &AuthContext,
    chain: std::result::Result<Option<Vec<CertificateDer<'static>>>, String>,
) -> std::result::Result<AuthOutcome, AuthRejection> {
    let Some(validator) = auth.validator.as_ref() else {
        return Err(AuthRejection::forbidden(
            "certificate validation is not configured",
        ));
    };

    let chain = match chain {
        Ok(Some(chain)) => chain,
        Ok(None) => {
            return Err(AuthRejection::unauthorized(
                "client certificate required",
                false,
            ));
        }
        Err(reason) => return Err(AuthRejection::forbidden(reason)),
    };

    match validator.verify(&chain) {
        Ok(identity) => Ok(AuthOutcome::Certificate(Box::new(identity))),
        Err(e) => Err(AuthRejection::forbidden(e.to_string())),
    }
}

/// Recover the client chain from the request, end-entity first.
///
/// A chain placed in extensions by local TLS termination wins over the
/// forwarded header. `Ok(None)` means no certificate was presented at all;
/// a present but undecodable header is an error, not absence.
fn client_chain(
    request: &Request<Body>,
) -> std::result::Result<Option<Vec<CertificateDer<'static>>>, String> {
    if let Some(peer) = request.extensions().get::<PeerCertificates>() {
        if !peer.0.is_empty() {
            return Ok(Some(peer.0.as_ref().clone()));
        }
    }

    let Some(value) = request.headers().get(FORWARDED_CERT_HEADER) else {
        return Ok(None);
    };
    let header_str = value
        .to_str()
        .map_err(|_| "forwarded certificate header is not valid text".to_string())?;
    if header_str.trim().is_empty() {
        return Ok(None);
    }

    let mut chain = Vec::new();
    for part in header_str.split(',') {
        let der = STANDARD
            .decode(part.trim())
            .map_err(|e| format!("forwarded certificate is not valid base64: {e}"))?;
        chain.push(CertificateDer::from(der));
    }
    Ok(Some(chain))
}

// ─────────────────────────────────────────────────────────────────────────────
// Middleware
// ─────────────────────────────────────────────────────────────────────────────

/// Axum middleware gating the discovery and metadata routes.
pub async fn require_auth(
    State(auth): State<Arc<AuthContext>>,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();

    match authorize(&auth, &request) {
        Ok(outcome) => {
            match &outcome {
                AuthOutcome::Open => {}
                AuthOutcome::Basic { username } => {
                    debug!(user = %username, path = %path, "Request authenticated");
                }
                AuthOutcome::Certificate(identity) => {
                    debug!(client = %identity.display_name, path = %path, "Request authenticated");
                }
            }
            next.run(request).await
        }
        Err(rejection) => {
            warn!(
                path = %path,
                status = %rejection.status(),
                reason = %rejection.reason(),
                "Request rejected"
            );
            rejection.into_response()
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
