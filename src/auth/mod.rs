//! Request authentication for the discovery endpoints.
//!
//! Four modes gate the discovery mounts (the landing page stays open):
//!
//! ```text
//! open          → every request allowed
//! basic         → Authorization: Basic, constant-time credential check
//! mtls          → client certificate chain verified against trust anchors
//! basic_or_mtls → certificate verdict when a certificate is presented,
//!                 basic verdict otherwise
//! ```
//!
//! # Modules
//!
//! - [`basic`]: `Authorization: Basic` parsing and constant-time comparison
//! - [`identity`]: X.509 certificate field extraction (`CertIdentity`)
//! - [`validator`]: lazily compiled trust store (`ClientCertValidator`)
//! - [`middleware`]: the axum request gate (`AuthContext`, `require_auth`)
//!
//! The trust store compiles on the first request that needs it; a compile
//! failure is cached and every later certificate check fails closed.

pub mod basic;
pub mod identity;
pub mod middleware;
pub mod validator;

pub use basic::BasicCredentials;
pub use identity::CertIdentity;
pub use middleware::{AuthContext, AuthOutcome, AuthRejection, PeerCertificates, require_auth};
pub use validator::{ClientCertValidator, VerifyError};
