//! ORD Gateway Library
//!
//! Request authentication and routing for Open Resource Discovery (ORD)
//! endpoints, in front of an opaque document producer and metadata resolver.
//!
//! # Features
//!
//! - **Auth Modes**: open, basic, mtls, and basic_or_mtls gating of the
//!   discovery endpoints, configured per deployment
//! - **Lazy Trust Store**: client-certificate anchors compile on first use,
//!   exactly once, and fail closed on bad material
//! - **Identifier-Tolerant Routing**: resource identifiers with colons
//!   (`namespace:apiResource:name:v1`) pass through dispatch unsplit
//! - **Dual Mounts**: the same catalog under `/open-resource-discovery/v1`
//!   and the `/ord/v1` compatibility prefix

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod auth;
pub mod cli;
pub mod config;
pub mod error;
pub mod gateway;
pub mod provider;
pub mod template;

pub use error::{Error, Result};

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Primary mount prefix for the discovery endpoints
pub const DISCOVERY_PREFIX: &str = "/open-resource-discovery/v1";

/// Compatibility mount prefix serving the same catalog
pub const COMPAT_PREFIX: &str = "/ord/v1";

/// Setup tracing/logging
pub fn setup_tracing(level: &str, format: Option<&str>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::registry().with(filter);

    match format {
        Some("json") => {
            subscriber.with(fmt::layer().json()).init();
        }
        _ => {
            subscriber.with(fmt::layer()).init();
        }
    }

    Ok(())
}
