//! Configuration management

use std::fmt;
use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,
    /// Authentication configuration
    pub auth: AuthSettings,
    /// Catalog content configuration
    pub catalog: CatalogConfig,
}

impl Config {
    /// Load configuration from file and environment.
    ///
    /// Environment variables use the `ORD_GATEWAY_` prefix with `__` as the
    /// section separator (e.g. `ORD_GATEWAY_AUTH__MODE=mtls`) and override
    /// file values for the same key.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file does not exist or cannot be parsed.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::new();

        if let Some(p) = path {
            if !p.exists() {
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            figment = figment.merge(Yaml::file(p));
        }

        figment = figment.merge(Env::prefixed("ORD_GATEWAY_").split("__"));

        figment.extract().map_err(|e| Error::Config(e.to_string()))
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Path serving the open landing page
    pub base_path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 4004,
            base_path: "/".to_string(),
        }
    }
}

/// Authentication strategy gating the discovery endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    /// No authentication; every discovery request is allowed
    #[default]
    Open,
    /// Username/secret pair presented via `Authorization: Basic`
    Basic,
    /// Client certificate verified against the configured trust anchors
    Mtls,
    /// Certificate when one is presented, basic credentials otherwise
    BasicOrMtls,
}

impl AuthMode {
    /// Whether this mode verifies basic credentials
    #[must_use]
    pub fn requires_basic(self) -> bool {
        matches!(self, Self::Basic | Self::BasicOrMtls)
    }

    /// Whether this mode verifies client certificates
    #[must_use]
    pub fn requires_mtls(self) -> bool {
        matches!(self, Self::Mtls | Self::BasicOrMtls)
    }

    /// Configuration-file spelling of the mode
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Basic => "basic",
            Self::Mtls => "mtls",
            Self::BasicOrMtls => "basic_or_mtls",
        }
    }
}

/// Authentication configuration for gateway access.
///
/// Pure data; validation happens in
/// [`AuthContext::from_settings`](crate::auth::AuthContext::from_settings)
/// so incomplete settings abort startup instead of opening the endpoints.
#[derive(Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AuthSettings {
    /// Active authentication mode
    pub mode: AuthMode,

    /// Username for basic authentication
    pub basic_user: Option<String>,

    /// Secret for basic authentication
    pub basic_secret: Option<String>,

    /// PEM files holding the client-certificate trust anchors
    pub trust_anchor_paths: Vec<String>,

    /// Subject common names accepted after chain verification
    /// (empty = any verified subject)
    pub trusted_subjects: Vec<String>,
}

// Hand-written so the secret never reaches logs through `{:?}`.
impl fmt::Debug for AuthSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthSettings")
            .field("mode", &self.mode)
            .field("basic_user", &self.basic_user)
            .field(
                "basic_secret",
                &self.basic_secret.as_ref().map(|_| "<redacted>"),
            )
            .field("trust_anchor_paths", &self.trust_anchor_paths)
            .field("trusted_subjects", &self.trusted_subjects)
            .finish()
    }
}

/// Catalog content configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Title shown on the landing page
    pub title: String,
    /// JSON file served as the well-known ORD document
    pub document_path: Option<String>,
    /// Directory of metadata files served under the discovery mounts
    pub metadata_dir: Option<String>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            title: "Open Resource Discovery".to_string(),
            document_path: None,
            metadata_dir: None,
        }
    }
}
