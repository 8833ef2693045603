//! Gateway server

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{info, warn};

use super::router::{AppState, build_router};
use crate::auth::AuthContext;
use crate::config::{AuthMode, Config};
use crate::provider::{
    DirectoryResolver, DocumentProducer, MetadataResolver, StaticDocumentProducer,
};
use crate::template::render_landing_page;
use crate::{Error, Result};

/// ORD gateway server
pub struct Gateway {
    /// Configuration
    config: Config,
    /// Authentication context, validated at construction
    auth: Arc<AuthContext>,
    /// Producer for the well-known discovery document
    producer: Arc<dyn DocumentProducer>,
    /// Resolver for metadata paths
    resolver: Arc<dyn MetadataResolver>,
}

// Hand-written because the provider trait objects carry no `Debug` bound.
impl fmt::Debug for Gateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gateway")
            .field("config", &self.config)
            .field("auth", &self.auth)
            .finish_non_exhaustive()
    }
}

impl Gateway {
    /// Create a new gateway
    ///
    /// Fails fast on configuration problems: an unusable base path, an
    /// authentication mode missing its material, or unreadable catalog
    /// files. Trust anchors are read here; compiling them is deferred to
    /// the first certificate check.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when the configuration is unusable.
    pub fn new(config: Config) -> Result<Self> {
        if !config.server.base_path.starts_with('/') {
            return Err(Error::Config(format!(
                "Base path must start with '/': {}",
                config.server.base_path
            )));
        }
        // Braces are route-parameter syntax; a literal base path carrying
        // them would either panic at route registration or silently become
        // a parameterized route.
        if config.server.base_path.contains(['{', '}']) {
            return Err(Error::Config(format!(
                "Base path must not contain '{{' or '}}': {}",
                config.server.base_path
            )));
        }

        let auth = Arc::new(AuthContext::from_settings(&config.auth)?);

        let producer: Arc<dyn DocumentProducer> = match &config.catalog.document_path {
            Some(path) => Arc::new(StaticDocumentProducer::from_file(path)?),
            None => Arc::new(StaticDocumentProducer::empty(&config.catalog.title)),
        };

        let resolver: Arc<dyn MetadataResolver> = match &config.catalog.metadata_dir {
            Some(dir) => Arc::new(DirectoryResolver::from_dir(dir)?),
            None => Arc::new(DirectoryResolver::empty()),
        };

        Ok(Self {
            config,
            auth,
            producer,
            resolver,
        })
    }

    /// Replace the file-backed providers, for embedding the gateway in front
    /// of a generated catalog.
    #[must_use]
    pub fn with_providers(
        mut self,
        producer: Arc<dyn DocumentProducer>,
        resolver: Arc<dyn MetadataResolver>,
    ) -> Self {
        self.producer = producer;
        self.resolver = resolver;
        self
    }

    /// Authentication context shared with the request middleware.
    #[must_use]
    pub fn auth(&self) -> &Arc<AuthContext> {
        &self.auth
    }

    /// Build the application router served by [`run`](Self::run).
    ///
    /// Embedders and tests can drive this directly without binding a
    /// listener.
    #[must_use]
    pub fn router(&self) -> Router {
        let state = Arc::new(AppState {
            auth: Arc::clone(&self.auth),
            producer: Arc::clone(&self.producer),
            resolver: Arc::clone(&self.resolver),
            landing_page: render_landing_page(&self.config),
            base_path: self.config.server.base_path.clone(),
        });
        build_router(state)
    }

    /// Run the gateway
    ///
    /// # Errors
    ///
    /// Returns an error when the listen address is invalid, the listener
    /// cannot bind, or the server fails while running.
    pub async fn run(self) -> Result<()> {
        let addr = SocketAddr::new(
            self.config
                .server
                .host
                .parse()
                .map_err(|e| Error::Config(format!("Invalid host: {e}")))?,
            self.config.server.port,
        );

        let app = self.router();
        let listener = TcpListener::bind(addr).await?;

        info!(
            version = env!("CARGO_PKG_VERSION"),
            host = %self.config.server.host,
            port = self.config.server.port,
            auth_mode = self.config.auth.mode.as_str(),
            "ORD gateway listening"
        );
        if self.config.auth.mode == AuthMode::Open {
            warn!("Authentication disabled - discovery endpoints are open to all requests");
        }

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| Error::Internal(e.to_string()))?;

        info!("Shutdown complete");
        Ok(())
    }
}

/// Shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received");
}
