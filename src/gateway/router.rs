//! HTTP router and handlers

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderValue, StatusCode, Uri, header},
    middleware,
    response::{Html, IntoResponse, Response},
    routing::get,
};
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};
use tracing::error;

use crate::auth::{AuthContext, require_auth};
use crate::provider::{DocumentProducer, MetadataRequest, MetadataResolver};
use crate::{COMPAT_PREFIX, DISCOVERY_PREFIX};

/// Well-known document path relative to the discovery mount.
const WELL_KNOWN_DOCUMENT: &str = "documents/system-version";

/// Shared application state
pub struct AppState {
    /// Authentication context gating the discovery routes
    pub auth: Arc<AuthContext>,
    /// Producer for the well-known discovery document
    pub producer: Arc<dyn DocumentProducer>,
    /// Resolver for every other gated path
    pub resolver: Arc<dyn MetadataResolver>,
    /// Pre-rendered landing page
    pub landing_page: String,
    /// Open base path serving the landing page
    pub base_path: String,
}

/// Create the router
///
/// The two discovery mounts are registered as bare paths, trailing-slash
/// forms, and catch-all wildcards pointing at the same handler; the wildcard
/// requires a non-empty remainder, so the slash-only form needs its own
/// route. Classification happens inside the handler on the raw URI, so
/// colon-bearing identifiers are never split by path-parameter matching.
/// Authentication is a route layer on the gated routes only, leaving the
/// base path open in every mode.
pub fn build_router(state: Arc<AppState>) -> Router {
    let auth = Arc::clone(&state.auth);

    let gated = Router::new()
        .route(DISCOVERY_PREFIX, get(discovery_handler))
        .route(&format!("{DISCOVERY_PREFIX}/"), get(discovery_handler))
        .route(
            &format!("{DISCOVERY_PREFIX}/{{*rest}}"),
            get(discovery_handler),
        )
        .route(COMPAT_PREFIX, get(metadata_handler))
        .route(&format!("{COMPAT_PREFIX}/"), get(metadata_handler))
        .route(&format!("{COMPAT_PREFIX}/{{*rest}}"), get(metadata_handler))
        .route_layer(middleware::from_fn_with_state(auth, require_auth));

    Router::new()
        .route(&state.base_path, get(landing_handler))
        .merge(gated)
        .layer(CatchPanicLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ─────────────────────────────────────────────────────────────────────────────
// Route classification
// ─────────────────────────────────────────────────────────────────────────────

/// Where a discovery-mount path dispatches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DiscoveryRoute {
    /// The well-known document endpoint.
    WellKnownDocument,
    /// A single-segment document id; always answered with a stable 404.
    DocumentById,
    /// Everything else falls through to the metadata resolver.
    Metadata,
}

/// Classify the remainder of a discovery-mount path.
///
/// Precedence: the well-known document wins over the id route, and only a
/// single non-empty segment after `documents/` counts as an id. Nested
/// paths under `documents/` and the bare word `documents` are metadata.
fn classify(rest: &str) -> DiscoveryRoute {
    if rest == WELL_KNOWN_DOCUMENT {
        return DiscoveryRoute::WellKnownDocument;
    }
    if let Some(id) = rest.strip_prefix("documents/") {
        if !id.is_empty() && !id.contains('/') {
            return DiscoveryRoute::DocumentById;
        }
    }
    DiscoveryRoute::Metadata
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

async fn landing_handler(State(state): State<Arc<AppState>>) -> Html<String> {
    Html(state.landing_page.clone())
}

/// Handler for the discovery mount, including its documents subtree.
async fn discovery_handler(State(state): State<Arc<AppState>>, uri: Uri) -> Response {
    let rest = uri
        .path()
        .strip_prefix(DISCOVERY_PREFIX)
        .unwrap_or_default()
        .trim_start_matches('/');

    match classify(rest) {
        DiscoveryRoute::WellKnownDocument => well_known_document(&state).await,
        DiscoveryRoute::DocumentById => {
            (StatusCode::NOT_FOUND, "404 Not Found").into_response()
        }
        DiscoveryRoute::Metadata => resolve_metadata(&state, &uri).await,
    }
}

/// Handler for the compatibility mount; every path is metadata.
async fn metadata_handler(State(state): State<Arc<AppState>>, uri: Uri) -> Response {
    resolve_metadata(&state, &uri).await
}

async fn well_known_document(state: &AppState) -> Response {
    match state.producer.produce().await {
        Ok(document) => Json(document).into_response(),
        Err(e) => {
            error!(error = %e, "Failed to produce discovery document");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

async fn resolve_metadata(state: &AppState, uri: &Uri) -> Response {
    let request = MetadataRequest::from_uri(uri);

    match state.resolver.resolve(&request).await {
        Ok(resolved) => {
            let content_type = HeaderValue::from_str(&resolved.content_type)
                .unwrap_or(HeaderValue::from_static("application/octet-stream"));
            ([(header::CONTENT_TYPE, content_type)], resolved.body).into_response()
        }
        Err(e) => {
            error!(error = %e, path = %request.path, "Failed to resolve metadata");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn well_known_document_beats_the_id_route() {
        assert_eq!(
            classify("documents/system-version"),
            DiscoveryRoute::WellKnownDocument
        );
    }

    #[test]
    fn single_segment_ids_are_documents() {
        assert_eq!(classify("documents/123"), DiscoveryRoute::DocumentById);
        assert_eq!(
            classify("documents/sap:ord:v1"),
            DiscoveryRoute::DocumentById
        );
    }

    #[test]
    fn nested_document_paths_are_metadata() {
        assert_eq!(classify("documents/a/b"), DiscoveryRoute::Metadata);
        assert_eq!(
            classify("documents/system-version/extra"),
            DiscoveryRoute::Metadata
        );
    }

    #[test]
    fn bare_and_empty_paths_are_metadata() {
        assert_eq!(classify(""), DiscoveryRoute::Metadata);
        assert_eq!(classify("documents"), DiscoveryRoute::Metadata);
        assert_eq!(classify("documents/"), DiscoveryRoute::Metadata);
    }

    #[test]
    fn colon_identifiers_are_metadata() {
        assert_eq!(
            classify("namespace:apiResource:name:v1"),
            DiscoveryRoute::Metadata
        );
    }
}
