//! Document and metadata providers behind the gated endpoints.
//!
//! The gateway itself only routes and authenticates; what it serves comes
//! from two collaborator traits. [`DocumentProducer`] yields the well-known
//! discovery document, [`MetadataResolver`] answers every other gated path.
//! File-backed implementations are provided for both so the binary works out
//! of the box; deployments with generated catalogs supply their own.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use axum::http::Uri;
use serde_json::{Value, json};
use tracing::debug;
use walkdir::WalkDir;

use crate::{COMPAT_PREFIX, DISCOVERY_PREFIX, Error, Result};

// ─────────────────────────────────────────────────────────────────────────────
// Request and response shapes
// ─────────────────────────────────────────────────────────────────────────────

/// A metadata lookup, carrying the request path exactly as received.
///
/// Resource identifiers may contain colons (`namespace:apiResource:name:v1`),
/// so the path is never split into segments before it reaches the resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataRequest {
    /// Raw request path, including the mount prefix.
    pub path: String,
    /// Raw query string, without the leading `?`.
    pub query: Option<String>,
}

impl MetadataRequest {
    /// Capture the path and query of a request URI verbatim.
    #[must_use]
    pub fn from_uri(uri: &Uri) -> Self {
        Self {
            path: uri.path().to_string(),
            query: uri.query().map(str::to_string),
        }
    }
}

/// A resolved metadata payload and the content type to serve it under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedMetadata {
    /// MIME type for the `Content-Type` response header.
    pub content_type: String,
    /// Response body.
    pub body: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Collaborator traits
// ─────────────────────────────────────────────────────────────────────────────

/// Source of the well-known discovery document.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync + 'static` so they can be stored in
/// `Arc<dyn DocumentProducer>` and shared across request tasks.
#[async_trait]
pub trait DocumentProducer: Send + Sync + 'static {
    /// Produce the discovery document.
    ///
    /// # Errors
    ///
    /// Returns an error when the document cannot be assembled; the gateway
    /// maps it to a 500 response.
    async fn produce(&self) -> Result<Value>;
}

/// Resolver for metadata paths under both mounts.
#[async_trait]
pub trait MetadataResolver: Send + Sync + 'static {
    /// Resolve a metadata request to a payload.
    ///
    /// # Errors
    ///
    /// Returns an error when the path resolves to nothing or the payload
    /// cannot be loaded; the gateway maps it to a 500 response whose body is
    /// the error message.
    async fn resolve(&self, request: &MetadataRequest) -> Result<ResolvedMetadata>;
}

// ─────────────────────────────────────────────────────────────────────────────
// File-backed implementations
// ─────────────────────────────────────────────────────────────────────────────

/// Serves one discovery document loaded at startup.
#[derive(Debug, Clone)]
pub struct StaticDocumentProducer {
    document: Value,
}

impl StaticDocumentProducer {
    /// Load the document from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when the file is unreadable or not JSON.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Cannot read document file '{}': {e}", path.display()))
        })?;
        let document = serde_json::from_str(&raw).map_err(|e| {
            Error::Config(format!("Document file '{}' is not valid JSON: {e}", path.display()))
        })?;
        Ok(Self { document })
    }

    /// A minimal document describing an empty catalog.
    #[must_use]
    pub fn empty(title: &str) -> Self {
        Self {
            document: json!({
                "$schema": "https://sap.github.io/open-resource-discovery/spec-v1/interfaces/Document.schema.json",
                "openResourceDiscovery": "1.9",
                "description": title,
                "apiResources": [],
                "eventResources": [],
            }),
        }
    }
}

#[async_trait]
impl DocumentProducer for StaticDocumentProducer {
    async fn produce(&self) -> Result<Value> {
        Ok(self.document.clone())
    }
}

/// Serves metadata files from a directory tree.
///
/// Files are indexed once at startup by their path relative to the root, so
/// an identifier like `customer:orders:v1/openapi.json` maps to the file of
/// the same name. The same index answers both mounts.
#[derive(Debug, Clone, Default)]
pub struct DirectoryResolver {
    entries: HashMap<String, PathBuf>,
}

impl DirectoryResolver {
    /// Index every regular file under `dir`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when `dir` is not a directory or cannot be
    /// walked.
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(Error::Config(format!(
                "Metadata directory not found: {}",
                dir.display()
            )));
        }

        let mut entries = HashMap::new();
        for entry in WalkDir::new(dir).follow_links(true) {
            let entry = entry.map_err(|e| {
                Error::Config(format!("Cannot walk metadata directory: {e}"))
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = entry
                .path()
                .strip_prefix(dir)
                .unwrap_or(entry.path())
                .to_string_lossy()
                .into_owned();
            entries.insert(relative, entry.path().to_path_buf());
        }

        debug!(dir = %dir.display(), entries = entries.len(), "Indexed metadata directory");
        Ok(Self { entries })
    }

    /// A resolver with no entries; every lookup misses.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Strip the mount prefix so the remainder keys into the file index.
    fn strip_mount(path: &str) -> &str {
        path.strip_prefix(DISCOVERY_PREFIX)
            .or_else(|| path.strip_prefix(COMPAT_PREFIX))
            .unwrap_or(path)
            .trim_start_matches('/')
    }
}

#[async_trait]
impl MetadataResolver for DirectoryResolver {
    async fn resolve(&self, request: &MetadataRequest) -> Result<ResolvedMetadata> {
        let key = Self::strip_mount(&request.path);
        let Some(file) = self.entries.get(key) else {
            return Err(Error::Metadata(format!(
                "No metadata found for '{}'",
                request.path
            )));
        };

        let body = tokio::fs::read_to_string(file)
            .await
            .map_err(|e| Error::Metadata(format!("Cannot read metadata for '{key}': {e}")))?;

        Ok(ResolvedMetadata {
            content_type: content_type_for(key).to_string(),
            body,
        })
    }
}

/// MIME type by file extension. Unknown extensions are served as opaque bytes.
fn content_type_for(key: &str) -> &'static str {
    let extension = key.rsplit('.').next().unwrap_or_default();
    match extension {
        "json" | "csn" => "application/json",
        "xml" | "edmx" => "application/xml",
        "yaml" | "yml" => "application/yaml",
        "html" => "text/html",
        "txt" => "text/plain",
        _ => "application/octet-stream",
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn write_file(dir: &Path, relative: &str, contents: &str) {
        let path = dir.join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, contents).unwrap();
    }

    // ── request capture ──────────────────────────────────────────────────────

    #[test]
    fn from_uri_preserves_colon_identifiers() {
        let uri: Uri = "/ord/v1/customer:orders:v1/$metadata?sap-language=EN"
            .parse()
            .unwrap();
        let request = MetadataRequest::from_uri(&uri);
        assert_eq!(request.path, "/ord/v1/customer:orders:v1/$metadata");
        assert_eq!(request.query.as_deref(), Some("sap-language=EN"));
    }

    #[test]
    fn from_uri_without_query() {
        let uri: Uri = "/open-resource-discovery/v1/csn".parse().unwrap();
        let request = MetadataRequest::from_uri(&uri);
        assert_eq!(request.query, None);
    }

    // ── document producer ────────────────────────────────────────────────────

    #[tokio::test]
    async fn static_producer_returns_its_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.json");
        std::fs::write(&path, r#"{"openResourceDiscovery": "1.9"}"#).unwrap();

        let producer = StaticDocumentProducer::from_file(&path).unwrap();
        let document = producer.produce().await.unwrap();
        assert_eq!(document["openResourceDiscovery"], "1.9");
    }

    #[tokio::test]
    async fn empty_producer_describes_an_empty_catalog() {
        let producer = StaticDocumentProducer::empty("Test Catalog");
        let document = producer.produce().await.unwrap();

        assert_eq!(document["description"], "Test Catalog");
        assert_eq!(document["openResourceDiscovery"], "1.9");
        assert_eq!(document["apiResources"], json!([]));
    }

    #[test]
    fn from_file_rejects_invalid_json_naming_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = StaticDocumentProducer::from_file(&path).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("not valid JSON"));
        assert!(msg.contains("broken.json"), "message was: {msg}");
    }

    // ── directory resolver ───────────────────────────────────────────────────

    #[tokio::test]
    async fn resolves_colon_named_entries_under_both_mounts() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "customer:orders:v1/openapi.json", r#"{"openapi":"3.0.0"}"#);
        let resolver = DirectoryResolver::from_dir(dir.path()).unwrap();

        for mount in ["/open-resource-discovery/v1", "/ord/v1"] {
            let request = MetadataRequest {
                path: format!("{mount}/customer:orders:v1/openapi.json"),
                query: None,
            };
            let resolved = resolver.resolve(&request).await.unwrap();
            assert_eq!(resolved.content_type, "application/json");
            assert_eq!(resolved.body, r#"{"openapi":"3.0.0"}"#);
        }
    }

    #[tokio::test]
    async fn miss_reports_the_requested_path() {
        let resolver = DirectoryResolver::empty();
        let request = MetadataRequest {
            path: "/ord/v1/nothing:here:v1".to_string(),
            query: None,
        };

        let err = resolver.resolve(&request).await.unwrap_err();
        assert_eq!(err.to_string(), "No metadata found for '/ord/v1/nothing:here:v1'");
    }

    #[tokio::test]
    async fn content_type_follows_extension() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "service/$metadata.xml", "<edmx/>");
        write_file(dir.path(), "service/schema.yaml", "openapi: 3.0.0");
        write_file(dir.path(), "service/blob.bin", "x");
        let resolver = DirectoryResolver::from_dir(dir.path()).unwrap();

        let cases = [
            ("service/$metadata.xml", "application/xml"),
            ("service/schema.yaml", "application/yaml"),
            ("service/blob.bin", "application/octet-stream"),
        ];
        for (key, expected) in cases {
            let request = MetadataRequest {
                path: format!("/ord/v1/{key}"),
                query: None,
            };
            let resolved = resolver.resolve(&request).await.unwrap();
            assert_eq!(resolved.content_type, expected, "for {key}");
        }
    }

    #[test]
    fn from_dir_rejects_missing_directory() {
        let err = DirectoryResolver::from_dir("/no/such/dir").unwrap_err();
        assert!(err.to_string().contains("Metadata directory not found"));
    }

    #[test]
    fn strip_mount_handles_unprefixed_paths() {
        assert_eq!(DirectoryResolver::strip_mount("/ord/v1/a/b"), "a/b");
        assert_eq!(
            DirectoryResolver::strip_mount("/open-resource-discovery/v1/a"),
            "a"
        );
        assert_eq!(DirectoryResolver::strip_mount("plain"), "plain");
    }
}
