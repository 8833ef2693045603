//! Authentication startup validation tests
//!
//! Tests the settings-to-context boundary:
//! - Per-mode material requirements and their error messages
//! - Trust anchors read at startup, compiled only on first use
//! - Gateway construction failing fast on unusable configuration

use rcgen::{BasicConstraints, CertificateParams, DistinguishedName, DnType, IsCa, KeyPair};

use ord_gateway::auth::AuthContext;
use ord_gateway::config::{AuthMode, AuthSettings, Config};
use ord_gateway::gateway::Gateway;

/// Write a freshly generated CA certificate into `dir` and return its path.
fn write_ca_pem(dir: &tempfile::TempDir) -> String {
    let key = KeyPair::generate().unwrap();
    let mut params = CertificateParams::default();
    let mut dn = DistinguishedName::new();
    dn.push(DnType::CommonName, "Test CA");
    params.distinguished_name = dn;
    params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
    let cert = params.self_signed(&key).unwrap();

    let path = dir.path().join("ca.pem");
    std::fs::write(&path, cert.pem()).unwrap();
    path.to_string_lossy().into_owned()
}

/// Test that open mode needs no credential material at all
#[test]
fn test_open_mode_needs_no_material() {
    let context = AuthContext::from_settings(&AuthSettings::default()).unwrap();
    assert_eq!(context.mode(), AuthMode::Open);
    assert!(context.validator().is_none());
}

/// Test that basic mode requires both credential halves
#[test]
fn test_basic_mode_requires_both_credential_halves() {
    let cases = [
        (Some("admin"), None),
        (None, Some("s3cret")),
        (None, None),
        (Some(""), Some("s3cret")),
        (Some("admin"), Some("")),
    ];

    for (user, secret) in cases {
        let settings = AuthSettings {
            mode: AuthMode::Basic,
            basic_user: user.map(str::to_string),
            basic_secret: secret.map(str::to_string),
            ..AuthSettings::default()
        };
        let err = AuthContext::from_settings(&settings).unwrap_err();
        assert!(
            err.to_string().contains("missing basic credentials"),
            "user={user:?} secret={secret:?} gave: {err}"
        );
    }
}

/// Test that mtls mode requires at least one trust anchor path
#[test]
fn test_mtls_mode_requires_trust_anchors() {
    let settings = AuthSettings {
        mode: AuthMode::Mtls,
        ..AuthSettings::default()
    };
    let err = AuthContext::from_settings(&settings).unwrap_err();
    assert!(err.to_string().contains("missing trust anchors"));
}

/// Test that an unreadable trust anchor aborts startup and names the file
#[test]
fn test_unreadable_trust_anchor_is_a_startup_error() {
    let settings = AuthSettings {
        mode: AuthMode::Mtls,
        trust_anchor_paths: vec!["/no/such/anchor.pem".to_string()],
        ..AuthSettings::default()
    };
    let err = AuthContext::from_settings(&settings).unwrap_err();
    assert!(err.to_string().contains("/no/such/anchor.pem"));
}

/// Test that readable anchors produce a validator without compiling it
#[test]
fn test_anchors_are_read_at_startup_but_compiled_lazily() {
    let dir = tempfile::tempdir().unwrap();
    let settings = AuthSettings {
        mode: AuthMode::Mtls,
        trust_anchor_paths: vec![write_ca_pem(&dir)],
        ..AuthSettings::default()
    };

    let context = AuthContext::from_settings(&settings).unwrap();
    let validator = context.validator().expect("mtls mode must carry a validator");
    assert_eq!(validator.compilations(), 0);
}

/// Test that the combined mode requires material for both schemes
#[test]
fn test_basic_or_mtls_requires_both_kinds_of_material() {
    let dir = tempfile::tempdir().unwrap();
    let anchor = write_ca_pem(&dir);

    let missing_credentials = AuthSettings {
        mode: AuthMode::BasicOrMtls,
        trust_anchor_paths: vec![anchor.clone()],
        ..AuthSettings::default()
    };
    let err = AuthContext::from_settings(&missing_credentials).unwrap_err();
    assert!(err.to_string().contains("missing basic credentials"));

    let missing_anchors = AuthSettings {
        mode: AuthMode::BasicOrMtls,
        basic_user: Some("admin".to_string()),
        basic_secret: Some("s3cret".to_string()),
        ..AuthSettings::default()
    };
    let err = AuthContext::from_settings(&missing_anchors).unwrap_err();
    assert!(err.to_string().contains("missing trust anchors"));

    let complete = AuthSettings {
        mode: AuthMode::BasicOrMtls,
        basic_user: Some("admin".to_string()),
        basic_secret: Some("s3cret".to_string()),
        trust_anchor_paths: vec![anchor],
        ..AuthSettings::default()
    };
    assert!(AuthContext::from_settings(&complete).is_ok());
}

/// Test that gateway construction fails fast on incomplete auth settings
#[test]
fn test_gateway_construction_fails_fast_on_incomplete_auth() {
    let mut config = Config::default();
    config.auth.mode = AuthMode::Basic;

    let err = Gateway::new(config).unwrap_err();
    assert!(err.to_string().contains("missing basic credentials"));
}

/// Test that gateway construction rejects a relative base path
#[test]
fn test_gateway_construction_rejects_relative_base_path() {
    let mut config = Config::default();
    config.server.base_path = "ord".to_string();

    let err = Gateway::new(config).unwrap_err();
    assert!(err.to_string().contains("Base path"));
}

/// Test that gateway construction rejects route syntax in the base path
#[test]
fn test_gateway_construction_rejects_braces_in_base_path() {
    for base_path in ["/{x}", "/catalog/{", "/catalog}"] {
        let mut config = Config::default();
        config.server.base_path = base_path.to_string();

        let err = Gateway::new(config).unwrap_err();
        assert!(
            err.to_string().contains("Base path"),
            "for {base_path}: {err}"
        );
    }
}

/// Test that the default configuration builds a working gateway
#[test]
fn test_gateway_construction_accepts_defaults() {
    let gateway = Gateway::new(Config::default()).unwrap();
    assert_eq!(gateway.auth().mode(), AuthMode::Open);
    assert!(gateway.auth().validator().is_none());
}
