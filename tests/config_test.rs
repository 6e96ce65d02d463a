use std::{collections::HashMap, time::Duration};

use sfunits::config::{Config, RateLimit, load_env_file, parse_rate_limit};
use sfunits::error::Error;

fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| vars.get(key).cloned()
}

#[test]
fn test_defaults() {
    let config =
        Config::from_lookup(lookup(&[("SF_CLIENT_ID", "id"), ("SF_CLIENT_SECRET", "secret")]))
            .unwrap();

    assert_eq!(config.client_id, "id");
    assert_eq!(config.login_url, "https://test.salesforce.com");
    assert_eq!(config.redirect_uri, "http://localhost:5000/callback");
    assert_eq!(config.server_addr, "0.0.0.0:5000");
    assert_eq!(config.api_version, "59.0");
    assert_eq!(config.request_timeout, Duration::from_secs(10));
    assert_eq!(config.session_ttl, Duration::from_secs(3600));
    assert_eq!(config.cache_ttl, Duration::from_secs(60));
    assert_eq!(config.rate_limit, RateLimit::default());
    assert!(config.use_pkce);
    assert!(!config.secure_cookies());
}

#[test]
fn test_missing_credentials_are_all_named() {
    let err = Config::from_lookup(lookup(&[])).unwrap_err();
    match err {
        Error::Config(message) => {
            assert!(message.contains("SF_CLIENT_ID"));
            assert!(message.contains("SF_CLIENT_SECRET"));
        }
        other => panic!("expected config error, got {other:?}"),
    }

    // Blank values count as missing
    let err = Config::from_lookup(lookup(&[("SF_CLIENT_ID", "id"), ("SF_CLIENT_SECRET", "  ")]))
        .unwrap_err();
    assert!(matches!(err, Error::Config(m) if m == "Missing in environment: SF_CLIENT_SECRET"));
}

#[test]
fn test_overrides() {
    let config = Config::from_lookup(lookup(&[
        ("SF_CLIENT_ID", "id"),
        ("SF_CLIENT_SECRET", "secret"),
        ("SF_LOGIN_URL", "https://acme--dev.sandbox.my.salesforce.com/"),
        ("SF_REDIRECT_URI", "https://units.example.com/callback"),
        ("PORT", "8080"),
        ("SF_API_VERSION", "v61.0"),
        ("SF_REQUEST_TIMEOUT_SECS", "3"),
        ("CACHE_TTL_SECONDS", "5"),
        ("RATE_LIMIT", "10 per second"),
        ("SF_USE_PKCE", "false"),
    ]))
    .unwrap();

    assert_eq!(config.login_url, "https://acme--dev.sandbox.my.salesforce.com");
    assert_eq!(config.server_addr, "0.0.0.0:8080");
    assert_eq!(config.api_version, "61.0");
    assert_eq!(config.request_timeout, Duration::from_secs(3));
    assert_eq!(config.cache_ttl, Duration::from_secs(5));
    assert_eq!(config.rate_limit.max_requests, 10);
    assert_eq!(config.rate_limit.window, Duration::from_secs(1));
    assert!(!config.use_pkce);
    assert!(config.secure_cookies());
}

#[test]
fn test_invalid_values_are_rejected() {
    let base = [("SF_CLIENT_ID", "id"), ("SF_CLIENT_SECRET", "secret")];

    for (key, value) in [
        ("SF_LOGIN_URL", "not a url"),
        ("PORT", "eighty"),
        ("SESSION_TTL_SECS", "-1"),
        ("RATE_LIMIT", "lots"),
        ("SF_USE_PKCE", "maybe"),
    ] {
        let mut pairs = base.to_vec();
        pairs.push((key, value));
        let result = Config::from_lookup(lookup(&pairs));
        assert!(
            matches!(result, Err(Error::Config(_))),
            "{key}={value} should be rejected"
        );
    }
}

#[test]
fn test_debug_redacts_secret() {
    let config = Config::from_lookup(lookup(&[
        ("SF_CLIENT_ID", "id"),
        ("SF_CLIENT_SECRET", "super-secret-value"),
    ]))
    .unwrap();
    let debug = format!("{config:?}");
    assert!(!debug.contains("super-secret-value"));
    assert!(debug.contains("[REDACTED]"));
}

#[test]
fn test_parse_rate_limit() {
    let limit = parse_rate_limit("60 per minute").unwrap();
    assert_eq!(limit.max_requests, 60);
    assert_eq!(limit.window, Duration::from_secs(60));

    assert_eq!(
        parse_rate_limit("1000 per hours").unwrap().window,
        Duration::from_secs(3600)
    );
    assert_eq!(
        parse_rate_limit("5 / day").unwrap().window,
        Duration::from_secs(86_400)
    );

    assert!(parse_rate_limit("0 per minute").is_err());
    assert!(parse_rate_limit("60 per fortnight").is_err());
    assert!(parse_rate_limit("60").is_err());
}

#[test]
fn test_load_env_file_missing_is_skipped() {
    let path = std::env::temp_dir().join("sfunits-test-missing/.env");
    assert_eq!(load_env_file(&path), Ok(false));
}

#[test]
fn test_load_env_file_malformed_is_an_error() {
    let dir = std::env::temp_dir().join(format!("sfunits-test-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join(".env");
    std::fs::write(&path, "this line is not valid\n").unwrap();

    let err = load_env_file(&path).unwrap_err();
    assert!(err.contains(".env"), "{err}");

    std::fs::remove_dir_all(&dir).unwrap();
}
