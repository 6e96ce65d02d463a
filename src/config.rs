//! Configuration management for the Salesforce units front-end.
//!
//! Values come from environment variables, optionally seeded from `.env`
//! files. They are read once at start-up into a [`Config`] which is then passed
//! explicitly to the OAuth client, the query client and the web state.
//!
//! Lookup order:
//! 1. Environment variables (highest priority)
//! 2. `.env` in the working directory
//! 3. `.env` in the local data directory (`sfunits/.env`)
//! 4. Application defaults (where applicable)

use std::{
    env,
    io::ErrorKind,
    path::{Path, PathBuf},
    time::Duration,
};

use url::Url;

use crate::error::{Error, Result};

/// Sandbox login host used when `SF_LOGIN_URL` is unset.
pub const DEFAULT_LOGIN_URL: &str = "https://test.salesforce.com";
/// REST API version used when `SF_API_VERSION` is unset.
pub const DEFAULT_API_VERSION: &str = "59.0";
pub const DEFAULT_PORT: u16 = 5000;

/// Loads environment variables from `.env` files.
///
/// The working directory is tried first, then `sfunits/.env` in the
/// platform-specific local data directory:
/// - Linux: `~/.local/share/sfunits/.env`
/// - macOS: `~/Library/Application Support/sfunits/.env`
/// - Windows: `%LOCALAPPDATA%/sfunits/.env`
///
/// Variables already present in the environment are never overwritten.
///
/// # Errors
///
/// A missing file is skipped. A file that exists but cannot be read or parsed
/// is reported with its path, as is a data directory that cannot be created.
///
/// # Example
///
/// ```
/// use sfunits::config;
///
/// if let Err(e) = config::load_env().await {
///     eprintln!("{e}");
/// }
/// ```
pub async fn load_env() -> std::result::Result<(), String> {
    loaded(dotenv::dotenv(), Path::new(".env"))?;

    let mut path = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push("sfunits/.env");
    if let Some(parent) = path.parent() {
        async_fs::create_dir_all(parent)
            .await
            .map_err(|e| format!("cannot create {}: {e}", parent.display()))?;
    }

    load_env_file(&path)?;
    Ok(())
}

/// Loads a single `.env` file into the process environment.
///
/// # Returns
///
/// `Ok(true)` when the file was loaded, `Ok(false)` when it does not exist.
///
/// # Errors
///
/// Any other I/O failure, or a line that cannot be parsed.
pub fn load_env_file(path: &Path) -> std::result::Result<bool, String> {
    loaded(dotenv::from_path(path), path)
}

fn loaded<T>(result: dotenv::Result<T>, path: &Path) -> std::result::Result<bool, String> {
    match result {
        Ok(_) => Ok(true),
        Err(dotenv::Error::Io(e)) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(format!("cannot load {}: {e}", path.display())),
    }
}

/// Requests allowed per client within one window.
///
/// Read from `RATE_LIMIT` (see [`parse_rate_limit`]). The default is 60
/// requests per minute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimit {
    /// Requests a client may send at once; always positive.
    pub max_requests: u32,
    /// Time over which `max_requests` are replenished.
    pub window: Duration,
}

impl Default for RateLimit {
    fn default() -> Self {
        Self {
            max_requests: 60,
            window: Duration::from_secs(60),
        }
    }
}

/// Parses limits written as `"<count> per <unit>"`, e.g. `"60 per minute"`.
///
/// `"<count> / <unit>"` is accepted as well. Units are `second`, `minute`,
/// `hour` and `day`, singular or plural, or the short forms `sec` and `min`.
///
/// # Arguments
///
/// * `value` - The raw `RATE_LIMIT` value
///
/// # Errors
///
/// Returns [`Error::Config`] for any other shape, a count that is not a
/// positive integer, or an unknown unit.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use sfunits::config::parse_rate_limit;
///
/// let limit = parse_rate_limit("10 per second")?;
/// assert_eq!(limit.max_requests, 10);
/// assert_eq!(limit.window, Duration::from_secs(1));
/// ```
pub fn parse_rate_limit(value: &str) -> Result<RateLimit> {
    let parts: Vec<&str> = value.split_whitespace().collect();
    let (count, unit) = match parts.as_slice() {
        [count, "per", unit] => (*count, *unit),
        [count, "/", unit] => (*count, *unit),
        _ => {
            return Err(Error::Config(format!(
                "RATE_LIMIT must look like '60 per minute', got '{value}'"
            )));
        }
    };

    let max_requests: u32 = count
        .parse()
        .map_err(|_| Error::Config(format!("invalid RATE_LIMIT count '{count}'")))?;
    if max_requests == 0 {
        return Err(Error::Config("RATE_LIMIT count must be positive".into()));
    }

    let seconds = match unit.trim_end_matches('s') {
        "second" | "sec" => 1,
        "minute" | "min" => 60,
        "hour" => 3600,
        "day" => 86_400,
        _ => {
            return Err(Error::Config(format!("invalid RATE_LIMIT unit '{unit}'")));
        }
    };

    Ok(RateLimit {
        max_requests,
        window: Duration::from_secs(seconds),
    })
}

/// Process-wide settings, immutable once loaded.
///
/// | Variable | Field | Default |
/// |---|---|---|
/// | `SF_CLIENT_ID` | `client_id` | required |
/// | `SF_CLIENT_SECRET` | (private) | required |
/// | `SF_LOGIN_URL` | `login_url` | `https://test.salesforce.com` |
/// | `SF_REDIRECT_URI` | `redirect_uri` | `http://localhost:{PORT}/callback` |
/// | `PORT` / `SERVER_ADDRESS` | `server_addr` | `0.0.0.0:5000` |
/// | `SF_API_VERSION` | `api_version` | `59.0` |
/// | `SF_REQUEST_TIMEOUT_SECS` | `request_timeout` | 10s |
/// | `SESSION_TTL_SECS` | `session_ttl` | 3600s |
/// | `CACHE_TTL_SECONDS` | `cache_ttl` | 60s |
/// | `RATE_LIMIT` | `rate_limit` | `60 per minute` |
/// | `SF_USE_PKCE` | `use_pkce` | `true` |
///
/// The client secret is only reachable inside the crate and is redacted in
/// `Debug` output.
#[derive(Clone)]
pub struct Config {
    /// Consumer key of the connected app.
    pub client_id: String,
    client_secret: String,
    /// Login host without a trailing slash.
    pub login_url: String,
    /// Callback URL registered on the connected app.
    pub redirect_uri: String,
    /// Address the web server binds to.
    pub server_addr: String,
    /// REST API version without the leading `v`, e.g. `59.0`.
    pub api_version: String,
    /// Timeout applied to every outbound Salesforce request.
    pub request_timeout: Duration,
    /// Idle time after which a session is forgotten.
    pub session_ttl: Duration,
    /// Lifetime of cached `/api` payloads.
    pub cache_ttl: Duration,
    pub rate_limit: RateLimit,
    /// Whether logins use PKCE (S256) on top of the client secret.
    pub use_pkce: bool,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("login_url", &self.login_url)
            .field("redirect_uri", &self.redirect_uri)
            .field("server_addr", &self.server_addr)
            .field("api_version", &self.api_version)
            .field("request_timeout", &self.request_timeout)
            .field("session_ttl", &self.session_ttl)
            .field("cache_ttl", &self.cache_ttl)
            .field("rate_limit", &self.rate_limit)
            .field("use_pkce", &self.use_pkce)
            .finish()
    }
}

impl Config {
    /// Reads the configuration from the process environment.
    ///
    /// Call [`load_env`] first to pick up `.env` files.
    ///
    /// # Errors
    ///
    /// See [`Config::from_lookup`].
    ///
    /// # Example
    ///
    /// ```
    /// use sfunits::config::Config;
    ///
    /// let config = Config::from_env()?;
    /// println!("Logging in via {}", config.login_url);
    /// ```
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    ///
    /// Values are trimmed and blank values count as unset.
    ///
    /// # Arguments
    ///
    /// * `lookup` - Returns the raw value of a variable, or `None` when unset
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when:
    /// - `SF_CLIENT_ID` or `SF_CLIENT_SECRET` is missing (the message names
    ///   every missing key at once)
    /// - `SF_LOGIN_URL` or `SF_REDIRECT_URI` is not an absolute URL
    /// - `PORT` or one of the `*_SECS`/`*_SECONDS` values is not a
    ///   non-negative integer
    /// - `RATE_LIMIT` or `SF_USE_PKCE` cannot be parsed
    ///
    /// # Example
    ///
    /// ```
    /// use std::collections::HashMap;
    /// use sfunits::config::Config;
    ///
    /// let vars = HashMap::from([("SF_CLIENT_ID", "id"), ("SF_CLIENT_SECRET", "secret")]);
    /// let config = Config::from_lookup(|key| vars.get(key).map(|v| v.to_string()))?;
    /// assert_eq!(config.api_version, "59.0");
    /// ```
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let client_id = get("SF_CLIENT_ID");
        let client_secret = get("SF_CLIENT_SECRET");
        let missing: Vec<&str> = [
            ("SF_CLIENT_ID", client_id.is_none()),
            ("SF_CLIENT_SECRET", client_secret.is_none()),
        ]
        .iter()
        .filter(|(_, absent)| *absent)
        .map(|(key, _)| *key)
        .collect();
        if !missing.is_empty() {
            return Err(Error::Config(format!(
                "Missing in environment: {}",
                missing.join(", ")
            )));
        }

        let login_url = get("SF_LOGIN_URL")
            .unwrap_or_else(|| DEFAULT_LOGIN_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        Url::parse(&login_url)
            .map_err(|e| Error::Config(format!("invalid SF_LOGIN_URL '{login_url}': {e}")))?;

        let port: u16 = match get("PORT") {
            Some(p) => p
                .parse()
                .map_err(|_| Error::Config(format!("invalid PORT '{p}'")))?,
            None => DEFAULT_PORT,
        };

        let redirect_uri = get("SF_REDIRECT_URI")
            .unwrap_or_else(|| format!("http://localhost:{port}/callback"));
        Url::parse(&redirect_uri)
            .map_err(|e| Error::Config(format!("invalid SF_REDIRECT_URI '{redirect_uri}': {e}")))?;

        let server_addr = get("SERVER_ADDRESS").unwrap_or_else(|| format!("0.0.0.0:{port}"));

        let api_version = get("SF_API_VERSION")
            .map(|v| v.trim_start_matches('v').to_string())
            .unwrap_or_else(|| DEFAULT_API_VERSION.to_string());

        let rate_limit = match get("RATE_LIMIT") {
            Some(v) => parse_rate_limit(&v)?,
            None => RateLimit::default(),
        };

        let use_pkce = match get("SF_USE_PKCE").as_deref() {
            None => true,
            Some("1" | "true" | "yes" | "on") => true,
            Some("0" | "false" | "no" | "off") => false,
            Some(other) => {
                return Err(Error::Config(format!("invalid SF_USE_PKCE '{other}'")));
            }
        };

        Ok(Self {
            client_id: client_id.unwrap_or_default(),
            client_secret: client_secret.unwrap_or_default(),
            login_url,
            redirect_uri,
            server_addr,
            api_version,
            request_timeout: seconds(&get, "SF_REQUEST_TIMEOUT_SECS", 10)?,
            session_ttl: seconds(&get, "SESSION_TTL_SECS", 3600)?,
            cache_ttl: seconds(&get, "CACHE_TTL_SECONDS", 60)?,
            rate_limit,
            use_pkce,
        })
    }

    pub(crate) fn client_secret(&self) -> &str {
        &self.client_secret
    }

    /// Whether the session cookie should carry the `Secure` attribute.
    ///
    /// True when the redirect URI is served over https.
    pub fn secure_cookies(&self) -> bool {
        self.redirect_uri.starts_with("https://")
    }
}

fn seconds<F>(get: &F, key: &str, default: u64) -> Result<Duration>
where
    F: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(v) => v
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|_| Error::Config(format!("invalid {key} '{v}'"))),
        None => Ok(Duration::from_secs(default)),
    }
}
