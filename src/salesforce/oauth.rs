//! OAuth 2.0 web server flow against the Salesforce login host.
//!
//! The flow has two legs:
//! 1. The browser is sent to [`OAuthClient::authorize_url`], where the user
//!    signs in to the sandbox and approves the connected app.
//! 2. Salesforce redirects back with a one-time `code`, which
//!    [`OAuthClient::exchange_code`] trades for an access token and the org's
//!    instance URL.

use reqwest::Client;
use url::Url;

use crate::{
    config::Config,
    error::{Error, Result},
    types::{Credential, OAuthErrorResponse, TokenResponse},
};

/// Builds the authorization endpoint URL of the OAuth 2.0 web server flow.
///
/// The result is `{login}/services/oauth2/authorize` with `response_type=code`,
/// `client_id` and `redirect_uri`. It depends on its arguments only.
///
/// # Arguments
///
/// * `client_id` - Consumer key of the connected app
/// * `redirect_uri` - Callback URL registered on the connected app
/// * `login_base_url` - Login host, with or without a trailing slash
///
/// # Errors
///
/// Returns [`Error::Config`] when `login_base_url` is not an absolute URL.
///
/// # Example
///
/// ```
/// use sfunits::salesforce::build_authorize_url;
///
/// let url = build_authorize_url(
///     "client-id",
///     "http://localhost:5000/callback",
///     "https://test.salesforce.com",
/// )?;
/// assert_eq!(url.path(), "/services/oauth2/authorize");
/// ```
pub fn build_authorize_url(client_id: &str, redirect_uri: &str, login_base_url: &str) -> Result<Url> {
    let endpoint = format!(
        "{}/services/oauth2/authorize",
        login_base_url.trim_end_matches('/')
    );
    Url::parse_with_params(
        &endpoint,
        &[
            ("response_type", "code"),
            ("client_id", client_id),
            ("redirect_uri", redirect_uri),
        ],
    )
    .map_err(|e| Error::Config(format!("invalid login URL '{login_base_url}': {e}")))
}

/// Client for the connected app's OAuth endpoints on the sandbox login host.
///
/// Holds the configuration and one HTTP client with the configured request
/// timeout. Cloning is cheap and shares the connection pool.
#[derive(Clone)]
pub struct OAuthClient {
    config: Config,
    http: Client,
}

impl std::fmt::Debug for OAuthClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl OAuthClient {
    /// Creates a client for the login host in `config`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`] when the HTTP client cannot be built.
    pub fn new(config: Config) -> Result<Self> {
        let http = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self { config, http })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Authorization URL for one login attempt.
    ///
    /// Extends [`build_authorize_url`] with the per-attempt parameters.
    ///
    /// # Arguments
    ///
    /// * `state` - Nonce echoed back on the callback
    /// * `code_challenge` - PKCE challenge; when present `code_challenge_method=S256`
    ///   is requested as well
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when the configured login URL is invalid.
    ///
    /// # Example
    ///
    /// ```
    /// use sfunits::{config::Config, salesforce::OAuthClient, utils};
    ///
    /// let client = OAuthClient::new(Config::from_env()?)?;
    /// let verifier = utils::generate_code_verifier();
    /// let url = client.authorize_url(
    ///     &utils::generate_state(),
    ///     Some(&utils::generate_code_challenge(&verifier)),
    /// )?;
    /// println!("Open {url}");
    /// ```
    pub fn authorize_url(&self, state: &str, code_challenge: Option<&str>) -> Result<Url> {
        let mut url = build_authorize_url(
            &self.config.client_id,
            &self.config.redirect_uri,
            &self.config.login_url,
        )?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("state", state);
            if let Some(challenge) = code_challenge {
                query.append_pair("code_challenge", challenge);
                query.append_pair("code_challenge_method", "S256");
            }
        }
        Ok(url)
    }

    fn token_url(&self) -> String {
        format!("{}/services/oauth2/token", self.config.login_url)
    }

    /// Exchanges an authorization code for an access token and instance URL.
    ///
    /// Posts `grant_type=authorization_code` together with the client
    /// credentials and redirect URI to `{login}/services/oauth2/token`.
    ///
    /// # Arguments
    ///
    /// * `code` - The one-time code from the callback
    /// * `code_verifier` - The PKCE verifier of this login, if one was used
    ///
    /// # Returns
    ///
    /// The credential with the instance URL stripped of any trailing slash.
    ///
    /// # Errors
    ///
    /// - [`Error::Auth`] on any non-success status, carrying `error:
    ///   error_description` from the body, or the raw body when it is not JSON
    /// - [`Error::Protocol`] when a successful answer lacks `access_token` or
    ///   `instance_url`, or is not JSON
    /// - [`Error::Transport`] when the login host cannot be reached in time
    ///
    /// # Example
    ///
    /// ```
    /// let credential = client.exchange_code(&code, pending.code_verifier.as_deref()).await?;
    /// println!("Signed in to {}", credential.instance_url);
    /// ```
    pub async fn exchange_code(&self, code: &str, code_verifier: Option<&str>) -> Result<Credential> {
        let mut form = vec![
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret()),
            ("redirect_uri", self.config.redirect_uri.as_str()),
        ];
        if let Some(verifier) = code_verifier {
            form.push(("code_verifier", verifier));
        }

        let res = self.http.post(self.token_url()).form(&form).send().await?;
        let status = res.status();
        let body = res.text().await?;

        if !status.is_success() {
            return Err(Error::Auth(describe_oauth_error(&body)));
        }

        credential_from_body(&body)
    }
}

fn describe_oauth_error(body: &str) -> String {
    match serde_json::from_str::<OAuthErrorResponse>(body) {
        Ok(OAuthErrorResponse {
            error,
            error_description: Some(description),
        }) if !description.is_empty() => format!("{error}: {description}"),
        Ok(OAuthErrorResponse { error, .. }) => error,
        Err(_) => body.to_string(),
    }
}

fn credential_from_body(body: &str) -> Result<Credential> {
    let token: TokenResponse = serde_json::from_str(body)
        .map_err(|e| Error::Protocol(format!("token response is not valid JSON: {e}")))?;

    let access_token = token.access_token.filter(|t| !t.is_empty());
    let instance_url = token.instance_url.filter(|u| !u.is_empty());

    match (access_token, instance_url) {
        (Some(access_token), Some(instance_url)) => Ok(Credential {
            access_token,
            instance_url: instance_url.trim_end_matches('/').to_string(),
            issued_at: token.issued_at,
        }),
        (None, _) => Err(Error::Protocol(
            "token response is missing access_token".into(),
        )),
        (_, None) => Err(Error::Protocol(
            "token response is missing instance_url".into(),
        )),
    }
}
