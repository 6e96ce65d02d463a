use axum::{Extension, http::HeaderMap, response::Response};

use crate::{info, server::AppState, types::PendingLogin, utils, warning};

use super::{found, pages::error_page, session_id, status_for};

/// Starts a login: remembers a fresh state nonce (and PKCE verifier) in the
/// session and sends the browser to the Salesforce authorize endpoint.
pub async fn login(Extension(state): Extension<AppState>, headers: HeaderMap) -> Response {
    let id = state.sessions.ensure(session_id(&headers).as_deref()).await;

    let csrf_state = utils::generate_state();
    let code_verifier = state.config.use_pkce.then(utils::generate_code_verifier);
    let code_challenge = code_verifier
        .as_deref()
        .map(utils::generate_code_challenge);

    let url = match state
        .oauth
        .authorize_url(&csrf_state, code_challenge.as_deref())
    {
        Ok(url) => url,
        Err(e) => {
            warning!("Cannot build authorize URL: {}", e);
            return error_page(status_for(&e), "Login unavailable", "Server misconfigured.");
        }
    };

    state
        .sessions
        .begin_login(
            &id,
            PendingLogin {
                state: csrf_state,
                code_verifier,
            },
        )
        .await;

    info!("Redirecting to Salesforce login at {}", state.config.login_url);
    found(
        url.as_str(),
        Some(utils::session_cookie(
            &id,
            state.config.session_ttl.as_secs(),
            state.config.secure_cookies(),
        )),
    )
}

pub async fn logout(Extension(state): Extension<AppState>, headers: HeaderMap) -> Response {
    if let Some(id) = session_id(&headers) {
        if state.sessions.remove(&id).await {
            info!("Session signed out");
        }
    }

    found(
        "/",
        Some(utils::expired_session_cookie(state.config.secure_cookies())),
    )
}
