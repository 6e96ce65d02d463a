use axum::{
    Extension,
    extract::Query,
    http::{HeaderMap, StatusCode},
    response::Response,
};

use crate::{server::AppState, success, types::CallbackParams, utils, warning};

use super::{found, pages::error_page, session_id, status_for};

/// OAuth redirect target.
///
/// Only a session waiting for a callback is accepted, and its pending state is
/// consumed whatever the outcome. Only when the state matches and the code
/// exchange succeeds is the credential stored, under a freshly issued session
/// id that replaces the one used for the login.
pub async fn callback(
    Extension(state): Extension<AppState>,
    headers: HeaderMap,
    Query(params): Query<CallbackParams>,
) -> Response {
    let pending = match session_id(&headers) {
        Some(id) => state
            .sessions
            .take_pending(&id)
            .await
            .map(|pending| (id, pending)),
        None => None,
    };
    let Some((id, pending)) = pending else {
        warning!("Callback without a login in progress");
        return error_page(
            StatusCode::BAD_REQUEST,
            "No login in progress",
            "Start again from the login link.",
        );
    };

    if let Some(error) = params.error {
        let detail = match params.error_description {
            Some(description) if !description.is_empty() => format!("{error}: {description}"),
            _ => error,
        };
        warning!("Salesforce denied the login: {}", detail);
        return error_page(StatusCode::UNAUTHORIZED, "Login failed", &detail);
    }

    let state_matches = params
        .state
        .as_deref()
        .is_some_and(|s| utils::constant_time_eq(s, &pending.state));
    if !state_matches {
        warning!("Callback state does not match the pending login");
        return error_page(
            StatusCode::BAD_REQUEST,
            "Login failed",
            "The login response did not match this session.",
        );
    }

    let Some(code) = params.code.filter(|c| !c.is_empty()) else {
        return error_page(
            StatusCode::BAD_REQUEST,
            "Login failed",
            "Missing authorization code.",
        );
    };

    match state
        .oauth
        .exchange_code(&code, pending.code_verifier.as_deref())
        .await
    {
        Ok(credential) => {
            success!("Signed in to {}", credential.instance_url);
            let id = state.sessions.sign_in(&id, credential).await;
            found(
                "/",
                Some(utils::session_cookie(
                    &id,
                    state.config.session_ttl.as_secs(),
                    state.config.secure_cookies(),
                )),
            )
        }
        Err(e) => {
            warning!("Token exchange failed: {}", e);
            error_page(status_for(&e), "Login failed", &e.to_string())
        }
    }
}
