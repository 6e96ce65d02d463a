//! # API Module
//!
//! HTTP endpoints of the web front-end, built on [Axum](https://docs.rs/axum).
//!
//! ## Endpoints
//!
//! ### Authentication
//!
//! - [`login`] - Starts the Salesforce OAuth 2.0 web server flow and redirects
//!   the browser to the sandbox login page.
//! - [`callback`] - Completes the flow by exchanging the authorization code for
//!   an access token, stored in the server-side session.
//! - [`logout`] - Forgets the session and everything cached for it.
//!
//! ### Data
//!
//! - [`units`] - `Unit__c` records of the signed-in org as a JSON array.
//! - [`describe`] - Field API names of `Unit__c` as a JSON array.
//!
//! Both answer 401 without calling Salesforce when the session holds no
//! credential, and accept `?refresh=1` to bypass the response cache.
//!
//! ### Pages and monitoring
//!
//! - [`index`] - Landing page with the login link.
//! - [`health`] - Health check with the application version.
//!
//! ## Middleware
//!
//! - [`security_headers`] - HSTS, framing, sniffing, referrer and CSP headers.
//! - [`rate_limit`] - Per-client request budget.

mod callback;
mod error;
mod health;
mod login;
mod middleware;
mod pages;
mod units;

use axum::{
    http::{
        HeaderMap, HeaderValue, StatusCode,
        header::{COOKIE, LOCATION, SET_COOKIE},
    },
    response::{IntoResponse, Response},
};

pub use callback::callback;
pub use error::{ApiError, status_for};
pub use health::health;
pub use login::{login, logout};
pub use middleware::{rate_limit, security_headers};
pub use pages::index;
pub use units::{describe, units};

use crate::utils;

/// Session id from the request's session cookie, if any.
pub fn session_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find_map(|value| utils::find_cookie(value, utils::SESSION_COOKIE))
        .map(str::to_string)
}

/// `302 Found` to `location`, optionally setting a cookie.
fn found(location: &str, cookie: Option<String>) -> Response {
    let mut response = StatusCode::FOUND.into_response();
    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(location) {
        headers.insert(LOCATION, value);
    }
    if let Some(value) = cookie.and_then(|c| HeaderValue::from_str(&c).ok()) {
        headers.append(SET_COOKIE, value);
    }
    response
}
