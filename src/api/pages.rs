use axum::{
    Extension,
    http::{HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
};

use crate::{server::AppState, types::AuthPhase, utils::escape_html};

const SIGNED_OUT_PAGE: &str = "<h2>Salesforce Units</h2>\
    <p><a href=\"/login\">Log in with Salesforce</a></p>";

pub async fn index(Extension(state): Extension<AppState>, headers: HeaderMap) -> Html<String> {
    let phase = match super::session_id(&headers) {
        Some(id) => state.sessions.phase(&id).await,
        None => AuthPhase::Anonymous,
    };

    match phase {
        AuthPhase::Authenticated(credential) => Html(format!(
            "<h2>Salesforce Units</h2>\
             <p>Signed in to {instance}.</p>\
             <ul>\
             <li><a href=\"/api/units\">Units</a></li>\
             <li><a href=\"/api/describe\">Unit fields</a></li>\
             <li><a href=\"/logout\">Log out</a></li>\
             </ul>",
            instance = escape_html(&credential.instance_url)
        )),
        _ => Html(SIGNED_OUT_PAGE.to_string()),
    }
}

/// Small HTML error page. `title` and `detail` are escaped.
pub(crate) fn error_page(status: StatusCode, title: &str, detail: &str) -> Response {
    let body = format!(
        "<h4>{}</h4><p>{}</p><p><a href=\"/login\">Try again</a></p>",
        escape_html(title),
        escape_html(detail)
    );
    (status, Html(body)).into_response()
}
