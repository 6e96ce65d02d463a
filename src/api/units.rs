use std::time::Duration;

use axum::{
    Extension, Json,
    extract::Query,
    http::{HeaderMap, HeaderValue},
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};

use crate::{
    error::Error,
    management::ResponseCache,
    salesforce::units::{UNIT_OBJECT, UNITS_SOQL, label_unit_types},
    server::AppState,
    types::{Credential, RefreshParams},
    warning,
};

use super::{ApiError, session_id};

const UNITS_CACHE_KEY: &str = "units:list:v2";
const DESCRIBE_CACHE_KEY: &str = "units:describe:v1";
const MIN_DESCRIBE_TTL: Duration = Duration::from_secs(300);

/// Session id and credential of a signed-in request.
async fn require_credential(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<(String, Credential), ApiError> {
    let id = session_id(headers).ok_or_else(ApiError::not_signed_in)?;
    let credential = state
        .sessions
        .credential(&id)
        .await
        .ok_or_else(ApiError::not_signed_in)?;
    Ok((id, credential))
}

/// Decides what a failed Salesforce call turns into.
///
/// A rejected token signs the session out. Transient failures fall back to a
/// still-fresh cached payload when there is one.
async fn recover(state: &AppState, id: &str, key: &str, err: Error) -> Result<Value, ApiError> {
    if err.is_auth() {
        warning!("Salesforce rejected the session token: {}", err);
        state.sessions.clear_credential(id).await;
        return Err(err.into());
    }

    if err.is_transient() {
        if let Some(cached) = state.cache.get(key).await {
            warning!("Salesforce call failed, serving cached data: {}", err);
            return Ok(cached);
        }
    }

    warning!("Salesforce call failed: {}", err);
    Err(err.into())
}

fn with_cache_header(mut response: Response, from_cache: bool) -> Response {
    response.headers_mut().insert(
        "x-from-cache",
        HeaderValue::from_static(if from_cache { "true" } else { "false" }),
    );
    response
}

fn units_response(payload: Value, from_cache: bool) -> Response {
    let total_size = payload["totalSize"].as_u64().unwrap_or(0);
    let records = match payload.get("records") {
        Some(records @ Value::Array(_)) => records.clone(),
        _ => Value::Array(Vec::new()),
    };

    let mut response = with_cache_header(Json(records).into_response(), from_cache);
    response
        .headers_mut()
        .insert("x-total-size", HeaderValue::from(total_size));
    response
}

/// `Unit__c` records of the signed-in org as a JSON array.
pub async fn units(
    Extension(state): Extension<AppState>,
    headers: HeaderMap,
    Query(params): Query<RefreshParams>,
) -> Result<Response, ApiError> {
    let (id, credential) = require_credential(&state, &headers).await?;
    let key = ResponseCache::key(&id, UNITS_CACHE_KEY);

    if !params.force() {
        if let Some(cached) = state.cache.get(&key).await {
            return Ok(units_response(cached, true));
        }
    }

    match state.salesforce.run_soql(&credential, UNITS_SOQL).await {
        Ok(mut result) => {
            label_unit_types(&mut result.records);
            let payload = json!({
                "totalSize": result.total_size,
                "records": result.records,
            });
            state
                .cache
                .set(&key, payload.clone(), state.config.cache_ttl)
                .await;
            Ok(units_response(payload, false))
        }
        Err(e) => {
            let cached = recover(&state, &id, &key, e).await?;
            Ok(units_response(cached, true))
        }
    }
}

/// Field API names of `Unit__c` as a JSON array.
pub async fn describe(
    Extension(state): Extension<AppState>,
    headers: HeaderMap,
    Query(params): Query<RefreshParams>,
) -> Result<Response, ApiError> {
    let (id, credential) = require_credential(&state, &headers).await?;
    let key = ResponseCache::key(&id, DESCRIBE_CACHE_KEY);

    if !params.force() {
        if let Some(cached) = state.cache.get(&key).await {
            return Ok(with_cache_header(Json(cached).into_response(), true));
        }
    }

    match state
        .salesforce
        .describe_fields(&credential, UNIT_OBJECT)
        .await
    {
        Ok(fields) => {
            let payload = json!(fields);
            let ttl = state.config.cache_ttl.max(MIN_DESCRIBE_TTL);
            state.cache.set(&key, payload.clone(), ttl).await;
            Ok(with_cache_header(Json(payload).into_response(), false))
        }
        Err(e) => {
            let cached = recover(&state, &id, &key, e).await?;
            Ok(with_cache_header(Json(cached).into_response(), true))
        }
    }
}
