//! REST calls against an org's data API.
//!
//! Responses are mapped onto the crate's error taxonomy:
//!
//! | Status | Error |
//! |---|---|
//! | 401 | [`Error::Auth`] with the first upstream message |
//! | 400 on a query | [`Error::Query`] with message and `errorCode` unmodified |
//! | any other non-2xx | [`Error::Upstream`] with status and raw body |
//! | 2xx with an undecodable body | [`Error::Protocol`] |

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;

use crate::{
    config::Config,
    error::{Error, Result, parse_api_error},
    salesforce::SalesforceApi,
    types::{Credential, DescribeResponse, QueryResult},
    warning,
};

/// REST client for an org's data API.
///
/// The org is not fixed: every call targets the instance URL of the credential
/// it is given.
#[derive(Debug, Clone)]
pub struct QueryClient {
    http: Client,
    api_version: String,
}

impl QueryClient {
    /// Creates a client using the configured API version and request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`] when the HTTP client cannot be built.
    ///
    /// # Example
    ///
    /// ```
    /// use sfunits::{config::Config, salesforce::{QueryClient, SalesforceApi}};
    ///
    /// let client = QueryClient::new(&Config::from_env()?)?;
    /// let fields = client.describe_fields(&credential, "Unit__c").await?;
    /// ```
    pub fn new(config: &Config) -> Result<Self> {
        let http = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self {
            http,
            api_version: config.api_version.clone(),
        })
    }

    /// `{instance}/services/data/v{version}` of the credential's org.
    fn data_url(&self, credential: &Credential) -> String {
        format!(
            "{}/services/data/v{}",
            credential.instance_url.trim_end_matches('/'),
            self.api_version
        )
    }
}

#[async_trait]
impl SalesforceApi for QueryClient {
    /// `GET {instance}/services/data/v{version}/sobjects/{object}/describe`.
    async fn describe_fields(
        &self,
        credential: &Credential,
        object_name: &str,
    ) -> Result<Vec<String>> {
        let url = format!(
            "{}/sobjects/{object_name}/describe",
            self.data_url(credential)
        );
        let res = self
            .http
            .get(url)
            .bearer_auth(&credential.access_token)
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;
        if !status.is_success() {
            return Err(status_error(status, &body, false));
        }

        let describe: DescribeResponse = decode(&body)?;
        Ok(describe.fields.into_iter().map(|f| f.name).collect())
    }

    /// `GET {instance}/services/data/v{version}/query?q={query}`.
    ///
    /// Only the first page is returned; a warning is logged when Salesforce
    /// reports more.
    async fn run_soql(&self, credential: &Credential, query: &str) -> Result<QueryResult> {
        let url = format!("{}/query", self.data_url(credential));
        let res = self
            .http
            .get(url)
            .query(&[("q", query)])
            .bearer_auth(&credential.access_token)
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;
        if !status.is_success() {
            return Err(status_error(status, &body, true));
        }

        let result: QueryResult = decode(&body)?;
        if !result.done {
            warning!(
                "Query returned {} of {} records; further pages are not fetched",
                result.records.len(),
                result.total_size
            );
        }
        Ok(result)
    }
}

fn decode<T: DeserializeOwned>(body: &str) -> Result<T> {
    serde_json::from_str(body).map_err(|e| Error::Protocol(e.to_string()))
}

/// Maps a non-success status to an error. A 400 is a query error only for SOQL
/// calls.
fn status_error(status: StatusCode, body: &str, is_query: bool) -> Error {
    match status {
        StatusCode::UNAUTHORIZED => Error::Auth(parse_api_error(body).0),
        StatusCode::BAD_REQUEST if is_query => {
            let (message, error_code) = parse_api_error(body);
            Error::Query {
                message,
                error_code,
            }
        }
        _ => Error::Upstream {
            status: status.as_u16(),
            body: body.to_string(),
        },
    }
}
