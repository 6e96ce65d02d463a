//! # Salesforce Integration Module
//!
//! Outbound calls to a Salesforce org: the OAuth 2.0 web server flow against the
//! sandbox login host, and authenticated REST calls against the org's
//! instance URL.
//!
//! ```text
//! Web Handler (api)
//!      ↓
//! Salesforce Integration Layer
//!     ├── oauth  (authorize URL, code exchange)
//!     ├── query  (describe, SOQL)
//!     └── units  (Unit__c query and labels)
//!      ↓
//! HTTP Layer (reqwest, JSON)
//! ```
//!
//! Every request is a single request/response pair with a timeout. Nothing is
//! retried and SOQL pagination is not followed: only the first page of a
//! result is returned.
//!
//! The web layer talks to the query side through [`SalesforceApi`] so that it
//! can be exercised without a network.

use async_trait::async_trait;

use crate::{
    error::Result,
    types::{Credential, QueryResult},
};

pub mod oauth;
pub mod query;
pub mod units;

pub use oauth::{OAuthClient, build_authorize_url};
pub use query::QueryClient;

/// Authenticated data calls against the org of a credential.
#[async_trait]
pub trait SalesforceApi: Send + Sync {
    /// API names of every field on `object_name`, in describe order.
    ///
    /// # Errors
    ///
    /// [`Error::Auth`](crate::error::Error::Auth) when the token is rejected;
    /// transport, protocol or upstream errors otherwise.
    async fn describe_fields(&self, credential: &Credential, object_name: &str)
    -> Result<Vec<String>>;

    /// Runs `query` and returns the first page of results.
    ///
    /// # Errors
    ///
    /// [`Error::Query`](crate::error::Error::Query) for a malformed or
    /// rejected statement, with the upstream message unmodified;
    /// [`Error::Auth`](crate::error::Error::Auth) when the token is rejected.
    async fn run_soql(&self, credential: &Credential, query: &str) -> Result<QueryResult>;
}
