use serde::{Deserialize, Serialize};
use serde_json::Value;
use tabled::Tabled;

/// Access token and org URL obtained from a successful OAuth callback.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub access_token: String,
    pub instance_url: String,
    pub issued_at: Option<String>,
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"[REDACTED]")
            .field("instance_url", &self.instance_url)
            .field("issued_at", &self.issued_at)
            .finish()
    }
}

/// Body of a successful token endpoint response. Fields are optional so that a
/// partial answer can be rejected explicitly instead of failing to decode.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: Option<String>,
    pub instance_url: Option<String>,
    pub id: Option<String>,
    pub issued_at: Option<String>,
    pub token_type: Option<String>,
    pub scope: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OAuthErrorResponse {
    pub error: String,
    #[serde(default)]
    pub error_description: Option<String>,
}

/// State carried between `/login` and `/callback`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingLogin {
    pub state: String,
    pub code_verifier: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AuthPhase {
    #[default]
    Anonymous,
    PendingCallback(PendingLogin),
    Authenticated(Credential),
}

/// First page of a SOQL query result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResult {
    #[serde(rename = "totalSize")]
    pub total_size: u64,
    pub done: bool,
    #[serde(rename = "nextRecordsUrl", default)]
    pub next_records_url: Option<String>,
    #[serde(default)]
    pub records: Vec<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DescribeResponse {
    pub name: Option<String>,
    #[serde(default)]
    pub fields: Vec<FieldDescribe>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FieldDescribe {
    pub name: String,
    pub label: Option<String>,
    #[serde(rename = "type")]
    pub field_type: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RefreshParams {
    pub refresh: Option<String>,
}

impl RefreshParams {
    pub fn force(&self) -> bool {
        self.refresh.as_deref() == Some("1")
    }
}

#[derive(Tabled)]
pub struct ConfigTableRow {
    pub setting: String,
    pub value: String,
}
