use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::{DirectoryError, EmployeeDirectory};

/// Client for a remote directory exposing
/// `GET {base_url}/businesses/{business_id}/employees/{user_id}`.
///
/// `200` with `{"employee_ref": "...", "active": true}` means employed,
/// `404` means not employed. Anything else is an error.
#[derive(Clone)]
pub struct HttpEmployeeDirectory {
    http: reqwest::Client,
    base_url: String,
    api_token: Option<String>,
}

#[derive(Deserialize)]
struct EmployeeResponse {
    employee_ref: String,
    #[serde(default = "default_active")]
    active: bool,
}

fn default_active() -> bool {
    true
}

impl HttpEmployeeDirectory {
    pub fn new(
        base_url: impl Into<String>,
        api_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, DirectoryError> {
        let http = reqwest::Client::builder()
            .user_agent("relay-messaging")
            .timeout(timeout)
            .build()
            .map_err(|e| DirectoryError::Unavailable(format!("failed to build client: {e}")))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_token,
        })
    }

    async fn fetch(
        &self,
        business_id: i64,
        user_id: i64,
    ) -> Result<Option<String>, DirectoryError> {
        let url = format!(
            "{}/businesses/{business_id}/employees/{user_id}",
            self.base_url
        );

        let mut request = self.http.get(&url).header(ACCEPT, "application/json");
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| DirectoryError::Unavailable(e.to_string()))?;

        if response.status() == StatusCode::NOT_FOUND {
            debug!(business_id, user_id, "directory has no such employee");
            return Ok(None);
        }

        let employee: EmployeeResponse = response
            .error_for_status()
            .map_err(|e| DirectoryError::Unavailable(e.to_string()))?
            .json()
            .await
            .map_err(|e| DirectoryError::InvalidResponse(e.to_string()))?;

        Ok(employee.active.then_some(employee.employee_ref))
    }
}

#[async_trait]
impl EmployeeDirectory for HttpEmployeeDirectory {
    async fn is_employee(&self, business_id: i64, user_id: i64) -> Result<bool, DirectoryError> {
        Ok(self.fetch(business_id, user_id).await?.is_some())
    }

    async fn employee_ref(
        &self,
        business_id: i64,
        user_id: i64,
    ) -> Result<Option<String>, DirectoryError> {
        self.fetch(business_id, user_id).await
    }
}
