//! Employee directory collaborators.
//!
//! The directory answers whether a user belongs to a business and, if so,
//! under which employee reference. Lookups go through [`DirectoryGate`],
//! which bounds every call by a timeout and treats any failure as "not an
//! employee".

mod database;
mod http;
mod memory;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::types::{MessagingError, MessagingResult};

pub use database::SqlEmployeeDirectory;
pub use http::HttpEmployeeDirectory;
pub use memory::StaticEmployeeDirectory;

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("directory unavailable: {0}")]
    Unavailable(String),

    #[error("directory returned an invalid response: {0}")]
    InvalidResponse(String),
}

/// Source of truth for business membership.
#[async_trait]
pub trait EmployeeDirectory: Send + Sync {
    async fn is_employee(&self, business_id: i64, user_id: i64) -> Result<bool, DirectoryError>;

    async fn employee_ref(
        &self,
        business_id: i64,
        user_id: i64,
    ) -> Result<Option<String>, DirectoryError>;
}

/// Timeout-bounded, fail-closed access to an [`EmployeeDirectory`].
#[derive(Clone)]
pub struct DirectoryGate {
    directory: Arc<dyn EmployeeDirectory>,
    timeout: Duration,
}

impl DirectoryGate {
    pub fn new(directory: Arc<dyn EmployeeDirectory>, timeout: Duration) -> Self {
        Self { directory, timeout }
    }

    /// Employee reference of `user_id`, or `None` when the user is not an
    /// employee, the directory errors, or the lookup times out.
    pub async fn resolve(&self, business_id: i64, user_id: i64) -> Option<String> {
        let lookup = async {
            if !self.directory.is_employee(business_id, user_id).await? {
                return Ok(None);
            }
            self.directory.employee_ref(business_id, user_id).await
        };

        match timeout(self.timeout, lookup).await {
            Ok(Ok(employee_ref)) => {
                debug!(business_id, user_id, found = employee_ref.is_some(), "directory lookup");
                employee_ref
            }
            Ok(Err(err)) => {
                warn!(business_id, user_id, error = %err, "directory lookup failed; denying");
                None
            }
            Err(_) => {
                warn!(
                    business_id,
                    user_id,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "directory lookup timed out; denying"
                );
                None
            }
        }
    }

    /// Resolve a user who is being added to a conversation.
    pub async fn require_participant(
        &self,
        business_id: i64,
        user_id: i64,
    ) -> MessagingResult<String> {
        self.resolve(business_id, user_id)
            .await
            .ok_or_else(|| MessagingError::invalid_participant(business_id, user_id))
    }

    /// Resolve the user acting on a business conversation.
    pub async fn require_actor(&self, business_id: i64, user_id: i64) -> MessagingResult<String> {
        self.resolve(business_id, user_id).await.ok_or_else(|| {
            MessagingError::forbidden(format!(
                "user {user_id} is not an employee of business {business_id}"
            ))
        })
    }

    /// Resolve several users, failing on the first one that is not an employee.
    pub async fn require_participants(
        &self,
        business_id: i64,
        user_ids: &[i64],
    ) -> MessagingResult<Vec<(i64, String)>> {
        let mut resolved = Vec::with_capacity(user_ids.len());
        for &user_id in user_ids {
            let employee_ref = self.require_participant(business_id, user_id).await?;
            resolved.push((user_id, employee_ref));
        }
        Ok(resolved)
    }
}
