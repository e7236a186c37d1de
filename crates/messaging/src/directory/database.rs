use async_trait::async_trait;
use relay_database::employee_repository;
use sqlx::SqlitePool;

use super::{DirectoryError, EmployeeDirectory};

/// Directory backed by the local `employees` table.
#[derive(Clone)]
pub struct SqlEmployeeDirectory {
    pool: SqlitePool,
}

impl SqlEmployeeDirectory {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn lookup(
        &self,
        business_id: i64,
        user_id: i64,
    ) -> Result<Option<String>, DirectoryError> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| DirectoryError::Unavailable(e.to_string()))?;

        let employee = employee_repository::find_active(&mut conn, business_id, user_id)
            .await
            .map_err(|e| DirectoryError::Unavailable(e.to_string()))?;

        Ok(employee.map(|employee| employee.employee_ref))
    }
}

#[async_trait]
impl EmployeeDirectory for SqlEmployeeDirectory {
    async fn is_employee(&self, business_id: i64, user_id: i64) -> Result<bool, DirectoryError> {
        Ok(self.lookup(business_id, user_id).await?.is_some())
    }

    async fn employee_ref(
        &self,
        business_id: i64,
        user_id: i64,
    ) -> Result<Option<String>, DirectoryError> {
        self.lookup(business_id, user_id).await
    }
}
