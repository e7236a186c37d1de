use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

use super::{DirectoryError, EmployeeDirectory};

/// In-process directory, used for tests and single-tenant setups.
#[derive(Debug, Default)]
pub struct StaticEmployeeDirectory {
    employees: RwLock<HashMap<(i64, i64), String>>,
}

impl StaticEmployeeDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_employee(self, business_id: i64, user_id: i64, employee_ref: &str) -> Self {
        self.insert(business_id, user_id, employee_ref);
        self
    }

    pub fn insert(&self, business_id: i64, user_id: i64, employee_ref: &str) {
        if let Ok(mut employees) = self.employees.write() {
            employees.insert((business_id, user_id), employee_ref.to_string());
        }
    }

    pub fn remove(&self, business_id: i64, user_id: i64) {
        if let Ok(mut employees) = self.employees.write() {
            employees.remove(&(business_id, user_id));
        }
    }

    fn lookup(&self, business_id: i64, user_id: i64) -> Result<Option<String>, DirectoryError> {
        let employees = self
            .employees
            .read()
            .map_err(|_| DirectoryError::Unavailable("directory lock poisoned".to_string()))?;
        Ok(employees.get(&(business_id, user_id)).cloned())
    }
}

#[async_trait]
impl EmployeeDirectory for StaticEmployeeDirectory {
    async fn is_employee(&self, business_id: i64, user_id: i64) -> Result<bool, DirectoryError> {
        Ok(self.lookup(business_id, user_id)?.is_some())
    }

    async fn employee_ref(
        &self,
        business_id: i64,
        user_id: i64,
    ) -> Result<Option<String>, DirectoryError> {
        self.lookup(business_id, user_id)
    }
}
