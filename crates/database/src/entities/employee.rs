//! Employee directory mirror

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Employee {
    pub business_id: i64,
    pub user_id: i64,
    pub employee_ref: String,
    pub is_active: bool,
}
