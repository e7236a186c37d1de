//! Local employee directory mirror.

use sqlx::{Row, SqliteConnection};
use tracing::info;

use crate::entities::Employee;
use crate::types::{now_timestamp, DatabaseResult};

/// Register or refresh an employee of a business.
pub async fn upsert(
    conn: &mut SqliteConnection,
    business_id: i64,
    user_id: i64,
    employee_ref: &str,
) -> DatabaseResult<Employee> {
    let now = now_timestamp();

    sqlx::query(
        r#"
        INSERT INTO employees (business_id, user_id, employee_ref, is_active, created_at, updated_at)
        VALUES (?, ?, ?, 1, ?, ?)
        ON CONFLICT (business_id, user_id)
        DO UPDATE SET employee_ref = excluded.employee_ref, is_active = 1, updated_at = excluded.updated_at
        "#,
    )
    .bind(business_id)
    .bind(user_id)
    .bind(employee_ref)
    .bind(&now)
    .bind(&now)
    .execute(&mut *conn)
    .await?;

    info!(business_id, user_id, employee_ref, "registered employee");

    Ok(Employee {
        business_id,
        user_id,
        employee_ref: employee_ref.to_string(),
        is_active: true,
    })
}

pub async fn find_active(
    conn: &mut SqliteConnection,
    business_id: i64,
    user_id: i64,
) -> DatabaseResult<Option<Employee>> {
    let row = sqlx::query(
        r#"
        SELECT business_id, user_id, employee_ref, is_active
        FROM employees
        WHERE business_id = ? AND user_id = ? AND is_active = 1
        "#,
    )
    .bind(business_id)
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await?;

    row.map(|row| {
        Ok(Employee {
            business_id: row.try_get("business_id")?,
            user_id: row.try_get("user_id")?,
            employee_ref: row.try_get("employee_ref")?,
            is_active: row.try_get("is_active")?,
        })
    })
    .transpose()
}

/// Returns false when no active employee matched.
pub async fn deactivate(
    conn: &mut SqliteConnection,
    business_id: i64,
    user_id: i64,
) -> DatabaseResult<bool> {
    let now = now_timestamp();
    let result = sqlx::query(
        "UPDATE employees SET is_active = 0, updated_at = ? WHERE business_id = ? AND user_id = ? AND is_active = 1",
    )
    .bind(&now)
    .bind(business_id)
    .bind(user_id)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() > 0)
}
