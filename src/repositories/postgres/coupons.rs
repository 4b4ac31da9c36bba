use chrono::{DateTime, Utc};
use sqlx::PgConnection;
use uuid::Uuid;

use crate::models::Coupon;
use crate::utils::AppError;

pub async fn insert(
    conn: &mut PgConnection,
    user_id: Uuid,
    code: &str,
    discount_amount: i64,
    expires_at: DateTime<Utc>,
) -> Result<Coupon, AppError> {
    let row = sqlx::query_as::<_, Coupon>(
        r#"
        INSERT INTO coupons (user_id, code, discount_amount, expires_at)
        VALUES ($1, $2, $3, $4)
        RETURNING id, user_id, code, discount_amount, expires_at, is_used,
                  created_at, updated_at
        "#,
    )
    .bind(user_id)
    .bind(code)
    .bind(discount_amount)
    .bind(expires_at)
    .fetch_one(&mut *conn)
    .await?;

    Ok(row)
}

/// A coupon is only visible to its owner; lookup is scoped by user so
/// one user cannot burn another's code.
pub async fn find_by_code_locked(
    conn: &mut PgConnection,
    user_id: Uuid,
    code: &str,
) -> Result<Option<Coupon>, AppError> {
    let row = sqlx::query_as::<_, Coupon>(
        r#"
        SELECT id, user_id, code, discount_amount, expires_at, is_used,
               created_at, updated_at
        FROM coupons
        WHERE user_id = $1 AND code = $2
        FOR UPDATE
        "#,
    )
    .bind(user_id)
    .bind(code)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row)
}

pub async fn list_for_user(
    conn: &mut PgConnection,
    user_id: Uuid,
) -> Result<Vec<Coupon>, AppError> {
    let rows = sqlx::query_as::<_, Coupon>(
        r#"
        SELECT id, user_id, code, discount_amount, expires_at, is_used,
               created_at, updated_at
        FROM coupons
        WHERE user_id = $1
        ORDER BY expires_at ASC
        "#,
    )
    .bind(user_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows)
}

/// Single-use consumption. `false` means it was already burned.
pub async fn mark_used(conn: &mut PgConnection, id: Uuid) -> Result<bool, AppError> {
    let result = sqlx::query(
        r#"
        UPDATE coupons
        SET is_used = TRUE,
            updated_at = now()
        WHERE id = $1 AND is_used = FALSE
        "#,
    )
    .bind(id)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Re-arms a consumed coupon; rollback only.
pub async fn mark_unused(conn: &mut PgConnection, id: Uuid) -> Result<bool, AppError> {
    let result = sqlx::query(
        r#"
        UPDATE coupons
        SET is_used = FALSE,
            updated_at = now()
        WHERE id = $1 AND is_used = TRUE
        "#,
    )
    .bind(id)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() == 1)
}
