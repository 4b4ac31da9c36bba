use chrono::{DateTime, Utc};
use sqlx::PgConnection;
use uuid::Uuid;

use crate::models::{DiscountKind, Voucher};
use crate::utils::AppError;

pub struct NewVoucher {
    pub event_id: Uuid,
    pub code: String,
    pub discount_kind: DiscountKind,
    pub discount_amount: i64,
    pub valid_from: DateTime<Utc>,
    pub valid_to: DateTime<Utc>,
    pub usage_limit: i32,
}

pub async fn insert(conn: &mut PgConnection, voucher: NewVoucher) -> Result<Voucher, AppError> {
    let row = sqlx::query_as::<_, Voucher>(
        r#"
        INSERT INTO vouchers
            (event_id, code, discount_kind, discount_amount, valid_from, valid_to, usage_limit)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING id, event_id, code, discount_kind, discount_amount,
                  valid_from, valid_to, usage_limit, used_count, created_at, updated_at
        "#,
    )
    .bind(voucher.event_id)
    .bind(&voucher.code)
    .bind(voucher.discount_kind)
    .bind(voucher.discount_amount)
    .bind(voucher.valid_from)
    .bind(voucher.valid_to)
    .bind(voucher.usage_limit)
    .fetch_one(&mut *conn)
    .await?;

    Ok(row)
}

/// Finds a voucher by event and code, locking it so validation and the
/// `used_count` bump see the same row.
pub async fn find_by_code_locked(
    conn: &mut PgConnection,
    event_id: Uuid,
    code: &str,
) -> Result<Option<Voucher>, AppError> {
    let row = sqlx::query_as::<_, Voucher>(
        r#"
        SELECT id, event_id, code, discount_kind, discount_amount,
               valid_from, valid_to, usage_limit, used_count, created_at, updated_at
        FROM vouchers
        WHERE event_id = $1 AND code = $2
        FOR UPDATE
        "#,
    )
    .bind(event_id)
    .bind(code)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row)
}

/// Burns one use. `false` means the budget ran out under contention.
pub async fn consume(conn: &mut PgConnection, id: Uuid) -> Result<bool, AppError> {
    let result = sqlx::query(
        r#"
        UPDATE vouchers
        SET used_count = used_count + 1,
            updated_at = now()
        WHERE id = $1 AND used_count < usage_limit
        "#,
    )
    .bind(id)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Returns one use to the budget; rollback only.
pub async fn release(conn: &mut PgConnection, id: Uuid) -> Result<bool, AppError> {
    let result = sqlx::query(
        r#"
        UPDATE vouchers
        SET used_count = used_count - 1,
            updated_at = now()
        WHERE id = $1 AND used_count > 0
        "#,
    )
    .bind(id)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() == 1)
}
