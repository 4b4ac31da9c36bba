use chrono::{DateTime, Utc};
use sqlx::PgConnection;
use uuid::Uuid;

use crate::models::PointLedgerEntry;
use crate::utils::AppError;

pub async fn insert_earned(
    conn: &mut PgConnection,
    user_id: Uuid,
    amount: i64,
    description: &str,
    expires_at: Option<DateTime<Utc>>,
) -> Result<PointLedgerEntry, AppError> {
    let row = sqlx::query_as::<_, PointLedgerEntry>(
        r#"
        INSERT INTO point_ledger (user_id, amount, kind, description, expires_at)
        VALUES ($1, $2, 'EARNED', $3, $4)
        RETURNING id, user_id, amount, kind, description, transaction_id,
                  created_at, expires_at
        "#,
    )
    .bind(user_id)
    .bind(amount)
    .bind(description)
    .bind(expires_at)
    .fetch_one(&mut *conn)
    .await?;

    Ok(row)
}

/// Records spending. `points` is the positive quantity spent; the entry
/// is stored negative. `transaction_id` is the rollback correlation key.
pub async fn insert_used(
    conn: &mut PgConnection,
    user_id: Uuid,
    points: i64,
    description: &str,
    transaction_id: Uuid,
) -> Result<PointLedgerEntry, AppError> {
    let row = sqlx::query_as::<_, PointLedgerEntry>(
        r#"
        INSERT INTO point_ledger (user_id, amount, kind, description, transaction_id)
        VALUES ($1, $2, 'USED', $3, $4)
        RETURNING id, user_id, amount, kind, description, transaction_id,
                  created_at, expires_at
        "#,
    )
    .bind(user_id)
    .bind(-points)
    .bind(description)
    .bind(transaction_id)
    .fetch_one(&mut *conn)
    .await?;

    Ok(row)
}

/// All EARNED entries oldest-first, the order the FIFO walk consumes
/// them in.
pub async fn earned_entries(
    conn: &mut PgConnection,
    user_id: Uuid,
) -> Result<Vec<PointLedgerEntry>, AppError> {
    let rows = sqlx::query_as::<_, PointLedgerEntry>(
        r#"
        SELECT id, user_id, amount, kind, description, transaction_id,
               created_at, expires_at
        FROM point_ledger
        WHERE user_id = $1 AND kind = 'EARNED'
        ORDER BY created_at ASC, id ASC
        "#,
    )
    .bind(user_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows)
}

/// Total points ever spent, as a positive number. `SUM` over BIGINT
/// yields NUMERIC, hence the cast.
pub async fn used_total(conn: &mut PgConnection, user_id: Uuid) -> Result<i64, AppError> {
    let total = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COALESCE(SUM(-amount), 0)::BIGINT
        FROM point_ledger
        WHERE user_id = $1 AND kind = 'USED'
        "#,
    )
    .bind(user_id)
    .fetch_one(&mut *conn)
    .await?;

    Ok(total)
}

/// Removes the USED entries a transaction created and reports how many
/// points that frees. Deleting (rather than appending a compensating
/// EARNED row) keeps the FIFO walk exact: the freed consumption
/// re-attaches to the original entries with their original expiries.
pub async fn delete_used_for_transaction(
    conn: &mut PgConnection,
    transaction_id: Uuid,
) -> Result<i64, AppError> {
    let amounts = sqlx::query_scalar::<_, i64>(
        r#"
        DELETE FROM point_ledger
        WHERE transaction_id = $1 AND kind = 'USED'
        RETURNING -amount
        "#,
    )
    .bind(transaction_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(amounts.iter().sum())
}
