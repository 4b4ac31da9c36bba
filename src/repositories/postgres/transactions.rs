use chrono::{DateTime, Utc};
use sqlx::PgConnection;
use uuid::Uuid;

use crate::models::{Transaction, TransactionDetail, TransactionStatus, TransactionSummary};
use crate::utils::AppError;

pub struct NewTransaction {
    pub user_id: Uuid,
    pub event_id: Uuid,
    pub ticket_category_id: Uuid,
    pub quantity: i32,
    pub subtotal: i64,
    pub voucher_id: Option<Uuid>,
    pub coupon_id: Option<Uuid>,
    pub points_used: i64,
    pub final_price: i64,
    pub expires_at: DateTime<Utc>,
}

pub async fn insert(
    conn: &mut PgConnection,
    transaction: NewTransaction,
) -> Result<Transaction, AppError> {
    let row = sqlx::query_as::<_, Transaction>(
        r#"
        INSERT INTO transactions
            (user_id, event_id, ticket_category_id, quantity, subtotal,
             voucher_id, coupon_id, points_used, final_price, expires_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        RETURNING id, user_id, event_id, ticket_category_id, quantity, subtotal,
                  voucher_id, coupon_id, points_used, final_price, status,
                  payment_proof, rejection_reason, expires_at,
                  confirmation_requested_at, created_at, updated_at
        "#,
    )
    .bind(transaction.user_id)
    .bind(transaction.event_id)
    .bind(transaction.ticket_category_id)
    .bind(transaction.quantity)
    .bind(transaction.subtotal)
    .bind(transaction.voucher_id)
    .bind(transaction.coupon_id)
    .bind(transaction.points_used)
    .bind(transaction.final_price)
    .bind(transaction.expires_at)
    .fetch_one(&mut *conn)
    .await?;

    Ok(row)
}

pub async fn find(conn: &mut PgConnection, id: Uuid) -> Result<Option<Transaction>, AppError> {
    let row = sqlx::query_as::<_, Transaction>(
        r#"
        SELECT id, user_id, event_id, ticket_category_id, quantity, subtotal,
               voucher_id, coupon_id, points_used, final_price, status,
               payment_proof, rejection_reason, expires_at,
               confirmation_requested_at, created_at, updated_at
        FROM transactions
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row)
}

/// Locks the transaction row. Every lifecycle transition starts here so
/// racing transitions (user cancel vs. reaper expiry, confirm vs.
/// reject) serialize on the row and the loser sees the new status.
pub async fn lock(conn: &mut PgConnection, id: Uuid) -> Result<Option<Transaction>, AppError> {
    let row = sqlx::query_as::<_, Transaction>(
        r#"
        SELECT id, user_id, event_id, ticket_category_id, quantity, subtotal,
               voucher_id, coupon_id, points_used, final_price, status,
               payment_proof, rejection_reason, expires_at,
               confirmation_requested_at, created_at, updated_at
        FROM transactions
        WHERE id = $1
        FOR UPDATE
        "#,
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row)
}

/// Compare-and-swap on status. `false` means the row was no longer in
/// `from`, i.e. a concurrent transition won.
pub async fn update_status(
    conn: &mut PgConnection,
    id: Uuid,
    from: TransactionStatus,
    to: TransactionStatus,
) -> Result<bool, AppError> {
    let result = sqlx::query(
        r#"
        UPDATE transactions
        SET status = $3,
            updated_at = now()
        WHERE id = $1 AND status = $2
        "#,
    )
    .bind(id)
    .bind(from)
    .bind(to)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Stores the proof and starts the confirmation-wait clock in the same
/// CAS that moves WAITING_PAYMENT to WAITING_CONFIRMATION.
pub async fn record_payment_proof(
    conn: &mut PgConnection,
    id: Uuid,
    proof: &str,
    now: DateTime<Utc>,
) -> Result<bool, AppError> {
    let result = sqlx::query(
        r#"
        UPDATE transactions
        SET status = 'WAITING_CONFIRMATION',
            payment_proof = $2,
            confirmation_requested_at = $3,
            updated_at = now()
        WHERE id = $1 AND status = 'WAITING_PAYMENT'
        "#,
    )
    .bind(id)
    .bind(proof)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

pub async fn record_rejection(
    conn: &mut PgConnection,
    id: Uuid,
    reason: Option<&str>,
) -> Result<bool, AppError> {
    let result = sqlx::query(
        r#"
        UPDATE transactions
        SET status = 'REJECTED',
            rejection_reason = $2,
            updated_at = now()
        WHERE id = $1 AND status = 'WAITING_CONFIRMATION'
        "#,
    )
    .bind(id)
    .bind(reason)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

pub async fn detail(
    conn: &mut PgConnection,
    id: Uuid,
) -> Result<Option<TransactionDetail>, AppError> {
    let row = sqlx::query_as::<_, TransactionDetail>(
        r#"
        SELECT t.id, t.user_id, t.event_id, t.ticket_category_id, t.quantity,
               t.subtotal, t.voucher_id, t.coupon_id, t.points_used,
               t.final_price, t.status, t.payment_proof, t.rejection_reason,
               t.expires_at, t.confirmation_requested_at, t.created_at,
               t.updated_at,
               e.title AS event_title,
               tc.name AS category_name,
               tc.price AS category_price,
               v.code AS voucher_code,
               c.code AS coupon_code
        FROM transactions t
        JOIN events e ON e.id = t.event_id
        JOIN ticket_categories tc ON tc.id = t.ticket_category_id
        LEFT JOIN vouchers v ON v.id = t.voucher_id
        LEFT JOIN coupons c ON c.id = t.coupon_id
        WHERE t.id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row)
}

pub async fn summaries_for_user(
    conn: &mut PgConnection,
    user_id: Uuid,
) -> Result<Vec<TransactionSummary>, AppError> {
    let rows = sqlx::query_as::<_, TransactionSummary>(
        r#"
        SELECT t.id,
               e.title AS event_title,
               tc.name AS category_name,
               t.quantity, t.final_price, t.status, t.expires_at, t.created_at
        FROM transactions t
        JOIN events e ON e.id = t.event_id
        JOIN ticket_categories tc ON tc.id = t.ticket_category_id
        WHERE t.user_id = $1
        ORDER BY t.created_at DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows)
}

/// WAITING_PAYMENT rows whose deadline has passed. Candidates only; the
/// caller re-checks under the row lock before acting.
pub async fn due_for_expiry(
    conn: &mut PgConnection,
    now: DateTime<Utc>,
    limit: i64,
) -> Result<Vec<Uuid>, AppError> {
    let ids = sqlx::query_scalar::<_, Uuid>(
        r#"
        SELECT id
        FROM transactions
        WHERE status = 'WAITING_PAYMENT' AND expires_at < $1
        ORDER BY expires_at ASC
        LIMIT $2
        "#,
    )
    .bind(now)
    .bind(limit)
    .fetch_all(&mut *conn)
    .await?;

    Ok(ids)
}

/// WAITING_CONFIRMATION rows whose proof has sat unreviewed past the
/// grace cutoff.
pub async fn due_for_auto_cancel(
    conn: &mut PgConnection,
    cutoff: DateTime<Utc>,
    limit: i64,
) -> Result<Vec<Uuid>, AppError> {
    let ids = sqlx::query_scalar::<_, Uuid>(
        r#"
        SELECT id
        FROM transactions
        WHERE status = 'WAITING_CONFIRMATION'
          AND confirmation_requested_at IS NOT NULL
          AND confirmation_requested_at < $1
        ORDER BY confirmation_requested_at ASC
        LIMIT $2
        "#,
    )
    .bind(cutoff)
    .bind(limit)
    .fetch_all(&mut *conn)
    .await?;

    Ok(ids)
}

/// One user's overdue non-terminal rows, for the lazy reap that runs
/// before their transaction list is served.
pub async fn stale_for_user(
    conn: &mut PgConnection,
    user_id: Uuid,
    now: DateTime<Utc>,
    confirmation_cutoff: DateTime<Utc>,
) -> Result<Vec<Uuid>, AppError> {
    let ids = sqlx::query_scalar::<_, Uuid>(
        r#"
        SELECT id
        FROM transactions
        WHERE user_id = $1
          AND ((status = 'WAITING_PAYMENT' AND expires_at < $2)
            OR (status = 'WAITING_CONFIRMATION'
                AND confirmation_requested_at IS NOT NULL
                AND confirmation_requested_at < $3))
        "#,
    )
    .bind(user_id)
    .bind(now)
    .bind(confirmation_cutoff)
    .fetch_all(&mut *conn)
    .await?;

    Ok(ids)
}
