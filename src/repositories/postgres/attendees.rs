use chrono::{DateTime, Utc};
use sqlx::PgConnection;
use uuid::Uuid;

use crate::models::{Attendee, CheckInContext};
use crate::utils::AppError;

/// Inserts one attendee, tolerating a check-in token collision: on
/// conflict nothing is written and `false` comes back so the caller can
/// mint a fresh token and retry. A plain unique violation would poison
/// the whole enclosing transaction.
pub async fn try_insert(
    conn: &mut PgConnection,
    transaction_id: Uuid,
    event_id: Uuid,
    user_id: Uuid,
    check_in_token: &str,
) -> Result<bool, AppError> {
    let result = sqlx::query(
        r#"
        INSERT INTO attendees (transaction_id, event_id, user_id, check_in_token)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (check_in_token) DO NOTHING
        "#,
    )
    .bind(transaction_id)
    .bind(event_id)
    .bind(user_id)
    .bind(check_in_token)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Resolves a gate token to the attendee plus the transaction status and
/// event window the gate decision needs, locking only the attendee row
/// so concurrent scans of the same token serialize.
pub async fn find_context_by_token(
    conn: &mut PgConnection,
    token: &str,
) -> Result<Option<CheckInContext>, AppError> {
    let row = sqlx::query_as::<_, CheckInContext>(
        r#"
        SELECT a.id, a.transaction_id, a.event_id, a.user_id, a.check_in_token,
               a.checked_in_at, a.created_at,
               t.status AS transaction_status,
               e.title AS event_title,
               e.end_time AS event_end_time
        FROM attendees a
        JOIN transactions t ON t.id = a.transaction_id
        JOIN events e ON e.id = a.event_id
        WHERE a.check_in_token = $1
        FOR UPDATE OF a
        "#,
    )
    .bind(token)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row)
}

/// Stamps the scan time. `false` means another scan got there first.
pub async fn mark_checked_in(
    conn: &mut PgConnection,
    id: Uuid,
    now: DateTime<Utc>,
) -> Result<bool, AppError> {
    let result = sqlx::query(
        r#"
        UPDATE attendees
        SET checked_in_at = $2
        WHERE id = $1 AND checked_in_at IS NULL
        "#,
    )
    .bind(id)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

pub async fn for_transaction(
    conn: &mut PgConnection,
    transaction_id: Uuid,
) -> Result<Vec<Attendee>, AppError> {
    let rows = sqlx::query_as::<_, Attendee>(
        r#"
        SELECT id, transaction_id, event_id, user_id, check_in_token,
               checked_in_at, created_at
        FROM attendees
        WHERE transaction_id = $1
        ORDER BY created_at ASC
        "#,
    )
    .bind(transaction_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows)
}

pub async fn for_event(
    conn: &mut PgConnection,
    event_id: Uuid,
) -> Result<Vec<Attendee>, AppError> {
    let rows = sqlx::query_as::<_, Attendee>(
        r#"
        SELECT id, transaction_id, event_id, user_id, check_in_token,
               checked_in_at, created_at
        FROM attendees
        WHERE event_id = $1
        ORDER BY created_at ASC
        "#,
    )
    .bind(event_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows)
}
