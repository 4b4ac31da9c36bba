use sqlx::PgConnection;
use uuid::Uuid;

use crate::models::User;
use crate::utils::AppError;

pub async fn insert(
    conn: &mut PgConnection,
    email: &str,
    display_name: &str,
) -> Result<User, AppError> {
    let row = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (email, display_name)
        VALUES ($1, $2)
        RETURNING id, email, display_name, point_balance, created_at, updated_at
        "#,
    )
    .bind(email)
    .bind(display_name)
    .fetch_one(&mut *conn)
    .await?;

    Ok(row)
}

pub async fn find(conn: &mut PgConnection, id: Uuid) -> Result<Option<User>, AppError> {
    let row = sqlx::query_as::<_, User>(
        r#"
        SELECT id, email, display_name, point_balance, created_at, updated_at
        FROM users
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row)
}

/// Locks the user row for the rest of the enclosing transaction. Point
/// spending serializes on this lock so two purchases cannot both spend
/// the same points.
pub async fn lock(conn: &mut PgConnection, id: Uuid) -> Result<Option<User>, AppError> {
    let row = sqlx::query_as::<_, User>(
        r#"
        SELECT id, email, display_name, point_balance, created_at, updated_at
        FROM users
        WHERE id = $1
        FOR UPDATE
        "#,
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row)
}

/// Moves the cached point balance by `delta` (negative to spend). The
/// guard keeps the cache non-negative; a `false` return means the caller
/// tried to spend more than the cache holds.
pub async fn adjust_point_balance(
    conn: &mut PgConnection,
    id: Uuid,
    delta: i64,
) -> Result<bool, AppError> {
    let result = sqlx::query(
        r#"
        UPDATE users
        SET point_balance = point_balance + $2,
            updated_at = now()
        WHERE id = $1 AND point_balance + $2 >= 0
        "#,
    )
    .bind(id)
    .bind(delta)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() == 1)
}
