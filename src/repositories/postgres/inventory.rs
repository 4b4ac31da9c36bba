use sqlx::PgConnection;
use uuid::Uuid;

use crate::models::TicketCategory;
use crate::utils::AppError;

pub struct NewTicketCategory {
    pub event_id: Uuid,
    pub name: String,
    pub price: i64,
    pub total_seats: i32,
}

pub async fn insert_category(
    conn: &mut PgConnection,
    category: NewTicketCategory,
) -> Result<TicketCategory, AppError> {
    let row = sqlx::query_as::<_, TicketCategory>(
        r#"
        INSERT INTO ticket_categories (event_id, name, price, total_seats, available_seats)
        VALUES ($1, $2, $3, $4, $4)
        RETURNING id, event_id, name, price, total_seats, available_seats, sold,
                  created_at, updated_at
        "#,
    )
    .bind(category.event_id)
    .bind(&category.name)
    .bind(category.price)
    .bind(category.total_seats)
    .fetch_one(&mut *conn)
    .await?;

    Ok(row)
}

/// Locks the category row so pricing reads and the seat write happen
/// against the same snapshot. Contention stays scoped to one category.
pub async fn lock_category(
    conn: &mut PgConnection,
    id: Uuid,
) -> Result<Option<TicketCategory>, AppError> {
    let row = sqlx::query_as::<_, TicketCategory>(
        r#"
        SELECT id, event_id, name, price, total_seats, available_seats, sold,
               created_at, updated_at
        FROM ticket_categories
        WHERE id = $1
        FOR UPDATE
        "#,
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row)
}

pub async fn categories_for_event(
    conn: &mut PgConnection,
    event_id: Uuid,
) -> Result<Vec<TicketCategory>, AppError> {
    let rows = sqlx::query_as::<_, TicketCategory>(
        r#"
        SELECT id, event_id, name, price, total_seats, available_seats, sold,
               created_at, updated_at
        FROM ticket_categories
        WHERE event_id = $1
        ORDER BY price ASC
        "#,
    )
    .bind(event_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows)
}

/// Takes `quantity` seats in one guarded update. `false` means another
/// buyer drained the category first.
pub async fn reserve_seats(
    conn: &mut PgConnection,
    category_id: Uuid,
    quantity: i32,
) -> Result<bool, AppError> {
    let result = sqlx::query(
        r#"
        UPDATE ticket_categories
        SET available_seats = available_seats - $2,
            sold = sold + $2,
            updated_at = now()
        WHERE id = $1 AND available_seats >= $2
        "#,
    )
    .bind(category_id)
    .bind(quantity)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Inverse of [`reserve_seats`]; rollback only. The guard on `sold`
/// keeps a double release from minting seats out of thin air.
pub async fn release_seats(
    conn: &mut PgConnection,
    category_id: Uuid,
    quantity: i32,
) -> Result<bool, AppError> {
    let result = sqlx::query(
        r#"
        UPDATE ticket_categories
        SET available_seats = available_seats + $2,
            sold = sold - $2,
            updated_at = now()
        WHERE id = $1 AND sold >= $2
        "#,
    )
    .bind(category_id)
    .bind(quantity)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() == 1)
}
