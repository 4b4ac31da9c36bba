use chrono::{DateTime, Utc};
use sqlx::PgConnection;
use uuid::Uuid;

use crate::models::Event;
use crate::utils::AppError;

pub struct NewEvent {
    pub organizer_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub location: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
}

pub async fn insert(conn: &mut PgConnection, event: NewEvent) -> Result<Event, AppError> {
    let row = sqlx::query_as::<_, Event>(
        r#"
        INSERT INTO events (organizer_id, title, description, location, start_time, end_time)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id, organizer_id, title, description, location,
                  start_time, end_time, created_at, updated_at
        "#,
    )
    .bind(event.organizer_id)
    .bind(&event.title)
    .bind(&event.description)
    .bind(&event.location)
    .bind(event.start_time)
    .bind(event.end_time)
    .fetch_one(&mut *conn)
    .await?;

    Ok(row)
}

pub async fn find(conn: &mut PgConnection, id: Uuid) -> Result<Option<Event>, AppError> {
    let row = sqlx::query_as::<_, Event>(
        r#"
        SELECT id, organizer_id, title, description, location,
               start_time, end_time, created_at, updated_at
        FROM events
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row)
}

pub async fn list(conn: &mut PgConnection) -> Result<Vec<Event>, AppError> {
    let rows = sqlx::query_as::<_, Event>(
        r#"
        SELECT id, organizer_id, title, description, location,
               start_time, end_time, created_at, updated_at
        FROM events
        ORDER BY start_time ASC
        "#,
    )
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows)
}
