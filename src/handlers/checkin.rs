use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};

use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::success;

/// Gate scan. No actor header: the scanner authenticates upstream and
/// the token itself is the credential being verified.
pub async fn check_in(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Response, AppError> {
    let outcome = state.check_in.check_in(&token).await?;

    Ok(success(outcome, "Check-in processed").into_response())
}
