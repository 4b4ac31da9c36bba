use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::Value;

/// Uniform envelope for every successful response. Absent fields are
/// dropped from the wire rather than serialized as null.
#[derive(Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Serialize)]
pub struct ApiErrorBody {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

#[derive(Serialize)]
pub struct ApiErrorResponse {
    pub success: bool,
    pub error: ApiErrorBody,
}

fn envelope<T: Serialize>(status: StatusCode, data: T, message: String) -> Response {
    let body = ApiResponse {
        success: true,
        data: Some(data),
        message: Some(message),
    };
    (status, Json(body)).into_response()
}

pub fn success<T: Serialize>(data: T, message: impl Into<String>) -> Response {
    envelope(StatusCode::OK, data, message.into())
}

/// 201 variant for resource-creating endpoints.
pub fn created<T: Serialize>(data: T, message: impl Into<String>) -> Response {
    envelope(StatusCode::CREATED, data, message.into())
}

pub fn error(
    code: &str,
    message: impl Into<String>,
    details: Option<Value>,
    status: StatusCode,
) -> Response {
    let body = ApiErrorResponse {
        success: false,
        error: ApiErrorBody {
            code: code.to_string(),
            message: message.into(),
            details,
        },
    };

    (status, Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_fields_stay_off_the_wire() {
        let body = ApiResponse::<()> {
            success: true,
            data: None,
            message: None,
        };
        assert_eq!(serde_json::to_string(&body).unwrap(), r#"{"success":true}"#);
    }

    #[test]
    fn error_body_nests_code_and_message() {
        let body = ApiErrorResponse {
            success: false,
            error: ApiErrorBody {
                code: "NOT_FOUND".into(),
                message: "no such thing".into(),
                details: None,
            },
        };
        let json = serde_json::to_string(&body).unwrap();
        assert_eq!(
            json,
            r#"{"success":false,"error":{"code":"NOT_FOUND","message":"no such thing"}}"#
        );
    }
}
