/// Response helpers shared by the API routes
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;

/// Error body returned by every API route
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// 200 OK with a JSON body
pub fn success_response<T: Serialize>(body: T) -> Response {
    (StatusCode::OK, Json(body)).into_response()
}

/// Error status with a structured JSON body
pub fn error_response(
    status: StatusCode,
    code: &str,
    message: &str,
    details: Option<&str>,
) -> Response {
    let body = ErrorResponse {
        error: ErrorDetail {
            code: code.to_string(),
            message: message.to_string(),
            details: details.map(str::to_string),
        },
        timestamp: chrono::Utc::now().to_rfc3339(),
    };
    (status, Json(body)).into_response()
}

/// Room ids are limited to letters, digits, spaces and `_!.,+-`
pub fn is_valid_room_id(room_id: &str) -> bool {
    !room_id.is_empty()
        && room_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || " _!.,+-".contains(c))
}

/// Split a comma-separated room list, dropping blanks
pub fn parse_room_list(rooms: &str) -> Vec<String> {
    rooms
        .split(',')
        .map(str::trim)
        .filter(|room| !room.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_id_validation() {
        assert!(is_valid_room_id("Room 1"));
        assert!(is_valid_room_id("a_b-c.d,e+f!"));
        assert!(!is_valid_room_id(""));
        assert!(!is_valid_room_id("a/b"));
        assert!(!is_valid_room_id("caf\u{e9}"));
    }

    #[test]
    fn test_parse_room_list() {
        assert_eq!(parse_room_list("a, b,,c "), vec!["a", "b", "c"]);
        assert!(parse_room_list(" , ").is_empty());
    }

    #[test]
    fn test_error_response_status() {
        let response = error_response(StatusCode::BAD_REQUEST, "BAD_ROOM", "Invalid room", None);
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
