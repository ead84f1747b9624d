//! JSON bodies exchanged between `HttpBackend` and the grid server.

use serde::{Deserialize, Serialize};

/// Success envelope: `{"success": true, "data": ...}`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
}

/// Error payload; `details` carries the error kind.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    /// HTTP status code as string
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Error envelope: `{"success": false, "error": {...}}`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: ApiError,
}

pub fn success_response<T: Serialize>(data: T) -> ApiResponse<T> {
    ApiResponse {
        success: true,
        data,
    }
}

pub fn error_response(code: u16, message: String, details: Option<String>) -> ErrorResponse {
    ErrorResponse {
        success: false,
        error: ApiError {
            code: code.to_string(),
            message,
            details,
        },
    }
}

/// Body of `POST /stores/{store}/tables/{table}`.
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateTableRequest {
    pub rows: u32,
    pub cols: u32,
}

/// Body of `PUT .../cells/{cell}`.
#[derive(Debug, Serialize, Deserialize)]
pub struct WriteCellRequest {
    pub value: String,
}

/// Body of row writes and appends.
#[derive(Debug, Serialize, Deserialize)]
pub struct RowRequest {
    pub values: Vec<String>,
}

/// Body of `PUT .../frozen`.
#[derive(Debug, Serialize, Deserialize)]
pub struct FreezeRequest {
    pub rows: u32,
}
