//! Response helpers for HTTP endpoints.

use gridlock_core::wire::success_response;
use hyper::{body::Bytes, Response};
use serde::Serialize;

use crate::router::RouterError;

/// Builds a JSON response with proper error handling.
pub fn build_response(status: u16, json: Vec<u8>) -> Result<Response<Bytes>, RouterError> {
    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(Bytes::from(json))
        .map_err(|e| RouterError::InternalError(format!("Failed to build response: {}", e)))
}

/// Wraps `data` in the success envelope.
pub fn json_response<T: Serialize>(status: u16, data: T) -> Result<Response<Bytes>, RouterError> {
    let json = serde_json::to_vec(&success_response(data))
        .map_err(|e| RouterError::InternalError(format!("Failed to serialize response: {}", e)))?;
    build_response(status, json)
}

/// Success envelope with `null` data.
pub fn ok_response(status: u16) -> Result<Response<Bytes>, RouterError> {
    json_response(status, ())
}
