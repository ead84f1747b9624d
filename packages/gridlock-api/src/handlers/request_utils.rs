//! Request utilities for HTTP endpoints.

use gridlock_core::address::CellAddress;
use gridlock_core::StoreId;
use http_body_util::BodyExt;
use hyper::{body::Bytes, Request};
use percent_encoding::percent_decode_str;
use serde::de::DeserializeOwned;
use tokio::time;

use crate::router::RouterError;

/// Type alias for matchit parameters with explicit lifetimes
pub type MatchitParams<'a, 'b> = matchit::Params<'a, 'b>;

/// Reads the request body, failing after `timeout_ms`.
pub async fn read_request_body_with_timeout(
    req: Request<hyper::body::Incoming>,
    timeout_ms: u64,
) -> Result<Bytes, RouterError> {
    let timeout_duration = time::Duration::from_millis(timeout_ms);
    let body = time::timeout(timeout_duration, req.collect())
        .await
        .map_err(|_| RouterError::Timeout)?
        .map_err(|e| RouterError::InternalError(format!("Failed to read request body: {}", e)))?;
    Ok(body.to_bytes())
}

/// Reads and parses a JSON body.
pub async fn read_json<T: DeserializeOwned>(
    req: Request<hyper::body::Incoming>,
    timeout_ms: u64,
) -> Result<T, RouterError> {
    let bytes = read_request_body_with_timeout(req, timeout_ms).await?;
    serde_json::from_slice(&bytes)
        .map_err(|e| RouterError::BadRequest(format!("Failed to parse request: {}", e)))
}

/// Percent-decoded path parameter.
pub fn param(params: &MatchitParams<'_, '_>, name: &str) -> Result<String, RouterError> {
    let raw = params
        .get(name)
        .ok_or_else(|| RouterError::BadRequest(format!("Missing path parameter '{}'", name)))?;
    percent_decode_str(raw)
        .decode_utf8()
        .map(|s| s.into_owned())
        .map_err(|e| RouterError::BadRequest(format!("Invalid '{}' parameter: {}", name, e)))
}

pub fn store_param(params: &MatchitParams<'_, '_>) -> Result<StoreId, RouterError> {
    Ok(StoreId::parse(&param(params, "store")?)?)
}

pub fn cell_param(params: &MatchitParams<'_, '_>) -> Result<CellAddress, RouterError> {
    Ok(param(params, "cell")?.parse::<CellAddress>()?)
}

pub fn row_param(params: &MatchitParams<'_, '_>) -> Result<u32, RouterError> {
    let raw = param(params, "row")?;
    raw.parse()
        .map_err(|_| RouterError::BadRequest(format!("Invalid row number '{}'", raw)))
}
