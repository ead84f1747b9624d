//! Value, cell and row endpoints.

use gridlock_core::wire::{RowRequest, WriteCellRequest};
use gridlock_core::GridBackend;
use hyper::{body::Bytes, Request, Response};

use super::request_utils::{cell_param, param, read_json, row_param, store_param, MatchitParams};
use super::response::{json_response, ok_response};
use crate::router::{AppState, RouterError};

/// Reads every value of a table as equal-width rows.
///
/// # Endpoint
/// `GET /stores/{store}/tables/{table}/values`
///
/// # Response
/// ```json
/// {"success": true, "data": [["_tagId", "_tag", "Unlocked"], ["AbCd1234", "default", ""]]}
/// ```
pub fn read_values(
    params: MatchitParams<'_, '_>,
    state: AppState,
) -> Result<Response<Bytes>, RouterError> {
    let store = store_param(&params)?;
    let table = param(&params, "table")?;
    json_response(200, state.grid.read_values(&store, &table)?)
}

/// Reads one cell; blank cells read as `""`.
///
/// # Endpoint
/// `GET /stores/{store}/tables/{table}/cells/{cell}`
pub fn read_cell(
    params: MatchitParams<'_, '_>,
    state: AppState,
) -> Result<Response<Bytes>, RouterError> {
    let store = store_param(&params)?;
    let table = param(&params, "table")?;
    let cell = cell_param(&params)?;
    json_response(200, state.grid.read_cell(&store, &table, cell)?)
}

/// Writes one cell.
///
/// # Endpoint
/// `PUT /stores/{store}/tables/{table}/cells/{cell}`
///
/// # Request Body
/// ```json
/// {"value": "alice"}
/// ```
pub async fn write_cell(
    req: Request<hyper::body::Incoming>,
    params: MatchitParams<'_, '_>,
    state: AppState,
) -> Result<Response<Bytes>, RouterError> {
    let store = store_param(&params)?;
    let table = param(&params, "table")?;
    let cell = cell_param(&params)?;
    let request: WriteCellRequest = read_json(req, state.config.request_timeout_ms).await?;
    state.grid.write_cell(&store, &table, cell, &request.value)?;
    tracing::debug!("{}/{}!{} = {:?}", store, table, cell, request.value);
    ok_response(200)
}

/// Overwrites a row starting at column `A`.
///
/// # Endpoint
/// `PUT /stores/{store}/tables/{table}/rows/{row}`
pub async fn write_row(
    req: Request<hyper::body::Incoming>,
    params: MatchitParams<'_, '_>,
    state: AppState,
) -> Result<Response<Bytes>, RouterError> {
    let store = store_param(&params)?;
    let table = param(&params, "table")?;
    let row = row_param(&params)?;
    let request: RowRequest = read_json(req, state.config.request_timeout_ms).await?;
    state.grid.write_row(&store, &table, row, &request.values)?;
    ok_response(200)
}

/// Appends a row below the last non-blank row.
///
/// # Endpoint
/// `POST /stores/{store}/tables/{table}/rows`
///
/// # Request Body
/// ```json
/// {"values": ["AbCd1234", "physics"]}
/// ```
pub async fn append_row(
    req: Request<hyper::body::Incoming>,
    params: MatchitParams<'_, '_>,
    state: AppState,
) -> Result<Response<Bytes>, RouterError> {
    let store = store_param(&params)?;
    let table = param(&params, "table")?;
    let request: RowRequest = read_json(req, state.config.request_timeout_ms).await?;
    state.grid.append_row(&store, &table, &request.values)?;
    ok_response(201)
}

/// Removes a physical row; later rows shift up.
///
/// # Endpoint
/// `DELETE /stores/{store}/tables/{table}/rows/{row}`
///
/// # Errors
/// - **400 Bad Request**: Row 0 or past the end of the table
pub fn delete_row(
    params: MatchitParams<'_, '_>,
    state: AppState,
) -> Result<Response<Bytes>, RouterError> {
    let store = store_param(&params)?;
    let table = param(&params, "table")?;
    let row = row_param(&params)?;
    state.grid.delete_row(&store, &table, row)?;
    tracing::debug!("Deleted row {} of {}/{}", row, store, table);
    ok_response(200)
}
