//! Store and table level endpoints.

use gridlock_core::wire::{CreateTableRequest, FreezeRequest};
use gridlock_core::GridBackend;
use hyper::{body::Bytes, Request, Response};

use super::request_utils::{param, read_json, store_param, MatchitParams};
use super::response::{json_response, ok_response};
use crate::router::{AppState, RouterError};

/// Liveness check.
///
/// # Endpoint
/// `GET /health`
pub fn health() -> Result<Response<Bytes>, RouterError> {
    json_response(200, "ok")
}

/// Creates an empty store.
///
/// # Endpoint
/// `POST /stores/{store}`
///
/// # Errors
/// - **400 Bad Request**: Malformed store id, or the store already exists
pub fn create_store(
    params: MatchitParams<'_, '_>,
    state: AppState,
) -> Result<Response<Bytes>, RouterError> {
    let store = store_param(&params)?;
    state.grid.create_store(&store)?;
    tracing::info!("Created store {}", store);
    ok_response(201)
}

/// Lists table names in creation order.
///
/// # Endpoint
/// `GET /stores/{store}/tables`
///
/// # Response
/// ```json
/// {"success": true, "data": ["user_docs", "user_tags"]}
/// ```
pub fn list_tables(
    params: MatchitParams<'_, '_>,
    state: AppState,
) -> Result<Response<Bytes>, RouterError> {
    let store = store_param(&params)?;
    json_response(200, state.grid.list_tables(&store)?)
}

/// Creates a blank table.
///
/// # Endpoint
/// `POST /stores/{store}/tables/{table}`
///
/// # Request Body
/// ```json
/// {"rows": 1000, "cols": 20}
/// ```
///
/// # Errors
/// - **404 Not Found**: Unknown store
/// - **409 Conflict**: Table already exists
pub async fn create_table(
    req: Request<hyper::body::Incoming>,
    params: MatchitParams<'_, '_>,
    state: AppState,
) -> Result<Response<Bytes>, RouterError> {
    let store = store_param(&params)?;
    let table = param(&params, "table")?;
    let request: CreateTableRequest = read_json(req, state.config.request_timeout_ms).await?;
    state
        .grid
        .create_table(&store, &table, request.rows, request.cols)?;
    tracing::info!(
        "Created table {}/{} ({}x{})",
        store,
        table,
        request.rows,
        request.cols
    );
    ok_response(201)
}

/// Deletes a table.
///
/// # Endpoint
/// `DELETE /stores/{store}/tables/{table}`
pub fn delete_table(
    params: MatchitParams<'_, '_>,
    state: AppState,
) -> Result<Response<Bytes>, RouterError> {
    let store = store_param(&params)?;
    let table = param(&params, "table")?;
    state.grid.delete_table(&store, &table)?;
    tracing::info!("Deleted table {}/{}", store, table);
    ok_response(200)
}

/// Blanks every cell of a table.
///
/// # Endpoint
/// `DELETE /stores/{store}/tables/{table}/values`
pub fn clear_table(
    params: MatchitParams<'_, '_>,
    state: AppState,
) -> Result<Response<Bytes>, RouterError> {
    let store = store_param(&params)?;
    let table = param(&params, "table")?;
    state.grid.clear_table(&store, &table)?;
    ok_response(200)
}

/// Pins the first rows of a table.
///
/// # Endpoint
/// `PUT /stores/{store}/tables/{table}/frozen`
///
/// # Request Body
/// ```json
/// {"rows": 1}
/// ```
pub async fn freeze_rows(
    req: Request<hyper::body::Incoming>,
    params: MatchitParams<'_, '_>,
    state: AppState,
) -> Result<Response<Bytes>, RouterError> {
    let store = store_param(&params)?;
    let table = param(&params, "table")?;
    let request: FreezeRequest = read_json(req, state.config.request_timeout_ms).await?;
    state.grid.freeze_rows(&store, &table, request.rows)?;
    ok_response(200)
}
