//! Matchit routing configuration.

use std::sync::Arc;

use gridlock_core::error::GridError;
use gridlock_core::MemoryGrid;
use hyper::{body::Bytes, Method, Request, Response};
use matchit::Router as MatchitRouter;

use crate::config::ServerConfig;
use crate::handlers;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Grid shared by every connection
    pub grid: Arc<MemoryGrid>,
    pub config: Arc<ServerConfig>,
}

/// HTTP request router.
pub struct Router {
    inner: MatchitRouter<RouteHandler>,
    state: AppState,
}

impl Router {
    /// Creates a router with every grid route registered.
    pub fn new(grid: Arc<MemoryGrid>, config: Arc<ServerConfig>) -> Result<Self, RouterError> {
        let routes = [
            ("/health", RouteHandler::Health),
            ("/stores/{store}", RouteHandler::Store),
            ("/stores/{store}/tables", RouteHandler::Tables),
            ("/stores/{store}/tables/{table}", RouteHandler::Table),
            ("/stores/{store}/tables/{table}/values", RouteHandler::Values),
            ("/stores/{store}/tables/{table}/cells/{cell}", RouteHandler::Cell),
            ("/stores/{store}/tables/{table}/rows", RouteHandler::Rows),
            ("/stores/{store}/tables/{table}/rows/{row}", RouteHandler::Row),
            ("/stores/{store}/tables/{table}/frozen", RouteHandler::Frozen),
        ];
        let mut router = MatchitRouter::new();
        for (path, handler) in routes {
            router.insert(path, handler).map_err(|e| {
                RouterError::InternalError(format!("Failed to insert {} route: {}", path, e))
            })?;
        }
        Ok(Self {
            inner: router,
            state: AppState { grid, config },
        })
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Routes an incoming request to the appropriate handler.
    pub async fn route(
        &self,
        req: Request<hyper::body::Incoming>,
    ) -> Result<Response<Bytes>, RouterError> {
        let path = req.uri().path().to_string();

        match self.inner.at(&path) {
            Ok(matched) => {
                matched
                    .value
                    .handle(req, matched.params, self.state.clone())
                    .await
            }
            Err(_) => Err(RouterError::NotFound(format!("No route found for {}", path))),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum RouteHandler {
    Health,
    Store,
    Tables,
    Table,
    Values,
    Cell,
    Rows,
    Row,
    Frozen,
}

impl RouteHandler {
    async fn handle(
        &self,
        req: Request<hyper::body::Incoming>,
        params: matchit::Params<'_, '_>,
        state: AppState,
    ) -> Result<Response<Bytes>, RouterError> {
        let method = req.method().clone();
        match (self, method) {
            (RouteHandler::Health, Method::GET) => handlers::health(),
            (RouteHandler::Store, Method::POST) => handlers::create_store(params, state),
            (RouteHandler::Tables, Method::GET) => handlers::list_tables(params, state),
            (RouteHandler::Table, Method::POST) => handlers::create_table(req, params, state).await,
            (RouteHandler::Table, Method::DELETE) => handlers::delete_table(params, state),
            (RouteHandler::Values, Method::GET) => handlers::read_values(params, state),
            (RouteHandler::Values, Method::DELETE) => handlers::clear_table(params, state),
            (RouteHandler::Cell, Method::GET) => handlers::read_cell(params, state),
            (RouteHandler::Cell, Method::PUT) => handlers::write_cell(req, params, state).await,
            (RouteHandler::Rows, Method::POST) => handlers::append_row(req, params, state).await,
            (RouteHandler::Row, Method::PUT) => handlers::write_row(req, params, state).await,
            (RouteHandler::Row, Method::DELETE) => handlers::delete_row(params, state),
            (RouteHandler::Frozen, Method::PUT) => handlers::freeze_rows(req, params, state).await,
            _ => Err(RouterError::MethodNotAllowed),
        }
    }
}

/// Router error type.
#[derive(Debug)]
pub enum RouterError {
    MethodNotAllowed,
    InternalError(String),
    Timeout,
    BadRequest(String),
    NotFound(String),
    /// Failure reported by the grid itself
    Grid(GridError),
}

impl RouterError {
    /// HTTP status and error kind sent to the client.
    pub fn status_and_kind(&self) -> (u16, Option<&'static str>) {
        match self {
            RouterError::MethodNotAllowed => (405, None),
            RouterError::InternalError(_) => (500, None),
            RouterError::Timeout => (408, None),
            RouterError::BadRequest(_) => (400, Some("invalid_argument")),
            RouterError::NotFound(_) => (404, None),
            RouterError::Grid(e) => {
                let status = match e {
                    GridError::StoreNotFound(_) | GridError::TableNotFound { .. } => 404,
                    GridError::TableAlreadyExists(_) | GridError::DuplicateRecord { .. } => 409,
                    GridError::Connectivity(_) => 503,
                    GridError::RowOutOfRange { .. }
                    | GridError::ColumnNotFound { .. }
                    | GridError::InvalidCellAddress(_)
                    | GridError::InvalidStoreReference(_)
                    | GridError::InvalidRecord { .. }
                    | GridError::InvalidArgument(_) => 400,
                    _ => 500,
                };
                (status, Some(e.kind()))
            }
        }
    }
}

impl std::fmt::Display for RouterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RouterError::MethodNotAllowed => write!(f, "Method Not Allowed"),
            RouterError::InternalError(msg) => write!(f, "Internal Error: {}", msg),
            RouterError::Timeout => write!(f, "Request Timeout"),
            RouterError::BadRequest(msg) => write!(f, "Bad Request: {}", msg),
            RouterError::NotFound(msg) => write!(f, "Not Found: {}", msg),
            RouterError::Grid(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for RouterError {}

impl From<GridError> for RouterError {
    fn from(e: GridError) -> Self {
        RouterError::Grid(e)
    }
}

impl From<RouterError> for Response<Bytes> {
    fn from(err: RouterError) -> Self {
        let (status, kind) = err.status_and_kind();
        let message = match &err {
            RouterError::Grid(e) => e.to_string(),
            other => other.to_string(),
        };
        let error_response =
            gridlock_core::wire::error_response(status, message, kind.map(str::to_string));
        let body = serde_json::to_vec(&error_response)
            .unwrap_or_else(|e| format!("{{\"success\":false,\"error\":{{\"code\":\"500\",\"message\":\"Failed to serialize error: {}\"}}}}", e).into_bytes());

        Response::builder()
            .status(status)
            .header("Content-Type", "application/json")
            .body(Bytes::from(body))
            .unwrap_or_else(|_| {
                let mut fallback = Response::new(Bytes::from("Internal Server Error"));
                *fallback.status_mut() = hyper::StatusCode::INTERNAL_SERVER_ERROR;
                fallback
            })
    }
}
