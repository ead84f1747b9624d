//! Blocking client for a grid server.

use std::time::Duration;

use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::GridBackend;
use crate::address::CellAddress;
use crate::config::GridConfig;
use crate::error::{GridError, Result};
use crate::session::StoreId;
use crate::wire::{
    ApiResponse, CreateTableRequest, ErrorResponse, FreezeRequest, RowRequest, WriteCellRequest,
};

/// What a request addressed, used to rebuild typed errors from the wire.
#[derive(Debug, Clone, Copy)]
struct Target<'a> {
    store: &'a StoreId,
    table: Option<&'a str>,
    row: Option<u32>,
}

impl<'a> Target<'a> {
    fn store(store: &'a StoreId) -> Self {
        Self {
            store,
            table: None,
            row: None,
        }
    }

    fn table(store: &'a StoreId, table: &'a str) -> Self {
        Self {
            store,
            table: Some(table),
            row: None,
        }
    }

    fn row(store: &'a StoreId, table: &'a str, row: u32) -> Self {
        Self {
            store,
            table: Some(table),
            row: Some(row),
        }
    }
}

/// Grid backend that talks to a grid server over HTTP.
///
/// Each trait call is one request. Transport failures and timeouts surface
/// as connectivity errors; error kinds sent by the server map back to the
/// matching [`GridError`].
#[derive(Debug, Clone)]
pub struct HttpBackend {
    base_url: String,
    client: Client,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GridError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn from_config(config: &GridConfig) -> Result<Self> {
        Self::new(config.server_url.clone(), config.request_timeout())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, segments: &[&str]) -> String {
        let mut url = self.base_url.clone();
        for segment in segments {
            url.push('/');
            url.extend(utf8_percent_encode(segment, NON_ALPHANUMERIC));
        }
        url
    }

    fn table_url(&self, store: &StoreId, table: &str, rest: &[&str]) -> String {
        let mut segments = vec!["stores", store.as_str(), "tables", table];
        segments.extend_from_slice(rest);
        self.url(&segments)
    }

    fn send<T: DeserializeOwned>(&self, request: RequestBuilder, target: Target<'_>) -> Result<T> {
        let response = request
            .send()
            .map_err(|e| GridError::Connectivity(e.to_string()))?;
        let status = response.status();
        let body = response
            .bytes()
            .map_err(|e| GridError::Connectivity(e.to_string()))?;

        if status.is_success() {
            let parsed: ApiResponse<T> = serde_json::from_slice(&body)
                .map_err(|e| GridError::SerializationError(e.to_string()))?;
            return Ok(parsed.data);
        }

        match serde_json::from_slice::<ErrorResponse>(&body) {
            Ok(err) => Err(error_from_wire(
                status.as_u16(),
                err.error.details.as_deref(),
                err.error.message,
                target,
            )),
            Err(_) => Err(GridError::Remote {
                code: status.as_u16(),
                message: String::from_utf8_lossy(&body).into_owned(),
            }),
        }
    }

    fn call<B: Serialize, T: DeserializeOwned>(
        &self,
        method: Method,
        url: String,
        body: Option<&B>,
        target: Target<'_>,
    ) -> Result<T> {
        tracing::debug!("{} {}", method, url);
        let mut request = self.client.request(method, url);
        if let Some(body) = body {
            request = request.json(body);
        }
        self.send(request, target)
    }
}

fn error_from_wire(code: u16, kind: Option<&str>, message: String, target: Target<'_>) -> GridError {
    let table = || target.table.unwrap_or_default().to_string();
    match kind {
        Some("connectivity") => GridError::Connectivity(message),
        Some("store_not_found") => GridError::StoreNotFound(target.store.to_string()),
        Some("table_not_found") => GridError::TableNotFound {
            store: target.store.to_string(),
            table: table(),
        },
        Some("table_already_exists") => GridError::TableAlreadyExists(table()),
        Some("row_out_of_range") => GridError::RowOutOfRange {
            table: table(),
            row: target.row.unwrap_or_default(),
        },
        Some("invalid_cell_address") => GridError::InvalidCellAddress(message),
        Some("invalid_argument") => GridError::InvalidArgument(message),
        _ => GridError::Remote { code, message },
    }
}

const NO_BODY: Option<&()> = None;

impl GridBackend for HttpBackend {
    fn create_store(&self, store: &StoreId) -> Result<()> {
        let url = self.url(&["stores", store.as_str()]);
        self.call(Method::POST, url, NO_BODY, Target::store(store))
    }

    fn list_tables(&self, store: &StoreId) -> Result<Vec<String>> {
        let url = self.url(&["stores", store.as_str(), "tables"]);
        self.call(Method::GET, url, NO_BODY, Target::store(store))
    }

    fn create_table(&self, store: &StoreId, table: &str, rows: u32, cols: u32) -> Result<()> {
        let url = self.table_url(store, table, &[]);
        let body = CreateTableRequest { rows, cols };
        self.call(Method::POST, url, Some(&body), Target::table(store, table))
    }

    fn delete_table(&self, store: &StoreId, table: &str) -> Result<()> {
        let url = self.table_url(store, table, &[]);
        self.call(Method::DELETE, url, NO_BODY, Target::table(store, table))
    }

    fn clear_table(&self, store: &StoreId, table: &str) -> Result<()> {
        let url = self.table_url(store, table, &["values"]);
        self.call(Method::DELETE, url, NO_BODY, Target::table(store, table))
    }

    fn read_values(&self, store: &StoreId, table: &str) -> Result<Vec<Vec<String>>> {
        let url = self.table_url(store, table, &["values"]);
        self.call(Method::GET, url, NO_BODY, Target::table(store, table))
    }

    fn read_cell(&self, store: &StoreId, table: &str, cell: CellAddress) -> Result<String> {
        let cell = cell.to_string();
        let url = self.table_url(store, table, &["cells", cell.as_str()]);
        self.call(Method::GET, url, NO_BODY, Target::table(store, table))
    }

    fn write_cell(
        &self,
        store: &StoreId,
        table: &str,
        cell: CellAddress,
        value: &str,
    ) -> Result<()> {
        let address = cell.to_string();
        let url = self.table_url(store, table, &["cells", address.as_str()]);
        let body = WriteCellRequest {
            value: value.to_string(),
        };
        self.call(Method::PUT, url, Some(&body), Target::row(store, table, cell.row))
    }

    fn write_row(&self, store: &StoreId, table: &str, row: u32, values: &[String]) -> Result<()> {
        let index = row.to_string();
        let url = self.table_url(store, table, &["rows", index.as_str()]);
        let body = RowRequest {
            values: values.to_vec(),
        };
        self.call(Method::PUT, url, Some(&body), Target::row(store, table, row))
    }

    fn append_row(&self, store: &StoreId, table: &str, values: &[String]) -> Result<()> {
        let url = self.table_url(store, table, &["rows"]);
        let body = RowRequest {
            values: values.to_vec(),
        };
        self.call(Method::POST, url, Some(&body), Target::table(store, table))
    }

    fn delete_row(&self, store: &StoreId, table: &str, row: u32) -> Result<()> {
        let index = row.to_string();
        let url = self.table_url(store, table, &["rows", index.as_str()]);
        self.call(Method::DELETE, url, NO_BODY, Target::row(store, table, row))
    }

    fn freeze_rows(&self, store: &StoreId, table: &str, rows: u32) -> Result<()> {
        let url = self.table_url(store, table, &["frozen"]);
        let body = FreezeRequest { rows };
        self.call(Method::PUT, url, Some(&body), Target::table(store, table))
    }
}
