//! Planning Center API client.
//!
//! # Design
//! `PlanningCenter` holds the API host, the pre-built Basic-Auth header and a
//! `Transport`. Each operation is split into a `build_*` method that produces
//! an `HttpRequest` and a `parse_*` method that interprets an `HttpResponse`;
//! the terminal operations (`get`, `first`, `post`, ...) run the round-trip in
//! between through the transport. Queries are taken by value and never
//! outlive the call that executes them.
//!
//! The payload of the most recent failure is kept for `last_error`.

use std::sync::Mutex;

use serde_json::Value;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{decode_body, Error};
use crate::http::{HttpMethod, HttpRequest, HttpResponse, Transport};
use crate::module::Module;
use crate::pagination::{Page, PageWindow, PagedResult, DEFAULT_MAX_ROWS};
use crate::query::Query;
use crate::transport::UreqTransport;

pub struct PlanningCenter<T = UreqTransport> {
    transport: T,
    api_host: String,
    authorization: String,
    last_error: Mutex<Option<Value>>,
}

impl PlanningCenter<UreqTransport> {
    /// Client configured from `PCO_APPLICATION_ID` / `PCO_SECRET`.
    pub fn from_env() -> Result<Self, Error> {
        Ok(Self::new(&Config::from_env()?))
    }

    pub fn new(config: &Config) -> Self {
        Self::with_transport(config, UreqTransport::new(config.timeout))
    }
}

impl<T: Transport> PlanningCenter<T> {
    pub fn with_transport(config: &Config, transport: T) -> Self {
        Self {
            transport,
            api_host: config.api_host.trim_end_matches('/').to_string(),
            authorization: config.authorization(),
            last_error: Mutex::new(None),
        }
    }

    /// Start an empty query against `module`.
    pub fn query(&self, module: Module) -> Query {
        Query::new(module)
    }

    pub fn api_host(&self) -> &str {
        &self.api_host
    }

    /// Payload of the last failed operation: the decoded error body, or a
    /// placeholder message when no response was received.
    pub fn last_error(&self) -> Option<Value> {
        self.last_error
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn headers(&self) -> Vec<(String, String)> {
        vec![
            ("Accept".to_string(), "application/json".to_string()),
            ("Content-Type".to_string(), "application/json".to_string()),
            ("Authorization".to_string(), self.authorization.clone()),
        ]
    }

    pub fn build_get(&self, query: &Query) -> Result<HttpRequest, Error> {
        Ok(self.build_raw(&query.url(&self.api_host)?))
    }

    /// GET request for a fully formed URL.
    pub fn build_raw(&self, url: &str) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Get,
            url: url.to_string(),
            headers: self.headers(),
            body: None,
        }
    }

    /// Write request carrying the query's JSON body, if any.
    pub fn build_send(&self, method: HttpMethod, query: &Query) -> Result<HttpRequest, Error> {
        let url = query.url(&self.api_host)?;
        let body = query
            .body()
            .map(|body| serde_json::to_string(body).map_err(|e| Error::Serialization(e.to_string())))
            .transpose()?;
        Ok(HttpRequest {
            method,
            url,
            headers: self.headers(),
            body,
        })
    }

    pub fn parse_page(&self, response: HttpResponse) -> Result<Page, Error> {
        check_status(&response)?;
        serde_json::from_str(&response.body).map_err(|e| Error::Deserialization(e.to_string()))
    }

    /// Decode a successful JSON body; an empty body decodes to `Value::Null`.
    pub fn parse_json(&self, response: HttpResponse) -> Result<Value, Error> {
        check_status(&response)?;
        if response.body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&response.body).map_err(|e| Error::Deserialization(e.to_string()))
    }

    /// Fetch every row of the query, up to the default cap of 100000.
    pub fn get(&self, query: Query) -> Result<PagedResult, Error> {
        self.get_rows(query, DEFAULT_MAX_ROWS)
    }

    /// Fetch at most `max_rows` rows, following pages as needed. Fails
    /// without partial results if any page fails.
    pub fn get_rows(&self, query: Query, max_rows: usize) -> Result<PagedResult, Error> {
        self.clear_error();
        let result = self.paginate(query, max_rows);
        self.record(result)
    }

    /// The first matching record, if any.
    pub fn first(&self, query: Query) -> Result<Option<Value>, Error> {
        self.get_rows(query, 1).map(PagedResult::into_first)
    }

    fn paginate(&self, mut query: Query, max_rows: usize) -> Result<PagedResult, Error> {
        let mut results = PagedResult::new();
        if max_rows == 0 {
            query.url(&self.api_host)?;
            return Ok(results);
        }

        let mut window = PageWindow::start(&query, max_rows);
        loop {
            query = window.apply(query);
            let request = self.build_get(&query)?;
            debug!(url = %request.url, offset = window.offset, per_page = window.per_page, "fetching page");

            let page = self.parse_page(self.transport.execute(&request)?)?;
            let num_rows = page.data.len();
            debug!(rows = num_rows, included = page.included.len(), "received page");
            results.extend(page);

            if !window.advance(num_rows) {
                break;
            }
        }
        results.truncate(max_rows);
        Ok(results)
    }

    pub fn post(&self, query: Query) -> Result<Value, Error> {
        self.send(HttpMethod::Post, query)
    }

    pub fn put(&self, query: Query) -> Result<Value, Error> {
        self.send(HttpMethod::Put, query)
    }

    pub fn patch(&self, query: Query) -> Result<Value, Error> {
        self.send(HttpMethod::Patch, query)
    }

    fn send(&self, method: HttpMethod, query: Query) -> Result<Value, Error> {
        self.clear_error();
        let result = self.build_send(method, &query).and_then(|request| {
            debug!(method = method.as_str(), url = %request.url, "sending data");
            self.parse_json(self.transport.execute(&request)?)
        });
        self.record(result)
    }

    /// GET a fully formed URL and return the whole decoded body.
    pub fn raw(&self, url: &str) -> Result<Value, Error> {
        self.clear_error();
        let request = self.build_raw(url);
        debug!(url = %request.url, "raw request");
        let result = self
            .transport
            .execute(&request)
            .and_then(|response| self.parse_json(response));
        self.record(result)
    }

    /// GET a fully formed URL and return its `data` member.
    pub fn url(&self, url: &str) -> Result<Value, Error> {
        self.raw(url).map(|mut body| match body.get_mut("data") {
            Some(data) => data.take(),
            None => Value::Null,
        })
    }

    fn clear_error(&self) {
        *self
            .last_error
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = None;
    }

    fn record<R>(&self, result: Result<R, Error>) -> Result<R, Error> {
        if let Err(err) = &result {
            warn!(error = %err, "planning center request failed");
            *self
                .last_error
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(err.payload());
        }
        result
    }
}

/// Map non-success status codes to the appropriate `Error` variant.
fn check_status(response: &HttpResponse) -> Result<(), Error> {
    match response.status {
        200..=299 => Ok(()),
        status @ 400..=499 => Err(Error::Client {
            status,
            body: decode_body(&response.body),
        }),
        status @ 500..=599 => Err(Error::Server {
            status,
            body: decode_body(&response.body),
        }),
        status => Err(Error::Transport(format!("unexpected HTTP status {status}"))),
    }
}
