//! Synchronous client for the Planning Center REST API.
//!
//! # Overview
//! A `Query` selects a module, a table, up to two levels of nested
//! association and the query parameters; `PlanningCenter` turns it into one
//! URL per request, authenticates with HTTP Basic auth, and follows the
//! API's offset/per_page pagination until every row (or a row cap) has been
//! fetched. Responses are passed through as `serde_json::Value`.
//!
//! # Design
//! - `Query` is a plain value consumed by exactly one terminal operation.
//! - `PlanningCenter` splits every operation into `build_*` (produces an
//!   `HttpRequest`) and `parse_*` (consumes an `HttpResponse`); a `Transport`
//!   performs the round-trip. `UreqTransport` is the default.
//! - Every operation returns `Result<_, Error>`; the last failure's payload
//!   is also kept for `PlanningCenter::last_error`.
//!
//! ```no_run
//! use pco_core::{Module, Operator, PlanningCenter};
//!
//! let pco = PlanningCenter::from_env()?;
//! let people = pco.get(
//!     pco.query(Module::People)
//!         .table("people")
//!         .filter("last_name", Operator::Eq, "Smith")
//!         .include("emails"),
//! )?;
//! println!("{} people", people.len());
//! # Ok::<(), pco_core::Error>(())
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod module;
pub mod pagination;
pub mod query;
pub mod transport;

pub use client::PlanningCenter;
pub use config::Config;
pub use error::Error;
pub use http::{HttpMethod, HttpRequest, HttpResponse, Transport};
pub use module::Module;
pub use pagination::{Page, PageWindow, PagedResult};
pub use query::{Operator, Parameters, Query};
pub use transport::UreqTransport;
