//! Query description and URL construction.
//!
//! # Design
//! A `Query` is a value assembled with chained setters and consumed by one
//! terminal operation on `PlanningCenter`. Nothing is shared between queries,
//! so there is no state to reset after execution.
//!
//! URLs follow `{base}/{table}[/{id}[/{association}[/{id2}[/{association2}]]]][?{query}]`.
//! Path segments and parameter values are percent-encoded; the bracket syntax
//! of `where[field][op]=` stays literal, as do `,`, `@` and `:` in values.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use serde_json::Value;

use crate::error::Error;
use crate::module::Module;

/// The API never returns more rows than this in one response.
pub const MAX_PER_PAGE: u32 = 100;

/// Comparison operator of a `where` filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl Operator {
    /// Query-string text between `where[field]` and the value.
    pub fn suffix(self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Gt => "[gt]=",
            Operator::Gte => "[gte]=",
            Operator::Lt => "[lt]=",
            Operator::Lte => "[lte]=",
        }
    }
}

impl FromStr for Operator {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "=" => Ok(Operator::Eq),
            ">" => Ok(Operator::Gt),
            ">=" => Ok(Operator::Gte),
            "<" => Ok(Operator::Lt),
            "<=" => Ok(Operator::Lte),
            other => Err(Error::UnknownOperator(other.to_string())),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Operator::Eq => "=",
            Operator::Gt => ">",
            Operator::Gte => ">=",
            Operator::Lt => "<",
            Operator::Lte => "<=",
        };
        f.write_str(symbol)
    }
}

/// Build a `where[field]<op>value` fragment.
pub fn where_fragment(field: &str, operator: Operator, value: &str) -> String {
    format!(
        "where[{}]{}{}",
        encode_value(field),
        operator.suffix(),
        encode_value(value)
    )
}

fn encode_segment(segment: &str) -> String {
    urlencoding::encode(segment).into_owned()
}

fn encode_key(key: &str) -> String {
    urlencoding::encode(key)
        .replace("%5B", "[")
        .replace("%5D", "]")
}

fn encode_value(value: &str) -> String {
    urlencoding::encode(value)
        .replace("%2C", ",")
        .replace("%40", "@")
        .replace("%3A", ":")
}

/// Query-string parameters in first-insertion order.
///
/// Setting an existing key replaces its value without moving it. The `where`
/// key holds a pre-built fragment and is emitted verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Parameters {
    entries: Vec<(String, String)>,
}

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Serialize as `k=v` pairs joined with `&`, without the leading `?`.
    pub fn to_query_string(&self) -> String {
        self.entries
            .iter()
            .map(|(key, value)| {
                if key == "where" {
                    value.clone()
                } else {
                    format!("{}={}", encode_key(key), encode_value(value))
                }
            })
            .collect::<Vec<_>>()
            .join("&")
    }
}

/// One logical request against the API: endpoint selection, query
/// parameters and an optional JSON body.
///
/// # Example
///
/// ```
/// use pco_core::{Module, Operator, Query};
///
/// let query = Query::new(Module::People)
///     .table("people")
///     .filter("email", Operator::Eq, "x@y.com")
///     .per_page(25);
/// let url = query.url("https://api.planningcenteronline.com").unwrap();
/// assert_eq!(
///     url,
///     "https://api.planningcenteronline.com/people/v2/people?where[email]=x@y.com&per_page=25"
/// );
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    module: Module,
    table: Option<String>,
    id: Option<String>,
    association: Option<String>,
    id2: Option<String>,
    association2: Option<String>,
    parameters: Parameters,
    body: Option<Value>,
}

impl Query {
    pub fn new(module: Module) -> Self {
        Self {
            module,
            table: None,
            id: None,
            association: None,
            id2: None,
            association2: None,
            parameters: Parameters::new(),
            body: None,
        }
    }

    /// Switch to another module, keeping everything else.
    pub fn module(mut self, module: Module) -> Self {
        self.module = module;
        self
    }

    /// Resource collection within the module, e.g. `people` or `plans`.
    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    pub fn id(mut self, id: impl ToString) -> Self {
        self.id = Some(id.to_string());
        self
    }

    /// Relationship traversed from the primary resource, e.g. `emails`.
    pub fn association(mut self, association: impl Into<String>) -> Self {
        self.association = Some(association.into());
        self
    }

    pub fn id2(mut self, id: impl ToString) -> Self {
        self.id2 = Some(id.to_string());
        self
    }

    pub fn association2(mut self, association: impl Into<String>) -> Self {
        self.association2 = Some(association.into());
        self
    }

    /// Side-load related records; `include` takes a comma-joined list as is.
    pub fn include(mut self, include: impl Into<String>) -> Self {
        self.parameters.set("include", include);
        self
    }

    pub fn includes<I, S>(self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let joined = names
            .into_iter()
            .map(|name| name.as_ref().to_string())
            .collect::<Vec<_>>()
            .join(",");
        self.include(joined)
    }

    /// Set the `where` filter. A later call replaces an earlier one.
    pub fn filter(mut self, field: &str, operator: Operator, value: impl ToString) -> Self {
        let fragment = where_fragment(field, operator, &value.to_string());
        self.parameters.set("where", fragment);
        self
    }

    /// Like `filter`, with the operator given as `=`, `>`, `>=`, `<` or `<=`.
    pub fn filter_op(self, field: &str, operator: &str, value: impl ToString) -> Result<Self, Error> {
        let operator: Operator = operator.parse()?;
        Ok(self.filter(field, operator, value))
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.parameters.set("offset", offset.to_string());
        self
    }

    /// Rows per page, clamped to `1..=100`.
    pub fn per_page(mut self, rows: u32) -> Self {
        self.parameters
            .set("per_page", rows.clamp(1, MAX_PER_PAGE).to_string());
        self
    }

    pub fn order(mut self, order: impl Into<String>) -> Self {
        self.parameters.set("order", order);
        self
    }

    /// JSON payload for `post`, `put` and `patch`.
    pub fn data(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn json<T: Serialize>(self, body: &T) -> Result<Self, Error> {
        let value = serde_json::to_value(body).map_err(|e| Error::Serialization(e.to_string()))?;
        Ok(self.data(value))
    }

    /// Merge arbitrary parameters. `offset` and `per_page` go through their
    /// typed setters; non-numeric values for them are dropped.
    pub fn parameters<I, K, V>(mut self, parameters: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: ToString,
    {
        for (key, value) in parameters {
            let key = key.into();
            let value = value.to_string();
            match key.as_str() {
                "offset" => match value.trim().parse::<u64>() {
                    Ok(offset) => self = self.offset(offset),
                    Err(_) => tracing::warn!(%value, "ignoring non-numeric offset parameter"),
                },
                "per_page" => match value.trim().parse::<u64>() {
                    Ok(rows) => self = self.per_page(rows.min(u64::from(MAX_PER_PAGE)) as u32),
                    Err(_) => tracing::warn!(%value, "ignoring non-numeric per_page parameter"),
                },
                _ => self.parameters.set(key, value),
            }
        }
        self
    }

    pub fn selected_module(&self) -> Module {
        self.module
    }

    pub fn selected_table(&self) -> Option<&str> {
        self.table.as_deref()
    }

    pub fn query_parameters(&self) -> &Parameters {
        &self.parameters
    }

    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    pub fn offset_value(&self) -> Option<u64> {
        self.parameters.get("offset").and_then(|v| v.parse().ok())
    }

    pub fn per_page_value(&self) -> Option<u32> {
        self.parameters.get("per_page").and_then(|v| v.parse().ok())
    }

    /// Full request URL on `host`.
    pub fn url(&self, host: &str) -> Result<String, Error> {
        let table = self
            .table
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or(Error::TableNotSet)?;

        let mut url = self.module.base_url(host);
        url.push_str(&encode_segment(table));

        let segments = [&self.id, &self.association, &self.id2, &self.association2];
        for segment in segments.into_iter().flatten().filter(|s| !s.is_empty()) {
            url.push('/');
            url.push_str(&encode_segment(segment));
        }

        if !self.parameters.is_empty() {
            url.push('?');
            url.push_str(&self.parameters.to_query_string());
        }
        Ok(url)
    }
}
