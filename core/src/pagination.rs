//! Offset/per_page windowing and page accumulation.
//!
//! # Design
//! The API caps every response at 100 rows. `PageWindow` tracks the
//! `(offset, per_page)` pair for the next request and the row cap; after each
//! page `advance` either moves the window forward or reports that the fetch is
//! complete. A short page, or reaching the cap, ends the loop. Each full page
//! moves the offset forward by at least one row and `per_page` never exceeds
//! the remaining budget, so the loop always terminates.

use serde::Deserialize;
use serde_json::Value;

use crate::query::{Query, MAX_PER_PAGE};

/// Row cap applied when the caller does not give one.
pub const DEFAULT_MAX_ROWS: usize = 100_000;

/// The request window for one page of a paginated fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub offset: u64,
    pub per_page: u32,
    pub max_rows: usize,
}

impl PageWindow {
    /// Initial window for `query`: the query's own `offset` and `per_page`
    /// when set, otherwise 0 and 100. A cap of 100 or less becomes the page
    /// size so one request suffices.
    pub fn start(query: &Query, max_rows: usize) -> Self {
        let mut per_page = query
            .per_page_value()
            .unwrap_or(MAX_PER_PAGE)
            .min(MAX_PER_PAGE);
        let offset = query.offset_value().unwrap_or(0);

        if max_rows > 0 && max_rows <= MAX_PER_PAGE as usize {
            per_page = max_rows as u32;
        }

        Self {
            offset,
            per_page,
            max_rows,
        }
    }

    /// Write this window into the query's `offset` and `per_page` parameters.
    pub fn apply(&self, query: Query) -> Query {
        query.per_page(self.per_page).offset(self.offset)
    }

    /// Move past a page of `num_rows` rows. Returns `false` when no further
    /// page should be requested; the offset is then 0. An offset that would
    /// overflow also ends the walk.
    pub fn advance(&mut self, num_rows: usize) -> bool {
        let full = num_rows == self.per_page as usize;
        let max_rows = self.max_rows as u64;

        match self.offset.checked_add(num_rows as u64) {
            Some(fetched) if full && fetched < max_rows => {
                self.offset = fetched;
                let remaining = max_rows - fetched;
                self.per_page = remaining.min(u64::from(self.per_page)) as u32;
            }
            _ => self.offset = 0,
        }
        self.offset > 0
    }
}

/// One decoded response page.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Page {
    #[serde(default)]
    pub data: Vec<Value>,
    #[serde(default)]
    pub included: Vec<Value>,
}

/// Records accumulated across pages, in page order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PagedResult {
    pub data: Vec<Value>,
    pub included: Vec<Value>,
}

impl PagedResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extend(&mut self, page: Page) {
        self.data.extend(page.data);
        self.included.extend(page.included);
    }

    /// Drop records past `max_rows`. Included resources are left as they are.
    pub fn truncate(&mut self, max_rows: usize) {
        self.data.truncate(max_rows);
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn into_first(self) -> Option<Value> {
        self.data.into_iter().next()
    }
}
