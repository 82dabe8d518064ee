//! Paginated listing.
//!
//! # Invariants
//! - `skip = page * items_per_page`; a window starting past `count` is an
//!   `InvalidArgument` carrying the requested page and `maxPage`.
//! - `number_of_items` is the filter count, independent of the page.
//! - `results.len() <= items_per_page`.

use crate::error::{EntityError, EntityResult};
use serde::Serialize;
use serde_json::json;

/// One page of a filtered listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryPage<T> {
    pub results: Vec<T>,
    /// Total matches for the filter, not the page size.
    pub number_of_items: u64,
    pub page: u64,
    pub items_per_page: u64,
}

impl<T> QueryPage<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> QueryPage<U> {
        QueryPage {
            results: self.results.into_iter().map(f).collect(),
            number_of_items: self.number_of_items,
            page: self.page,
            items_per_page: self.items_per_page,
        }
    }

    pub fn try_map<U, E>(self, f: impl FnMut(T) -> Result<U, E>) -> Result<QueryPage<U>, E> {
        Ok(QueryPage {
            results: self.results.into_iter().map(f).collect::<Result<_, _>>()?,
            number_of_items: self.number_of_items,
            page: self.page,
            items_per_page: self.items_per_page,
        })
    }
}

/// `(skip, limit)` slice of a filtered result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub skip: u64,
    pub limit: u64,
}

/// Highest page index that still starts inside `count` items.
pub fn max_page(count: u64, items_per_page: u64) -> u64 {
    if items_per_page == 0 {
        return 0;
    }
    count / items_per_page
}

/// Computes the fetch window for `page` of a result set of `count` items.
pub fn page_window(
    subject: &str,
    count: u64,
    page: u64,
    items_per_page: u64,
) -> EntityResult<PageWindow> {
    if count == 0 {
        return Err(EntityError::data_not_found(subject, json!({ "page": page })));
    }
    if items_per_page == 0 {
        return Err(EntityError::invalid_argument(
            subject,
            json!({ "itemsPerPage": items_per_page }),
        ));
    }

    let skip = page.checked_mul(items_per_page);
    match skip {
        Some(skip) if skip <= count => Ok(PageWindow {
            skip,
            limit: items_per_page,
        }),
        _ => Err(EntityError::invalid_argument(
            subject,
            json!({ "page": page, "maxPage": max_page(count, items_per_page) }),
        )),
    }
}
