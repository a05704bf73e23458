//! Page-number pagination shared by the public and admin listings.

use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;

use crate::error::DomainError;

/// Page size of the public post listings.
pub const POSTS_PER_PAGE: u64 = 5;

/// Page size of the admin listings.
pub const ADMIN_PER_PAGE: u64 = 100;

/// A requested page: a 1-based number or the last page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageNumber {
    Number(i64),
    Last,
}

impl Default for PageNumber {
    fn default() -> Self {
        Self::Number(1)
    }
}

impl PageNumber {
    /// Parse an optional `?page=` value. Missing or blank selects the first page.
    pub fn from_query(raw: Option<&str>) -> Result<Self, PaginationError> {
        match raw.map(str::trim) {
            None | Some("") => Ok(Self::default()),
            Some(value) => value.parse(),
        }
    }
}

impl FromStr for PageNumber {
    type Err = PaginationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "last" {
            return Ok(Self::Last);
        }
        s.parse::<i64>()
            .map(Self::Number)
            .map_err(|_| PaginationError::NotAnInteger)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PaginationError {
    #[error("That page number is not an integer")]
    NotAnInteger,

    #[error("That page number is less than 1")]
    LessThanOne,

    #[error("That page contains no results")]
    NoResults,
}

impl From<PaginationError> for DomainError {
    fn from(err: PaginationError) -> Self {
        DomainError::InvalidPage(err.to_string())
    }
}

/// The slice of rows a validated page covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub number: u64,
    pub offset: u64,
    pub limit: u64,
}

/// Splits `total_items` rows into pages of `per_page`.
///
/// An empty result set still has one (empty) first page.
#[derive(Debug, Clone, Copy)]
pub struct Paginator {
    pub total_items: u64,
    pub per_page: u64,
}

impl Paginator {
    pub fn new(total_items: u64, per_page: u64) -> Self {
        Self {
            total_items,
            per_page: per_page.max(1),
        }
    }

    pub fn num_pages(&self) -> u64 {
        if self.total_items == 0 {
            1
        } else {
            self.total_items.div_ceil(self.per_page)
        }
    }

    /// Resolve a requested page against the row count.
    pub fn window(&self, page: PageNumber) -> Result<PageWindow, PaginationError> {
        let number = match page {
            PageNumber::Last => self.num_pages(),
            PageNumber::Number(n) if n < 1 => return Err(PaginationError::LessThanOne),
            PageNumber::Number(n) => n as u64,
        };

        if number > self.num_pages() {
            return Err(PaginationError::NoResults);
        }

        Ok(PageWindow {
            number,
            offset: (number - 1) * self.per_page,
            limit: self.per_page,
        })
    }
}

/// One page of results plus navigation metadata.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub number: u64,
    pub per_page: u64,
    pub total_items: u64,
    pub total_pages: u64,
    pub has_next: bool,
    pub has_previous: bool,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, window: PageWindow, paginator: &Paginator) -> Self {
        let total_pages = paginator.num_pages();
        Self {
            items,
            number: window.number,
            per_page: paginator.per_page,
            total_items: paginator.total_items,
            total_pages,
            has_next: window.number < total_pages,
            has_previous: window.number > 1,
        }
    }
}
