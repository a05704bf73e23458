//! List queries: author filters, search terms and posting-date ranges.

use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, NaiveTime, Utc};
use serde::Deserialize;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::{Comment, Post};
use crate::error::DomainError;

/// Ordering by `date_posted`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    NewestFirst,
    OldestFirst,
}

/// Half-open `[from, until)` range of instants. Missing bounds are open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub from: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

impl DateRange {
    pub fn between(from: DateTime<Utc>, until: DateTime<Utc>) -> Self {
        Self {
            from: Some(from),
            until: Some(until),
        }
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.from.is_none_or(|from| instant >= from) && self.until.is_none_or(|until| instant < until)
    }

    /// Narrow to the overlap of both ranges.
    pub fn intersect(self, other: DateRange) -> DateRange {
        let from = match (self.from, other.from) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
        let until = match (self.until, other.until) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        DateRange { from, until }
    }
}

fn midnight(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// Predefined posting-date filter of the admin listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateFilter {
    #[default]
    Any,
    Today,
    #[serde(rename = "past_7_days")]
    Past7Days,
    ThisMonth,
    ThisYear,
}

impl DateFilter {
    pub fn range(self, now: DateTime<Utc>) -> DateRange {
        let today = now.date_naive();
        let tomorrow = today + Duration::days(1);

        match self {
            DateFilter::Any => DateRange::default(),
            DateFilter::Today => DateRange::between(midnight(today), midnight(tomorrow)),
            DateFilter::Past7Days => {
                DateRange::between(midnight(today - Duration::days(7)), midnight(tomorrow))
            }
            DateFilter::ThisMonth => {
                let first = today - Duration::days(i64::from(today.day0()));
                DateRange::between(midnight(first), midnight(first + Months::new(1)))
            }
            DateFilter::ThisYear => {
                let first = today - Duration::days(i64::from(today.ordinal0()));
                DateRange::between(midnight(first), midnight(first + Months::new(12)))
            }
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("A month drill-down requires a year")]
    MonthWithoutYear,

    #[error("A day drill-down requires a month")]
    DayWithoutMonth,

    #[error("Invalid date: {0}")]
    InvalidDate(String),
}

impl From<QueryError> for DomainError {
    fn from(err: QueryError) -> Self {
        DomainError::Validation(err.to_string())
    }
}

/// Year / month / day drill-down over `date_posted`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateHierarchy {
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub day: Option<u32>,
}

impl DateHierarchy {
    pub fn range(&self) -> Result<DateRange, QueryError> {
        let invalid = || {
            QueryError::InvalidDate(format!(
                "{}-{}-{}",
                self.year.unwrap_or_default(),
                self.month.unwrap_or(1),
                self.day.unwrap_or(1)
            ))
        };

        let (first, next) = match (self.year, self.month, self.day) {
            (None, None, None) => return Ok(DateRange::default()),
            (None, Some(_), _) => return Err(QueryError::MonthWithoutYear),
            (_, None, Some(_)) => return Err(QueryError::DayWithoutMonth),
            (Some(year), None, None) => {
                let first = NaiveDate::from_ymd_opt(year, 1, 1).ok_or_else(invalid)?;
                (first, first.checked_add_months(Months::new(12)))
            }
            (Some(year), Some(month), None) => {
                let first = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(invalid)?;
                (first, first.checked_add_months(Months::new(1)))
            }
            (Some(year), Some(month), Some(day)) => {
                let date = NaiveDate::from_ymd_opt(year, month, day).ok_or_else(invalid)?;
                (date, date.succ_opt())
            }
        };

        // The last representable period has no exclusive upper bound.
        let next = next.ok_or_else(invalid)?;
        Ok(DateRange::between(midnight(first), midnight(next)))
    }
}

/// Split an admin search box value into terms.
///
/// Terms are separated by whitespace; a double-quoted phrase is one term.
pub fn split_search_terms(q: &str) -> Vec<String> {
    let mut terms = Vec::new();
    let mut current = String::new();
    let mut quoted = false;

    for ch in q.chars() {
        match ch {
            '"' => {
                quoted = !quoted;
                if !quoted && !current.is_empty() {
                    terms.push(std::mem::take(&mut current));
                }
            }
            c if c.is_whitespace() && !quoted => {
                if !current.is_empty() {
                    terms.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        terms.push(current);
    }

    terms
}

/// Every term must occur, case-insensitively, in at least one field.
pub fn matches_terms(terms: &[String], fields: &[&str]) -> bool {
    let fields: Vec<String> = fields.iter().map(|f| f.to_lowercase()).collect();
    terms.iter().all(|term| {
        let term = term.to_lowercase();
        fields.iter().any(|field| field.contains(&term))
    })
}

/// Post listing query. The default lists every post, newest first.
#[derive(Debug, Clone, Default)]
pub struct PostQuery {
    pub author_id: Option<Uuid>,
    /// Matched against title and content.
    pub search: Vec<String>,
    pub posted: DateRange,
    pub order: SortOrder,
}

impl PostQuery {
    pub fn by_author(author_id: Uuid) -> Self {
        Self {
            author_id: Some(author_id),
            ..Self::default()
        }
    }

    pub fn matches(&self, post: &Post) -> bool {
        self.author_id.is_none_or(|id| post.author_id == Some(id))
            && self.posted.contains(post.date_posted)
            && matches_terms(&self.search, &[&post.title, &post.content])
    }
}

/// Comment listing query. The default lists every comment, newest first.
#[derive(Debug, Clone, Default)]
pub struct CommentQuery {
    pub post_id: Option<Uuid>,
    pub author_id: Option<Uuid>,
    /// Matched against the parent post's title and the comment content.
    pub search: Vec<String>,
    pub posted: DateRange,
    pub order: SortOrder,
}

impl CommentQuery {
    /// Comments of one post in the order they were written.
    pub fn for_post(post_id: Uuid) -> Self {
        Self {
            post_id: Some(post_id),
            order: SortOrder::OldestFirst,
            ..Self::default()
        }
    }

    pub fn matches(&self, comment: &Comment, post_title: &str) -> bool {
        self.post_id.is_none_or(|id| comment.post_id == id)
            && self.author_id.is_none_or(|id| comment.author_id == Some(id))
            && self.posted.contains(comment.date_posted)
            && matches_terms(&self.search, &[post_title, &comment.content])
    }
}
