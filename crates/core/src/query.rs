//! Paged listing engine shared by the ticket and user services
//!
//! Listing runs in fixed stages over the full record sequence handed out
//! by a store: filter, sort, count, then page. The count is taken before
//! the page window is applied.

use std::cmp::Ordering;

use chrono::{DateTime, Days, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{User, WorkTicket};

/// A window over a filtered, sorted collection plus the unwindowed total
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PagedResult<T> {
    pub items: Vec<T>,
    pub total_count: usize,
}

impl<T> PagedResult<T> {
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            total_count: 0,
        }
    }

    /// Number of pages of `page_size` needed to cover `total_count`
    pub fn page_count(&self, page_size: u32) -> usize {
        if page_size == 0 {
            return 0;
        }
        self.total_count.div_ceil(page_size as usize)
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PagedResult<U> {
        PagedResult {
            items: self.items.into_iter().map(f).collect(),
            total_count: self.total_count,
        }
    }
}

/// Paging, search and sort parameters common to every listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    /// 1-based page number; 0 is treated as 1
    pub page: u32,
    pub page_size: u32,
    pub search_term: Option<String>,
    pub sort_by: Option<String>,
    pub sort_ascending: bool,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: 10,
            search_term: None,
            sort_by: None,
            sort_ascending: true,
        }
    }
}

impl PageRequest {
    pub fn new(page: u32, page_size: u32) -> Self {
        Self {
            page,
            page_size,
            ..Default::default()
        }
    }

    pub fn with_search(mut self, term: impl Into<String>) -> Self {
        self.search_term = Some(term.into());
        self
    }

    pub fn with_sort(mut self, sort_by: impl Into<String>, ascending: bool) -> Self {
        self.sort_by = Some(sort_by.into());
        self.sort_ascending = ascending;
        self
    }

    /// Trimmed, lower-cased search term, or `None` when blank
    pub fn search_needle(&self) -> Option<String> {
        self.search_term
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_lowercase)
    }
}

/// Ticket listing parameters: paging plus the date-range filters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketQuery {
    pub page: PageRequest,
    /// Inclusive lower bound on `start_date_time`
    pub start_date: Option<DateTime<Utc>>,
    /// Whole calendar day upper bound on `start_date_time`
    pub end_date: Option<DateTime<Utc>>,
    /// Inclusive lower bound on `updated_at`
    pub updated_start: Option<DateTime<Utc>>,
    /// Whole calendar day upper bound on `updated_at`
    pub updated_end: Option<DateTime<Utc>>,
}

impl TicketQuery {
    pub fn new(page: PageRequest) -> Self {
        Self {
            page,
            ..Default::default()
        }
    }

    pub fn starting_from(mut self, start: DateTime<Utc>) -> Self {
        self.start_date = Some(start);
        self
    }

    pub fn ending_on(mut self, end: DateTime<Utc>) -> Self {
        self.end_date = Some(end);
        self
    }

    pub fn updated_between(
        mut self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Self {
        self.updated_start = start;
        self.updated_end = end;
        self
    }
}

/// Case-insensitive substring match; `needle` must already be lower-case
pub fn contains_ignore_case(haystack: Option<&str>, needle: &str) -> bool {
    haystack.is_some_and(|h| h.to_lowercase().contains(needle))
}

/// Exclusive upper bound covering the whole calendar day of `end`,
/// whatever its time component
pub fn end_of_day_exclusive(end: DateTime<Utc>) -> DateTime<Utc> {
    let day = end.date_naive();
    let next = day.checked_add_days(Days::new(1)).unwrap_or(day);
    next.and_hms_opt(0, 0, 0)
        .map(|midnight| midnight.and_utc())
        .unwrap_or(end)
}

/// Apply an inclusive start bound and a whole-day end bound to a value
pub fn within_day_range(
    value: DateTime<Utc>,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> bool {
    if let Some(start) = start {
        if value < start {
            return false;
        }
    }
    if let Some(end) = end {
        if value >= end_of_day_exclusive(end) {
            return false;
        }
    }
    true
}

/// Count the filtered set, then cut the requested page out of it
pub fn paginate<T>(items: Vec<T>, page: u32, page_size: u32) -> PagedResult<T> {
    let total_count = items.len();
    let page = page.max(1) as usize;
    let page_size = page_size as usize;
    let skip = (page - 1).saturating_mul(page_size);

    let items = items.into_iter().skip(skip).take(page_size).collect();

    PagedResult { items, total_count }
}

/// Stable sort in either direction; equal keys keep storage order
pub fn stable_sort_by<T>(
    items: &mut [T],
    ascending: bool,
    mut cmp: impl FnMut(&T, &T) -> Ordering,
) {
    if ascending {
        items.sort_by(|a, b| cmp(a, b));
    } else {
        items.sort_by(|a, b| cmp(b, a));
    }
}

/// Normalise a sort key name so `ticketNumber`, `TicketNumber` and
/// `ticket_number` all compare equal
fn key_name(s: &str) -> String {
    s.trim()
        .chars()
        .filter(|c| *c != '_' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

/// Allowed ticket sort keys
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TicketSortKey {
    TicketNumber,
    CostCentre,
    Activity,
    OperatorName,
    CreatedAt,
}

impl TicketSortKey {
    /// Parse a caller-supplied key; `None` for absent or unknown keys
    pub fn parse(s: Option<&str>) -> Option<Self> {
        match key_name(s?).as_str() {
            "ticketnumber" => Some(TicketSortKey::TicketNumber),
            "costcentre" => Some(TicketSortKey::CostCentre),
            "activity" => Some(TicketSortKey::Activity),
            "operatorname" => Some(TicketSortKey::OperatorName),
            "createdat" => Some(TicketSortKey::CreatedAt),
            _ => None,
        }
    }

    pub fn compare(&self, a: &WorkTicket, b: &WorkTicket) -> Ordering {
        match self {
            TicketSortKey::TicketNumber => a.ticket_number.cmp(&b.ticket_number),
            TicketSortKey::CostCentre => a.cost_centre.cmp(&b.cost_centre),
            TicketSortKey::Activity => a.activity.cmp(&b.activity),
            TicketSortKey::OperatorName => a.operator_name.cmp(&b.operator_name),
            TicketSortKey::CreatedAt => a.created_at.cmp(&b.created_at),
        }
    }
}

/// Allowed user sort keys
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserSortKey {
    Username,
    Role,
}

impl UserSortKey {
    pub fn parse(s: Option<&str>) -> Option<Self> {
        match key_name(s?).as_str() {
            "username" => Some(UserSortKey::Username),
            "role" => Some(UserSortKey::Role),
            _ => None,
        }
    }

    pub fn compare(&self, a: &User, b: &User) -> Ordering {
        match self {
            UserSortKey::Username => a.username.cmp(&b.username),
            UserSortKey::Role => a.role.as_str().cmp(b.role.as_str()),
        }
    }
}
