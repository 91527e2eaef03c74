//! Listing composer: filter map → typed predicates, whitelisted sort, offset paging.
//!
//! Every list endpoint receives the same loosely-typed request
//! (`page`, `pageSize`, `sortColumn`, `sortDirection`, `filters`). Each entity
//! turns it into a [`ListQuery`] by supplying:
//!
//! - a [`FilterSet`]: which filter keys it recognizes and how each value is parsed,
//! - a [`SortKey`]: the whitelist of sortable columns plus its creation-time column.
//!
//! The resulting query can be evaluated in memory (this module) or rendered to
//! SQL by the storage layer. Both renderings share the semantics documented here:
//!
//! - blank/whitespace-only filter values are treated as absent,
//! - recognized filters are AND-ed (no OR, no grouping),
//! - an unknown or absent sort column falls back to creation time, descending,
//! - the total counts every match, independent of the requested page,
//! - the page skips `(page - 1) * pageSize` matches and takes `pageSize`.
//!
//! Ties on the sort column keep store order; no secondary key is applied.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};

/// Raw filter criteria as received on the wire (filter key → value).
pub type FilterMap = HashMap<String, String>;

pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Upper bound on `pageSize`; larger requests are clamped.
pub const MAX_PAGE_SIZE: u32 = 100;

// ─────────────────────────────────────────────────────────────────────────────
// Request
// ─────────────────────────────────────────────────────────────────────────────

/// Listing request body shared by every entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListRequest {
    #[serde(default = "first_page")]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_column: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_direction: Option<String>,
    #[serde(default, deserialize_with = "lenient_filters")]
    pub filters: FilterMap,
}

fn first_page() -> u32 {
    1
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

/// Accept filter values of any JSON scalar type.
///
/// Strings are kept as-is, booleans and numbers are rendered to text and
/// `null` entries are dropped (same as an absent key).
fn lenient_filters<'de, D>(deserializer: D) -> Result<FilterMap, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<HashMap<String, serde_json::Value>> = Option::deserialize(deserializer)?;
    let mut filters = FilterMap::new();
    for (key, value) in raw.unwrap_or_default() {
        let text = match value {
            serde_json::Value::String(s) => s,
            serde_json::Value::Bool(b) => b.to_string(),
            serde_json::Value::Number(n) => n.to_string(),
            _ => continue,
        };
        filters.insert(key, text);
    }
    Ok(filters)
}

impl Default for ListRequest {
    fn default() -> Self {
        Self {
            page: first_page(),
            page_size: DEFAULT_PAGE_SIZE,
            sort_column: None,
            sort_direction: None,
            filters: FilterMap::new(),
        }
    }
}

impl ListRequest {
    pub fn new(page: u32, page_size: u32) -> Self {
        Self {
            page,
            page_size,
            ..Default::default()
        }
    }

    pub fn sorted_by(mut self, column: impl Into<String>, direction: impl Into<String>) -> Self {
        self.sort_column = Some(column.into());
        self.sort_direction = Some(direction.into());
        self
    }

    pub fn filter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.insert(key.into(), value.into());
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Filtering
// ─────────────────────────────────────────────────────────────────────────────

/// A per-entity set of recognized filters, parsed from the raw map.
///
/// Unrecognized keys are ignored. Parsing never fails: a value that cannot be
/// interpreted (e.g. `isActive: "maybe"`) simply applies no predicate.
pub trait FilterSet: Sized {
    fn from_map(filters: &FilterMap) -> Self;
}

/// In-memory predicate evaluation of a filter set against one record.
pub trait Predicate<T> {
    fn matches(&self, item: &T) -> bool;
}

/// Helpers for parsing filter values and evaluating text predicates.
pub mod filter {
    use super::FilterMap;

    /// Value for `key` as given, or `None` when absent or blank.
    pub fn text(filters: &FilterMap, key: &str) -> Option<String> {
        filters
            .get(key)
            .filter(|v| !v.trim().is_empty())
            .cloned()
    }

    /// Lowercased needle for case-insensitive prefix/substring predicates.
    pub fn needle(filters: &FilterMap, key: &str) -> Option<String> {
        text(filters, key).map(|v| v.to_lowercase())
    }

    /// Boolean flag; anything other than `true`/`false` (any case) is ignored.
    pub fn flag(filters: &FilterMap, key: &str) -> Option<bool> {
        let value = text(filters, key)?;
        let value = value.trim();
        if value.eq_ignore_ascii_case("true") {
            Some(true)
        } else if value.eq_ignore_ascii_case("false") {
            Some(false)
        } else {
            None
        }
    }

    /// Case-insensitive "field starts with needle". `needle` must be lowercased.
    pub fn starts_with(field: &str, needle: &str) -> bool {
        field.to_lowercase().starts_with(needle)
    }

    /// Case-insensitive "field contains needle". `needle` must be lowercased.
    pub fn contains(field: &str, needle: &str) -> bool {
        field.to_lowercase().contains(needle)
    }

    /// Optional predicate helper: `None` always matches.
    pub fn check<N: ?Sized>(needle: Option<&N>, test: impl FnOnce(&N) -> bool) -> bool {
        needle.is_none_or(test)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Sorting
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    /// Descending only when the value is exactly `desc` (case-insensitive).
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some(v) if v.trim().eq_ignore_ascii_case("desc") => SortDirection::Desc,
            _ => SortDirection::Asc,
        }
    }

    pub fn as_sql(self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }

    /// Orient an ascending comparison.
    pub fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    }
}

/// Whitelisted sortable columns of an entity.
pub trait SortKey: Copy + Eq + core::fmt::Debug + 'static {
    /// Public (wire) column names and the key each maps to.
    const COLUMNS: &'static [(&'static str, Self)];

    /// Creation timestamp column, used descending when no valid column is given.
    const CREATED_AT: Self;

    /// Case-insensitive whitelist lookup.
    fn lookup(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::COLUMNS
            .iter()
            .find(|(public, _)| public.eq_ignore_ascii_case(name))
            .map(|(_, key)| *key)
    }

    /// Public name of this column.
    fn public_name(self) -> &'static str {
        Self::COLUMNS
            .iter()
            .find(|(_, key)| *key == self)
            .map(|(public, _)| *public)
            .unwrap_or("createdAt")
    }
}

/// In-memory ordering of a record by one sort key (ascending).
///
/// Text columns compare case-insensitively through [`cmp_text`] and
/// [`cmp_opt_text`].
pub trait SortBy<K> {
    fn compare_by(&self, other: &Self, key: K) -> Ordering;
}

/// Case-insensitive text ordering.
pub fn cmp_text(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase())
}

/// [`cmp_text`] over optional columns; `None` sorts first.
pub fn cmp_opt_text(a: Option<&str>, b: Option<&str>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => cmp_text(a, b),
        _ => a.is_some().cmp(&b.is_some()),
    }
}

/// Resolved ordering: a whitelisted key and a direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sort<K> {
    pub key: K,
    pub direction: SortDirection,
}

impl<K: SortKey> Sort<K> {
    pub fn resolve(column: Option<&str>, direction: Option<&str>) -> Self {
        match column.and_then(K::lookup) {
            Some(key) => Self {
                key,
                direction: SortDirection::parse(direction),
            },
            None => Self::newest_first(),
        }
    }

    pub fn newest_first() -> Self {
        Self {
            key: K::CREATED_AT,
            direction: SortDirection::Desc,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Paging
// ─────────────────────────────────────────────────────────────────────────────

/// 1-based page number and a page size clamped to `1..=MAX_PAGE_SIZE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageSpec {
    page: u32,
    page_size: u32,
}

impl PageSpec {
    pub fn new(page: u32, page_size: u32) -> Self {
        Self {
            page: page.max(1),
            page_size: page_size.clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.page_size)
    }

    pub fn limit(&self) -> u64 {
        u64::from(self.page_size)
    }
}

impl Default for PageSpec {
    fn default() -> Self {
        Self::new(1, DEFAULT_PAGE_SIZE)
    }
}

/// One page of results plus the total number of matches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub total_items: u64,
    pub page: u32,
    pub page_size: u32,
    pub data: Vec<T>,
}

impl<T> Page<T> {
    pub fn new(spec: PageSpec, total_items: u64, data: Vec<T>) -> Self {
        Self {
            total_items,
            page: spec.page(),
            page_size: spec.page_size(),
            data,
        }
    }

    pub fn total_pages(&self) -> u64 {
        if self.page_size == 0 {
            return 0;
        }
        self.total_items.div_ceil(u64::from(self.page_size))
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            total_items: self.total_items,
            page: self.page,
            page_size: self.page_size,
            data: self.data.into_iter().map(f).collect(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Query
// ─────────────────────────────────────────────────────────────────────────────

/// A fully parsed listing query for one entity.
#[derive(Debug, Clone)]
pub struct ListQuery<F, K> {
    pub filter: F,
    pub sort: Sort<K>,
    pub page: PageSpec,
}

impl<F: FilterSet, K: SortKey> ListQuery<F, K> {
    pub fn from_request(request: &ListRequest) -> Self {
        Self {
            filter: F::from_map(&request.filters),
            sort: Sort::resolve(
                request.sort_column.as_deref(),
                request.sort_direction.as_deref(),
            ),
            page: PageSpec::new(request.page, request.page_size),
        }
    }
}

impl<F, K: Copy> ListQuery<F, K> {
    /// Number of records satisfying every active predicate.
    pub fn count<T>(&self, items: &[T]) -> u64
    where
        F: Predicate<T>,
    {
        items.iter().filter(|item| self.filter.matches(item)).count() as u64
    }

    /// Filter, sort (stable) and cut the requested page.
    pub fn select<T>(&self, items: &[T]) -> Vec<T>
    where
        F: Predicate<T>,
        T: Clone + SortBy<K>,
    {
        let mut matched: Vec<&T> = items.iter().filter(|item| self.filter.matches(item)).collect();

        let key = self.sort.key;
        let direction = self.sort.direction;
        matched.sort_by(|a, b| direction.apply(a.compare_by(b, key)));

        let offset = usize::try_from(self.page.offset()).unwrap_or(usize::MAX);
        let limit = usize::try_from(self.page.limit()).unwrap_or(usize::MAX);

        matched.into_iter().skip(offset).take(limit).cloned().collect()
    }

    /// Count + page in one call (in-memory only).
    pub fn run<T>(&self, items: &[T]) -> Page<T>
    where
        F: Predicate<T>,
        T: Clone + SortBy<K>,
    {
        Page::new(self.page, self.count(items), self.select(items))
    }
}
