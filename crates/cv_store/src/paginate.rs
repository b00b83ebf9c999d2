//! Generic page/search helper over any table whose rows implement [`Paginated`].
//!
//! Nothing in here knows about credentials: callers supply a base equality
//! [`Filter`], an optional search term and the columns to search, and get back
//! one page of rows plus [`PageInfo`].

use std::num::IntErrorKind;

use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqliteRow, FromRow, QueryBuilder, Sqlite, SqlitePool};

use crate::error::{StoreError, StoreResult};

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_LIMIT: u32 = 10;

/// A row type that can be listed page by page.
pub trait Paginated: for<'r> FromRow<'r, SqliteRow> + Send + Unpin {
    const TABLE: &'static str;
    /// Column list for the `SELECT`.
    const COLUMNS: &'static str;
    /// Stable ordering; must be total so pages never overlap.
    const ORDER_BY: &'static str;
    /// Columns a caller may search, each paired with the column holding its
    /// lower-cased copy.  Anything else is rejected.
    const SEARCHABLE: &'static [(&'static str, &'static str)];
}

/// Requested page, 1-based.  Both fields are always ≥ 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl PageRequest {
    pub fn new(page: u32, limit: u32) -> Self {
        Self {
            page: page.max(1),
            limit: limit.max(1),
        }
    }

    /// Parse raw query-string values.  Missing or non-numeric values fall back
    /// to the defaults; zero and negative values clamp to 1, oversized ones to
    /// `u32::MAX`.
    pub fn parse(page: Option<&str>, limit: Option<&str>) -> Self {
        Self::new(
            parse_positive(page, DEFAULT_PAGE),
            parse_positive(limit, DEFAULT_LIMIT),
        )
    }

    /// Rows to skip.  Saturates, so an unreachable page reads as empty.
    fn offset(&self) -> i64 {
        (i64::from(self.page) - 1)
            .checked_mul(i64::from(self.limit))
            .unwrap_or(i64::MAX)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE, DEFAULT_LIMIT)
    }
}

fn parse_positive(raw: Option<&str>, default: u32) -> u32 {
    let Some(raw) = raw else {
        return default;
    };
    match raw.trim().parse::<i64>() {
        Ok(n) => n.clamp(1, i64::from(u32::MAX)) as u32,
        Err(e) => match e.kind() {
            IntErrorKind::PosOverflow => u32::MAX,
            IntErrorKind::NegOverflow => 1,
            _ => default,
        },
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub page: u32,
    pub limit: u32,
    pub total_count: u64,
    pub total_pages: u64,
}

impl PageInfo {
    fn new(req: PageRequest, total_count: u64) -> Self {
        let limit = u64::from(req.limit);
        Self {
            page: req.page,
            limit: req.limit,
            total_count,
            total_pages: total_count.div_ceil(limit),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub records: Vec<T>,
    pub page_info: PageInfo,
}

impl<T> Page<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            records: self.records.into_iter().map(f).collect(),
            page_info: self.page_info,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Conjunction of `column = value` clauses.  Column names are static so they
/// can never come from user input.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    clauses: Vec<(&'static str, String)>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, column: &'static str, value: impl Into<String>) -> Self {
        self.clauses.push((column, value.into()));
        self
    }

    pub fn eq_opt(self, column: &'static str, value: Option<&str>) -> Self {
        match value {
            Some(v) => self.eq(column, v),
            None => self,
        }
    }

    pub(crate) fn push_where(&self, qb: &mut QueryBuilder<'_, Sqlite>) {
        qb.push(" WHERE 1 = 1");
        for (column, value) in &self.clauses {
            qb.push(" AND ")
                .push(*column)
                .push(" = ")
                .push_bind(value.clone());
        }
    }
}

/// Fold a value the same way the searchable shadow columns are folded.
pub fn fold(value: &str) -> String {
    value.to_lowercase()
}

/// Case-insensitive substring match against the folded columns, OR across
/// them.  `term` must already be folded.
fn push_search(qb: &mut QueryBuilder<'_, Sqlite>, term: &str, folded: &[&'static str]) {
    if folded.is_empty() {
        return;
    }
    qb.push(" AND (");
    for (i, column) in folded.iter().enumerate() {
        if i > 0 {
            qb.push(" OR ");
        }
        qb.push("instr(")
            .push(*column)
            .push(", ")
            .push_bind(term.to_owned())
            .push(") > 0");
    }
    qb.push(")");
}

/// Fetch one page of `T` matching `base` and, when given, `search` within
/// `fields`.  An absent or empty search term matches every row in `base`.
pub async fn paginate<T: Paginated>(
    pool: &SqlitePool,
    base: &Filter,
    search: Option<&str>,
    fields: &[&'static str],
    req: PageRequest,
) -> StoreResult<Page<T>> {
    let mut folded = Vec::with_capacity(fields.len());
    for field in fields {
        let column = T::SEARCHABLE
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, column)| *column)
            .ok_or_else(|| StoreError::UnknownField((*field).to_string()))?;
        folded.push(column);
    }
    let term = search.filter(|t| !t.is_empty()).map(fold);

    // Count and page share one read transaction so they see the same snapshot.
    let mut tx = pool.begin().await?;

    let mut count = QueryBuilder::<Sqlite>::new(format!("SELECT COUNT(*) FROM {}", T::TABLE));
    base.push_where(&mut count);
    if let Some(term) = &term {
        push_search(&mut count, term, &folded);
    }
    let total: i64 = count.build_query_scalar().fetch_one(&mut *tx).await?;

    let mut select =
        QueryBuilder::<Sqlite>::new(format!("SELECT {} FROM {}", T::COLUMNS, T::TABLE));
    base.push_where(&mut select);
    if let Some(term) = &term {
        push_search(&mut select, term, &folded);
    }
    select
        .push(" ORDER BY ")
        .push(T::ORDER_BY)
        .push(" LIMIT ")
        .push_bind(i64::from(req.limit))
        .push(" OFFSET ")
        .push_bind(req.offset());
    let records = select.build_query_as::<T>().fetch_all(&mut *tx).await?;

    tx.commit().await?;

    Ok(Page {
        records,
        page_info: PageInfo::new(req, total.max(0) as u64),
    })
}
