//! Caller-side filtering and sorting of release snapshots.
//!
//! The store makes no ordering promise, so whoever shows a list of
//! releases applies a [`ReleaseFilter`] to the output of `fetch_all`.

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Category, Release};

/// Category restriction.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryFilter {
    #[default]
    All,
    Only(Category),
}

/// Date window over the release timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateFilter {
    #[default]
    All,
    /// Same UTC calendar day as `now`.
    Today,
    /// Same UTC calendar month as `now`.
    CurrentMonth,
    /// The UTC calendar month before `now`'s.
    LastMonth,
    /// Inclusive on both ends.
    Custom {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

impl DateFilter {
    /// Half-open `[start, end)` bounds, or `None` for no restriction.
    ///
    /// `Custom` is inclusive of `end`, expressed here as one nanosecond
    /// past it.
    pub fn bounds(&self, now: DateTime<Utc>) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        match *self {
            DateFilter::All => None,
            DateFilter::Today => {
                let start = day_start(now.date_naive());
                Some((start, start + Duration::days(1)))
            }
            DateFilter::CurrentMonth => {
                let (y, m) = (now.year(), now.month());
                Some((month_start(y, m), month_start_after(y, m)))
            }
            DateFilter::LastMonth => {
                let (y, m) = if now.month() == 1 {
                    (now.year() - 1, 12)
                } else {
                    (now.year(), now.month() - 1)
                };
                Some((month_start(y, m), month_start_after(y, m)))
            }
            DateFilter::Custom { start, end } => Some((start, end + Duration::nanoseconds(1))),
        }
    }

    fn matches(&self, ts: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        match self.bounds(now) {
            None => true,
            Some((start, end)) => ts >= start && ts < end,
        }
    }
}

fn day_start(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0).unwrap_or_default())
}

fn month_start(year: i32, month: u32) -> DateTime<Utc> {
    NaiveDate::from_ymd_opt(year, month, 1)
        .map(day_start)
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

fn month_start_after(year: i32, month: u32) -> DateTime<Utc> {
    if month == 12 {
        month_start(year + 1, 1)
    } else {
        month_start(year, month + 1)
    }
}

/// Timestamp sort order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    /// Newest first.
    #[default]
    Desc,
}

/// Combined filter applied to a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReleaseFilter {
    #[serde(default)]
    pub category: CategoryFilter,
    #[serde(default)]
    pub date: DateFilter,
    #[serde(default)]
    pub sort: SortOrder,
}

impl ReleaseFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn category(mut self, category: Category) -> Self {
        self.category = CategoryFilter::Only(category);
        self
    }

    pub fn date(mut self, date: DateFilter) -> Self {
        self.date = date;
        self
    }

    pub fn sort(mut self, sort: SortOrder) -> Self {
        self.sort = sort;
        self
    }

    /// Reset every criterion to its default.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Keep matching releases and sort them by timestamp.
    ///
    /// Ties keep their input order.
    pub fn apply(&self, releases: Vec<Release>, now: DateTime<Utc>) -> Vec<Release> {
        let mut out: Vec<Release> = releases
            .into_iter()
            .filter(|r| match &self.category {
                CategoryFilter::All => true,
                CategoryFilter::Only(c) => &r.category == c,
            })
            .filter(|r| self.date.matches(r.datetime, now))
            .collect();

        match self.sort {
            SortOrder::Asc => out.sort_by(|a, b| a.datetime.cmp(&b.datetime)),
            SortOrder::Desc => out.sort_by(|a, b| b.datetime.cmp(&a.datetime)),
        }
        out
    }
}
