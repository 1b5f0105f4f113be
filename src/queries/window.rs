//! Date windows for the statistics views and day-bounded date filters.
//!
//! `today` covers the whole local calendar day. `Nd` windows roll: they
//! start at local midnight N-1 days ago and end at the current instant.
//! `all` has no bounds and produces no predicate.

use std::fmt;

use chrono::{
    DateTime, Days, Duration, FixedOffset, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone,
    Utc,
};
use chrono_tz::Tz;
use serde::Serialize;

use crate::error::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RangeToken {
    #[serde(rename = "today")]
    Today,
    #[serde(rename = "7d")]
    Last7Days,
    #[serde(rename = "30d")]
    Last30Days,
    #[serde(rename = "90d")]
    Last90Days,
    #[serde(rename = "all")]
    All,
}

/// Ranges offered on the dashboard cards.
pub const DASHBOARD_RANGES: &[RangeToken] = &[
    RangeToken::Today,
    RangeToken::Last7Days,
    RangeToken::Last30Days,
];

/// Ranges offered on the analytics page.
pub const ANALYTICS_RANGES: &[RangeToken] = &[
    RangeToken::Last7Days,
    RangeToken::Last30Days,
    RangeToken::Last90Days,
    RangeToken::All,
];

impl RangeToken {
    pub fn parse(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "today" => Some(RangeToken::Today),
            "7d" => Some(RangeToken::Last7Days),
            "30d" => Some(RangeToken::Last30Days),
            "90d" => Some(RangeToken::Last90Days),
            "all" => Some(RangeToken::All),
            _ => None,
        }
    }

    /// Parse against the set a call site supports.
    pub fn parse_for(token: &str, supported: &[RangeToken]) -> Option<Self> {
        Self::parse(token).filter(|t| supported.contains(t))
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RangeToken::Today => "today",
            RangeToken::Last7Days => "7d",
            RangeToken::Last30Days => "30d",
            RangeToken::Last90Days => "90d",
            RangeToken::All => "all",
        }
    }

    /// Length of a rolling window in days. `None` for `today` and `all`.
    pub fn rolling_days(self) -> Option<u64> {
        match self {
            RangeToken::Last7Days => Some(7),
            RangeToken::Last30Days => Some(30),
            RangeToken::Last90Days => Some(90),
            RangeToken::Today | RangeToken::All => None,
        }
    }
}

impl fmt::Display for RangeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inclusive `[start, end]` in local wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DateWindow {
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
}

impl DateWindow {
    /// Calendar-date bounds for filtering a date (not datetime) column.
    pub fn date_bounds(&self) -> (NaiveDate, NaiveDate) {
        (self.start.date_naive(), self.end.date_naive())
    }
}

/// Resolve a token against `now` in `now`'s zone.
pub fn resolve<Z: TimeZone>(token: RangeToken, now: &DateTime<Z>) -> Option<DateWindow> {
    let zone = now.timezone();
    let today = now.date_naive();
    match token {
        RangeToken::All => None,
        RangeToken::Today => Some(DateWindow {
            start: start_of_day(&zone, today).fixed_offset(),
            end: end_of_day(&zone, today).fixed_offset(),
        }),
        RangeToken::Last7Days | RangeToken::Last30Days | RangeToken::Last90Days => {
            let days = token.rolling_days().unwrap_or(1);
            let first = today
                .checked_sub_days(Days::new(days.saturating_sub(1)))
                .unwrap_or(NaiveDate::MIN);
            Some(DateWindow {
                start: start_of_day(&zone, first).fixed_offset(),
                end: now.fixed_offset(),
            })
        }
    }
}

/// Local midnight. A midnight skipped by a DST jump resolves to the first
/// valid instant after it.
pub fn start_of_day<Z: TimeZone>(zone: &Z, date: NaiveDate) -> DateTime<Z> {
    earliest_at_or_after(zone, date.and_time(NaiveTime::MIN))
}

/// Local 23:59:59.999.
pub fn end_of_day<Z: TimeZone>(zone: &Z, date: NaiveDate) -> DateTime<Z> {
    let last_milli = NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap_or(NaiveTime::MIN);
    let naive = date.and_time(last_milli);
    match zone.from_local_datetime(&naive).latest() {
        Some(dt) => dt,
        None => earliest_at_or_after(zone, naive),
    }
}

fn earliest_at_or_after<Z: TimeZone>(zone: &Z, naive: NaiveDateTime) -> DateTime<Z> {
    // DST gaps are at most a couple of hours; step in 15 minute increments.
    for step in 0..=12 {
        let candidate = naive + Duration::minutes(15 * step);
        if let Some(dt) = zone.from_local_datetime(&candidate).earliest() {
            return dt;
        }
    }
    zone.from_utc_datetime(&naive)
}

/// The zone date windows are computed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Zone {
    /// The operating system's local zone.
    Local,
    Named(Tz),
}

impl Zone {
    /// Build from the optional `timezone` config value.
    pub fn from_config(name: Option<&str>) -> Result<Self, ConfigError> {
        match name.map(str::trim).filter(|n| !n.is_empty()) {
            None => Ok(Zone::Local),
            Some(name) => name
                .parse::<Tz>()
                .map(Zone::Named)
                .map_err(|e| ConfigError::InvalidTimezone(format!("{name}: {e}"))),
        }
    }

    pub fn window(&self, token: RangeToken, now: DateTime<Utc>) -> Option<DateWindow> {
        match self {
            Zone::Local => resolve(token, &now.with_timezone(&Local)),
            Zone::Named(tz) => resolve(token, &now.with_timezone(tz)),
        }
    }

    /// Calendar date of `now` in this zone.
    pub fn today(&self, now: DateTime<Utc>) -> NaiveDate {
        match self {
            Zone::Local => now.with_timezone(&Local).date_naive(),
            Zone::Named(tz) => now.with_timezone(tz).date_naive(),
        }
    }

    pub fn day_start(&self, date: NaiveDate) -> DateTime<FixedOffset> {
        match self {
            Zone::Local => start_of_day(&Local, date).fixed_offset(),
            Zone::Named(tz) => start_of_day(tz, date).fixed_offset(),
        }
    }

    pub fn day_end(&self, date: NaiveDate) -> DateTime<FixedOffset> {
        match self {
            Zone::Local => end_of_day(&Local, date).fixed_offset(),
            Zone::Named(tz) => end_of_day(tz, date).fixed_offset(),
        }
    }
}
