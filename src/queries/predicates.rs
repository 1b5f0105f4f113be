//! Filter state → store predicates.
//!
//! Each builder returns the full query for one view: the view's structural
//! constraints (scope, ordering, cutoff) plus one predicate per non-empty
//! filter field. Inputs that do not parse (a call id of "12a", a date of
//! "03/10") drop their predicate instead of failing the query.

use chrono::{NaiveDate, Utc};

use crate::queries::window::{RangeToken, Zone, ANALYTICS_RANGES, DASHBOARD_RANGES};
use crate::queries::QueryContext;
use crate::store::{Direction, Field, FilterValue, Predicate, Query, Table};
use crate::types::FilterState;

/// Parse the id search box. `None` for empty or non-numeric input.
pub fn parse_call_id(input: &str) -> Option<i64> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }
    match trimmed.parse::<i64>() {
        Ok(id) => Some(id),
        Err(_) => {
            log::debug!("Predicates: ignoring non-numeric id filter {:?}", trimmed);
            None
        }
    }
}

/// Parse a `YYYY-MM-DD` date input. `None` for empty or malformed input.
pub fn parse_date(input: &str) -> Option<NaiveDate> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }
    match NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        Ok(date) => Some(date),
        Err(_) => {
            log::debug!("Predicates: ignoring malformed date filter {:?}", trimmed);
            None
        }
    }
}

/// One search box over several text columns: OR across the columns.
pub fn text_search(fields: &[Field], input: &str) -> Option<Predicate> {
    let needle = input.trim();
    if needle.is_empty() || fields.is_empty() {
        return None;
    }
    let mut predicates: Vec<Predicate> = fields
        .iter()
        .map(|&field| Predicate::Ilike {
            field,
            needle: needle.to_string(),
        })
        .collect();
    if predicates.len() == 1 {
        return predicates.pop();
    }
    Some(Predicate::AnyOf { predicates })
}

pub fn id_equals(field: Field, input: &str) -> Option<Predicate> {
    parse_call_id(input).map(|id| Predicate::Eq {
        field,
        value: FilterValue::Int(id),
    })
}

/// Categorical match, compared the way the classifiers read labels: trimmed
/// and case-folded on both sides.
pub fn category_equals(field: Field, input: &str) -> Option<Predicate> {
    let value = input.trim();
    if value.is_empty() {
        return None;
    }
    Some(Predicate::LabelIs {
        field,
        label: value.to_lowercase(),
    })
}

/// Day-bounded range on a timestamp column: `from` at local midnight through
/// `to` at local 23:59:59.999.
pub fn timestamp_day_range(
    field: Field,
    from: &str,
    to: &str,
    zone: &Zone,
) -> Vec<Predicate> {
    let mut out = Vec::new();
    if let Some(date) = parse_date(from) {
        out.push(Predicate::Gte {
            field,
            value: FilterValue::Timestamp(zone.day_start(date).with_timezone(&Utc)),
        });
    }
    if let Some(date) = parse_date(to) {
        out.push(Predicate::Lte {
            field,
            value: FilterValue::Timestamp(zone.day_end(date).with_timezone(&Utc)),
        });
    }
    out
}

/// Inclusive range on a calendar-date column. Compared as dates so no
/// boundary record is lost to a timezone shift.
pub fn date_range(field: Field, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Vec<Predicate> {
    let mut out = Vec::new();
    if let Some(date) = from {
        out.push(Predicate::Gte {
            field,
            value: FilterValue::Date(date),
        });
    }
    if let Some(date) = to {
        out.push(Predicate::Lte {
            field,
            value: FilterValue::Date(date),
        });
    }
    out
}

fn with_all(mut query: Query, predicates: Vec<Predicate>) -> Query {
    query.predicates.extend(predicates);
    query
}

/// Conversations list: newest calls first, each with its analysis.
pub fn conversations_query(filter: &FilterState, ctx: &QueryContext) -> Query {
    let query = Query::select(Table::Calls)
        .embed(Table::Analyses)
        .filter_opt(text_search(&[Field::Name, Field::PhoneNumber], &filter.search))
        .filter_opt(id_equals(Field::CallId, &filter.call_id));
    with_all(
        query,
        timestamp_day_range(Field::CallCreatedAt, &filter.date_from, &filter.date_to, &ctx.zone),
    )
    .order(Field::CallCreatedAt, Direction::Desc)
    .limit(ctx.recent_limit)
}

/// Analyses list: newest analyses first, each with its call.
pub fn analyses_query(filter: &FilterState, ctx: &QueryContext) -> Query {
    let query = Query::select(Table::Analyses)
        .embed(Table::Calls)
        .filter_opt(text_search(&[Field::Summary], &filter.search))
        .filter_opt(id_equals(Field::AnalysisCallId, &filter.call_id))
        .filter_opt(category_equals(Field::Sentiment, &filter.sentiment))
        .filter_opt(category_equals(Field::AlertStatus, &filter.alert_status));
    with_all(
        query,
        timestamp_day_range(
            Field::AnalysisCreatedAt,
            &filter.date_from,
            &filter.date_to,
            &ctx.zone,
        ),
    )
    .order(Field::AnalysisCreatedAt, Direction::Desc)
    .limit(ctx.recent_limit)
}

/// Scheduled meetings: calls with a tour date, soonest first.
pub fn meetings_query(filter: &FilterState, ctx: &QueryContext) -> Query {
    let query = Query::select(Table::Calls)
        .filter(Predicate::NotNull {
            field: Field::TourDate,
        })
        .filter_opt(text_search(&[Field::Name, Field::PhoneNumber], &filter.search))
        .filter_opt(id_equals(Field::CallId, &filter.call_id));
    with_all(
        query,
        date_range(
            Field::TourDate,
            parse_date(&filter.date_from),
            parse_date(&filter.date_to),
        ),
    )
    .order(Field::TourDate, Direction::Asc)
    .limit(ctx.recent_limit)
}

/// Which statistics page a window query is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatsScope {
    Dashboard,
    Analytics,
}

impl StatsScope {
    pub fn supported(self) -> &'static [RangeToken] {
        match self {
            StatsScope::Dashboard => DASHBOARD_RANGES,
            StatsScope::Analytics => ANALYTICS_RANGES,
        }
    }

    /// Token used when the range box is empty.
    pub fn default_range(self) -> RangeToken {
        match self {
            StatsScope::Dashboard => RangeToken::Today,
            StatsScope::Analytics => RangeToken::All,
        }
    }

    /// Resolve the filter's range token, falling back to the default for
    /// empty or unsupported input.
    pub fn range(self, input: &str) -> RangeToken {
        if input.trim().is_empty() {
            return self.default_range();
        }
        match RangeToken::parse_for(input, self.supported()) {
            Some(token) => token,
            None => {
                log::warn!(
                    "Predicates: range {:?} not offered on {:?}, using {}",
                    input,
                    self,
                    self.default_range()
                );
                self.default_range()
            }
        }
    }
}

/// Calls created within the selected window, with analyses, for rollups.
pub fn window_query(scope: StatsScope, filter: &FilterState, ctx: &QueryContext) -> Query {
    let token = scope.range(&filter.range);
    let mut query = Query::select(Table::Calls).embed(Table::Analyses);
    if let Some(window) = ctx.zone.window(token, ctx.now) {
        query = query
            .filter(Predicate::Gte {
                field: Field::CallCreatedAt,
                value: FilterValue::Timestamp(window.start.with_timezone(&Utc)),
            })
            .filter(Predicate::Lte {
                field: Field::CallCreatedAt,
                value: FilterValue::Timestamp(window.end.with_timezone(&Utc)),
            });
    }
    query.order(Field::CallCreatedAt, Direction::Desc)
}

/// Calls with a tour date inside the selected window. The window is applied
/// as inclusive calendar dates in the configured zone.
pub fn tour_window_query(scope: StatsScope, filter: &FilterState, ctx: &QueryContext) -> Query {
    let token = scope.range(&filter.range);
    let query = Query::select(Table::Calls).filter(Predicate::NotNull {
        field: Field::TourDate,
    });
    let bounds = match ctx.zone.window(token, ctx.now) {
        Some(window) => {
            let (from, to) = window.date_bounds();
            date_range(Field::TourDate, Some(from), Some(to))
        }
        None => Vec::new(),
    };
    with_all(query, bounds).order(Field::TourDate, Direction::Asc)
}
