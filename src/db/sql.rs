//! `Query` → parameterized SQLite statement, and row → JSON mapping.
//!
//! Column names only ever come from `Field::column()` and the fixed column
//! lists below; user input is always bound as a parameter.

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{params_from_iter, Connection, Row};
use serde_json::{Map, Value};

use crate::error::StoreError;
use crate::store::{Direction, Field, FilterValue, Predicate, Query, Table};

pub(crate) const CALL_COLUMNS: &[&str] = &[
    "id",
    "created_at",
    "phone_number",
    "name",
    "duration",
    "disconnection_reason",
    "recording_url",
    "transcript",
    "tour_date",
];

pub(crate) const ANALYSIS_COLUMNS: &[&str] = &[
    "id",
    "call_id",
    "created_at",
    "sentiment",
    "sentiment_confidence",
    "agent_confidence",
    "alert_status",
    "summary",
    "positive_indicators",
    "negative_indicators",
    "buying_signals",
];

/// Columns stored as JSON text and decoded back into JSON values.
const JSON_COLUMNS: &[&str] = &["positive_indicators", "negative_indicators", "buying_signals"];

fn table_name(table: Table) -> &'static str {
    match table {
        Table::Calls => "calls",
        Table::Analyses => "call_analysis",
    }
}

fn columns(table: Table) -> &'static [&'static str] {
    match table {
        Table::Calls => CALL_COLUMNS,
        Table::Analyses => ANALYSIS_COLUMNS,
    }
}

/// Timestamps are stored as RFC 3339 UTC with millisecond precision so that
/// text comparison orders them correctly.
pub(crate) fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub(crate) struct CompiledQuery {
    pub sql: String,
    pub params: Vec<SqlValue>,
    source: Table,
    embed: Option<Table>,
}

struct Compiler<'q> {
    query: &'q Query,
    params: Vec<SqlValue>,
}

impl Compiler<'_> {
    fn column(&self, field: Field) -> Result<String, StoreError> {
        let table = field.table();
        if table == self.query.source {
            Ok(format!("m.{}", field.column()))
        } else if self.query.embed == Some(table) {
            Ok(format!("e.{}", field.column()))
        } else {
            Err(StoreError::QueryFailed(format!(
                "{:?} is not available when querying {}",
                field,
                table_name(self.query.source)
            )))
        }
    }

    fn bind(&mut self, value: &FilterValue) {
        self.params.push(match value {
            FilterValue::Int(i) => SqlValue::Integer(*i),
            FilterValue::Text(s) => SqlValue::Text(s.clone()),
            FilterValue::Date(d) => SqlValue::Text(d.format("%Y-%m-%d").to_string()),
            FilterValue::Timestamp(ts) => SqlValue::Text(format_timestamp(*ts)),
        });
    }

    fn predicate(&mut self, predicate: &Predicate) -> Result<String, StoreError> {
        match predicate {
            Predicate::Eq { field, value } => {
                let col = self.column(*field)?;
                self.bind(value);
                Ok(format!("{col} = ?"))
            }
            Predicate::Gte { field, value } => {
                let col = self.column(*field)?;
                self.bind(value);
                Ok(format!("{col} >= ?"))
            }
            Predicate::Lte { field, value } => {
                let col = self.column(*field)?;
                self.bind(value);
                Ok(format!("{col} <= ?"))
            }
            Predicate::LabelIs { field, label } => {
                let col = self.column(*field)?;
                self.params.push(SqlValue::Text(label.trim().to_lowercase()));
                Ok(format!("LOWER(TRIM({col})) = ?"))
            }
            Predicate::Ilike { field, needle } => {
                let col = self.column(*field)?;
                self.params.push(SqlValue::Text(format!(
                    "%{}%",
                    escape_like(&needle.to_lowercase())
                )));
                Ok(format!("LOWER({col}) LIKE ? ESCAPE '\\'"))
            }
            Predicate::NotNull { field } => Ok(format!("{} IS NOT NULL", self.column(*field)?)),
            Predicate::AnyOf { predicates } => {
                if predicates.is_empty() {
                    return Ok("0".to_string());
                }
                let parts = predicates
                    .iter()
                    .map(|p| self.predicate(p))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(format!("({})", parts.join(" OR ")))
            }
        }
    }
}

fn escape_like(needle: &str) -> String {
    let mut out = String::with_capacity(needle.len());
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

pub(crate) fn compile(query: &Query) -> Result<CompiledQuery, StoreError> {
    if query.embed == Some(query.source) {
        return Err(StoreError::QueryFailed(format!(
            "cannot embed {} into itself",
            table_name(query.source)
        )));
    }

    let mut select: Vec<String> = columns(query.source)
        .iter()
        .map(|c| format!("m.{c}"))
        .collect();
    let join = match query.embed {
        None => String::new(),
        Some(related) => {
            select.extend(columns(related).iter().map(|c| format!("e.{c}")));
            let on = match query.source {
                Table::Calls => "e.call_id = m.id",
                Table::Analyses => "e.id = m.call_id",
            };
            format!(" LEFT JOIN {} e ON {}", table_name(related), on)
        }
    };

    let mut compiler = Compiler {
        query,
        params: Vec::new(),
    };
    let clauses = query
        .predicates
        .iter()
        .map(|p| compiler.predicate(p))
        .collect::<Result<Vec<_>, _>>()?;

    let mut sql = format!(
        "SELECT {} FROM {} m{}",
        select.join(", "),
        table_name(query.source),
        join
    );
    if !clauses.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }

    let direction = match query.order.direction {
        Direction::Asc => "ASC",
        Direction::Desc => "DESC",
    };
    let order_col = compiler.column(query.order.field)?;
    // Id as secondary key keeps equal timestamps / dates in a stable order.
    sql.push_str(&format!(" ORDER BY {order_col} {direction}, m.id {direction}"));

    let mut params = compiler.params;
    if let Some(limit) = query.limit {
        sql.push_str(" LIMIT ?");
        params.push(SqlValue::Integer(i64::try_from(limit).unwrap_or(i64::MAX)));
    }

    Ok(CompiledQuery {
        sql,
        params,
        source: query.source,
        embed: query.embed,
    })
}

impl CompiledQuery {
    pub(crate) fn run(&self, conn: &Connection) -> Result<Vec<Value>, StoreError> {
        let mut stmt = conn.prepare(&self.sql)?;
        let mut rows = stmt.query(params_from_iter(self.params.iter()))?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            out.push(self.row_to_json(row)?);
        }
        Ok(out)
    }

    fn row_to_json(&self, row: &Row<'_>) -> Result<Value, StoreError> {
        let main_cols = columns(self.source);
        let mut object = read_object(row, main_cols, 0)?;

        if let Some(related) = self.embed {
            let related_cols = columns(related);
            // An unmatched LEFT JOIN leaves the related id NULL.
            let embedded = match row.get_ref(main_cols.len())? {
                ValueRef::Null => Value::Null,
                _ => Value::Object(read_object(row, related_cols, main_cols.len())?),
            };
            object.insert(related.embed_key().to_string(), embedded);
        }
        Ok(Value::Object(object))
    }
}

fn read_object(row: &Row<'_>, cols: &[&str], offset: usize) -> Result<Map<String, Value>, StoreError> {
    let mut object = Map::new();
    for (i, col) in cols.iter().enumerate() {
        let value = row.get_ref(offset + i)?;
        object.insert(col.to_string(), to_json(value, JSON_COLUMNS.contains(col)));
    }
    Ok(object)
}

fn to_json(value: ValueRef<'_>, json_text: bool) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ValueRef::Text(bytes) => {
            let text = String::from_utf8_lossy(bytes).into_owned();
            if json_text {
                decode_json_text(text)
            } else {
                Value::String(text)
            }
        }
        ValueRef::Blob(_) => Value::Null,
    }
}

/// Indicator columns normally hold JSON, but older rows hold a bare label.
/// Text that parses to a scalar (`2024`, `true`) is one of those labels too.
fn decode_json_text(text: String) -> Value {
    match serde_json::from_str::<Value>(&text) {
        Ok(value @ (Value::Array(_) | Value::Object(_) | Value::String(_) | Value::Null)) => value,
        _ => Value::String(text),
    }
}
