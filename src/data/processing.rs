use super::ExportError;
use crate::terminal::RawTick;
use chrono::{DateTime, Utc};
use serde_json::Value;

/// Name of the index column in the reshaped table.
pub const INDEX_COLUMN: &str = "time";

/// Which timestamp field a tick batch carries, and therefore which unit
/// converts it to a calendar time.
///
/// - `Seconds`: field `time`, whole seconds since the Unix epoch
/// - `Milliseconds`: field `time_msc`, milliseconds since the Unix epoch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeColumn {
    Seconds,
    Milliseconds,
}

impl TimeColumn {
    pub fn field(self) -> &'static str {
        match self {
            TimeColumn::Seconds => "time",
            TimeColumn::Milliseconds => "time_msc",
        }
    }

    /// Picks the timestamp field from a batch's columns. `time` wins when
    /// both are present.
    pub fn detect(columns: &[String]) -> Option<Self> {
        let has = |name: &str| columns.iter().any(|c| c == name);

        if has(TimeColumn::Seconds.field()) {
            Some(TimeColumn::Seconds)
        } else if has(TimeColumn::Milliseconds.field()) {
            Some(TimeColumn::Milliseconds)
        } else {
            None
        }
    }

    /// Converts a raw field value using this column's unit. Integer values
    /// are exact; fractional values are rounded to the nearest millisecond.
    pub fn to_datetime(self, value: &Value) -> Option<DateTime<Utc>> {
        if let Some(raw) = value.as_i64() {
            return match self {
                TimeColumn::Seconds => DateTime::from_timestamp(raw, 0),
                TimeColumn::Milliseconds => DateTime::from_timestamp_millis(raw),
            };
        }

        let raw = value.as_f64()?;
        let millis = match self {
            TimeColumn::Seconds => raw * 1000.0,
            TimeColumn::Milliseconds => raw,
        };
        if !millis.is_finite() {
            return None;
        }
        DateTime::from_timestamp_millis(millis.round() as i64)
    }
}

/// Tick batch reshaped into a table keyed by calendar time.
///
/// `columns` holds every field seen in the batch, in first-seen order, minus
/// the `time` field which becomes the index. Each row has one cell per
/// column, `Value::Null` where a tick lacked that field.
#[derive(Debug, Clone)]
pub struct TickFrame {
    time_column: TimeColumn,
    columns: Vec<String>,
    index: Vec<DateTime<Utc>>,
    rows: Vec<Vec<Value>>,
}

impl TickFrame {
    /// Builds the table from a batch as returned by the terminal.
    ///
    /// # Errors
    /// - `UnrecognizedTimeColumn` if neither `time` nor `time_msc` appears
    /// - `InvalidTimestamp` if a tick's timestamp is missing or not a number
    pub fn from_ticks(ticks: Vec<RawTick>) -> Result<Self, ExportError> {
        let mut all_columns: Vec<String> = Vec::new();
        for tick in &ticks {
            for key in tick.keys() {
                if !all_columns.iter().any(|c| c == key) {
                    all_columns.push(key.clone());
                }
            }
        }

        let time_column = TimeColumn::detect(&all_columns).ok_or_else(|| {
            ExportError::UnrecognizedTimeColumn {
                columns: all_columns.clone(),
            }
        })?;
        let field = time_column.field();

        let columns: Vec<String> = all_columns
            .into_iter()
            .filter(|c| c != INDEX_COLUMN)
            .collect();

        let mut index = Vec::with_capacity(ticks.len());
        let mut rows = Vec::with_capacity(ticks.len());

        for (row, mut tick) in ticks.into_iter().enumerate() {
            let raw = tick.get(field).cloned().unwrap_or(Value::Null);
            let timestamp =
                time_column
                    .to_datetime(&raw)
                    .ok_or_else(|| ExportError::InvalidTimestamp {
                        row,
                        field,
                        value: raw.to_string(),
                    })?;

            index.push(timestamp);
            rows.push(
                columns
                    .iter()
                    .map(|c| tick.remove(c).unwrap_or(Value::Null))
                    .collect(),
            );
        }

        Ok(Self {
            time_column,
            columns,
            index,
            rows,
        })
    }

    pub fn time_column(&self) -> TimeColumn {
        self.time_column
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn index(&self) -> &[DateTime<Utc>] {
        &self.index
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Whether the time index never goes backwards.
    pub fn is_monotonic(&self) -> bool {
        self.index.windows(2).all(|w| w[0] <= w[1])
    }

    /// Rows paired with their index entry, in batch order.
    pub fn iter(&self) -> impl Iterator<Item = (&DateTime<Utc>, &[Value])> {
        self.index.iter().zip(self.rows.iter().map(Vec::as_slice))
    }

    /// Plain-text rendering of the first `n` rows, for logging.
    pub fn preview(&self, n: usize) -> String {
        let mut out = String::from(INDEX_COLUMN);
        for column in &self.columns {
            out.push('\t');
            out.push_str(column);
        }

        for (timestamp, cells) in self.iter().take(n) {
            out.push('\n');
            out.push_str(&format_timestamp(timestamp, self.time_column));
            for cell in cells {
                out.push('\t');
                out.push_str(&format_cell(cell));
            }
        }

        out
    }
}

/// Renders an index entry at the precision of the batch's time column, so a
/// whole column shares one width.
///
/// # Returns
/// `2020-01-02 03:04:05` for `Seconds`, `2020-01-02 03:04:05.250` for
/// `Milliseconds`
pub fn format_timestamp(timestamp: &DateTime<Utc>, time_column: TimeColumn) -> String {
    let pattern = match time_column {
        TimeColumn::Seconds => "%Y-%m-%d %H:%M:%S",
        TimeColumn::Milliseconds => "%Y-%m-%d %H:%M:%S%.3f",
    };
    timestamp.format(pattern).to_string()
}

pub fn format_cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn tick(value: Value) -> RawTick {
        match value {
            Value::Object(map) => map,
            _ => panic!("tick fixture must be an object"),
        }
    }

    #[test]
    fn test_seconds_column_is_preferred() {
        let ticks = vec![
            tick(json!({"time": 1577836801, "bid": 96.39, "ask": 96.41, "time_msc": 1577836801250i64})),
            tick(json!({"time": 1577836802, "bid": 96.40, "ask": 96.42, "time_msc": 1577836802500i64})),
        ];

        let frame = TickFrame::from_ticks(ticks).unwrap();

        assert_eq!(frame.time_column(), TimeColumn::Seconds);
        assert_eq!(frame.columns(), &["bid", "ask", "time_msc"]);
        assert_eq!(
            frame.index()[0],
            Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 1).unwrap()
        );
        assert_eq!(frame.rows()[1][2], json!(1577836802500i64));
    }

    #[test]
    fn test_milliseconds_column_when_time_absent() {
        let ticks = vec![
            tick(json!({"bid": 1.1, "time_msc": 1577836801250i64})),
            tick(json!({"bid": 1.2, "time_msc": 1577836801251i64})),
        ];

        let frame = TickFrame::from_ticks(ticks).unwrap();

        assert_eq!(frame.time_column(), TimeColumn::Milliseconds);
        assert_eq!(frame.columns(), &["bid", "time_msc"]);
        assert_eq!(
            frame.index()[0],
            Utc.timestamp_millis_opt(1577836801250).unwrap()
        );
        assert_eq!(
            format_timestamp(&frame.index()[0], frame.time_column()),
            "2020-01-01 00:00:01.250"
        );
        assert!(frame.is_monotonic());
    }

    #[test]
    fn test_missing_time_fields_fail() {
        let ticks = vec![tick(json!({"bid": 1.1, "ask": 1.2}))];

        match TickFrame::from_ticks(ticks) {
            Err(ExportError::UnrecognizedTimeColumn { columns }) => {
                assert_eq!(columns, vec!["bid".to_string(), "ask".to_string()]);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_unusable_timestamp_fails() {
        let ticks = vec![
            tick(json!({"time": 1577836801, "bid": 1.1})),
            tick(json!({"bid": 1.2})),
        ];

        match TickFrame::from_ticks(ticks) {
            Err(ExportError::InvalidTimestamp { row, field, value }) => {
                assert_eq!(row, 1);
                assert_eq!(field, "time");
                assert_eq!(value, "null");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_sparse_columns_fill_with_null() {
        let ticks = vec![
            tick(json!({"time": 10, "bid": 1.1})),
            tick(json!({"time": 11, "last": 1.15})),
        ];

        let frame = TickFrame::from_ticks(ticks).unwrap();

        assert_eq!(frame.columns(), &["bid", "last"]);
        assert_eq!(frame.rows()[0], vec![json!(1.1), Value::Null]);
        assert_eq!(frame.rows()[1], vec![Value::Null, json!(1.15)]);
    }

    #[test]
    fn test_monotonic_detection() {
        let ticks = vec![
            tick(json!({"time": 20, "bid": 1.0})),
            tick(json!({"time": 20, "bid": 1.0})),
            tick(json!({"time": 19, "bid": 1.0})),
        ];

        let frame = TickFrame::from_ticks(ticks).unwrap();
        assert_eq!(frame.len(), 3);
        assert!(!frame.is_monotonic());
    }

    #[test]
    fn test_fractional_seconds_round_to_millis() {
        let value = json!(1577836801.2504);
        assert_eq!(
            TimeColumn::Seconds.to_datetime(&value),
            Utc.timestamp_millis_opt(1577836801250).single()
        );
        assert_eq!(TimeColumn::Seconds.to_datetime(&json!("soon")), None);
    }

    #[test]
    fn test_timestamp_precision_follows_time_column() {
        let whole = Utc.timestamp_millis_opt(1577836802000).unwrap();

        assert_eq!(
            format_timestamp(&whole, TimeColumn::Milliseconds),
            "2020-01-01 00:00:02.000"
        );
        assert_eq!(
            format_timestamp(&whole, TimeColumn::Seconds),
            "2020-01-01 00:00:02"
        );
    }

    #[test]
    fn test_preview_limits_rows() {
        let ticks = (0..10)
            .map(|i| tick(json!({"time": 1577836800 + i, "bid": 1.0})))
            .collect();

        let frame = TickFrame::from_ticks(ticks).unwrap();
        let preview = frame.preview(5);
        let lines: Vec<&str> = preview.lines().collect();

        assert_eq!(lines.len(), 6);
        assert_eq!(lines[0], "time\tbid");
        assert_eq!(lines[1], "2020-01-01 00:00:00\t1.0");
    }
}
