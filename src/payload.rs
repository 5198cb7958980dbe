use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

use crate::error::{PriceError, Result};
use crate::window::Window;

const START_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PriceResult {
    #[serde(serialize_with = "rfc3339")]
    pub date: DateTime<Tz>,
    pub value: i64,
    pub area: String,
}

fn rfc3339<S: Serializer>(date: &DateTime<Tz>, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_str(&date.to_rfc3339())
}

/// One entry of `data.Rows`. Fields stay loosely typed so a bad field
/// only costs its own row or column.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub(crate) struct RawRow {
    start_time: Option<Value>,
    is_extra_row: Option<Value>,
    columns: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct RawColumn {
    name: Option<Value>,
    value: Option<Value>,
}

/// Pulls `data.Rows` out of a response body.
///
/// A missing `data` or `Rows` means the market has nothing for the window
/// and yields no rows. Anything shaped differently from the documented
/// payload is a [`PriceError::Decode`].
pub(crate) fn decode_rows(body: &str) -> Result<Vec<RawRow>> {
    let mut root = match serde_json::from_str(body)? {
        Value::Object(root) => root,
        other => {
            return Err(PriceError::Decode(format!(
                "expected a JSON object, got {}",
                kind(&other)
            )))
        }
    };

    let mut data = match root.remove("data") {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Object(data)) => data,
        Some(other) => {
            return Err(PriceError::Decode(format!(
                "`data` is {}, expected an object",
                kind(&other)
            )))
        }
    };

    match data.remove("Rows") {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(rows)) => rows
            .into_iter()
            .enumerate()
            .map(|(i, row)| match row {
                Value::Object(_) => Ok(serde_json::from_value(row)?),
                other => Err(PriceError::Decode(format!(
                    "`data.Rows[{i}]` is {}, expected an object",
                    kind(&other)
                ))),
            })
            .collect(),
        Some(other) => Err(PriceError::Decode(format!(
            "`data.Rows` is {}, expected an array",
            kind(&other)
        ))),
    }
}

/// Turns rows into results, keeping upstream row and column order.
pub(crate) fn normalize(
    rows: Vec<RawRow>,
    tz: Tz,
    window: &Window,
    area: Option<&str>,
) -> Vec<PriceResult> {
    let mut results = Vec::new();
    for row in rows {
        match row.is_extra_row {
            None | Some(Value::Null) | Some(Value::Bool(false)) => {}
            Some(Value::Bool(true)) => continue,
            Some(other) => {
                tracing::trace!("Skipping row with unusable IsExtraRow {other}");
                continue;
            }
        }
        let Some(date) = row
            .start_time
            .as_ref()
            .and_then(Value::as_str)
            .and_then(|raw| parse_start_time(raw, tz))
        else {
            tracing::trace!("Skipping row with unusable StartTime {:?}", row.start_time);
            continue;
        };
        if !window.contains(&date) {
            continue;
        }
        let columns = match row.columns {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(columns)) => columns,
            Some(other) => {
                tracing::trace!("Skipping row at {date}: Columns is {}", kind(&other));
                continue;
            }
        };

        for column in columns {
            let Ok(column) = serde_json::from_value::<RawColumn>(column) else {
                continue;
            };
            let Some(name) = column.name.as_ref().and_then(Value::as_str) else {
                tracing::trace!("Skipping column at {date} with unusable Name {:?}", column.name);
                continue;
            };
            if area.is_some_and(|area| area != name) {
                continue;
            }
            let Some(value) = column.value.as_ref().and_then(parse_value) else {
                tracing::trace!("Skipping {name} at {date}: unparseable value {:?}", column.value);
                continue;
            };
            results.push(PriceResult {
                date,
                value: value.trunc() as i64,
                area: name.to_string(),
            });
        }
    }
    results
}

/// Local wall-clock time in `tz`. Fall-back hours resolve to the earlier
/// instant; times inside a spring-forward gap do not exist.
fn parse_start_time(raw: &str, tz: Tz) -> Option<DateTime<Tz>> {
    let naive = NaiveDateTime::parse_from_str(raw, START_TIME_FORMAT).ok()?;
    if NaiveDate::from_ymd_opt(1, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .is_some_and(|zero| zero == naive)
    {
        return None;
    }
    tz.from_local_datetime(&naive).earliest()
}

/// Strips everything but ASCII digits and `.` before parsing, so thousands
/// separators and unit decorations fall away. Numbers go through the same
/// stripping as strings, sign included.
fn parse_value(value: &Value) -> Option<f64> {
    let raw = match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    let parsed = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect::<String>()
        .parse::<f64>()
        .ok()?;
    parsed.is_finite().then_some(parsed)
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::Europe::Oslo;
    use serde_json::json;

    fn oslo(y: i32, m: u32, d: u32, h: u32) -> DateTime<Tz> {
        Oslo.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    fn rows(value: Value) -> Vec<RawRow> {
        decode_rows(&value.to_string()).unwrap()
    }

    #[test]
    fn missing_data_or_rows_is_empty() {
        assert!(decode_rows("{}").unwrap().is_empty());
        assert!(decode_rows(r#"{"data": null}"#).unwrap().is_empty());
        assert!(decode_rows(r#"{"data": {}}"#).unwrap().is_empty());
        assert!(decode_rows(r#"{"data": {"Rows": []}}"#).unwrap().is_empty());
    }

    #[test]
    fn wrong_shapes_are_decode_errors() {
        for body in [
            "not json",
            "[]",
            r#"{"data": []}"#,
            r#"{"data": {"Rows": {}}}"#,
            r#"{"data": {"Rows": [42]}}"#,
        ] {
            assert!(
                matches!(decode_rows(body), Err(PriceError::Decode(_))),
                "{body} should not decode"
            );
        }
    }

    #[test]
    fn extra_rows_never_appear() {
        let rows = rows(json!({"data": {"Rows": [
            {"StartTime": "2024-06-15T00:00:00", "IsExtraRow": false,
             "Columns": [{"Name": "NO1", "Value": "10"}]},
            {"StartTime": "2024-06-15T01:00:00", "IsExtraRow": true,
             "Columns": [{"Name": "Max", "Value": "99"}]},
            {"IsExtraRow": true, "Columns": null},
            {"StartTime": "2024-06-15T02:00:00", "IsExtraRow": "true",
             "Columns": [{"Name": "Min", "Value": "1"}]},
            {"StartTime": "2024-06-15T03:00:00", "IsExtraRow": false, "Columns": null},
        ]}}));
        let results = normalize(rows, Oslo, &Window::default(), None);
        assert_eq!(
            results,
            vec![PriceResult {
                date: oslo(2024, 6, 15, 0),
                value: 10,
                area: "NO1".to_string(),
            }]
        );
    }

    #[test]
    fn unusable_start_times_are_skipped() {
        let rows = rows(json!({"data": {"Rows": [
            {"StartTime": "15.06.2024 00:00", "Columns": [{"Name": "NO1", "Value": "1"}]},
            {"StartTime": "0001-01-01T00:00:00", "Columns": [{"Name": "NO1", "Value": "2"}]},
            {"StartTime": "2024-03-31T02:00:00", "Columns": [{"Name": "NO1", "Value": "3"}]},
            {"StartTime": 1718402400, "Columns": [{"Name": "NO1", "Value": "4"}]},
            {"Columns": [{"Name": "NO1", "Value": "5"}]},
            {"StartTime": "2024-06-15T03:00:00", "Columns": [{"Name": "NO1", "Value": "6"}]},
        ]}}));
        let results = normalize(rows, Oslo, &Window::default(), None);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].value, 6);
        assert_eq!(results[0].date, oslo(2024, 6, 15, 3));
    }

    #[test]
    fn bad_columns_do_not_abort_row() {
        let rows = rows(json!({"data": {"Rows": [
            {"StartTime": "2024-06-15T13:00:00", "IsExtraRow": false, "Columns": [
                {"Name": "NO1", "Value": "1 234,56"},
                {"Name": "NO2", "Value": "1.2.3"},
                {"Name": "NO3", "Value": "-"},
                {"Name": "NO4", "Value": "45.99"},
                {"Name": "NO5"},
                {"Name": "NO6", "Value": 12.7},
                {"Name": 7, "Value": "1"},
                42,
                {"Name": "SE1", "Value": "-12,50"},
                {"Name": "SE2", "Value": -12.5},
            ]},
        ]}}));
        let results = normalize(rows, Oslo, &Window::default(), None);
        let got: Vec<(&str, i64)> = results.iter().map(|r| (r.area.as_str(), r.value)).collect();
        assert_eq!(
            got,
            vec![("NO1", 123456), ("NO4", 45), ("NO6", 12), ("SE1", 1250), ("SE2", 12)]
        );
    }

    #[test]
    fn area_filter_keeps_row_order() {
        let rows = rows(json!({"data": {"Rows": [
            {"StartTime": "2024-06-15T00:00:00", "Columns": [
                {"Name": "SE1", "Value": "5"}, {"Name": "NO1", "Value": "7"}]},
            {"StartTime": "2024-06-15T01:00:00", "Columns": [
                {"Name": "NO1", "Value": "8"}, {"Name": "SE1", "Value": "6"}]},
        ]}}));
        let results = normalize(rows, Oslo, &Window::default(), Some("NO1"));
        let got: Vec<(DateTime<Tz>, i64)> = results.iter().map(|r| (r.date, r.value)).collect();
        assert_eq!(got, vec![(oslo(2024, 6, 15, 0), 7), (oslo(2024, 6, 15, 1), 8)]);
        assert!(results.iter().all(|r| r.area == "NO1"));
    }

    #[test]
    fn window_is_half_open() {
        let rows = rows(json!({"data": {"Rows": [
            {"StartTime": "2024-06-15T09:00:00", "Columns": [{"Name": "NO1", "Value": "9"}]},
            {"StartTime": "2024-06-15T10:00:00", "Columns": [{"Name": "NO1", "Value": "10"}]},
            {"StartTime": "2024-06-15T11:00:00", "Columns": [{"Name": "NO1", "Value": "11"}]},
            {"StartTime": "2024-06-15T12:00:00", "Columns": [{"Name": "NO1", "Value": "12"}]},
        ]}}));
        let window = Window::new(Some(oslo(2024, 6, 15, 10)), Some(oslo(2024, 6, 15, 12)));
        let values: Vec<i64> = normalize(rows, Oslo, &window, None)
            .into_iter()
            .map(|r| r.value)
            .collect();
        assert_eq!(values, vec![10, 11]);
    }

    #[test]
    fn serializes_date_with_source_offset() {
        let result = PriceResult {
            date: oslo(2024, 6, 15, 13),
            value: 42,
            area: "NO1".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            json!({"date": "2024-06-15T13:00:00+02:00", "value": 42, "area": "NO1"})
        );
    }
}
