//! Text snapshot of a SQL result, as stored in the cache.
//!
//! ```text
//! id,name,active          column names
//! Int64,String,Boolean    column types
//! 1,Ann,true              rows
//! 2,null ,null            literal "null" string, then SQL NULL
//! ```
//!
//! Cells escape `\`, `,`, newline and carriage return as `\\`, `\,`, `\n`
//! and `\r`. A trailing space is written `\s` so only the literal-null
//! marker ends in a bare space.

use chrono::{DateTime, NaiveDateTime};
use serde_json::{Number, Value};

use crate::shaping::{value_text, Record, ShapingError, ShapingResult};

const NULL_CELL: &str = "null";
const NULL_STRING_CELL: &str = "null ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Boolean,
    Int64,
    Double,
    String,
    DateTime,
}

impl ColumnType {
    /// Parse a type code. Integer and decimal aliases collapse onto
    /// `Int64` and `Double`.
    pub fn parse(code: &str) -> Option<Self> {
        match code.trim().to_ascii_lowercase().as_str() {
            "boolean" | "bool" => Some(ColumnType::Boolean),
            "int64" | "int32" | "int16" | "byte" | "sbyte" | "uint16" | "uint32" | "uint64" | "long"
            | "int" => Some(ColumnType::Int64),
            "double" | "single" | "decimal" | "float" => Some(ColumnType::Double),
            "string" | "char" | "guid" => Some(ColumnType::String),
            "datetime" | "datetimeoffset" => Some(ColumnType::DateTime),
            _ => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ColumnType::Boolean => "Boolean",
            ColumnType::Int64 => "Int64",
            ColumnType::Double => "Double",
            ColumnType::String => "String",
            ColumnType::DateTime => "DateTime",
        }
    }

    fn infer(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(_) => Some(ColumnType::Boolean),
            Value::Number(n) if n.is_f64() => Some(ColumnType::Double),
            Value::Number(_) => Some(ColumnType::Int64),
            Value::Null => None,
            _ => Some(ColumnType::String),
        }
    }

    /// Convert one unescaped cell.
    pub fn convert(&self, cell: &str) -> Result<Value, String> {
        match self {
            ColumnType::String => Ok(Value::String(cell.to_string())),
            _ if cell.is_empty() => Ok(Value::Null),
            ColumnType::Boolean => match cell.to_ascii_lowercase().as_str() {
                "true" | "1" => Ok(Value::Bool(true)),
                "false" | "0" => Ok(Value::Bool(false)),
                _ => Err(format!("`{cell}` is not a Boolean")),
            },
            ColumnType::Int64 => cell
                .parse::<i64>()
                .map(Value::from)
                .or_else(|_| cell.parse::<u64>().map(Value::from))
                .map_err(|_| format!("`{cell}` is not an Int64")),
            ColumnType::Double => cell
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Value::Number)
                .ok_or_else(|| format!("`{cell}` is not a Double")),
            ColumnType::DateTime => parse_datetime(cell)
                .map(Value::String)
                .ok_or_else(|| format!("`{cell}` is not a DateTime")),
        }
    }
}

fn parse_datetime(cell: &str) -> Option<String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(cell) {
        return Some(dt.to_rfc3339());
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(cell, fmt).ok())
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%S%.f").to_string())
}

/// Encode rows. Columns come from the rows in order of first appearance;
/// each column's type is taken from its first non-null value.
pub fn encode(rows: &[Record]) -> String {
    let mut columns: Vec<&String> = Vec::new();
    for row in rows {
        for key in row.keys() {
            if !columns.contains(&key) {
                columns.push(key);
            }
        }
    }

    let types: Vec<ColumnType> = columns
        .iter()
        .map(|c| {
            rows.iter()
                .filter_map(|r| r.get(c.as_str()))
                .find_map(ColumnType::infer)
                .unwrap_or(ColumnType::String)
        })
        .collect();

    let mut lines = Vec::with_capacity(rows.len() + 2);
    lines.push(columns.iter().map(|c| escape(c)).collect::<Vec<_>>().join(","));
    lines.push(types.iter().map(ColumnType::code).collect::<Vec<_>>().join(","));
    for row in rows {
        let cells: Vec<String> = columns
            .iter()
            .map(|c| match row.get(c.as_str()) {
                None | Some(Value::Null) => NULL_CELL.to_string(),
                Some(Value::String(s)) if s == NULL_CELL => NULL_STRING_CELL.to_string(),
                Some(v) => escape(&value_text(v)),
            })
            .collect();
        lines.push(cells.join(","));
    }
    lines.join("\n")
}

/// Decode snapshot text into records.
pub fn decode(text: &str) -> ShapingResult<Vec<Record>> {
    let mut lines = text.lines();
    let Some(header) = lines.next().filter(|l| !l.is_empty()) else {
        return Ok(Vec::new());
    };
    let columns: Vec<String> = split_cells(header).into_iter().map(|(c, _)| c).collect();

    let types = lines
        .next()
        .map(|l| {
            split_cells(l)
                .into_iter()
                .map(|(code, _)| {
                    ColumnType::parse(&code)
                        .ok_or_else(|| ShapingError::Snapshot(format!("unknown column type `{code}`")))
                })
                .collect::<ShapingResult<Vec<_>>>()
        })
        .transpose()?
        .unwrap_or_default();
    if types.len() != columns.len() {
        return Err(ShapingError::Snapshot(format!(
            "{} columns but {} types",
            columns.len(),
            types.len()
        )));
    }

    let mut records = Vec::new();
    for (i, line) in lines.enumerate() {
        let cells = split_cells(line);
        if cells.len() != columns.len() {
            return Err(ShapingError::Snapshot(format!(
                "row {} has {} cells, expected {}",
                i + 1,
                cells.len(),
                columns.len()
            )));
        }
        let mut record = Record::new();
        for ((column, ty), (cell, raw)) in columns.iter().zip(&types).zip(cells) {
            let value = if raw == NULL_CELL {
                Value::Null
            } else if raw == NULL_STRING_CELL {
                Value::String(NULL_CELL.to_string())
            } else {
                ty.convert(&cell)
                    .map_err(|reason| ShapingError::Snapshot(format!("column `{column}`: {reason}")))?
            };
            record.insert(column.clone(), value);
        }
        records.push(record);
    }
    Ok(records)
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => out.push_str("\\\\"),
            ',' => out.push_str("\\,"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            ' ' if chars.peek().is_none() => out.push_str("\\s"),
            other => out.push(other),
        }
    }
    out
}

fn unescape(c: char) -> char {
    match c {
        'n' => '\n',
        'r' => '\r',
        's' => ' ',
        other => other,
    }
}

/// Split on unescaped commas, returning each cell unescaped together with
/// its raw text.
fn split_cells(line: &str) -> Vec<(String, String)> {
    let mut cells = Vec::new();
    let mut cell = String::new();
    let mut raw = String::new();
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                raw.push(c);
                if let Some(next) = chars.next() {
                    raw.push(next);
                    cell.push(unescape(next));
                }
            }
            ',' => {
                cells.push((std::mem::take(&mut cell), std::mem::take(&mut raw)));
            }
            other => {
                cell.push(other);
                raw.push(other);
            }
        }
    }
    cells.push((cell, raw));
    cells
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shaping::record;
    use serde_json::json;

    #[test]
    fn test_encode_layout() {
        let rows = vec![
            record([("id", json!(1)), ("name", json!("Ann")), ("active", json!(true))]),
            record([("id", json!(2)), ("name", json!("null")), ("active", Value::Null)]),
        ];
        assert_eq!(
            encode(&rows),
            "id,name,active\nInt64,String,Boolean\n1,Ann,true\n2,null ,null"
        );
    }

    #[test]
    fn test_decode_restores_values() {
        let rows = vec![
            record([
                ("id", json!(1)),
                ("note", json!("a,b\\c\nd")),
                ("score", json!(2.5)),
                ("missing", Value::Null),
                ("word", json!("null")),
            ]),
            record([
                ("id", json!(2)),
                ("note", json!("")),
                ("score", json!(0.5)),
                ("missing", Value::Null),
                ("word", json!("x")),
            ]),
        ];
        assert_eq!(decode(&encode(&rows)).unwrap(), rows);
    }

    #[test]
    fn test_trailing_space_and_carriage_return_survive() {
        let rows = vec![record([
            ("word", json!("null ")),
            ("line", json!("windows\r")),
            ("pad", json!("a ")),
        ])];
        let text = encode(&rows);
        assert_eq!(text, "word,line,pad\nString,String,String\nnull\\s,windows\\r,a\\s");
        assert_eq!(decode(&text).unwrap(), rows);
    }

    #[test]
    fn test_decode_aliases_and_datetime() {
        let text = "n,at,flag\nInt32,DateTime,Boolean\n7,2024-01-02 03:04:05,False";
        let rows = decode(text).unwrap();
        assert_eq!(rows[0]["n"], json!(7));
        assert!(rows[0]["at"].as_str().unwrap().starts_with("2024-01-02T03:04:05"));
        assert_eq!(rows[0]["flag"], json!(false));
    }

    #[test]
    fn test_decode_errors() {
        assert!(matches!(decode("a\nInt64\nx"), Err(ShapingError::Snapshot(_))));
        assert!(matches!(decode("a,b\nInt64,Blob\n1,2"), Err(ShapingError::Snapshot(_))));
        assert!(matches!(decode("a,b\nInt64,Int64\n1"), Err(ShapingError::Snapshot(_))));
    }

    #[test]
    fn test_empty_text() {
        assert!(decode("").unwrap().is_empty());
    }
}
