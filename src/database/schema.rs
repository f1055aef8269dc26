//! Table schema and value types for the SQLite storage layer.

use rusqlite::ToSql;
use rusqlite::types::ToSqlOutput;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Normalized column type tag.
///
/// SQLite declared types are free-form text; everything is folded into
/// this fixed set, defaulting to `Text` when the declaration is missing
/// or unrecognized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ColumnType {
    Integer,
    Real,
    Text,
    Blob,
    Numeric,
    Date,
    DateTime,
    Timestamp,
}

impl ColumnType {
    /// Normalize a SQLite declared type.
    ///
    /// Match order matters: `DATETIME` must be checked before `DATE` and
    /// `TIMESTAMP` before anything the substring rules would shadow.
    pub fn from_declared(declared: &str) -> Self {
        let upper = declared.trim().to_uppercase();
        if upper.is_empty() {
            return Self::Text;
        }
        if upper.contains("DATETIME") {
            Self::DateTime
        } else if upper.contains("TIMESTAMP") {
            Self::Timestamp
        } else if upper.contains("DATE") {
            Self::Date
        } else if upper.contains("INT") {
            Self::Integer
        } else if upper.contains("REAL") || upper.contains("FLOAT") || upper.contains("DOUBLE") {
            Self::Real
        } else if upper.contains("TEXT") || upper.contains("CHAR") || upper.contains("CLOB") {
            Self::Text
        } else if upper.contains("BLOB") {
            Self::Blob
        } else if upper.contains("NUMERIC") || upper.contains("DECIMAL") {
            Self::Numeric
        } else {
            Self::Text
        }
    }

    /// True for the types that can carry a date window.
    pub fn is_temporal(self) -> bool {
        matches!(self, Self::Date | Self::DateTime | Self::Timestamp)
    }

    /// True for types that store integers (boolean coercion target).
    pub fn is_integer_like(self) -> bool {
        matches!(self, Self::Integer)
    }

    /// True for types the column-stats tool treats numerically.
    pub fn is_numeric(self) -> bool {
        matches!(self, Self::Integer | Self::Real | Self::Numeric)
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Integer => "INTEGER",
            Self::Real => "REAL",
            Self::Text => "TEXT",
            Self::Blob => "BLOB",
            Self::Numeric => "NUMERIC",
            Self::Date => "DATE",
            Self::DateTime => "DATETIME",
            Self::Timestamp => "TIMESTAMP",
        };
        f.write_str(s)
    }
}

/// Ordered mapping from lower-cased column name to normalized type.
///
/// Built fresh per request from `PRAGMA table_info`; never cached, so it
/// always reflects the live schema. Column order follows the table
/// definition.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TableSchema {
    columns: Vec<(String, ColumnType)>,
}

impl TableSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a column; the name is lower-cased on insertion.
    pub fn push(&mut self, name: impl Into<String>, column_type: ColumnType) {
        self.columns.push((name.into().to_lowercase(), column_type));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Case-insensitive lookup.
    pub fn get(&self, name: &str) -> Option<ColumnType> {
        let lower = name.to_lowercase();
        self.columns
            .iter()
            .find(|(col, _)| *col == lower)
            .map(|(_, ty)| *ty)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, ColumnType)> {
        self.columns.iter().map(|(name, ty)| (name.as_str(), *ty))
    }

    /// Column names in definition order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl FromIterator<(String, ColumnType)> for TableSchema {
    fn from_iter<I: IntoIterator<Item = (String, ColumnType)>>(iter: I) -> Self {
        let mut schema = Self::new();
        for (name, ty) in iter {
            schema.push(name, ty);
        }
        schema
    }
}

/// Row data as a map of column name to value.
pub type Row = HashMap<String, CellValue>;

/// Cell value covering SQLite's storage classes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl CellValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            Self::Int(n) => Some(*n as f64),
            _ => None,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("NULL"),
            Self::Int(n) => write!(f, "{}", n),
            Self::Float(v) => write!(f, "{}", v),
            Self::Text(s) => f.write_str(s),
            Self::Blob(b) => write!(f, "<{} bytes>", b.len()),
        }
    }
}

impl From<i64> for CellValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for CellValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<String> for CellValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<&str> for CellValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<rusqlite::types::ValueRef<'_>> for CellValue {
    fn from(value: rusqlite::types::ValueRef<'_>) -> Self {
        use rusqlite::types::ValueRef;
        match value {
            ValueRef::Null => Self::Null,
            ValueRef::Integer(n) => Self::Int(n),
            ValueRef::Real(f) => Self::Float(f),
            ValueRef::Text(bytes) => Self::Text(String::from_utf8_lossy(bytes).into_owned()),
            ValueRef::Blob(bytes) => Self::Blob(bytes.to_vec()),
        }
    }
}

/// Bound value for a named placeholder in a synthesized query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Int(i64),
    Text(String),
}

impl ToSql for ParamValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        match self {
            Self::Int(n) => Ok(ToSqlOutput::from(*n)),
            Self::Text(s) => Ok(ToSqlOutput::from(s.as_str())),
        }
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(n) => write!(f, "{}", n),
            Self::Text(s) => write!(f, "'{}'", s),
        }
    }
}

/// Named parameter map bound to a synthesized query. BTreeMap keeps the
/// preview rendering deterministic.
pub type QueryParams = BTreeMap<String, ParamValue>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declared_type_normalization() {
        assert_eq!(ColumnType::from_declared("INTEGER"), ColumnType::Integer);
        assert_eq!(ColumnType::from_declared("int"), ColumnType::Integer);
        assert_eq!(ColumnType::from_declared("BIGINT"), ColumnType::Integer);
        assert_eq!(ColumnType::from_declared("VARCHAR(40)"), ColumnType::Text);
        assert_eq!(ColumnType::from_declared("DOUBLE"), ColumnType::Real);
        assert_eq!(ColumnType::from_declared("DATETIME"), ColumnType::DateTime);
        assert_eq!(ColumnType::from_declared("TIMESTAMP"), ColumnType::Timestamp);
        assert_eq!(ColumnType::from_declared("DATE"), ColumnType::Date);
        assert_eq!(ColumnType::from_declared(""), ColumnType::Text);
        assert_eq!(ColumnType::from_declared("GEOMETRY"), ColumnType::Text);
    }

    #[test]
    fn test_schema_lookup_is_case_insensitive() {
        let mut schema = TableSchema::new();
        schema.push("Created_At", ColumnType::DateTime);

        assert!(schema.contains("created_at"));
        assert!(schema.contains("CREATED_AT"));
        assert_eq!(schema.get("created_at"), Some(ColumnType::DateTime));
        // Keys are stored lower-cased.
        assert_eq!(schema.column_names().next(), Some("created_at"));
    }

    #[test]
    fn test_schema_preserves_definition_order() {
        let schema: TableSchema = [
            ("b".to_string(), ColumnType::Text),
            ("a".to_string(), ColumnType::Integer),
            ("c".to_string(), ColumnType::Real),
        ]
        .into_iter()
        .collect();

        let names: Vec<_> = schema.column_names().collect();
        assert_eq!(names, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_cell_value_display() {
        assert_eq!(CellValue::Null.to_string(), "NULL");
        assert_eq!(CellValue::Int(7).to_string(), "7");
        assert_eq!(CellValue::Text("x".into()).to_string(), "x");
        assert_eq!(CellValue::Blob(vec![1, 2, 3]).to_string(), "<3 bytes>");
    }

    #[test]
    fn test_param_value_serialization() {
        let json = serde_json::to_string(&ParamValue::Int(5)).unwrap();
        assert_eq!(json, "5");
        let json = serde_json::to_string(&ParamValue::Text("a".into())).unwrap();
        assert_eq!(json, "\"a\"");
    }
}
