//! Type-directed scalar parsing for structured formats
//!
//! JSON and YAML output carry typed values, so every raw column value is
//! parsed according to the column's [`ScalarKind`] before serialization.
//! A value that belongs to a typed column but does not parse is an error,
//! never silently emitted as text.

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::error::FormatError;
use crate::source::{ColumnDescriptor, ScalarKind};

/// Floats without a fractional part below this magnitude print as integers.
const EXACT_INTEGER_LIMIT: f64 = 9_007_199_254_740_992.0;

/// A parsed column value
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Text(String),
}

impl Scalar {
    /// Parse a raw value into the given kind
    ///
    /// # Arguments
    /// * `raw` - Raw bytes, or None for an absent value
    /// * `kind` - Scalar kind of the column
    ///
    /// # Returns
    /// * `Option<Scalar>` - Parsed value, or None when the bytes do not fit the kind
    ///
    /// NaN, infinities and literals that overflow `f64` do not fit a float
    /// column; JSON has no spelling for them.
    pub fn parse(raw: Option<&[u8]>, kind: ScalarKind) -> Option<Self> {
        let Some(raw) = raw else {
            return Some(Scalar::Null);
        };
        let text = String::from_utf8_lossy(raw);

        match kind {
            ScalarKind::Boolean => parse_bool(&text).map(Scalar::Bool),
            ScalarKind::Integer => text
                .parse::<i64>()
                .map(Scalar::Int)
                .or_else(|_| text.parse::<u64>().map(Scalar::UInt))
                .ok(),
            ScalarKind::Float => text
                .parse::<f64>()
                .ok()
                .filter(|f| f.is_finite())
                .map(Scalar::Float),
            ScalarKind::Text => Some(Scalar::Text(text.into_owned())),
        }
    }
}

/// Accepts the same spellings as Go's `strconv.ParseBool`, which is what
/// PostgreSQL and MySQL drivers hand back (`t`/`f`, `1`/`0`).
fn parse_bool(text: &str) -> Option<bool> {
    match text {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

impl Serialize for Scalar {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Scalar::Null => serializer.serialize_unit(),
            Scalar::Bool(b) => serializer.serialize_bool(*b),
            Scalar::Int(i) => serializer.serialize_i64(*i),
            Scalar::UInt(u) => serializer.serialize_u64(*u),
            Scalar::Float(f) => {
                if f.fract() == 0.0 && f.abs() < EXACT_INTEGER_LIMIT {
                    serializer.serialize_i64(*f as i64)
                } else {
                    serializer.serialize_f64(*f)
                }
            }
            Scalar::Text(s) => serializer.serialize_str(s),
        }
    }
}

/// Column names and kinds resolved once per export
///
/// When several columns share a name (`SELECT a.id, b.id`), only the last of
/// them becomes an object key; the earlier ones are left out of the record.
#[derive(Debug, Clone)]
pub struct TypedColumns {
    names: Vec<String>,
    kinds: Vec<ScalarKind>,
    shadowed: Vec<bool>,
}

impl TypedColumns {
    pub fn new(columns: &[ColumnDescriptor]) -> Self {
        let names: Vec<String> = columns.iter().map(|c| c.name().to_string()).collect();
        let shadowed = names
            .iter()
            .enumerate()
            .map(|(i, name)| names[i + 1..].contains(name))
            .collect();

        Self {
            kinds: columns.iter().map(ColumnDescriptor::scalar_kind).collect(),
            names,
            shadowed,
        }
    }

    fn len(&self) -> usize {
        self.names.len()
    }

    /// Parse one record into an ordered column → value mapping
    ///
    /// # Arguments
    /// * `values` - Raw values, one per column
    ///
    /// # Returns
    /// * `Result<Record<'_>, FormatError>` - Parsed record, or a length or parse error
    pub fn record(&self, values: &[Option<Vec<u8>>]) -> Result<Record<'_>, FormatError> {
        check_length(self.len(), values.len())?;

        let values = values
            .iter()
            .zip(self.names.iter().zip(&self.kinds))
            .map(|(raw, (name, kind))| {
                Scalar::parse(raw.as_deref(), *kind).ok_or_else(|| FormatError::Parse {
                    column: name.clone(),
                    value: raw
                        .as_deref()
                        .map(|r| String::from_utf8_lossy(r).into_owned())
                        .unwrap_or_default(),
                    kind: *kind,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Record {
            names: &self.names,
            shadowed: &self.shadowed,
            values,
        })
    }
}

/// Fail unless a record carries exactly one value per column.
pub(crate) fn check_length(expected: usize, found: usize) -> Result<(), FormatError> {
    if expected == found {
        Ok(())
    } else {
        Err(FormatError::RecordLength { expected, found })
    }
}

/// A parsed record; serializes as a map in column order
#[derive(Debug)]
pub struct Record<'a> {
    names: &'a [String],
    shadowed: &'a [bool],
    values: Vec<Scalar>,
}

impl Serialize for Record<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let entries = self.shadowed.iter().filter(|shadowed| !**shadowed).count();
        let mut map = serializer.serialize_map(Some(entries))?;
        for ((name, value), shadowed) in self.names.iter().zip(&self.values).zip(self.shadowed) {
            if !shadowed {
                map.serialize_entry(name, value)?;
            }
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bytes(s: &str) -> Option<Vec<u8>> {
        Some(s.as_bytes().to_vec())
    }

    #[test]
    fn test_parse_by_kind() {
        assert_eq!(
            Scalar::parse(Some(b"t"), ScalarKind::Boolean),
            Some(Scalar::Bool(true))
        );
        assert_eq!(
            Scalar::parse(Some(b"0"), ScalarKind::Boolean),
            Some(Scalar::Bool(false))
        );
        assert_eq!(
            Scalar::parse(Some(b"-42"), ScalarKind::Integer),
            Some(Scalar::Int(-42))
        );
        assert_eq!(
            Scalar::parse(Some(b"18446744073709551615"), ScalarKind::Integer),
            Some(Scalar::UInt(u64::MAX))
        );
        assert_eq!(
            Scalar::parse(Some(b"12.12"), ScalarKind::Float),
            Some(Scalar::Float(12.12))
        );
        assert_eq!(
            Scalar::parse(Some(b"12.12"), ScalarKind::Text),
            Some(Scalar::Text("12.12".to_string()))
        );
        assert_eq!(Scalar::parse(None, ScalarKind::Integer), Some(Scalar::Null));
    }

    #[test]
    fn test_empty_value_is_not_null() {
        assert_eq!(
            Scalar::parse(Some(b""), ScalarKind::Text),
            Some(Scalar::Text(String::new()))
        );
        assert_eq!(Scalar::parse(Some(b""), ScalarKind::Integer), None);
    }

    #[test]
    fn test_parse_failures() {
        assert_eq!(Scalar::parse(Some(b"yes"), ScalarKind::Boolean), None);
        assert_eq!(Scalar::parse(Some(b"1.5"), ScalarKind::Integer), None);
        assert_eq!(Scalar::parse(Some(b"abc"), ScalarKind::Float), None);
    }

    #[test]
    fn test_non_finite_floats_rejected() {
        for raw in ["NaN", "inf", "-Infinity", "1e400", "-1e400"] {
            assert_eq!(
                Scalar::parse(Some(raw.as_bytes()), ScalarKind::Float),
                None,
                "{raw}"
            );
        }
        assert_eq!(
            Scalar::parse(Some(b"1e300"), ScalarKind::Float),
            Some(Scalar::Float(1e300))
        );
    }

    #[test]
    fn test_float_serialization() {
        assert_eq!(serde_json::to_string(&Scalar::Float(100.0)).unwrap(), "100");
        assert_eq!(serde_json::to_string(&Scalar::Float(12.12)).unwrap(), "12.12");
        assert_eq!(serde_json::to_string(&Scalar::Float(-0.5)).unwrap(), "-0.5");
        assert_eq!(serde_json::to_string(&Scalar::Null).unwrap(), "null");
    }

    #[test]
    fn test_record_in_column_order() {
        let columns = TypedColumns::new(&[
            ColumnDescriptor::new("zeta", "INTEGER"),
            ColumnDescriptor::new("alpha", "TEXT"),
        ]);
        let record = columns.record(&[bytes("7"), None]).unwrap();

        assert_eq!(
            serde_json::to_string(&record).unwrap(),
            r#"{"zeta":7,"alpha":null}"#
        );
    }

    #[test]
    fn test_duplicate_column_names_keep_last_value() {
        let columns = TypedColumns::new(&[
            ColumnDescriptor::new("id", "INTEGER"),
            ColumnDescriptor::new("name", "TEXT"),
            ColumnDescriptor::new("id", "INTEGER"),
        ]);
        let record = columns
            .record(&[bytes("1"), bytes("left"), bytes("2")])
            .unwrap();

        assert_eq!(
            serde_json::to_string(&record).unwrap(),
            r#"{"name":"left","id":2}"#
        );
    }

    #[test]
    fn test_record_errors() {
        let columns = TypedColumns::new(&[
            ColumnDescriptor::new("id", "INTEGER"),
            ColumnDescriptor::new("name", "TEXT"),
        ]);

        assert!(matches!(
            columns.record(&[bytes("1")]),
            Err(FormatError::RecordLength {
                expected: 2,
                found: 1
            })
        ));
        assert!(matches!(
            columns.record(&[bytes("one"), bytes("x")]),
            Err(FormatError::Parse { column, kind: ScalarKind::Integer, .. }) if column == "id"
        ));
    }
}
