// SPDX-License-Identifier: Apache-2.0

//! Universal data types for the sentinel interceptor
//!
//! These types describe what flows through the host's row-production path:
//! relation identifiers, typed column values, rows, and the statement
//! metadata the execution loop needs.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a stored relation (table) in the host catalog.
///
/// `0` is the invalid identifier and never names a real relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RelationId(pub u32);

impl RelationId {
    pub const INVALID: RelationId = RelationId(0);

    pub fn is_valid(&self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for RelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Direction the plan is scanned in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanDirection {
    Backward,
    NoMovement,
    #[default]
    Forward,
}

impl ScanDirection {
    /// Returns true if running the plan in this direction produces no rows at all
    pub fn is_no_movement(&self) -> bool {
        matches!(self, Self::NoMovement)
    }
}

/// Kind of statement driving the executor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Select,
    Insert,
    Update,
    Delete,
    Utility,
}

impl OperationKind {
    /// Returns true for the row-producing read operation.
    ///
    /// Only these rows are counted as processed and inspected for the
    /// sentinel; for the other kinds the modifying plan node does its own
    /// bookkeeping.
    pub fn is_row_read(&self) -> bool {
        matches!(self, Self::Select)
    }
}

/// A single typed column value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Datum {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
}

impl Datum {
    pub fn is_null(&self) -> bool {
        matches!(self, Datum::Null)
    }

    /// Renders the value through its output representation.
    ///
    /// Returns `None` for SQL NULL. Booleans render as `t`/`f`, byte strings
    /// in `\x` hex form, and floats as the shortest round-trip digits with
    /// `Infinity`/`NaN` spelled out, the way a textual wire protocol shows
    /// them.
    pub fn to_text(&self) -> Option<String> {
        match self {
            Datum::Null => None,
            Datum::Bool(b) => Some(if *b { "t" } else { "f" }.to_string()),
            Datum::Int(i) => Some(i.to_string()),
            Datum::Float(f) => Some(float_text(*f)),
            Datum::Text(s) => Some(s.clone()),
            Datum::Bytes(bytes) => {
                let mut out = String::with_capacity(2 + bytes.len() * 2);
                out.push_str("\\x");
                for b in bytes {
                    out.push_str(&format!("{:02x}", b));
                }
                Some(out)
            }
        }
    }
}

/// Plain notation for decimal exponents in `-4..15`, otherwise `1.5e+20`
/// style with at least two exponent digits.
fn float_text(f: f64) -> String {
    if f.is_nan() {
        return "NaN".to_string();
    }
    if f.is_infinite() {
        return if f > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }

    let scientific = format!("{:e}", f);
    let Some((mantissa, exponent)) = scientific.split_once('e') else {
        return f.to_string();
    };
    let exponent: i32 = exponent.parse().unwrap_or(0);
    if f == 0.0 || (-4..15).contains(&exponent) {
        return f.to_string();
    }

    let sign = if exponent < 0 { '-' } else { '+' };
    format!("{}e{}{:02}", mantissa, sign, exponent.abs())
}

impl From<&str> for Datum {
    fn from(s: &str) -> Self {
        Datum::Text(s.to_string())
    }
}

impl From<String> for Datum {
    fn from(s: String) -> Self {
        Datum::Text(s)
    }
}

impl From<i64> for Datum {
    fn from(i: i64) -> Self {
        Datum::Int(i)
    }
}

impl From<bool> for Datum {
    fn from(b: bool) -> Self {
        Datum::Bool(b)
    }
}

/// A row produced by the plan
///
/// `relation` is the stored relation the row was read from. Rows synthesized
/// by joins, projections or expressions carry no relation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Row {
    pub values: Vec<Datum>,
    #[serde(default)]
    pub relation: Option<RelationId>,
}

impl Row {
    /// Creates a synthesized row with no originating relation
    pub fn new(values: Vec<Datum>) -> Self {
        Self {
            values,
            relation: None,
        }
    }

    /// Creates a row read from a stored relation
    pub fn from_relation(relation: RelationId, values: Vec<Datum>) -> Self {
        Self {
            values,
            relation: Some(relation),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns the value at a 1-based column ordinal
    pub fn get(&self, ordinal: u32) -> Option<&Datum> {
        let index = (ordinal as usize).checked_sub(1)?;
        self.values.get(index)
    }

    /// Text of the column at a 1-based ordinal.
    ///
    /// `None` when the value is NULL or the ordinal is outside the row.
    pub fn text_at(&self, ordinal: u32) -> Option<String> {
        self.get(ordinal).and_then(Datum::to_text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_rendering() {
        assert_eq!(Datum::Null.to_text(), None);
        assert_eq!(Datum::Bool(true).to_text().as_deref(), Some("t"));
        assert_eq!(Datum::Int(-42).to_text().as_deref(), Some("-42"));
        assert_eq!(Datum::Float(1.5).to_text().as_deref(), Some("1.5"));
        assert_eq!(
            Datum::Bytes(vec![0xde, 0xad]).to_text().as_deref(),
            Some("\\xdead")
        );
    }

    #[test]
    fn test_float_text_matches_wire_format() {
        let render = |f: f64| Datum::Float(f).to_text().unwrap();
        assert_eq!(render(1e20), "1e+20");
        assert_eq!(render(-2.5e100), "-2.5e+100");
        assert_eq!(render(1.2345e-5), "1.2345e-05");
        assert_eq!(render(1e14), "100000000000000");
        assert_eq!(render(1e15), "1e+15");
        assert_eq!(render(0.0001), "0.0001");
        assert_eq!(render(0.0), "0");
        assert_eq!(render(f64::INFINITY), "Infinity");
        assert_eq!(render(f64::NEG_INFINITY), "-Infinity");
        assert_eq!(render(f64::NAN), "NaN");
    }

    #[test]
    fn test_ordinals_are_one_based() {
        let row = Row::from_relation(RelationId(7), vec!["a".into(), Datum::Null, 3i64.into()]);
        assert_eq!(row.text_at(1).as_deref(), Some("a"));
        assert_eq!(row.text_at(2), None);
        assert_eq!(row.text_at(3).as_deref(), Some("3"));
        assert_eq!(row.text_at(0), None);
        assert_eq!(row.text_at(4), None);
    }

    #[test]
    fn test_only_select_is_row_read() {
        assert!(OperationKind::Select.is_row_read());
        assert!(!OperationKind::Insert.is_row_read());
        assert!(!OperationKind::Utility.is_row_read());
    }
}
