// Copyright 2024 OctoFHIR Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Values produced by expression evaluation
//!
//! [`Dynamic`] is the evaluator's working value: it may still borrow
//! collections and structures from the bound instance. [`ExprValue`] is what
//! callers receive; composite values surface as [`ExprValue::Nil`].

use super::reflect::{MapKey, Mapping, Sequence, Structure, ValueRef};
use serde::{Serialize, Serializer};
use std::borrow::Cow;
use std::fmt;

/// Working value of the evaluator
#[derive(Clone, Default)]
pub enum Dynamic<'a> {
    /// Absent value
    #[default]
    Nil,
    /// Boolean
    Bool(bool),
    /// Number; every numeric field normalizes to `f64`
    Number(f64),
    /// String, borrowed from the instance or computed
    Str(Cow<'a, str>),
    /// Sequence borrowed from the instance
    Sequence(&'a dyn Sequence),
    /// Mapping borrowed from the instance
    Mapping(&'a dyn Mapping),
    /// Structure borrowed from the instance
    Struct(&'a dyn Structure),
}

impl<'a> From<ValueRef<'a>> for Dynamic<'a> {
    fn from(value: ValueRef<'a>) -> Self {
        match value {
            ValueRef::Nil => Dynamic::Nil,
            ValueRef::Bool(b) => Dynamic::Bool(b),
            ValueRef::Int(i) => Dynamic::Number(i as f64),
            ValueRef::Uint(u) => Dynamic::Number(u as f64),
            ValueRef::Float(x) => Dynamic::Number(x),
            ValueRef::Str(s) => Dynamic::Str(Cow::Borrowed(s)),
            ValueRef::Sequence(s) => Dynamic::Sequence(s),
            ValueRef::Mapping(m) => Dynamic::Mapping(m),
            ValueRef::Struct(s) => Dynamic::Struct(s),
        }
    }
}

impl<'a> Dynamic<'a> {
    /// String value from anything convertible to a `Cow<str>`
    pub fn string(s: impl Into<Cow<'a, str>>) -> Self {
        Dynamic::Str(s.into())
    }

    /// Whether this is the absent value
    pub fn is_nil(&self) -> bool {
        matches!(self, Dynamic::Nil)
    }

    /// Boolean payload, if any
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Dynamic::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Numeric payload, if any
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Dynamic::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// String payload, if any
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Dynamic::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Type name used in diagnostics
    pub fn type_name(&self) -> &'static str {
        match self {
            Dynamic::Nil => "nil",
            Dynamic::Bool(_) => "bool",
            Dynamic::Number(_) => "number",
            Dynamic::Str(_) => "string",
            Dynamic::Sequence(_) => "sequence",
            Dynamic::Mapping(_) => "mapping",
            Dynamic::Struct(_) => "struct",
        }
    }

    /// Equality defined for every pair of values
    ///
    /// Values of different types are unequal and nil equals nil. Composite
    /// values are equal only when they are the same borrowed object.
    pub fn loose_eq(&self, other: &Dynamic<'_>) -> bool {
        match (self, other) {
            (Dynamic::Nil, Dynamic::Nil) => true,
            (Dynamic::Bool(a), Dynamic::Bool(b)) => a == b,
            (Dynamic::Number(a), Dynamic::Number(b)) => a == b,
            (Dynamic::Str(a), Dynamic::Str(b)) => a == b,
            (Dynamic::Sequence(a), Dynamic::Sequence(b)) => std::ptr::addr_eq(*a, *b),
            (Dynamic::Mapping(a), Dynamic::Mapping(b)) => std::ptr::addr_eq(*a, *b),
            (Dynamic::Struct(a), Dynamic::Struct(b)) => std::ptr::addr_eq(*a, *b),
            _ => false,
        }
    }

    /// Convert to a mapping key; only strings, integral numbers and booleans qualify
    pub fn to_map_key(&self) -> Option<MapKey<'_>> {
        match self {
            Dynamic::Str(s) => Some(MapKey::Str(s)),
            Dynamic::Number(n) => integral(*n).map(MapKey::Int),
            Dynamic::Bool(b) => Some(MapKey::Bool(*b)),
            _ => None,
        }
    }

    /// Index a sequence by position or a mapping by key
    ///
    /// Any other combination, a negative or fractional position, an out of
    /// range position and a missing key all yield nil.
    pub fn index(&self, key: &Dynamic<'_>) -> Dynamic<'a> {
        match self {
            Dynamic::Sequence(seq) => match key.as_number().and_then(integral) {
                Some(i) if i >= 0 => {
                    let seq: &'a dyn Sequence = *seq;
                    usize::try_from(i)
                        .map(|i| Dynamic::from(seq.element(i)))
                        .unwrap_or_default()
                }
                _ => Dynamic::Nil,
            },
            Dynamic::Mapping(map) => {
                let map: &'a dyn Mapping = *map;
                key.to_map_key()
                    .map(|k| Dynamic::from(map.lookup(&k)))
                    .unwrap_or_default()
            }
            _ => Dynamic::Nil,
        }
    }

    /// Length of strings (in bytes) and collections
    pub fn len(&self) -> Option<usize> {
        match self {
            Dynamic::Str(s) => Some(s.len()),
            Dynamic::Sequence(s) => Some(s.len()),
            Dynamic::Mapping(m) => Some(m.len()),
            _ => None,
        }
    }

    /// Convert into the caller-facing value
    pub fn into_expr_value(self) -> ExprValue {
        match self {
            Dynamic::Bool(b) => ExprValue::Bool(b),
            Dynamic::Number(n) => ExprValue::Number(n),
            Dynamic::Str(s) => ExprValue::String(s.into_owned()),
            Dynamic::Nil | Dynamic::Sequence(_) | Dynamic::Mapping(_) | Dynamic::Struct(_) => {
                ExprValue::Nil
            }
        }
    }
}

impl From<ExprValue> for Dynamic<'_> {
    fn from(value: ExprValue) -> Self {
        match value {
            ExprValue::Nil => Dynamic::Nil,
            ExprValue::Bool(b) => Dynamic::Bool(b),
            ExprValue::Number(n) => Dynamic::Number(n),
            ExprValue::String(s) => Dynamic::string(s),
        }
    }
}

/// Exact integer value of `n`, if it has one
pub(crate) fn integral(n: f64) -> Option<i64> {
    (n.fract() == 0.0 && n >= i64::MIN as f64 && n < i64::MAX as f64).then_some(n as i64)
}

impl fmt::Debug for Dynamic<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dynamic::Nil => f.write_str("Nil"),
            Dynamic::Bool(b) => write!(f, "Bool({b})"),
            Dynamic::Number(n) => write!(f, "Number({n})"),
            Dynamic::Str(s) => write!(f, "Str({s:?})"),
            Dynamic::Sequence(s) => write!(f, "Sequence(len={})", s.len()),
            Dynamic::Mapping(m) => write!(f, "Mapping(len={})", m.len()),
            Dynamic::Struct(s) => write!(f, "Struct({})", s.type_name()),
        }
    }
}

/// Result of evaluating one selector
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ExprValue {
    /// Absent value
    #[default]
    Nil,
    /// Boolean
    Bool(bool),
    /// Number
    Number(f64),
    /// String
    String(String),
}

impl ExprValue {
    /// Whether this is the absent value
    pub fn is_nil(&self) -> bool {
        matches!(self, ExprValue::Nil)
    }

    /// Boolean payload, if any
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ExprValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Numeric payload, if any
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ExprValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// String payload, if any
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ExprValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Type name used in diagnostics
    pub fn type_name(&self) -> &'static str {
        match self {
            ExprValue::Nil => "nil",
            ExprValue::Bool(_) => "bool",
            ExprValue::Number(_) => "number",
            ExprValue::String(_) => "string",
        }
    }
}

impl From<bool> for ExprValue {
    fn from(value: bool) -> Self {
        ExprValue::Bool(value)
    }
}

impl From<f64> for ExprValue {
    fn from(value: f64) -> Self {
        ExprValue::Number(value)
    }
}

impl From<i64> for ExprValue {
    fn from(value: i64) -> Self {
        ExprValue::Number(value as f64)
    }
}

impl From<&str> for ExprValue {
    fn from(value: &str) -> Self {
        ExprValue::String(value.to_string())
    }
}

impl From<String> for ExprValue {
    fn from(value: String) -> Self {
        ExprValue::String(value)
    }
}

/// Integral numbers become JSON integers; non-finite numbers become null
impl From<ExprValue> for serde_json::Value {
    fn from(value: ExprValue) -> Self {
        match value {
            ExprValue::Nil => serde_json::Value::Null,
            ExprValue::Bool(b) => serde_json::Value::Bool(b),
            ExprValue::Number(n) => match integral(n) {
                Some(i) => serde_json::Value::from(i),
                None => serde_json::Number::from_f64(n)
                    .map_or(serde_json::Value::Null, serde_json::Value::Number),
            },
            ExprValue::String(s) => serde_json::Value::String(s),
        }
    }
}

impl Serialize for ExprValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let json_value: serde_json::Value = self.clone().into();
        json_value.serialize(serializer)
    }
}

impl fmt::Display for ExprValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExprValue::Nil => f.write_str("nil"),
            ExprValue::Bool(b) => write!(f, "{b}"),
            ExprValue::Number(n) => write!(f, "{n}"),
            ExprValue::String(s) => f.write_str(s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_loose_equality() {
        assert!(Dynamic::Nil.loose_eq(&Dynamic::Nil));
        assert!(Dynamic::Number(3.0).loose_eq(&Dynamic::Number(3.0)));
        assert!(Dynamic::string("a").loose_eq(&Dynamic::string(String::from("a"))));
        assert!(!Dynamic::Number(1.0).loose_eq(&Dynamic::string("1")));
        assert!(!Dynamic::Bool(false).loose_eq(&Dynamic::Nil));

        let items = vec![1, 2];
        let other = vec![1, 2];
        let seq = Dynamic::Sequence(&items);
        assert!(seq.loose_eq(&Dynamic::Sequence(&items)));
        assert!(!seq.loose_eq(&Dynamic::Sequence(&other)));
    }

    #[test]
    fn test_index_rules() {
        let items = vec![String::from("a"), String::from("b")];
        let seq = Dynamic::Sequence(&items);
        assert_eq!(seq.index(&Dynamic::Number(1.0)).as_str(), Some("b"));
        assert!(seq.index(&Dynamic::Number(2.0)).is_nil());
        assert!(seq.index(&Dynamic::Number(-1.0)).is_nil());
        assert!(seq.index(&Dynamic::Number(0.5)).is_nil());
        assert!(seq.index(&Dynamic::string("0")).is_nil());
        assert!(Dynamic::string("abc").index(&Dynamic::Number(0.0)).is_nil());
    }

    #[test]
    fn test_composites_surface_as_nil() {
        let items = vec![1u8];
        assert_eq!(Dynamic::Sequence(&items).into_expr_value(), ExprValue::Nil);
        assert_eq!(
            Dynamic::Number(6.0).into_expr_value(),
            ExprValue::Number(6.0)
        );
    }

    #[test]
    fn test_expr_value_conversions() {
        assert_eq!(serde_json::Value::from(ExprValue::Number(6.0)), serde_json::json!(6));
        assert_eq!(
            serde_json::Value::from(ExprValue::Number(1.5)),
            serde_json::json!(1.5)
        );
        assert_eq!(
            serde_json::Value::from(ExprValue::Number(f64::NAN)),
            serde_json::Value::Null
        );
        assert_eq!(serde_json::to_string(&ExprValue::from("x")).unwrap(), "\"x\"");
        assert_eq!(ExprValue::Number(6.0).to_string(), "6");
        assert_eq!(ExprValue::Nil.to_string(), "nil");
        assert_eq!(ExprValue::from(3i64), ExprValue::Number(3.0));
    }
}
