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

//! Runtime reflection traits
//!
//! [`Reflect`] turns a live value into a borrowed [`ValueRef`] view that the
//! binder walks. Pointer layers (`Option`, `Box`, `Arc`, `Rc`) are peeled in
//! `reflect`, so a `ValueRef` never describes a pointer.

use super::kind::{Kind, ScalarKind, StructDescriptor};
use std::fmt;

/// A type whose values can be inspected by the expression engine
pub trait Reflect {
    /// Static kind of the type
    fn kind() -> Kind
    where
        Self: Sized;

    /// Borrowed view of this value
    fn reflect(&self) -> ValueRef<'_>;
}

/// A structure with named fields
///
/// Usually implemented through `#[derive(Reflect)]`.
pub trait Structure {
    /// Static description of the fields
    fn descriptor() -> StructDescriptor
    where
        Self: Sized;

    /// Value of the field at `index` in descriptor order
    fn field(&self, index: usize) -> ValueRef<'_>;

    /// Type name, for diagnostics
    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// An indexable ordered collection
pub trait Sequence {
    /// Number of elements
    fn len(&self) -> usize;

    /// Element at `index`; out of range yields [`ValueRef::Nil`]
    fn element(&self, index: usize) -> ValueRef<'_>;

    /// Whether the collection is empty
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A keyed collection
pub trait Mapping {
    /// Number of entries
    fn len(&self) -> usize;

    /// Value stored under `key`; a missing or mistyped key yields [`ValueRef::Nil`]
    fn lookup(&self, key: &MapKey<'_>) -> ValueRef<'_>;

    /// Whether the collection is empty
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Key used to look up a [`Mapping`] entry
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MapKey<'a> {
    /// String key
    Str(&'a str),
    /// Integral key
    Int(i64),
    /// Boolean key
    Bool(bool),
}

/// A type usable as a mapping key
pub trait ReflectKey: Sized {
    /// Scalar kind of the key
    fn scalar_kind() -> ScalarKind;

    /// Convert a lookup key; keys of another type do not convert
    fn from_key(key: &MapKey<'_>) -> Option<Self>;
}

impl ReflectKey for String {
    fn scalar_kind() -> ScalarKind {
        ScalarKind::String
    }

    fn from_key(key: &MapKey<'_>) -> Option<Self> {
        match key {
            MapKey::Str(s) => Some((*s).to_string()),
            _ => None,
        }
    }
}

impl ReflectKey for bool {
    fn scalar_kind() -> ScalarKind {
        ScalarKind::Bool
    }

    fn from_key(key: &MapKey<'_>) -> Option<Self> {
        match key {
            MapKey::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

macro_rules! impl_integer_key {
    ($kind:expr => $($ty:ty),*) => {
        $(
            impl ReflectKey for $ty {
                fn scalar_kind() -> ScalarKind {
                    $kind
                }

                fn from_key(key: &MapKey<'_>) -> Option<Self> {
                    match key {
                        MapKey::Int(i) => <$ty>::try_from(*i).ok(),
                        _ => None,
                    }
                }
            }
        )*
    };
}

impl_integer_key!(ScalarKind::Int => i8, i16, i32, i64, isize);
impl_integer_key!(ScalarKind::Uint => u8, u16, u32, u64, usize);

/// Borrowed view of a live value
#[derive(Clone, Copy, Default)]
pub enum ValueRef<'a> {
    /// Absent value (empty pointer, missing element)
    #[default]
    Nil,
    /// Boolean
    Bool(bool),
    /// Signed integer
    Int(i64),
    /// Unsigned integer
    Uint(u64),
    /// Floating point
    Float(f64),
    /// String
    Str(&'a str),
    /// Ordered collection
    Sequence(&'a dyn Sequence),
    /// Keyed collection
    Mapping(&'a dyn Mapping),
    /// Nested structure
    Struct(&'a dyn Structure),
}

impl<'a> ValueRef<'a> {
    /// Whether this is the absent value
    pub fn is_nil(&self) -> bool {
        matches!(self, ValueRef::Nil)
    }

    /// Short name of the value's kind
    pub fn kind_name(&self) -> &'static str {
        match self {
            ValueRef::Nil => "nil",
            ValueRef::Bool(_) => "bool",
            ValueRef::Int(_) => "int",
            ValueRef::Uint(_) => "uint",
            ValueRef::Float(_) => "float",
            ValueRef::Str(_) => "string",
            ValueRef::Sequence(_) => "sequence",
            ValueRef::Mapping(_) => "mapping",
            ValueRef::Struct(_) => "struct",
        }
    }

    /// Field `index` of a structure; anything else yields nil
    pub fn field(self, index: usize) -> ValueRef<'a> {
        match self {
            ValueRef::Struct(s) => s.field(index),
            _ => ValueRef::Nil,
        }
    }

    /// Entry under `key` of a mapping; anything else yields nil
    pub fn lookup(self, key: &MapKey<'_>) -> ValueRef<'a> {
        match self {
            ValueRef::Mapping(m) => m.lookup(key),
            _ => ValueRef::Nil,
        }
    }

    /// Element `index` of a sequence; anything else yields nil
    pub fn element(self, index: usize) -> ValueRef<'a> {
        match self {
            ValueRef::Sequence(s) => s.element(index),
            _ => ValueRef::Nil,
        }
    }
}

impl fmt::Debug for ValueRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueRef::Nil => f.write_str("Nil"),
            ValueRef::Bool(b) => write!(f, "Bool({b})"),
            ValueRef::Int(i) => write!(f, "Int({i})"),
            ValueRef::Uint(u) => write!(f, "Uint({u})"),
            ValueRef::Float(x) => write!(f, "Float({x})"),
            ValueRef::Str(s) => write!(f, "Str({s:?})"),
            ValueRef::Sequence(s) => write!(f, "Sequence(len={})", s.len()),
            ValueRef::Mapping(m) => write!(f, "Mapping(len={})", m.len()),
            ValueRef::Struct(s) => write!(f, "Struct({})", s.type_name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_keys_reject_other_types() {
        assert_eq!(u8::from_key(&MapKey::Int(7)), Some(7));
        assert_eq!(u8::from_key(&MapKey::Int(-1)), None);
        assert_eq!(i64::from_key(&MapKey::Str("7")), None);
        assert_eq!(String::from_key(&MapKey::Int(0)), None);
        assert_eq!(bool::from_key(&MapKey::Bool(true)), Some(true));
    }

    #[test]
    fn test_navigation_on_wrong_kind_is_nil() {
        let value = ValueRef::Int(3);
        assert!(value.field(0).is_nil());
        assert!(value.element(0).is_nil());
        assert!(value.lookup(&MapKey::Str("a")).is_nil());
        assert_eq!(value.kind_name(), "int");
    }
}
