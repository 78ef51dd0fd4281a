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

//! [`Reflect`] implementations for standard library and ecosystem types

use super::kind::{Kind, ScalarKind};
use super::reflect::{MapKey, Mapping, Reflect, ReflectKey, Sequence, ValueRef};
use indexmap::IndexMap;
use smallvec::SmallVec;
use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::hash::{BuildHasher, Hash};
use std::rc::Rc;
use std::sync::Arc;

impl Reflect for bool {
    fn kind() -> Kind {
        Kind::Scalar(ScalarKind::Bool)
    }

    fn reflect(&self) -> ValueRef<'_> {
        ValueRef::Bool(*self)
    }
}

macro_rules! impl_reflect_number {
    ($scalar:expr, $variant:ident as $target:ty => $($ty:ty),*) => {
        $(
            impl Reflect for $ty {
                fn kind() -> Kind {
                    Kind::Scalar($scalar)
                }

                fn reflect(&self) -> ValueRef<'_> {
                    ValueRef::$variant(*self as $target)
                }
            }
        )*
    };
}

impl_reflect_number!(ScalarKind::Int, Int as i64 => i8, i16, i32, i64, isize);
impl_reflect_number!(ScalarKind::Uint, Uint as u64 => u8, u16, u32, u64, usize);
impl_reflect_number!(ScalarKind::Float, Float as f64 => f32, f64);

impl Reflect for String {
    fn kind() -> Kind {
        Kind::Scalar(ScalarKind::String)
    }

    fn reflect(&self) -> ValueRef<'_> {
        ValueRef::Str(self.as_str())
    }
}

impl Reflect for &str {
    fn kind() -> Kind {
        Kind::Scalar(ScalarKind::String)
    }

    fn reflect(&self) -> ValueRef<'_> {
        ValueRef::Str(self)
    }
}

impl Reflect for Cow<'_, str> {
    fn kind() -> Kind {
        Kind::Scalar(ScalarKind::String)
    }

    fn reflect(&self) -> ValueRef<'_> {
        ValueRef::Str(self.as_ref())
    }
}

// Pointers

impl<T: Reflect> Reflect for Option<T> {
    fn kind() -> Kind {
        Kind::Pointer(Box::new(T::kind()))
    }

    fn reflect(&self) -> ValueRef<'_> {
        match self {
            Some(value) => value.reflect(),
            None => ValueRef::Nil,
        }
    }
}

macro_rules! impl_reflect_pointer {
    ($($ptr:ident),*) => {
        $(
            impl<T: Reflect> Reflect for $ptr<T> {
                fn kind() -> Kind {
                    Kind::Pointer(Box::new(T::kind()))
                }

                fn reflect(&self) -> ValueRef<'_> {
                    (**self).reflect()
                }
            }
        )*
    };
}

impl_reflect_pointer!(Box, Arc, Rc);

// Sequences

impl<T: Reflect> Sequence for Vec<T> {
    fn len(&self) -> usize {
        self.as_slice().len()
    }

    fn element(&self, index: usize) -> ValueRef<'_> {
        self.get(index).map_or(ValueRef::Nil, Reflect::reflect)
    }
}

impl<T: Reflect> Reflect for Vec<T> {
    fn kind() -> Kind {
        Kind::Sequence {
            element: Box::new(T::kind()),
            len: None,
        }
    }

    fn reflect(&self) -> ValueRef<'_> {
        ValueRef::Sequence(self)
    }
}

impl<T: Reflect, const N: usize> Sequence for [T; N] {
    fn len(&self) -> usize {
        N
    }

    fn element(&self, index: usize) -> ValueRef<'_> {
        self.get(index).map_or(ValueRef::Nil, Reflect::reflect)
    }
}

impl<T: Reflect, const N: usize> Reflect for [T; N] {
    fn kind() -> Kind {
        Kind::Sequence {
            element: Box::new(T::kind()),
            len: Some(N),
        }
    }

    fn reflect(&self) -> ValueRef<'_> {
        ValueRef::Sequence(self)
    }
}

impl<T: Reflect> Sequence for VecDeque<T> {
    fn len(&self) -> usize {
        VecDeque::len(self)
    }

    fn element(&self, index: usize) -> ValueRef<'_> {
        self.get(index).map_or(ValueRef::Nil, Reflect::reflect)
    }
}

impl<T: Reflect> Reflect for VecDeque<T> {
    fn kind() -> Kind {
        Kind::Sequence {
            element: Box::new(T::kind()),
            len: None,
        }
    }

    fn reflect(&self) -> ValueRef<'_> {
        ValueRef::Sequence(self)
    }
}

impl<A> Sequence for SmallVec<A>
where
    A: smallvec::Array,
    A::Item: Reflect,
{
    fn len(&self) -> usize {
        SmallVec::len(self)
    }

    fn element(&self, index: usize) -> ValueRef<'_> {
        self.get(index).map_or(ValueRef::Nil, Reflect::reflect)
    }
}

impl<A> Reflect for SmallVec<A>
where
    A: smallvec::Array,
    A::Item: Reflect,
{
    fn kind() -> Kind {
        Kind::Sequence {
            element: Box::new(<A::Item as Reflect>::kind()),
            len: None,
        }
    }

    fn reflect(&self) -> ValueRef<'_> {
        ValueRef::Sequence(self)
    }
}

// Mappings

impl<K, V, S> Mapping for HashMap<K, V, S>
where
    K: ReflectKey + Eq + Hash,
    V: Reflect,
    S: BuildHasher,
{
    fn len(&self) -> usize {
        HashMap::len(self)
    }

    fn lookup(&self, key: &MapKey<'_>) -> ValueRef<'_> {
        K::from_key(key)
            .and_then(|k| self.get(&k))
            .map_or(ValueRef::Nil, Reflect::reflect)
    }
}

impl<K, V, S> Reflect for HashMap<K, V, S>
where
    K: ReflectKey + Eq + Hash,
    V: Reflect,
    S: BuildHasher,
{
    fn kind() -> Kind {
        Kind::Mapping {
            key: K::scalar_kind(),
            value: Box::new(V::kind()),
        }
    }

    fn reflect(&self) -> ValueRef<'_> {
        ValueRef::Mapping(self)
    }
}

impl<K, V> Mapping for BTreeMap<K, V>
where
    K: ReflectKey + Ord,
    V: Reflect,
{
    fn len(&self) -> usize {
        BTreeMap::len(self)
    }

    fn lookup(&self, key: &MapKey<'_>) -> ValueRef<'_> {
        K::from_key(key)
            .and_then(|k| self.get(&k))
            .map_or(ValueRef::Nil, Reflect::reflect)
    }
}

impl<K, V> Reflect for BTreeMap<K, V>
where
    K: ReflectKey + Ord,
    V: Reflect,
{
    fn kind() -> Kind {
        Kind::Mapping {
            key: K::scalar_kind(),
            value: Box::new(V::kind()),
        }
    }

    fn reflect(&self) -> ValueRef<'_> {
        ValueRef::Mapping(self)
    }
}

impl<K, V, S> Mapping for IndexMap<K, V, S>
where
    K: ReflectKey + Eq + Hash,
    V: Reflect,
    S: BuildHasher,
{
    fn len(&self) -> usize {
        IndexMap::len(self)
    }

    fn lookup(&self, key: &MapKey<'_>) -> ValueRef<'_> {
        K::from_key(key)
            .and_then(|k| self.get(&k))
            .map_or(ValueRef::Nil, Reflect::reflect)
    }
}

impl<K, V, S> Reflect for IndexMap<K, V, S>
where
    K: ReflectKey + Eq + Hash,
    V: Reflect,
    S: BuildHasher,
{
    fn kind() -> Kind {
        Kind::Mapping {
            key: K::scalar_kind(),
            value: Box::new(V::kind()),
        }
    }

    fn reflect(&self) -> ValueRef<'_> {
        ValueRef::Mapping(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_scalar_kinds() {
        assert_eq!(<u8 as Reflect>::kind(), Kind::Scalar(ScalarKind::Uint));
        assert_eq!(<f32 as Reflect>::kind(), Kind::Scalar(ScalarKind::Float));
        assert_eq!(
            <Option<Box<i32>> as Reflect>::kind().to_string(),
            "**int"
        );
        assert_eq!(<[i64; 3] as Reflect>::kind().to_string(), "[3]int");
        assert_eq!(
            <HashMap<String, Vec<f64>> as Reflect>::kind().to_string(),
            "map[string][]float"
        );
    }

    #[test]
    fn test_pointers_are_peeled() {
        let value: Option<Box<Option<i32>>> = Some(Box::new(Some(3)));
        assert!(matches!(value.reflect(), ValueRef::Int(3)));

        let empty: Option<Box<Option<i32>>> = Some(Box::new(None));
        assert!(empty.reflect().is_nil());

        let shared = Arc::new(String::from("ddd"));
        assert!(matches!(shared.reflect(), ValueRef::Str("ddd")));
    }

    #[test]
    fn test_sequence_access() {
        let items = vec![String::from("a"), String::from("hehe")];
        let value = items.reflect();
        assert!(matches!(value.element(1), ValueRef::Str("hehe")));
        assert!(value.element(10).is_nil());

        let array = [1u8, 2, 3];
        match array.reflect() {
            ValueRef::Sequence(seq) => assert_eq!(seq.len(), 3),
            other => panic!("expected sequence, got {other:?}"),
        }
    }

    #[test]
    fn test_mapping_lookup_uses_key_type() {
        let mut map = HashMap::new();
        map.insert(String::from("a"), 7i64);
        let value = map.reflect();
        assert!(matches!(value.lookup(&MapKey::Str("a")), ValueRef::Int(7)));
        assert!(value.lookup(&MapKey::Str("b")).is_nil());
        assert!(value.lookup(&MapKey::Int(0)).is_nil());

        let mut ordered = BTreeMap::new();
        ordered.insert(2u32, true);
        assert!(matches!(
            ordered.reflect().lookup(&MapKey::Int(2)),
            ValueRef::Bool(true)
        ));
    }
}
