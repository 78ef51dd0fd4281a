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

//! Reflection of `serde_json::Value` fields
//!
//! JSON values have no static shape, so they reflect as [`Kind::Dynamic`] and
//! are navigated by key at evaluation time.

use super::kind::Kind;
use super::reflect::{MapKey, Mapping, Reflect, ValueRef};
use serde_json::{Map, Value};

impl Reflect for Value {
    fn kind() -> Kind {
        Kind::Dynamic
    }

    fn reflect(&self) -> ValueRef<'_> {
        match self {
            Value::Null => ValueRef::Nil,
            Value::Bool(b) => ValueRef::Bool(*b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    ValueRef::Int(i)
                } else if let Some(u) = n.as_u64() {
                    ValueRef::Uint(u)
                } else {
                    n.as_f64().map_or(ValueRef::Nil, ValueRef::Float)
                }
            }
            Value::String(s) => ValueRef::Str(s),
            Value::Array(items) => ValueRef::Sequence(items),
            Value::Object(map) => ValueRef::Mapping(map),
        }
    }
}

impl Mapping for Map<String, Value> {
    fn len(&self) -> usize {
        Map::len(self)
    }

    fn lookup(&self, key: &MapKey<'_>) -> ValueRef<'_> {
        match key {
            MapKey::Str(k) => self.get(*k).map_or(ValueRef::Nil, Reflect::reflect),
            _ => ValueRef::Nil,
        }
    }
}
