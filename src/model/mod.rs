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

//! Reflection data model and evaluation values
//!
//! Rust has no runtime reflection, so every type that takes part in
//! evaluation implements [`Reflect`]. Structures usually derive it together
//! with [`Structure`] through `#[derive(Reflect)]`.

pub mod impls;
pub mod json;
pub mod kind;
pub mod reflect;
pub mod value;

pub use kind::{FieldDescriptor, Kind, ScalarKind, ShapeId, StructDescriptor, StructRef, Tags};
pub use reflect::{MapKey, Mapping, Reflect, ReflectKey, Sequence, Structure, ValueRef};
pub use value::{Dynamic, ExprValue};
