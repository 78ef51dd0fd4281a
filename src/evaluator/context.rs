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

//! Binding of live instances to compiled shapes

use super::error::{BindError, BindResult};
use crate::compiler::CompiledShape;
use crate::model::{Reflect, Structure, ValueRef};
use once_cell::unsync::OnceCell;
use std::fmt;
use std::sync::Arc;

/// A compiled shape bound to one borrowed instance
///
/// Field values are read on first use and memoized for the lifetime of the
/// binding; binding itself reads nothing.
pub struct BoundContext<'a> {
    shape: Arc<CompiledShape>,
    root: &'a dyn Structure,
    values: Vec<OnceCell<ValueRef<'a>>>,
}

impl<'a> BoundContext<'a> {
    /// Bind `instance` to `shape`
    pub fn bind<T: Reflect>(shape: Arc<CompiledShape>, instance: &'a T) -> BindResult<Self> {
        let type_name = || std::any::type_name::<T>().to_string();

        let actual = T::kind()
            .as_struct()
            .ok_or_else(|| BindError::NotAStructure {
                type_name: type_name(),
            })?;
        if actual.id != shape.id() {
            return Err(BindError::ShapeMismatch {
                expected: shape.id().name().to_string(),
                actual: actual.id.name().to_string(),
            });
        }

        let root = match instance.reflect() {
            ValueRef::Struct(root) => root,
            ValueRef::Nil => {
                return Err(BindError::NilInstance {
                    type_name: type_name(),
                });
            }
            _ => {
                return Err(BindError::NotAStructure {
                    type_name: type_name(),
                });
            }
        };

        let values = std::iter::repeat_with(OnceCell::new)
            .take(shape.fields().len())
            .collect();
        Ok(Self {
            shape,
            root,
            values,
        })
    }

    /// The bound shape
    pub fn shape(&self) -> &Arc<CompiledShape> {
        &self.shape
    }

    /// Live value of the field at `slot`; nil past an empty pointer
    pub fn field(&self, slot: usize) -> ValueRef<'a> {
        match self.values.get(slot) {
            Some(cell) => *cell.get_or_init(|| self.read(slot)),
            None => ValueRef::Nil,
        }
    }

    fn read(&self, slot: usize) -> ValueRef<'a> {
        let Some(field) = self.shape.fields().get(slot) else {
            return ValueRef::Nil;
        };
        let container = match field.parent() {
            Some(parent) => self.field(parent),
            None => ValueRef::Struct(self.root),
        };
        let value = container.field(field.index());
        log::trace!("Read '{}' as {}", field.path(), value.kind_name());
        value
    }
}

impl fmt::Debug for BoundContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundContext")
            .field("shape", &self.shape.id())
            .field(
                "read",
                &self.values.iter().filter(|cell| cell.get().is_some()).count(),
            )
            .finish()
    }
}
