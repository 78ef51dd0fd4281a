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

//! Static structural description of reflected types
//!
//! A [`Kind`] describes what a type looks like independent of any instance.
//! Nested structures are referenced lazily through [`StructRef`] so that
//! self-referential types can be described without infinite recursion.

use super::reflect::Structure;
use std::any::TypeId;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Scalar kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    /// Boolean
    Bool,
    /// Signed integer
    Int,
    /// Unsigned integer
    Uint,
    /// Floating point
    Float,
    /// String
    String,
}

impl ScalarKind {
    /// Short type name used in diagnostics
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Uint => "uint",
            Self::Float => "float",
            Self::String => "string",
        }
    }
}

/// Identity of a structure type
#[derive(Debug, Clone, Copy)]
pub struct ShapeId {
    type_id: TypeId,
    name: &'static str,
}

impl ShapeId {
    /// Identity of `T`
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// Underlying type id
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Fully qualified type name
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for ShapeId {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for ShapeId {}

impl Hash for ShapeId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}

impl fmt::Display for ShapeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Lazy reference to a nested structure's descriptor
#[derive(Clone, Copy)]
pub struct StructRef {
    /// Identity of the referenced structure
    pub id: ShapeId,
    describe: fn() -> StructDescriptor,
}

impl StructRef {
    /// Reference the structure type `T`
    pub fn of<T: Structure + 'static>() -> Self {
        Self {
            id: ShapeId::of::<T>(),
            describe: T::descriptor,
        }
    }

    /// Expand the referenced descriptor
    pub fn descriptor(&self) -> StructDescriptor {
        (self.describe)()
    }
}

impl fmt::Debug for StructRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("StructRef").field(&self.id.name).finish()
    }
}

impl PartialEq for StructRef {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

/// Structural kind of a type
#[derive(Debug, Clone, PartialEq)]
pub enum Kind {
    /// Scalar value
    Scalar(ScalarKind),
    /// Nullable or owning pointer to another kind
    Pointer(Box<Kind>),
    /// Ordered collection, with a fixed length for arrays
    Sequence {
        /// Element kind
        element: Box<Kind>,
        /// Fixed length, if any
        len: Option<usize>,
    },
    /// Key/value collection
    Mapping {
        /// Key kind
        key: ScalarKind,
        /// Value kind
        value: Box<Kind>,
    },
    /// Nested structure with its own fields
    Nested(StructRef),
    /// Shape only known at runtime (e.g. JSON values)
    Dynamic,
}

impl Kind {
    /// Kind with every pointer layer removed
    pub fn peel_pointers(&self) -> &Kind {
        let mut kind = self;
        while let Kind::Pointer(inner) = kind {
            kind = inner;
        }
        kind
    }

    /// Nested structure reached through any number of pointers
    pub fn as_struct(&self) -> Option<StructRef> {
        match self.peel_pointers() {
            Kind::Nested(structure) => Some(*structure),
            _ => None,
        }
    }

    /// Whether values of this kind are keyed by strings only known at runtime
    pub fn accepts_dynamic_keys(&self) -> bool {
        matches!(self.peel_pointers(), Kind::Mapping { .. } | Kind::Dynamic)
    }
}

/// Go-flavoured rendering: `*int`, `[3]int`, `[]string`, `map[string]int`
impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Kind::Scalar(scalar) => f.write_str(scalar.as_str()),
            Kind::Pointer(inner) => write!(f, "*{inner}"),
            Kind::Sequence {
                element,
                len: Some(len),
            } => write!(f, "[{len}]{element}"),
            Kind::Sequence { element, len: None } => write!(f, "[]{element}"),
            Kind::Mapping { key, value } => write!(f, "map[{}]{value}", key.as_str()),
            Kind::Nested(structure) => f.write_str(short_name(structure.id.name)),
            Kind::Dynamic => f.write_str("dynamic"),
        }
    }
}

/// Last path segment of a type name, keeping generic arguments intact
fn short_name(name: &str) -> &str {
    let head = name.split('<').next().unwrap_or(name);
    match head.rfind("::") {
        Some(idx) => &name[idx + 2..],
        None => name,
    }
}

/// Tag values attached to one field, keyed by namespace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Tags(&'static [(&'static str, &'static str)]);

impl Tags {
    /// Tags from `(namespace, text)` pairs
    pub const fn new(pairs: &'static [(&'static str, &'static str)]) -> Self {
        Self(pairs)
    }

    /// No tags
    pub const fn empty() -> Self {
        Self(&[])
    }

    /// Tag text for `namespace`, if present
    pub fn get(&self, namespace: &str) -> Option<&'static str> {
        self.0
            .iter()
            .find(|(ns, _)| *ns == namespace)
            .map(|(_, text)| *text)
    }

    /// All `(namespace, text)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &'static str)> {
        self.0.iter().copied()
    }
}

/// Static description of one field
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    /// Field name
    pub name: &'static str,
    /// Field kind
    pub kind: Kind,
    /// Field tags
    pub tags: Tags,
}

impl FieldDescriptor {
    /// Create a field descriptor without tags
    pub fn new(name: &'static str, kind: Kind) -> Self {
        Self {
            name,
            kind,
            tags: Tags::empty(),
        }
    }

    /// Attach tags
    pub fn with_tags(mut self, tags: Tags) -> Self {
        self.tags = tags;
        self
    }

    /// Whether the field is a placeholder that never takes part in compilation
    pub fn is_placeholder(&self) -> bool {
        self.name.starts_with('_')
    }
}

/// Static description of a structure
#[derive(Debug, Clone, PartialEq)]
pub struct StructDescriptor {
    /// Type name
    pub name: &'static str,
    /// Fields in declaration order; index matches [`Structure::field`]
    pub fields: Vec<FieldDescriptor>,
}
