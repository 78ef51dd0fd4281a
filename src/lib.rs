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

//! Struct-tag expression engine
//!
//! Fields declare small expressions in their tags; an engine compiles them
//! once per type and evaluates them against borrowed instances.
//!
//! ```
//! use tagexpr::{Reflect, TagExprEngine};
//!
//! #[derive(Reflect)]
//! struct Order {
//!     #[tag(te = "$ > 0 && $ < 10")]
//!     quantity: i64,
//!     #[tag(te = "{fits:(quantity)$ <= $}{msg:sprintf('max %d', $)}")]
//!     limit: u32,
//! }
//!
//! let engine = TagExprEngine::new("te");
//! let order = Order { quantity: 5, limit: 8 };
//! let bound = engine.run(&order).unwrap();
//! assert!(bound.eval_bool("quantity@"));
//! assert!(bound.eval_bool("limit@fits"));
//! assert_eq!(bound.eval_string("limit@msg"), "max 8");
//! ```

extern crate self as tagexpr;

pub mod ast;
pub mod cache;
pub mod compiler;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod model;
pub mod parser;
pub mod registry;
pub mod selector;

// Re-export main types
pub use cache::{CacheStats, ShapeCache};
pub use compiler::{CompileError, CompiledShape, ReferencePolicy};
pub use engine::{EngineBuilder, EngineConfig, TagExprEngine};
pub use error::{Result, TagExprError};
pub use evaluator::BindError;
pub use model::{
    Dynamic, ExprValue, FieldDescriptor, Kind, MapKey, Mapping, Reflect, ReflectKey, ScalarKind,
    Sequence, ShapeId, StructDescriptor, StructRef, Structure, Tags, ValueRef,
};
pub use parser::{ParseError, TagError, parse};
pub use registry::{ExprFunction, FunctionError, FunctionRegistry, FunctionSignature, ParameterInfo};
pub use selector::{BoundExpr, LazyValue};
pub use tagexpr_derive::Reflect;
