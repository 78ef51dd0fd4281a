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

//! Tag compiler
//!
//! Turns the tags of a structure's fields into [`CompiledShape`]s: a flat
//! field table plus lowered expressions addressed by selector.

pub mod error;
pub mod program;
pub mod shape;

pub use error::{CompileError, CompileResult};
pub use program::{Expr, FieldAccess};
pub use shape::{
    AccessRoute, CompiledField, CompiledShape, ExprGroup, ReferencePolicy, ShapeCompiler,
    format_selector,
};
