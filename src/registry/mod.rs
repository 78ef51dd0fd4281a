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

//! Function registry for tag expressions
//!
//! Functions are resolved by name and arity when a tag is compiled, so an
//! unknown function or a wrong argument count is a compile error rather than
//! a runtime surprise.

pub mod function;
pub mod functions;
pub mod signature;

pub use function::{ClosureFunction, ExprFunction, FunctionError, FunctionRegistry, FunctionResult};
pub use signature::{FunctionSignature, ParameterInfo};
