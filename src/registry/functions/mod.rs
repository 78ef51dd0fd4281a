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

//! Built-in functions

pub mod length;
pub mod membership;
pub mod regexp;
pub mod sprintf;

pub use length::{LenFunction, MbLenFunction};
pub use membership::InFunction;
pub use regexp::RegexpFunction;
pub use sprintf::{SprintfFunction, sprintf};

use super::function::FunctionRegistry;

/// Register every built-in function
pub fn register_builtin_functions(registry: &mut FunctionRegistry) {
    registry.register(LenFunction);
    registry.register(MbLenFunction);
    registry.register(RegexpFunction);
    registry.register(SprintfFunction);
    registry.register(InFunction);
}
