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

// Error types for binding instances

use thiserror::Error;

/// Result type for bind operations
pub type BindResult<T> = Result<T, BindError>;

/// Errors raised when an instance cannot be bound to a compiled shape
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BindError {
    /// The instance's type is not the compiled type
    #[error("Cannot bind an instance of '{actual}' to the shape of '{expected}'")]
    ShapeMismatch {
        /// Compiled type name
        expected: String,
        /// Instance type name
        actual: String,
    },

    /// The instance is not a structure, even after removing pointer layers
    #[error("Type '{type_name}' is not a structure")]
    NotAStructure {
        /// Instance type name
        type_name: String,
    },

    /// The instance is an empty pointer
    #[error("Instance of '{type_name}' is nil")]
    NilInstance {
        /// Instance type name
        type_name: String,
    },
}
