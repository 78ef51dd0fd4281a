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

// Error types for tag compilation

use crate::parser::{ParseError, TagError};
use crate::registry::FunctionError;
use thiserror::Error;

/// Result type for compile operations
pub type CompileResult<T> = Result<T, CompileError>;

/// Errors that abort the compilation of a whole shape
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompileError {
    /// The tag text of a field has a malformed block structure
    #[error("Invalid tag on field '{field}': {source}")]
    Tag {
        /// Field path
        field: String,
        /// Underlying tag error
        source: TagError,
    },

    /// An expression group failed to parse
    #[error("Parse error in '{selector}': {source}")]
    Parse {
        /// Selector of the failing group
        selector: String,
        /// Underlying parse error
        source: ParseError,
    },

    /// A function call could not be resolved or rejected its literal arguments
    #[error("Function error in '{selector}': {source}")]
    Function {
        /// Selector of the failing group
        selector: String,
        /// Underlying function error
        source: FunctionError,
    },

    /// A field reference names no field of the shape (strict policy only)
    #[error("Unresolved field reference '({path})$' in '{selector}'")]
    UnresolvedReference {
        /// Selector of the failing group
        selector: String,
        /// Referenced path
        path: String,
    },

    /// The compiled type has no fields to compile
    #[error("Type '{type_name}' is not a structure")]
    NotAStructure {
        /// Type name
        type_name: String,
    },
}

impl CompileError {
    /// Selector of the expression group that failed, if the error is tied to one
    pub fn selector(&self) -> Option<&str> {
        match self {
            CompileError::Parse { selector, .. }
            | CompileError::Function { selector, .. }
            | CompileError::UnresolvedReference { selector, .. } => Some(selector),
            CompileError::Tag { .. } | CompileError::NotAStructure { .. } => None,
        }
    }
}
