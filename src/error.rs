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

//! Error types for tagexpr
//!
//! Each layer has its own error enum; [`TagExprError`] wraps them for the
//! engine's public operations.

use crate::compiler::CompileError;
use crate::evaluator::BindError;
use crate::parser::{ParseError, TagError};
use crate::registry::FunctionError;
use thiserror::Error;

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, TagExprError>;

/// Any error raised by the engine
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TagExprError {
    /// An expression failed to parse
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// A tag value has a malformed block structure
    #[error(transparent)]
    Tag(#[from] TagError),

    /// A shape failed to compile
    #[error(transparent)]
    Compile(#[from] CompileError),

    /// A function could not be resolved
    #[error(transparent)]
    Function(#[from] FunctionError),

    /// An instance could not be bound
    #[error(transparent)]
    Bind(#[from] BindError),
}

impl TagExprError {
    /// Whether the error was raised while compiling tags or expressions
    pub fn is_compile_error(&self) -> bool {
        matches!(
            self,
            TagExprError::Parse(_)
                | TagExprError::Tag(_)
                | TagExprError::Compile(_)
                | TagExprError::Function(_)
        )
    }
}
