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

//! Parser error types

use thiserror::Error;

/// Result type for parser operations
pub type ParseResult<T> = Result<T, ParseError>;

/// Errors produced while tokenizing or parsing a single expression
///
/// Every position is a byte offset into the expression text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The expression contains nothing but whitespace
    #[error("Empty expression")]
    EmptyExpression,

    /// Character that cannot start any token
    #[error("Unknown character '{character}' at position {position}")]
    UnknownCharacter {
        /// The offending character
        character: char,
        /// Position of the character
        position: usize,
    },

    /// Unexpected token
    #[error("Unexpected token '{token}' at position {position}")]
    UnexpectedToken {
        /// The unexpected token that was found
        token: String,
        /// Position where the token was found
        position: usize,
    },

    /// Expected token
    #[error("Expected {expected} at position {position}, found '{found}'")]
    ExpectedToken {
        /// The expected token description
        expected: String,
        /// The token actually found
        found: String,
        /// Position where the token was expected
        position: usize,
    },

    /// Unexpected end of input
    #[error("Unexpected end of input at position {position}")]
    UnexpectedEof {
        /// Position where more input was expected
        position: usize,
    },

    /// Input left over after a complete expression
    #[error("Unexpected trailing input '{token}' at position {position}")]
    TrailingInput {
        /// First token of the trailing input
        token: String,
        /// Position of the trailing input
        position: usize,
    },

    /// Invalid literal value
    #[error("Invalid {literal_type} literal at position {position}: {value}")]
    InvalidLiteral {
        /// Type of literal that failed to parse
        literal_type: String,
        /// The invalid value that was encountered
        value: String,
        /// Position where the invalid literal was found
        position: usize,
    },

    /// Invalid escape sequence
    #[error("Invalid escape sequence at position {position}: {sequence}")]
    InvalidEscape {
        /// The invalid escape sequence
        sequence: String,
        /// Position where the escape sequence was found
        position: usize,
    },

    /// Unclosed string literal
    #[error("Unclosed string literal starting at position {position}: {fragment}")]
    UnclosedString {
        /// Position of the opening quote
        position: usize,
        /// Text from the opening quote to the end of input
        fragment: String,
    },
}

impl ParseError {
    /// Byte position the error refers to, if any
    pub fn position(&self) -> Option<usize> {
        match self {
            Self::EmptyExpression => None,
            Self::UnknownCharacter { position, .. }
            | Self::UnexpectedToken { position, .. }
            | Self::ExpectedToken { position, .. }
            | Self::UnexpectedEof { position }
            | Self::TrailingInput { position, .. }
            | Self::InvalidLiteral { position, .. }
            | Self::InvalidEscape { position, .. }
            | Self::UnclosedString { position, .. } => Some(*position),
        }
    }

    /// Offending fragment of the input, if any
    pub fn fragment(&self) -> Option<&str> {
        match self {
            Self::EmptyExpression | Self::UnexpectedEof { .. } | Self::UnknownCharacter { .. } => {
                None
            }
            Self::UnexpectedToken { token, .. } | Self::TrailingInput { token, .. } => Some(token),
            Self::ExpectedToken { found, .. } => Some(found),
            Self::InvalidLiteral { value, .. } => Some(value),
            Self::InvalidEscape { sequence, .. } => Some(sequence),
            Self::UnclosedString { fragment, .. } => Some(fragment),
        }
    }
}
