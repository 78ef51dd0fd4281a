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

//! Tag expression parser
//!
//! Tokenizes and parses one expression string into an [`ExpressionNode`],
//! and splits raw tag values into named expression groups.

pub mod error;
pub mod lexer;
pub mod pratt;
pub mod span;
pub mod tag;
pub mod tokenizer;

pub use error::{ParseError, ParseResult};
pub use pratt::{PrattParser, parse_expression_pratt};
pub use span::Spanned;
pub use tag::{DEFAULT_GROUP, TagError, TagGroup, split_tag};

use crate::ast::ExpressionNode;

/// Parse a tag expression string into an AST
pub fn parse(input: &str) -> ParseResult<ExpressionNode> {
    parse_expression_pratt(input)
}
