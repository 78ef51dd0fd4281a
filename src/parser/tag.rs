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

//! Splitting of raw tag text into named expression groups
//!
//! A tag value is a sequence of `{name:expr}` blocks plus optional bare text,
//! which forms the default `@` group. Braces and quotes inside an expression
//! do not terminate its block.

use super::tokenizer::is_identifier_continue;
use thiserror::Error;

/// Name of the default expression group
pub const DEFAULT_GROUP: &str = "@";

/// One named expression extracted from a tag value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagGroup {
    /// Group name, `@` for the default group
    pub name: String,
    /// Expression text, trimmed
    pub expression: String,
    /// Byte offset of the expression text in the tag value
    pub offset: usize,
}

/// Errors in the block structure of a tag value
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TagError {
    /// A `{` without its closing `}`, or a stray `}`
    #[error("Unbalanced brace at position {position}")]
    UnbalancedBrace {
        /// Position of the offending brace
        position: usize,
    },

    /// A block whose name is not followed by `:`
    #[error("Missing ':' after group name in block at position {position}")]
    MissingColon {
        /// Position of the block's opening brace
        position: usize,
    },

    /// Empty or malformed group name
    #[error("Invalid group name '{name}' at position {position}")]
    InvalidGroupName {
        /// The rejected name
        name: String,
        /// Position of the block's opening brace
        position: usize,
    },

    /// The same group name declared twice
    #[error("Duplicate group name '{name}'")]
    DuplicateGroup {
        /// The repeated name
        name: String,
    },

    /// A quote without its closing quote
    #[error("Unterminated string literal at position {position}")]
    UnterminatedString {
        /// Position of the opening quote
        position: usize,
    },
}

fn is_valid_group_name(name: &str) -> bool {
    name == DEFAULT_GROUP || (!name.is_empty() && name.chars().all(is_identifier_continue))
}

/// Byte position just past the string literal whose opening quote is at `start`
fn skip_string(bytes: &[u8], start: usize) -> Result<usize, TagError> {
    let mut pos = start + 1;
    while pos < bytes.len() {
        match bytes[pos] {
            b'\'' => return Ok(pos + 1),
            b'\\' => pos += 2,
            _ => pos += 1,
        }
    }
    Err(TagError::UnterminatedString { position: start })
}

/// Trim `text` located at `offset`, returning the trimmed text and its offset
fn trimmed(text: &str, offset: usize) -> (String, usize) {
    let leading = text.len() - text.trim_start().len();
    (text.trim().to_string(), offset + leading)
}

/// Split a tag value into its expression groups, in declaration order
pub fn split_tag(tag: &str) -> Result<Vec<TagGroup>, TagError> {
    let bytes = tag.as_bytes();
    let mut groups: Vec<TagGroup> = Vec::new();
    let mut bare = String::new();
    let mut bare_offset: Option<usize> = None;
    let mut bare_index = 0;
    let mut fragment_start = 0;
    let mut pos = 0;

    let mut flush_bare = |from: usize, to: usize, bare: &mut String, groups_len: usize| {
        let fragment = &tag[from..to];
        if bare_offset.is_none() && !fragment.trim().is_empty() {
            bare_offset = Some(from + fragment.len() - fragment.trim_start().len());
            bare_index = groups_len;
        }
        bare.push_str(fragment);
    };

    while pos < bytes.len() {
        match bytes[pos] {
            b'\'' => pos = skip_string(bytes, pos)?,
            b'}' => return Err(TagError::UnbalancedBrace { position: pos }),
            b'{' => {
                flush_bare(fragment_start, pos, &mut bare, groups.len());
                let block_start = pos;

                let colon = tag[block_start + 1..]
                    .find([':', '{', '}', '\''])
                    .map(|i| block_start + 1 + i)
                    .filter(|&i| bytes[i] == b':')
                    .ok_or(TagError::MissingColon {
                        position: block_start,
                    })?;
                let name = tag[block_start + 1..colon].trim();
                if !is_valid_group_name(name) {
                    return Err(TagError::InvalidGroupName {
                        name: name.to_string(),
                        position: block_start,
                    });
                }

                let mut depth = 0usize;
                pos = colon + 1;
                let close = loop {
                    match bytes.get(pos) {
                        None => {
                            return Err(TagError::UnbalancedBrace {
                                position: block_start,
                            });
                        }
                        Some(b'\'') => pos = skip_string(bytes, pos)?,
                        Some(b'{') => {
                            depth += 1;
                            pos += 1;
                        }
                        Some(b'}') if depth == 0 => break pos,
                        Some(b'}') => {
                            depth -= 1;
                            pos += 1;
                        }
                        Some(_) => pos += 1,
                    }
                };

                if groups.iter().any(|g| g.name == name) {
                    return Err(TagError::DuplicateGroup {
                        name: name.to_string(),
                    });
                }
                let (expression, offset) = trimmed(&tag[colon + 1..close], colon + 1);
                groups.push(TagGroup {
                    name: name.to_string(),
                    expression,
                    offset,
                });

                pos = close + 1;
                fragment_start = pos;
            }
            _ => pos += 1,
        }
    }
    flush_bare(fragment_start, bytes.len(), &mut bare, groups.len());

    if let Some(offset) = bare_offset {
        if groups.iter().any(|g| g.name == DEFAULT_GROUP) {
            return Err(TagError::DuplicateGroup {
                name: DEFAULT_GROUP.to_string(),
            });
        }
        groups.insert(
            bare_index,
            TagGroup {
                name: DEFAULT_GROUP.to_string(),
                expression: bare.trim().to_string(),
                offset,
            },
        );
    }

    Ok(groups)
}
