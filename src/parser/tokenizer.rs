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

//! Byte-scanning tokenizer for tag expressions

use super::error::{ParseError, ParseResult};
use super::span::Spanned;
use std::fmt;
use unicode_xid::UnicodeXID;

/// Expression tokens
///
/// Literal payloads borrow from the input; numbers and strings are
/// converted by the parser so conversion errors carry exact positions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Token<'input> {
    // Literals
    /// Integer literal as written (e.g., 42)
    Integer(&'input str),
    /// Float literal as written (e.g., 3.14, 1e3)
    Float(&'input str),
    /// Raw string literal contents between single quotes, escapes unprocessed
    String(&'input str),
    /// Boolean literal true
    True,
    /// Boolean literal false
    False,
    /// Absent value literal
    Nil,

    /// Identifier (function names and field path segments)
    Identifier(&'input str),

    // Operators
    /// Addition or concatenation (+)
    Plus,
    /// Subtraction or negation (-)
    Minus,
    /// Multiplication (*)
    Multiply,
    /// Division (/)
    Divide,
    /// Remainder (%)
    Percent,
    /// Equality (==)
    Equal,
    /// Inequality (!=)
    NotEqual,
    /// Less than (<)
    LessThan,
    /// Less than or equal (<=)
    LessThanOrEqual,
    /// Greater than (>)
    GreaterThan,
    /// Greater than or equal (>=)
    GreaterThanOrEqual,
    /// Logical AND (&&)
    And,
    /// Logical OR (||)
    Or,
    /// Logical NOT (!)
    Bang,
    /// Conditional operator (?)
    Question,
    /// Conditional separator (:)
    Colon,

    // Delimiters
    /// Self reference ($)
    Dollar,
    /// Left parenthesis (
    LeftParen,
    /// Right parenthesis )
    RightParen,
    /// Left square bracket [
    LeftBracket,
    /// Right square bracket ]
    RightBracket,
    /// Comma separator (,)
    Comma,
    /// Path separator (.)
    Dot,
}

impl<'input> Token<'input> {
    /// Get keyword token from an identifier
    #[inline]
    pub fn from_keyword(s: &str) -> Option<Token<'input>> {
        match s {
            "true" => Some(Token::True),
            "false" => Some(Token::False),
            "nil" => Some(Token::Nil),
            _ => None,
        }
    }

    /// Get identifier string if this is an identifier token
    #[inline]
    pub fn as_identifier(&self) -> Option<&'input str> {
        match self {
            Token::Identifier(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Token::Integer(s) | Token::Float(s) | Token::Identifier(s) => s,
            Token::String(s) => return write!(f, "'{s}'"),
            Token::True => "true",
            Token::False => "false",
            Token::Nil => "nil",
            Token::Plus => "+",
            Token::Minus => "-",
            Token::Multiply => "*",
            Token::Divide => "/",
            Token::Percent => "%",
            Token::Equal => "==",
            Token::NotEqual => "!=",
            Token::LessThan => "<",
            Token::LessThanOrEqual => "<=",
            Token::GreaterThan => ">",
            Token::GreaterThanOrEqual => ">=",
            Token::And => "&&",
            Token::Or => "||",
            Token::Bang => "!",
            Token::Question => "?",
            Token::Colon => ":",
            Token::Dollar => "$",
            Token::LeftParen => "(",
            Token::RightParen => ")",
            Token::LeftBracket => "[",
            Token::RightBracket => "]",
            Token::Comma => ",",
            Token::Dot => ".",
        };
        f.write_str(s)
    }
}

/// Check whether a character may start an identifier
#[inline]
pub fn is_identifier_start(ch: char) -> bool {
    ch == '_' || ch.is_xid_start()
}

/// Check whether a character may continue an identifier
#[inline]
pub fn is_identifier_continue(ch: char) -> bool {
    ch.is_xid_continue()
}

/// Tokenizer over the bytes of one expression
#[derive(Clone)]
pub struct Tokenizer<'input> {
    input: &'input str,
    bytes: &'input [u8],
    pos: usize,
    end: usize,
}

impl<'input> Tokenizer<'input> {
    /// Create a new tokenizer
    #[inline]
    pub fn new(input: &'input str) -> Self {
        let bytes = input.as_bytes();
        Self {
            input,
            bytes,
            pos: 0,
            end: bytes.len(),
        }
    }

    /// Get input string slice from byte positions
    #[inline(always)]
    fn slice(&self, start: usize, end: usize) -> &'input str {
        self.input.get(start..end).unwrap_or("")
    }

    /// Current character, decoded from UTF-8
    #[inline]
    fn current_char(&self) -> Option<char> {
        self.input.get(self.pos..).and_then(|rest| rest.chars().next())
    }

    #[inline(always)]
    fn peek_byte(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    #[inline(always)]
    fn skip_whitespace(&mut self) {
        while self.pos < self.end {
            match self.bytes[self.pos] {
                b' ' | b'\t' | b'\r' | b'\n' => self.pos += 1,
                _ => break,
            }
        }
    }

    #[inline]
    fn skip_digits(&mut self) {
        while self.pos < self.end && self.bytes[self.pos].is_ascii_digit() {
            self.pos += 1;
        }
    }

    /// Number literal: digits, optional fraction, optional exponent
    #[inline]
    fn parse_number(&mut self) -> Token<'input> {
        let start = self.pos;
        self.skip_digits();

        let mut is_float = false;
        if self.peek_byte(0) == Some(b'.') && self.peek_byte(1).is_some_and(|b| b.is_ascii_digit())
        {
            is_float = true;
            self.pos += 1;
            self.skip_digits();
        }

        if matches!(self.peek_byte(0), Some(b'e' | b'E')) {
            let sign = usize::from(matches!(self.peek_byte(1), Some(b'+' | b'-')));
            if self.peek_byte(1 + sign).is_some_and(|b| b.is_ascii_digit()) {
                is_float = true;
                self.pos += 1 + sign;
                self.skip_digits();
            }
        }

        let text = self.slice(start, self.pos);
        if is_float {
            Token::Float(text)
        } else {
            Token::Integer(text)
        }
    }

    #[inline]
    fn parse_identifier(&mut self) -> &'input str {
        let start = self.pos;
        while let Some(ch) = self.current_char() {
            if !is_identifier_continue(ch) {
                break;
            }
            self.pos += ch.len_utf8();
        }
        self.slice(start, self.pos)
    }

    /// String literal; returns the raw contents and leaves escapes for the parser
    #[inline]
    fn parse_string_literal(&mut self) -> ParseResult<&'input str> {
        let quote = self.pos;
        self.pos += 1;
        let start = self.pos;

        while self.pos < self.end {
            match self.bytes[self.pos] {
                b'\'' => {
                    let content = self.slice(start, self.pos);
                    self.pos += 1;
                    return Ok(content);
                }
                b'\\' => {
                    self.pos += if self.pos + 1 < self.end { 2 } else { 1 };
                }
                _ => self.pos += 1,
            }
        }

        Err(ParseError::UnclosedString {
            position: quote,
            fragment: self.slice(quote, self.end).to_string(),
        })
    }

    /// Emit a token of `len` bytes
    #[inline(always)]
    fn single(&mut self, token: Token<'input>, len: usize) -> Token<'input> {
        self.pos += len;
        token
    }

    /// Produce the next token, or `None` at end of input
    pub fn next_token(&mut self) -> ParseResult<Option<Spanned<Token<'input>>>> {
        self.skip_whitespace();

        if self.pos >= self.end {
            return Ok(None);
        }

        let start = self.pos;
        let token = match self.bytes[self.pos] {
            b'$' => self.single(Token::Dollar, 1),
            b'(' => self.single(Token::LeftParen, 1),
            b')' => self.single(Token::RightParen, 1),
            b'[' => self.single(Token::LeftBracket, 1),
            b']' => self.single(Token::RightBracket, 1),
            b',' => self.single(Token::Comma, 1),
            b'.' => self.single(Token::Dot, 1),
            b'+' => self.single(Token::Plus, 1),
            b'-' => self.single(Token::Minus, 1),
            b'*' => self.single(Token::Multiply, 1),
            b'/' => self.single(Token::Divide, 1),
            b'%' => self.single(Token::Percent, 1),
            b'?' => self.single(Token::Question, 1),
            b':' => self.single(Token::Colon, 1),
            b'=' if self.peek_byte(1) == Some(b'=') => self.single(Token::Equal, 2),
            b'!' => match self.peek_byte(1) {
                Some(b'=') => self.single(Token::NotEqual, 2),
                _ => self.single(Token::Bang, 1),
            },
            b'<' => match self.peek_byte(1) {
                Some(b'=') => self.single(Token::LessThanOrEqual, 2),
                _ => self.single(Token::LessThan, 1),
            },
            b'>' => match self.peek_byte(1) {
                Some(b'=') => self.single(Token::GreaterThanOrEqual, 2),
                _ => self.single(Token::GreaterThan, 1),
            },
            b'&' if self.peek_byte(1) == Some(b'&') => self.single(Token::And, 2),
            b'|' if self.peek_byte(1) == Some(b'|') => self.single(Token::Or, 2),

            b'0'..=b'9' => self.parse_number(),
            b'\'' => Token::String(self.parse_string_literal()?),

            _ => match self.current_char() {
                Some(ch) if is_identifier_start(ch) => {
                    let ident = self.parse_identifier();
                    Token::from_keyword(ident).unwrap_or(Token::Identifier(ident))
                }
                Some(ch) => {
                    return Err(ParseError::UnknownCharacter {
                        character: ch,
                        position: start,
                    });
                }
                None => return Ok(None),
            },
        };

        Ok(Some(Spanned::new(token, start, self.pos)))
    }

    /// Tokenize the whole input with precise spans
    pub fn tokenize_all(&mut self) -> ParseResult<Vec<Spanned<Token<'input>>>> {
        let mut tokens = Vec::with_capacity(16);
        while let Some(token) = self.next_token()? {
            tokens.push(token);
        }
        Ok(tokens)
    }

    /// Current byte position
    pub fn position(&self) -> usize {
        self.pos
    }
}

/// Tokenize an expression string
pub fn tokenize(input: &str) -> ParseResult<Vec<Spanned<Token<'_>>>> {
    Tokenizer::new(input).tokenize_all()
}
