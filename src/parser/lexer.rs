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

//! Token stream with lookahead used by the Pratt parser

use super::error::{ParseError, ParseResult};
use super::span::Spanned;
use super::tokenizer::{Token, tokenize};

/// Token stream with lookahead capability
#[derive(Debug)]
pub struct TokenStream<'input> {
    tokens: Vec<Spanned<Token<'input>>>,
    position: usize,
    input_len: usize,
}

impl<'input> TokenStream<'input> {
    /// Tokenize `input` into a new stream
    pub fn from_input(input: &'input str) -> ParseResult<Self> {
        Ok(Self::new(tokenize(input)?, input.len()))
    }

    /// Create a new token stream
    pub fn new(tokens: Vec<Spanned<Token<'input>>>, input_len: usize) -> Self {
        Self {
            tokens,
            position: 0,
            input_len,
        }
    }

    /// Peek at the current token without consuming
    pub fn peek(&self) -> Option<&Spanned<Token<'input>>> {
        self.tokens.get(self.position)
    }

    /// Peek at the current token value
    pub fn peek_value(&self) -> Option<Token<'input>> {
        self.peek().map(|t| t.value)
    }

    /// Peek at a token n positions ahead
    pub fn peek_ahead(&self, n: usize) -> Option<&Spanned<Token<'input>>> {
        self.tokens.get(self.position + n)
    }

    /// Consume and return the current token
    pub fn next(&mut self) -> Option<Spanned<Token<'input>>> {
        let token = self.tokens.get(self.position).cloned();
        if token.is_some() {
            self.position += 1;
        }
        token
    }

    /// Check if we're at the end of the stream
    pub fn is_eof(&self) -> bool {
        self.position >= self.tokens.len()
    }

    /// Byte offset of the current token, or the end of input
    pub fn offset(&self) -> usize {
        self.peek().map_or(self.input_len, |t| t.start)
    }

    /// Consume a token if it matches the predicate
    pub fn consume_if<F>(&mut self, predicate: F) -> Option<Spanned<Token<'input>>>
    where
        F: FnOnce(&Token<'input>) -> bool,
    {
        match self.peek() {
            Some(token) if predicate(&token.value) => self.next(),
            _ => None,
        }
    }

    /// Expect a specific token
    pub fn expect(&mut self, expected: Token<'input>) -> ParseResult<Spanned<Token<'input>>> {
        match self.peek() {
            Some(token) if Self::tokens_match(&token.value, &expected) => {
                self.next().ok_or(ParseError::UnexpectedEof {
                    position: self.input_len,
                })
            }
            Some(token) => Err(ParseError::ExpectedToken {
                expected: format!("'{expected}'"),
                found: token.value.to_string(),
                position: token.start,
            }),
            None => Err(ParseError::UnexpectedEof {
                position: self.input_len,
            }),
        }
    }

    /// Token kinds match; payloads of literals and identifiers are ignored
    #[inline(always)]
    fn tokens_match(token: &Token<'input>, expected: &Token<'input>) -> bool {
        std::mem::discriminant(token) == std::mem::discriminant(expected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookahead_and_expect() {
        let mut stream = TokenStream::from_input("(a.b)$").unwrap();
        assert_eq!(stream.peek_value(), Some(Token::LeftParen));
        assert_eq!(
            stream.peek_ahead(4).map(|t| t.value),
            Some(Token::RightParen)
        );

        stream.expect(Token::LeftParen).unwrap();
        assert!(
            stream
                .consume_if(|t| matches!(t, Token::Identifier(_)))
                .is_some()
        );
        assert_eq!(stream.offset(), 2);

        let err = stream.expect(Token::RightParen).unwrap_err();
        assert_eq!(
            err,
            ParseError::ExpectedToken {
                expected: "')'".to_string(),
                found: ".".to_string(),
                position: 2,
            }
        );
    }

    #[test]
    fn test_expect_at_eof() {
        let mut stream = TokenStream::from_input("$").unwrap();
        stream.next();
        assert!(stream.is_eof());
        assert_eq!(
            stream.expect(Token::RightBracket).unwrap_err(),
            ParseError::UnexpectedEof { position: 1 }
        );
    }
}
