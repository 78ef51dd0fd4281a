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

//! Pratt (precedence climbing) parser for tag expressions

use super::error::{ParseError, ParseResult};
use super::lexer::TokenStream;
use super::tokenizer::Token;
use crate::ast::{BinaryOperator, ExpressionNode, LiteralValue, UnaryOperator};

/// Operator precedence levels (higher = tighter binding)
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
    /// Lowest precedence - conditional (right associative)
    Conditional = 1,
    /// Logical OR
    Or = 2,
    /// Logical AND
    And = 3,
    /// Equality operators (==, !=)
    Equality = 4,
    /// Ordering operators (<, >, <=, >=)
    Comparison = 5,
    /// Additive operators (+, -)
    Additive = 6,
    /// Multiplicative operators (*, /, %)
    Multiplicative = 7,
    /// Unary operators (!, -)
    Unary = 8,
    /// Indexing ([])
    Postfix = 9,
}

impl Precedence {
    /// Get the next higher precedence level for left-associative operators
    #[inline(always)]
    pub const fn next_level(self) -> Self {
        match self {
            Precedence::Conditional => Precedence::Or,
            Precedence::Or => Precedence::And,
            Precedence::And => Precedence::Equality,
            Precedence::Equality => Precedence::Comparison,
            Precedence::Comparison => Precedence::Additive,
            Precedence::Additive => Precedence::Multiplicative,
            Precedence::Multiplicative => Precedence::Unary,
            Precedence::Unary => Precedence::Postfix,
            Precedence::Postfix => Precedence::Postfix,
        }
    }

    /// Check if this precedence is right associative
    #[inline(always)]
    pub const fn is_right_associative(self) -> bool {
        matches!(self, Precedence::Conditional)
    }
}

/// Precedence of a token in infix position
#[inline(always)]
fn get_precedence(token: &Token<'_>) -> Option<Precedence> {
    match token {
        Token::Equal | Token::NotEqual => Some(Precedence::Equality),
        Token::And => Some(Precedence::And),
        Token::Or => Some(Precedence::Or),
        Token::Plus | Token::Minus => Some(Precedence::Additive),
        Token::Multiply | Token::Divide | Token::Percent => Some(Precedence::Multiplicative),
        Token::LessThan
        | Token::LessThanOrEqual
        | Token::GreaterThan
        | Token::GreaterThanOrEqual => Some(Precedence::Comparison),
        Token::Question => Some(Precedence::Conditional),
        _ => None,
    }
}

/// Convert token to binary operator
#[inline(always)]
fn token_to_binary_op(token: &Token<'_>) -> Option<BinaryOperator> {
    match token {
        Token::Equal => Some(BinaryOperator::Equal),
        Token::NotEqual => Some(BinaryOperator::NotEqual),
        Token::And => Some(BinaryOperator::And),
        Token::Or => Some(BinaryOperator::Or),
        Token::Plus => Some(BinaryOperator::Add),
        Token::Minus => Some(BinaryOperator::Subtract),
        Token::Multiply => Some(BinaryOperator::Multiply),
        Token::Divide => Some(BinaryOperator::Divide),
        Token::Percent => Some(BinaryOperator::Modulo),
        Token::LessThan => Some(BinaryOperator::LessThan),
        Token::LessThanOrEqual => Some(BinaryOperator::LessThanOrEqual),
        Token::GreaterThan => Some(BinaryOperator::GreaterThan),
        Token::GreaterThanOrEqual => Some(BinaryOperator::GreaterThanOrEqual),
        _ => None,
    }
}

/// Pratt parser over a pre-tokenized expression
///
/// ### Precedence Levels (highest to lowest):
/// - **Postfix** (9): `[]` indexing
/// - **Unary** (8): `!`, `-`
/// - **Multiplicative** (7): `*`, `/`, `%`
/// - **Additive** (6): `+`, `-`
/// - **Comparison** (5): `<`, `<=`, `>`, `>=`
/// - **Equality** (4): `==`, `!=`
/// - **And** (3): `&&`
/// - **Or** (2): `||`
/// - **Conditional** (1): `?:` (right-associative)
pub struct PrattParser<'input> {
    stream: TokenStream<'input>,
}

impl<'input> PrattParser<'input> {
    /// Tokenize `input` and create a parser over it
    pub fn new(input: &'input str) -> ParseResult<Self> {
        Ok(Self {
            stream: TokenStream::from_input(input)?,
        })
    }

    fn unexpected(&self) -> ParseError {
        match self.stream.peek() {
            Some(token) => ParseError::UnexpectedToken {
                token: token.value.to_string(),
                position: token.start,
            },
            None => ParseError::UnexpectedEof {
                position: self.stream.offset(),
            },
        }
    }

    /// Whether the stream is positioned at `( ident (. ident)* ) $`
    fn at_field_ref(&self) -> bool {
        let mut n = 1;
        loop {
            match self.stream.peek_ahead(n).map(|t| t.value) {
                Some(Token::Identifier(_)) => n += 1,
                _ => return false,
            }
            match self.stream.peek_ahead(n).map(|t| t.value) {
                Some(Token::Dot) => n += 1,
                Some(Token::RightParen) => {
                    return matches!(
                        self.stream.peek_ahead(n + 1).map(|t| t.value),
                        Some(Token::Dollar)
                    );
                }
                _ => return false,
            }
        }
    }

    /// Parse `( ident (. ident)* ) $` into a field reference
    fn parse_field_ref(&mut self) -> ParseResult<ExpressionNode> {
        self.stream.expect(Token::LeftParen)?;
        let mut path = String::new();
        while let Some(token) = self.stream.next() {
            match token.value {
                Token::Identifier(name) => path.push_str(name),
                Token::Dot => path.push('.'),
                Token::RightParen => break,
                other => {
                    return Err(ParseError::UnexpectedToken {
                        token: other.to_string(),
                        position: token.start,
                    });
                }
            }
        }
        self.stream.expect(Token::Dollar)?;
        Ok(ExpressionNode::field_ref(path))
    }

    /// Parse primary expression (literals, self, references, calls, unary, groups)
    fn parse_primary(&mut self) -> ParseResult<ExpressionNode> {
        let Some(token) = self.stream.peek().cloned() else {
            return Err(self.unexpected());
        };

        match token.value {
            Token::Dollar => {
                self.stream.next();
                Ok(ExpressionNode::SelfRef)
            }

            Token::Integer(text) => {
                self.stream.next();
                let value = match text.parse::<i64>() {
                    Ok(i) => LiteralValue::Integer(i),
                    // Too large for i64; numbers evaluate as f64 anyway
                    Err(_) => LiteralValue::Float(Self::parse_float(text, token.start)?),
                };
                Ok(ExpressionNode::literal(value))
            }

            Token::Float(text) => {
                self.stream.next();
                Ok(ExpressionNode::literal(LiteralValue::Float(
                    Self::parse_float(text, token.start)?,
                )))
            }

            Token::String(raw) => {
                self.stream.next();
                let processed = process_string_escapes(raw, token.start + 1)?;
                Ok(ExpressionNode::literal(LiteralValue::String(processed)))
            }

            Token::True => {
                self.stream.next();
                Ok(ExpressionNode::literal(LiteralValue::Boolean(true)))
            }
            Token::False => {
                self.stream.next();
                Ok(ExpressionNode::literal(LiteralValue::Boolean(false)))
            }
            Token::Nil => {
                self.stream.next();
                Ok(ExpressionNode::literal(LiteralValue::Nil))
            }

            Token::LeftParen if self.at_field_ref() => self.parse_field_ref(),

            Token::LeftParen => {
                self.stream.next();
                let expr = self.parse_expression_with_precedence(Precedence::Conditional)?;
                self.stream.expect(Token::RightParen)?;
                Ok(expr)
            }

            Token::Identifier(name) => {
                self.stream.next();
                match self.stream.peek_value() {
                    Some(Token::LeftParen) => self.parse_function_call(name),
                    _ => Err(ParseError::ExpectedToken {
                        expected: format!("'(' after function name '{name}'"),
                        found: self
                            .stream
                            .peek_value()
                            .map_or_else(|| "end of input".to_string(), |t| t.to_string()),
                        position: self.stream.offset(),
                    }),
                }
            }

            Token::Bang => {
                self.stream.next();
                let operand = self.parse_expression_with_precedence(Precedence::Unary)?;
                Ok(ExpressionNode::unary_op(UnaryOperator::Not, operand))
            }

            Token::Minus => {
                self.stream.next();
                let operand = self.parse_expression_with_precedence(Precedence::Unary)?;
                Ok(ExpressionNode::unary_op(UnaryOperator::Minus, operand))
            }

            _ => Err(self.unexpected()),
        }
    }

    fn parse_float(text: &str, position: usize) -> ParseResult<f64> {
        text.parse::<f64>()
            .map_err(|_| ParseError::InvalidLiteral {
                literal_type: "number".to_string(),
                value: text.to_string(),
                position,
            })
    }

    /// Parse function call arguments after the name
    fn parse_function_call(&mut self, name: &str) -> ParseResult<ExpressionNode> {
        self.stream.expect(Token::LeftParen)?;

        let mut args = Vec::new();

        if self.stream.consume_if(|t| *t == Token::RightParen).is_some() {
            return Ok(ExpressionNode::function_call(name, args));
        }

        loop {
            args.push(self.parse_expression_with_precedence(Precedence::Conditional)?);

            match self.stream.peek_value() {
                Some(Token::Comma) => {
                    self.stream.next();
                }
                Some(Token::RightParen) => {
                    self.stream.next();
                    break;
                }
                Some(found) => {
                    return Err(ParseError::ExpectedToken {
                        expected: "',' or ')' in function arguments".to_string(),
                        found: found.to_string(),
                        position: self.stream.offset(),
                    });
                }
                None => return Err(self.unexpected()),
            }
        }

        Ok(ExpressionNode::function_call(name, args))
    }

    /// Parse chained indexing, which binds tighter than any operator
    fn parse_postfix(&mut self, mut left: ExpressionNode) -> ParseResult<ExpressionNode> {
        while self.stream.consume_if(|t| *t == Token::LeftBracket).is_some() {
            let index = self.parse_expression_with_precedence(Precedence::Conditional)?;
            self.stream.expect(Token::RightBracket)?;
            left = ExpressionNode::index(left, index);
        }
        Ok(left)
    }

    /// Core Pratt parsing algorithm
    fn parse_expression_with_precedence(
        &mut self,
        min_precedence: Precedence,
    ) -> ParseResult<ExpressionNode> {
        let mut left = self.parse_primary()?;
        left = self.parse_postfix(left)?;

        while let Some(current_token) = self.stream.peek_value() {
            let precedence = match get_precedence(&current_token) {
                Some(prec) if prec >= min_precedence => prec,
                _ => break,
            };

            self.stream.next();

            if current_token == Token::Question {
                let then_expr = self.parse_expression_with_precedence(Precedence::Conditional)?;
                self.stream.expect(Token::Colon)?;
                let else_expr = self.parse_expression_with_precedence(Precedence::Conditional)?;
                left = ExpressionNode::conditional(left, then_expr, else_expr);
                continue;
            }

            let op = token_to_binary_op(&current_token).ok_or_else(|| {
                ParseError::UnexpectedToken {
                    token: current_token.to_string(),
                    position: self.stream.offset(),
                }
            })?;

            let next_min_precedence = if precedence.is_right_associative() {
                precedence
            } else {
                precedence.next_level()
            };

            let right = self.parse_expression_with_precedence(next_min_precedence)?;
            left = ExpressionNode::binary_op(op, left, right);
        }

        Ok(left)
    }

    /// Parse complete input
    pub fn parse(&mut self) -> ParseResult<ExpressionNode> {
        if self.stream.is_eof() {
            return Err(ParseError::EmptyExpression);
        }

        let expr = self.parse_expression_with_precedence(Precedence::Conditional)?;

        if let Some(token) = self.stream.peek() {
            return Err(ParseError::TrailingInput {
                token: token.value.to_string(),
                position: token.start,
            });
        }

        Ok(expr)
    }
}

/// Process escape sequences in string literals, including Unicode escapes
///
/// `base` is the byte offset of `input` in the expression, used for error
/// positions. Unknown escapes are kept literally.
pub fn process_string_escapes(input: &str, base: usize) -> ParseResult<String> {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.char_indices();

    while let Some((offset, ch)) = chars.next() {
        if ch != '\\' {
            result.push(ch);
            continue;
        }
        match chars.next() {
            Some((_, 'n')) => result.push('\n'),
            Some((_, 't')) => result.push('\t'),
            Some((_, 'r')) => result.push('\r'),
            Some((_, '\\')) => result.push('\\'),
            Some((_, '\'')) => result.push('\''),
            Some((_, '"')) => result.push('"'),
            Some((_, 'u')) => {
                let hex: String = chars.by_ref().take(4).map(|(_, c)| c).collect();
                let decoded = (hex.len() == 4 && hex.chars().all(|c| c.is_ascii_hexdigit()))
                    .then(|| u32::from_str_radix(&hex, 16).ok())
                    .flatten()
                    .and_then(char::from_u32);
                match decoded {
                    Some(unicode_char) => result.push(unicode_char),
                    None => {
                        return Err(ParseError::InvalidEscape {
                            sequence: format!("\\u{hex}"),
                            position: base + offset,
                        });
                    }
                }
            }
            Some((_, escaped_ch)) => {
                result.push('\\');
                result.push(escaped_ch);
            }
            None => {
                return Err(ParseError::InvalidEscape {
                    sequence: "\\".to_string(),
                    position: base + offset,
                });
            }
        }
    }

    Ok(result)
}

/// Parse one expression string into an AST
#[inline]
pub fn parse_expression_pratt(input: &str) -> ParseResult<ExpressionNode> {
    PrattParser::new(input)?.parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn int(i: i64) -> ExpressionNode {
        ExpressionNode::literal(LiteralValue::Integer(i))
    }

    #[test]
    fn test_precedence_ordering() {
        assert!(Precedence::Postfix > Precedence::Unary);
        assert!(Precedence::Multiplicative > Precedence::Additive);
        assert!(Precedence::Comparison > Precedence::Equality);
        assert!(Precedence::Equality > Precedence::And);
        assert!(Precedence::And > Precedence::Or);
        assert!(Precedence::Or > Precedence::Conditional);
    }

    #[test]
    fn test_arithmetic_precedence() {
        let result = parse_expression_pratt("2 + 3 * 4").unwrap();
        assert_eq!(
            result,
            ExpressionNode::binary_op(
                BinaryOperator::Add,
                int(2),
                ExpressionNode::binary_op(BinaryOperator::Multiply, int(3), int(4)),
            )
        );
    }

    #[test]
    fn test_left_associativity() {
        let result = parse_expression_pratt("10 - 3 - 2").unwrap();
        assert_eq!(result.to_string(), "((10 - 3) - 2)");
    }

    #[test]
    fn test_logical_precedence() {
        let result = parse_expression_pratt("$>0&&$<10||!$").unwrap();
        assert_eq!(result.to_string(), "((($ > 0) && ($ < 10)) || !$)");
    }

    #[test]
    fn test_conditional_is_right_associative() {
        let result = parse_expression_pratt("$ ? 1 : $ == 2 ? 'a' : nil").unwrap();
        assert_eq!(result.to_string(), "($ ? 1 : (($ == 2) ? 'a' : nil))");
    }

    #[test]
    fn test_field_refs_and_postfix() {
        let result = parse_expression_pratt("(g.s)$[0]+(g.m)$['0'][0]==$").unwrap();
        assert_eq!(
            result.to_string(),
            "(((g.s)$[0] + (g.m)$['0'][0]) == $)"
        );
    }

    #[test]
    fn test_parenthesized_expression_is_not_a_field_ref() {
        let result = parse_expression_pratt("($)").unwrap();
        assert_eq!(result, ExpressionNode::SelfRef);

        let result = parse_expression_pratt("-(1+2)*3").unwrap();
        assert_eq!(result.to_string(), "(-(1 + 2) * 3)");
    }

    #[test]
    fn test_unary_binds_looser_than_index() {
        let result = parse_expression_pratt("!$[0]").unwrap();
        assert_eq!(
            result,
            ExpressionNode::unary_op(
                UnaryOperator::Not,
                ExpressionNode::index(ExpressionNode::SelfRef, int(0)),
            )
        );
    }

    #[test]
    fn test_function_calls() {
        let result = parse_expression_pratt("len()").unwrap();
        assert_eq!(result, ExpressionNode::function_call("len", Vec::new()));

        let result = parse_expression_pratt(r"regexp('g\d{3}$', $)").unwrap();
        assert_eq!(
            result,
            ExpressionNode::function_call(
                "regexp",
                vec![
                    ExpressionNode::literal(LiteralValue::String(r"g\d{3}$".to_string())),
                    ExpressionNode::SelfRef,
                ],
            )
        );
    }

    #[test]
    fn test_literals() {
        assert_eq!(
            parse_expression_pratt("1.5e2").unwrap(),
            ExpressionNode::literal(LiteralValue::Float(150.0))
        );
        assert_eq!(
            parse_expression_pratt("99999999999999999999").unwrap(),
            ExpressionNode::literal(LiteralValue::Float(1e20))
        );
        assert_eq!(
            parse_expression_pratt(r"'a\tbé\'c\q'").unwrap(),
            ExpressionNode::literal(LiteralValue::String("a\tbé'c\\q".to_string()))
        );
    }

    #[test]
    fn test_errors() {
        assert_eq!(
            parse_expression_pratt("   ").unwrap_err(),
            ParseError::EmptyExpression
        );
        assert_eq!(
            parse_expression_pratt("($ + 1").unwrap_err(),
            ParseError::UnexpectedEof { position: 6 }
        );
        assert_eq!(
            parse_expression_pratt("$ 1").unwrap_err(),
            ParseError::TrailingInput {
                token: "1".to_string(),
                position: 2,
            }
        );
        assert_eq!(
            parse_expression_pratt("$ + )").unwrap_err(),
            ParseError::UnexpectedToken {
                token: ")".to_string(),
                position: 4,
            }
        );
        assert_eq!(
            parse_expression_pratt(r"'\u12'").unwrap_err(),
            ParseError::InvalidEscape {
                sequence: "\\u12".to_string(),
                position: 1,
            }
        );
        assert!(matches!(
            parse_expression_pratt("len").unwrap_err(),
            ParseError::ExpectedToken { position: 3, .. }
        ));
    }
}
