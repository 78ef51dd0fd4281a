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

//! Expression AST node definitions

use super::operator::{BinaryOperator, UnaryOperator};
use smallvec::SmallVec;
use std::fmt;

/// AST representation of a single tag expression
///
/// Large variants are boxed to keep the enum small.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub enum ExpressionNode {
    /// Literal value (number, string, boolean, nil)
    Literal(LiteralValue),

    /// The value of the field the expression is attached to (`$`)
    SelfRef,

    /// Value of another field of the same structure (`(a.b)$`)
    FieldRef {
        /// Dot-separated field path
        path: String,
    },

    /// Binary operation (arithmetic, comparison, logical)
    BinaryOp(Box<BinaryOpData>),

    /// Unary operation (negation, not)
    UnaryOp {
        /// The operator
        op: UnaryOperator,
        /// The operand
        operand: Box<ExpressionNode>,
    },

    /// Index access (value\[key\])
    Index {
        /// Base expression
        base: Box<ExpressionNode>,
        /// Index expression
        index: Box<ExpressionNode>,
    },

    /// Function call with name and arguments
    FunctionCall(Box<FunctionCallData>),

    /// Conditional expression (`cond ? a : b`)
    Conditional(Box<ConditionalData>),
}

/// Binary operation data
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct BinaryOpData {
    /// The operator
    pub op: BinaryOperator,
    /// Left operand
    pub left: ExpressionNode,
    /// Right operand
    pub right: ExpressionNode,
}

/// Function call data
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct FunctionCallData {
    /// Function name
    pub name: String,
    /// Function arguments (SmallVec for common case of 1-4 args)
    pub args: SmallVec<[ExpressionNode; 4]>,
}

/// Conditional expression data
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ConditionalData {
    /// Condition
    pub condition: ExpressionNode,
    /// Value when the condition is true
    pub then_expr: ExpressionNode,
    /// Value when the condition is false
    pub else_expr: ExpressionNode,
}

/// Literal values
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub enum LiteralValue {
    /// Boolean literal
    Boolean(bool),
    /// Integer literal
    Integer(i64),
    /// Floating point literal
    Float(f64),
    /// String literal (escapes already processed)
    String(String),
    /// The absent value
    Nil,
}

impl ExpressionNode {
    /// Create a literal expression
    pub fn literal(value: LiteralValue) -> Self {
        Self::Literal(value)
    }

    /// Create a field reference expression
    pub fn field_ref(path: impl Into<String>) -> Self {
        Self::FieldRef { path: path.into() }
    }

    /// Create a function call expression
    pub fn function_call(
        name: impl Into<String>,
        args: impl Into<SmallVec<[ExpressionNode; 4]>>,
    ) -> Self {
        Self::FunctionCall(Box::new(FunctionCallData {
            name: name.into(),
            args: args.into(),
        }))
    }

    /// Create a binary operation expression
    pub fn binary_op(op: BinaryOperator, left: ExpressionNode, right: ExpressionNode) -> Self {
        Self::BinaryOp(Box::new(BinaryOpData { op, left, right }))
    }

    /// Create a unary operation expression
    pub fn unary_op(op: UnaryOperator, operand: ExpressionNode) -> Self {
        Self::UnaryOp {
            op,
            operand: Box::new(operand),
        }
    }

    /// Create an index access expression
    pub fn index(base: ExpressionNode, index: ExpressionNode) -> Self {
        Self::Index {
            base: Box::new(base),
            index: Box::new(index),
        }
    }

    /// Create a conditional expression
    pub fn conditional(
        condition: ExpressionNode,
        then_expr: ExpressionNode,
        else_expr: ExpressionNode,
    ) -> Self {
        Self::Conditional(Box::new(ConditionalData {
            condition,
            then_expr,
            else_expr,
        }))
    }

    /// Check if this expression is a literal
    pub fn is_literal(&self) -> bool {
        matches!(self, Self::Literal(_))
    }

    /// Get the literal value if this is a literal expression
    pub fn as_literal(&self) -> Option<&LiteralValue> {
        match self {
            Self::Literal(value) => Some(value),
            _ => None,
        }
    }
}

impl fmt::Display for LiteralValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Float(x) if x.fract() == 0.0 && x.is_finite() => write!(f, "{x:.1}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::String(s) => {
                f.write_str("'")?;
                for c in s.chars() {
                    match c {
                        '\'' => f.write_str("\\'")?,
                        '\\' => f.write_str("\\\\")?,
                        '\n' => f.write_str("\\n")?,
                        '\t' => f.write_str("\\t")?,
                        '\r' => f.write_str("\\r")?,
                        c => write!(f, "{c}")?,
                    }
                }
                f.write_str("'")
            }
            Self::Nil => f.write_str("nil"),
        }
    }
}

/// Renders the expression in canonical, fully parenthesized form
impl fmt::Display for ExpressionNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(lit) => write!(f, "{lit}"),
            Self::SelfRef => f.write_str("$"),
            Self::FieldRef { path } => write!(f, "({path})$"),
            Self::BinaryOp(data) => write!(f, "({} {} {})", data.left, data.op, data.right),
            Self::UnaryOp { op, operand } => write!(f, "{op}{operand}"),
            Self::Index { base, index } => write!(f, "{base}[{index}]"),
            Self::FunctionCall(data) => {
                write!(f, "{}(", data.name)?;
                for (i, arg) in data.args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                f.write_str(")")
            }
            Self::Conditional(data) => write!(
                f,
                "({} ? {} : {})",
                data.condition, data.then_expr, data.else_expr
            ),
        }
    }
}
