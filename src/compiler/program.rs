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

//! Executable form of a parsed expression
//!
//! Lowering resolves everything that can be known from the shape alone:
//! field references become slots into the compiled field table and function
//! names become handles into the registry. Evaluation never looks anything up
//! by name.

use super::error::{CompileError, CompileResult};
use super::shape::{CompiledField, ReferencePolicy};
use crate::ast::{BinaryOperator, ExpressionNode, LiteralValue, UnaryOperator};
use crate::model::ExprValue;
use crate::registry::{ExprFunction, FunctionError, FunctionRegistry};
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// Lowered expression
#[derive(Debug, Clone)]
pub enum Expr {
    /// Constant value
    Literal(ExprValue),
    /// The field's own value (`$`)
    SelfRef,
    /// Value of a field of the same shape
    Field(FieldAccess),
    /// Binary operation
    Binary {
        /// Operator
        op: BinaryOperator,
        /// Left operand
        left: Box<Expr>,
        /// Right operand
        right: Box<Expr>,
    },
    /// Unary operation
    Unary {
        /// Operator
        op: UnaryOperator,
        /// Operand
        operand: Box<Expr>,
    },
    /// Index access
    Index {
        /// Indexed value
        base: Box<Expr>,
        /// Position or key
        key: Box<Expr>,
    },
    /// `condition ? then_expr : else_expr`
    Conditional {
        /// Condition
        condition: Box<Expr>,
        /// Value when the condition is true
        then_expr: Box<Expr>,
        /// Value when the condition is false
        else_expr: Box<Expr>,
    },
    /// Resolved function call; omitted self arguments are already filled in
    Call {
        /// Function handle
        function: Arc<dyn ExprFunction>,
        /// Arguments
        args: Vec<Expr>,
    },
}

/// A resolved `(path)$` reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldAccess {
    /// Path as written
    pub path: String,
    /// Slot of the referenced field, `None` when nothing matched
    pub slot: Option<usize>,
    /// Segments looked up as string keys past a mapping or dynamic field
    pub tail: Vec<String>,
}

impl FieldAccess {
    /// Whether the reference resolved to a field
    pub fn is_resolved(&self) -> bool {
        self.slot.is_some()
    }
}

/// Lowers parsed expressions of one selector against a shape's field table
pub(crate) struct Lowerer<'c> {
    pub fields: &'c [CompiledField],
    pub paths: &'c FxHashMap<String, usize>,
    pub registry: &'c FunctionRegistry,
    pub policy: ReferencePolicy,
    pub selector: &'c str,
}

impl Lowerer<'_> {
    /// Lower one parsed expression
    pub fn lower(&self, node: &ExpressionNode) -> CompileResult<Expr> {
        match node {
            ExpressionNode::Literal(literal) => Ok(Expr::Literal(lower_literal(literal))),
            ExpressionNode::SelfRef => Ok(Expr::SelfRef),
            ExpressionNode::FieldRef { path } => self.resolve_field(path).map(Expr::Field),
            ExpressionNode::BinaryOp(data) => Ok(Expr::Binary {
                op: data.op,
                left: Box::new(self.lower(&data.left)?),
                right: Box::new(self.lower(&data.right)?),
            }),
            ExpressionNode::UnaryOp { op, operand } => Ok(Expr::Unary {
                op: *op,
                operand: Box::new(self.lower(operand)?),
            }),
            ExpressionNode::Index { base, index } => Ok(Expr::Index {
                base: Box::new(self.lower(base)?),
                key: Box::new(self.lower(index)?),
            }),
            ExpressionNode::Conditional(data) => Ok(Expr::Conditional {
                condition: Box::new(self.lower(&data.condition)?),
                then_expr: Box::new(self.lower(&data.then_expr)?),
                else_expr: Box::new(self.lower(&data.else_expr)?),
            }),
            ExpressionNode::FunctionCall(data) => self.lower_call(&data.name, &data.args),
        }
    }

    fn lower_call(&self, name: &str, args: &[ExpressionNode]) -> CompileResult<Expr> {
        let fills_self = self
            .registry
            .get(name)
            .is_some_and(|function| function.signature().fills_self(args.len()));

        let mut nodes = args.to_vec();
        if fills_self {
            nodes.push(ExpressionNode::SelfRef);
        }

        let function = self
            .registry
            .resolve(name, nodes.len())
            .map_err(|source| self.function_error(source))?;
        function
            .prepare(&nodes)
            .map_err(|source| self.function_error(source))?;

        let args = nodes
            .iter()
            .map(|node| self.lower(node))
            .collect::<CompileResult<Vec<_>>>()?;

        Ok(Expr::Call { function, args })
    }

    fn function_error(&self, source: FunctionError) -> CompileError {
        CompileError::Function {
            selector: self.selector.to_string(),
            source,
        }
    }

    /// Resolve a path against the field table
    ///
    /// An exact match wins. Otherwise the nearest declared ancestor must be a
    /// mapping or dynamic field, and the remaining segments become a tail of
    /// string keys.
    fn resolve_field(&self, path: &str) -> CompileResult<FieldAccess> {
        if let Some(&slot) = self.paths.get(path) {
            log::trace!("Resolved '({path})$' to slot {slot} in '{}'", self.selector);
            return Ok(FieldAccess {
                path: path.to_string(),
                slot: Some(slot),
                tail: Vec::new(),
            });
        }

        let mut end = path.len();
        while let Some(dot) = path[..end].rfind('.') {
            if let Some(&slot) = self.paths.get(&path[..dot]) {
                let dynamic = self
                    .fields
                    .get(slot)
                    .is_some_and(|field| field.kind().accepts_dynamic_keys());
                if dynamic {
                    log::trace!(
                        "Resolved '({path})$' to slot {slot} with a dynamic tail in '{}'",
                        self.selector
                    );
                    return Ok(FieldAccess {
                        path: path.to_string(),
                        slot: Some(slot),
                        tail: path[dot + 1..].split('.').map(str::to_string).collect(),
                    });
                }
                break;
            }
            end = dot;
        }

        match self.policy {
            ReferencePolicy::Strict => Err(CompileError::UnresolvedReference {
                selector: self.selector.to_string(),
                path: path.to_string(),
            }),
            ReferencePolicy::Deferred => {
                log::warn!(
                    "Field reference '({path})$' in '{}' matches no field and evaluates to nil",
                    self.selector
                );
                Ok(FieldAccess {
                    path: path.to_string(),
                    slot: None,
                    tail: Vec::new(),
                })
            }
        }
    }
}

fn lower_literal(literal: &LiteralValue) -> ExprValue {
    match literal {
        LiteralValue::Boolean(b) => ExprValue::Bool(*b),
        LiteralValue::Integer(i) => ExprValue::Number(*i as f64),
        LiteralValue::Float(x) => ExprValue::Number(*x),
        LiteralValue::String(s) => ExprValue::String(s.clone()),
        LiteralValue::Nil => ExprValue::Nil,
    }
}
