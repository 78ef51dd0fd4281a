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

//! Expression evaluation
//!
//! Evaluation is pure and fail-soft: it never errors, and any operation on
//! values it does not apply to yields nil.

mod context;
mod error;
pub mod operators;

pub use context::BoundContext;
pub use error::{BindError, BindResult};

use crate::ast::BinaryOperator;
use crate::compiler::Expr;
use crate::model::{Dynamic, MapKey};

/// Walks lowered expressions, reading fields from an optional binding
#[derive(Debug, Clone, Copy)]
pub struct Evaluator<'c, 'a> {
    context: Option<&'c BoundContext<'a>>,
}

impl<'c, 'a> Evaluator<'c, 'a> {
    /// Evaluator reading fields from `context`
    pub fn bound(context: &'c BoundContext<'a>) -> Self {
        Self {
            context: Some(context),
        }
    }

    /// Evaluator with no instance; every field reference is nil
    pub fn detached() -> Self {
        Self { context: None }
    }

    /// Evaluate `expr` with `this` as the value of `$`
    pub fn evaluate(&self, expr: &Expr, this: &Dynamic<'a>) -> Dynamic<'a> {
        match expr {
            Expr::Literal(value) => Dynamic::from(value.clone()),
            Expr::SelfRef => this.clone(),
            Expr::Field(access) => {
                let (Some(slot), Some(context)) = (access.slot, self.context) else {
                    return Dynamic::Nil;
                };
                let value = access
                    .tail
                    .iter()
                    .fold(context.field(slot), |value, key| {
                        value.lookup(&MapKey::Str(key))
                    });
                Dynamic::from(value)
            }
            Expr::Binary { op, left, right } => match op {
                BinaryOperator::And | BinaryOperator::Or => {
                    self.short_circuit(*op, left, right, this)
                }
                _ => operators::binary(
                    *op,
                    self.evaluate(left, this),
                    self.evaluate(right, this),
                ),
            },
            Expr::Unary { op, operand } => operators::unary(*op, self.evaluate(operand, this)),
            Expr::Index { base, key } => {
                let base = self.evaluate(base, this);
                if base.is_nil() {
                    return Dynamic::Nil;
                }
                base.index(&self.evaluate(key, this))
            }
            Expr::Conditional {
                condition,
                then_expr,
                else_expr,
            } => match self.evaluate(condition, this) {
                Dynamic::Bool(true) => self.evaluate(then_expr, this),
                Dynamic::Bool(false) => self.evaluate(else_expr, this),
                _ => Dynamic::Nil,
            },
            Expr::Call { function, args } => {
                let args = args.iter().map(|arg| self.evaluate(arg, this)).collect();
                function.evaluate(args)
            }
        }
    }

    fn short_circuit(
        &self,
        op: BinaryOperator,
        left: &Expr,
        right: &Expr,
        this: &Dynamic<'a>,
    ) -> Dynamic<'a> {
        match (op, self.evaluate(left, this)) {
            (BinaryOperator::And, Dynamic::Bool(false)) => Dynamic::Bool(false),
            (BinaryOperator::Or, Dynamic::Bool(true)) => Dynamic::Bool(true),
            (_, left @ Dynamic::Bool(_)) => {
                operators::logical(op, &left, &self.evaluate(right, this))
            }
            _ => Dynamic::Nil,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::{ReferencePolicy, ShapeCompiler};
    use crate::model::ExprValue;
    use crate::registry::FunctionRegistry;
    use crate::{Reflect, StructRef};
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use std::sync::Arc;

    fn compiler() -> ShapeCompiler {
        ShapeCompiler::new(
            "te",
            Arc::new(FunctionRegistry::standard()),
            ReferencePolicy::Deferred,
        )
    }

    fn eval_detached(source: &str, this: Dynamic<'static>) -> ExprValue {
        let expr = compiler().compile_expression(source).unwrap();
        Evaluator::detached().evaluate(&expr, &this).into_expr_value()
    }

    #[rstest]
    #[case("$ > 0 && $ < 10", Dynamic::Number(5.0), ExprValue::Bool(true))]
    #[case("$ > 0 && $ < 10", Dynamic::Number(10.0), ExprValue::Bool(false))]
    #[case("false && $", Dynamic::Nil, ExprValue::Bool(false))]
    #[case("true || $", Dynamic::Nil, ExprValue::Bool(true))]
    #[case("true && $", Dynamic::Nil, ExprValue::Nil)]
    #[case("$ && true", Dynamic::Number(1.0), ExprValue::Nil)]
    #[case("!$", Dynamic::Number(0.0), ExprValue::Nil)]
    #[case("!$", Dynamic::Bool(false), ExprValue::Bool(true))]
    #[case("$ ? 'yes' : 'no'", Dynamic::Bool(true), ExprValue::from("yes"))]
    #[case("$ ? 'yes' : 'no'", Dynamic::Nil, ExprValue::Nil)]
    #[case("-$ * 2", Dynamic::Number(3.0), ExprValue::Number(-6.0))]
    #[case("$[0]", Dynamic::string("abc"), ExprValue::Nil)]
    #[case("$[0][1]", Dynamic::Nil, ExprValue::Nil)]
    #[case("(a)$ == nil", Dynamic::Nil, ExprValue::Bool(true))]
    #[case("len() + mblen('héllo')", Dynamic::string("héllo"), ExprValue::Number(11.0))]
    #[case("in($, 'a', 'b')", Dynamic::string("b"), ExprValue::Bool(true))]
    #[case("sprintf('%s-%v', $, 1 + 1)", Dynamic::string("x"), ExprValue::from("x-2"))]
    fn test_detached_evaluation(
        #[case] source: &str,
        #[case] this: Dynamic<'static>,
        #[case] expected: ExprValue,
    ) {
        assert_eq!(eval_detached(source, this), expected);
    }

    #[derive(Reflect)]
    struct Inner {
        v: i32,
    }

    #[derive(Reflect)]
    struct Outer {
        a: Option<Box<Inner>>,
        b: Inner,
    }

    #[test]
    fn test_binding_reads_lazily_through_pointers() {
        let shape = Arc::new(compiler().compile(StructRef::of::<Outer>()).unwrap());
        let outer = Outer {
            a: None,
            b: Inner { v: 4 },
        };
        let context = BoundContext::bind(Arc::clone(&shape), &outer).unwrap();
        let slot = |path: &str| {
            shape
                .fields()
                .iter()
                .position(|field| field.path() == path)
                .unwrap()
        };

        assert!(context.field(slot("a")).is_nil());
        assert!(context.field(slot("a.v")).is_nil());
        assert_eq!(Dynamic::from(context.field(slot("b.v"))).as_number(), Some(4.0));
        assert!(context.field(99).is_nil());
    }

    #[test]
    fn test_bind_errors() {
        let shape = Arc::new(compiler().compile(StructRef::of::<Outer>()).unwrap());

        let inner = Inner { v: 1 };
        assert!(matches!(
            BoundContext::bind(Arc::clone(&shape), &inner),
            Err(BindError::ShapeMismatch { .. })
        ));

        let empty: Option<Outer> = None;
        assert!(matches!(
            BoundContext::bind(Arc::clone(&shape), &empty),
            Err(BindError::NilInstance { .. })
        ));

        assert!(matches!(
            BoundContext::bind(shape, &3i32),
            Err(BindError::NotAStructure { .. })
        ));
    }
}
