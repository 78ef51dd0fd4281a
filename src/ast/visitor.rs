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

//! Visitor pattern for AST traversal

use super::expression::{ExpressionNode, LiteralValue};
use super::operator::{BinaryOperator, UnaryOperator};

/// Trait for visiting AST nodes
///
/// Every method has a default that keeps walking, so implementors only
/// override the nodes they care about.
pub trait Visitor: Sized {
    /// Visit an expression node
    fn visit_expression(&mut self, expr: &ExpressionNode) {
        walk_expression(self, expr)
    }

    /// Visit a literal expression
    fn visit_literal(&mut self, _literal: &LiteralValue) {}

    /// Visit a self reference (`$`)
    fn visit_self_ref(&mut self) {}

    /// Visit a field reference
    fn visit_field_ref(&mut self, _path: &str) {}

    /// Visit a function call
    fn visit_function_call(&mut self, _name: &str, args: &[ExpressionNode]) {
        for arg in args {
            self.visit_expression(arg);
        }
    }

    /// Visit a binary operation
    fn visit_binary_op(
        &mut self,
        _op: BinaryOperator,
        left: &ExpressionNode,
        right: &ExpressionNode,
    ) {
        self.visit_expression(left);
        self.visit_expression(right);
    }

    /// Visit a unary operation
    fn visit_unary_op(&mut self, _op: UnaryOperator, operand: &ExpressionNode) {
        self.visit_expression(operand);
    }

    /// Visit an index access
    fn visit_index(&mut self, base: &ExpressionNode, index: &ExpressionNode) {
        self.visit_expression(base);
        self.visit_expression(index);
    }

    /// Visit a conditional expression
    fn visit_conditional(
        &mut self,
        condition: &ExpressionNode,
        then_expr: &ExpressionNode,
        else_expr: &ExpressionNode,
    ) {
        self.visit_expression(condition);
        self.visit_expression(then_expr);
        self.visit_expression(else_expr);
    }
}

/// Default implementation of walking an expression tree
pub fn walk_expression<V: Visitor>(visitor: &mut V, expr: &ExpressionNode) {
    match expr {
        ExpressionNode::Literal(lit) => visitor.visit_literal(lit),
        ExpressionNode::SelfRef => visitor.visit_self_ref(),
        ExpressionNode::FieldRef { path } => visitor.visit_field_ref(path),
        ExpressionNode::FunctionCall(data) => visitor.visit_function_call(&data.name, &data.args),
        ExpressionNode::BinaryOp(data) => visitor.visit_binary_op(data.op, &data.left, &data.right),
        ExpressionNode::UnaryOp { op, operand } => visitor.visit_unary_op(*op, operand),
        ExpressionNode::Index { base, index } => visitor.visit_index(base, index),
        ExpressionNode::Conditional(data) => {
            visitor.visit_conditional(&data.condition, &data.then_expr, &data.else_expr)
        }
    }
}

/// Collects every field path referenced by an expression, in source order
#[derive(Debug, Default)]
pub struct FieldRefCollector {
    /// Referenced paths, possibly with duplicates
    pub paths: Vec<String>,
}

impl Visitor for FieldRefCollector {
    fn visit_field_ref(&mut self, path: &str) {
        self.paths.push(path.to_string());
    }
}

/// Collects every function name called by an expression, in source order
#[derive(Debug, Default)]
pub struct FunctionNameCollector {
    /// Called function names, possibly with duplicates
    pub names: Vec<String>,
}

impl Visitor for FunctionNameCollector {
    fn visit_function_call(&mut self, name: &str, args: &[ExpressionNode]) {
        self.names.push(name.to_string());
        for arg in args {
            self.visit_expression(arg);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collectors_walk_nested_nodes() {
        let expr = ExpressionNode::conditional(
            ExpressionNode::field_ref("a"),
            ExpressionNode::function_call("len", vec![ExpressionNode::field_ref("b.c")]),
            ExpressionNode::index(
                ExpressionNode::SelfRef,
                ExpressionNode::function_call("mblen", vec![ExpressionNode::field_ref("d")]),
            ),
        );

        let mut refs = FieldRefCollector::default();
        refs.visit_expression(&expr);
        assert_eq!(refs.paths, vec!["a", "b.c", "d"]);

        let mut names = FunctionNameCollector::default();
        names.visit_expression(&expr);
        assert_eq!(names.names, vec!["len", "mblen"]);
    }
}
