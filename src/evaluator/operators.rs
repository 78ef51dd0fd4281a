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

//! Operator semantics
//!
//! Every operator is total: operands it does not apply to produce nil.
//! Logical operators short-circuit and are handled by the evaluator.

use crate::ast::{BinaryOperator, UnaryOperator};
use crate::model::Dynamic;
use std::borrow::Cow;
use std::cmp::Ordering;

/// Apply a non-logical binary operator
pub fn binary<'a>(op: BinaryOperator, left: Dynamic<'a>, right: Dynamic<'a>) -> Dynamic<'a> {
    match op {
        BinaryOperator::Equal => Dynamic::Bool(left.loose_eq(&right)),
        BinaryOperator::NotEqual => Dynamic::Bool(!left.loose_eq(&right)),
        BinaryOperator::LessThan
        | BinaryOperator::LessThanOrEqual
        | BinaryOperator::GreaterThan
        | BinaryOperator::GreaterThanOrEqual => compare(op, &left, &right),
        BinaryOperator::Add => add(left, right),
        BinaryOperator::Subtract
        | BinaryOperator::Multiply
        | BinaryOperator::Divide
        | BinaryOperator::Modulo => arithmetic(op, &left, &right),
        BinaryOperator::And | BinaryOperator::Or => logical(op, &left, &right),
    }
}

/// Apply a unary operator
pub fn unary<'a>(op: UnaryOperator, operand: Dynamic<'a>) -> Dynamic<'a> {
    match (op, operand) {
        (UnaryOperator::Not, Dynamic::Bool(b)) => Dynamic::Bool(!b),
        (UnaryOperator::Minus, Dynamic::Number(n)) => Dynamic::Number(-n),
        _ => Dynamic::Nil,
    }
}

/// Strict logical operator on two evaluated operands
pub(crate) fn logical<'a>(op: BinaryOperator, left: &Dynamic<'_>, right: &Dynamic<'_>) -> Dynamic<'a> {
    match (op, left, right) {
        (BinaryOperator::And, Dynamic::Bool(a), Dynamic::Bool(b)) => Dynamic::Bool(*a && *b),
        (BinaryOperator::Or, Dynamic::Bool(a), Dynamic::Bool(b)) => Dynamic::Bool(*a || *b),
        _ => Dynamic::Nil,
    }
}

fn compare<'a>(op: BinaryOperator, left: &Dynamic<'_>, right: &Dynamic<'_>) -> Dynamic<'a> {
    let ordering = match (left, right) {
        (Dynamic::Number(a), Dynamic::Number(b)) => a.partial_cmp(b),
        (Dynamic::Str(a), Dynamic::Str(b)) => Some(a.cmp(b)),
        _ => return Dynamic::Nil,
    };
    // NaN compares false against everything
    let Some(ordering) = ordering else {
        return Dynamic::Bool(false);
    };
    Dynamic::Bool(match op {
        BinaryOperator::LessThan => ordering == Ordering::Less,
        BinaryOperator::LessThanOrEqual => ordering != Ordering::Greater,
        BinaryOperator::GreaterThan => ordering == Ordering::Greater,
        _ => ordering != Ordering::Less,
    })
}

fn add<'a>(left: Dynamic<'a>, right: Dynamic<'a>) -> Dynamic<'a> {
    match (left, right) {
        (Dynamic::Number(a), Dynamic::Number(b)) => Dynamic::Number(a + b),
        (Dynamic::Str(a), Dynamic::Str(b)) => {
            let mut joined = a.into_owned();
            joined.push_str(&b);
            Dynamic::Str(Cow::Owned(joined))
        }
        _ => Dynamic::Nil,
    }
}

fn arithmetic<'a>(op: BinaryOperator, left: &Dynamic<'_>, right: &Dynamic<'_>) -> Dynamic<'a> {
    let (Some(a), Some(b)) = (left.as_number(), right.as_number()) else {
        return Dynamic::Nil;
    };
    match op {
        BinaryOperator::Subtract => Dynamic::Number(a - b),
        BinaryOperator::Multiply => Dynamic::Number(a * b),
        BinaryOperator::Divide | BinaryOperator::Modulo if b == 0.0 => Dynamic::Nil,
        BinaryOperator::Divide => Dynamic::Number(a / b),
        BinaryOperator::Modulo => Dynamic::Number(a % b),
        _ => Dynamic::Nil,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn n(value: f64) -> Dynamic<'static> {
        Dynamic::Number(value)
    }

    fn s(value: &'static str) -> Dynamic<'static> {
        Dynamic::string(value)
    }

    #[rstest]
    #[case(BinaryOperator::Add, n(1.0), n(5.0), n(6.0))]
    #[case(BinaryOperator::Add, s("he"), s("he"), s("hehe"))]
    #[case(BinaryOperator::Add, s("1"), n(1.0), Dynamic::Nil)]
    #[case(BinaryOperator::Subtract, n(1.0), n(5.0), n(-4.0))]
    #[case(BinaryOperator::Multiply, n(2.5), n(2.0), n(5.0))]
    #[case(BinaryOperator::Divide, n(7.0), n(2.0), n(3.5))]
    #[case(BinaryOperator::Divide, n(7.0), n(0.0), Dynamic::Nil)]
    #[case(BinaryOperator::Modulo, n(7.0), n(4.0), n(3.0))]
    #[case(BinaryOperator::Modulo, n(7.0), n(0.0), Dynamic::Nil)]
    #[case(BinaryOperator::Subtract, s("a"), s("b"), Dynamic::Nil)]
    #[case(BinaryOperator::LessThan, n(1.0), n(2.0), Dynamic::Bool(true))]
    #[case(BinaryOperator::GreaterThanOrEqual, n(2.0), n(2.0), Dynamic::Bool(true))]
    #[case(BinaryOperator::LessThan, s("abc"), s("abd"), Dynamic::Bool(true))]
    #[case(BinaryOperator::GreaterThan, s("1"), n(0.0), Dynamic::Nil)]
    #[case(BinaryOperator::LessThanOrEqual, n(f64::NAN), n(0.0), Dynamic::Bool(false))]
    #[case(BinaryOperator::Equal, s("1"), n(1.0), Dynamic::Bool(false))]
    #[case(BinaryOperator::Equal, Dynamic::Nil, Dynamic::Nil, Dynamic::Bool(true))]
    #[case(BinaryOperator::NotEqual, Dynamic::Bool(true), Dynamic::Nil, Dynamic::Bool(true))]
    #[case(BinaryOperator::And, Dynamic::Bool(true), n(1.0), Dynamic::Nil)]
    #[case(BinaryOperator::Or, Dynamic::Bool(false), Dynamic::Bool(true), Dynamic::Bool(true))]
    fn test_binary(
        #[case] op: BinaryOperator,
        #[case] left: Dynamic<'static>,
        #[case] right: Dynamic<'static>,
        #[case] expected: Dynamic<'static>,
    ) {
        let result = binary(op, left, right);
        assert!(result.loose_eq(&expected), "{op}: got {result:?}, want {expected:?}");
    }

    #[rstest]
    #[case(UnaryOperator::Not, Dynamic::Bool(false), Dynamic::Bool(true))]
    #[case(UnaryOperator::Not, n(0.0), Dynamic::Nil)]
    #[case(UnaryOperator::Not, Dynamic::Nil, Dynamic::Nil)]
    #[case(UnaryOperator::Minus, n(2.0), n(-2.0))]
    #[case(UnaryOperator::Minus, s("2"), Dynamic::Nil)]
    fn test_unary(
        #[case] op: UnaryOperator,
        #[case] operand: Dynamic<'static>,
        #[case] expected: Dynamic<'static>,
    ) {
        assert!(unary(op, operand).loose_eq(&expected));
    }
}
