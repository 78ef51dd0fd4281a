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

//! Selector addressing over a bound instance

use crate::compiler::CompiledShape;
use crate::evaluator::{BoundContext, Evaluator};
use crate::model::{Dynamic, ExprValue};
use std::fmt;
use std::ops::ControlFlow;
use std::sync::Arc;

/// Compiled expressions bound to one instance, addressed by selector
///
/// Selectors are `<field-path>@<group>`; the default group is written as an
/// empty name (`a.b@`).
pub struct BoundExpr<'a> {
    context: BoundContext<'a>,
}

impl<'a> BoundExpr<'a> {
    pub(crate) fn new(context: BoundContext<'a>) -> Self {
        Self { context }
    }

    /// The bound shape
    pub fn shape(&self) -> &Arc<CompiledShape> {
        self.context.shape()
    }

    /// Evaluate the expression at `selector`; nil when the selector is unknown
    pub fn eval(&self, selector: &str) -> ExprValue {
        match self.shape().locate(selector) {
            Some((slot, group)) => self.eval_at(slot, group),
            None => {
                log::trace!("Unknown selector '{selector}'");
                ExprValue::Nil
            }
        }
    }

    /// Evaluate as a boolean; false unless the result is a boolean
    pub fn eval_bool(&self, selector: &str) -> bool {
        self.eval(selector).as_bool().unwrap_or(false)
    }

    /// Evaluate as a number; zero unless the result is a number
    pub fn eval_f64(&self, selector: &str) -> f64 {
        self.eval(selector).as_f64().unwrap_or(0.0)
    }

    /// Evaluate as a string; empty unless the result is a string
    pub fn eval_string(&self, selector: &str) -> String {
        match self.eval(selector) {
            ExprValue::String(s) => s,
            _ => String::new(),
        }
    }

    /// Visit every selector in field order, then group order
    ///
    /// Nothing is evaluated until the visitor calls [`LazyValue::eval`].
    /// Returning [`ControlFlow::Break`] stops the walk, and the break is
    /// passed back to the caller.
    pub fn range<F>(&self, mut visit: F) -> ControlFlow<()>
    where
        F: FnMut(&str, &LazyValue<'_, 'a>) -> ControlFlow<()>,
    {
        for (selector, slot, group) in self.shape().selector_entries() {
            let value = LazyValue {
                bound: self,
                slot,
                group,
            };
            visit(selector, &value)?;
        }
        ControlFlow::Continue(())
    }

    fn eval_at(&self, slot: usize, group: usize) -> ExprValue {
        let Some(compiled) = self.shape().group(slot, group) else {
            return ExprValue::Nil;
        };
        let this = Dynamic::from(self.context.field(slot));
        Evaluator::bound(&self.context)
            .evaluate(compiled.expr(), &this)
            .into_expr_value()
    }
}

impl fmt::Debug for BoundExpr<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundExpr")
            .field("context", &self.context)
            .finish()
    }
}

/// Deferred evaluation of one selector, handed out by [`BoundExpr::range`]
pub struct LazyValue<'b, 'a> {
    bound: &'b BoundExpr<'a>,
    slot: usize,
    group: usize,
}

impl LazyValue<'_, '_> {
    /// Evaluate now; every call evaluates again
    pub fn eval(&self) -> ExprValue {
        self.bound.eval_at(self.slot, self.group)
    }

    /// Path of the field the expression belongs to
    pub fn field_path(&self) -> &str {
        self.bound
            .shape()
            .fields()
            .get(self.slot)
            .map_or("", |field| field.path())
    }

    /// Expression text as written in the tag
    pub fn source(&self) -> &str {
        self.bound
            .shape()
            .group(self.slot, self.group)
            .map_or("", |group| group.source())
    }
}

impl fmt::Debug for LazyValue<'_, '_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyValue")
            .field("field", &self.field_path())
            .field("source", &self.source())
            .finish()
    }
}
