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

//! Engine - the main entry point
//!
//! An engine owns the configuration, the function registry and a shape
//! cache. It is cheap to clone and can be shared between threads.

use crate::cache::{CacheStats, ShapeCache};
use crate::compiler::{CompiledShape, ReferencePolicy, ShapeCompiler};
use crate::error::Result;
use crate::evaluator::{BindError, BoundContext, Evaluator};
use crate::model::{Dynamic, ExprValue, Reflect, StructRef};
use crate::registry::{ExprFunction, FunctionRegistry, FunctionSignature};
use crate::selector::BoundExpr;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Tag namespace holding the expressions
    pub namespace: String,
    /// What to do with references that match no field
    #[serde(default)]
    pub reference_policy: ReferencePolicy,
}

impl EngineConfig {
    /// Default configuration for `namespace`
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            reference_policy: ReferencePolicy::default(),
        }
    }
}

/// Builder for [`TagExprEngine`]
#[derive(Debug)]
pub struct EngineBuilder {
    config: EngineConfig,
    functions: FunctionRegistry,
    cache: Option<Arc<ShapeCache>>,
}

impl EngineBuilder {
    /// Builder with standard functions and a private cache
    pub fn new(namespace: impl Into<String>) -> Self {
        Self::from_config(EngineConfig::new(namespace))
    }

    /// Builder starting from an existing configuration
    pub fn from_config(config: EngineConfig) -> Self {
        Self {
            config,
            functions: FunctionRegistry::standard(),
            cache: None,
        }
    }

    /// Set the policy for unresolved field references
    pub fn reference_policy(mut self, policy: ReferencePolicy) -> Self {
        self.config.reference_policy = policy;
        self
    }

    /// Register a function, replacing a built-in of the same name
    pub fn function<F: ExprFunction + 'static>(mut self, function: F) -> Self {
        self.functions.register(function);
        self
    }

    /// Register a closure as a function
    pub fn closure<F>(mut self, signature: FunctionSignature, implementation: F) -> Self
    where
        F: Fn(&[Dynamic<'_>]) -> ExprValue + Send + Sync + 'static,
    {
        self.functions.register_closure(signature, implementation);
        self
    }

    /// Replace the whole function registry
    pub fn functions(mut self, functions: FunctionRegistry) -> Self {
        self.functions = functions;
        self
    }

    /// Share a shape cache with other engines using the same functions
    pub fn shared_cache(mut self, cache: Arc<ShapeCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Build the engine
    pub fn build(self) -> TagExprEngine {
        let compiler = ShapeCompiler::new(
            self.config.namespace.as_str(),
            Arc::new(self.functions),
            self.config.reference_policy,
        );
        log::debug!(
            "Built engine for namespace '{}' with {} functions",
            self.config.namespace,
            compiler.registry().len()
        );
        TagExprEngine {
            inner: Arc::new(EngineInner {
                config: self.config,
                compiler,
                cache: self.cache.unwrap_or_default(),
            }),
        }
    }
}

#[derive(Debug)]
struct EngineInner {
    config: EngineConfig,
    compiler: ShapeCompiler,
    cache: Arc<ShapeCache>,
}

/// Compiles tags of one namespace and evaluates them against instances
#[derive(Debug, Clone)]
pub struct TagExprEngine {
    inner: Arc<EngineInner>,
}

impl TagExprEngine {
    /// Engine with default configuration for `namespace`
    pub fn new(namespace: impl Into<String>) -> Self {
        Self::builder(namespace).build()
    }

    /// Builder for `namespace`
    pub fn builder(namespace: impl Into<String>) -> EngineBuilder {
        EngineBuilder::new(namespace)
    }

    /// Tag namespace
    pub fn namespace(&self) -> &str {
        &self.inner.config.namespace
    }

    /// Configuration the engine was built with
    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    /// Function registry
    pub fn functions(&self) -> &FunctionRegistry {
        self.inner.compiler.registry()
    }

    /// Shape cache
    pub fn cache(&self) -> &Arc<ShapeCache> {
        &self.inner.cache
    }

    /// Cache statistics
    pub fn cache_stats(&self) -> CacheStats {
        self.inner.cache.stats()
    }

    /// Compile the shape of `T` ahead of the first [`run`](Self::run)
    pub fn warm_up<T: Reflect>(&self) -> Result<Arc<CompiledShape>> {
        let shape = shape_of::<T>()?;
        self.compile(shape)
    }

    /// Compiled shape for `shape`, compiling it on first use
    pub fn compile(&self, shape: StructRef) -> Result<Arc<CompiledShape>> {
        Ok(self.inner.cache.get_or_compile(shape, &self.inner.compiler)?)
    }

    /// Bind `instance`, compiling its shape on first use
    pub fn run<'a, T: Reflect>(&self, instance: &'a T) -> Result<BoundExpr<'a>> {
        let shape = self.compile(shape_of::<T>()?)?;
        let context = BoundContext::bind(shape, instance)?;
        Ok(BoundExpr::new(context))
    }

    /// Evaluate one free-standing expression with `$` bound to `subject`
    ///
    /// Field references have no shape to resolve against and evaluate to nil.
    pub fn evaluate_expression(
        &self,
        expression: &str,
        subject: &serde_json::Value,
    ) -> Result<ExprValue> {
        let expr = self.inner.compiler.compile_expression(expression)?;
        let this = Dynamic::from(subject.reflect());
        Ok(Evaluator::detached()
            .evaluate(&expr, &this)
            .into_expr_value())
    }
}

fn shape_of<T: Reflect>() -> std::result::Result<StructRef, BindError> {
    T::kind()
        .as_struct()
        .ok_or_else(|| BindError::NotAStructure {
            type_name: std::any::type_name::<T>().to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TagExprError;
    use crate::compiler::CompileError;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[derive(crate::Reflect)]
    struct Limits {
        #[tag(te = "$ > 0 && $ < 10")]
        a: i64,
        #[tag(te = "{double:twice($)}{ref:(missing)$}")]
        b: i64,
    }

    fn engine_with(policy: ReferencePolicy) -> TagExprEngine {
        TagExprEngine::builder("te")
            .reference_policy(policy)
            .closure(
                FunctionSignature::new("twice", vec![crate::ParameterInfo::required("x")]),
                |args| {
                    args.first()
                        .and_then(Dynamic::as_number)
                        .map_or(ExprValue::Nil, |n| ExprValue::Number(n * 2.0))
                },
            )
            .build()
    }

    fn engine() -> TagExprEngine {
        engine_with(ReferencePolicy::Deferred)
    }

    #[test]
    fn test_run_and_eval() {
        let engine = engine();
        let limits = Limits { a: 5, b: 4 };
        let bound = engine.run(&limits).unwrap();
        assert!(bound.eval_bool("a@"));
        assert_eq!(bound.eval("b@double"), ExprValue::Number(8.0));
        assert!(bound.eval("b@ref").is_nil());
        assert!(bound.eval("nope@").is_nil());
        assert_eq!(engine.cache_stats().compilations, 1);
    }

    #[test]
    fn test_strict_policy_rejects_unresolved_references() {
        let err = engine_with(ReferencePolicy::Strict)
            .warm_up::<Limits>()
            .unwrap_err();
        assert_eq!(
            err,
            TagExprError::Compile(CompileError::UnresolvedReference {
                selector: "b@ref".to_string(),
                path: "missing".to_string(),
            })
        );
        assert!(err.is_compile_error());
    }

    #[test]
    fn test_unknown_functions_fail_compilation() {
        let err = TagExprEngine::new("te").warm_up::<Limits>().unwrap_err();
        assert!(matches!(
            err,
            TagExprError::Compile(CompileError::Function { .. })
        ));
    }

    #[test]
    fn test_non_structures_fail_to_bind() {
        let err = engine().run(&5u8).unwrap_err();
        assert!(matches!(
            err,
            TagExprError::Bind(BindError::NotAStructure { .. })
        ));
    }

    #[test]
    fn test_evaluate_expression_against_json() {
        let engine = TagExprEngine::new("te");
        let subject = json!({"name": "g123", "tags": ["a", "b"]});
        assert_eq!(
            engine.evaluate_expression("regexp('g\\\\d+', $['name'])", &subject).unwrap(),
            ExprValue::Bool(true)
        );
        assert_eq!(
            engine.evaluate_expression("len($['tags'])", &subject).unwrap(),
            ExprValue::Number(2.0)
        );
        assert!(engine.evaluate_expression("$[", &subject).is_err());
    }

    #[test]
    fn test_clones_share_the_cache() {
        let engine = engine();
        let clone = engine.clone();
        engine.warm_up::<Limits>().unwrap();
        clone.warm_up::<Limits>().unwrap();
        assert_eq!(clone.cache_stats().compilations, 1);
        assert_eq!(clone.cache_stats().hits, 1);
    }
}
