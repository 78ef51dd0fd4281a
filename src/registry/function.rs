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

//! Function trait and registry

use super::signature::FunctionSignature;
use crate::ast::ExpressionNode;
use crate::model::{Dynamic, ExprValue};
use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Result type for function operations
pub type FunctionResult<T> = Result<T, FunctionError>;

/// Function resolution and validation errors, raised at compile time
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FunctionError {
    /// No function registered under this name
    #[error("Unknown function '{name}'")]
    UnknownFunction {
        /// Function name
        name: String,
    },

    /// Invalid number of arguments
    #[error("Function '{name}' expects {min}-{} arguments, got {actual}", max.map_or("∞".to_string(), |n| n.to_string()))]
    InvalidArity {
        /// Function name
        name: String,
        /// Minimum arguments
        min: usize,
        /// Maximum arguments (None for unlimited)
        max: Option<usize>,
        /// Actual arguments provided
        actual: usize,
    },

    /// Invalid literal argument
    #[error("Function '{name}' argument {index} is invalid: {message}")]
    InvalidArgument {
        /// Function name
        name: String,
        /// Argument index
        index: usize,
        /// Error message
        message: String,
    },
}

/// A function callable from tag expressions
///
/// Evaluation is fail-soft: arguments of the wrong type produce
/// [`Dynamic::Nil`] (or a documented fallback) rather than an error.
pub trait ExprFunction: Send + Sync {
    /// Function name used in expressions
    fn name(&self) -> &str;

    /// Human readable name
    fn human_friendly_name(&self) -> &str;

    /// Signature used for arity checking
    fn signature(&self) -> &FunctionSignature;

    /// Validate the parsed arguments of one call site at compile time
    fn prepare(&self, _args: &[ExpressionNode]) -> FunctionResult<()> {
        Ok(())
    }

    /// Evaluate with already evaluated arguments
    fn evaluate<'a>(&self, args: Vec<Dynamic<'a>>) -> Dynamic<'a>;

    /// Function documentation
    fn documentation(&self) -> &str {
        ""
    }

    /// Whether the function always returns the same result for the same input
    fn is_pure(&self) -> bool {
        true
    }
}

impl fmt::Debug for dyn ExprFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}()", self.name())
    }
}

type ClosureImpl = dyn Fn(&[Dynamic<'_>]) -> ExprValue + Send + Sync;

/// Function backed by a closure, for ad-hoc registrations
pub struct ClosureFunction {
    name: String,
    signature: FunctionSignature,
    implementation: Box<ClosureImpl>,
}

impl ClosureFunction {
    /// Wrap a closure under `signature`
    pub fn new<F>(signature: FunctionSignature, implementation: F) -> Self
    where
        F: Fn(&[Dynamic<'_>]) -> ExprValue + Send + Sync + 'static,
    {
        Self {
            name: signature.name.clone(),
            signature,
            implementation: Box::new(implementation),
        }
    }
}

impl ExprFunction for ClosureFunction {
    fn name(&self) -> &str {
        &self.name
    }

    fn human_friendly_name(&self) -> &str {
        &self.name
    }

    fn signature(&self) -> &FunctionSignature {
        &self.signature
    }

    fn evaluate<'a>(&self, args: Vec<Dynamic<'a>>) -> Dynamic<'a> {
        (self.implementation)(&args).into()
    }
}

/// Registry of functions available to expressions
#[derive(Clone, Default)]
pub struct FunctionRegistry {
    functions: FxHashMap<String, Arc<dyn ExprFunction>>,
}

impl fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionRegistry")
            .field("functions", &self.names())
            .finish()
    }
}

impl FunctionRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding every built-in function
    pub fn standard() -> Self {
        let mut registry = Self::new();
        super::functions::register_builtin_functions(&mut registry);
        registry
    }

    /// Register a function, replacing any function with the same name
    pub fn register<F: ExprFunction + 'static>(&mut self, function: F) {
        self.register_arc(Arc::new(function));
    }

    /// Register a shared function, replacing any function with the same name
    pub fn register_arc(&mut self, function: Arc<dyn ExprFunction>) {
        let name = function.name().to_string();
        if self.functions.insert(name.clone(), function).is_some() {
            log::debug!("Replaced function '{name}'");
        }
    }

    /// Register a closure under `signature`
    pub fn register_closure<F>(&mut self, signature: FunctionSignature, implementation: F)
    where
        F: Fn(&[Dynamic<'_>]) -> ExprValue + Send + Sync + 'static,
    {
        self.register(ClosureFunction::new(signature, implementation));
    }

    /// Look up a function by name
    pub fn get(&self, name: &str) -> Option<&Arc<dyn ExprFunction>> {
        self.functions.get(name)
    }

    /// Check if a function exists
    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Resolve a call site: the function must exist and accept `arity` arguments
    pub fn resolve(&self, name: &str, arity: usize) -> FunctionResult<Arc<dyn ExprFunction>> {
        let function = self
            .get(name)
            .ok_or_else(|| FunctionError::UnknownFunction {
                name: name.to_string(),
            })?;
        let signature = function.signature();
        if !signature.accepts(arity) {
            return Err(FunctionError::InvalidArity {
                name: name.to_string(),
                min: signature.min_arity,
                max: signature.max_arity,
                actual: arity,
            });
        }
        Ok(Arc::clone(function))
    }

    /// Registered function names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.functions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of registered functions
    pub fn len(&self) -> usize {
        self.functions.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::signature::ParameterInfo;

    #[test]
    fn test_standard_registry() {
        let registry = FunctionRegistry::standard();
        assert_eq!(registry.names(), vec!["in", "len", "mblen", "regexp", "sprintf"]);
    }

    #[test]
    fn test_resolve_checks_arity() {
        let registry = FunctionRegistry::standard();
        assert!(registry.resolve("len", 0).is_ok());
        assert!(registry.resolve("len", 1).is_ok());
        assert_eq!(
            registry.resolve("len", 2).err(),
            Some(FunctionError::InvalidArity {
                name: "len".to_string(),
                min: 0,
                max: Some(1),
                actual: 2,
            })
        );
        assert_eq!(
            registry.resolve("nope", 0).err(),
            Some(FunctionError::UnknownFunction {
                name: "nope".to_string()
            })
        );
    }

    #[test]
    fn test_closure_registration() {
        let mut registry = FunctionRegistry::new();
        registry.register_closure(
            FunctionSignature::new("double", vec![ParameterInfo::required("x")]),
            |args| {
                args[0]
                    .as_number()
                    .map_or(ExprValue::Nil, |n| ExprValue::Number(n * 2.0))
            },
        );
        let double = registry.resolve("double", 1).unwrap();
        let result = double.evaluate(vec![Dynamic::Number(4.0)]);
        assert_eq!(result.as_number(), Some(8.0));
        assert!(!registry.is_empty());
    }
}
