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

//! Function signatures

use serde::{Deserialize, Serialize};

/// Parameter information for functions
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParameterInfo {
    /// Parameter name
    pub name: String,
    /// Whether this parameter may be omitted
    pub optional: bool,
    /// Whether an omitted argument is replaced by the field's own value (`$`)
    pub defaults_to_self: bool,
}

impl ParameterInfo {
    /// Create a required parameter
    pub fn required(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            optional: false,
            defaults_to_self: false,
        }
    }

    /// Create an optional parameter
    pub fn optional(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            optional: true,
            defaults_to_self: false,
        }
    }

    /// Create a parameter that defaults to the field's own value when omitted
    pub fn self_default(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            optional: true,
            defaults_to_self: true,
        }
    }
}

/// Function signature used for arity checking at compile time
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FunctionSignature {
    /// Function name
    pub name: String,
    /// Parameters
    pub parameters: Vec<ParameterInfo>,
    /// Minimum number of arguments
    pub min_arity: usize,
    /// Maximum number of arguments (None for variadic)
    pub max_arity: Option<usize>,
}

impl FunctionSignature {
    /// Create a new function signature
    pub fn new(name: impl Into<String>, parameters: Vec<ParameterInfo>) -> Self {
        let required_params = parameters.iter().filter(|p| !p.optional).count();
        let max_arity = Some(parameters.len());

        Self {
            name: name.into(),
            parameters,
            min_arity: required_params,
            max_arity,
        }
    }

    /// Create a variadic function signature; arguments past the declared
    /// parameters are unlimited
    pub fn variadic(name: impl Into<String>, parameters: Vec<ParameterInfo>) -> Self {
        let required_params = parameters.iter().filter(|p| !p.optional).count();

        Self {
            name: name.into(),
            parameters,
            min_arity: required_params,
            max_arity: None,
        }
    }

    /// Check whether `arity` arguments are accepted
    pub fn accepts(&self, arity: usize) -> bool {
        arity >= self.min_arity && self.max_arity.is_none_or(|max| arity <= max)
    }

    /// Whether a call with `arity` arguments gets `$` appended
    ///
    /// Only a trailing parameter declared with [`ParameterInfo::self_default`]
    /// is filled in, and only when it is the one omitted.
    pub fn fills_self(&self, arity: usize) -> bool {
        self.parameters
            .last()
            .is_some_and(|p| p.defaults_to_self && arity + 1 == self.parameters.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arity_bounds() {
        let sig = FunctionSignature::new(
            "regexp",
            vec![
                ParameterInfo::required("pattern"),
                ParameterInfo::self_default("subject"),
            ],
        );
        assert_eq!(sig.min_arity, 1);
        assert!(sig.accepts(1));
        assert!(sig.accepts(2));
        assert!(!sig.accepts(0));
        assert!(!sig.accepts(3));
        assert!(sig.fills_self(1));
        assert!(!sig.fills_self(2));
    }

    #[test]
    fn test_variadic() {
        let sig = FunctionSignature::variadic("sprintf", vec![ParameterInfo::required("format")]);
        assert!(sig.accepts(1));
        assert!(sig.accepts(12));
        assert!(!sig.accepts(0));
        assert!(!sig.fills_self(0));
    }
}
