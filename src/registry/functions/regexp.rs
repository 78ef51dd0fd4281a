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

//! regexp() function: unanchored regular expression search

use crate::ast::{ExpressionNode, LiteralValue};
use crate::model::Dynamic;
use crate::registry::function::{ExprFunction, FunctionError, FunctionResult};
use crate::registry::signature::{FunctionSignature, ParameterInfo};
use dashmap::DashMap;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;

/// Literal patterns compiled at tag compile time, shared by every engine.
/// Only `prepare` inserts, so the map is bounded by the literal patterns
/// written in tags.
static PATTERN_CACHE: Lazy<DashMap<String, Arc<Regex>>> = Lazy::new(DashMap::new);

/// Compile a literal pattern and keep it for later evaluations
fn cache_pattern(pattern: &str) -> Result<Arc<Regex>, regex::Error> {
    if let Some(cached) = PATTERN_CACHE.get(pattern) {
        return Ok(Arc::clone(cached.value()));
    }
    let compiled = Arc::new(Regex::new(pattern)?);
    PATTERN_CACHE.insert(pattern.to_string(), Arc::clone(&compiled));
    Ok(compiled)
}

/// Find a cached pattern, or compile one computed at evaluation time
/// without caching it
fn lookup_pattern(pattern: &str) -> Result<Arc<Regex>, regex::Error> {
    match PATTERN_CACHE.get(pattern) {
        Some(cached) => Ok(Arc::clone(cached.value())),
        None => {
            log::trace!("regexp: compiling runtime pattern '{pattern}'");
            Regex::new(pattern).map(Arc::new)
        }
    }
}

/// regexp(pattern, subject = $)
///
/// Returns whether `subject` contains a match of `pattern`. A subject that
/// is not a string never matches; a pattern that is not a valid regular
/// expression yields nil. Literal patterns are validated at compile time.
pub struct RegexpFunction;

impl ExprFunction for RegexpFunction {
    fn name(&self) -> &str {
        "regexp"
    }

    fn human_friendly_name(&self) -> &str {
        "Regular Expression Match"
    }

    fn signature(&self) -> &FunctionSignature {
        static SIG: Lazy<FunctionSignature> = Lazy::new(|| {
            FunctionSignature::new(
                "regexp",
                vec![
                    ParameterInfo::required("pattern"),
                    ParameterInfo::self_default("subject"),
                ],
            )
        });
        &SIG
    }

    fn prepare(&self, args: &[ExpressionNode]) -> FunctionResult<()> {
        if let Some(LiteralValue::String(pattern)) = args.first().and_then(|a| a.as_literal()) {
            cache_pattern(pattern).map_err(|e| FunctionError::InvalidArgument {
                name: self.name().to_string(),
                index: 0,
                message: format!("invalid regular expression: {e}"),
            })?;
        }
        Ok(())
    }

    fn evaluate<'a>(&self, args: Vec<Dynamic<'a>>) -> Dynamic<'a> {
        let Some(pattern) = args.first().and_then(Dynamic::as_str) else {
            return Dynamic::Nil;
        };
        let regex = match lookup_pattern(pattern) {
            Ok(regex) => regex,
            Err(e) => {
                log::debug!("regexp: invalid pattern '{pattern}': {e}");
                return Dynamic::Nil;
            }
        };
        match args.get(1).and_then(Dynamic::as_str) {
            Some(subject) => Dynamic::Bool(regex.is_match(subject)),
            None => Dynamic::Bool(false),
        }
    }

    fn documentation(&self) -> &str {
        "Returns true if the subject contains a match of the regular expression"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn call(pattern: &'static str, subject: Dynamic<'static>) -> Dynamic<'static> {
        RegexpFunction.evaluate(vec![Dynamic::string(pattern), subject])
    }

    #[rstest]
    #[case(r"g\d{3}$", "g123", true)]
    #[case(r"g\d{3}$", "g12", false)]
    #[case(r"\d", "abc1def", true)]
    #[case(r"^abc$", "xabc", false)]
    fn test_matches(#[case] pattern: &'static str, #[case] subject: &'static str, #[case] expected: bool) {
        assert_eq!(call(pattern, Dynamic::string(subject)).as_bool(), Some(expected));
    }

    #[test]
    fn test_non_string_inputs() {
        assert_eq!(call("a", Dynamic::Number(1.0)).as_bool(), Some(false));
        assert_eq!(call("a", Dynamic::Nil).as_bool(), Some(false));
        assert!(call("(", Dynamic::string("a")).is_nil());
        assert!(
            RegexpFunction
                .evaluate(vec![Dynamic::Number(1.0), Dynamic::string("1")])
                .is_nil()
        );
    }

    #[test]
    fn test_prepare_validates_literal_patterns() {
        let valid = [ExpressionNode::literal(LiteralValue::String("a+".into()))];
        assert!(RegexpFunction.prepare(&valid).is_ok());

        let invalid = [ExpressionNode::literal(LiteralValue::String("(".into()))];
        assert!(matches!(
            RegexpFunction.prepare(&invalid),
            Err(FunctionError::InvalidArgument { index: 0, .. })
        ));

        let dynamic = [ExpressionNode::SelfRef];
        assert!(RegexpFunction.prepare(&dynamic).is_ok());
    }

    #[test]
    fn test_literal_patterns_are_cached() {
        let literal = [ExpressionNode::literal(LiteralValue::String(
            "^cached-literal-[0-9]+$".into(),
        ))];
        RegexpFunction.prepare(&literal).unwrap();
        assert!(PATTERN_CACHE.contains_key("^cached-literal-[0-9]+$"));
        assert_eq!(
            call("^cached-literal-[0-9]+$", Dynamic::string("cached-literal-42")).as_bool(),
            Some(true)
        );
    }

    #[test]
    fn test_runtime_patterns_are_not_cached() {
        let patterns: Vec<String> = (0..200).map(|i| format!("^runtime-only-{i}$")).collect();
        for (i, pattern) in patterns.iter().enumerate() {
            let subject = format!("runtime-only-{i}");
            let result = RegexpFunction.evaluate(vec![
                Dynamic::string(pattern.as_str()),
                Dynamic::string(subject.as_str()),
            ]);
            assert_eq!(result.as_bool(), Some(true));
        }
        assert!(patterns.iter().all(|p| !PATTERN_CACHE.contains_key(p.as_str())));
    }
}
