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

//! in() membership function

use crate::model::Dynamic;
use crate::registry::function::ExprFunction;
use crate::registry::signature::{FunctionSignature, ParameterInfo};
use once_cell::sync::Lazy;

/// in(subject, candidates...)
///
/// True when `subject` equals any candidate under the `==` rules; with no
/// candidates the result is false.
pub struct InFunction;

impl ExprFunction for InFunction {
    fn name(&self) -> &str {
        "in"
    }

    fn human_friendly_name(&self) -> &str {
        "Membership"
    }

    fn signature(&self) -> &FunctionSignature {
        static SIG: Lazy<FunctionSignature> = Lazy::new(|| {
            FunctionSignature::variadic(
                "in",
                vec![
                    ParameterInfo::required("subject"),
                    ParameterInfo::optional("candidates"),
                ],
            )
        });
        &SIG
    }

    fn evaluate<'a>(&self, args: Vec<Dynamic<'a>>) -> Dynamic<'a> {
        match args.split_first() {
            Some((subject, candidates)) => {
                Dynamic::Bool(candidates.iter().any(|c| subject.loose_eq(c)))
            }
            None => Dynamic::Bool(false),
        }
    }

    fn documentation(&self) -> &str {
        "Returns true if the first argument equals any of the others"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(vec![Dynamic::Number(2.0), Dynamic::Number(1.0), Dynamic::Number(2.0)], true)]
    #[case(vec![Dynamic::string("b"), Dynamic::string("a"), Dynamic::Number(2.0)], false)]
    #[case(vec![Dynamic::Nil, Dynamic::Bool(false), Dynamic::Nil], true)]
    #[case(vec![Dynamic::Number(1.0)], false)]
    fn test_membership(#[case] args: Vec<Dynamic<'static>>, #[case] expected: bool) {
        assert_eq!(InFunction.evaluate(args).as_bool(), Some(expected));
    }

    #[test]
    fn test_signature_is_variadic() {
        let sig = InFunction.signature();
        assert!(!sig.accepts(0));
        assert!(sig.accepts(1));
        assert!(sig.accepts(12));
        assert!(!sig.fills_self(0));
    }
}
