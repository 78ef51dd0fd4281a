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

//! Length functions: len() and mblen()

use crate::model::Dynamic;
use crate::registry::function::ExprFunction;
use crate::registry::signature::{FunctionSignature, ParameterInfo};
use once_cell::sync::Lazy;

/// Length of the argument, or of `$` when omitted
///
/// Strings measure in bytes; sequences and mappings in elements. Nil has
/// length zero; other values have no length.
pub struct LenFunction;

impl ExprFunction for LenFunction {
    fn name(&self) -> &str {
        "len"
    }

    fn human_friendly_name(&self) -> &str {
        "Length"
    }

    fn signature(&self) -> &FunctionSignature {
        static SIG: Lazy<FunctionSignature> = Lazy::new(|| {
            FunctionSignature::new("len", vec![ParameterInfo::self_default("value")])
        });
        &SIG
    }

    fn evaluate<'a>(&self, args: Vec<Dynamic<'a>>) -> Dynamic<'a> {
        match args.first() {
            Some(Dynamic::Nil) | None => Dynamic::Number(0.0),
            Some(value) => value
                .len()
                .map_or(Dynamic::Nil, |len| Dynamic::Number(len as f64)),
        }
    }

    fn documentation(&self) -> &str {
        "Returns the byte length of a string or the element count of a collection"
    }
}

/// Character count of a string argument, or of `$` when omitted
///
/// Collections measure in elements as with `len`.
pub struct MbLenFunction;

impl ExprFunction for MbLenFunction {
    fn name(&self) -> &str {
        "mblen"
    }

    fn human_friendly_name(&self) -> &str {
        "Multibyte Length"
    }

    fn signature(&self) -> &FunctionSignature {
        static SIG: Lazy<FunctionSignature> = Lazy::new(|| {
            FunctionSignature::new("mblen", vec![ParameterInfo::self_default("value")])
        });
        &SIG
    }

    fn evaluate<'a>(&self, args: Vec<Dynamic<'a>>) -> Dynamic<'a> {
        match args.first() {
            Some(Dynamic::Str(s)) => Dynamic::Number(s.chars().count() as f64),
            Some(Dynamic::Nil) | None => Dynamic::Number(0.0),
            Some(value) => value
                .len()
                .map_or(Dynamic::Nil, |len| Dynamic::Number(len as f64)),
        }
    }

    fn documentation(&self) -> &str {
        "Returns the character count of a string or the element count of a collection"
    }
}
