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

//! sprintf() function with Go-style formatting verbs

use crate::model::Dynamic;
use crate::model::value::integral;
use crate::registry::function::ExprFunction;
use crate::registry::signature::{FunctionSignature, ParameterInfo};
use once_cell::sync::Lazy;
use std::fmt::Write;
use std::iter::Peekable;
use std::str::Chars;

/// Largest accepted width
const MAX_WIDTH: usize = 1_000_000;

/// Largest accepted precision, bounded by what `format!` accepts
const MAX_PRECISION: usize = u16::MAX as usize;

/// sprintf(format, args...)
///
/// Supported verbs: `%v %s %d %f %t %q %x %%`, with optional `-`/`0`
/// flags, width and precision (`%-5s`, `%03d`, `%.2f`). Missing arguments
/// render as `%!v(MISSING)`, unused ones as `%!(EXTRA type=value)`, and a
/// verb that does not fit its argument as `%!d(type=value)`. Widths above
/// one million render `%!(BADWIDTH)` and precisions above 65535 render
/// `%!(BADPREC)`; both still consume their argument.
pub struct SprintfFunction;

impl ExprFunction for SprintfFunction {
    fn name(&self) -> &str {
        "sprintf"
    }

    fn human_friendly_name(&self) -> &str {
        "Format String"
    }

    fn signature(&self) -> &FunctionSignature {
        static SIG: Lazy<FunctionSignature> = Lazy::new(|| {
            FunctionSignature::variadic(
                "sprintf",
                vec![
                    ParameterInfo::required("format"),
                    ParameterInfo::optional("args"),
                ],
            )
        });
        &SIG
    }

    fn evaluate<'a>(&self, args: Vec<Dynamic<'a>>) -> Dynamic<'a> {
        match args.split_first() {
            Some((Dynamic::Str(format), rest)) => Dynamic::string(sprintf(format, rest)),
            _ => Dynamic::Nil,
        }
    }

    fn documentation(&self) -> &str {
        "Formats its arguments according to a Go-style format string"
    }
}

/// Parsed `%[flags][width][.precision]verb` directive
#[derive(Debug, Default, Clone, Copy)]
struct Directive {
    left_align: bool,
    zero_pad: bool,
    width: Option<usize>,
    precision: Option<usize>,
}

impl Directive {
    fn pad(&self, body: String) -> String {
        let Some(width) = self.width else {
            return body;
        };
        let len = body.chars().count();
        if len >= width {
            return body;
        }
        let fill = width - len;
        if self.left_align {
            format!("{body}{}", " ".repeat(fill))
        } else if self.zero_pad {
            match body.strip_prefix('-') {
                Some(digits) => format!("-{}{digits}", "0".repeat(fill)),
                None => format!("{}{body}", "0".repeat(fill)),
            }
        } else {
            format!("{}{body}", " ".repeat(fill))
        }
    }
}

/// Go type name of a value, for error directives
fn go_type(value: &Dynamic<'_>) -> &'static str {
    match value {
        Dynamic::Nil => "<nil>",
        Dynamic::Bool(_) => "bool",
        Dynamic::Number(_) => "float64",
        Dynamic::Str(_) => "string",
        Dynamic::Sequence(_) => "[]interface {}",
        Dynamic::Mapping(_) => "map",
        Dynamic::Struct(_) => "struct",
    }
}

/// Default (`%v`) rendering of a value
pub(crate) fn format_value(value: &Dynamic<'_>) -> String {
    match value {
        Dynamic::Nil => "<nil>".to_string(),
        Dynamic::Bool(b) => b.to_string(),
        Dynamic::Number(n) => n.to_string(),
        Dynamic::Str(s) => s.to_string(),
        Dynamic::Sequence(seq) => {
            let items: Vec<String> = (0..seq.len())
                .map(|i| format_value(&Dynamic::from(seq.element(i))))
                .collect();
            format!("[{}]", items.join(" "))
        }
        Dynamic::Mapping(map) => format!("map[len={}]", map.len()),
        Dynamic::Struct(s) => format!("{{{}}}", s.type_name()),
    }
}

/// Read a run of decimal digits, saturating instead of overflowing
fn read_number(chars: &mut Peekable<Chars<'_>>) -> Option<usize> {
    let mut value: Option<usize> = None;
    while let Some(digit) = chars.peek().and_then(|c| c.to_digit(10)) {
        value = Some(value.unwrap_or(0).saturating_mul(10).saturating_add(digit as usize));
        chars.next();
    }
    value
}

fn bad_verb(verb: char, value: &Dynamic<'_>) -> String {
    format!("%!{verb}({}={})", go_type(value), format_value(value))
}

fn format_one(verb: char, directive: &Directive, value: &Dynamic<'_>) -> String {
    let body = match (verb, value) {
        ('v', _) => match (value, directive.precision) {
            (Dynamic::Number(n), Some(p)) => format!("{n:.p$}"),
            _ => format_value(value),
        },
        ('s', Dynamic::Str(s)) => match directive.precision {
            Some(p) => s.chars().take(p).collect(),
            None => s.to_string(),
        },
        ('s', _) => format_value(value),
        ('d', Dynamic::Number(n)) => match integral(n.trunc()) {
            Some(i) => i.to_string(),
            None => bad_verb(verb, value),
        },
        ('f', Dynamic::Number(n)) => format!("{n:.prec$}", prec = directive.precision.unwrap_or(6)),
        ('t', Dynamic::Bool(b)) => b.to_string(),
        ('q', Dynamic::Str(s)) => format!("{s:?}"),
        ('x', Dynamic::Number(n)) => match integral(*n) {
            Some(i) if i < 0 => format!("-{:x}", i.unsigned_abs()),
            Some(i) => format!("{i:x}"),
            None => bad_verb(verb, value),
        },
        ('x', Dynamic::Str(s)) => s.bytes().fold(String::new(), |mut out, b| {
            let _ = write!(out, "{b:02x}");
            out
        }),
        _ => bad_verb(verb, value),
    };
    directive.pad(body)
}

/// Format `args` according to `format`
pub fn sprintf(format: &str, args: &[Dynamic<'_>]) -> String {
    let mut out = String::with_capacity(format.len() + 16);
    let mut chars = format.chars().peekable();
    let mut next_arg = 0;

    while let Some(ch) = chars.next() {
        if ch != '%' {
            out.push(ch);
            continue;
        }

        let mut directive = Directive::default();
        while let Some(&flag) = chars.peek() {
            match flag {
                '-' => directive.left_align = true,
                '0' => directive.zero_pad = true,
                _ => break,
            }
            chars.next();
        }
        let mut rejected = None;
        match read_number(&mut chars) {
            Some(width) if width > MAX_WIDTH => rejected = Some("%!(BADWIDTH)"),
            width => directive.width = width,
        }
        if chars.peek() == Some(&'.') {
            chars.next();
            match read_number(&mut chars).unwrap_or(0) {
                precision if precision > MAX_PRECISION => {
                    rejected.get_or_insert("%!(BADPREC)");
                }
                precision => directive.precision = Some(precision),
            }
        }

        match chars.next() {
            Some('%') => out.push('%'),
            Some(verb) => match (args.get(next_arg), rejected) {
                (Some(_), Some(marker)) => {
                    next_arg += 1;
                    out.push_str(marker);
                }
                (Some(value), None) => {
                    next_arg += 1;
                    out.push_str(&format_one(verb, &directive, value));
                }
                (None, _) => {
                    let _ = write!(out, "%!{verb}(MISSING)");
                }
            },
            None => out.push_str("%!(NOVERB)"),
        }
    }

    if next_arg < args.len() {
        let extra: Vec<String> = args[next_arg..]
            .iter()
            .map(|value| format!("{}={}", go_type(value), format_value(value)))
            .collect();
        let _ = write!(out, "%!(EXTRA {})", extra.join(", "));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("want: test, but got: %s", vec![Dynamic::string("x")], "want: test, but got: x")]
    #[case("%v|%v|%v", vec![Dynamic::Number(6.0), Dynamic::Bool(true), Dynamic::Nil], "6|true|<nil>")]
    #[case("%d items", vec![Dynamic::Number(3.9)], "3 items")]
    #[case("%.2f", vec![Dynamic::Number(1.0 / 3.0)], "0.33")]
    #[case("%f", vec![Dynamic::Number(1.5)], "1.500000")]
    #[case("%q", vec![Dynamic::string("a\"b")], "\"a\\\"b\"")]
    #[case("%t", vec![Dynamic::Bool(false)], "false")]
    #[case("%x %x", vec![Dynamic::Number(255.0), Dynamic::string("hi")], "ff 6869")]
    #[case("100%%", vec![], "100%")]
    #[case("[%5s][%-5s][%03d]", vec![Dynamic::string("ab"), Dynamic::string("ab"), Dynamic::Number(-7.0)], "[   ab][ab   ][-07]")]
    #[case("%.70000f", vec![Dynamic::Number(1.5)], "%!(BADPREC)")]
    #[case("%.70000v|%v", vec![Dynamic::Number(1.5), Dynamic::Bool(true)], "%!(BADPREC)|true")]
    #[case("%99999999999999999s", vec![Dynamic::string("x")], "%!(BADWIDTH)")]
    #[case("%1000001d|%s", vec![Dynamic::Number(1.0), Dynamic::string("y")], "%!(BADWIDTH)|y")]
    #[case("%99999999999999999.99999999999999999f", vec![Dynamic::Number(1.0)], "%!(BADWIDTH)")]
    fn test_verbs(#[case] format: &str, #[case] args: Vec<Dynamic<'static>>, #[case] expected: &str) {
        assert_eq!(sprintf(format, &args), expected);
    }

    #[test]
    fn test_argument_mismatches() {
        assert_eq!(sprintf("%s and %v", &[Dynamic::string("a")]), "a and %!v(MISSING)");
        assert_eq!(
            sprintf("%d", &[Dynamic::string("x")]),
            "%!d(string=x)"
        );
        assert_eq!(
            sprintf("%s", &[Dynamic::string("a"), Dynamic::Number(2.0)]),
            "a%!(EXTRA float64=2)"
        );
        assert_eq!(sprintf("50%", &[]), "50%!(NOVERB)");
    }

    #[test]
    fn test_sequence_rendering() {
        let items = vec![String::from("a"), String::from("b")];
        assert_eq!(sprintf("%v", &[Dynamic::Sequence(&items)]), "[a b]");
    }

    #[test]
    fn test_non_string_format_is_nil() {
        assert!(
            SprintfFunction
                .evaluate(vec![Dynamic::Number(1.0)])
                .is_nil()
        );
    }
}
