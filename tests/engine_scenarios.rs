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

//! End-to-end scenarios: tags compiled from derived shapes and evaluated
//! through selectors

use pretty_assertions::assert_eq;
use std::collections::HashMap;
use std::ops::ControlFlow;
use tagexpr::{BoundExpr, ExprValue, Reflect, TagExprEngine};

#[derive(Reflect)]
struct Flat {
    #[tag(tagexpr = "$>0&&$<10")]
    a: i64,
    #[tag(tagexpr = "{@:$>0&&$<10}")]
    a2: i64,
    #[tag(tagexpr = "{is:$=='test'}{msg:sprintf('want: test, but got: %s',$)}")]
    b: String,
    #[tag(tagexpr = "(a)$+$")]
    c: f32,
    #[tag(tagexpr = "$")]
    d: Option<Box<String>>,
    #[tag(tagexpr = "$")]
    e: Box<Box<i32>>,
    #[tag(tagexpr = "{x:len($)}{y:len()}")]
    f: Option<Box<[i32; 3]>>,
    #[tag(tagexpr = r"{x:regexp('g\d{3}$',$)}{y:regexp('g\d{3}$')}")]
    g: String,
    #[tag(tagexpr = "{x:$[1]}{y:$[10]}")]
    h: Vec<String>,
    #[tag(tagexpr = "{x:$['a']}{y:$[0]}")]
    i: HashMap<String, i64>,
}

fn flat() -> Flat {
    Flat {
        a: 5,
        a2: 5,
        b: "x".to_string(),
        c: 1.0,
        d: Some(Box::new("ddd".to_string())),
        e: Box::new(Box::new(3)),
        f: Some(Box::new([0; 3])),
        g: "g123".to_string(),
        h: vec![String::new(), "hehe".to_string()],
        i: HashMap::from([("a".to_string(), 7)]),
    }
}

#[derive(Reflect)]
struct Leaf {
    _pad: i32,
    #[tag(tagexpr = "$")]
    d: bool,
}

#[derive(Reflect)]
struct PointedLeaf {
    _pad: i32,
    #[tag(tagexpr = "$")]
    f: bool,
}

#[derive(Reflect)]
struct Group {
    _pad: i32,
    #[tag(tagexpr = "$")]
    h: String,
    s: Vec<String>,
    m: HashMap<String, Vec<String>>,
}

#[derive(Reflect)]
struct Nested {
    #[tag(tagexpr = "$>0&&$<10")]
    a: i64,
    #[tag(tagexpr = "{is:$=='test'}{msg:sprintf('want: test, but got: %s',$)}")]
    b: String,
    c: Leaf,
    e: Option<Box<PointedLeaf>>,
    #[tag(tagexpr = "$['h']")]
    g: Option<Box<Box<Group>>>,
    #[tag(tagexpr = "(g.s)$[0]+(g.m)$['0'][0]==$")]
    i: String,
    #[tag(tagexpr = "!$")]
    j: bool,
    #[tag(tagexpr = "!$")]
    k: i64,
}

fn nested() -> Nested {
    Nested {
        a: 5,
        b: "x".to_string(),
        c: Leaf { _pad: 0, d: true },
        e: Some(Box::new(PointedLeaf { _pad: 0, f: true })),
        g: Some(Box::new(Box::new(Group {
            _pad: 0,
            h: "haha".to_string(),
            s: vec!["1".to_string()],
            m: HashMap::from([("0".to_string(), vec!["2".to_string()])]),
        }))),
        i: "12".to_string(),
        j: false,
        k: 0,
    }
}

fn s(value: &str) -> ExprValue {
    ExprValue::from(value)
}

/// Every expected selector evaluates as expected, both directly and through
/// `range`; selectors missing from `expected` must evaluate to nil
fn assert_selectors(bound: &BoundExpr<'_>, expected: &[(&str, ExprValue)]) {
    for (selector, value) in expected {
        assert_eq!(&bound.eval(selector), value, "eval {selector}");
    }

    let mut visited = 0;
    let flow = bound.range(|selector, lazy| {
        let want = expected
            .iter()
            .find(|(s, _)| *s == selector)
            .map_or(ExprValue::Nil, |(_, v)| v.clone());
        assert_eq!(lazy.eval(), want, "range {selector}");
        visited += 1;
        ControlFlow::Continue(())
    });
    assert_eq!(flow, ControlFlow::Continue(()));
    assert_eq!(visited, bound.shape().selector_count());
}

#[test]
fn test_flat_scenarios() {
    let engine = TagExprEngine::new("tagexpr");
    let value = flat();
    let bound = engine.run(&value).unwrap();

    assert_selectors(
        &bound,
        &[
            ("a@", ExprValue::Bool(true)),
            ("a2@", ExprValue::Bool(true)),
            ("b@is", ExprValue::Bool(false)),
            ("b@msg", s("want: test, but got: x")),
            ("c@", ExprValue::Number(6.0)),
            ("d@", s("ddd")),
            ("e@", ExprValue::Number(3.0)),
            ("f@x", ExprValue::Number(3.0)),
            ("f@y", ExprValue::Number(3.0)),
            ("g@x", ExprValue::Bool(true)),
            ("g@y", ExprValue::Bool(true)),
            ("h@x", s("hehe")),
            ("h@y", ExprValue::Nil),
            ("i@x", ExprValue::Number(7.0)),
            ("i@y", ExprValue::Nil),
        ],
    );
}

#[test]
fn test_nested_scenarios() {
    let engine = TagExprEngine::new("tagexpr");
    let value = nested();
    let bound = engine.run(&value).unwrap();

    assert_selectors(
        &bound,
        &[
            ("a@", ExprValue::Bool(true)),
            ("b@is", ExprValue::Bool(false)),
            ("b@msg", s("want: test, but got: x")),
            ("c.d@", ExprValue::Bool(true)),
            ("e.f@", ExprValue::Bool(true)),
            ("g.h@", s("haha")),
            ("i@", ExprValue::Bool(true)),
            ("j@", ExprValue::Bool(true)),
            ("k@", ExprValue::Nil),
        ],
    );
    // indexing a structure yields nil
    assert!(bound.eval("g@").is_nil());
}

#[test]
fn test_range_order_and_early_exit() {
    let engine = TagExprEngine::new("tagexpr");
    let value = nested();
    let bound = engine.run(&value).unwrap();

    let mut order = Vec::new();
    let _ = bound.range(|selector, _| {
        order.push(selector.to_string());
        ControlFlow::Continue(())
    });
    assert_eq!(
        order,
        vec![
            "a@", "b@is", "b@msg", "c.d@", "e.f@", "g@", "g.h@", "i@", "j@", "k@"
        ]
    );

    let mut seen = Vec::new();
    let flow = bound.range(|selector, lazy| {
        seen.push((selector.to_string(), lazy.field_path().to_string()));
        if selector == "b@msg" {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    });
    assert_eq!(flow, ControlFlow::Break(()));
    assert_eq!(
        seen,
        vec![
            ("a@".to_string(), "a".to_string()),
            ("b@is".to_string(), "b".to_string()),
            ("b@msg".to_string(), "b".to_string()),
        ]
    );
}

#[test]
fn test_empty_pointers_evaluate_to_nil() {
    let engine = TagExprEngine::new("tagexpr");
    let mut value = nested();
    value.e = None;
    value.g = None;
    let bound = engine.run(&value).unwrap();

    assert!(bound.eval("e.f@").is_nil());
    assert!(bound.eval("g.h@").is_nil());
    // nil + nil is nil, and nil == "12" is false
    assert_eq!(bound.eval("i@"), ExprValue::Bool(false));
    assert!(bound.eval_bool("a@"));
}

#[test]
fn test_convenience_accessors() {
    let engine = TagExprEngine::new("tagexpr");
    let value = flat();
    let bound = engine.run(&value).unwrap();

    assert_eq!(bound.eval_f64("c@"), 6.0);
    assert_eq!(bound.eval_f64("b@msg"), 0.0);
    assert_eq!(bound.eval_string("d@"), "ddd");
    assert_eq!(bound.eval_string("c@"), "");
    assert!(!bound.eval_bool("h@y"));
    assert!(!bound.eval_bool("unknown@"));
}

#[test]
fn test_evaluation_is_deterministic() {
    let engine = TagExprEngine::new("tagexpr");
    let value = flat();
    let bound = engine.run(&value).unwrap();
    let first: Vec<ExprValue> = bound.shape().selectors().map(|s| bound.eval(s)).collect();
    let second: Vec<ExprValue> = bound.shape().selectors().map(|s| bound.eval(s)).collect();
    assert_eq!(first, second);
}

#[derive(Reflect)]
struct Modulo {
    #[tag(bench = "$%3")]
    a: i32,
}

#[test]
fn test_warm_up_then_run() {
    let engine = TagExprEngine::new("bench");
    let shape = engine.warm_up::<Modulo>().unwrap();
    assert_eq!(shape.selectors().collect::<Vec<_>>(), vec!["a@"]);

    let value = Modulo { a: 10 };
    for _ in 0..3 {
        let bound = engine.run(&value).unwrap();
        assert_eq!(bound.eval_f64("a@"), 1.0);
    }
    let stats = engine.cache_stats();
    assert_eq!(stats.compilations, 1);
    assert_eq!(stats.hits, 3);
}

#[derive(Reflect)]
struct Oversized {
    #[tag(tagexpr = "sprintf('%.70000f', $)")]
    a: f64,
    #[tag(tagexpr = "{wide:sprintf('%99999999999999999s', $)}{ok:sprintf('%3s', $)}")]
    b: String,
}

#[test]
fn test_oversized_format_directives_are_rejected() {
    let engine = TagExprEngine::new("tagexpr");
    let value = Oversized {
        a: 1.5,
        b: "x".to_string(),
    };
    let bound = engine.run(&value).unwrap();
    assert_selectors(
        &bound,
        &[
            ("a@", s("%!(BADPREC)")),
            ("b@wide", s("%!(BADWIDTH)")),
            ("b@ok", s("  x")),
        ],
    );
}
