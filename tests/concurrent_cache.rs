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

//! Concurrent use of the shape cache and of one engine

use pretty_assertions::assert_eq;
use std::sync::{Arc, Barrier};
use std::thread;
use tagexpr::{EngineConfig, Reflect, ShapeCache, TagExprEngine};

#[derive(Reflect)]
struct Account {
    #[tag(rule = "$ >= 0")]
    balance: f64,
    #[tag(rule = "{len:len() > 2}{upper:regexp('^[A-Z]+$')}")]
    owner: String,
}

#[derive(Reflect)]
struct Transfer {
    #[tag(rule = "$ > 0 && $ <= (limit)$")]
    amount: f64,
    limit: f64,
}

const THREADS: usize = 8;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn test_concurrent_first_use_compiles_once() {
    init_logging();
    let engine = TagExprEngine::new("rule");
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|i| {
            let engine = engine.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                let account = Account {
                    balance: i as f64 - 1.0,
                    owner: "ABC".to_string(),
                };
                let bound = engine.run(&account).unwrap();
                (
                    bound.eval_bool("balance@"),
                    bound.eval_bool("owner@len"),
                    bound.eval_bool("owner@upper"),
                )
            })
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        let (balance, len, upper) = handle.join().unwrap();
        assert_eq!(balance, i >= 1);
        assert!(len);
        assert!(upper);
    }

    let stats = engine.cache_stats();
    assert_eq!(stats.compilations, 1);
    assert_eq!(stats.hits, THREADS as u64 - 1);
    assert_eq!(stats.entries, 1);
}

#[test]
fn test_unrelated_shapes_compile_independently() {
    init_logging();
    let engine = TagExprEngine::new("rule");
    let handles: Vec<_> = (0..THREADS)
        .map(|i| {
            let engine = engine.clone();
            thread::spawn(move || {
                if i % 2 == 0 {
                    engine.warm_up::<Account>().unwrap().selector_count()
                } else {
                    engine.warm_up::<Transfer>().unwrap().selector_count()
                }
            })
        })
        .collect();

    let counts: Vec<usize> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    for (i, count) in counts.into_iter().enumerate() {
        assert_eq!(count, if i % 2 == 0 { 3 } else { 1 });
    }
    let stats = engine.cache_stats();
    assert_eq!(stats.compilations, 2);
    assert_eq!(stats.entries, 2);
}

#[test]
fn test_shared_cache_between_engines() {
    let cache = Arc::new(ShapeCache::new());
    let first = TagExprEngine::builder("rule")
        .shared_cache(Arc::clone(&cache))
        .build();
    let second = tagexpr::EngineBuilder::from_config(EngineConfig::new("rule"))
        .shared_cache(Arc::clone(&cache))
        .build();

    let a = first.warm_up::<Transfer>().unwrap();
    let b = second.warm_up::<Transfer>().unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(cache.stats().compilations, 1);

    let transfer = Transfer {
        amount: 50.0,
        limit: 20.0,
    };
    assert!(!second.run(&transfer).unwrap().eval_bool("amount@"));
}

#[test]
fn test_compiled_shapes_are_shared_across_threads() {
    let engine = TagExprEngine::new("rule");
    let shape = engine.warm_up::<Transfer>().unwrap();
    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let shape = Arc::clone(&shape);
            thread::spawn(move || shape.selectors().map(str::to_string).collect::<Vec<_>>())
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap(), vec!["amount@".to_string()]);
    }
}
