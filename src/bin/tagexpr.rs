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

//! Command-line interface for tag expressions
//!
//! Parses expressions, checks tag values and evaluates expressions with `$`
//! bound to a JSON value.

use clap::{Parser, Subcommand};
use serde_json::{Value as JsonValue, from_str as parse_json};
use std::fs;
use std::process;
use std::sync::Arc;
use tagexpr::compiler::{ReferencePolicy, ShapeCompiler, format_selector};
use tagexpr::parser::split_tag;
use tagexpr::ast::{FieldRefCollector, FunctionNameCollector, Visitor};
use tagexpr::{FunctionRegistry, TagExprEngine, parse};

#[derive(Parser)]
#[command(name = "tagexpr")]
#[command(about = "Parse, check and evaluate struct-tag expressions")]
#[command(version)]
#[command(author = "OctoFHIR Team <funyloony@gmail.com>")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse an expression and print its syntax tree
    Parse {
        /// Expression to parse
        expression: String,
        /// Print the syntax tree as JSON
        #[arg(short, long)]
        json: bool,
    },
    /// Split a tag value into groups and check every expression
    Check {
        /// Tag value, e.g. "{min:$>0}{max:$<10}"
        tag: String,
        /// Suppress informational messages
        #[arg(short, long)]
        quiet: bool,
    },
    /// Evaluate an expression with `$` bound to a JSON value
    Eval {
        /// Expression to evaluate
        expression: String,
        /// JSON value bound to `$`
        #[arg(short, long, conflicts_with = "file")]
        subject: Option<String>,
        /// JSON file holding the value bound to `$`
        #[arg(short, long)]
        file: Option<String>,
    },
}

fn main() {
    human_panic::setup_panic!();
    env_logger::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Parse { expression, json } => handle_parse(&expression, json),
        Commands::Check { tag, quiet } => handle_check(&tag, quiet),
        Commands::Eval {
            expression,
            subject,
            file,
        } => handle_eval(&expression, subject.as_deref(), file.as_deref()),
    }
}

fn handle_parse(expression: &str, json: bool) {
    let ast = match parse(expression) {
        Ok(ast) => ast,
        Err(e) => {
            eprintln!("✗ Parse error: {e}");
            process::exit(1);
        }
    };

    if json {
        match serde_json::to_string_pretty(&ast) {
            Ok(output) => println!("{output}"),
            Err(_) => println!("{ast:?}"),
        }
    } else {
        println!("{ast}");
    }
}

fn handle_check(tag: &str, quiet: bool) {
    let groups = match split_tag(tag) {
        Ok(groups) => groups,
        Err(e) => {
            eprintln!("✗ Invalid tag: {e}");
            process::exit(1);
        }
    };

    let compiler = ShapeCompiler::new(
        "cli",
        Arc::new(FunctionRegistry::standard()),
        ReferencePolicy::Deferred,
    );
    let mut failed = false;
    for group in &groups {
        let selector = format_selector("", &group.name);
        let ast = match parse(&group.expression) {
            Ok(ast) => ast,
            Err(e) => {
                failed = true;
                eprintln!("✗ {selector} {e}");
                continue;
            }
        };
        if let Err(e) = compiler.lower_expression(&ast) {
            failed = true;
            eprintln!("✗ {selector} {e}");
            continue;
        }
        if quiet {
            continue;
        }

        println!("✓ {selector} {ast}");
        let mut fields = FieldRefCollector::default();
        fields.visit_expression(&ast);
        if !fields.paths.is_empty() {
            println!("    fields: {}", fields.paths.join(", "));
        }
        let mut calls = FunctionNameCollector::default();
        calls.visit_expression(&ast);
        if !calls.names.is_empty() {
            println!("    calls: {}", calls.names.join(", "));
        }
    }

    if failed {
        process::exit(1);
    }
    if quiet {
        println!("OK");
    }
}

fn handle_eval(expression: &str, subject: Option<&str>, file: Option<&str>) {
    let text = match (subject, file) {
        (Some(subject), _) => subject.to_string(),
        (None, Some(filename)) => match fs::read_to_string(filename) {
            Ok(content) => content,
            Err(e) => {
                eprintln!("Error reading file '{filename}': {e}");
                process::exit(1);
            }
        },
        (None, None) => "null".to_string(),
    };

    let subject: JsonValue = match parse_json(&text) {
        Ok(json) => json,
        Err(e) => {
            eprintln!("Error parsing JSON subject: {e}");
            process::exit(1);
        }
    };

    let engine = TagExprEngine::new("cli");
    match engine.evaluate_expression(expression, &subject) {
        Ok(result) => match serde_json::to_string(&result) {
            Ok(output) => println!("{output}"),
            Err(_) => println!("{result}"),
        },
        Err(e) => {
            eprintln!("Error evaluating expression: {e}");
            process::exit(1);
        }
    }
}
