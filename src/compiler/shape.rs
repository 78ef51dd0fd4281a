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

//! Shape compilation
//!
//! Compiling a shape is two passes. The first flattens the field tree into a
//! table: depth-first in declaration order, through nested structures held by
//! value or behind pointers, skipping placeholder fields and never descending
//! into a type that is already being expanded. The second splits, parses and
//! lowers the tag text of every field against that table, so a reference may
//! name a field declared after it.

use super::error::{CompileError, CompileResult};
use super::program::{Expr, Lowerer};
use crate::ast::ExpressionNode;
use crate::model::{Kind, Reflect, ShapeId, StructRef, Tags};
use crate::parser::{DEFAULT_GROUP, parse, split_tag};
use crate::registry::FunctionRegistry;
use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::sync::Arc;

/// Field indices leading from the root structure to a field
pub type AccessRoute = SmallVec<[usize; 4]>;

/// What to do with a `(path)$` reference that matches no field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferencePolicy {
    /// Compile it to a reference that always evaluates to nil
    #[default]
    Deferred,
    /// Fail compilation
    Strict,
}

/// Selector string for a field path and group name
pub fn format_selector(path: &str, group: &str) -> String {
    if group == DEFAULT_GROUP {
        format!("{path}@")
    } else {
        format!("{path}@{group}")
    }
}

/// One compiled `{name:expr}` group
#[derive(Debug)]
pub struct ExprGroup {
    name: String,
    selector: String,
    source: String,
    expr: Expr,
}

impl ExprGroup {
    /// Group name, `@` for the default group
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Selector addressing this group
    pub fn selector(&self) -> &str {
        &self.selector
    }

    /// Expression text as written in the tag
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Lowered expression
    pub fn expr(&self) -> &Expr {
        &self.expr
    }
}

/// One field of a compiled shape
#[derive(Debug)]
pub struct CompiledField {
    path: String,
    name: &'static str,
    kind: Kind,
    tags: Tags,
    access: AccessRoute,
    parent: Option<usize>,
    groups: Vec<ExprGroup>,
}

impl CompiledField {
    pub(crate) fn new(
        path: String,
        name: &'static str,
        kind: Kind,
        tags: Tags,
        access: AccessRoute,
        parent: Option<usize>,
    ) -> Self {
        Self {
            path,
            name,
            kind,
            tags,
            access,
            parent,
            groups: Vec::new(),
        }
    }

    /// Dot-separated path from the root structure
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Field name
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Declared kind
    pub fn kind(&self) -> &Kind {
        &self.kind
    }

    /// Raw tags of the field
    pub fn tags(&self) -> Tags {
        self.tags
    }

    /// Field indices from the root structure
    pub fn access(&self) -> &[usize] {
        &self.access
    }

    /// Slot of the structure field this field belongs to, `None` at the root
    pub fn parent(&self) -> Option<usize> {
        self.parent
    }

    /// Index of the field within its own structure
    pub fn index(&self) -> usize {
        self.access.last().copied().unwrap_or_default()
    }

    /// Compiled expression groups in tag order
    pub fn groups(&self) -> &[ExprGroup] {
        &self.groups
    }
}

/// Compiled expressions of one shape in one namespace
///
/// Immutable once built and shared between threads through `Arc`.
#[derive(Debug)]
pub struct CompiledShape {
    id: ShapeId,
    namespace: Arc<str>,
    fields: Vec<CompiledField>,
    selectors: IndexMap<String, (usize, usize)>,
    paths: FxHashMap<String, usize>,
}

impl CompiledShape {
    /// Identity of the compiled type
    pub fn id(&self) -> ShapeId {
        self.id
    }

    /// Tag namespace the shape was compiled in
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Every field in depth-first declaration order
    pub fn fields(&self) -> &[CompiledField] {
        &self.fields
    }

    /// Field by path
    pub fn field(&self, path: &str) -> Option<&CompiledField> {
        self.paths.get(path).and_then(|&slot| self.fields.get(slot))
    }

    /// Selectors in field order, then group order
    pub fn selectors(&self) -> impl Iterator<Item = &str> {
        self.selectors.keys().map(String::as_str)
    }

    /// Number of compiled expression groups
    pub fn selector_count(&self) -> usize {
        self.selectors.len()
    }

    /// Whether `selector` addresses a compiled group
    pub fn contains_selector(&self, selector: &str) -> bool {
        self.selectors.contains_key(selector)
    }

    /// Field slot and group index of a selector
    pub fn locate(&self, selector: &str) -> Option<(usize, usize)> {
        self.selectors.get(selector).copied()
    }

    /// Compiled group at a field slot and group index
    pub fn group(&self, slot: usize, group: usize) -> Option<&ExprGroup> {
        self.fields.get(slot).and_then(|field| field.groups.get(group))
    }

    pub(crate) fn selector_entries(&self) -> impl Iterator<Item = (&str, usize, usize)> {
        self.selectors
            .iter()
            .map(|(selector, &(slot, group))| (selector.as_str(), slot, group))
    }
}

/// Compiles shapes for one namespace against one function registry
#[derive(Debug, Clone)]
pub struct ShapeCompiler {
    namespace: Arc<str>,
    registry: Arc<FunctionRegistry>,
    policy: ReferencePolicy,
}

impl ShapeCompiler {
    /// Create a compiler
    pub fn new(
        namespace: impl Into<Arc<str>>,
        registry: Arc<FunctionRegistry>,
        policy: ReferencePolicy,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            registry,
            policy,
        }
    }

    /// Tag namespace
    pub fn namespace(&self) -> &Arc<str> {
        &self.namespace
    }

    /// Function registry used to resolve calls
    pub fn registry(&self) -> &FunctionRegistry {
        &self.registry
    }

    /// Policy for unresolved references
    pub fn policy(&self) -> ReferencePolicy {
        self.policy
    }

    /// Compile the shape of `T`, which must be a structure behind any number of pointers
    pub fn compile_type<T: Reflect>(&self) -> CompileResult<CompiledShape> {
        let shape = T::kind()
            .as_struct()
            .ok_or_else(|| CompileError::NotAStructure {
                type_name: std::any::type_name::<T>().to_string(),
            })?;
        self.compile(shape)
    }

    /// Compile a shape
    pub fn compile(&self, shape: StructRef) -> CompileResult<CompiledShape> {
        let mut fields = Vec::new();
        let mut stack = Vec::new();
        collect_fields(shape, None, &AccessRoute::new(), None, &mut stack, &mut fields);

        let paths: FxHashMap<String, usize> = fields
            .iter()
            .enumerate()
            .map(|(slot, field)| (field.path.clone(), slot))
            .collect();

        let mut selectors = IndexMap::new();
        let mut compiled_groups = Vec::with_capacity(fields.len());
        for (slot, field) in fields.iter().enumerate() {
            let Some(text) = field.tags.get(&self.namespace) else {
                compiled_groups.push(Vec::new());
                continue;
            };
            let groups = split_tag(text).map_err(|source| CompileError::Tag {
                field: field.path.clone(),
                source,
            })?;

            let mut compiled = Vec::with_capacity(groups.len());
            for (index, group) in groups.into_iter().enumerate() {
                let selector = format_selector(&field.path, &group.name);
                let ast = parse(&group.expression).map_err(|source| CompileError::Parse {
                    selector: selector.clone(),
                    source,
                })?;
                let lowerer = Lowerer {
                    fields: &fields,
                    paths: &paths,
                    registry: &self.registry,
                    policy: self.policy,
                    selector: &selector,
                };
                let expr = lowerer.lower(&ast)?;
                selectors.insert(selector.clone(), (slot, index));
                compiled.push(ExprGroup {
                    name: group.name,
                    selector,
                    source: group.expression,
                    expr,
                });
            }
            compiled_groups.push(compiled);
        }

        for (field, groups) in fields.iter_mut().zip(compiled_groups) {
            field.groups = groups;
        }

        log::debug!(
            "Compiled {} in namespace '{}': {} fields, {} selectors",
            shape.id,
            self.namespace,
            fields.len(),
            selectors.len()
        );

        Ok(CompiledShape {
            id: shape.id,
            namespace: Arc::clone(&self.namespace),
            fields,
            selectors,
            paths,
        })
    }

    /// Parse and lower a free-standing expression; every field reference is
    /// unresolved
    pub fn compile_expression(&self, source: &str) -> CompileResult<Expr> {
        let ast = parse(source).map_err(|source| CompileError::Parse {
            selector: format_selector("", DEFAULT_GROUP),
            source,
        })?;
        self.lower_expression(&ast)
    }

    /// Lower an already parsed free-standing expression
    pub fn lower_expression(&self, ast: &ExpressionNode) -> CompileResult<Expr> {
        let selector = format_selector("", DEFAULT_GROUP);
        Lowerer {
            fields: &[],
            paths: &FxHashMap::default(),
            registry: &self.registry,
            policy: self.policy,
            selector: &selector,
        }
        .lower(ast)
    }
}

fn collect_fields(
    shape: StructRef,
    prefix: Option<&str>,
    route: &AccessRoute,
    parent: Option<usize>,
    stack: &mut Vec<ShapeId>,
    out: &mut Vec<CompiledField>,
) {
    stack.push(shape.id);
    for (index, descriptor) in shape.descriptor().fields.into_iter().enumerate() {
        if descriptor.is_placeholder() {
            continue;
        }
        let path = match prefix {
            Some(prefix) => format!("{prefix}.{}", descriptor.name),
            None => descriptor.name.to_string(),
        };
        let mut access = route.clone();
        access.push(index);
        let nested = descriptor.kind.as_struct();

        let slot = out.len();
        out.push(CompiledField::new(
            path,
            descriptor.name,
            descriptor.kind,
            descriptor.tags,
            access,
            parent,
        ));

        if let Some(nested) = nested {
            if stack.contains(&nested.id) {
                log::trace!("Not descending into {} again at '{}'", nested.id, out[slot].path);
                continue;
            }
            let field = &out[slot];
            let (path, access) = (field.path.clone(), field.access.clone());
            collect_fields(nested, Some(&path), &access, Some(slot), stack, out);
        }
    }
    stack.pop();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Reflect;
    use pretty_assertions::assert_eq;

    #[derive(Reflect)]
    struct Inner {
        #[tag(te = "$ > 0")]
        n: i64,
        _pad: u8,
    }

    #[derive(Reflect)]
    struct Node {
        #[tag(te = "{min:$ >= (limit)$}{max:$ < 100}")]
        value: f64,
        inner: Option<Box<Inner>>,
        next: Option<Box<Node>>,
        limit: i32,
        #[tag(skip)]
        #[allow(dead_code)]
        hidden: std::cell::Cell<u8>,
    }

    fn compiler(policy: ReferencePolicy) -> ShapeCompiler {
        ShapeCompiler::new("te", Arc::new(FunctionRegistry::standard()), policy)
    }

    #[test]
    fn test_fields_are_flattened_depth_first() {
        let shape = compiler(ReferencePolicy::Strict).compile_type::<Node>().unwrap();
        let paths: Vec<&str> = shape.fields().iter().map(CompiledField::path).collect();
        assert_eq!(paths, vec!["value", "inner", "inner.n", "next", "limit"]);

        let n = shape.field("inner.n").unwrap();
        assert_eq!(n.access(), &[1, 0]);
        assert_eq!(n.parent(), Some(1));
        assert_eq!(n.index(), 0);
        assert_eq!(shape.field("limit").unwrap().access(), &[3]);
    }

    #[test]
    fn test_selectors_follow_declaration_order() {
        let shape = compiler(ReferencePolicy::Strict).compile_type::<Node>().unwrap();
        let selectors: Vec<&str> = shape.selectors().collect();
        assert_eq!(selectors, vec!["value@min", "value@max", "inner.n@"]);
        assert_eq!(shape.locate("inner.n@"), Some((2, 0)));
        assert_eq!(shape.group(0, 1).map(ExprGroup::source), Some("$ < 100"));
        assert_eq!(shape.namespace(), "te");
        assert_eq!(shape.id(), ShapeId::of::<Node>());
    }

    #[test]
    fn test_other_namespaces_are_ignored() {
        let shape = ShapeCompiler::new(
            "other",
            Arc::new(FunctionRegistry::standard()),
            ReferencePolicy::Strict,
        )
        .compile_type::<Node>()
        .unwrap();
        assert_eq!(shape.selector_count(), 0);
        assert_eq!(shape.fields().len(), 5);
    }

    #[test]
    fn test_non_structures_are_rejected() {
        let err = compiler(ReferencePolicy::Deferred)
            .compile_type::<Vec<i32>>()
            .unwrap_err();
        assert!(matches!(err, CompileError::NotAStructure { .. }));
    }

    #[test]
    fn test_free_standing_expression() {
        let expr = compiler(ReferencePolicy::Deferred)
            .compile_expression("(a)$ == nil")
            .unwrap();
        assert!(matches!(expr, Expr::Binary { .. }));
        assert!(
            compiler(ReferencePolicy::Deferred)
                .compile_expression("1 +")
                .is_err()
        );
    }

    #[test]
    fn test_lower_parsed_expression() {
        let compiler = compiler(ReferencePolicy::Deferred);
        let ast = parse("len($) > 2").unwrap();
        assert!(matches!(
            compiler.lower_expression(&ast).unwrap(),
            Expr::Binary { .. }
        ));

        let unknown = parse("nope($)").unwrap();
        assert!(matches!(
            compiler.lower_expression(&unknown),
            Err(CompileError::Function { .. })
        ));
    }
}
