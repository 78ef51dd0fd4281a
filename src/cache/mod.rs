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

//! Shape cache
//!
//! Compiled shapes keyed by namespace and type. Each key owns a once-cell, so
//! a shape compiles at most once however many threads ask for it, while
//! unrelated keys compile side by side.

use crate::compiler::{CompileResult, CompiledShape, ShapeCompiler};
use crate::model::StructRef;
use dashmap::DashMap;
use once_cell::sync::OnceCell;
use serde::Serialize;
use std::any::TypeId;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Key of one cache entry
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShapeKey {
    namespace: Arc<str>,
    type_id: TypeId,
}

impl ShapeKey {
    /// Key for `shape` compiled in `namespace`
    pub fn new(namespace: Arc<str>, shape: StructRef) -> Self {
        Self {
            namespace,
            type_id: shape.id.type_id(),
        }
    }
}

type Slot = Arc<OnceCell<Arc<CompiledShape>>>;

/// Concurrent cache of compiled shapes
///
/// Engines built with the same function registry may share one cache; the
/// key does not include the registry.
#[derive(Debug, Default)]
pub struct ShapeCache {
    entries: DashMap<ShapeKey, Slot>,
    compilations: AtomicU64,
    hits: AtomicU64,
}

/// Statistics about cache usage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CacheStats {
    /// Successful compilations
    pub compilations: u64,
    /// Lookups served by an already compiled shape
    pub hits: u64,
    /// Compiled shapes held
    pub entries: usize,
}

impl ShapeCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Compiled shape for `shape`, compiling it with `compiler` on first use
    ///
    /// A failed compilation leaves the entry empty; the next call retries.
    pub fn get_or_compile(
        &self,
        shape: StructRef,
        compiler: &ShapeCompiler,
    ) -> CompileResult<Arc<CompiledShape>> {
        let key = ShapeKey::new(Arc::clone(compiler.namespace()), shape);

        // Fast path: already compiled
        if let Some(compiled) = self.entries.get(&key).and_then(|slot| slot.value().get().cloned()) {
            return Ok(self.hit(compiled));
        }

        // Slow path: clone the slot out so the shard lock is released before compiling
        let slot = Arc::clone(self.entries.entry(key).or_default().value());
        let mut compiled_here = false;
        let compiled = slot.get_or_try_init(|| {
            let compiled = compiler.compile(shape)?;
            compiled_here = true;
            Ok(Arc::new(compiled))
        })?;

        if compiled_here {
            self.compilations.fetch_add(1, Ordering::Relaxed);
            Ok(Arc::clone(compiled))
        } else {
            Ok(self.hit(Arc::clone(compiled)))
        }
    }

    fn hit(&self, compiled: Arc<CompiledShape>) -> Arc<CompiledShape> {
        self.hits.fetch_add(1, Ordering::Relaxed);
        log::trace!("Shape cache hit for {}", compiled.id());
        compiled
    }

    /// Compiled shape for `shape`, if already present
    pub fn get(&self, namespace: &Arc<str>, shape: StructRef) -> Option<Arc<CompiledShape>> {
        let key = ShapeKey::new(Arc::clone(namespace), shape);
        self.entries
            .get(&key)
            .and_then(|slot| slot.value().get().cloned())
    }

    /// Number of compiled shapes held
    pub fn len(&self) -> usize {
        self.entries.iter().filter(|slot| slot.value().get().is_some()).count()
    }

    /// Whether no shape has been compiled
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current statistics
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            compilations: self.compilations.load(Ordering::Relaxed),
            hits: self.hits.load(Ordering::Relaxed),
            entries: self.len(),
        }
    }
}
