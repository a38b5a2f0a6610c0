//! Identifier cache and dispatch table
//!
//! Runtime lookups (classes, method ids, field ids) are expensive and their
//! results never change while a context is alive, so each one is performed
//! at most once per [`CacheKey`]. Every key owns a one-shot cell; concurrent
//! first callers block on the cell rather than racing the lookup.
//!
//! Class entries hold global references and are released exactly once, when
//! their namespace is torn down. Method and field ids are plain values and
//! are only forgotten. A release waits for lookups already in flight, and
//! once the whole cache is released it accepts no new lookups.

use crate::error::{JResult, JniError};
use crate::value::{FieldId, MethodId, RawObject};
use dashmap::DashMap;
use jbind_schema::MemberKind;
use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// What a cache entry identifies
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MemberKey {
    /// The class itself
    Class,
    /// A method or constructor
    Method {
        /// Member name
        name: String,
        /// Synthesized signature
        signature: String,
        /// Static member
        is_static: bool,
    },
    /// A field
    Field {
        /// Member name
        name: String,
        /// Synthesized signature
        signature: String,
        /// Static member
        is_static: bool,
    },
}

/// Cache key: namespace partition, loader partition, class and member
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Namespace index inside the context
    pub namespace: u16,
    /// Loader cache index (0 = default loader)
    pub loader: usize,
    /// Class binary name
    pub class: String,
    /// Member within the class
    pub member: MemberKey,
}

impl CacheKey {
    /// Key for the class itself
    pub fn class(namespace: u16, loader: usize, class: impl Into<String>) -> Self {
        Self {
            namespace,
            loader,
            class: class.into(),
            member: MemberKey::Class,
        }
    }

    /// Key for a method
    pub fn method(
        namespace: u16,
        loader: usize,
        class: impl Into<String>,
        name: impl Into<String>,
        signature: impl Into<String>,
        is_static: bool,
    ) -> Self {
        Self {
            namespace,
            loader,
            class: class.into(),
            member: MemberKey::Method {
                name: name.into(),
                signature: signature.into(),
                is_static,
            },
        }
    }

    /// Key for a field
    pub fn field(
        namespace: u16,
        loader: usize,
        class: impl Into<String>,
        name: impl Into<String>,
        signature: impl Into<String>,
        is_static: bool,
    ) -> Self {
        Self {
            namespace,
            loader,
            class: class.into(),
            member: MemberKey::Field {
                name: name.into(),
                signature: signature.into(),
                is_static,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CachedId {
    Class(RawObject),
    Method(MethodId),
    Field(FieldId),
}

/// Process-wide cache of runtime identifiers
#[derive(Debug, Default)]
pub struct IdCache {
    entries: DashMap<CacheKey, Arc<OnceCell<CachedId>>>,
    lookups: AtomicUsize,
    // Shared by lookups, exclusive for releases
    gate: RwLock<()>,
    closed: AtomicBool,
}

impl IdCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or look up a class. `init` must return a global reference; the
    /// cache takes ownership of it.
    pub fn class_id(&self, key: CacheKey, init: impl FnOnce() -> JResult<RawObject>) -> JResult<RawObject> {
        match self.get_or_try_init(key, || init().map(CachedId::Class))? {
            CachedId::Class(raw) => Ok(raw),
            other => Err(format!("cache entry kind mismatch: {:?}", other).into()),
        }
    }

    /// Get or look up a method id
    pub fn method_id(&self, key: CacheKey, init: impl FnOnce() -> JResult<MethodId>) -> JResult<MethodId> {
        match self.get_or_try_init(key, || init().map(CachedId::Method))? {
            CachedId::Method(id) => Ok(id),
            other => Err(format!("cache entry kind mismatch: {:?}", other).into()),
        }
    }

    /// Get or look up a field id
    pub fn field_id(&self, key: CacheKey, init: impl FnOnce() -> JResult<FieldId>) -> JResult<FieldId> {
        match self.get_or_try_init(key, || init().map(CachedId::Field))? {
            CachedId::Field(id) => Ok(id),
            other => Err(format!("cache entry kind mismatch: {:?}", other).into()),
        }
    }

    fn get_or_try_init(&self, key: CacheKey, init: impl FnOnce() -> JResult<CachedId>) -> JResult<CachedId> {
        // Recursive: `init` may look up other keys while a release is waiting
        let _gate = self.gate.read_recursive();
        if self.closed.load(Ordering::Acquire) {
            return Err(JniError::TornDown);
        }
        if let Some(cell) = self.entries.get(&key) {
            if let Some(id) = cell.get() {
                return Ok(*id);
            }
        }

        // Clone the cell out so no shard lock is held while the runtime runs;
        // `init` may itself populate other keys.
        let cell = self.entries.entry(key.clone()).or_default().value().clone();
        let id = cell.get_or_try_init(|| {
            self.lookups.fetch_add(1, Ordering::Relaxed);
            let id = init()?;
            tracing::debug!(
                namespace = key.namespace,
                loader = key.loader,
                class = %key.class,
                member = ?key.member,
                "cached runtime identifier"
            );
            Ok::<_, JniError>(id)
        })?;
        Ok(*id)
    }

    /// Release every class reference cached for `namespace` and forget its
    /// method and field ids. Returns the number of class references
    /// released.
    pub fn release_namespace(&self, namespace: u16, mut release: impl FnMut(RawObject)) -> usize {
        let _gate = self.gate.write();
        let mut released = 0;
        self.entries.retain(|key, cell| {
            if key.namespace != namespace {
                return true;
            }
            if let Some(CachedId::Class(raw)) = cell.get() {
                release(*raw);
                released += 1;
            }
            false
        });
        tracing::debug!(namespace, released, "released namespace identifiers");
        released
    }

    /// Release every cached class reference and forget everything else.
    /// Later lookups fail with [`JniError::TornDown`].
    pub fn release_all(&self, mut release: impl FnMut(RawObject)) -> usize {
        let _gate = self.gate.write();
        self.closed.store(true, Ordering::Release);
        let mut released = 0;
        self.entries.retain(|_, cell| {
            if let Some(CachedId::Class(raw)) = cell.get() {
                release(*raw);
                released += 1;
            }
            false
        });
        tracing::debug!(released, "released all cached identifiers");
        released
    }

    /// Number of populated entries
    pub fn len(&self) -> usize {
        self.entries.iter().filter(|e| e.value().get().is_some()).count()
    }

    /// Check if nothing is cached
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of lookups performed so far
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::Relaxed)
    }
}

// ============================================================================
// Dispatch table
// ============================================================================

/// Key of a memoized overload selection
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DispatchKey {
    /// Namespace index
    pub namespace: u16,
    /// Class the lookup started from
    pub class: String,
    /// Kind of member
    pub kind: MemberKind,
    /// Ancestor depth the lookup started at
    pub depth: usize,
    /// Member name
    pub name: String,
    /// Normalized argument key
    pub args: String,
}

/// Memoized `(class, member, argument types) -> overload index`
#[derive(Debug, Default)]
pub struct DispatchTable {
    table: RwLock<FxHashMap<DispatchKey, usize>>,
}

impl DispatchTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the memoized overload index or run `select` and remember it.
    /// Failed selections are not remembered.
    pub fn resolve<E>(&self, key: DispatchKey, select: impl FnOnce() -> Result<usize, E>) -> Result<usize, E> {
        if let Some(index) = self.table.read().get(&key) {
            return Ok(*index);
        }
        let index = select()?;
        self.table.write().insert(key, index);
        Ok(index)
    }

    /// Number of memoized selections
    pub fn len(&self) -> usize {
        self.table.read().len()
    }

    /// Check if the table is empty
    pub fn is_empty(&self) -> bool {
        self.table.read().is_empty()
    }

    /// Forget every memoized selection
    pub fn clear(&self) {
        self.table.write().clear();
    }
}
