//! Root context
//!
//! A [`Jvm`] owns everything with process lifetime: the runtime handle, the
//! declared namespaces, the identifier cache and the dispatch table. It is
//! cheap to clone and `Send + Sync`; durable handles keep a clone so they can
//! release themselves from any thread. Tearing the context down (explicitly
//! or when the last clone drops) releases every cached class reference.

use crate::cache::{DispatchTable, IdCache};
use crate::env::Env;
use crate::error::{JResult, JniError};
use crate::options::JvmOptions;
use crate::runtime::RawVm;
use crate::thread::{self, ThreadGuard};
use jbind_schema::{ClassIdx, LoaderId, Namespace};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A declared class resolved inside a context
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClassRef {
    /// Namespace index inside the context
    pub namespace: u16,
    /// Index inside the namespace's registry
    pub idx: ClassIdx,
    /// Loader the class is resolved under
    pub loader: LoaderId,
    /// Binary name
    pub name: Arc<str>,
}

impl ClassRef {
    /// Binary name of the class
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for ClassRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.loader)
    }
}

pub(crate) struct JvmInner {
    vm: Arc<dyn RawVm>,
    namespaces: Vec<Arc<Namespace>>,
    cache: IdCache,
    dispatch: DispatchTable,
    options: JvmOptions,
    torn_down: AtomicBool,
}

impl Drop for JvmInner {
    fn drop(&mut self) {
        if !self.torn_down.swap(true, Ordering::AcqRel) {
            release_cache(&self.vm, &self.cache, &self.dispatch);
        }
    }
}

fn release_cache(vm: &Arc<dyn RawVm>, cache: &IdCache, dispatch: &DispatchTable) -> usize {
    dispatch.clear();
    let released = thread::with_raw_env(vm, |env| cache.release_all(|raw| env.delete_global_ref(raw)));
    match released {
        Some(count) => count,
        None => {
            tracing::warn!("no runtime environment during teardown; cached class references leaked");
            0
        }
    }
}

/// Root binding context
#[derive(Clone)]
pub struct Jvm {
    inner: Arc<JvmInner>,
}

impl fmt::Debug for Jvm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Jvm")
            .field("namespaces", &self.inner.namespaces.len())
            .field("cached", &self.inner.cache.len())
            .field("options", &self.inner.options)
            .field("torn_down", &self.is_torn_down())
            .finish()
    }
}

impl Jvm {
    /// Context with a single namespace and default options
    pub fn new(vm: Arc<dyn RawVm>, namespace: Namespace) -> Self {
        Self::builder(vm).namespace(namespace).build()
    }

    /// Context with a single namespace and explicit options
    pub fn with_options(vm: Arc<dyn RawVm>, namespace: Namespace, options: JvmOptions) -> Self {
        Self::builder(vm).namespace(namespace).options(options).build()
    }

    /// Start building a context
    pub fn builder(vm: Arc<dyn RawVm>) -> JvmBuilder {
        JvmBuilder {
            vm,
            namespaces: Vec::new(),
            options: JvmOptions::default(),
        }
    }

    /// Attach the current thread (or join an existing attachment)
    pub fn attach_current_thread(&self) -> JResult<ThreadGuard> {
        ThreadGuard::attach(self)
    }

    /// Environment of the current thread without attaching it
    pub fn current_env(&self) -> JResult<Env> {
        let raw = thread::current_raw_env(&self.inner.vm).ok_or(JniError::NotAttached)?;
        Ok(Env::new(raw, self.clone()))
    }

    /// The runtime handle
    pub fn vm(&self) -> &Arc<dyn RawVm> {
        &self.inner.vm
    }

    /// Namespace by index
    pub fn namespace(&self, index: u16) -> JResult<&Arc<Namespace>> {
        self.inner
            .namespaces
            .get(index as usize)
            .ok_or(JniError::NoNamespace(index))
    }

    /// Number of namespaces
    pub fn namespace_count(&self) -> usize {
        self.inner.namespaces.len()
    }

    /// Options this context was built with
    pub fn options(&self) -> &JvmOptions {
        &self.inner.options
    }

    /// Identifier cache
    pub fn cache(&self) -> &IdCache {
        &self.inner.cache
    }

    pub(crate) fn dispatch(&self) -> &DispatchTable {
        &self.inner.dispatch
    }

    /// Check whether the cache has been released
    pub fn is_torn_down(&self) -> bool {
        self.inner.torn_down.load(Ordering::Acquire)
    }

    /// Resolve a declared class in a namespace under its owning loader
    pub fn class_in(&self, namespace: u16, name: &str) -> JResult<ClassRef> {
        let ns = self.namespace(namespace)?;
        let (idx, loader) = ns.resolve_class(name)?;
        Ok(ClassRef {
            namespace,
            idx,
            loader,
            name: Arc::from(name),
        })
    }

    /// Release the cached class references of one namespace
    pub fn release_namespace(&self, namespace: u16) -> JResult<usize> {
        self.namespace(namespace)?;
        let cache = &self.inner.cache;
        thread::with_raw_env(&self.inner.vm, |env| {
            cache.release_namespace(namespace, |raw| env.delete_global_ref(raw))
        })
        .ok_or(JniError::NotAttached)
    }

    /// Release every cached class reference. Later calls through this
    /// context fail with [`JniError::TornDown`]. Returns the number of
    /// class references released; a second teardown releases nothing.
    pub fn teardown(&self) -> JResult<usize> {
        if self.inner.torn_down.swap(true, Ordering::AcqRel) {
            return Ok(0);
        }
        let released = release_cache(&self.inner.vm, &self.inner.cache, &self.inner.dispatch);
        tracing::debug!(released, "context torn down");
        Ok(released)
    }
}

/// Builder for [`Jvm`]
pub struct JvmBuilder {
    vm: Arc<dyn RawVm>,
    namespaces: Vec<Arc<Namespace>>,
    options: JvmOptions,
}

impl JvmBuilder {
    /// Add a namespace; indices follow insertion order
    pub fn namespace(mut self, namespace: Namespace) -> Self {
        self.namespaces.push(Arc::new(namespace));
        self
    }

    /// Set the options
    pub fn options(mut self, options: JvmOptions) -> Self {
        self.options = options;
        self
    }

    /// Build the context
    pub fn build(self) -> Jvm {
        Jvm {
            inner: Arc::new(JvmInner {
                vm: self.vm,
                namespaces: self.namespaces,
                cache: IdCache::new(),
                dispatch: DispatchTable::new(),
                options: self.options,
                torn_down: AtomicBool::new(false),
            }),
        }
    }
}
