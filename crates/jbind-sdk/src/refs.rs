//! Transient and durable references
//!
//! [`Local`] is a transient reference tied to the environment (and thread)
//! it came from. [`Global`] is a durable reference that may move between
//! threads. Both release their reference exactly once, on drop; moving a
//! handle moves that obligation, and `release` hands the raw reference back
//! without releasing it.
//!
//! Conversions:
//! - [`Local::wrap`] creates a new local reference to a borrowed object
//! - [`Local::adopt`] / [`Global::adopt`] take ownership of an existing one
//! - [`Global::copy`] creates a new global reference, leaving the source alone
//! - [`Local::promote`] creates a global and releases the local (one release)

use crate::env::Env;
use crate::jvm::Jvm;
use crate::thread;
use crate::value::RawObject;
use std::fmt;
use std::mem;

/// Access to the raw reference behind a handle
pub trait AsRaw {
    /// The raw reference (still owned by the handle)
    fn as_raw(&self) -> RawObject;
}

impl AsRaw for RawObject {
    fn as_raw(&self) -> RawObject {
        *self
    }
}

impl<T: AsRaw + ?Sized> AsRaw for &T {
    fn as_raw(&self) -> RawObject {
        (**self).as_raw()
    }
}

// ============================================================================
// Local
// ============================================================================

/// Transient reference, released when dropped
pub struct Local<'e> {
    raw: RawObject,
    env: &'e Env,
}

impl<'e> Local<'e> {
    /// New local reference to `raw`; the caller keeps its own reference
    pub fn wrap(env: &'e Env, raw: RawObject) -> Self {
        let raw = if raw.is_null() {
            raw
        } else {
            env.raw().new_local_ref(raw)
        };
        Self { raw, env }
    }

    /// Take ownership of a local reference
    pub fn adopt(env: &'e Env, raw: RawObject) -> Self {
        Self { raw, env }
    }

    /// Environment this reference belongs to
    pub fn env(&self) -> &'e Env {
        self.env
    }

    /// Check for null
    pub fn is_null(&self) -> bool {
        self.raw.is_null()
    }

    /// Create a durable reference and release this one
    pub fn promote(mut self) -> Global {
        let env = self.env;
        let local = mem::replace(&mut self.raw, RawObject::NULL);
        let global = if local.is_null() {
            local
        } else {
            let global = env.raw().new_global_ref(local);
            env.raw().delete_local_ref(local);
            global
        };
        Global::adopt(env.jvm(), global)
    }

    /// Create a durable reference, keeping this one
    pub fn to_global(&self) -> Global {
        Global::copy(self.env, self.raw)
    }

    /// Give up ownership without releasing
    pub fn release(mut self) -> RawObject {
        mem::replace(&mut self.raw, RawObject::NULL)
    }
}

impl AsRaw for Local<'_> {
    fn as_raw(&self) -> RawObject {
        self.raw
    }
}

impl Drop for Local<'_> {
    fn drop(&mut self) {
        if !self.raw.is_null() {
            self.env.raw().delete_local_ref(self.raw);
        }
    }
}

impl fmt::Debug for Local<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Local").field(&self.raw.0).finish()
    }
}

// ============================================================================
// Global
// ============================================================================

/// Durable reference, released when dropped on whatever thread drops it
pub struct Global {
    raw: RawObject,
    jvm: Jvm,
}

impl Global {
    /// Take ownership of a global reference
    pub fn adopt(jvm: &Jvm, raw: RawObject) -> Self {
        Self {
            raw,
            jvm: jvm.clone(),
        }
    }

    /// New global reference to `raw`; the source is untouched
    pub fn copy(env: &Env, raw: RawObject) -> Self {
        let raw = if raw.is_null() {
            raw
        } else {
            env.raw().new_global_ref(raw)
        };
        Self::adopt(env.jvm(), raw)
    }

    /// New local reference to the same object
    pub fn to_local<'e>(&self, env: &'e Env) -> Local<'e> {
        Local::wrap(env, self.raw)
    }

    /// Context this reference belongs to
    pub fn jvm(&self) -> &Jvm {
        &self.jvm
    }

    /// Check for null
    pub fn is_null(&self) -> bool {
        self.raw.is_null()
    }

    /// Give up ownership without releasing
    pub fn release(mut self) -> RawObject {
        mem::replace(&mut self.raw, RawObject::NULL)
    }
}

impl AsRaw for Global {
    fn as_raw(&self) -> RawObject {
        self.raw
    }
}

impl Drop for Global {
    fn drop(&mut self) {
        if self.raw.is_null() {
            return;
        }
        let raw = self.raw;
        if thread::with_raw_env(self.jvm.vm(), |env| env.delete_global_ref(raw)).is_none() {
            tracing::warn!(raw = raw.0, "global reference leaked: no runtime environment");
        }
    }
}

impl fmt::Debug for Global {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Global").field(&self.raw.0).finish()
    }
}
