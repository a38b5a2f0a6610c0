//! Library load/unload hooks
//!
//! A native library has exactly one root context per process. The host calls
//! [`on_load`] from its load entry point and [`on_unload`] from its unload
//! entry point; in between, [`root`] hands out the context.

use crate::error::{JResult, JniError};
use crate::jvm::Jvm;
use crate::options::JvmOptions;
use crate::runtime::RawVm;
use jbind_schema::Namespace;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::sync::Arc;

static ROOT: Lazy<Mutex<Option<Jvm>>> = Lazy::new(|| Mutex::new(None));

/// Build the root context. Fails if one is already loaded.
pub fn on_load(vm: Arc<dyn RawVm>, namespace: Namespace, options: JvmOptions) -> JResult<Jvm> {
    let mut root = ROOT.lock();
    if root.is_some() {
        return Err(JniError::AlreadyLoaded);
    }
    let jvm = Jvm::with_options(vm, namespace, options);
    *root = Some(jvm.clone());
    tracing::debug!("root context loaded");
    Ok(jvm)
}

/// Tear down and forget the root context. Returns the number of cached
/// class references released.
pub fn on_unload() -> JResult<usize> {
    let jvm = ROOT.lock().take().ok_or(JniError::NotLoaded)?;
    let released = jvm.teardown()?;
    tracing::debug!(released, "root context unloaded");
    Ok(released)
}

/// The root context, if loaded
pub fn root() -> Option<Jvm> {
    ROOT.lock().clone()
}
