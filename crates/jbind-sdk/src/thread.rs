//! Thread attachment
//!
//! Runtime environments are per thread. A [`ThreadGuard`] keeps the current
//! thread attached for as long as it lives; nested guards on the same thread
//! share one underlying attachment, and the thread is detached when the
//! outermost guard drops. A thread that the runtime had already attached
//! before the first guard is never detached by the guard.

use crate::env::Env;
use crate::error::{JResult, JniError};
use crate::jvm::Jvm;
use crate::runtime::{RawEnv, RawVm};
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

struct Attachment {
    vm: usize,
    depth: usize,
    env: Rc<dyn RawEnv>,
    detach: bool,
}

thread_local! {
    static ATTACHED: RefCell<Vec<Attachment>> = const { RefCell::new(Vec::new()) };
}

fn vm_key(vm: &Arc<dyn RawVm>) -> usize {
    Arc::as_ptr(vm) as *const () as usize
}

/// Environment already available on this thread, from a live guard or from
/// the runtime itself
pub(crate) fn current_raw_env(vm: &Arc<dyn RawVm>) -> Option<Rc<dyn RawEnv>> {
    let key = vm_key(vm);
    let guarded = ATTACHED.with(|slots| {
        slots
            .borrow()
            .iter()
            .find(|a| a.vm == key)
            .map(|a| Rc::clone(&a.env))
    });
    guarded.or_else(|| vm.get_env())
}

/// Run `f` with an environment for this thread, attaching temporarily if
/// needed. Returns `None` if no environment could be obtained.
pub(crate) fn with_raw_env<R>(vm: &Arc<dyn RawVm>, f: impl FnOnce(&dyn RawEnv) -> R) -> Option<R> {
    if let Some(env) = current_raw_env(vm) {
        return Some(f(&*env));
    }
    let env = match vm.attach_current_thread() {
        Ok(env) => env,
        Err(e) => {
            tracing::warn!(error = %e, "could not attach thread to release references");
            return None;
        }
    };
    let result = f(&*env);
    drop(env);
    if let Err(e) = vm.detach_current_thread() {
        tracing::warn!(error = %e, "failed to detach temporarily attached thread");
    }
    Some(result)
}

/// Keeps the current thread attached to the runtime
pub struct ThreadGuard {
    env: Env,
}

impl ThreadGuard {
    pub(crate) fn attach(jvm: &Jvm) -> JResult<Self> {
        let vm = jvm.vm();
        let key = vm_key(vm);

        let existing = ATTACHED.with(|slots| {
            let mut slots = slots.borrow_mut();
            slots.iter_mut().find(|a| a.vm == key).map(|a| {
                a.depth += 1;
                Rc::clone(&a.env)
            })
        });
        if let Some(env) = existing {
            return Ok(Self {
                env: Env::new(env, jvm.clone()),
            });
        }

        let (env, detach) = match vm.get_env() {
            Some(env) => (env, false),
            None => {
                let env = vm
                    .attach_current_thread()
                    .map_err(|e| JniError::AttachFailed(e.to_string()))?;
                (env, true)
            }
        };
        tracing::debug!(detach, "thread attached");
        ATTACHED.with(|slots| {
            slots.borrow_mut().push(Attachment {
                vm: key,
                depth: 1,
                env: Rc::clone(&env),
                detach,
            })
        });
        Ok(Self {
            env: Env::new(env, jvm.clone()),
        })
    }

    /// Environment for this thread
    pub fn env(&self) -> &Env {
        &self.env
    }
}

impl Drop for ThreadGuard {
    fn drop(&mut self) {
        let vm = self.env.jvm().vm();
        let key = vm_key(vm);
        let finished = ATTACHED.with(|slots| {
            let mut slots = slots.borrow_mut();
            let pos = slots.iter().position(|a| a.vm == key)?;
            slots[pos].depth -= 1;
            if slots[pos].depth == 0 {
                Some(slots.swap_remove(pos))
            } else {
                None
            }
        });
        if let Some(attachment) = finished {
            drop(attachment.env);
            if attachment.detach {
                if let Err(e) = vm.detach_current_thread() {
                    tracing::warn!(error = %e, "failed to detach thread");
                }
                tracing::debug!("thread detached");
            }
        }
    }
}
