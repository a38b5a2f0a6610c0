//! Class loader objects
//!
//! Classes claimed by a custom loader cannot be found by name; they have to
//! be loaded through a runtime class loader object. A [`ClassLoaderObject`]
//! binds such an object to a declared loader so the classes it supports can
//! be loaded, cached and instantiated.

use crate::args::Arg;
use crate::env::{ClassSource, Env};
use crate::error::{JResult, JniError};
use crate::jvm::ClassRef;
use crate::object::{GlobalObject, LocalObject};
use crate::refs::{AsRaw, Global};
use crate::value::RawObject;
use jbind_schema::{LoaderId, SchemaError};
use std::sync::Arc;

/// Durable reference to a runtime class loader bound to a declared loader
#[derive(Debug)]
pub struct ClassLoaderObject {
    handle: Global,
    loader: LoaderId,
    namespace: u16,
}

impl ClassLoaderObject {
    /// Bind the loader object `raw` to the loader named `loader` in
    /// `namespace`. The reference is copied; the caller keeps its own.
    pub fn new(env: &Env, namespace: u16, loader: &str, raw: RawObject) -> JResult<Self> {
        if raw.is_null() {
            return Err(JniError::NullReference(format!("class loader {}", loader)));
        }
        let ns = env.jvm().namespace(namespace)?;
        let id = ns.loader_id(loader).ok_or_else(|| SchemaError::UnknownLoader {
            name: loader.to_string(),
        })?;
        Ok(Self {
            handle: Global::copy(env, raw),
            loader: id,
            namespace,
        })
    }

    /// Declared loader this object stands for
    pub fn loader(&self) -> LoaderId {
        self.loader
    }

    /// Namespace the loader belongs to
    pub fn namespace(&self) -> u16 {
        self.namespace
    }

    /// Resolve `name` as seen from this loader and make sure its class
    /// object is cached, loading it through this loader if needed
    pub fn load_class(&self, env: &Env, name: &str) -> JResult<ClassRef> {
        let ns = env.jvm().namespace(self.namespace)?;
        let (idx, _) = ns.registry().class(name)?;
        let loader = ns.owning_loader_from(self.loader, name)?;
        env.class_object(self.namespace, name, loader, self.source(loader))?;
        Ok(ClassRef {
            namespace: self.namespace,
            idx,
            loader,
            name: Arc::from(name),
        })
    }

    /// Load `name` and construct a transient instance
    pub fn build_local_object<'e>(&self, env: &'e Env, name: &str, args: &[Arg<'_>]) -> JResult<LocalObject<'e>> {
        let class = self.load_class(env, name)?;
        env.construct(&class, self.source(class.loader), args)
    }

    /// Load `name` and construct a durable instance
    pub fn build_global_object(&self, env: &Env, name: &str, args: &[Arg<'_>]) -> JResult<GlobalObject> {
        Ok(self.build_local_object(env, name, args)?.promote())
    }

    fn source(&self, loader: LoaderId) -> ClassSource {
        if loader == self.loader {
            ClassSource::Loader(self.handle.as_raw())
        } else {
            // An ancestor loader; it has to be primed through its own object
            ClassSource::Cached
        }
    }
}

impl AsRaw for ClassLoaderObject {
    fn as_raw(&self) -> RawObject {
        self.handle.as_raw()
    }
}

// ============================================================================
// Bootstrap calls
// ============================================================================

pub(crate) mod bootstrap {
    use crate::args::Arg;
    use crate::cache::CacheKey;
    use crate::env::{ClassSource, Env};
    use crate::error::{JResult, JniError};
    use crate::refs::{AsRaw, Local};
    use crate::value::{RawObject, ReturnKind};
    use jbind_schema::LoaderId;

    const CLASS_LOADER: &str = "java/lang/ClassLoader";
    const CLASS: &str = "java/lang/Class";
    const LOAD_CLASS: &str = "loadClass";
    const LOAD_CLASS_SIG: &str = "(Ljava/lang/String;)Ljava/lang/Class;";
    const GET_CLASS_LOADER: &str = "getClassLoader";
    const GET_CLASS_LOADER_SIG: &str = "()Ljava/lang/ClassLoader;";

    /// `loader.loadClass(name)`; returns a local class reference
    pub(crate) fn load_class(env: &Env, namespace: u16, loader: RawObject, name: &str) -> JResult<RawObject> {
        let class_obj = env.class_object(namespace, CLASS_LOADER, LoaderId::Default, ClassSource::Cached)?;
        let method = env.jvm().cache().method_id(
            CacheKey::method(namespace, 0, CLASS_LOADER, LOAD_CLASS, LOAD_CLASS_SIG, false),
            || env.raw().get_method_id(class_obj, LOAD_CLASS, LOAD_CLASS_SIG, false),
        )?;

        tracing::debug!(class = name, "loading class through class loader");
        let dotted = name.replace('/', ".");
        let result = env.with_lowered(&[Arg::from(dotted)], |values| {
            env.raw().call_method(loader, method, ReturnKind::Object, values)
        });
        let value = env.check_pending(result)?;
        match value.as_object() {
            Some(raw) if !raw.is_null() => Ok(raw),
            _ => Err(JniError::ClassNotFound(name.to_string())),
        }
    }

    /// `instance.getClass().getClassLoader()`
    pub(crate) fn class_loader_of<'e>(env: &'e Env, namespace: u16, instance: RawObject) -> JResult<Local<'e>> {
        let class_class = env.class_object(namespace, CLASS, LoaderId::Default, ClassSource::Cached)?;
        let method = env.jvm().cache().method_id(
            CacheKey::method(namespace, 0, CLASS, GET_CLASS_LOADER, GET_CLASS_LOADER_SIG, false),
            || env.raw().get_method_id(class_class, GET_CLASS_LOADER, GET_CLASS_LOADER_SIG, false),
        )?;

        let instance_class = Local::adopt(env, env.raw().get_object_class(instance)?);
        let result = env
            .raw()
            .call_method(instance_class.as_raw(), method, ReturnKind::Object, &[]);
        let value = env.check_pending(result)?;
        match value.as_object() {
            Some(raw) if !raw.is_null() => Ok(Local::adopt(env, raw)),
            _ => Err(JniError::NullReference("class loader of instance".to_string())),
        }
    }
}
