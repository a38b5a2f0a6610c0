//! Object handles
//!
//! Typed wrappers around [`Local`] and [`Global`] that remember the declared
//! class, so calls and field accesses can be resolved against the schema.

use crate::args::Arg;
use crate::env::{Env, Receiver, Value};
use crate::error::{JResult, JniError};
use crate::jvm::ClassRef;
use crate::refs::{AsRaw, Global, Local};
use crate::value::RawObject;

/// Transient handle to an instance of a declared class
#[derive(Debug)]
pub struct LocalObject<'e> {
    local: Local<'e>,
    class: ClassRef,
}

impl<'e> LocalObject<'e> {
    pub(crate) fn from_parts(local: Local<'e>, class: ClassRef) -> Self {
        Self { local, class }
    }

    /// New local reference to a borrowed object of class `class`
    pub fn wrap(env: &'e Env, raw: RawObject, class: &ClassRef) -> Self {
        Self::from_parts(Local::wrap(env, raw), class.clone())
    }

    /// Take ownership of a local reference to an object of class `class`
    pub fn adopt(env: &'e Env, raw: RawObject, class: &ClassRef) -> Self {
        Self::from_parts(Local::adopt(env, raw), class.clone())
    }

    /// Declared class
    pub fn class(&self) -> &ClassRef {
        &self.class
    }

    /// Environment this handle belongs to
    pub fn env(&self) -> &'e Env {
        self.local.env()
    }

    /// Call an instance method
    pub fn call(&self, name: &str, args: &[Arg<'_>]) -> JResult<Value<'e>> {
        self.call_at_depth(0, name, args)
    }

    /// Call an instance method, starting the member lookup `depth` classes
    /// up the inheritance chain
    pub fn call_at_depth(&self, depth: usize, name: &str, args: &[Arg<'_>]) -> JResult<Value<'e>> {
        self.env()
            .invoke(&self.class, Receiver::Instance(self.local.as_raw()), depth, name, args)
    }

    /// Read an instance field
    pub fn get(&self, name: &str) -> JResult<Value<'e>> {
        self.env().get_field(&self.class, Receiver::Instance(self.local.as_raw()), name)
    }

    /// Write an instance field
    pub fn set<'a>(&self, name: &str, value: impl Into<Arg<'a>>) -> JResult<()> {
        self.env()
            .set_field(&self.class, Receiver::Instance(self.local.as_raw()), name, &value.into())
    }

    /// View this object as an instance of an ancestor class
    pub fn upcast(self, ancestor: &ClassRef) -> JResult<LocalObject<'e>> {
        let ns = self.env().jvm().namespace(self.class.namespace)?;
        if ancestor.namespace != self.class.namespace || !ns.registry().is_subclass(&self.class.name, &ancestor.name) {
            return Err(JniError::TypeMismatch {
                expected: ancestor.name.to_string(),
                got: self.class.name.to_string(),
            });
        }
        Ok(Self {
            local: self.local,
            class: ancestor.clone(),
        })
    }

    /// Create a durable handle and release this one
    pub fn promote(self) -> GlobalObject {
        GlobalObject {
            global: self.local.promote(),
            class: self.class,
        }
    }

    /// Create a durable handle, keeping this one
    pub fn to_global(&self) -> GlobalObject {
        GlobalObject {
            global: self.local.to_global(),
            class: self.class.clone(),
        }
    }

    /// Drop the type information
    pub fn into_local(self) -> Local<'e> {
        self.local
    }
}

impl AsRaw for LocalObject<'_> {
    fn as_raw(&self) -> RawObject {
        self.local.as_raw()
    }
}

/// Durable handle to an instance of a declared class
#[derive(Debug)]
pub struct GlobalObject {
    global: Global,
    class: ClassRef,
}

impl GlobalObject {
    /// Take ownership of a global reference to an object of class `class`
    pub fn adopt(global: Global, class: &ClassRef) -> Self {
        Self {
            global,
            class: class.clone(),
        }
    }

    /// Declared class
    pub fn class(&self) -> &ClassRef {
        &self.class
    }

    /// Call an instance method on the current thread
    pub fn call<'e>(&self, env: &'e Env, name: &str, args: &[Arg<'_>]) -> JResult<Value<'e>> {
        env.invoke(&self.class, Receiver::Instance(self.global.as_raw()), 0, name, args)
    }

    /// Read an instance field
    pub fn get<'e>(&self, env: &'e Env, name: &str) -> JResult<Value<'e>> {
        env.get_field(&self.class, Receiver::Instance(self.global.as_raw()), name)
    }

    /// Write an instance field
    pub fn set<'a>(&self, env: &Env, name: &str, value: impl Into<Arg<'a>>) -> JResult<()> {
        env.set_field(&self.class, Receiver::Instance(self.global.as_raw()), name, &value.into())
    }

    /// New transient handle to the same object
    pub fn to_local<'e>(&self, env: &'e Env) -> LocalObject<'e> {
        LocalObject::from_parts(self.global.to_local(env), self.class.clone())
    }

    /// Drop the type information
    pub fn into_global(self) -> Global {
        self.global
    }
}

impl AsRaw for GlobalObject {
    fn as_raw(&self) -> RawObject {
        self.global.as_raw()
    }
}

impl<'a> From<&'a LocalObject<'_>> for Arg<'a> {
    fn from(obj: &'a LocalObject<'_>) -> Self {
        Arg::Object {
            raw: obj.as_raw(),
            class: Some(obj.class.name.to_string()),
            loader: obj.class.loader,
        }
    }
}

impl<'a> From<&'a GlobalObject> for Arg<'a> {
    fn from(obj: &'a GlobalObject) -> Self {
        Arg::Object {
            raw: obj.as_raw(),
            class: Some(obj.class.name.to_string()),
            loader: obj.class.loader,
        }
    }
}

impl<'a> From<&'a Local<'_>> for Arg<'a> {
    fn from(local: &'a Local<'_>) -> Self {
        Arg::untyped(local.as_raw())
    }
}

impl<'a> From<&'a Global> for Arg<'a> {
    fn from(global: &'a Global) -> Self {
        Arg::untyped(global.as_raw())
    }
}
