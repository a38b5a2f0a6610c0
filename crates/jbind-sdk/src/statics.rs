//! Static member access

use crate::args::Arg;
use crate::env::{Env, Receiver, Value};
use crate::error::JResult;
use crate::jvm::ClassRef;

/// Static methods and fields of one class
#[derive(Debug, Clone)]
pub struct StaticRef<'e> {
    env: &'e Env,
    class: ClassRef,
}

impl<'e> StaticRef<'e> {
    pub(crate) fn new(env: &'e Env, class: ClassRef) -> Self {
        Self { env, class }
    }

    /// The class
    pub fn class(&self) -> &ClassRef {
        &self.class
    }

    /// Call a static method
    pub fn call(&self, name: &str, args: &[Arg<'_>]) -> JResult<Value<'e>> {
        self.env.invoke(&self.class, Receiver::Static, 0, name, args)
    }

    /// Read a static field
    pub fn get(&self, name: &str) -> JResult<Value<'e>> {
        self.env.get_field(&self.class, Receiver::Static, name)
    }

    /// Write a static field
    pub fn set<'a>(&self, name: &str, value: impl Into<Arg<'a>>) -> JResult<()> {
        self.env.set_field(&self.class, Receiver::Static, name, &value.into())
    }
}
