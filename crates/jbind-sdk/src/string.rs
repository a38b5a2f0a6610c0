//! String handles

use crate::args::Arg;
use crate::env::Env;
use crate::error::JResult;
use crate::refs::{AsRaw, Global, Local};
use crate::value::RawObject;

/// Transient handle to a runtime string
#[derive(Debug)]
pub struct LocalString<'e> {
    local: Local<'e>,
}

impl<'e> LocalString<'e> {
    pub(crate) fn from_local(local: Local<'e>) -> Self {
        Self { local }
    }

    /// Take ownership of a local string reference
    pub fn adopt(env: &'e Env, raw: RawObject) -> Self {
        Self::from_local(Local::adopt(env, raw))
    }

    /// Copy the contents out
    pub fn value(&self) -> JResult<String> {
        self.local.env().raw().get_string_utf(self.local.as_raw())
    }

    /// Create a durable handle and release this one
    pub fn promote(self) -> GlobalString {
        GlobalString {
            global: self.local.promote(),
        }
    }

    /// Drop the string typing
    pub fn into_local(self) -> Local<'e> {
        self.local
    }
}

impl AsRaw for LocalString<'_> {
    fn as_raw(&self) -> RawObject {
        self.local.as_raw()
    }
}

/// Durable handle to a runtime string
#[derive(Debug)]
pub struct GlobalString {
    global: Global,
}

impl GlobalString {
    /// Copy the contents out
    pub fn value(&self, env: &Env) -> JResult<String> {
        env.raw().get_string_utf(self.global.as_raw())
    }

    /// New transient handle to the same string
    pub fn to_local<'e>(&self, env: &'e Env) -> LocalString<'e> {
        LocalString::from_local(self.global.to_local(env))
    }
}

impl AsRaw for GlobalString {
    fn as_raw(&self) -> RawObject {
        self.global.as_raw()
    }
}

impl<'a> From<&'a LocalString<'_>> for Arg<'a> {
    fn from(s: &'a LocalString<'_>) -> Self {
        Arg::StringHandle(s.as_raw())
    }
}

impl<'a> From<&'a GlobalString> for Arg<'a> {
    fn from(s: &'a GlobalString) -> Self {
        Arg::StringHandle(s.as_raw())
    }
}
