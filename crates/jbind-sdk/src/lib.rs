//! jbind SDK - typed calls into a managed runtime
//!
//! Classes are declared once with `jbind-schema`; this crate turns those
//! declarations into runtime calls. It owns the identifier cache, keeps
//! transient and durable references balanced, selects overloads from the
//! static types of the arguments and loads classes through custom class
//! loaders where the schema says so.
//!
//! # Example
//!
//! ```ignore
//! use jbind_schema::{ClassDescriptor, Method, Namespace, Overload, TypeDesc};
//! use jbind_sdk::{args, Jvm};
//!
//! let ns = Namespace::builder()
//!     .class(
//!         ClassDescriptor::new("demo/Counter")
//!             .constructor(Overload::constructor(vec![TypeDesc::INT]))
//!             .method(Method::new("increment", TypeDesc::INT, vec![])),
//!     )
//!     .build()?;
//! let jvm = Jvm::new(vm, ns);
//!
//! let guard = jvm.attach_current_thread()?;
//! let env = guard.env();
//! let counter = env.new_object(&env.class("demo/Counter")?, &args![5])?;
//! assert_eq!(counter.call("increment", &[])?.into_int()?, 6);
//! ```

#![warn(missing_docs)]

pub mod args;
pub mod array;
pub mod cache;
pub mod env;
pub mod error;
pub mod jvm;
pub mod lifecycle;
pub mod loader;
pub mod object;
pub mod options;
pub mod refs;
pub mod runtime;
pub mod statics;
pub mod string;
pub mod thread;
pub mod value;

pub use args::Arg;
pub use array::{ArrayView, GlobalArray, LocalArray};
pub use cache::{CacheKey, DispatchKey, DispatchTable, IdCache};
pub use env::{Env, Value};
pub use error::{JResult, JniError};
pub use jvm::{ClassRef, Jvm, JvmBuilder};
pub use loader::ClassLoaderObject;
pub use object::{GlobalObject, LocalObject};
pub use options::JvmOptions;
pub use refs::{AsRaw, Global, Local};
pub use runtime::{RawEnv, RawVm};
pub use statics::StaticRef;
pub use string::{GlobalString, LocalString};
pub use thread::ThreadGuard;
pub use value::{FieldId, JValue, MethodId, RawObject, ReleaseMode, ReturnKind};
