//! jbind schema model
//!
//! Author-declared descriptions of foreign classes (constructors, overloaded
//! methods, fields, inheritance, class-loader membership) together with the
//! pure algorithms that run over them: signature synthesis, overload
//! selection and namespace resolution. Nothing in this crate talks to the
//! runtime.

#![warn(missing_docs)]

pub mod class;
pub mod error;
pub mod loader;
pub mod registry;
pub mod selection;
pub mod signature;
pub mod ty;

pub use class::{ClassDescriptor, Field, MemberKind, Method, Overload};
pub use error::{SchemaError, SelectionError};
pub use loader::{ClassLoaderDescriptor, LoaderId, LoaderParent, Namespace, NamespaceBuilder};
pub use registry::{ClassIdx, ClassRegistry, MemberRef};
pub use selection::{arg_key, AmbiguityPolicy, ArgType, ElementType, OverloadSelector, StringRepr};
pub use ty::{ArrayType, PrimitiveKind, TypeDesc, OBJECT_CLASS, STRING_CLASS};
