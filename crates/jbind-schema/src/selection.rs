//! Overload selection
//!
//! Picks the overload of a member that accepts a given list of argument
//! types. Selection is pure: it only consults the namespace, never the
//! runtime, so its result can decide which cached identifier to fetch.
//!
//! Viability rules per parameter:
//! - primitive: exactly the same primitive kind, no widening or narrowing
//! - string: any [`StringRepr`]
//! - object of class `C`: an untyped handle, or an object of `C` or a
//!   subclass of `C` whose loader can see `C`; a string handle also passes
//!   for the root object class
//! - array: a raw array handle, or an array of the same rank and element

use crate::class::Overload;
use crate::error::SelectionError;
use crate::loader::{LoaderId, Namespace};
use crate::ty::{PrimitiveKind, TypeDesc, OBJECT_CLASS, STRING_CLASS};

/// The ways a caller can pass a string argument
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StringRepr {
    /// Owned `String`
    Owned,
    /// Borrowed `&str`
    Borrowed,
    /// A runtime string handle
    Handle,
    /// A `'static` literal
    Literal,
}

/// Element of an array argument or parameter
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ElementType {
    /// Primitive element
    Primitive(PrimitiveKind),
    /// String element
    String,
    /// Object element; `None` when the element class is unknown
    Object(Option<String>),
}

impl ElementType {
    /// Split an array type into element and rank, binding `SelfRef` to
    /// `declaring`. Returns `None` for non-array types.
    pub fn of(ty: &TypeDesc, declaring: &str) -> Option<(ElementType, u8)> {
        let array = ty.as_array()?;
        let element = match array.element() {
            TypeDesc::Primitive(kind) => ElementType::Primitive(*kind),
            TypeDesc::String => ElementType::String,
            TypeDesc::Object(name) => ElementType::Object(Some(name.clone())),
            TypeDesc::SelfRef => ElementType::Object(Some(declaring.to_string())),
            TypeDesc::Array(_) => return None,
        };
        Some((element, array.rank()))
    }

    /// Descriptor of the element; untyped objects use the root class
    pub fn descriptor(&self) -> String {
        match self {
            ElementType::Primitive(kind) => kind.descriptor().to_string(),
            ElementType::String => format!("L{};", STRING_CLASS),
            ElementType::Object(Some(name)) => format!("L{};", name),
            ElementType::Object(None) => format!("L{};", OBJECT_CLASS),
        }
    }

    fn key(&self) -> String {
        match self {
            ElementType::Object(None) => "?".to_string(),
            other => other.descriptor(),
        }
    }

    fn accepts(&self, arg: &ElementType) -> bool {
        match (self, arg) {
            (ElementType::Object(_), ElementType::Object(None)) => true,
            (param, arg) => param == arg,
        }
    }
}

/// Static type of one supplied argument
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ArgType {
    /// Primitive value
    Primitive(PrimitiveKind),
    /// String-like value
    String(StringRepr),
    /// Object handle; `class` is `None` for an untyped handle
    Object {
        /// Known class of the object
        class: Option<String>,
        /// Loader the object's class was resolved under
        loader: LoaderId,
    },
    /// Typed array handle
    Array {
        /// Element type
        element: ElementType,
        /// Number of dimensions
        rank: u8,
    },
    /// Array handle with unknown element type
    RawArray,
}

impl ArgType {
    /// Untyped object handle
    pub const UNTYPED: ArgType = ArgType::Object {
        class: None,
        loader: LoaderId::Default,
    };

    /// Object of a known class under the default loader
    pub fn object(class: impl Into<String>) -> Self {
        ArgType::Object {
            class: Some(class.into()),
            loader: LoaderId::Default,
        }
    }

    /// Normalized key of this argument type.
    ///
    /// Two argument types with the same key are accepted by exactly the same
    /// parameters, so the key can index a dispatch table.
    pub fn key(&self) -> String {
        match self {
            ArgType::Primitive(kind) => kind.descriptor().to_string(),
            ArgType::String(_) => "$".to_string(),
            ArgType::Object { class: None, .. } => "?".to_string(),
            ArgType::Object {
                class: Some(class),
                loader,
            } => match loader.cache_index() {
                Some(i) => format!("L{};@{}", class, i),
                None => format!("L{};@-", class),
            },
            ArgType::Array { element, rank } => {
                let mut out = "[".repeat(*rank as usize);
                out.push_str(&element.key());
                out
            }
            ArgType::RawArray => "[*".to_string(),
        }
    }
}

/// Normalized key of an argument list
pub fn arg_key(args: &[ArgType]) -> String {
    let mut out = String::new();
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&arg.key());
    }
    out
}

/// What to do when several overloads accept the same arguments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AmbiguityPolicy {
    /// Fail with [`SelectionError::Ambiguous`]
    #[default]
    Reject,
    /// Take the first viable overload in declaration order
    FirstDeclared,
}

/// Overload selection against one namespace
#[derive(Debug, Clone, Copy)]
pub struct OverloadSelector<'a> {
    namespace: &'a Namespace,
    declaring: &'a str,
    policy: AmbiguityPolicy,
}

impl<'a> OverloadSelector<'a> {
    /// Create a selector; `declaring` is the class `SelfRef` binds to
    pub fn new(namespace: &'a Namespace, declaring: &'a str, policy: AmbiguityPolicy) -> Self {
        Self {
            namespace,
            declaring,
            policy,
        }
    }

    /// Check whether a single argument can be passed for a parameter
    pub fn is_viable(&self, param: &TypeDesc, arg: &ArgType) -> bool {
        match param {
            TypeDesc::Primitive(kind) => matches!(arg, ArgType::Primitive(k) if k == kind),
            TypeDesc::String => match arg {
                ArgType::String(_) => true,
                ArgType::Object { class: Some(c), .. } => c == STRING_CLASS,
                _ => false,
            },
            TypeDesc::Object(name) => self.object_viable(name, arg),
            TypeDesc::SelfRef => self.object_viable(self.declaring, arg),
            TypeDesc::Array(_) => match arg {
                ArgType::RawArray => true,
                ArgType::Array { element, rank } => match ElementType::of(param, self.declaring) {
                    Some((param_element, param_rank)) => param_rank == *rank && param_element.accepts(element),
                    None => false,
                },
                _ => false,
            },
        }
    }

    fn object_viable(&self, class: &str, arg: &ArgType) -> bool {
        match arg {
            ArgType::Object { class: None, .. } => true,
            ArgType::Object {
                class: Some(actual),
                loader,
            } => {
                self.namespace.registry().is_subclass(actual, class)
                    && self.namespace.is_visible_from(class, *loader)
            }
            ArgType::String(StringRepr::Handle) => class == STRING_CLASS || class == OBJECT_CLASS,
            // Native strings only lower to `String` parameters
            ArgType::String(_) => class == STRING_CLASS,
            ArgType::Array { .. } | ArgType::RawArray => class == OBJECT_CLASS,
            ArgType::Primitive(_) => false,
        }
    }

    /// Check whether every parameter of an overload accepts its argument
    pub fn overload_viable(&self, overload: &Overload, args: &[ArgType]) -> bool {
        overload.params.len() == args.len()
            && overload
                .params
                .iter()
                .zip(args)
                .all(|(param, arg)| self.is_viable(param, arg))
    }

    /// Indices of every viable overload, in declaration order
    pub fn viable(&self, overloads: &[Overload], args: &[ArgType]) -> Vec<usize> {
        overloads
            .iter()
            .enumerate()
            .filter(|(_, o)| self.overload_viable(o, args))
            .map(|(i, _)| i)
            .collect()
    }

    /// Select the overload of `member` to call with `args`
    pub fn select(&self, member: &str, overloads: &[Overload], args: &[ArgType]) -> Result<usize, SelectionError> {
        let candidates = self.viable(overloads, args);
        match candidates.len() {
            0 => Err(SelectionError::NoViableOverload {
                member: member.to_string(),
                args: arg_key(args),
            }),
            1 => Ok(candidates[0]),
            _ if self.policy == AmbiguityPolicy::FirstDeclared => Ok(candidates[0]),
            _ => Err(SelectionError::Ambiguous {
                member: member.to_string(),
                args: arg_key(args),
                candidates,
            }),
        }
    }
}
