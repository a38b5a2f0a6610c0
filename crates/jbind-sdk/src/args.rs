//! Call arguments
//!
//! An [`Arg`] carries a runtime value together with its static type, which
//! is all overload selection needs. Conversions from Rust primitives, string
//! types and handle wrappers are provided through `From`.

use crate::refs::AsRaw;
use crate::value::{JValue, RawObject};
use jbind_schema::{ArgType, ElementType, LoaderId, PrimitiveKind, StringRepr};
use std::borrow::Cow;

/// One argument to a foreign call
#[derive(Debug, Clone)]
pub enum Arg<'a> {
    /// Primitive value
    Primitive(JValue),
    /// Rust string, converted to a temporary runtime string for the call
    Str(Cow<'a, str>, StringRepr),
    /// Existing runtime string
    StringHandle(RawObject),
    /// Object handle
    Object {
        /// Raw reference (borrowed)
        raw: RawObject,
        /// Known class, `None` for an untyped handle
        class: Option<String>,
        /// Loader the class was resolved under
        loader: LoaderId,
    },
    /// Typed array handle
    Array {
        /// Raw reference (borrowed)
        raw: RawObject,
        /// Element type
        element: ElementType,
        /// Number of dimensions
        rank: u8,
    },
    /// Array handle of unknown element type
    RawArray(RawObject),
}

impl<'a> Arg<'a> {
    /// A string literal
    pub fn literal(s: &'static str) -> Self {
        Arg::Str(Cow::Borrowed(s), StringRepr::Literal)
    }

    /// The null reference, passed as an untyped object
    pub fn null() -> Self {
        Arg::untyped(RawObject::NULL)
    }

    /// An untyped object handle
    pub fn untyped(raw: impl AsRaw) -> Self {
        Arg::Object {
            raw: raw.as_raw(),
            class: None,
            loader: LoaderId::Default,
        }
    }

    /// An array handle of unknown element type
    pub fn raw_array(raw: impl AsRaw) -> Self {
        Arg::RawArray(raw.as_raw())
    }

    /// Static type used for overload selection
    pub fn arg_type(&self) -> ArgType {
        match self {
            Arg::Primitive(value) => match value.kind() {
                Some(kind) => ArgType::Primitive(kind),
                None => ArgType::Primitive(PrimitiveKind::Void),
            },
            Arg::Str(_, repr) => ArgType::String(*repr),
            Arg::StringHandle(_) => ArgType::String(StringRepr::Handle),
            Arg::Object { class, loader, .. } => ArgType::Object {
                class: class.clone(),
                loader: *loader,
            },
            Arg::Array { element, rank, .. } => ArgType::Array {
                element: element.clone(),
                rank: *rank,
            },
            Arg::RawArray(_) => ArgType::RawArray,
        }
    }
}

macro_rules! primitive_args {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Arg<'_> {
                fn from(value: $ty) -> Self {
                    Arg::Primitive(JValue::$variant(value))
                }
            }
        )*
    };
}

primitive_args! {
    bool => Boolean,
    i8 => Byte,
    u16 => Char,
    i16 => Short,
    i32 => Int,
    i64 => Long,
    f32 => Float,
    f64 => Double,
}

impl From<JValue> for Arg<'_> {
    fn from(value: JValue) -> Self {
        match value {
            JValue::Object(raw) => Arg::untyped(raw),
            other => Arg::Primitive(other),
        }
    }
}

impl<'a> From<&'a str> for Arg<'a> {
    fn from(s: &'a str) -> Self {
        Arg::Str(Cow::Borrowed(s), StringRepr::Borrowed)
    }
}

impl From<String> for Arg<'_> {
    fn from(s: String) -> Self {
        Arg::Str(Cow::Owned(s), StringRepr::Owned)
    }
}

impl<'a> From<&'a String> for Arg<'a> {
    fn from(s: &'a String) -> Self {
        Arg::Str(Cow::Borrowed(s.as_str()), StringRepr::Borrowed)
    }
}

impl From<RawObject> for Arg<'_> {
    fn from(raw: RawObject) -> Self {
        Arg::untyped(raw)
    }
}

/// Build an argument array: `&args![5, "name", &obj]`
#[macro_export]
macro_rules! args {
    ($($arg:expr),* $(,)?) => {
        [$($crate::Arg::from($arg)),*]
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primitive_arg_types() {
        assert_eq!(Arg::from(5).arg_type(), ArgType::Primitive(PrimitiveKind::Int));
        assert_eq!(Arg::from(5i64).arg_type(), ArgType::Primitive(PrimitiveKind::Long));
        assert_eq!(Arg::from(true).arg_type(), ArgType::Primitive(PrimitiveKind::Boolean));
        assert_eq!(Arg::from(1.5).arg_type(), ArgType::Primitive(PrimitiveKind::Double));
    }

    #[test]
    fn test_string_arg_types() {
        assert_eq!(Arg::from("x").arg_type(), ArgType::String(StringRepr::Borrowed));
        assert_eq!(Arg::from("x".to_string()).arg_type(), ArgType::String(StringRepr::Owned));
        assert_eq!(Arg::literal("x").arg_type(), ArgType::String(StringRepr::Literal));
        assert_eq!(Arg::StringHandle(RawObject(4)).arg_type(), ArgType::String(StringRepr::Handle));
    }

    #[test]
    fn test_object_arg_types() {
        assert_eq!(Arg::null().arg_type(), ArgType::UNTYPED);
        assert_eq!(Arg::from(RawObject(9)).arg_type(), ArgType::UNTYPED);
        assert_eq!(Arg::raw_array(RawObject(9)).arg_type(), ArgType::RawArray);
    }

    #[test]
    fn test_args_macro() {
        let args = crate::args![1, "two", 3.0f32];
        assert_eq!(args.len(), 3);
        assert_eq!(args[2].arg_type(), ArgType::Primitive(PrimitiveKind::Float));
    }
}
