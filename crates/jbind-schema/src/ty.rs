//! Core type descriptors for parameters, returns and fields

use std::fmt;

/// Binary name of the runtime's canonical string class
pub const STRING_CLASS: &str = "java/lang/String";

/// Binary name of the root of every class hierarchy
pub const OBJECT_CLASS: &str = "java/lang/Object";

/// Primitive kinds understood by the runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    /// `boolean`
    Boolean,
    /// `byte` (signed 8-bit)
    Byte,
    /// `char` (UTF-16 code unit)
    Char,
    /// `short` (signed 16-bit)
    Short,
    /// `int` (signed 32-bit)
    Int,
    /// `long` (signed 64-bit)
    Long,
    /// `float` (IEEE 754 single)
    Float,
    /// `double` (IEEE 754 double)
    Double,
    /// `void` (returns only)
    Void,
}

impl PrimitiveKind {
    /// Single-character descriptor code
    pub const fn descriptor(self) -> char {
        match self {
            PrimitiveKind::Boolean => 'Z',
            PrimitiveKind::Byte => 'B',
            PrimitiveKind::Char => 'C',
            PrimitiveKind::Short => 'S',
            PrimitiveKind::Int => 'I',
            PrimitiveKind::Long => 'J',
            PrimitiveKind::Float => 'F',
            PrimitiveKind::Double => 'D',
            PrimitiveKind::Void => 'V',
        }
    }

    /// Source-level type name
    pub const fn type_name(self) -> &'static str {
        match self {
            PrimitiveKind::Boolean => "boolean",
            PrimitiveKind::Byte => "byte",
            PrimitiveKind::Char => "char",
            PrimitiveKind::Short => "short",
            PrimitiveKind::Int => "int",
            PrimitiveKind::Long => "long",
            PrimitiveKind::Float => "float",
            PrimitiveKind::Double => "double",
            PrimitiveKind::Void => "void",
        }
    }

    /// Check if this is `void`
    pub const fn is_void(self) -> bool {
        matches!(self, PrimitiveKind::Void)
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

/// Array descriptor: `rank` dimensions of `element`.
///
/// The element is never itself an array; nested arrays are folded into a
/// single element with the summed rank when constructed through
/// [`TypeDesc::array`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArrayType {
    element: Box<TypeDesc>,
    rank: u8,
}

impl ArrayType {
    /// Innermost element type
    pub fn element(&self) -> &TypeDesc {
        &self.element
    }

    /// Number of dimensions
    pub fn rank(&self) -> u8 {
        self.rank
    }

    /// Descriptor of the array with one dimension removed
    pub fn component(&self) -> TypeDesc {
        if self.rank <= 1 {
            (*self.element).clone()
        } else {
            TypeDesc::Array(ArrayType {
                element: self.element.clone(),
                rank: self.rank - 1,
            })
        }
    }
}

/// Declared type of a parameter, return value or field
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeDesc {
    /// Primitive value (including `void` for returns)
    Primitive(PrimitiveKind),

    /// The runtime's string class
    String,

    /// Instance of a class, referenced by binary name (may be forward-declared)
    Object(String),

    /// Array of rank >= 1
    Array(ArrayType),

    /// Instance of the class that declares the member
    SelfRef,
}

impl TypeDesc {
    /// `boolean`
    pub const BOOLEAN: TypeDesc = TypeDesc::Primitive(PrimitiveKind::Boolean);
    /// `byte`
    pub const BYTE: TypeDesc = TypeDesc::Primitive(PrimitiveKind::Byte);
    /// `char`
    pub const CHAR: TypeDesc = TypeDesc::Primitive(PrimitiveKind::Char);
    /// `short`
    pub const SHORT: TypeDesc = TypeDesc::Primitive(PrimitiveKind::Short);
    /// `int`
    pub const INT: TypeDesc = TypeDesc::Primitive(PrimitiveKind::Int);
    /// `long`
    pub const LONG: TypeDesc = TypeDesc::Primitive(PrimitiveKind::Long);
    /// `float`
    pub const FLOAT: TypeDesc = TypeDesc::Primitive(PrimitiveKind::Float);
    /// `double`
    pub const DOUBLE: TypeDesc = TypeDesc::Primitive(PrimitiveKind::Double);
    /// `void`
    pub const VOID: TypeDesc = TypeDesc::Primitive(PrimitiveKind::Void);

    /// Instance of the named class
    pub fn object(name: impl Into<String>) -> Self {
        TypeDesc::Object(name.into())
    }

    /// Array of `rank` dimensions.
    ///
    /// Passing an array as the element adds its rank, so
    /// `array(array(INT, 2), 1)` and `array(INT, 3)` are the same type.
    /// A zero rank, or a combined rank above 255, is kept unfolded here and
    /// rejected when the schema is built.
    pub fn array(element: TypeDesc, rank: u8) -> Self {
        match element {
            TypeDesc::Array(inner) if rank > 0 && inner.rank.checked_add(rank).is_some() => {
                TypeDesc::Array(ArrayType {
                    rank: inner.rank + rank,
                    element: inner.element,
                })
            }
            other => TypeDesc::Array(ArrayType {
                element: Box::new(other),
                rank,
            }),
        }
    }

    /// Check if this type is a primitive (including `void`)
    pub fn is_primitive(&self) -> bool {
        matches!(self, TypeDesc::Primitive(_))
    }

    /// Check if this is `void`
    pub fn is_void(&self) -> bool {
        matches!(self, TypeDesc::Primitive(PrimitiveKind::Void))
    }

    /// Check if values of this type are object references
    pub fn is_reference(&self) -> bool {
        !self.is_primitive()
    }

    /// Get the primitive kind if this is a primitive
    pub fn as_primitive(&self) -> Option<PrimitiveKind> {
        match self {
            TypeDesc::Primitive(kind) => Some(*kind),
            _ => None,
        }
    }

    /// Get the array descriptor if this is an array
    pub fn as_array(&self) -> Option<&ArrayType> {
        match self {
            TypeDesc::Array(array) => Some(array),
            _ => None,
        }
    }

    /// Class name this type refers to, with `SelfRef` bound to `declaring`
    pub fn class_name<'a>(&'a self, declaring: &'a str) -> Option<&'a str> {
        match self {
            TypeDesc::Object(name) => Some(name),
            TypeDesc::SelfRef => Some(declaring),
            TypeDesc::String => Some(STRING_CLASS),
            _ => None,
        }
    }
}

impl From<PrimitiveKind> for TypeDesc {
    fn from(kind: PrimitiveKind) -> Self {
        TypeDesc::Primitive(kind)
    }
}

impl fmt::Display for TypeDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeDesc::Primitive(kind) => write!(f, "{}", kind),
            TypeDesc::String => write!(f, "String"),
            TypeDesc::Object(name) => write!(f, "{}", name),
            TypeDesc::Array(array) => {
                write!(f, "{}", array.element)?;
                for _ in 0..array.rank {
                    write!(f, "[]")?;
                }
                Ok(())
            }
            TypeDesc::SelfRef => write!(f, "Self"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primitive_descriptors() {
        let codes: String = [
            PrimitiveKind::Boolean,
            PrimitiveKind::Byte,
            PrimitiveKind::Char,
            PrimitiveKind::Short,
            PrimitiveKind::Int,
            PrimitiveKind::Long,
            PrimitiveKind::Float,
            PrimitiveKind::Double,
            PrimitiveKind::Void,
        ]
        .iter()
        .map(|k| k.descriptor())
        .collect();
        assert_eq!(codes, "ZBCSIJFDV");
    }

    #[test]
    fn test_array_folding() {
        let nested = TypeDesc::array(TypeDesc::array(TypeDesc::INT, 2), 1);
        let flat = TypeDesc::array(TypeDesc::INT, 3);
        assert_eq!(nested, flat);
        assert_eq!(flat.as_array().map(|a| a.rank()), Some(3));
        assert_eq!(flat.as_array().map(|a| a.element().clone()), Some(TypeDesc::INT));
    }

    #[test]
    fn test_array_folding_never_hides_bad_ranks() {
        let zero_outer = TypeDesc::array(TypeDesc::array(TypeDesc::INT, 2), 0);
        assert_eq!(zero_outer.as_array().map(|a| a.rank()), Some(0));

        let too_deep = TypeDesc::array(TypeDesc::array(TypeDesc::INT, 200), 100);
        let outer = too_deep.as_array().unwrap();
        assert_eq!(outer.rank(), 100);
        assert_eq!(outer.element(), &TypeDesc::array(TypeDesc::INT, 200));
    }

    #[test]
    fn test_array_component() {
        let ty = TypeDesc::array(TypeDesc::object("Foo"), 2);
        let array = ty.as_array().unwrap();
        assert_eq!(array.component(), TypeDesc::array(TypeDesc::object("Foo"), 1));
        let one = TypeDesc::array(TypeDesc::LONG, 1);
        assert_eq!(one.as_array().unwrap().component(), TypeDesc::LONG);
    }

    #[test]
    fn test_type_display() {
        assert_eq!(TypeDesc::INT.to_string(), "int");
        assert_eq!(TypeDesc::array(TypeDesc::String, 2).to_string(), "String[][]");
        assert_eq!(TypeDesc::SelfRef.to_string(), "Self");
    }

    #[test]
    fn test_class_name_binds_self() {
        assert_eq!(TypeDesc::SelfRef.class_name("a/B"), Some("a/B"));
        assert_eq!(TypeDesc::object("x/Y").class_name("a/B"), Some("x/Y"));
        assert_eq!(TypeDesc::INT.class_name("a/B"), None);
    }
}
