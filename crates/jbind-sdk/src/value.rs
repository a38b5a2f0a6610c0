//! Raw values exchanged with the runtime

use jbind_schema::{PrimitiveKind, TypeDesc};

/// Opaque object reference as handed out by the runtime. Zero is null.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RawObject(pub u64);

impl RawObject {
    /// The null reference
    pub const NULL: RawObject = RawObject(0);

    /// Check for null
    pub fn is_null(self) -> bool {
        self.0 == 0
    }
}

/// Runtime method identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MethodId(pub u64);

/// Runtime field identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldId(pub u64);

/// A value crossing the runtime boundary
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum JValue {
    /// No value (void return)
    Void,
    /// `boolean`
    Boolean(bool),
    /// `byte`
    Byte(i8),
    /// `char`
    Char(u16),
    /// `short`
    Short(i16),
    /// `int`
    Int(i32),
    /// `long`
    Long(i64),
    /// `float`
    Float(f32),
    /// `double`
    Double(f64),
    /// Object reference
    Object(RawObject),
}

impl JValue {
    /// Primitive kind of the value, `None` for references
    pub fn kind(&self) -> Option<PrimitiveKind> {
        Some(match self {
            JValue::Void => PrimitiveKind::Void,
            JValue::Boolean(_) => PrimitiveKind::Boolean,
            JValue::Byte(_) => PrimitiveKind::Byte,
            JValue::Char(_) => PrimitiveKind::Char,
            JValue::Short(_) => PrimitiveKind::Short,
            JValue::Int(_) => PrimitiveKind::Int,
            JValue::Long(_) => PrimitiveKind::Long,
            JValue::Float(_) => PrimitiveKind::Float,
            JValue::Double(_) => PrimitiveKind::Double,
            JValue::Object(_) => return None,
        })
    }

    /// Zero value of a primitive kind
    pub fn zero(kind: PrimitiveKind) -> Self {
        match kind {
            PrimitiveKind::Void => JValue::Void,
            PrimitiveKind::Boolean => JValue::Boolean(false),
            PrimitiveKind::Byte => JValue::Byte(0),
            PrimitiveKind::Char => JValue::Char(0),
            PrimitiveKind::Short => JValue::Short(0),
            PrimitiveKind::Int => JValue::Int(0),
            PrimitiveKind::Long => JValue::Long(0),
            PrimitiveKind::Float => JValue::Float(0.0),
            PrimitiveKind::Double => JValue::Double(0.0),
        }
    }

    /// Object reference, if this is one
    pub fn as_object(&self) -> Option<RawObject> {
        match self {
            JValue::Object(raw) => Some(*raw),
            _ => None,
        }
    }

    /// Short type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self.kind() {
            Some(kind) => kind.type_name(),
            None => "object",
        }
    }
}

/// How a call's result is read back
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReturnKind {
    /// Primitive result (or `void`)
    Primitive(PrimitiveKind),
    /// Object, string or array reference
    Object,
}

impl ReturnKind {
    /// Return kind for a declared type
    pub fn of(ty: &TypeDesc) -> Self {
        match ty {
            TypeDesc::Primitive(kind) => ReturnKind::Primitive(*kind),
            _ => ReturnKind::Object,
        }
    }
}

/// What to do with a pinned array's contents on release
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseMode {
    /// Copy changes back
    Commit,
    /// Discard changes
    Abort,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_kinds() {
        assert_eq!(JValue::Int(3).kind(), Some(PrimitiveKind::Int));
        assert_eq!(JValue::Object(RawObject(7)).kind(), None);
        assert_eq!(JValue::zero(PrimitiveKind::Double), JValue::Double(0.0));
        assert_eq!(JValue::Char(65).type_name(), "char");
    }

    #[test]
    fn test_return_kind() {
        assert_eq!(ReturnKind::of(&TypeDesc::VOID), ReturnKind::Primitive(PrimitiveKind::Void));
        assert_eq!(ReturnKind::of(&TypeDesc::SelfRef), ReturnKind::Object);
        assert_eq!(ReturnKind::of(&TypeDesc::array(TypeDesc::INT, 1)), ReturnKind::Object);
    }

    #[test]
    fn test_null() {
        assert!(RawObject::NULL.is_null());
        assert!(!RawObject(1).is_null());
    }
}
