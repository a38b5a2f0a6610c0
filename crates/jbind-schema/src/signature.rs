//! Signature synthesis
//!
//! Turns declared types into the descriptor strings the runtime expects when
//! looking up classes, methods and fields:
//!
//! | Declared type           | Descriptor            |
//! |-------------------------|-----------------------|
//! | `int`, `long`, ...      | `I`, `J`, ...         |
//! | `String`                | `Ljava/lang/String;`  |
//! | `Object("a/B")`         | `La/B;`               |
//! | `Array(int, 2)`         | `[[I`                 |
//! | `SelfRef` in `a/B`      | `La/B;`               |
//! | `(int, String) -> void` | `(ILjava/lang/String;)V` |
//!
//! `SelfRef` always binds to the class that declares the member, so an
//! inherited member keeps its ancestor's signature.

use crate::class::{Field, Overload};
use crate::ty::{TypeDesc, STRING_CLASS};

/// Descriptor of a single type, with `SelfRef` bound to `enclosing`
pub fn type_signature(ty: &TypeDesc, enclosing: &str) -> String {
    let mut out = String::new();
    write_type(&mut out, ty, enclosing);
    out
}

/// Descriptor of a method overload: `(<params>)<return>`
pub fn method_signature(overload: &Overload, enclosing: &str) -> String {
    let mut out = String::from("(");
    for param in &overload.params {
        write_type(&mut out, param, enclosing);
    }
    out.push(')');
    write_type(&mut out, &overload.ret, enclosing);
    out
}

/// Descriptor of a constructor overload; the return is always `V`
pub fn constructor_signature(params: &[TypeDesc], enclosing: &str) -> String {
    let mut out = String::from("(");
    for param in params {
        write_type(&mut out, param, enclosing);
    }
    out.push_str(")V");
    out
}

/// Descriptor of a field
pub fn field_signature(field: &Field, enclosing: &str) -> String {
    type_signature(&field.ty, enclosing)
}

/// Descriptor of a class used as a value (`L<name>;`)
pub fn class_signature(name: &str) -> String {
    format!("L{};", name)
}

fn write_type(out: &mut String, ty: &TypeDesc, enclosing: &str) {
    match ty {
        TypeDesc::Primitive(kind) => out.push(kind.descriptor()),
        TypeDesc::String => write_class(out, STRING_CLASS),
        TypeDesc::Object(name) => write_class(out, name),
        TypeDesc::SelfRef => write_class(out, enclosing),
        TypeDesc::Array(array) => {
            for _ in 0..array.rank() {
                out.push('[');
            }
            write_type(out, array.element(), enclosing);
        }
    }
}

fn write_class(out: &mut String, name: &str) {
    out.push('L');
    out.push_str(name);
    out.push(';');
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primitive_signatures() {
        assert_eq!(type_signature(&TypeDesc::INT, "X"), "I");
        assert_eq!(type_signature(&TypeDesc::LONG, "X"), "J");
        assert_eq!(type_signature(&TypeDesc::BOOLEAN, "X"), "Z");
        assert_eq!(type_signature(&TypeDesc::VOID, "X"), "V");
    }

    #[test]
    fn test_reference_signatures() {
        assert_eq!(type_signature(&TypeDesc::String, "X"), "Ljava/lang/String;");
        assert_eq!(type_signature(&TypeDesc::object("Foo"), "X"), "LFoo;");
        assert_eq!(type_signature(&TypeDesc::SelfRef, "com/example/Node"), "Lcom/example/Node;");
    }

    #[test]
    fn test_array_signatures() {
        assert_eq!(type_signature(&TypeDesc::array(TypeDesc::INT, 1), "X"), "[I");
        assert_eq!(type_signature(&TypeDesc::array(TypeDesc::INT, 2), "X"), "[[I");
        assert_eq!(type_signature(&TypeDesc::array(TypeDesc::object("Foo"), 1), "X"), "[LFoo;");
        assert_eq!(type_signature(&TypeDesc::array(TypeDesc::SelfRef, 3), "a/B"), "[[[La/B;");
    }

    #[test]
    fn test_nested_rank_matches_flat_rank() {
        let nested = TypeDesc::array(TypeDesc::array(TypeDesc::DOUBLE, 2), 1);
        let flat = TypeDesc::array(TypeDesc::DOUBLE, 3);
        assert_eq!(type_signature(&nested, "X"), type_signature(&flat, "X"));
        assert_eq!(type_signature(&flat, "X"), "[[[D");
    }

    #[test]
    fn test_method_signature() {
        let overload = Overload::new(TypeDesc::VOID, vec![TypeDesc::INT, TypeDesc::String]);
        assert_eq!(method_signature(&overload, "X"), "(ILjava/lang/String;)V");

        let builder = Overload::new(TypeDesc::SelfRef, vec![TypeDesc::array(TypeDesc::BYTE, 1)]);
        assert_eq!(method_signature(&builder, "io/Buf"), "([B)Lio/Buf;");
    }

    #[test]
    fn test_constructor_signature() {
        assert_eq!(constructor_signature(&[], "X"), "()V");
        assert_eq!(constructor_signature(&[TypeDesc::LONG, TypeDesc::SelfRef], "a/B"), "(JLa/B;)V");
    }

    #[test]
    fn test_field_and_class_signature() {
        assert_eq!(field_signature(&Field::new("next", TypeDesc::SelfRef), "a/Node"), "La/Node;");
        assert_eq!(class_signature("a/B"), "La/B;");
    }
}
