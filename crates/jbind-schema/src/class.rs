//! Class descriptors
//!
//! A [`ClassDescriptor`] is the author-facing declaration of one foreign
//! class: its constructors, its (possibly overloaded) instance and static
//! methods, its fields and an optional parent. Descriptors are plain data and
//! become immutable once handed to a [`crate::ClassRegistry`].

use crate::ty::TypeDesc;
use std::fmt;

/// One parameter list plus its return type
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Overload {
    /// Return type (`void` for constructors)
    pub ret: TypeDesc,
    /// Ordered parameter types
    pub params: Vec<TypeDesc>,
}

impl Overload {
    /// Create an overload returning `ret`
    pub fn new(ret: TypeDesc, params: Vec<TypeDesc>) -> Self {
        Self { ret, params }
    }

    /// Create a constructor overload (always returns `void`)
    pub fn constructor(params: Vec<TypeDesc>) -> Self {
        Self {
            ret: TypeDesc::VOID,
            params,
        }
    }

    /// Number of parameters
    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

impl fmt::Display for Overload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", param)?;
        }
        write!(f, ") -> {}", self.ret)
    }
}

/// A named method with one or more overloads
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Method {
    /// Method name as the runtime knows it
    pub name: String,
    /// Overloads in declaration order
    pub overloads: Vec<Overload>,
}

impl Method {
    /// Single-overload method
    pub fn new(name: impl Into<String>, ret: TypeDesc, params: Vec<TypeDesc>) -> Self {
        Self {
            name: name.into(),
            overloads: vec![Overload::new(ret, params)],
        }
    }

    /// Method with an explicit overload set
    pub fn overloaded(name: impl Into<String>, overloads: Vec<Overload>) -> Self {
        Self {
            name: name.into(),
            overloads,
        }
    }
}

/// A named field with exactly one declared type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    /// Field name
    pub name: String,
    /// Declared type
    pub ty: TypeDesc,
}

impl Field {
    /// Create a field
    pub fn new(name: impl Into<String>, ty: TypeDesc) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// Kind of member being looked up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberKind {
    /// Instance method
    Method,
    /// Static method
    StaticMethod,
    /// Instance field
    Field,
    /// Static field
    StaticField,
    /// Constructor
    Constructor,
}

impl MemberKind {
    /// Check if the member belongs to the class rather than an instance
    pub fn is_static(self) -> bool {
        matches!(self, MemberKind::StaticMethod | MemberKind::StaticField)
    }
}

impl fmt::Display for MemberKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MemberKind::Method => "method",
            MemberKind::StaticMethod => "static method",
            MemberKind::Field => "field",
            MemberKind::StaticField => "static field",
            MemberKind::Constructor => "constructor",
        };
        f.write_str(s)
    }
}

/// Declaration of one foreign class
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassDescriptor {
    /// Slash-separated binary name (e.g. `com/example/Counter`)
    pub name: String,
    /// Constructors in declaration order
    pub constructors: Vec<Overload>,
    /// Instance methods in declaration order
    pub methods: Vec<Method>,
    /// Static methods in declaration order
    pub static_methods: Vec<Method>,
    /// Instance fields in declaration order
    pub fields: Vec<Field>,
    /// Static fields in declaration order
    pub static_fields: Vec<Field>,
    /// Parent class name, if any
    pub extends: Option<String>,
}

impl ClassDescriptor {
    /// Start declaring a class
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            constructors: Vec::new(),
            methods: Vec::new(),
            static_methods: Vec::new(),
            fields: Vec::new(),
            static_fields: Vec::new(),
            extends: None,
        }
    }

    /// Add a constructor. The return type is forced to `void`.
    pub fn constructor(mut self, overload: Overload) -> Self {
        self.constructors.push(Overload::constructor(overload.params));
        self
    }

    /// Add an instance method
    pub fn method(mut self, method: Method) -> Self {
        self.methods.push(method);
        self
    }

    /// Add a static method
    pub fn static_method(mut self, method: Method) -> Self {
        self.static_methods.push(method);
        self
    }

    /// Add an instance field
    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    /// Add a static field
    pub fn static_field(mut self, field: Field) -> Self {
        self.static_fields.push(field);
        self
    }

    /// Set the parent class
    pub fn extends(mut self, parent: impl Into<String>) -> Self {
        self.extends = Some(parent.into());
        self
    }

    /// Dotted form of the binary name (`com.example.Counter`)
    pub fn dotted_name(&self) -> String {
        self.name.replace('/', ".")
    }

    pub(crate) fn find_method(&self, name: &str, is_static: bool) -> Option<&Method> {
        let methods = if is_static {
            &self.static_methods
        } else {
            &self.methods
        };
        methods.iter().find(|m| m.name == name)
    }

    pub(crate) fn find_field(&self, name: &str, is_static: bool) -> Option<&Field> {
        let fields = if is_static {
            &self.static_fields
        } else {
            &self.fields
        };
        fields.iter().find(|f| f.name == name)
    }

    /// Every declared type with a label for error messages and whether it is
    /// a return position (where `void` is allowed)
    pub(crate) fn declared_types(&self) -> Vec<(String, &TypeDesc, bool)> {
        let mut out = Vec::new();
        for (i, ctor) in self.constructors.iter().enumerate() {
            for (j, p) in ctor.params.iter().enumerate() {
                out.push((format!("{}.<init>#{} param {}", self.name, i, j), p, false));
            }
        }
        for method in self.methods.iter().chain(&self.static_methods) {
            for (i, overload) in method.overloads.iter().enumerate() {
                for (j, p) in overload.params.iter().enumerate() {
                    out.push((format!("{}.{}#{} param {}", self.name, method.name, i, j), p, false));
                }
                out.push((format!("{}.{}#{} return", self.name, method.name, i), &overload.ret, true));
            }
        }
        for field in self.fields.iter().chain(&self.static_fields) {
            out.push((format!("{}.{}", self.name, field.name), &field.ty, false));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_collects_members() {
        let class = ClassDescriptor::new("com/example/Counter")
            .constructor(Overload::constructor(vec![]))
            .method(Method::new("increment", TypeDesc::INT, vec![TypeDesc::INT]))
            .static_method(Method::new("create", TypeDesc::SelfRef, vec![]))
            .field(Field::new("value", TypeDesc::INT))
            .extends("com/example/Base");

        assert_eq!(class.constructors.len(), 1);
        assert!(class.find_method("increment", false).is_some());
        assert!(class.find_method("increment", true).is_none());
        assert!(class.find_method("create", true).is_some());
        assert!(class.find_field("value", false).is_some());
        assert_eq!(class.extends.as_deref(), Some("com/example/Base"));
        assert_eq!(class.dotted_name(), "com.example.Counter");
    }

    #[test]
    fn test_constructor_forces_void() {
        let class = ClassDescriptor::new("A").constructor(Overload::new(TypeDesc::INT, vec![TypeDesc::LONG]));
        assert_eq!(class.constructors[0].ret, TypeDesc::VOID);
        assert_eq!(class.constructors[0].arity(), 1);
    }

    #[test]
    fn test_overload_display() {
        let o = Overload::new(TypeDesc::String, vec![TypeDesc::INT, TypeDesc::object("a/B")]);
        assert_eq!(o.to_string(), "(int, a/B) -> String");
    }
}
