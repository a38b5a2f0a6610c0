//! Class registry
//!
//! Flat arena of declared classes. Each class gets a [`ClassIdx`] in
//! declaration order; `extends` names are resolved into indices in a second
//! pass once every declaration is known, so classes may refer to each other
//! in any order.

use crate::class::{ClassDescriptor, Field, MemberKind, Method, Overload};
use crate::error::SchemaError;
use crate::ty::{TypeDesc, OBJECT_CLASS};
use rustc_hash::FxHashMap;
use std::fmt;

/// Stable index of a class inside its registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassIdx(pub u32);

impl ClassIdx {
    /// Index as usize
    pub fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ClassIdx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Result of a member lookup along the inheritance chain
#[derive(Debug, Clone)]
pub struct MemberRef<'a, T> {
    /// The declaration that was found
    pub member: &'a T,
    /// Class that declares it
    pub declaring: ClassIdx,
    /// Name of the declaring class (what `SelfRef` binds to)
    pub declaring_name: &'a str,
    /// Inheritance hops from the lookup class to the declaring class
    pub depth: usize,
}

/// Immutable set of declared classes
#[derive(Debug, Clone, Default)]
pub struct ClassRegistry {
    classes: Vec<ClassDescriptor>,
    parents: Vec<Option<ClassIdx>>,
    by_name: FxHashMap<String, ClassIdx>,
}

impl ClassRegistry {
    /// Build a registry, validating names, inheritance and declared types
    pub fn build(classes: Vec<ClassDescriptor>) -> Result<Self, SchemaError> {
        let mut by_name = FxHashMap::default();
        for (i, class) in classes.iter().enumerate() {
            if by_name.insert(class.name.clone(), ClassIdx(i as u32)).is_some() {
                return Err(SchemaError::DuplicateClass {
                    name: class.name.clone(),
                });
            }
        }

        // Second pass: resolve forward parent references
        let mut parents = Vec::with_capacity(classes.len());
        for class in &classes {
            let parent = match &class.extends {
                Some(parent) => Some(*by_name.get(parent).ok_or_else(|| SchemaError::UnknownParent {
                    class: class.name.clone(),
                    parent: parent.clone(),
                })?),
                None => None,
            };
            parents.push(parent);
        }

        let registry = ClassRegistry {
            classes,
            parents,
            by_name,
        };
        registry.check_inheritance()?;
        registry.check_types()?;
        Ok(registry)
    }

    fn check_inheritance(&self) -> Result<(), SchemaError> {
        for start in 0..self.classes.len() {
            let mut chain = vec![ClassIdx(start as u32)];
            let mut current = self.parents[start];
            while let Some(idx) = current {
                if chain.contains(&idx) {
                    let mut names: Vec<&str> = chain.iter().map(|i| self.name_of(*i)).collect();
                    names.push(self.name_of(idx));
                    return Err(SchemaError::CircularInheritance {
                        cycle: names.join(" -> "),
                    });
                }
                chain.push(idx);
                current = self.parents[idx.as_usize()];
            }
        }
        Ok(())
    }

    fn check_types(&self) -> Result<(), SchemaError> {
        for class in &self.classes {
            for ctor in &class.constructors {
                if !ctor.ret.is_void() {
                    return Err(SchemaError::VoidValue {
                        context: format!("{} constructor must return void", class.name),
                    });
                }
            }
            for (context, ty, is_return) in class.declared_types() {
                check_type(ty, is_return, &context)?;
            }
        }
        Ok(())
    }

    /// Number of classes
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Look up a class index by name
    pub fn lookup(&self, name: &str) -> Option<ClassIdx> {
        self.by_name.get(name).copied()
    }

    /// Get a class by index
    pub fn get(&self, idx: ClassIdx) -> Option<&ClassDescriptor> {
        self.classes.get(idx.as_usize())
    }

    /// Get a class by name, failing with `UnknownClass`
    pub fn class(&self, name: &str) -> Result<(ClassIdx, &ClassDescriptor), SchemaError> {
        let idx = self.lookup(name).ok_or_else(|| SchemaError::UnknownClass {
            name: name.to_string(),
        })?;
        Ok((idx, &self.classes[idx.as_usize()]))
    }

    /// Iterate classes in declaration order
    pub fn iter(&self) -> impl Iterator<Item = (ClassIdx, &ClassDescriptor)> + '_ {
        self.classes
            .iter()
            .enumerate()
            .map(|(i, c)| (ClassIdx(i as u32), c))
    }

    /// Direct parent of a class
    pub fn parent(&self, idx: ClassIdx) -> Option<ClassIdx> {
        self.parents.get(idx.as_usize()).copied().flatten()
    }

    /// The class itself followed by its ancestors, with their depth
    pub fn ancestors(&self, idx: ClassIdx) -> impl Iterator<Item = (usize, ClassIdx)> + '_ {
        let mut current = Some(idx);
        let mut depth = 0;
        std::iter::from_fn(move || {
            let idx = current?;
            current = self.parent(idx);
            let item = (depth, idx);
            depth += 1;
            Some(item)
        })
    }

    /// Check whether `sub` names `sup` or one of its descendants.
    ///
    /// Every class is a subclass of the root object class. Undeclared
    /// classes only match themselves.
    pub fn is_subclass(&self, sub: &str, sup: &str) -> bool {
        if sub == sup || sup == OBJECT_CLASS {
            return true;
        }
        let Some(idx) = self.lookup(sub) else {
            return false;
        };
        self.ancestors(idx).any(|(_, a)| self.name_of(a) == sup)
    }

    /// Constructors of a class; a class with none cannot be instantiated
    pub fn constructors(&self, idx: ClassIdx) -> Result<&[Overload], SchemaError> {
        let class = self.descriptor(idx)?;
        if class.constructors.is_empty() {
            return Err(SchemaError::NoConstructors {
                class: class.name.clone(),
            });
        }
        Ok(&class.constructors)
    }

    /// Find a method by name, starting the walk at ancestor `from_depth`.
    ///
    /// The first class on the chain that declares the name wins, which is
    /// what makes a redeclaration in a subclass hide the ancestor's version.
    pub fn find_method(
        &self,
        idx: ClassIdx,
        name: &str,
        is_static: bool,
        from_depth: usize,
    ) -> Result<MemberRef<'_, Method>, SchemaError> {
        let kind = if is_static {
            MemberKind::StaticMethod
        } else {
            MemberKind::Method
        };
        self.find_member(idx, name, kind, from_depth, |c| c.find_method(name, is_static))
    }

    /// Find a field by name, starting the walk at ancestor `from_depth`
    pub fn find_field(
        &self,
        idx: ClassIdx,
        name: &str,
        is_static: bool,
        from_depth: usize,
    ) -> Result<MemberRef<'_, Field>, SchemaError> {
        let kind = if is_static {
            MemberKind::StaticField
        } else {
            MemberKind::Field
        };
        self.find_member(idx, name, kind, from_depth, |c| c.find_field(name, is_static))
    }

    /// Inheritance hops from `idx` to the nearest ancestor declaring `name`
    pub fn declaring_depth(&self, idx: ClassIdx, name: &str, kind: MemberKind) -> Option<usize> {
        let found = match kind {
            MemberKind::Method | MemberKind::StaticMethod => {
                self.find_method(idx, name, kind.is_static(), 0).map(|m| m.depth)
            }
            MemberKind::Field | MemberKind::StaticField => {
                self.find_field(idx, name, kind.is_static(), 0).map(|f| f.depth)
            }
            MemberKind::Constructor => self.constructors(idx).map(|_| 0),
        };
        found.ok()
    }

    fn find_member<'a, T>(
        &'a self,
        idx: ClassIdx,
        name: &str,
        kind: MemberKind,
        from_depth: usize,
        find: impl Fn(&'a ClassDescriptor) -> Option<&'a T>,
    ) -> Result<MemberRef<'a, T>, SchemaError> {
        let class = self.descriptor(idx)?;
        for (depth, ancestor) in self.ancestors(idx).skip(from_depth) {
            let desc = &self.classes[ancestor.as_usize()];
            if let Some(member) = find(desc) {
                return Ok(MemberRef {
                    member,
                    declaring: ancestor,
                    declaring_name: &desc.name,
                    depth,
                });
            }
        }
        Err(SchemaError::UnknownMember {
            class: class.name.clone(),
            member: name.to_string(),
            kind: kind.to_string(),
        })
    }

    fn descriptor(&self, idx: ClassIdx) -> Result<&ClassDescriptor, SchemaError> {
        self.classes.get(idx.as_usize()).ok_or_else(|| SchemaError::UnknownClass {
            name: idx.to_string(),
        })
    }

    fn name_of(&self, idx: ClassIdx) -> &str {
        &self.classes[idx.as_usize()].name
    }
}

fn check_type(ty: &TypeDesc, allow_void: bool, context: &str) -> Result<(), SchemaError> {
    match ty {
        TypeDesc::Primitive(kind) if kind.is_void() && !allow_void => Err(SchemaError::VoidValue {
            context: context.to_string(),
        }),
        TypeDesc::Array(array) => {
            let mut rank = u16::from(array.rank());
            let mut element = array.element();
            while let TypeDesc::Array(inner) = element {
                if inner.rank() == 0 {
                    break;
                }
                rank += u16::from(inner.rank());
                element = inner.element();
            }
            if array.rank() == 0 || rank > u16::from(u8::MAX) {
                return Err(SchemaError::InvalidArrayRank {
                    rank: if array.rank() == 0 { 0 } else { rank },
                    context: context.to_string(),
                });
            }
            check_type(element, false, context)
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shapes() -> ClassRegistry {
        ClassRegistry::build(vec![
            ClassDescriptor::new("shapes/Square")
                .extends("shapes/Rect")
                .method(Method::new("area", TypeDesc::LONG, vec![])),
            ClassDescriptor::new("shapes/Rect")
                .extends("shapes/Shape")
                .method(Method::new("area", TypeDesc::INT, vec![]))
                .field(Field::new("width", TypeDesc::INT)),
            ClassDescriptor::new("shapes/Shape")
                .constructor(Overload::constructor(vec![]))
                .method(Method::new("name", TypeDesc::String, vec![])),
        ])
        .unwrap()
    }

    #[test]
    fn test_forward_parent_resolution() {
        let reg = shapes();
        let square = reg.lookup("shapes/Square").unwrap();
        let rect = reg.lookup("shapes/Rect").unwrap();
        assert_eq!(reg.parent(square), Some(rect));
        let chain: Vec<usize> = reg.ancestors(square).map(|(d, _)| d).collect();
        assert_eq!(chain, vec![0, 1, 2]);
    }

    #[test]
    fn test_shadowing_and_depth() {
        let reg = shapes();
        let square = reg.lookup("shapes/Square").unwrap();

        let near = reg.find_method(square, "area", false, 0).unwrap();
        assert_eq!(near.member.overloads[0].ret, TypeDesc::LONG);
        assert_eq!(near.depth, 0);

        let hidden = reg.find_method(square, "area", false, 1).unwrap();
        assert_eq!(hidden.member.overloads[0].ret, TypeDesc::INT);
        assert_eq!(hidden.declaring_name, "shapes/Rect");

        assert_eq!(reg.declaring_depth(square, "name", MemberKind::Method), Some(2));
        assert_eq!(reg.declaring_depth(square, "width", MemberKind::Field), Some(1));
        assert_eq!(reg.declaring_depth(square, "missing", MemberKind::Method), None);
    }

    #[test]
    fn test_unknown_member() {
        let reg = shapes();
        let rect = reg.lookup("shapes/Rect").unwrap();
        let err = reg.find_field(rect, "height", false, 0).unwrap_err();
        assert!(matches!(err, SchemaError::UnknownMember { .. }));
        assert!(reg.find_method(rect, "area", true, 0).is_err());
    }

    #[test]
    fn test_constructors_required() {
        let reg = shapes();
        let rect = reg.lookup("shapes/Rect").unwrap();
        assert_eq!(
            reg.constructors(rect).unwrap_err(),
            SchemaError::NoConstructors {
                class: "shapes/Rect".to_string()
            }
        );
    }

    #[test]
    fn test_subclass_relation() {
        let reg = shapes();
        assert!(reg.is_subclass("shapes/Square", "shapes/Shape"));
        assert!(reg.is_subclass("shapes/Rect", "java/lang/Object"));
        assert!(!reg.is_subclass("shapes/Shape", "shapes/Rect"));
        assert!(reg.is_subclass("opaque/Thing", "opaque/Thing"));
        assert!(!reg.is_subclass("opaque/Thing", "shapes/Shape"));
    }

    #[test]
    fn test_duplicate_class() {
        let err = ClassRegistry::build(vec![ClassDescriptor::new("A"), ClassDescriptor::new("A")]).unwrap_err();
        assert_eq!(err, SchemaError::DuplicateClass { name: "A".to_string() });
    }

    #[test]
    fn test_unknown_parent() {
        let err = ClassRegistry::build(vec![ClassDescriptor::new("A").extends("B")]).unwrap_err();
        assert!(matches!(err, SchemaError::UnknownParent { .. }));
    }

    #[test]
    fn test_circular_inheritance() {
        let err = ClassRegistry::build(vec![
            ClassDescriptor::new("A").extends("B"),
            ClassDescriptor::new("B").extends("A"),
        ])
        .unwrap_err();
        assert!(matches!(err, SchemaError::CircularInheritance { .. }));
    }

    #[test]
    fn test_invalid_types() {
        let zero_rank = ClassDescriptor::new("A").field(Field::new("xs", TypeDesc::array(TypeDesc::INT, 0)));
        assert!(matches!(
            ClassRegistry::build(vec![zero_rank]).unwrap_err(),
            SchemaError::InvalidArrayRank { rank: 0, .. }
        ));

        let zero_outer = TypeDesc::array(TypeDesc::array(TypeDesc::INT, 2), 0);
        let zero_outer = ClassDescriptor::new("A").field(Field::new("xs", zero_outer));
        assert!(matches!(
            ClassRegistry::build(vec![zero_outer]).unwrap_err(),
            SchemaError::InvalidArrayRank { rank: 0, .. }
        ));

        let too_deep = TypeDesc::array(TypeDesc::array(TypeDesc::INT, 200), 100);
        let too_deep = ClassDescriptor::new("A").field(Field::new("xs", too_deep));
        assert!(matches!(
            ClassRegistry::build(vec![too_deep]).unwrap_err(),
            SchemaError::InvalidArrayRank { rank: 300, .. }
        ));

        let deepest = ClassDescriptor::new("A").field(Field::new("xs", TypeDesc::array(TypeDesc::INT, 255)));
        assert!(ClassRegistry::build(vec![deepest]).is_ok());

        let void_param = ClassDescriptor::new("A").method(Method::new("f", TypeDesc::VOID, vec![TypeDesc::VOID]));
        assert!(matches!(
            ClassRegistry::build(vec![void_param]).unwrap_err(),
            SchemaError::VoidValue { .. }
        ));

        let void_return = ClassDescriptor::new("A").method(Method::new("f", TypeDesc::VOID, vec![]));
        assert!(ClassRegistry::build(vec![void_return]).is_ok());
    }
}
