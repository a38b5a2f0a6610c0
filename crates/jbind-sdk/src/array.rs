//! Array handles
//!
//! Elements of rank-1 primitive arrays are copied in bulk with
//! [`LocalArray::region`] or accessed in place through a pinned
//! [`ArrayView`]. Arrays of references (strings, objects, or inner arrays of
//! a multi-dimensional array) are accessed one element at a time.

use crate::args::Arg;
use crate::env::{Env, Value};
use crate::error::{JResult, JniError};
use crate::refs::{AsRaw, Global, Local};
use crate::value::{JValue, RawObject, ReleaseMode};
use jbind_schema::{arg_key, ElementType, LoaderId, OverloadSelector, SelectionError, TypeDesc, OBJECT_CLASS};
use std::ops::{Deref, DerefMut};

/// Declared type of one element of an array with `element` and `rank`
fn component_type(element: &ElementType, rank: u8) -> TypeDesc {
    let base = match element {
        ElementType::Primitive(kind) => TypeDesc::Primitive(*kind),
        ElementType::String => TypeDesc::String,
        ElementType::Object(Some(name)) => TypeDesc::object(name.as_str()),
        ElementType::Object(None) => TypeDesc::object(OBJECT_CLASS),
    };
    if rank > 1 {
        TypeDesc::array(base, rank - 1)
    } else {
        base
    }
}

/// Transient handle to an array
#[derive(Debug)]
pub struct LocalArray<'e> {
    local: Local<'e>,
    element: ElementType,
    rank: u8,
    namespace: u16,
    loader: LoaderId,
}

impl<'e> LocalArray<'e> {
    pub(crate) fn from_parts(local: Local<'e>, element: ElementType, rank: u8, namespace: u16, loader: LoaderId) -> Self {
        Self {
            local,
            element,
            rank,
            namespace,
            loader,
        }
    }

    /// Element type
    pub fn element(&self) -> &ElementType {
        &self.element
    }

    /// Number of dimensions
    pub fn rank(&self) -> u8 {
        self.rank
    }

    fn env(&self) -> &'e Env {
        self.local.env()
    }

    fn is_primitive(&self) -> bool {
        self.rank == 1 && matches!(self.element, ElementType::Primitive(_))
    }

    fn require_primitive(&self) -> JResult<()> {
        if self.is_primitive() {
            Ok(())
        } else {
            Err(JniError::TypeMismatch {
                expected: "primitive array".to_string(),
                got: format!("{}{}", "[".repeat(self.rank as usize), self.element.descriptor()),
            })
        }
    }

    fn check_index(&self, index: usize, count: usize) -> JResult<()> {
        let len = self.len()?;
        if index.checked_add(count).map_or(true, |end| end > len) {
            return Err(JniError::IndexOutOfBounds { index, len });
        }
        Ok(())
    }

    /// Number of elements
    pub fn len(&self) -> JResult<usize> {
        self.env().raw().array_length(self.local.as_raw())
    }

    /// Check for an empty array
    pub fn is_empty(&self) -> JResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Read one element
    pub fn get(&self, index: usize) -> JResult<Value<'e>> {
        self.check_index(index, 1)?;
        let env = self.env();
        if self.is_primitive() {
            let values = env.raw().get_array_region(self.local.as_raw(), index, 1)?;
            return values
                .into_iter()
                .next()
                .map(Value::Primitive)
                .ok_or(JniError::IndexOutOfBounds { index, len: 0 });
        }
        let raw = env.raw().get_object_array_element(self.local.as_raw(), index)?;
        if raw.is_null() {
            return Ok(Value::Null);
        }
        let ty = component_type(&self.element, self.rank);
        Ok(env.typed(self.namespace, self.loader, &ty, OBJECT_CLASS, Local::adopt(env, raw)))
    }

    /// Write one element
    pub fn set<'a>(&self, index: usize, value: impl Into<Arg<'a>>) -> JResult<()> {
        self.check_index(index, 1)?;
        let env = self.env();
        let value = value.into();
        let ty = component_type(&self.element, self.rank);
        let ns = env.jvm().namespace(self.namespace)?;
        let arg_type = value.arg_type();
        if !OverloadSelector::new(ns, OBJECT_CLASS, env.jvm().options().ambiguity).is_viable(&ty, &arg_type) {
            return Err(SelectionError::NoViableOverload {
                member: format!("[{}]", index),
                args: arg_key(std::slice::from_ref(&arg_type)),
            }
            .into());
        }
        let array = self.local.as_raw();
        env.with_lowered(std::slice::from_ref(&value), |values| match values[0] {
            JValue::Object(raw) => env.raw().set_object_array_element(array, index, raw),
            primitive => env.raw().set_array_region(array, index, &[primitive]),
        })
    }

    /// Copy `len` elements starting at `start`
    pub fn region(&self, start: usize, len: usize) -> JResult<Vec<JValue>> {
        self.require_primitive()?;
        self.check_index(start, len)?;
        self.env().raw().get_array_region(self.local.as_raw(), start, len)
    }

    /// Overwrite elements starting at `start`
    pub fn set_region(&self, start: usize, values: &[JValue]) -> JResult<()> {
        self.require_primitive()?;
        self.check_index(start, values.len())?;
        if let ElementType::Primitive(kind) = &self.element {
            if let Some(bad) = values.iter().find(|v| v.kind() != Some(*kind)) {
                return Err(JniError::TypeMismatch {
                    expected: kind.type_name().to_string(),
                    got: bad.type_name().to_string(),
                });
            }
        }
        self.env().raw().set_array_region(self.local.as_raw(), start, values)
    }

    /// Copy every element out
    pub fn to_vec(&self) -> JResult<Vec<JValue>> {
        self.region(0, self.len()?)
    }

    /// Pin the elements for in-place access
    pub fn pin(&self) -> JResult<ArrayView<'e>> {
        self.require_primitive()?;
        let env = self.env();
        let raw = self.local.as_raw();
        let values = env.raw().pin_array(raw)?;
        Ok(ArrayView {
            env,
            array: raw,
            values,
            mode: ReleaseMode::Commit,
        })
    }

    /// Create a durable handle and release this one
    pub fn promote(self) -> GlobalArray {
        GlobalArray {
            global: self.local.promote(),
            element: self.element,
            rank: self.rank,
            namespace: self.namespace,
            loader: self.loader,
        }
    }

    /// Drop the array typing
    pub fn into_local(self) -> Local<'e> {
        self.local
    }
}

impl AsRaw for LocalArray<'_> {
    fn as_raw(&self) -> RawObject {
        self.local.as_raw()
    }
}

/// Durable handle to an array
#[derive(Debug)]
pub struct GlobalArray {
    global: Global,
    element: ElementType,
    rank: u8,
    namespace: u16,
    loader: LoaderId,
}

impl GlobalArray {
    /// New transient handle to the same array
    pub fn to_local<'e>(&self, env: &'e Env) -> LocalArray<'e> {
        LocalArray::from_parts(
            self.global.to_local(env),
            self.element.clone(),
            self.rank,
            self.namespace,
            self.loader,
        )
    }
}

impl AsRaw for GlobalArray {
    fn as_raw(&self) -> RawObject {
        self.global.as_raw()
    }
}

impl<'a> From<&'a LocalArray<'_>> for Arg<'a> {
    fn from(array: &'a LocalArray<'_>) -> Self {
        Arg::Array {
            raw: array.as_raw(),
            element: array.element.clone(),
            rank: array.rank,
        }
    }
}

impl<'a> From<&'a GlobalArray> for Arg<'a> {
    fn from(array: &'a GlobalArray) -> Self {
        Arg::Array {
            raw: array.as_raw(),
            element: array.element.clone(),
            rank: array.rank,
        }
    }
}

// ============================================================================
// Pinned view
// ============================================================================

/// Pinned elements of a primitive array. Changes are written back when the
/// view drops unless it is aborted.
pub struct ArrayView<'e> {
    env: &'e Env,
    array: RawObject,
    values: Vec<JValue>,
    mode: ReleaseMode,
}

impl ArrayView<'_> {
    /// Write changes back and unpin
    pub fn commit(self) {}

    /// Discard changes and unpin
    pub fn abort(mut self) {
        self.mode = ReleaseMode::Abort;
    }
}

impl Deref for ArrayView<'_> {
    type Target = [JValue];

    fn deref(&self) -> &[JValue] {
        &self.values
    }
}

impl DerefMut for ArrayView<'_> {
    fn deref_mut(&mut self) -> &mut [JValue] {
        &mut self.values
    }
}

impl Drop for ArrayView<'_> {
    fn drop(&mut self) {
        self.env.raw().unpin_array(self.array, &self.values, self.mode);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jbind_schema::PrimitiveKind;

    #[test]
    fn test_component_type() {
        let ints = ElementType::Primitive(PrimitiveKind::Int);
        assert_eq!(component_type(&ints, 1), TypeDesc::INT);
        assert_eq!(component_type(&ints, 3), TypeDesc::array(TypeDesc::INT, 2));
        assert_eq!(component_type(&ElementType::Object(None), 1), TypeDesc::object(OBJECT_CLASS));
        assert_eq!(component_type(&ElementType::String, 2), TypeDesc::array(TypeDesc::String, 1));
    }
}
