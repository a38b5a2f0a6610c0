//! Runtime traits
//!
//! The binding layer never links against a runtime directly. A host provides
//! a [`RawVm`] for the process and a [`RawEnv`] per attached thread; every
//! foreign operation goes through these two traits.

use crate::error::JResult;
use crate::value::{FieldId, JValue, MethodId, RawObject, ReleaseMode, ReturnKind};
use jbind_schema::PrimitiveKind;
use std::rc::Rc;

/// Per-thread runtime environment.
///
/// Implementations are not expected to be thread-safe: an environment is
/// only ever used on the thread it was obtained for.
pub trait RawEnv {
    // ========================================================================
    // Classes and references
    // ========================================================================

    /// Find a class by slash-separated binary name. Returns a local reference.
    fn find_class(&self, name: &str) -> JResult<RawObject>;

    /// Class of an object. Returns a local reference.
    fn get_object_class(&self, obj: RawObject) -> JResult<RawObject>;

    /// Create a new local reference to the same object
    fn new_local_ref(&self, obj: RawObject) -> RawObject;

    /// Release a local reference
    fn delete_local_ref(&self, obj: RawObject);

    /// Create a new global reference to the same object
    fn new_global_ref(&self, obj: RawObject) -> RawObject;

    /// Release a global reference
    fn delete_global_ref(&self, obj: RawObject);

    /// Check whether two references denote the same object
    fn is_same_object(&self, a: RawObject, b: RawObject) -> bool;

    // ========================================================================
    // Members
    // ========================================================================

    /// Look up a method (or constructor, named `<init>`) by signature
    fn get_method_id(&self, class: RawObject, name: &str, signature: &str, is_static: bool) -> JResult<MethodId>;

    /// Look up a field by signature
    fn get_field_id(&self, class: RawObject, name: &str, signature: &str, is_static: bool) -> JResult<FieldId>;

    /// Construct an object. Returns a local reference.
    fn new_object(&self, class: RawObject, ctor: MethodId, args: &[JValue]) -> JResult<RawObject>;

    /// Call an instance method
    fn call_method(&self, obj: RawObject, method: MethodId, ret: ReturnKind, args: &[JValue]) -> JResult<JValue>;

    /// Call a static method
    fn call_static_method(
        &self,
        class: RawObject,
        method: MethodId,
        ret: ReturnKind,
        args: &[JValue],
    ) -> JResult<JValue>;

    /// Read an instance field
    fn get_field(&self, obj: RawObject, field: FieldId, kind: ReturnKind) -> JResult<JValue>;

    /// Write an instance field
    fn set_field(&self, obj: RawObject, field: FieldId, value: JValue) -> JResult<()>;

    /// Read a static field
    fn get_static_field(&self, class: RawObject, field: FieldId, kind: ReturnKind) -> JResult<JValue>;

    /// Write a static field
    fn set_static_field(&self, class: RawObject, field: FieldId, value: JValue) -> JResult<()>;

    // ========================================================================
    // Strings
    // ========================================================================

    /// Create a string. Returns a local reference.
    fn new_string_utf(&self, s: &str) -> JResult<RawObject>;

    /// Read a string's contents
    fn get_string_utf(&self, s: RawObject) -> JResult<String>;

    // ========================================================================
    // Arrays
    // ========================================================================

    /// Create a zeroed primitive array. Returns a local reference.
    fn new_primitive_array(&self, kind: PrimitiveKind, len: usize) -> JResult<RawObject>;

    /// Create an object array filled with `init`. Returns a local reference.
    fn new_object_array(&self, len: usize, element_class: RawObject, init: RawObject) -> JResult<RawObject>;

    /// Array length
    fn array_length(&self, array: RawObject) -> JResult<usize>;

    /// Read an object array element. Returns a local reference.
    fn get_object_array_element(&self, array: RawObject, index: usize) -> JResult<RawObject>;

    /// Write an object array element
    fn set_object_array_element(&self, array: RawObject, index: usize, value: RawObject) -> JResult<()>;

    /// Copy `len` primitive elements starting at `start`
    fn get_array_region(&self, array: RawObject, start: usize, len: usize) -> JResult<Vec<JValue>>;

    /// Overwrite primitive elements starting at `start`
    fn set_array_region(&self, array: RawObject, start: usize, values: &[JValue]) -> JResult<()>;

    /// Pin a primitive array's elements for bulk access
    fn pin_array(&self, array: RawObject) -> JResult<Vec<JValue>>;

    /// Unpin an array, committing or discarding `values`
    fn unpin_array(&self, array: RawObject, values: &[JValue], mode: ReleaseMode);

    // ========================================================================
    // Exceptions
    // ========================================================================

    /// Raise a new exception of `class` with `message`
    fn throw_new(&self, class: RawObject, message: &str) -> JResult<()>;

    /// Check for a pending exception
    fn exception_check(&self) -> bool;

    /// Pending exception as a local reference (null if none)
    fn exception_occurred(&self) -> RawObject;

    /// Clear the pending exception
    fn exception_clear(&self);
}

/// Process-wide runtime handle
pub trait RawVm: Send + Sync {
    /// Environment of the current thread if it is already attached
    fn get_env(&self) -> Option<Rc<dyn RawEnv>>;

    /// Attach the current thread and return its environment
    fn attach_current_thread(&self) -> JResult<Rc<dyn RawEnv>>;

    /// Detach the current thread
    fn detach_current_thread(&self) -> JResult<()>;
}
