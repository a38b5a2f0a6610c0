//! Call/access facade
//!
//! [`Env`] pairs the current thread's runtime environment with the root
//! context. Every foreign call goes through the same pipeline:
//!
//! 1. find the member on the class or the nearest ancestor declaring it
//! 2. select the overload (memoized per argument-type key)
//! 3. synthesize its signature
//! 4. fetch the class object and member id from the cache, looking them up
//!    on first use under the class's owning loader
//! 5. lower the arguments, creating temporary strings where needed
//! 6. call the entry point for the return kind, release the temporaries
//! 7. surface a pending foreign exception as an error
//! 8. wrap a returned reference as a transient handle

use crate::args::Arg;
use crate::array::LocalArray;
use crate::cache::{CacheKey, DispatchKey};
use crate::error::{JResult, JniError};
use crate::jvm::{ClassRef, Jvm};
use crate::loader::bootstrap;
use crate::object::LocalObject;
use crate::refs::{AsRaw, Local};
use crate::runtime::RawEnv;
use crate::statics::StaticRef;
use crate::string::LocalString;
use crate::value::{FieldId, JValue, RawObject, ReturnKind};
use jbind_schema::signature::{constructor_signature, field_signature, method_signature};
use jbind_schema::{
    arg_key, ArgType, ElementType, LoaderId, MemberKind, Namespace, Overload, OverloadSelector, PrimitiveKind,
    SelectionError, TypeDesc, OBJECT_CLASS, STRING_CLASS,
};
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

/// Receiver of a member access
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Receiver {
    Instance(RawObject),
    Static,
}

/// Where a class object comes from on first use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ClassSource {
    /// Already cached, or findable by name
    Cached,
    /// Load through this class loader object
    Loader(RawObject),
    /// Load through the class loader of this instance
    Instance(RawObject),
}

struct ResolvedField {
    id: FieldId,
    class_obj: RawObject,
    ty: TypeDesc,
    declaring: String,
    loader: LoaderId,
}

/// Runtime environment of the current thread, bound to a context
#[derive(Clone)]
pub struct Env {
    raw: Rc<dyn RawEnv>,
    jvm: Jvm,
}

impl fmt::Debug for Env {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Env").field("jvm", &self.jvm).finish()
    }
}

impl Env {
    pub(crate) fn new(raw: Rc<dyn RawEnv>, jvm: Jvm) -> Self {
        Self { raw, jvm }
    }

    /// Bind an environment the runtime handed to a native entry point
    pub fn from_raw(raw: Rc<dyn RawEnv>, jvm: &Jvm) -> Self {
        Self::new(raw, jvm.clone())
    }

    /// Raw runtime environment
    pub fn raw(&self) -> &dyn RawEnv {
        &*self.raw
    }

    /// Root context
    pub fn jvm(&self) -> &Jvm {
        &self.jvm
    }

    // ========================================================================
    // Classes and objects
    // ========================================================================

    /// Resolve a class of the first namespace
    pub fn class(&self, name: &str) -> JResult<ClassRef> {
        self.jvm.class_in(0, name)
    }

    /// Resolve a class of a given namespace
    pub fn class_in(&self, namespace: u16, name: &str) -> JResult<ClassRef> {
        self.jvm.class_in(namespace, name)
    }

    /// Construct an instance, selecting the constructor from `args`
    pub fn new_object(&self, class: &ClassRef, args: &[Arg<'_>]) -> JResult<LocalObject<'_>> {
        self.construct(class, ClassSource::Cached, args)
    }

    /// Static members of a class
    pub fn statics(&self, class: &ClassRef) -> StaticRef<'_> {
        StaticRef::new(self, class.clone())
    }

    /// Check whether two handles denote the same object
    pub fn is_same_object(&self, a: &impl AsRaw, b: &impl AsRaw) -> bool {
        self.raw.is_same_object(a.as_raw(), b.as_raw())
    }

    // ========================================================================
    // Strings and arrays
    // ========================================================================

    /// Create a runtime string
    pub fn new_string(&self, s: &str) -> JResult<LocalString<'_>> {
        let raw = self.raw.new_string_utf(s)?;
        Ok(LocalString::from_local(Local::adopt(self, raw)))
    }

    /// Create a zeroed primitive array
    pub fn new_primitive_array(&self, kind: PrimitiveKind, len: usize) -> JResult<LocalArray<'_>> {
        if kind.is_void() {
            return Err(JniError::TypeMismatch {
                expected: "value type".to_string(),
                got: "void".to_string(),
            });
        }
        let raw = self.raw.new_primitive_array(kind, len)?;
        Ok(LocalArray::from_parts(
            Local::adopt(self, raw),
            ElementType::Primitive(kind),
            1,
            0,
            LoaderId::Default,
        ))
    }

    /// Create an array of null references to instances of `element`
    pub fn new_object_array(&self, element: &ClassRef, len: usize) -> JResult<LocalArray<'_>> {
        let class_obj = self.class_object(element.namespace, &element.name, element.loader, ClassSource::Cached)?;
        let raw = self.raw.new_object_array(len, class_obj, RawObject::NULL)?;
        Ok(LocalArray::from_parts(
            Local::adopt(self, raw),
            ElementType::Object(Some(element.name.to_string())),
            1,
            element.namespace,
            element.loader,
        ))
    }

    /// Create an array of null strings
    pub fn new_string_array(&self, len: usize) -> JResult<LocalArray<'_>> {
        let class_obj = self.class_object(0, STRING_CLASS, LoaderId::Default, ClassSource::Cached)?;
        let raw = self.raw.new_object_array(len, class_obj, RawObject::NULL)?;
        Ok(LocalArray::from_parts(
            Local::adopt(self, raw),
            ElementType::String,
            1,
            0,
            LoaderId::Default,
        ))
    }

    /// Create an array of `rank` dimensions whose outer dimension has `len`
    /// null slots. Inner arrays are filled in with [`LocalArray::set`].
    pub fn new_nested_array(&self, element: ElementType, rank: u8, len: usize) -> JResult<LocalArray<'_>> {
        if rank < 2 {
            return Err(JniError::TypeMismatch {
                expected: "rank >= 2".to_string(),
                got: format!("rank {}", rank),
            });
        }
        let component = format!("{}{}", "[".repeat(rank as usize - 1), element.descriptor());
        let class_obj = self.class_object(0, &component, LoaderId::Default, ClassSource::Cached)?;
        let raw = self.raw.new_object_array(len, class_obj, RawObject::NULL)?;
        Ok(LocalArray::from_parts(Local::adopt(self, raw), element, rank, 0, LoaderId::Default))
    }

    // ========================================================================
    // Exceptions
    // ========================================================================

    /// Raise a new exception of the named class
    pub fn throw_new(&self, class: &str, message: &str) -> JResult<()> {
        let class_obj = self.class_object(0, class, LoaderId::Default, ClassSource::Cached)?;
        self.raw.throw_new(class_obj, message)
    }

    /// Check for a pending exception
    pub fn exception_check(&self) -> bool {
        self.raw.exception_check()
    }

    /// The pending exception, if any
    pub fn exception_occurred(&self) -> Option<Local<'_>> {
        let raw = self.raw.exception_occurred();
        if raw.is_null() {
            None
        } else {
            Some(Local::adopt(self, raw))
        }
    }

    /// Clear the pending exception
    pub fn exception_clear(&self) {
        self.raw.exception_clear();
    }

    // ========================================================================
    // Pipeline
    // ========================================================================

    fn ensure_live(&self) -> JResult<()> {
        if self.jvm.is_torn_down() {
            Err(JniError::TornDown)
        } else {
            Ok(())
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn select(
        &self,
        ns: &Namespace,
        class: &ClassRef,
        kind: MemberKind,
        depth: usize,
        name: &str,
        declaring: &str,
        overloads: &[Overload],
        args: &[ArgType],
    ) -> JResult<usize> {
        let key = DispatchKey {
            namespace: class.namespace,
            class: class.name.to_string(),
            kind,
            depth,
            name: name.to_string(),
            args: arg_key(args),
        };
        let policy = self.jvm.options().ambiguity;
        let index = self
            .jvm
            .dispatch()
            .resolve(key, || OverloadSelector::new(ns, declaring, policy).select(name, overloads, args))?;
        Ok(index)
    }

    /// Class object for `name` under `loader`, promoted to a global
    /// reference and cached on first use
    pub(crate) fn class_object(
        &self,
        namespace: u16,
        name: &str,
        loader: LoaderId,
        source: ClassSource,
    ) -> JResult<RawObject> {
        self.ensure_live()?;
        let partition = loader.cache_index().unwrap_or(0);
        self.jvm.cache().class_id(CacheKey::class(namespace, partition, name), || {
            let local = match (loader, source) {
                (LoaderId::Custom(_), ClassSource::Loader(loader_obj)) => {
                    bootstrap::load_class(self, namespace, loader_obj, name)?
                }
                (LoaderId::Custom(_), ClassSource::Instance(instance)) if self.jvm.options().loader_fallback => {
                    let class_loader = bootstrap::class_loader_of(self, namespace, instance)?;
                    bootstrap::load_class(self, namespace, class_loader.as_raw(), name)?
                }
                (LoaderId::Custom(_), _) => {
                    let loader_name = self
                        .jvm
                        .namespace(namespace)
                        .map(|ns| ns.loader_name(loader))
                        .unwrap_or_else(|_| loader.to_string());
                    return Err(JniError::LoaderNotPrimed {
                        class: name.to_string(),
                        loader: loader_name,
                    });
                }
                _ => self.raw.find_class(name)?,
            };
            if local.is_null() {
                return Err(JniError::ClassNotFound(name.to_string()));
            }
            let global = self.raw.new_global_ref(local);
            self.raw.delete_local_ref(local);
            Ok(global)
        })
    }

    /// Lower `args`, run `call`, then release temporary strings
    pub(crate) fn with_lowered<R>(&self, args: &[Arg<'_>], call: impl FnOnce(&[JValue]) -> JResult<R>) -> JResult<R> {
        let mut temps = Vec::new();
        let mut values = Vec::with_capacity(args.len());
        let mut lowered = Ok(());
        for arg in args {
            match self.lower(arg, &mut temps) {
                Ok(value) => values.push(value),
                Err(e) => {
                    lowered = Err(e);
                    break;
                }
            }
        }
        let result = lowered.and_then(|_| call(&values));
        for temp in temps {
            self.raw.delete_local_ref(temp);
        }
        result
    }

    fn lower(&self, arg: &Arg<'_>, temps: &mut Vec<RawObject>) -> JResult<JValue> {
        Ok(match arg {
            Arg::Primitive(value) => *value,
            Arg::Str(s, _) => {
                let raw = self.raw.new_string_utf(s)?;
                temps.push(raw);
                JValue::Object(raw)
            }
            Arg::StringHandle(raw) | Arg::RawArray(raw) => JValue::Object(*raw),
            Arg::Object { raw, .. } | Arg::Array { raw, .. } => JValue::Object(*raw),
        })
    }

    /// Turn a pending exception into an error, dropping any returned reference
    pub(crate) fn check_pending(&self, result: JResult<JValue>) -> JResult<JValue> {
        let value = result?;
        if self.jvm.options().check_exceptions && self.raw.exception_check() {
            if let Some(raw) = value.as_object() {
                if !raw.is_null() {
                    self.raw.delete_local_ref(raw);
                }
            }
            return Err(JniError::PendingException);
        }
        Ok(value)
    }

    pub(crate) fn construct(&self, class: &ClassRef, source: ClassSource, args: &[Arg<'_>]) -> JResult<LocalObject<'_>> {
        self.ensure_live()?;
        let ns = self.jvm.namespace(class.namespace)?;
        let ctors = ns.registry().constructors(class.idx)?;
        let arg_types: Vec<ArgType> = args.iter().map(Arg::arg_type).collect();
        let index = self.select(ns, class, MemberKind::Constructor, 0, "<init>", &class.name, ctors, &arg_types)?;
        let signature = constructor_signature(&ctors[index].params, &class.name);

        let class_obj = self.class_object(class.namespace, &class.name, class.loader, source)?;
        let partition = class.loader.cache_index().unwrap_or(0);
        let ctor = self.jvm.cache().method_id(
            CacheKey::method(class.namespace, partition, class.name(), "<init>", signature.as_str(), false),
            || self.raw.get_method_id(class_obj, "<init>", &signature, false),
        )?;

        tracing::trace!(class = %class.name, signature = %signature, "construct");
        let result = self.with_lowered(args, |values| self.raw.new_object(class_obj, ctor, values));
        let value = self.check_pending(result.map(JValue::Object))?;
        match value.as_object() {
            Some(raw) if !raw.is_null() => Ok(LocalObject::from_parts(Local::adopt(self, raw), class.clone())),
            _ => Err(JniError::NullReference(format!("constructor of {} returned null", class.name))),
        }
    }

    pub(crate) fn invoke(
        &self,
        class: &ClassRef,
        receiver: Receiver,
        depth: usize,
        name: &str,
        args: &[Arg<'_>],
    ) -> JResult<Value<'_>> {
        self.ensure_live()?;
        if receiver == Receiver::Instance(RawObject::NULL) {
            return Err(JniError::NullReference(format!("{}.{}", class.name, name)));
        }
        let ns = self.jvm.namespace(class.namespace)?;
        let is_static = receiver == Receiver::Static;
        let kind = if is_static {
            MemberKind::StaticMethod
        } else {
            MemberKind::Method
        };
        let member = ns.registry().find_method(class.idx, name, is_static, depth)?;
        let declaring = member.declaring_name;
        let arg_types: Vec<ArgType> = args.iter().map(Arg::arg_type).collect();
        let index = self.select(ns, class, kind, depth, name, declaring, &member.member.overloads, &arg_types)?;
        let overload = &member.member.overloads[index];
        let signature = method_signature(overload, declaring);

        let loader = ns.owning_loader_from(class.loader, declaring)?;
        let source = match receiver {
            Receiver::Instance(raw) => ClassSource::Instance(raw),
            Receiver::Static => ClassSource::Cached,
        };
        let class_obj = self.class_object(class.namespace, declaring, loader, source)?;
        let partition = loader.cache_index().unwrap_or(0);
        let method = self.jvm.cache().method_id(
            CacheKey::method(class.namespace, partition, declaring, name, signature.as_str(), is_static),
            || self.raw.get_method_id(class_obj, name, &signature, is_static),
        )?;

        tracing::trace!(class = %declaring, method = name, signature = %signature, "invoke");
        let ret = ReturnKind::of(&overload.ret);
        let result = self.with_lowered(args, |values| match receiver {
            Receiver::Instance(obj) => self.raw.call_method(obj, method, ret, values),
            Receiver::Static => self.raw.call_static_method(class_obj, method, ret, values),
        });
        let value = self.check_pending(result)?;
        self.lift(class.namespace, loader, &overload.ret, declaring, value)
    }

    fn resolve_field(&self, class: &ClassRef, receiver: Receiver, name: &str) -> JResult<ResolvedField> {
        self.ensure_live()?;
        if receiver == Receiver::Instance(RawObject::NULL) {
            return Err(JniError::NullReference(format!("{}.{}", class.name, name)));
        }
        let ns = self.jvm.namespace(class.namespace)?;
        let is_static = receiver == Receiver::Static;
        let field = ns.registry().find_field(class.idx, name, is_static, 0)?;
        let declaring = field.declaring_name;
        let signature = field_signature(field.member, declaring);

        let loader = ns.owning_loader_from(class.loader, declaring)?;
        let source = match receiver {
            Receiver::Instance(raw) => ClassSource::Instance(raw),
            Receiver::Static => ClassSource::Cached,
        };
        let class_obj = self.class_object(class.namespace, declaring, loader, source)?;
        let partition = loader.cache_index().unwrap_or(0);
        let id = self.jvm.cache().field_id(
            CacheKey::field(class.namespace, partition, declaring, name, signature.as_str(), is_static),
            || self.raw.get_field_id(class_obj, name, &signature, is_static),
        )?;
        Ok(ResolvedField {
            id,
            class_obj,
            ty: field.member.ty.clone(),
            declaring: declaring.to_string(),
            loader,
        })
    }

    pub(crate) fn get_field(&self, class: &ClassRef, receiver: Receiver, name: &str) -> JResult<Value<'_>> {
        let field = self.resolve_field(class, receiver, name)?;
        let kind = ReturnKind::of(&field.ty);
        let result = match receiver {
            Receiver::Instance(obj) => self.raw.get_field(obj, field.id, kind),
            Receiver::Static => self.raw.get_static_field(field.class_obj, field.id, kind),
        };
        let value = self.check_pending(result)?;
        self.lift(class.namespace, field.loader, &field.ty, &field.declaring, value)
    }

    pub(crate) fn set_field(&self, class: &ClassRef, receiver: Receiver, name: &str, value: &Arg<'_>) -> JResult<()> {
        let field = self.resolve_field(class, receiver, name)?;
        let ns = self.jvm.namespace(class.namespace)?;
        let arg_type = value.arg_type();
        let selector = OverloadSelector::new(ns, &field.declaring, self.jvm.options().ambiguity);
        if !selector.is_viable(&field.ty, &arg_type) {
            return Err(SelectionError::NoViableOverload {
                member: name.to_string(),
                args: arg_key(std::slice::from_ref(&arg_type)),
            }
            .into());
        }
        let result = self.with_lowered(std::slice::from_ref(value), |values| match receiver {
            Receiver::Instance(obj) => self.raw.set_field(obj, field.id, values[0]),
            Receiver::Static => self.raw.set_static_field(field.class_obj, field.id, values[0]),
        });
        self.check_pending(result.map(|_| JValue::Void)).map(|_| ())
    }

    fn lift(&self, namespace: u16, loader: LoaderId, ty: &TypeDesc, declaring: &str, value: JValue) -> JResult<Value<'_>> {
        match ty {
            TypeDesc::Primitive(PrimitiveKind::Void) => Ok(Value::Void),
            TypeDesc::Primitive(_) => Ok(Value::Primitive(value)),
            _ => {
                let raw = value.as_object().ok_or_else(|| JniError::TypeMismatch {
                    expected: ty.to_string(),
                    got: value.type_name().to_string(),
                })?;
                if raw.is_null() {
                    return Ok(Value::Null);
                }
                Ok(self.typed(namespace, loader, ty, declaring, Local::adopt(self, raw)))
            }
        }
    }

    /// Attach schema type information to a reference of declared type `ty`
    pub(crate) fn typed<'e>(
        &'e self,
        namespace: u16,
        loader: LoaderId,
        ty: &TypeDesc,
        declaring: &str,
        local: Local<'e>,
    ) -> Value<'e> {
        match ty {
            TypeDesc::String => Value::String(LocalString::from_local(local)),
            TypeDesc::Object(_) | TypeDesc::SelfRef => {
                let name = ty.class_name(declaring).unwrap_or(OBJECT_CLASS);
                match self.class_ref_from(namespace, loader, name) {
                    Some(class) => Value::Object(LocalObject::from_parts(local, class)),
                    None => Value::Untyped(local),
                }
            }
            TypeDesc::Array(_) => match ElementType::of(ty, declaring) {
                Some((element, rank)) => Value::Array(LocalArray::from_parts(local, element, rank, namespace, loader)),
                None => Value::Untyped(local),
            },
            TypeDesc::Primitive(_) => Value::Untyped(local),
        }
    }

    fn class_ref_from(&self, namespace: u16, from: LoaderId, name: &str) -> Option<ClassRef> {
        let ns = self.jvm.namespace(namespace).ok()?;
        let idx = ns.registry().lookup(name)?;
        let loader = ns
            .owning_loader_from(from, name)
            .unwrap_or_else(|_| ns.owning_loader(name));
        Some(ClassRef {
            namespace,
            idx,
            loader,
            name: Arc::from(name),
        })
    }
}

// ============================================================================
// Returned values
// ============================================================================

/// Result of a call or field read
#[derive(Debug)]
pub enum Value<'e> {
    /// `void` return
    Void,
    /// Null reference
    Null,
    /// Primitive value
    Primitive(JValue),
    /// Instance of a declared class
    Object(LocalObject<'e>),
    /// Runtime string
    String(LocalString<'e>),
    /// Array
    Array(LocalArray<'e>),
    /// Reference of an undeclared class
    Untyped(Local<'e>),
}

macro_rules! primitive_accessors {
    ($($name:ident -> $ty:ty : $variant:ident),* $(,)?) => {
        $(
            #[doc = concat!("Extract a `", stringify!($ty), "` result")]
            pub fn $name(self) -> JResult<$ty> {
                match self {
                    Value::Primitive(JValue::$variant(v)) => Ok(v),
                    other => Err(other.mismatch(stringify!($variant))),
                }
            }
        )*
    };
}

impl<'e> Value<'e> {
    primitive_accessors! {
        into_bool -> bool : Boolean,
        into_byte -> i8 : Byte,
        into_char -> u16 : Char,
        into_short -> i16 : Short,
        into_int -> i32 : Int,
        into_long -> i64 : Long,
        into_float -> f32 : Float,
        into_double -> f64 : Double,
    }

    /// Check for a `void` result
    pub fn is_void(&self) -> bool {
        matches!(self, Value::Void)
    }

    /// Check for a null reference
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Primitive payload, if any
    pub fn as_primitive(&self) -> Option<JValue> {
        match self {
            Value::Primitive(v) => Some(*v),
            _ => None,
        }
    }

    /// Extract an object result
    pub fn into_object(self) -> JResult<LocalObject<'e>> {
        match self {
            Value::Object(obj) => Ok(obj),
            other => Err(other.mismatch("object")),
        }
    }

    /// Extract a string result
    pub fn into_string(self) -> JResult<LocalString<'e>> {
        match self {
            Value::String(s) => Ok(s),
            other => Err(other.mismatch("string")),
        }
    }

    /// Extract an array result
    pub fn into_array(self) -> JResult<LocalArray<'e>> {
        match self {
            Value::Array(a) => Ok(a),
            other => Err(other.mismatch("array")),
        }
    }

    /// Extract any non-null reference as a plain local handle
    pub fn into_local(self) -> JResult<Local<'e>> {
        match self {
            Value::Object(obj) => Ok(obj.into_local()),
            Value::String(s) => Ok(s.into_local()),
            Value::Array(a) => Ok(a.into_local()),
            Value::Untyped(local) => Ok(local),
            other => Err(other.mismatch("reference")),
        }
    }

    fn type_name(&self) -> &'static str {
        match self {
            Value::Void => "void",
            Value::Null => "null",
            Value::Primitive(v) => v.type_name(),
            Value::Object(_) => "object",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Untyped(_) => "untyped reference",
        }
    }

    fn mismatch(&self, expected: &str) -> JniError {
        JniError::TypeMismatch {
            expected: expected.to_lowercase(),
            got: self.type_name().to_string(),
        }
    }
}
