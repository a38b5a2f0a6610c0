//! Recording fake runtime for jbind tests
//!
//! [`FakeVm`] implements [`RawVm`] and hands out [`FakeEnv`]s that implement
//! [`RawEnv`] over one shared [`FakeState`]. The fake keeps a real object
//! heap with separate local and global reference tables, counts every
//! operation, and flags reference misuse (double release, releasing a local
//! as a global, using a released reference) as violations instead of
//! crashing.
//!
//! Method bodies are supplied with [`FakeVm::on_call`]. Two runtime methods
//! are built in: `ClassLoader.loadClass(String)` and `Class.getClassLoader()`.
//! Classes handed to [`FakeVm::define_loader`] can only be loaded through
//! that loader; `find_class` refuses them.

#![warn(missing_docs)]

pub mod fixtures;

use jbind_schema::PrimitiveKind;
use jbind_sdk::{FieldId, JResult, JValue, JniError, MethodId, RawEnv, RawObject, RawVm, ReleaseMode, ReturnKind};
use parking_lot::{Mutex, MutexGuard};
use rustc_hash::{FxHashMap, FxHashSet};
use std::rc::Rc;
use std::sync::Arc;
use std::thread::{self, ThreadId};

/// Identity of an object on the fake heap (not a reference)
pub type ObjId = u64;

/// Counted runtime operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    /// `find_class`
    FindClass,
    /// `get_object_class`
    GetObjectClass,
    /// `new_local_ref`
    NewLocalRef,
    /// `delete_local_ref`
    DeleteLocalRef,
    /// `new_global_ref`
    NewGlobalRef,
    /// `delete_global_ref`
    DeleteGlobalRef,
    /// `get_method_id`
    GetMethodId,
    /// `get_field_id`
    GetFieldId,
    /// `new_object`
    NewObject,
    /// `call_method`
    CallMethod,
    /// `call_static_method`
    CallStaticMethod,
    /// Instance or static field read
    GetField,
    /// Instance or static field write
    SetField,
    /// `new_string_utf`
    NewString,
    /// `get_string_utf`
    GetString,
    /// Primitive or object array creation
    NewArray,
    /// Region copy in either direction
    ArrayRegion,
    /// `pin_array`
    PinArray,
    /// `unpin_array`
    UnpinArray,
    /// `throw_new`
    ThrowNew,
    /// `attach_current_thread`
    Attach,
    /// `detach_current_thread`
    Detach,
}

/// An object on the fake heap
#[derive(Debug, Clone)]
pub enum FakeObject {
    /// Class object, defined by the system loader (`None`) or a loader object
    Class {
        /// Binary name
        name: String,
        /// Defining loader
        loader: Option<ObjId>,
        /// Static field values
        statics: FxHashMap<String, JValue>,
    },
    /// Plain instance
    Instance {
        /// Class object
        class: ObjId,
        /// Field values
        fields: FxHashMap<String, JValue>,
    },
    /// String
    Str(String),
    /// Array; object elements are stored as object ids
    Array(Vec<JValue>),
    /// Class loader that defines `classes`
    Loader {
        /// Display name
        name: String,
        /// Binary names this loader defines
        classes: FxHashSet<String>,
    },
    /// Raised exception
    Throwable {
        /// Exception class
        class: String,
        /// Message
        message: String,
    },
}

#[derive(Debug, Clone, Copy)]
struct RefEntry {
    obj: ObjId,
    global: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct MemberEntry {
    class: String,
    name: String,
    signature: String,
    is_static: bool,
}

/// One recorded method or constructor invocation
#[derive(Debug, Clone)]
pub struct Call {
    /// Class the method id was looked up on
    pub class: String,
    /// Method name (`<init>` for constructors)
    pub name: String,
    /// Signature the method id was looked up with
    pub signature: String,
    /// Receiver, `None` for static calls
    pub this: Option<ObjId>,
    /// Arguments as passed (object arguments are references)
    pub args: Vec<JValue>,
}

/// Body of a fake method. Returned objects must be local references, e.g.
/// from [`FakeState::new_string`] or [`FakeState::new_local`].
pub type Handler = Arc<dyn Fn(&mut FakeState, &Call) -> JValue + Send + Sync>;

/// Shared state of a fake runtime
#[derive(Default)]
pub struct FakeState {
    objects: FxHashMap<ObjId, FakeObject>,
    refs: FxHashMap<u64, RefEntry>,
    next_obj: u64,
    next_ref: u64,
    classes: FxHashMap<(String, Option<ObjId>), ObjId>,
    hidden: FxHashSet<String>,
    methods: Vec<MemberEntry>,
    fields: Vec<MemberEntry>,
    missing: FxHashSet<(String, String)>,
    handlers: FxHashMap<(String, String), Handler>,
    calls: Vec<Call>,
    ops: FxHashMap<Op, usize>,
    violations: Vec<String>,
    pending: Option<ObjId>,
    attached: FxHashSet<ThreadId>,
    refuse_attach: bool,
    unpinned: Vec<ReleaseMode>,
}

impl FakeState {
    // ========================================================================
    // Heap and references
    // ========================================================================

    fn bump(&mut self, op: Op) {
        *self.ops.entry(op).or_insert(0) += 1;
    }

    fn alloc(&mut self, object: FakeObject) -> ObjId {
        self.next_obj += 1;
        self.objects.insert(self.next_obj, object);
        self.next_obj
    }

    fn new_ref(&mut self, obj: ObjId, global: bool) -> RawObject {
        self.next_ref += 1;
        self.refs.insert(self.next_ref, RefEntry { obj, global });
        RawObject(self.next_ref)
    }

    fn deref(&mut self, raw: RawObject) -> JResult<ObjId> {
        if raw.is_null() {
            return Err(JniError::NullReference("null reference passed to runtime".to_string()));
        }
        match self.refs.get(&raw.0) {
            Some(entry) => Ok(entry.obj),
            None => {
                self.violations.push(format!("use of invalid reference {}", raw.0));
                Err(JniError::NullReference(format!("invalid reference {}", raw.0)))
            }
        }
    }

    fn delete(&mut self, raw: RawObject, global: bool) {
        if raw.is_null() {
            return;
        }
        match self.refs.get(&raw.0).map(|entry| entry.global) {
            Some(kind) if kind == global => {
                self.refs.remove(&raw.0);
            }
            Some(_) => self
                .violations
                .push(format!("reference {} released with the wrong kind", raw.0)),
            None => self.violations.push(format!("reference {} released twice", raw.0)),
        }
    }

    fn class_obj(&mut self, name: &str, loader: Option<ObjId>) -> ObjId {
        let key = (name.to_string(), loader);
        if let Some(id) = self.classes.get(&key) {
            return *id;
        }
        let id = self.alloc(FakeObject::Class {
            name: name.to_string(),
            loader,
            statics: FxHashMap::default(),
        });
        self.classes.insert(key, id);
        id
    }

    fn class_name(&mut self, class: RawObject) -> JResult<String> {
        let id = self.deref(class)?;
        match self.objects.get(&id) {
            Some(FakeObject::Class { name, .. }) => Ok(name.clone()),
            _ => Err(JniError::TypeMismatch {
                expected: "class".to_string(),
                got: "object".to_string(),
            }),
        }
    }

    /// Convert a call-form value (object = reference) to its stored form
    /// (object = object id)
    fn to_stored(&mut self, value: JValue) -> JValue {
        match value {
            JValue::Object(raw) if !raw.is_null() => match self.deref(raw) {
                Ok(id) => JValue::Object(RawObject(id)),
                Err(_) => JValue::Object(RawObject::NULL),
            },
            other => other,
        }
    }

    /// Convert a stored value to call form, creating a local reference
    fn from_stored(&mut self, value: JValue) -> JValue {
        match value {
            JValue::Object(id) if !id.is_null() => JValue::Object(self.new_ref(id.0, false)),
            other => other,
        }
    }

    fn array(&mut self, raw: RawObject) -> JResult<&mut Vec<JValue>> {
        let id = self.deref(raw)?;
        match self.objects.get_mut(&id) {
            Some(FakeObject::Array(values)) => Ok(values),
            _ => Err(JniError::TypeMismatch {
                expected: "array".to_string(),
                got: "object".to_string(),
            }),
        }
    }

    fn zero(ret: ReturnKind) -> JValue {
        match ret {
            ReturnKind::Primitive(kind) => JValue::zero(kind),
            ReturnKind::Object => JValue::Object(RawObject::NULL),
        }
    }

    // ========================================================================
    // Helpers for method bodies
    // ========================================================================

    /// Object a reference points to
    pub fn object(&self, raw: RawObject) -> Option<&FakeObject> {
        let entry = self.refs.get(&raw.0)?;
        self.objects.get(&entry.obj)
    }

    /// Field of an instance, in stored form
    pub fn field(&self, obj: ObjId, name: &str) -> Option<JValue> {
        match self.objects.get(&obj) {
            Some(FakeObject::Instance { fields, .. }) => fields.get(name).copied(),
            _ => None,
        }
    }

    /// Integer field of an instance, zero when unset
    pub fn int_field(&self, obj: ObjId, name: &str) -> i32 {
        match self.field(obj, name) {
            Some(JValue::Int(v)) => v,
            _ => 0,
        }
    }

    /// Set a field of an instance from a call-form value
    pub fn set_field(&mut self, obj: ObjId, name: &str, value: JValue) {
        let value = self.to_stored(value);
        if let Some(FakeObject::Instance { fields, .. }) = self.objects.get_mut(&obj) {
            fields.insert(name.to_string(), value);
        }
    }

    /// Contents of a string argument
    pub fn string(&self, value: JValue) -> Option<String> {
        match self.object(value.as_object()?)? {
            FakeObject::Str(s) => Some(s.clone()),
            _ => None,
        }
    }

    /// Create a string and return a local reference to it
    pub fn new_string(&mut self, s: &str) -> JValue {
        let id = self.alloc(FakeObject::Str(s.to_string()));
        JValue::Object(self.new_ref(id, false))
    }

    /// New local reference to an object
    pub fn new_local(&mut self, obj: ObjId) -> JValue {
        JValue::Object(self.new_ref(obj, false))
    }

    /// Create an instance of `class` (system loader) without running a
    /// constructor
    pub fn new_instance(&mut self, class: &str) -> ObjId {
        let class = self.class_obj(class, None);
        self.alloc(FakeObject::Instance {
            class,
            fields: FxHashMap::default(),
        })
    }

    /// Create an array and return a local reference to it
    pub fn new_array(&mut self, values: Vec<JValue>) -> JValue {
        let id = self.alloc(FakeObject::Array(values));
        self.new_local(id)
    }

    /// Raise an exception
    pub fn throw(&mut self, class: &str, message: &str) {
        let id = self.alloc(FakeObject::Throwable {
            class: class.to_string(),
            message: message.to_string(),
        });
        self.pending = Some(id);
    }

    /// Name and defining loader name of an instance's class
    pub fn class_of(&self, obj: ObjId) -> Option<(String, Option<String>)> {
        let class = match self.objects.get(&obj)? {
            FakeObject::Instance { class, .. } => *class,
            _ => return None,
        };
        match self.objects.get(&class)? {
            FakeObject::Class { name, loader, .. } => {
                let loader = loader.and_then(|l| match self.objects.get(&l) {
                    Some(FakeObject::Loader { name, .. }) => Some(name.clone()),
                    _ => None,
                });
                Some((name.clone(), loader))
            }
            _ => None,
        }
    }

    // ========================================================================
    // Statistics
    // ========================================================================

    /// Number of times `op` ran
    pub fn count(&self, op: Op) -> usize {
        self.ops.get(&op).copied().unwrap_or(0)
    }

    /// Live local references
    pub fn live_locals(&self) -> usize {
        self.refs.values().filter(|r| !r.global).count()
    }

    /// Live global references
    pub fn live_globals(&self) -> usize {
        self.refs.values().filter(|r| r.global).count()
    }

    /// Recorded reference misuse
    pub fn violations(&self) -> &[String] {
        &self.violations
    }

    /// Every recorded invocation
    pub fn calls(&self) -> &[Call] {
        &self.calls
    }

    /// Number of invocations of methods named `name`
    pub fn calls_to(&self, name: &str) -> usize {
        self.calls.iter().filter(|c| c.name == name).count()
    }

    /// Release modes of every unpinned array, in order
    pub fn unpinned(&self) -> &[ReleaseMode] {
        &self.unpinned
    }

    /// Check whether an exception is pending
    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    // ========================================================================
    // Invocation
    // ========================================================================

    fn dispatch(&mut self, method: MethodId, this: Option<ObjId>, args: &[JValue], ret: ReturnKind) -> JResult<JValue> {
        let entry = self
            .methods
            .get((method.0 as usize).wrapping_sub(1))
            .cloned()
            .ok_or_else(|| JniError::Runtime(format!("invalid method id {}", method.0)))?;
        let call = Call {
            class: entry.class.clone(),
            name: entry.name.clone(),
            signature: entry.signature.clone(),
            this,
            args: args.to_vec(),
        };
        self.calls.push(call.clone());

        match (entry.class.as_str(), entry.name.as_str(), this) {
            ("java/lang/ClassLoader", "loadClass", Some(loader)) => return Ok(self.load_class(loader, args)),
            ("java/lang/Class", "getClassLoader", Some(class)) => return Ok(self.class_loader(class)),
            _ => {}
        }

        let handler = self.handlers.get(&(entry.class.clone(), entry.name.clone())).cloned();
        Ok(match handler {
            Some(handler) => handler(self, &call),
            None => Self::zero(ret),
        })
    }

    fn load_class(&mut self, loader: ObjId, args: &[JValue]) -> JValue {
        let Some(name) = args.first().and_then(|a| self.string(*a)) else {
            self.throw("java/lang/NullPointerException", "loadClass(null)");
            return JValue::Object(RawObject::NULL);
        };
        let name = name.replace('.', "/");
        let defines = matches!(self.objects.get(&loader), Some(FakeObject::Loader { classes, .. }) if classes.contains(&name));
        let id = if defines {
            self.class_obj(&name, Some(loader))
        } else if self.hidden.contains(&name) {
            self.throw("java/lang/ClassNotFoundException", &name);
            return JValue::Object(RawObject::NULL);
        } else {
            self.class_obj(&name, None)
        };
        self.new_local(id)
    }

    fn class_loader(&mut self, class: ObjId) -> JValue {
        match self.objects.get(&class) {
            Some(FakeObject::Class {
                loader: Some(loader), ..
            }) => {
                let loader = *loader;
                self.new_local(loader)
            }
            _ => JValue::Object(RawObject::NULL),
        }
    }
}

// ============================================================================
// FakeVm
// ============================================================================

/// Fake process-wide runtime handle
pub struct FakeVm {
    state: Arc<Mutex<FakeState>>,
}

impl FakeVm {
    /// Create a runtime with no threads attached
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Arc::new(Mutex::new(FakeState::default())),
        })
    }

    /// Lock the shared state.
    ///
    /// Do not drop binding handles while holding the guard: releasing a
    /// reference locks the state again.
    pub fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock()
    }

    /// Environment for the current thread, whether attached or not
    pub fn env(&self) -> Rc<dyn RawEnv> {
        Rc::new(FakeEnv {
            state: Arc::clone(&self.state),
        })
    }

    /// Supply the body of `class.name` (use `<init>` for constructors)
    pub fn on_call(&self, class: &str, name: &str, handler: impl Fn(&mut FakeState, &Call) -> JValue + Send + Sync + 'static) {
        self.state
            .lock()
            .handlers
            .insert((class.to_string(), name.to_string()), Arc::new(handler));
    }

    /// Create a class loader object defining `classes` and return a global
    /// reference to it owned by the caller
    pub fn define_loader(&self, name: &str, classes: &[&str]) -> RawObject {
        let mut state = self.state.lock();
        for class in classes {
            state.hidden.insert(class.to_string());
        }
        let id = state.alloc(FakeObject::Loader {
            name: name.to_string(),
            classes: classes.iter().map(|c| c.to_string()).collect(),
        });
        state.new_ref(id, true)
    }

    /// Create an instance of `class` as defined by `loader` and return a
    /// global reference to it
    pub fn new_loaded_instance(&self, loader: RawObject, class: &str) -> RawObject {
        let mut state = self.state.lock();
        let loader = state.refs.get(&loader.0).map(|entry| entry.obj);
        let class = state.class_obj(class, loader);
        let obj = state.alloc(FakeObject::Instance {
            class,
            fields: FxHashMap::default(),
        });
        state.new_ref(obj, true)
    }

    /// Release a reference returned by [`FakeVm::define_loader`]
    pub fn release_global(&self, raw: RawObject) {
        self.state.lock().delete(raw, true);
    }

    /// Make method or field lookups of `class.name` fail
    pub fn remove_member(&self, class: &str, name: &str) {
        self.state.lock().missing.insert((class.to_string(), name.to_string()));
    }

    /// Mark the current thread as attached by the runtime itself
    pub fn attach_externally(&self) {
        self.state.lock().attached.insert(thread::current().id());
    }

    /// Make every later attach request fail
    pub fn refuse_attach(&self) {
        self.state.lock().refuse_attach = true;
    }

    /// Check whether the current thread is attached
    pub fn is_attached(&self) -> bool {
        self.state.lock().attached.contains(&thread::current().id())
    }

    /// Number of times `op` ran
    pub fn count(&self, op: Op) -> usize {
        self.state.lock().count(op)
    }

    /// Live local references
    pub fn live_locals(&self) -> usize {
        self.state.lock().live_locals()
    }

    /// Live global references
    pub fn live_globals(&self) -> usize {
        self.state.lock().live_globals()
    }

    /// Recorded reference misuse
    pub fn violations(&self) -> Vec<String> {
        self.state.lock().violations.clone()
    }

    /// Number of invocations of methods named `name`
    pub fn calls_to(&self, name: &str) -> usize {
        self.state.lock().calls_to(name)
    }
}

impl RawVm for FakeVm {
    fn get_env(&self) -> Option<Rc<dyn RawEnv>> {
        if self.is_attached() {
            Some(self.env())
        } else {
            None
        }
    }

    fn attach_current_thread(&self) -> JResult<Rc<dyn RawEnv>> {
        {
            let mut state = self.state.lock();
            state.bump(Op::Attach);
            if state.refuse_attach {
                return Err("thread limit reached".into());
            }
            state.attached.insert(thread::current().id());
        }
        Ok(self.env())
    }

    fn detach_current_thread(&self) -> JResult<()> {
        let mut state = self.state.lock();
        state.bump(Op::Detach);
        if state.attached.remove(&thread::current().id()) {
            Ok(())
        } else {
            Err(JniError::NotAttached)
        }
    }
}

// ============================================================================
// FakeEnv
// ============================================================================

/// Fake per-thread environment
pub struct FakeEnv {
    state: Arc<Mutex<FakeState>>,
}

impl RawEnv for FakeEnv {
    fn find_class(&self, name: &str) -> JResult<RawObject> {
        let mut s = self.state.lock();
        s.bump(Op::FindClass);
        if s.hidden.contains(name) {
            return Err(JniError::ClassNotFound(name.to_string()));
        }
        let id = s.class_obj(name, None);
        Ok(s.new_ref(id, false))
    }

    fn get_object_class(&self, obj: RawObject) -> JResult<RawObject> {
        let mut s = self.state.lock();
        s.bump(Op::GetObjectClass);
        let id = s.deref(obj)?;
        let class = match s.objects.get(&id).cloned() {
            Some(FakeObject::Instance { class, .. }) => class,
            Some(FakeObject::Str(_)) => s.class_obj("java/lang/String", None),
            Some(FakeObject::Class { .. }) => s.class_obj("java/lang/Class", None),
            Some(FakeObject::Loader { .. }) => s.class_obj("java/lang/ClassLoader", None),
            Some(FakeObject::Throwable { class, .. }) => s.class_obj(&class, None),
            Some(FakeObject::Array(_)) | None => s.class_obj("java/lang/Object", None),
        };
        Ok(s.new_ref(class, false))
    }

    fn new_local_ref(&self, obj: RawObject) -> RawObject {
        let mut s = self.state.lock();
        s.bump(Op::NewLocalRef);
        match s.deref(obj) {
            Ok(id) => s.new_ref(id, false),
            Err(_) => RawObject::NULL,
        }
    }

    fn delete_local_ref(&self, obj: RawObject) {
        let mut s = self.state.lock();
        s.bump(Op::DeleteLocalRef);
        s.delete(obj, false);
    }

    fn new_global_ref(&self, obj: RawObject) -> RawObject {
        let mut s = self.state.lock();
        s.bump(Op::NewGlobalRef);
        match s.deref(obj) {
            Ok(id) => s.new_ref(id, true),
            Err(_) => RawObject::NULL,
        }
    }

    fn delete_global_ref(&self, obj: RawObject) {
        let mut s = self.state.lock();
        s.bump(Op::DeleteGlobalRef);
        s.delete(obj, true);
    }

    fn is_same_object(&self, a: RawObject, b: RawObject) -> bool {
        let s = self.state.lock();
        let target = |raw: RawObject| s.refs.get(&raw.0).map(|e| e.obj);
        target(a) == target(b)
    }

    fn get_method_id(&self, class: RawObject, name: &str, signature: &str, is_static: bool) -> JResult<MethodId> {
        let mut s = self.state.lock();
        s.bump(Op::GetMethodId);
        let class = s.class_name(class)?;
        if s.missing.contains(&(class.clone(), name.to_string())) {
            return Err(JniError::MethodNotFound {
                class,
                name: name.to_string(),
                signature: signature.to_string(),
            });
        }
        let entry = MemberEntry {
            class,
            name: name.to_string(),
            signature: signature.to_string(),
            is_static,
        };
        let index = match s.methods.iter().position(|m| *m == entry) {
            Some(index) => index,
            None => {
                s.methods.push(entry);
                s.methods.len() - 1
            }
        };
        Ok(MethodId(index as u64 + 1))
    }

    fn get_field_id(&self, class: RawObject, name: &str, signature: &str, is_static: bool) -> JResult<FieldId> {
        let mut s = self.state.lock();
        s.bump(Op::GetFieldId);
        let class = s.class_name(class)?;
        if s.missing.contains(&(class.clone(), name.to_string())) {
            return Err(JniError::FieldNotFound {
                class,
                name: name.to_string(),
                signature: signature.to_string(),
            });
        }
        let entry = MemberEntry {
            class,
            name: name.to_string(),
            signature: signature.to_string(),
            is_static,
        };
        let index = match s.fields.iter().position(|f| *f == entry) {
            Some(index) => index,
            None => {
                s.fields.push(entry);
                s.fields.len() - 1
            }
        };
        Ok(FieldId(index as u64 + 1))
    }

    fn new_object(&self, class: RawObject, ctor: MethodId, args: &[JValue]) -> JResult<RawObject> {
        let mut s = self.state.lock();
        s.bump(Op::NewObject);
        let class = s.deref(class)?;
        let obj = s.alloc(FakeObject::Instance {
            class,
            fields: FxHashMap::default(),
        });
        s.dispatch(ctor, Some(obj), args, ReturnKind::Primitive(PrimitiveKind::Void))?;
        Ok(s.new_ref(obj, false))
    }

    fn call_method(&self, obj: RawObject, method: MethodId, ret: ReturnKind, args: &[JValue]) -> JResult<JValue> {
        let mut s = self.state.lock();
        s.bump(Op::CallMethod);
        let this = s.deref(obj)?;
        s.dispatch(method, Some(this), args, ret)
    }

    fn call_static_method(&self, class: RawObject, method: MethodId, ret: ReturnKind, args: &[JValue]) -> JResult<JValue> {
        let mut s = self.state.lock();
        s.bump(Op::CallStaticMethod);
        s.deref(class)?;
        s.dispatch(method, None, args, ret)
    }

    fn get_field(&self, obj: RawObject, field: FieldId, kind: ReturnKind) -> JResult<JValue> {
        let mut s = self.state.lock();
        s.bump(Op::GetField);
        let id = s.deref(obj)?;
        let name = field_name(&s, field)?;
        let stored = s.field(id, &name).unwrap_or(FakeState::zero(kind));
        Ok(s.from_stored(stored))
    }

    fn set_field(&self, obj: RawObject, field: FieldId, value: JValue) -> JResult<()> {
        let mut s = self.state.lock();
        s.bump(Op::SetField);
        let id = s.deref(obj)?;
        let name = field_name(&s, field)?;
        s.set_field(id, &name, value);
        Ok(())
    }

    fn get_static_field(&self, class: RawObject, field: FieldId, kind: ReturnKind) -> JResult<JValue> {
        let mut s = self.state.lock();
        s.bump(Op::GetField);
        let id = s.deref(class)?;
        let name = field_name(&s, field)?;
        let stored = match s.objects.get(&id) {
            Some(FakeObject::Class { statics, .. }) => statics.get(&name).copied(),
            _ => None,
        };
        let stored = stored.unwrap_or(FakeState::zero(kind));
        Ok(s.from_stored(stored))
    }

    fn set_static_field(&self, class: RawObject, field: FieldId, value: JValue) -> JResult<()> {
        let mut s = self.state.lock();
        s.bump(Op::SetField);
        let id = s.deref(class)?;
        let name = field_name(&s, field)?;
        let value = s.to_stored(value);
        if let Some(FakeObject::Class { statics, .. }) = s.objects.get_mut(&id) {
            statics.insert(name, value);
        }
        Ok(())
    }

    fn new_string_utf(&self, value: &str) -> JResult<RawObject> {
        let mut s = self.state.lock();
        s.bump(Op::NewString);
        let id = s.alloc(FakeObject::Str(value.to_string()));
        Ok(s.new_ref(id, false))
    }

    fn get_string_utf(&self, string: RawObject) -> JResult<String> {
        let mut s = self.state.lock();
        s.bump(Op::GetString);
        let id = s.deref(string)?;
        match s.objects.get(&id) {
            Some(FakeObject::Str(value)) => Ok(value.clone()),
            _ => Err(JniError::TypeMismatch {
                expected: "string".to_string(),
                got: "object".to_string(),
            }),
        }
    }

    fn new_primitive_array(&self, kind: PrimitiveKind, len: usize) -> JResult<RawObject> {
        let mut s = self.state.lock();
        s.bump(Op::NewArray);
        let id = s.alloc(FakeObject::Array(vec![JValue::zero(kind); len]));
        Ok(s.new_ref(id, false))
    }

    fn new_object_array(&self, len: usize, element_class: RawObject, init: RawObject) -> JResult<RawObject> {
        let mut s = self.state.lock();
        s.bump(Op::NewArray);
        s.deref(element_class)?;
        let init = s.to_stored(JValue::Object(init));
        let id = s.alloc(FakeObject::Array(vec![init; len]));
        Ok(s.new_ref(id, false))
    }

    fn array_length(&self, array: RawObject) -> JResult<usize> {
        let mut s = self.state.lock();
        Ok(s.array(array)?.len())
    }

    fn get_object_array_element(&self, array: RawObject, index: usize) -> JResult<RawObject> {
        let mut s = self.state.lock();
        let values = s.array(array)?;
        let len = values.len();
        let stored = *values.get(index).ok_or(JniError::IndexOutOfBounds { index, len })?;
        match s.from_stored(stored) {
            JValue::Object(raw) => Ok(raw),
            other => Err(JniError::TypeMismatch {
                expected: "object".to_string(),
                got: other.type_name().to_string(),
            }),
        }
    }

    fn set_object_array_element(&self, array: RawObject, index: usize, value: RawObject) -> JResult<()> {
        let mut s = self.state.lock();
        let stored = s.to_stored(JValue::Object(value));
        let values = s.array(array)?;
        let len = values.len();
        let slot = values.get_mut(index).ok_or(JniError::IndexOutOfBounds { index, len })?;
        *slot = stored;
        Ok(())
    }

    fn get_array_region(&self, array: RawObject, start: usize, len: usize) -> JResult<Vec<JValue>> {
        let mut s = self.state.lock();
        s.bump(Op::ArrayRegion);
        let values = s.array(array)?;
        let total = values.len();
        values
            .get(start..start + len)
            .map(|region| region.to_vec())
            .ok_or(JniError::IndexOutOfBounds { index: start + len, len: total })
    }

    fn set_array_region(&self, array: RawObject, start: usize, region: &[JValue]) -> JResult<()> {
        let mut s = self.state.lock();
        s.bump(Op::ArrayRegion);
        let values = s.array(array)?;
        let total = values.len();
        let target = values
            .get_mut(start..start + region.len())
            .ok_or(JniError::IndexOutOfBounds {
                index: start + region.len(),
                len: total,
            })?;
        target.copy_from_slice(region);
        Ok(())
    }

    fn pin_array(&self, array: RawObject) -> JResult<Vec<JValue>> {
        let mut s = self.state.lock();
        s.bump(Op::PinArray);
        Ok(s.array(array)?.clone())
    }

    fn unpin_array(&self, array: RawObject, values: &[JValue], mode: ReleaseMode) {
        let mut s = self.state.lock();
        s.bump(Op::UnpinArray);
        s.unpinned.push(mode);
        if mode == ReleaseMode::Commit {
            if let Ok(target) = s.array(array) {
                let n = target.len().min(values.len());
                target[..n].copy_from_slice(&values[..n]);
            }
        }
    }

    fn throw_new(&self, class: RawObject, message: &str) -> JResult<()> {
        let mut s = self.state.lock();
        s.bump(Op::ThrowNew);
        let class = s.class_name(class)?;
        s.throw(&class, message);
        Ok(())
    }

    fn exception_check(&self) -> bool {
        self.state.lock().pending.is_some()
    }

    fn exception_occurred(&self) -> RawObject {
        let mut s = self.state.lock();
        let pending = s.pending;
        match pending {
            Some(id) => s.new_ref(id, false),
            None => RawObject::NULL,
        }
    }

    fn exception_clear(&self) {
        self.state.lock().pending = None;
    }
}

fn field_name(state: &FakeState, field: FieldId) -> JResult<String> {
    state
        .fields
        .get((field.0 as usize).wrapping_sub(1))
        .map(|f| f.name.clone())
        .ok_or_else(|| JniError::Runtime(format!("invalid field id {}", field.0)))
}
