//! Ready-made schemas and method bodies shared by the integration tests

use crate::{FakeState, FakeVm};
use jbind_schema::{
    ClassDescriptor, ClassLoaderDescriptor, Field, LoaderParent, Method, Namespace, Overload, SchemaError, TypeDesc,
};
use jbind_sdk::{JValue, RawObject};

/// `demo/Counter`, a small class exercising every member kind, plus
/// `demo/Other` as an unrelated parameter type
pub fn counter_namespace() -> Result<Namespace, SchemaError> {
    Namespace::builder()
        .class(
            ClassDescriptor::new("demo/Counter")
                .constructor(Overload::constructor(vec![]))
                .constructor(Overload::constructor(vec![TypeDesc::INT]))
                .method(Method::new("increment", TypeDesc::INT, vec![]))
                .method(Method::overloaded(
                    "add",
                    vec![
                        Overload::new(TypeDesc::INT, vec![TypeDesc::INT]),
                        Overload::new(TypeDesc::LONG, vec![TypeDesc::LONG]),
                    ],
                ))
                .method(Method::new("label", TypeDesc::String, vec![TypeDesc::String]))
                .method(Method::new("copy", TypeDesc::SelfRef, vec![]))
                .method(Method::new("digits", TypeDesc::array(TypeDesc::INT, 1), vec![]))
                .method(Method::new("sum", TypeDesc::INT, vec![TypeDesc::array(TypeDesc::INT, 1)]))
                .method(Method::overloaded(
                    "link",
                    vec![
                        Overload::new(TypeDesc::VOID, vec![TypeDesc::object("demo/Counter")]),
                        Overload::new(TypeDesc::VOID, vec![TypeDesc::object("demo/Other")]),
                    ],
                ))
                .method(Method::new("fail", TypeDesc::String, vec![]))
                .field(Field::new("count", TypeDesc::INT))
                .static_method(Method::new("create", TypeDesc::SelfRef, vec![TypeDesc::INT]))
                .static_field(Field::new("instances", TypeDesc::INT)),
        )
        .class(ClassDescriptor::new("demo/Other").constructor(Overload::constructor(vec![])))
        .build()
}

fn int_arg(args: &[JValue]) -> i32 {
    match args.first() {
        Some(JValue::Int(v)) => *v,
        _ => 0,
    }
}

/// Install method bodies for `demo/Counter`
pub fn install_counter(vm: &FakeVm) {
    vm.on_call("demo/Counter", "<init>", |s, c| {
        if let Some(this) = c.this {
            s.set_field(this, "count", JValue::Int(int_arg(&c.args)));
        }
        JValue::Void
    });
    vm.on_call("demo/Counter", "increment", |s, c| {
        let this = c.this.unwrap_or_default();
        let next = s.int_field(this, "count") + 1;
        s.set_field(this, "count", JValue::Int(next));
        JValue::Int(next)
    });
    vm.on_call("demo/Counter", "add", |s, c| {
        let count = s.int_field(c.this.unwrap_or_default(), "count");
        match c.args.first() {
            Some(JValue::Long(v)) => JValue::Long(count as i64 + v),
            _ => JValue::Int(count + int_arg(&c.args)),
        }
    });
    vm.on_call("demo/Counter", "label", |s, c| {
        let prefix = c.args.first().and_then(|a| s.string(*a)).unwrap_or_default();
        let count = s.int_field(c.this.unwrap_or_default(), "count");
        s.new_string(&format!("{}:{}", prefix, count))
    });
    vm.on_call("demo/Counter", "copy", |s, c| {
        let count = s.int_field(c.this.unwrap_or_default(), "count");
        let copy = s.new_instance("demo/Counter");
        s.set_field(copy, "count", JValue::Int(count));
        s.new_local(copy)
    });
    vm.on_call("demo/Counter", "digits", |s, c| {
        let count = s.int_field(c.this.unwrap_or_default(), "count");
        let digits = count
            .to_string()
            .chars()
            .filter_map(|d| d.to_digit(10))
            .map(|d| JValue::Int(d as i32))
            .collect();
        s.new_array(digits)
    });
    vm.on_call("demo/Counter", "sum", |s, c| {
        let total = match c.args.first().and_then(|a| a.as_object()).and_then(|raw| s.object(raw)) {
            Some(crate::FakeObject::Array(values)) => values
                .iter()
                .map(|v| match v {
                    JValue::Int(i) => *i,
                    _ => 0,
                })
                .sum(),
            _ => -1,
        };
        JValue::Int(total)
    });
    vm.on_call("demo/Counter", "fail", |s, _| {
        let partial = s.new_string("partial");
        s.throw("java/lang/IllegalStateException", "counter failed");
        partial
    });
    vm.on_call("demo/Counter", "create", |s, c| {
        let obj = s.new_instance("demo/Counter");
        s.set_field(obj, "count", JValue::Int(int_arg(&c.args)));
        s.new_local(obj)
    });
}

/// Host class plus `plugin/Widget`, defined by the `Plugin` loader
pub fn plugin_namespace() -> Result<Namespace, SchemaError> {
    Namespace::builder()
        .class(ClassDescriptor::new("host/Host").static_method(Method::new(
            "describe",
            TypeDesc::String,
            vec![TypeDesc::object("plugin/Widget")],
        )))
        .class(
            ClassDescriptor::new("plugin/Widget")
                .constructor(Overload::constructor(vec![TypeDesc::String]))
                .method(Method::new("name", TypeDesc::String, vec![])),
        )
        .class(ClassDescriptor::new("other/Gadget").constructor(Overload::constructor(vec![])))
        .loader(ClassLoaderDescriptor::new("Plugin", LoaderParent::Null).supports("plugin/Widget"))
        .loader(ClassLoaderDescriptor::new("Other", LoaderParent::Null).supports("other/Gadget"))
        .build()
}

/// Install method bodies for `plugin/Widget` and `host/Host`
pub fn install_plugin(vm: &FakeVm) {
    vm.on_call("plugin/Widget", "<init>", |s, c| {
        if let (Some(this), Some(name)) = (c.this, c.args.first()) {
            s.set_field(this, "name", *name);
        }
        JValue::Void
    });
    vm.on_call("plugin/Widget", "name", |s, c| widget_name(s, c.this.unwrap_or_default()));
    vm.on_call("host/Host", "describe", |s, c| {
        let described = match c.args.first().and_then(|a| a.as_object()).and_then(|raw| s.object(raw)) {
            Some(crate::FakeObject::Instance { .. }) => "widget",
            _ => "nothing",
        };
        s.new_string(described)
    });
}

fn widget_name(s: &mut FakeState, this: u64) -> JValue {
    match s.field(this, "name") {
        Some(JValue::Object(id)) if !id.is_null() => s.new_local(id.0),
        _ => JValue::Object(RawObject::NULL),
    }
}
