//! Overload selection against a namespace with custom loaders

use jbind_schema::{
    AmbiguityPolicy, ArgType, ClassDescriptor, ClassLoaderDescriptor, LoaderParent, Method, Namespace, Overload,
    OverloadSelector, PrimitiveKind, SelectionError, StringRepr, TypeDesc, OBJECT_CLASS,
};

fn host_and_plugin() -> Namespace {
    Namespace::builder()
        .class(
            ClassDescriptor::new("host/HostClass").method(Method::overloaded(
                "accept",
                vec![
                    Overload::new(TypeDesc::VOID, vec![TypeDesc::object("plugin/PluginClass")]),
                    Overload::new(TypeDesc::VOID, vec![TypeDesc::String]),
                    Overload::new(TypeDesc::VOID, vec![TypeDesc::INT]),
                ],
            )),
        )
        .class(ClassDescriptor::new("plugin/PluginClass"))
        .loader(ClassLoaderDescriptor::new("Plugin", LoaderParent::Null).supports("plugin/PluginClass"))
        .build()
        .unwrap()
}

#[test]
fn test_selection_is_deterministic() {
    let ns = host_and_plugin();
    let (idx, _) = ns.registry().class("host/HostClass").unwrap();
    let method = ns.registry().find_method(idx, "accept", false, 0).unwrap();
    let sel = OverloadSelector::new(&ns, method.declaring_name, AmbiguityPolicy::Reject);
    let args = [ArgType::String(StringRepr::Literal)];

    let first = sel.select("accept", &method.member.overloads, &args);
    for _ in 0..16 {
        assert_eq!(sel.select("accept", &method.member.overloads, &args), first);
    }
    assert_eq!(first, Ok(1));
}

#[test]
fn test_native_string_prefers_string_over_object() {
    let ns = host_and_plugin();
    let sel = OverloadSelector::new(&ns, "host/HostClass", AmbiguityPolicy::Reject);
    let overloads = vec![
        Overload::new(TypeDesc::VOID, vec![TypeDesc::object(OBJECT_CLASS)]),
        Overload::new(TypeDesc::VOID, vec![TypeDesc::String]),
    ];

    for repr in [StringRepr::Literal, StringRepr::Borrowed, StringRepr::Owned] {
        assert_eq!(sel.select("println", &overloads, &[ArgType::String(repr)]), Ok(1));
    }
    assert!(!sel.is_viable(&TypeDesc::object(OBJECT_CLASS), &ArgType::String(StringRepr::Literal)));

    // A string handle is a real object, so both overloads accept it
    assert!(matches!(
        sel.select("println", &overloads, &[ArgType::String(StringRepr::Handle)]),
        Err(SelectionError::Ambiguous { .. })
    ));
}

#[test]
fn test_plugin_object_needs_plugin_loader() {
    let ns = host_and_plugin();
    let plugin = ns.loader_id("Plugin").unwrap();
    let (idx, _) = ns.registry().class("host/HostClass").unwrap();
    let method = ns.registry().find_method(idx, "accept", false, 0).unwrap();
    let sel = OverloadSelector::new(&ns, method.declaring_name, AmbiguityPolicy::Reject);

    let good = [ArgType::Object {
        class: Some("plugin/PluginClass".to_string()),
        loader: plugin,
    }];
    assert_eq!(sel.select("accept", &method.member.overloads, &good), Ok(0));

    let wrong_loader = [ArgType::object("plugin/PluginClass")];
    assert!(matches!(
        sel.select("accept", &method.member.overloads, &wrong_loader),
        Err(SelectionError::NoViableOverload { .. })
    ));
}

#[test]
fn test_untyped_object_with_single_object_overload() {
    let ns = host_and_plugin();
    let (idx, _) = ns.registry().class("host/HostClass").unwrap();
    let method = ns.registry().find_method(idx, "accept", false, 0).unwrap();
    let sel = OverloadSelector::new(&ns, method.declaring_name, AmbiguityPolicy::Reject);
    assert_eq!(sel.select("accept", &method.member.overloads, &[ArgType::UNTYPED]), Ok(0));
    assert_eq!(
        sel.select(
            "accept",
            &method.member.overloads,
            &[ArgType::Primitive(PrimitiveKind::Int)]
        ),
        Ok(2)
    );
}
