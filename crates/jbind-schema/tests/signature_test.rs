//! Signature synthesis over a declared namespace

use jbind_schema::signature::{constructor_signature, method_signature, type_signature};
use jbind_schema::{ClassDescriptor, Field, Method, Namespace, Overload, TypeDesc};

fn shapes() -> Namespace {
    Namespace::builder()
        .class(
            ClassDescriptor::new("geo/Shape")
                .constructor(Overload::constructor(vec![]))
                .method(Method::new("copy", TypeDesc::SelfRef, vec![]))
                .method(Method::new("area", TypeDesc::INT, vec![])),
        )
        .class(
            ClassDescriptor::new("geo/Circle")
                .extends("geo/Shape")
                .constructor(Overload::constructor(vec![]))
                .constructor(Overload::constructor(vec![TypeDesc::DOUBLE]))
                .constructor(Overload::constructor(vec![TypeDesc::DOUBLE, TypeDesc::DOUBLE]))
                .method(Method::new("area", TypeDesc::DOUBLE, vec![]))
                .field(Field::new("center", TypeDesc::object("geo/Point"))),
        )
        .class(ClassDescriptor::new("geo/Point"))
        .build()
        .unwrap()
}

#[test]
fn test_array_rank_prefixes() {
    for rank in 1..=3u8 {
        let ints = TypeDesc::array(TypeDesc::INT, rank);
        let foos = TypeDesc::array(TypeDesc::object("Foo"), rank);
        let markers = "[".repeat(rank as usize);
        assert_eq!(type_signature(&ints, "X"), format!("{}I", markers));
        assert_eq!(type_signature(&foos, "X"), format!("{}LFoo;", markers));
    }
}

#[test]
fn test_constructor_signatures_unique() {
    let ns = shapes();
    let (idx, _) = ns.registry().class("geo/Circle").unwrap();
    let ctors = ns.registry().constructors(idx).unwrap();
    let mut sigs: Vec<String> = ctors
        .iter()
        .map(|c| constructor_signature(&c.params, "geo/Circle"))
        .collect();
    assert_eq!(sigs, vec!["()V", "(D)V", "(DD)V"]);
    sigs.dedup();
    assert_eq!(sigs.len(), ctors.len());
}

#[test]
fn test_shadowed_member_by_depth() {
    let ns = shapes();
    let reg = ns.registry();
    let (circle, _) = reg.class("geo/Circle").unwrap();

    let own = reg.find_method(circle, "area", false, 0).unwrap();
    assert_eq!(method_signature(&own.member.overloads[0], own.declaring_name), "()D");

    let inherited = reg.find_method(circle, "area", false, 1).unwrap();
    assert_eq!(
        method_signature(&inherited.member.overloads[0], inherited.declaring_name),
        "()I"
    );
}

#[test]
fn test_inherited_self_keeps_declaring_class() {
    let ns = shapes();
    let reg = ns.registry();
    let (circle, _) = reg.class("geo/Circle").unwrap();
    let copy = reg.find_method(circle, "copy", false, 0).unwrap();
    assert_eq!(copy.depth, 1);
    assert_eq!(
        method_signature(&copy.member.overloads[0], copy.declaring_name),
        "()Lgeo/Shape;"
    );
}

#[test]
fn test_forward_declared_field_type() {
    let ns = shapes();
    let reg = ns.registry();
    let (circle, _) = reg.class("geo/Circle").unwrap();
    let center = reg.find_field(circle, "center", false, 0).unwrap();
    assert_eq!(type_signature(&center.member.ty, center.declaring_name), "Lgeo/Point;");
}
