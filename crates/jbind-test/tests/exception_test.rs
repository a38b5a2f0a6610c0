//! Foreign exceptions and runtime lookup failures

use jbind_sdk::{args, AsRaw, JValue, JniError, Jvm, JvmOptions};
use jbind_test::fixtures::{counter_namespace, install_counter};
use jbind_test::{FakeObject, FakeVm, Op};
use std::sync::Arc;

fn counter_jvm(options: JvmOptions) -> (Arc<FakeVm>, Jvm) {
    let vm = FakeVm::new();
    install_counter(&vm);
    let jvm = Jvm::with_options(vm.clone(), counter_namespace().unwrap(), options);
    (vm, jvm)
}

// ===== Pending exceptions =====

#[test]
fn test_pending_exception_becomes_error() {
    let (vm, jvm) = counter_jvm(JvmOptions::default());
    let guard = jvm.attach_current_thread().unwrap();
    let env = guard.env();
    let class = env.class("demo/Counter").unwrap();
    let counter = env.new_object(&class, &[]).unwrap();

    assert!(matches!(counter.call("fail", &[]), Err(JniError::PendingException)));
    // The string returned alongside the exception was released
    assert_eq!(vm.live_locals(), 1);
    assert!(env.exception_check());

    let thrown = env.exception_occurred().unwrap();
    let (thrown_class, message) = match vm.state().object(thrown.as_raw()) {
        Some(FakeObject::Throwable { class, message }) => (class.clone(), message.clone()),
        _ => panic!("expected a throwable"),
    };
    assert_eq!(thrown_class, "java/lang/IllegalStateException");
    assert_eq!(message, "counter failed");
    drop(thrown);

    env.exception_clear();
    assert!(!env.exception_check());
    assert!(env.exception_occurred().is_none());
    assert_eq!(counter.call("increment", &[]).unwrap().into_int().unwrap(), 1);
    assert_eq!(vm.live_locals(), 1);
    assert!(vm.violations().is_empty());
}

#[test]
fn test_throw_new_is_reported_by_next_call() {
    let (vm, jvm) = counter_jvm(JvmOptions::default());
    let guard = jvm.attach_current_thread().unwrap();
    let env = guard.env();
    let class = env.class("demo/Counter").unwrap();
    let counter = env.new_object(&class, &[]).unwrap();

    env.throw_new("java/lang/IllegalArgumentException", "bad input").unwrap();
    assert_eq!(vm.count(Op::ThrowNew), 1);
    assert!(env.exception_check());
    assert!(matches!(counter.call("increment", &[]), Err(JniError::PendingException)));

    env.exception_clear();
    assert_eq!(counter.call("increment", &[]).unwrap().into_int().unwrap(), 2);
}

#[test]
fn test_exception_in_constructor_releases_instance() {
    let (vm, jvm) = counter_jvm(JvmOptions::default());
    vm.on_call("demo/Other", "<init>", |s, _| {
        s.throw("java/lang/RuntimeException", "no");
        JValue::Void
    });
    let guard = jvm.attach_current_thread().unwrap();
    let env = guard.env();
    let class = env.class("demo/Other").unwrap();

    assert!(matches!(env.new_object(&class, &[]), Err(JniError::PendingException)));
    assert_eq!(vm.live_locals(), 0);
    env.exception_clear();
}

#[test]
fn test_unchecked_exceptions_are_left_to_the_caller() {
    let (_vm, jvm) = counter_jvm(JvmOptions::default().check_exceptions(false));
    let guard = jvm.attach_current_thread().unwrap();
    let env = guard.env();
    let class = env.class("demo/Counter").unwrap();
    let counter = env.new_object(&class, &[]).unwrap();

    let partial = counter.call("fail", &[]).unwrap().into_string().unwrap();
    assert_eq!(partial.value().unwrap(), "partial");
    assert!(env.exception_check());
    env.exception_clear();
}

// ===== Lookup failures =====

#[test]
fn test_missing_method_is_not_cached() {
    let (vm, jvm) = counter_jvm(JvmOptions::default());
    vm.remove_member("demo/Counter", "increment");
    let guard = jvm.attach_current_thread().unwrap();
    let env = guard.env();
    let class = env.class("demo/Counter").unwrap();
    let counter = env.new_object(&class, &args![1]).unwrap();

    for _ in 0..2 {
        assert!(matches!(
            counter.call("increment", &[]),
            Err(JniError::MethodNotFound { ref name, .. }) if name == "increment"
        ));
    }
    // The constructor once, then one attempt per call
    assert_eq!(vm.count(Op::GetMethodId), 3);
    assert_eq!(counter.get("count").unwrap().into_int().unwrap(), 1);
}
