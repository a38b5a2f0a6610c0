//! Reference ownership: every handle releases its reference exactly once

use jbind_sdk::{args, AsRaw, Global, Jvm, Local, RawObject};
use jbind_test::fixtures::{counter_namespace, install_counter};
use jbind_test::{FakeVm, Op};
use std::sync::Arc;
use std::thread;

fn counter_jvm() -> (Arc<FakeVm>, Jvm) {
    let vm = FakeVm::new();
    install_counter(&vm);
    let jvm = Jvm::new(vm.clone(), counter_namespace().unwrap());
    (vm, jvm)
}

// ===== Local and global handles =====

#[test]
fn test_promote_releases_local() {
    let (vm, jvm) = counter_jvm();
    let guard = jvm.attach_current_thread().unwrap();
    let env = guard.env();
    let class = env.class("demo/Counter").unwrap();

    let local = env.new_object(&class, &args![1]).unwrap();
    assert_eq!(vm.live_locals(), 1);
    let global = local.promote();
    assert_eq!(vm.live_locals(), 0);
    // The cached class plus the promoted object
    assert_eq!(vm.live_globals(), 2);
    assert_eq!(vm.count(Op::NewGlobalRef), 2);

    let view = global.to_local(env);
    assert!(env.is_same_object(&view, &global));
    assert_eq!(view.call("increment", &[]).unwrap().into_int().unwrap(), 2);
    assert_eq!(global.get(env, "count").unwrap().into_int().unwrap(), 2);

    drop(view);
    drop(global);
    assert_eq!(vm.live_globals(), 1);
    assert_eq!(vm.live_locals(), 0);
    assert!(vm.violations().is_empty());
}

#[test]
fn test_to_global_keeps_local() {
    let (vm, jvm) = counter_jvm();
    let guard = jvm.attach_current_thread().unwrap();
    let env = guard.env();
    let class = env.class("demo/Counter").unwrap();

    let local = env.new_object(&class, &[]).unwrap();
    let global = local.to_global();
    assert_eq!(vm.live_locals(), 1);
    assert_eq!(vm.live_globals(), 2);
    assert!(env.is_same_object(&local, &global));

    drop(local);
    assert_eq!(vm.live_locals(), 0);
    assert_eq!(global.call(env, "increment", &[]).unwrap().into_int().unwrap(), 1);
    drop(global);
    assert_eq!(vm.live_globals(), 1);
    assert!(vm.violations().is_empty());
}

#[test]
fn test_adopted_global_is_released_once() {
    let (vm, jvm) = counter_jvm();
    let guard = jvm.attach_current_thread().unwrap();
    let env = guard.env();
    let class = env.class("demo/Counter").unwrap();
    let counter = env.new_object(&class, &[]).unwrap();

    let raw = env.raw().new_global_ref(counter.as_raw());
    let created = vm.count(Op::NewGlobalRef);
    let adopted = Global::adopt(&jvm, raw);
    assert_eq!(vm.count(Op::NewGlobalRef), created);

    let released = vm.count(Op::DeleteGlobalRef);
    drop(adopted);
    assert_eq!(vm.count(Op::DeleteGlobalRef), released + 1);
    assert!(vm.violations().is_empty());
}

#[test]
fn test_wrap_and_release() {
    let (vm, jvm) = counter_jvm();
    let guard = jvm.attach_current_thread().unwrap();
    let env = guard.env();
    let class = env.class("demo/Counter").unwrap();
    let counter = env.new_object(&class, &[]).unwrap();

    let extra = Local::wrap(env, counter.as_raw());
    assert_eq!(vm.live_locals(), 2);
    assert!(env.is_same_object(&extra, &counter));

    // Released handles hand their reference back untouched
    let raw = extra.release();
    assert_eq!(vm.live_locals(), 2);
    env.raw().delete_local_ref(raw);
    assert_eq!(vm.live_locals(), 1);

    let null = Local::wrap(env, RawObject::NULL);
    assert!(null.is_null());
    assert_eq!(vm.count(Op::NewLocalRef), 1);
    drop(null);
    assert!(vm.violations().is_empty());
}

#[test]
fn test_upcast_and_into_local() {
    let (vm, jvm) = counter_jvm();
    let guard = jvm.attach_current_thread().unwrap();
    let env = guard.env();
    let class = env.class("demo/Counter").unwrap();
    let other = env.class("demo/Other").unwrap();

    let counter = env.new_object(&class, &[]).unwrap();
    assert!(counter.upcast(&other).is_err());
    // A failed upcast still releases the reference
    assert_eq!(vm.live_locals(), 0);

    let counter = env.new_object(&class, &[]).unwrap();
    let same = counter.upcast(&class).unwrap();
    let untyped = same.into_local();
    assert_eq!(vm.live_locals(), 1);
    drop(untyped);
    assert_eq!(vm.live_locals(), 0);
    assert!(vm.violations().is_empty());
}

// ===== Crossing threads =====

#[test]
fn test_global_dropped_on_unattached_thread() {
    let (vm, jvm) = counter_jvm();
    let guard = jvm.attach_current_thread().unwrap();
    let env = guard.env();
    let class = env.class("demo/Counter").unwrap();
    let global = env.new_object(&class, &args![3]).unwrap().promote();
    assert_eq!(vm.live_globals(), 2);

    thread::spawn(move || drop(global)).join().unwrap();

    // The spawned thread attached just long enough to release
    assert_eq!(vm.count(Op::Attach), 2);
    assert_eq!(vm.count(Op::Detach), 1);
    assert_eq!(vm.live_globals(), 1);
    assert!(vm.violations().is_empty());
}

#[test]
fn test_global_used_on_another_thread() {
    let (vm, jvm) = counter_jvm();
    let global = {
        let guard = jvm.attach_current_thread().unwrap();
        let env = guard.env();
        let class = env.class("demo/Counter").unwrap();
        env.new_object(&class, &args![41]).unwrap().promote()
    };

    let worker = jvm.clone();
    let value = thread::spawn(move || {
        let guard = worker.attach_current_thread().unwrap();
        let env = guard.env();
        let value = global.call(env, "increment", &[]).unwrap().into_int().unwrap();
        drop(global);
        value
    })
    .join()
    .unwrap();

    assert_eq!(value, 42);
    assert_eq!(vm.live_globals(), 1);
    assert_eq!(vm.live_locals(), 0);
    assert!(vm.violations().is_empty());
}
