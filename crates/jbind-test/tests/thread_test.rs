//! Thread attachment and per-thread environments

use jbind_sdk::{args, JniError, Jvm};
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

// ===== Guards =====

#[test]
fn test_nested_guards_share_attachment() {
    let (vm, jvm) = counter_jvm();
    {
        let _outer = jvm.attach_current_thread().unwrap();
        {
            let _inner = jvm.attach_current_thread().unwrap();
            assert!(vm.is_attached());
        }
        assert!(vm.is_attached());
        assert_eq!(vm.count(Op::Detach), 0);
    }
    assert!(!vm.is_attached());
    assert_eq!(vm.count(Op::Attach), 1);
    assert_eq!(vm.count(Op::Detach), 1);
}

#[test]
fn test_externally_attached_thread_stays_attached() {
    let (vm, jvm) = counter_jvm();
    vm.attach_externally();
    {
        let guard = jvm.attach_current_thread().unwrap();
        let env = guard.env();
        let class = env.class("demo/Counter").unwrap();
        let counter = env.new_object(&class, &args![1]).unwrap();
        assert_eq!(counter.call("increment", &[]).unwrap().into_int().unwrap(), 2);
    }
    assert!(vm.is_attached());
    assert_eq!(vm.count(Op::Attach), 0);
    assert_eq!(vm.count(Op::Detach), 0);
}

#[test]
fn test_refused_attach_is_reported() {
    let (vm, jvm) = counter_jvm();
    vm.refuse_attach();
    assert!(matches!(
        jvm.attach_current_thread(),
        Err(JniError::AttachFailed(ref reason)) if reason.contains("thread limit")
    ));
    assert!(!vm.is_attached());
    assert_eq!(vm.count(Op::Attach), 1);
    assert_eq!(vm.count(Op::Detach), 0);
}

#[test]
fn test_current_env_requires_attachment() {
    let (vm, jvm) = counter_jvm();
    assert!(matches!(jvm.current_env(), Err(JniError::NotAttached)));

    let guard = jvm.attach_current_thread().unwrap();
    let env = jvm.current_env().unwrap();
    let class = env.class("demo/Counter").unwrap();
    let counter = env.new_object(&class, &[]).unwrap();
    assert_eq!(counter.call("increment", &[]).unwrap().into_int().unwrap(), 1);
    drop(counter);
    drop(guard);

    // The runtime's own attachment is enough
    vm.attach_externally();
    assert!(jvm.current_env().is_ok());
}

// ===== Workers =====

#[test]
fn test_workers_share_the_cache() {
    let (vm, jvm) = counter_jvm();
    let workers: Vec<_> = (0..4)
        .map(|i| {
            let jvm = jvm.clone();
            thread::spawn(move || {
                let guard = jvm.attach_current_thread().unwrap();
                let env = guard.env();
                let class = env.class("demo/Counter").unwrap();
                let counter = env.new_object(&class, &args![i * 10]).unwrap();
                counter.call("increment", &[]).unwrap().into_int().unwrap()
            })
        })
        .collect();

    let mut results: Vec<i32> = workers.into_iter().map(|w| w.join().unwrap()).collect();
    results.sort();
    assert_eq!(results, vec![1, 11, 21, 31]);

    assert_eq!(vm.count(Op::FindClass), 1);
    assert_eq!(vm.count(Op::GetMethodId), 2);
    assert_eq!(vm.count(Op::Attach), 4);
    assert_eq!(vm.count(Op::Detach), 4);
    assert_eq!(vm.live_locals(), 0);
    assert!(vm.violations().is_empty());
}
