//! Library load and unload hooks
//!
//! The root context is process-wide, so the whole sequence lives in a single
//! test.

use jbind_sdk::lifecycle::{on_load, on_unload, root};
use jbind_sdk::{args, JniError, JvmOptions};
use jbind_test::fixtures::{counter_namespace, install_counter};
use jbind_test::FakeVm;

#[test]
fn test_load_use_unload() {
    assert!(root().is_none());
    assert!(matches!(on_unload(), Err(JniError::NotLoaded)));

    let vm = FakeVm::new();
    install_counter(&vm);
    let jvm = on_load(vm.clone(), counter_namespace().unwrap(), JvmOptions::default()).unwrap();
    assert!(matches!(
        on_load(vm.clone(), counter_namespace().unwrap(), JvmOptions::default()),
        Err(JniError::AlreadyLoaded)
    ));

    let guard = jvm.attach_current_thread().unwrap();
    {
        let context = root().unwrap();
        let env = context.current_env().unwrap();
        let class = env.class("demo/Counter").unwrap();
        let counter = env.new_object(&class, &args![1]).unwrap();
        assert_eq!(counter.call("increment", &[]).unwrap().into_int().unwrap(), 2);
    }

    assert_eq!(on_unload().unwrap(), 1);
    assert!(root().is_none());
    assert!(jvm.is_torn_down());
    assert_eq!(vm.live_globals(), 0);
    // Schema lookups still work; runtime calls do not
    let class = guard.env().class("demo/Counter").unwrap();
    assert!(matches!(guard.env().new_object(&class, &[]), Err(JniError::TornDown)));
    drop(guard);

    // A fresh load works after unloading
    let again = on_load(vm, counter_namespace().unwrap(), JvmOptions::default()).unwrap();
    assert!(!again.is_torn_down());
    assert_eq!(on_unload().unwrap(), 0);
}
