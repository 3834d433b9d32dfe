//! Lives in its own test binary: the runtime is process-wide, so other
//! tests holding bindings would keep it alive.

use std::sync::Arc;

use warthog_wasm::{Options, WasmBinding, invoke, runtime};

const EMPTY: &str = r#"(module (memory (export "memory") 1) (func (export "_start")))"#;

#[tokio::test]
async fn runtime_is_shared_while_alive_and_rebuilt_after_teardown() {
    assert!(!runtime::is_live());

    let first = runtime::acquire().unwrap();
    let second = runtime::acquire().unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert!(runtime::is_live());

    // Bindings hold the runtime too.
    let binding = WasmBinding::from_bytes("empty", EMPTY).unwrap();
    drop(first);
    drop(second);
    assert!(runtime::is_live());

    let output = invoke(&binding, Options::new()).await.unwrap();
    assert_eq!(output.stdout, "");

    drop(binding);
    assert!(!runtime::is_live());

    let rebuilt = runtime::acquire().unwrap();
    assert!(runtime::is_live());
    drop(rebuilt);
    assert!(!runtime::is_live());

    // Concurrent first use still builds exactly one.
    let handles: Vec<_> = (0..4)
        .map(|_| std::thread::spawn(|| runtime::acquire().unwrap()))
        .collect();
    let runtimes: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    for rt in &runtimes[1..] {
        assert!(Arc::ptr_eq(&runtimes[0], rt));
    }
    drop(runtimes);
    assert!(!runtime::is_live());
}
