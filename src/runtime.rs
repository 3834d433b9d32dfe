//! Process-wide wasmtime state shared by every engine binding.
//!
//! There is at most one live [`Runtime`] at a time. [`acquire`] hands out
//! the live one or builds it under a lock, so concurrent first use never
//! initializes twice. The slot only holds a weak reference: the runtime is
//! torn down when the last binding holding it is dropped, and the next
//! [`acquire`] builds a fresh one.

use anyhow::{Context, Result};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use wasmtime::{Config, Engine, Linker};
use wasmtime_wasi::preview1::{self, WasiP1Ctx};

static SHARED: Mutex<Weak<Runtime>> = Mutex::new(Weak::new());

/// A wasmtime engine plus a linker with WASI preview 1 wired in.
pub struct Runtime {
    engine: Engine,
    linker: Linker<WasiP1Ctx>,
}

impl Runtime {
    fn new() -> Result<Self> {
        let mut config = Config::new();
        config.async_support(true);
        let engine = Engine::new(&config).context("failed to create wasm engine")?;

        let mut linker = Linker::new(&engine);
        preview1::add_to_linker_async(&mut linker, |ctx| ctx)
            .context("failed to link WASI preview 1")?;

        tracing::debug!("wasm runtime initialized");
        Ok(Self { engine, linker })
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn linker(&self) -> &Linker<WasiP1Ctx> {
        &self.linker
    }
}

impl Drop for Runtime {
    fn drop(&mut self) {
        tracing::debug!("wasm runtime torn down");
    }
}

/// Get the live runtime, creating it if none exists.
pub fn acquire() -> Result<Arc<Runtime>> {
    let mut slot = SHARED.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(runtime) = slot.upgrade() {
        return Ok(runtime);
    }
    let runtime = Arc::new(Runtime::new()?);
    *slot = Arc::downgrade(&runtime);
    Ok(runtime)
}

/// Whether a runtime is currently alive.
pub fn is_live() -> bool {
    SHARED
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .strong_count()
        > 0
}
