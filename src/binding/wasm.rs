//! Binding for engines compiled to WASI preview 1 command modules.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use wasmtime::{Module, Store};
use wasmtime_wasi::{DirPerms, FilePerms, I32Exit, WasiCtxBuilder};

use super::{
    EarlyModule, EngineBinding, LateModule, ModuleConfig, ModuleHandle, run_post_hooks,
    run_pre_hooks,
};
use crate::capture::CaptureOutput;
use crate::consts::{ENTRY_POINT, GUEST_MOUNTS};
use crate::error::Error;
use crate::fs::VirtualFs;
use crate::runtime::{self, Runtime};

/// One compiled engine. Cheap to share; every [`instantiate`] gets its own
/// store, sandbox and capture streams.
///
/// [`instantiate`]: EngineBinding::instantiate
pub struct WasmBinding {
    name: String,
    module: Module,
    runtime: Arc<Runtime>,
}

impl WasmBinding {
    /// Compile the engine at `path`.
    pub fn from_file(name: impl Into<String>, path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::BinaryNotFound {
                path: path.to_path_buf(),
            }
            .into());
        }
        let name = name.into();
        let runtime = runtime::acquire()?;
        let module = Module::from_file(runtime.engine(), path)
            .with_context(|| format!("failed to compile {}", path.display()))?;
        tracing::info!(engine = %name, path = %path.display(), "engine compiled");
        Ok(Self {
            name,
            module,
            runtime,
        })
    }

    /// Compile an engine from an in-memory binary (or WAT text).
    pub fn from_bytes(name: impl Into<String>, bytes: impl AsRef<[u8]>) -> Result<Self> {
        let name = name.into();
        let runtime = runtime::acquire()?;
        let module = Module::new(runtime.engine(), bytes)
            .with_context(|| format!("failed to compile {name}"))?;
        Ok(Self {
            name,
            module,
            runtime,
        })
    }

    /// Run `_start` to completion and return the exit code.
    async fn run(
        &self,
        arguments: &[String],
        fs: &VirtualFs,
        stdout: &CaptureOutput,
        stderr: &CaptureOutput,
    ) -> Result<i32> {
        let ctx = {
            let mut builder = WasiCtxBuilder::new();
            builder
                .arg(&self.name)
                .args(arguments)
                .stdout(stdout.clone())
                .stderr(stderr.clone());
            for mount in GUEST_MOUNTS {
                builder.preopened_dir(fs.root(), mount, DirPerms::all(), FilePerms::all())?;
            }
            builder.build_p1()
        };

        let mut store = Store::new(self.runtime.engine(), ctx);
        let instance = self
            .runtime
            .linker()
            .instantiate_async(&mut store, &self.module)
            .await?;
        let start = instance
            .get_typed_func::<(), ()>(&mut store, ENTRY_POINT)
            .map_err(|_| Error::MissingEntry {
                engine: self.name.clone(),
            })?;

        match start.call_async(&mut store, ()).await {
            Ok(()) => Ok(0),
            Err(err) => match err.downcast_ref::<I32Exit>() {
                Some(exit) => Ok(exit.0),
                None => Err(err),
            },
        }
    }
}

#[async_trait]
impl EngineBinding for WasmBinding {
    fn name(&self) -> &str {
        &self.name
    }

    async fn instantiate(&self, config: ModuleConfig) -> Result<ModuleHandle> {
        let ModuleConfig {
            pre_run,
            post_run,
            print,
            print_err,
            arguments,
        } = config;

        let fs = VirtualFs::new()?;
        run_pre_hooks(pre_run, &EarlyModule::new(&arguments, &fs))?;

        let stdout = CaptureOutput::new(print);
        let stderr = CaptureOutput::new(print_err);
        let exit_code = self.run(&arguments, &fs, &stdout, &stderr).await?;
        stdout.finish();
        stderr.finish();
        tracing::debug!(engine = %self.name, exit_code, "engine exited");

        run_post_hooks(post_run, &LateModule::new(&arguments, &fs, exit_code))?;
        Ok(ModuleHandle { exit_code, fs })
    }
}
