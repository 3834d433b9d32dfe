use anyhow::{Result, bail};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::{
    EarlyModule, EngineBinding, LateModule, ModuleConfig, ModuleHandle, run_post_hooks,
    run_pre_hooks,
};
use crate::fs::VirtualFs;

/// One thing a scripted engine does.
#[derive(Debug, Clone, PartialEq)]
pub enum Emit {
    Stdout(String),
    Stderr(String),
    /// Write a file into the sandbox.
    File { path: String, contents: String },
    /// Stop with this exit code.
    Exit(i32),
    /// Fail the run as if the engine trapped.
    Trap(String),
}

type Script = Box<dyn Fn(&[String]) -> Vec<Emit> + Send + Sync>;

/// A scripted engine for tests. The script maps the argument vector to the
/// emissions of one run, so output depends on arguments only.
pub struct MockBinding {
    name: String,
    script: Script,
    runs: AtomicUsize,
}

impl MockBinding {
    pub fn new(
        name: impl Into<String>,
        script: impl Fn(&[String]) -> Vec<Emit> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            script: Box::new(script),
            runs: AtomicUsize::new(0),
        }
    }

    /// Prints each argument on its own stdout line.
    pub fn echo(name: impl Into<String>) -> Self {
        Self::new(name, |args| {
            args.iter().map(|a| Emit::Stdout(a.clone())).collect()
        })
    }

    /// How many times the engine has started.
    pub fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EngineBinding for MockBinding {
    fn name(&self) -> &str {
        &self.name
    }

    async fn instantiate(&self, config: ModuleConfig) -> Result<ModuleHandle> {
        let ModuleConfig {
            pre_run,
            post_run,
            mut print,
            mut print_err,
            arguments,
        } = config;

        let fs = VirtualFs::new()?;
        run_pre_hooks(pre_run, &EarlyModule::new(&arguments, &fs))?;
        self.runs.fetch_add(1, Ordering::SeqCst);

        let mut exit_code = 0;
        for emit in (self.script)(&arguments) {
            // Give concurrent runs a chance to interleave.
            tokio::task::yield_now().await;
            match emit {
                Emit::Stdout(line) => {
                    if let Some(sink) = print.as_mut() {
                        sink(&line);
                    }
                }
                Emit::Stderr(line) => {
                    if let Some(sink) = print_err.as_mut() {
                        sink(&line);
                    }
                }
                Emit::File { path, contents } => fs.write(&path, contents)?,
                Emit::Exit(code) => {
                    exit_code = code;
                    break;
                }
                Emit::Trap(message) => bail!("{}: trap: {}", self.name, message),
            }
        }

        run_post_hooks(post_run, &LateModule::new(&arguments, &fs, exit_code))?;
        Ok(ModuleHandle { exit_code, fs })
    }
}
