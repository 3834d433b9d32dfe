pub mod mock;
pub mod wasm;

use anyhow::Result;
use async_trait::async_trait;
use std::fmt;

use crate::fs::VirtualFs;

/// Receives one line of engine output, without its trailing newline.
pub type LineSink = Box<dyn FnMut(&str) + Send>;

/// Lifecycle callback run before the engine starts.
pub type PreRun = Box<dyn FnOnce(&EarlyModule<'_>) -> Result<()> + Send>;

/// Lifecycle callback run after the engine exits.
pub type PostRun = Box<dyn FnOnce(&LateModule<'_>) -> Result<()> + Send>;

/// Everything a binding needs for one run.
#[derive(Default)]
pub struct ModuleConfig {
    pub pre_run: Vec<PreRun>,
    pub post_run: Vec<PostRun>,
    pub print: Option<LineSink>,
    pub print_err: Option<LineSink>,
    pub arguments: Vec<String>,
}

impl fmt::Debug for ModuleConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleConfig")
            .field("pre_run", &self.pre_run.len())
            .field("post_run", &self.post_run.len())
            .field("print", &self.print.is_some())
            .field("print_err", &self.print_err.is_some())
            .field("arguments", &self.arguments)
            .finish()
    }
}

/// What a hook can see before the engine runs: the arguments it will get
/// and the sandbox to stage files in.
pub struct EarlyModule<'a> {
    arguments: &'a [String],
    fs: &'a VirtualFs,
}

impl<'a> EarlyModule<'a> {
    pub fn new(arguments: &'a [String], fs: &'a VirtualFs) -> Self {
        Self { arguments, fs }
    }

    pub fn arguments(&self) -> &[String] {
        self.arguments
    }

    pub fn fs(&self) -> &VirtualFs {
        self.fs
    }
}

/// What a hook can see after the engine exits. Adds the exit code.
pub struct LateModule<'a> {
    arguments: &'a [String],
    fs: &'a VirtualFs,
    exit_code: i32,
}

impl<'a> LateModule<'a> {
    pub fn new(arguments: &'a [String], fs: &'a VirtualFs, exit_code: i32) -> Self {
        Self {
            arguments,
            fs,
            exit_code,
        }
    }

    pub fn arguments(&self) -> &[String] {
        self.arguments
    }

    pub fn fs(&self) -> &VirtualFs {
        self.fs
    }

    pub fn exit_code(&self) -> i32 {
        self.exit_code
    }
}

/// A finished engine instance. Dropping it removes the sandbox.
#[derive(Debug)]
pub struct ModuleHandle {
    pub exit_code: i32,
    pub fs: VirtualFs,
}

/// Loads and runs one engine.
///
/// Implementations run every `pre_run` hook before the engine starts,
/// deliver output line by line to `print`/`print_err` in emission order,
/// flush partial lines, then run every `post_run` hook. A non-zero exit
/// code is not an error; traps, instantiation failures and hook errors are.
#[async_trait]
pub trait EngineBinding: Send + Sync {
    fn name(&self) -> &str;
    async fn instantiate(&self, config: ModuleConfig) -> Result<ModuleHandle>;
}

/// Run the `pre_run` hooks in order, stopping at the first error.
pub fn run_pre_hooks(hooks: Vec<PreRun>, view: &EarlyModule<'_>) -> Result<()> {
    for hook in hooks {
        hook(view)?;
    }
    Ok(())
}

/// Run the `post_run` hooks in order, stopping at the first error.
pub fn run_post_hooks(hooks: Vec<PostRun>, view: &LateModule<'_>) -> Result<()> {
    for hook in hooks {
        hook(view)?;
    }
    Ok(())
}
