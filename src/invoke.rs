//! The run-and-capture protocol shared by every engine.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::Instrument;

use crate::binding::{
    EarlyModule, EngineBinding, LateModule, LineSink, ModuleConfig, PostRun, PreRun,
};

/// Captured output of one engine run. Each emitted line ends in `\n`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Output {
    pub stdout: String,
    pub stderr: String,
}

/// Caller-supplied settings for one run. Everything is optional:
/// `Options::default()` runs the engine with no arguments and no hooks.
#[derive(Default)]
pub struct Options {
    pub arguments: Vec<String>,
    pub before_start: Option<PreRun>,
    pub after_finish: Option<PostRun>,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arguments<I, S>(mut self, arguments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.arguments = arguments.into_iter().map(Into::into).collect();
        self
    }

    /// Runs once before the engine starts. Use it to stage input files.
    pub fn before_start(
        mut self,
        hook: impl FnOnce(&EarlyModule<'_>) -> Result<()> + Send + 'static,
    ) -> Self {
        self.before_start = Some(Box::new(hook));
        self
    }

    /// Runs once after the engine exits and all output has been captured.
    pub fn after_finish(
        mut self,
        hook: impl FnOnce(&LateModule<'_>) -> Result<()> + Send + 'static,
    ) -> Self {
        self.after_finish = Some(Box::new(hook));
        self
    }
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options")
            .field("arguments", &self.arguments)
            .field("before_start", &self.before_start.is_some())
            .field("after_finish", &self.after_finish.is_some())
            .finish()
    }
}

/// A sink that appends each line plus `\n` to `buffer`.
fn accumulate(buffer: &Arc<Mutex<String>>) -> LineSink {
    let buffer = Arc::clone(buffer);
    Box::new(move |line: &str| {
        let mut buffer = buffer.lock().unwrap_or_else(PoisonError::into_inner);
        buffer.push_str(line);
        buffer.push('\n');
    })
}

fn take(buffer: &Mutex<String>) -> String {
    std::mem::take(&mut *buffer.lock().unwrap_or_else(PoisonError::into_inner))
}

/// Run `binding` once with `options` and return what it printed.
///
/// Errors from the binding (a trap, a failed instantiation, a hook that
/// returned `Err`) are returned as-is and any output captured so far is
/// dropped. Text on stderr is not an error.
pub async fn invoke<B>(binding: &B, options: Options) -> Result<Output>
where
    B: EngineBinding + ?Sized,
{
    let Options {
        arguments,
        before_start,
        after_finish,
    } = options;

    let span = tracing::debug_span!(
        "invoke",
        engine = binding.name(),
        args = arguments.len()
    );

    async move {
        let stdout = Arc::new(Mutex::new(String::new()));
        let stderr = Arc::new(Mutex::new(String::new()));

        let pre_run: PreRun = Box::new(move |module: &EarlyModule<'_>| match before_start {
            Some(hook) => hook(module),
            None => Ok(()),
        });
        let post_run: PostRun = Box::new(move |module: &LateModule<'_>| match after_finish {
            Some(hook) => hook(module),
            None => Ok(()),
        });

        let config = ModuleConfig {
            pre_run: vec![pre_run],
            post_run: vec![post_run],
            print: Some(accumulate(&stdout)),
            print_err: Some(accumulate(&stderr)),
            arguments,
        };

        let handle = binding.instantiate(config).await?;
        drop(handle);

        let output = Output {
            stdout: take(&stdout),
            stderr: take(&stderr),
        };
        tracing::debug!(
            stdout_bytes = output.stdout.len(),
            stderr_bytes = output.stderr.len(),
            "engine run complete"
        );
        Ok(output)
    }
    .instrument(span)
    .await
}
