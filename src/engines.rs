//! The three engines and the registry that resolves them.
//!
//! [`warthog`], [`roadhog`] and [`mapf`] are [`invoke`] bound to a fixed
//! engine from the process-wide registry, which reads its binary directory
//! from the environment on first use (see [`Config::from_env`]).

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, OnceLock};
use tokio::sync::RwLock;

use crate::binding::EngineBinding;
use crate::binding::wasm::WasmBinding;
use crate::config::Config;
use crate::error::Error;
use crate::invoke::{Options, Output, invoke};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    /// Single-agent grid search.
    Warthog,
    /// Road network search.
    Roadhog,
    /// Multi-agent pathfinding.
    Mapf,
}

impl EngineKind {
    pub const ALL: [EngineKind; 3] = [EngineKind::Warthog, EngineKind::Roadhog, EngineKind::Mapf];

    pub fn name(self) -> &'static str {
        match self {
            EngineKind::Warthog => "warthog",
            EngineKind::Roadhog => "roadhog",
            EngineKind::Mapf => "mapf",
        }
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EngineKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EngineKind::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::UnknownEngine(s.to_string()))
    }
}

/// Resolves engines to bindings. Wasm engines are compiled on first use and
/// reused for every later run.
pub struct Engines {
    config: Config,
    bindings: RwLock<HashMap<EngineKind, Arc<dyn EngineBinding>>>,
}

static GLOBAL: OnceLock<Engines> = OnceLock::new();

impl Engines {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            bindings: RwLock::new(HashMap::new()),
        }
    }

    /// The registry behind the free functions, configured from the environment.
    pub fn global() -> &'static Engines {
        GLOBAL.get_or_init(|| Engines::new(Config::from_env()))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Use `binding` for `kind` instead of loading it from disk.
    pub async fn register(&self, kind: EngineKind, binding: Arc<dyn EngineBinding>) {
        self.bindings.write().await.insert(kind, binding);
    }

    /// Forget the binding for `kind`; the next run reloads it.
    pub async fn unregister(&self, kind: EngineKind) {
        self.bindings.write().await.remove(&kind);
    }

    pub async fn binding(&self, kind: EngineKind) -> Result<Arc<dyn EngineBinding>> {
        if let Some(binding) = self.bindings.read().await.get(&kind) {
            return Ok(Arc::clone(binding));
        }

        // Compile without holding the lock so cached engines stay usable.
        let path = self.config.binary_path(kind.name());
        let compiled =
            tokio::task::spawn_blocking(move || WasmBinding::from_file(kind.name(), &path))
                .await??;

        // A racing caller may have stored one first; keep theirs.
        let mut bindings = self.bindings.write().await;
        let binding = bindings
            .entry(kind)
            .or_insert_with(|| Arc::new(compiled) as Arc<dyn EngineBinding>);
        Ok(Arc::clone(binding))
    }

    pub async fn run(&self, kind: EngineKind, options: Options) -> Result<Output> {
        let binding = self.binding(kind).await?;
        invoke(binding.as_ref(), options).await
    }

    pub async fn warthog(&self, options: Options) -> Result<Output> {
        self.run(EngineKind::Warthog, options).await
    }

    pub async fn roadhog(&self, options: Options) -> Result<Output> {
        self.run(EngineKind::Roadhog, options).await
    }

    pub async fn mapf(&self, options: Options) -> Result<Output> {
        self.run(EngineKind::Mapf, options).await
    }
}

pub async fn warthog(options: Options) -> Result<Output> {
    Engines::global().warthog(options).await
}

pub async fn roadhog(options: Options) -> Result<Output> {
    Engines::global().roadhog(options).await
}

pub async fn mapf(options: Options) -> Result<Output> {
    Engines::global().mapf(options).await
}
