//! Run the warthog, roadhog and mapf pathfinding engines as async functions.
//!
//! Each engine is a WASI command module. A call builds a fresh sandbox,
//! runs the caller's `before_start` hook, runs the engine with the given
//! arguments while capturing stdout and stderr line by line, runs the
//! `after_finish` hook, and returns the captured text.
//!
//! ```rust,ignore
//! use warthog_wasm::{Options, warthog};
//!
//! let output = warthog(
//!     Options::new()
//!         .arguments(["--scen", "arena.map.scen", "--alg", "jps"])
//!         .before_start(|m| {
//!             m.fs().write("arena.map", include_str!("arena.map"))?;
//!             m.fs().write("arena.map.scen", include_str!("arena.map.scen"))
//!         }),
//! )
//! .await?;
//! print!("{}", output.stdout);
//! ```

pub mod binding;
pub mod capture;
pub mod config;
pub mod consts;
pub mod engines;
pub mod error;
pub mod fs;
pub mod invoke;
pub mod runtime;

pub use binding::wasm::WasmBinding;
pub use binding::{EarlyModule, EngineBinding, LateModule, ModuleConfig, ModuleHandle};
pub use config::Config;
pub use engines::{EngineKind, Engines, mapf, roadhog, warthog};
pub use error::Error;
pub use fs::VirtualFs;
pub use invoke::{Options, Output, invoke};
