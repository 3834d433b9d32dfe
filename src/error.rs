//! Errors raised by this crate itself.
//!
//! Failures that come out of the engine (traps, instantiation errors) are
//! not wrapped: they travel through `anyhow::Error` exactly as the loader
//! produced them.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The `.wasm` file for an engine does not exist.
    #[error("engine binary not found: {}", path.display())]
    BinaryNotFound { path: PathBuf },

    /// The module has no `_start` export, so it is not a WASI command.
    #[error("{engine}: module does not export `_start`")]
    MissingEntry { engine: String },

    /// A sandbox path tried to escape the sandbox root.
    #[error("invalid sandbox path: {path}")]
    InvalidPath { path: String },

    #[error("unknown engine: {0} (expected warthog, roadhog or mapf)")]
    UnknownEngine(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offender() {
        let err = Error::BinaryNotFound {
            path: PathBuf::from("/opt/bin/mapf.wasm"),
        };
        assert!(err.to_string().contains("/opt/bin/mapf.wasm"));

        let err = Error::MissingEntry {
            engine: "roadhog".to_string(),
        };
        assert!(err.to_string().starts_with("roadhog:"));

        let err = Error::UnknownEngine("pighog".to_string());
        assert!(err.to_string().contains("pighog"));
    }

    #[test]
    fn survives_anyhow_round_trip() {
        let err: anyhow::Error = Error::InvalidPath {
            path: "../etc/passwd".to_string(),
        }
        .into();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::InvalidPath { .. })
        ));
    }
}
