//! Project-wide constants.

use std::path::PathBuf;

/// Shown in the CLI's `--help`.
pub const AUTHOR: &str = env!("CARGO_PKG_AUTHORS");
pub const REPO: &str = env!("CARGO_PKG_REPOSITORY");

/// Environment variable that points at the directory holding the engine binaries.
pub const BIN_DIR_ENV: &str = "WARTHOG_WASM_DIR";

/// Extension every engine binary carries.
pub const WASM_EXTENSION: &str = "wasm";

/// Entry point of a WASI command module.
pub const ENTRY_POINT: &str = "_start";

/// Guest mount points for the sandbox. Absolute and relative paths in the
/// engine both land in the same directory.
pub const GUEST_MOUNTS: &[&str] = &["/", "."];

/// Largest chunk the capture streams accept per write.
pub const MAX_WRITE_BYTES: usize = 1024 * 1024;

/// Default binary directory: `~/.warthog/bin`.
/// Falls back to `./bin` when there is no home directory.
pub fn default_bin_dir() -> PathBuf {
    match dirs::home_dir() {
        Some(home) => home.join(".warthog").join("bin"),
        None => PathBuf::from("bin"),
    }
}
