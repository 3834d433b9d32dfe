use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicI32, Ordering};

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use warthog_wasm::consts::{AUTHOR, BIN_DIR_ENV, REPO};
use warthog_wasm::{Config, EngineKind, Engines, Options};

#[derive(Parser)]
#[command(
    name = "warthog-wasm",
    version,
    author = AUTHOR,
    about = "Run a pathfinding engine in a wasm sandbox.",
    after_help = after_help()
)]
struct Cli {
    /// Engine to run (warthog, roadhog, mapf)
    engine: EngineKind,

    /// Directory holding <engine>.wasm (default: $WARTHOG_WASM_DIR or ~/.warthog/bin)
    #[arg(short, long)]
    bin_dir: Option<PathBuf>,

    /// Copy a host file into the sandbox before the run: HOST or HOST:GUEST
    #[arg(short, long)]
    stage: Vec<String>,

    /// Copy a sandbox file into the current directory after the run
    #[arg(short, long)]
    collect: Vec<String>,

    /// Print the captured output as one JSON object
    #[arg(long, default_value_t = false)]
    json: bool,

    /// Arguments forwarded verbatim to the engine
    #[arg(last = true)]
    args: Vec<String>,
}

fn after_help() -> String {
    format!(
        "Engine arguments go after `--`, e.g.\n  \
         warthog-wasm --stage arena.map warthog -- --alg jps --scen arena.map.scen\n\n\
         The process exits with the engine's exit status.\n\
         Report bugs at {REPO}/issues"
    )
}

/// Map an engine exit code onto a process status byte. Codes outside
/// 1..=255 still report failure.
fn exit_status(code: i32) -> u8 {
    match code {
        0 => 0,
        1..=255 => code as u8,
        _ => 1,
    }
}

/// Split `HOST[:GUEST]`. Without a guest path the file lands in the sandbox
/// root under its own name.
fn parse_stage(stage: &str) -> Result<(PathBuf, String)> {
    let (host, guest) = match stage.split_once(':') {
        Some((host, guest)) if !guest.is_empty() => (PathBuf::from(host), guest.to_string()),
        _ => {
            let host = PathBuf::from(stage.trim_end_matches(':'));
            let name = host
                .file_name()
                .with_context(|| format!("cannot stage {stage}: no file name"))?
                .to_string_lossy()
                .into_owned();
            (host, name)
        }
    };
    Ok((host, guest))
}

/// Where a collected sandbox file lands on the host.
fn collect_target(guest: &str) -> Result<PathBuf> {
    Path::new(guest)
        .file_name()
        .map(PathBuf::from)
        .with_context(|| format!("cannot collect {guest}: no file name"))
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Logs go to stderr so they never mix with engine stdout.
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse();
    let config = Config::resolve(
        cli.bin_dir,
        std::env::var_os(BIN_DIR_ENV).map(PathBuf::from),
    );

    let staged = cli
        .stage
        .iter()
        .map(|stage| -> Result<(String, Vec<u8>)> {
            let (host, guest) = parse_stage(stage)?;
            let contents =
                std::fs::read(&host).with_context(|| format!("failed to read {}", host.display()))?;
            Ok((guest, contents))
        })
        .collect::<Result<Vec<_>>>()?;

    let collect = cli
        .collect
        .iter()
        .map(|guest| -> Result<(String, PathBuf)> {
            Ok((guest.clone(), collect_target(guest)?))
        })
        .collect::<Result<Vec<_>>>()?;

    let exit_code = Arc::new(AtomicI32::new(0));
    let exit_code_in_hook = Arc::clone(&exit_code);

    let options = Options::new()
        .arguments(cli.args)
        .before_start(move |module| {
            for (guest, contents) in staged {
                tracing::debug!(%guest, bytes = contents.len(), "staging file");
                module.fs().write(&guest, contents)?;
            }
            Ok(())
        })
        .after_finish(move |module| {
            exit_code_in_hook.store(module.exit_code(), Ordering::SeqCst);
            if module.exit_code() != 0 {
                tracing::warn!(exit_code = module.exit_code(), "engine exited with non-zero status");
            }
            for (guest, target) in collect {
                let contents = module.fs().read(&guest)?;
                std::fs::write(&target, contents)
                    .with_context(|| format!("failed to write {}", target.display()))?;
            }
            Ok(())
        });

    let engines = Engines::new(config);
    let output = engines.run(cli.engine, options).await?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        io::stdout().write_all(output.stdout.as_bytes())?;
        io::stderr().write_all(output.stderr.as_bytes())?;
    }
    Ok(ExitCode::from(exit_status(exit_code.load(Ordering::SeqCst))))
}
