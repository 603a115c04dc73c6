use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use tagvm_core::StateConfig;

mod repl;
mod session;

use session::Session;

const DEFAULT_TRACE_FILTER: &str = "tagvm::gc=debug,tagvm::refs=info,tagvm::call=debug,tagvm_core=info,tagvm_cli=info";

#[derive(Debug, Parser)]
#[command(name = "tagvm", author, version, about = "Drive the tagvm embedding API", long_about = None)]
struct CliArgs {
    /// Command script to run, one command per line. Without it the REPL starts.
    #[arg(value_name = "FILE")]
    file: Option<PathBuf>,

    /// State configuration (TOML)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

fn read_file_content(path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read file '{}'", path.display()))
}

/// Filter selected by `TAGVM_TRACE`: empty or `0` leaves tracing off, `1`
/// picks the default targets, anything else is an `EnvFilter` expression.
fn trace_filter(raw: &str) -> Option<&str> {
    match raw.trim() {
        "" | "0" => None,
        "1" => Some(DEFAULT_TRACE_FILTER),
        expr => Some(expr),
    }
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let Ok(raw) = std::env::var("TAGVM_TRACE") else {
        return;
    };
    let Some(expr) = trace_filter(&raw) else {
        return;
    };
    let filter = EnvFilter::try_new(expr).unwrap_or_else(|_| EnvFilter::new(DEFAULT_TRACE_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .try_init();
}

fn load_config(path: Option<&Path>) -> anyhow::Result<StateConfig> {
    match path {
        Some(path) => {
            let src = read_file_content(path)?;
            StateConfig::from_toml_str(&src).with_context(|| format!("invalid config '{}'", path.display()))
        }
        None => Ok(StateConfig::default()),
    }
}

/// Runs every line of `src`, printing command output. Stops at the first
/// failing line.
fn run_script(session: &mut Session, src: &str) -> anyhow::Result<()> {
    for (lineno, line) in src.lines().enumerate() {
        let out = session
            .exec_line(line)
            .with_context(|| format!("line {}: {}", lineno + 1, line.trim()))?;
        if let Some(out) = out {
            println!("{out}");
        }
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    init_tracing();

    let CliArgs { file, config } = CliArgs::parse();
    let config = load_config(config.as_deref())?;
    let mut session = Session::new(config)?;

    match file {
        Some(path) => {
            let src = read_file_content(&path)?;
            run_script(&mut session, &src)
        }
        None => repl::run(session, true),
    }
}
