//! Command line arguments.

use std::fmt;
use std::path::PathBuf;

use clap::Parser;
use clap_verbosity_flag::{Verbosity, WarnLevel};

/// Which engine compiles the sources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineChoice {
    /// The in-process reference engine.
    Reference,
    /// A compiled engine module.
    Wasm(PathBuf),
}

impl fmt::Display for EngineChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reference => write!(f, "reference"),
            Self::Wasm(path) => write!(f, "{}", path.display()),
        }
    }
}

fn parse_engine(value: &str) -> Result<EngineChoice, String> {
    match value {
        "" => Err("engine must be `reference` or a path to a .wasm module".to_string()),
        "reference" => Ok(EngineChoice::Reference),
        path => Ok(EngineChoice::Wasm(PathBuf::from(path))),
    }
}

#[derive(Parser, Debug)]
#[command(name = "qak")]
#[command(about = "Compile Qak sources and inspect what the engine reports", long_about = None)]
pub struct Args {
    /// Source files to compile
    #[arg(value_name = "FILE", required = true)]
    pub files: Vec<PathBuf>,

    /// `reference`, or the path of a compiled engine module
    #[arg(short, long, value_name = "ENGINE", default_value = "reference", value_parser = parse_engine)]
    pub engine: EngineChoice,

    /// Have the engine print each module's tokens
    #[arg(short, long)]
    pub tokens: bool,

    /// Have the engine print each module's diagnostics
    #[arg(short, long)]
    pub diagnostics: bool,

    /// Have the engine print each module's syntax tree
    #[arg(short, long)]
    pub ast: bool,

    /// Print the engine's allocations after compiling (ignored with --json)
    #[arg(short, long)]
    pub memory: bool,

    /// Write a JSON report instead of plain diagnostics
    #[arg(long)]
    pub json: bool,

    /// TOML file with `[session]` and `[engine]` tables
    #[arg(short, long, value_name = "CONFIG")]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,
}
