//! The `qak` command line front end.
//!
//! Reads Qak source files, compiles them through a [`qak_abi::Session`] on
//! either the reference engine or a compiled engine module, and reports the
//! diagnostics. The binary in `main.rs` only parses arguments, installs the
//! logger and maps the result to an exit status.

pub mod args;
pub mod config;
pub mod driver;
pub mod report;

use std::io;

use anyhow::Context;
use log::debug;
use qak_abi::Session;
use qak_engine::ReferenceEngine;
use qak_wasm::WasmEngine;

pub use args::{Args, EngineChoice};
pub use config::CliConfig;
pub use driver::{run, Input, Options};
pub use report::{FileReport, Report};

impl Args {
    pub fn options(&self) -> Options {
        Options {
            tokens: self.tokens,
            diagnostics: self.diagnostics,
            ast: self.ast,
            memory: self.memory,
            json: self.json,
        }
    }
}

/// Run the command described by `args`, writing to stdout.
pub fn execute(args: &Args) -> anyhow::Result<Report> {
    let config = match &args.config {
        Some(path) => CliConfig::load(path)?,
        None => CliConfig::default(),
    };
    let inputs = args
        .files
        .iter()
        .map(|path| Input::read(path))
        .collect::<anyhow::Result<Vec<_>>>()?;
    debug!("compiling {} files with the {} engine", inputs.len(), args.engine);

    let options = args.options();
    let engine_name = args.engine.to_string();
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match &args.engine {
        EngineChoice::Reference => {
            let engine = ReferenceEngine::with_config(config.engine);
            let mut session = Session::with_config(engine, config.session)?;
            run(&mut session, &engine_name, &inputs, &options, &mut out)
        }
        EngineChoice::Wasm(path) => {
            let engine = WasmEngine::from_file(path)
                .with_context(|| format!("failed to load engine {}", path.display()))?;
            let mut session = Session::with_config(engine, config.session)?;
            run(&mut session, &engine_name, &inputs, &options, &mut out)
        }
    }
}
