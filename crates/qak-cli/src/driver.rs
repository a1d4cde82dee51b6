//! Compile a batch of inputs in one session.

use std::io::Write;
use std::path::Path;

use anyhow::Context;
use log::{debug, info, warn};
use qak_abi::{Engine, Session};

use crate::report::{format_diagnostic, source_digest, FileReport, Report};

/// What to show besides the diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Options {
    pub tokens: bool,
    pub diagnostics: bool,
    pub ast: bool,
    pub memory: bool,
    pub json: bool,
}

/// A source file read into memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Input {
    pub name: String,
    pub text: String,
}

impl Input {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
        }
    }

    pub fn read(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Ok(Self::new(path.display().to_string(), text))
    }
}

/// Compile every input, print what `options` asks for, then close the
/// session.
///
/// Plain diagnostics and the JSON report go to `out`. The `tokens`,
/// `diagnostics`, `ast` and `memory` listings are printed by the engine to
/// its own output. In JSON mode the engine prints nothing, so `memory` is
/// ignored there.
pub fn run<E: Engine>(
    session: &mut Session<E>,
    engine_name: &str,
    inputs: &[Input],
    options: &Options,
    out: &mut dyn Write,
) -> anyhow::Result<Report> {
    let mut files = Vec::with_capacity(inputs.len());
    for input in inputs {
        files.push(compile_one(session, input, options, out)?);
    }

    if options.memory && options.json {
        warn!("memory report is not available with --json");
    } else if options.memory {
        session.report_memory_usage()?;
    }
    session.close()?;

    let report = Report {
        engine: engine_name.to_string(),
        engine_version: session.engine_version(),
        files,
    };
    if options.json {
        serde_json::to_writer_pretty(&mut *out, &report)?;
        writeln!(out)?;
    }
    Ok(report)
}

fn compile_one<E: Engine>(
    session: &mut Session<E>,
    input: &Input,
    options: &Options,
    out: &mut dyn Write,
) -> anyhow::Result<FileReport> {
    let module = session
        .compile_source(&input.name, &input.text)
        .with_context(|| format!("failed to compile {}", input.name))?;

    let diagnostics = session.get_diagnostics(module)?;
    let token_count = session.token_count(module)?;
    let tokens = if options.json && options.tokens {
        Some(session.get_tokens(module)?)
    } else {
        None
    };
    let has_errors = session.has_errors(module)?;
    info!(
        "{}: {token_count} tokens, {} diagnostics",
        input.name,
        diagnostics.len()
    );

    if !options.json {
        for diagnostic in &diagnostics {
            writeln!(out, "{}", format_diagnostic(&input.name, diagnostic))?;
        }
        if options.diagnostics {
            session.print_diagnostics(module)?;
        }
        if options.tokens {
            session.print_tokens(module)?;
        }
        if options.ast {
            session.print_syntax_tree(module)?;
        }
    }

    session.delete_module(module)?;
    debug!("{}: module released", input.name);
    Ok(FileReport {
        file: input.name.clone(),
        sha256: source_digest(&input.text),
        has_errors,
        token_count,
        diagnostics,
        tokens,
    })
}
