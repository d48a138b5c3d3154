//! Stage wiring: tokens → synthesis → folding → block resolution.
//!
//! Each stage runs to completion before the next starts and any error
//! aborts the whole pipeline, so no partially built program escapes.

use std::path::PathBuf;

use tracing::{debug, info};

use crate::ast::Program;
use crate::backend;
use crate::core::{Config, PilaResult};
use crate::lexer::{self, TokenStream};
use crate::optimization::{OptLevel, OptStats, Optimizer};
use crate::parser;
use crate::resolver;
use crate::vm::{ExecResult, Executor, ExecutorConfig};

/// A compiled program and what folding did to it.
#[derive(Debug, Clone)]
pub struct Compiled {
    pub program: Program,
    pub stats: OptStats,
}

/// Front end configuration.
#[derive(Debug, Clone)]
pub struct Pipeline<'c> {
    config: &'c Config,
    opt_level: OptLevel,
    resolve: bool,
}

impl<'c> Pipeline<'c> {
    pub fn new(config: &'c Config) -> Self {
        Self { config, opt_level: OptLevel::default(), resolve: true }
    }

    pub fn with_opt_level(mut self, level: OptLevel) -> Self {
        self.opt_level = level;
        self
    }

    /// Stop before block resolution, leaving jump targets empty.
    pub fn unresolved(mut self) -> Self {
        self.resolve = false;
        self
    }

    pub fn config(&self) -> &'c Config {
        self.config
    }

    /// Run every front end stage over a token stream.
    pub fn compile_tokens(&self, tokens: TokenStream) -> PilaResult<Compiled> {
        debug!(tokens = tokens.len(), "lexed");
        let mut program = parser::synthesize(tokens, self.config)?;

        let mut optimizer = Optimizer::new(self.opt_level);
        optimizer.optimize(&mut program);

        if self.resolve {
            resolver::resolve(&mut program)?;
        }

        info!(
            operations = program.len(),
            procedures = program.procedures.len(),
            warnings = program.diagnostics.len(),
            "compiled"
        );
        Ok(Compiled { program, stats: optimizer.stats().clone() })
    }

    /// Compile in-memory source.
    pub fn compile_source(&self, source: &str) -> PilaResult<Compiled> {
        let tokens = lexer::lex_source(source, "<input>", std::path::Path::new("."))?;
        self.compile_tokens(tokens)
    }

    /// Compile root files, concatenated in the order given.
    pub fn compile_files(&self, paths: &[PathBuf]) -> PilaResult<Compiled> {
        let tokens = lexer::lex_files(paths)?;
        self.compile_tokens(tokens)
    }
}

/// Compile and run source with default settings and buffered output.
pub fn run_source(source: &str, config: &Config) -> PilaResult<ExecResult> {
    let compiled = Pipeline::new(config).compile_source(source)?;
    let executor = Executor::with_config(
        config,
        ExecutorConfig { immediate_output: false, ..ExecutorConfig::default() },
    );
    executor.run(&compiled.program)
}

/// Compile source straight to assembly for `target`.
pub fn assemble_source(source: &str, config: &Config, target: &str) -> PilaResult<String> {
    backend::backend_for(target)?;
    let compiled = Pipeline::new(config).compile_source(source)?;
    backend::generate_assembly(&compiled.program, target)
}
