//! pila command line.
//!
//! Usage:
//!   pila run <files…> [--no-fold] [--stack N] [--memory N] [--call-depth N] [--max-inst N]
//!   pila compile <files…> -o out.s [--target gas-x86_64]
//!   pila dump <files…> [--unresolved]

use std::fs;
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use pila::backend::{self, DEFAULT_TARGET};
use pila::{Compiled, Config, ExecStatus, Executor, ExecutorConfig, OptLevel, PilaError, Pipeline};

/// Exit status for errors found before execution.
const EXIT_COMPILE_ERROR: i32 = 1;
/// Exit status for faults raised by the VM.
const EXIT_RUNTIME_ERROR: i32 = 2;

#[derive(Parser, Debug)]
#[command(name = "pila")]
#[command(about = "Compile and run programs for the pila stack language")]
struct Cli {
    /// Raise log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Interpret a program
    Run {
        /// Root source files, concatenated in order
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Skip constant folding
        #[arg(long)]
        no_fold: bool,

        /// Value stack capacity
        #[arg(long)]
        stack: Option<usize>,

        /// Memory capacity in cells
        #[arg(long)]
        memory: Option<usize>,

        /// Maximum nesting of procedure calls
        #[arg(long = "call-depth")]
        call_depth: Option<usize>,

        /// Abort after this many instructions
        #[arg(long = "max-inst")]
        max_inst: Option<u64>,
    },

    /// Emit assembly
    Compile {
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Output assembly file
        #[arg(short, long)]
        output: PathBuf,

        /// Target dialect
        #[arg(long, default_value = DEFAULT_TARGET)]
        target: String,

        /// Skip constant folding
        #[arg(long)]
        no_fold: bool,
    },

    /// Print the compiled program as JSON
    Dump {
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Stop before block resolution
        #[arg(long)]
        unresolved: bool,

        /// Skip constant folding
        #[arg(long)]
        no_fold: bool,
    },
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "pila=warn",
        1 => "pila=info",
        _ => "pila=debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn opt_level(no_fold: bool) -> OptLevel {
    if no_fold {
        OptLevel::None
    } else {
        OptLevel::Fold
    }
}

/// Run the front end, exiting on the first error.
fn compile_or_exit(pipeline: &Pipeline<'_>, files: &[PathBuf]) -> Compiled {
    match pipeline.compile_files(files) {
        Ok(compiled) => {
            for diagnostic in compiled.program.diagnostics.warnings() {
                eprintln!("{}", diagnostic);
            }
            compiled
        }
        Err(e) => {
            error!("{}", e);
            eprintln!("error[E{}]: {}", e.code(), e);
            process::exit(EXIT_COMPILE_ERROR);
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Run { files, no_fold, stack, memory, call_depth, max_inst } => {
            let mut config = Config::default();
            if let Some(capacity) = stack {
                config = config.with_stack_capacity(capacity);
            }
            if let Some(capacity) = memory {
                config = config.with_memory_capacity(capacity);
            }
            if let Some(depth) = call_depth {
                config = config.with_call_depth(depth);
            }

            let pipeline = Pipeline::new(&config).with_opt_level(opt_level(no_fold));
            let compiled = compile_or_exit(&pipeline, &files);

            let executor = Executor::with_config(
                &config,
                ExecutorConfig { max_instructions: max_inst, immediate_output: true },
            );
            match executor.run(&compiled.program) {
                Ok(result) => {
                    info!(instructions = result.instructions_executed, "finished");
                    if !result.stack.is_empty() {
                        warn!(depth = result.stack.len(), "values left on the stack");
                    }
                    if let ExecStatus::Exited(_) = result.status {
                        process::exit(result.exit_code());
                    }
                }
                Err(e) => {
                    error!(ip = ?e.ip(), "{}", e);
                    eprintln!("runtime error[E{}]: {}", e.code(), e);
                    process::exit(EXIT_RUNTIME_ERROR);
                }
            }
        }

        Command::Compile { files, output, target, no_fold } => {
            if let Err(e) = backend::backend_for(&target) {
                eprintln!("error[E{}]: {}", e.code(), e);
                process::exit(EXIT_COMPILE_ERROR);
            }

            let config = Config::default();
            let pipeline = Pipeline::new(&config).with_opt_level(opt_level(no_fold));
            let compiled = compile_or_exit(&pipeline, &files);

            let asm = match backend::generate_assembly(&compiled.program, &target) {
                Ok(asm) => asm,
                Err(e) => {
                    eprintln!("error[E{}]: {}", e.code(), e);
                    process::exit(EXIT_COMPILE_ERROR);
                }
            };
            if let Err(e) = fs::write(&output, asm) {
                let e = PilaError::Io { path: output.display().to_string(), message: e.to_string() };
                eprintln!("error[E{}]: {}", e.code(), e);
                process::exit(EXIT_COMPILE_ERROR);
            }
            info!("Wrote {}", output.display());
        }

        Command::Dump { files, unresolved, no_fold } => {
            let config = Config::default();
            let mut pipeline = Pipeline::new(&config).with_opt_level(opt_level(no_fold));
            if unresolved {
                pipeline = pipeline.unresolved();
            }
            let compiled = compile_or_exit(&pipeline, &files);

            match serde_json::to_string_pretty(&compiled.program) {
                Ok(json) => println!("{}", json),
                Err(e) => {
                    error!("Failed to serialize program: {}", e);
                    process::exit(EXIT_COMPILE_ERROR);
                }
            }
        }
    }
}
