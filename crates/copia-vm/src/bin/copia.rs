// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Copia entrypoint: the interactive interpreter and batch runner.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use copia_vm::memory::conspage::DEFAULT_MAX_PAGES;
use copia_vm::repl;
use copia_vm::{VERSION, Vm};
use tracing_subscriber::EnvFilter;

/// CLI arguments.
#[derive(Parser, Debug)]
#[command(name = "copia", version, about = "Copia - a Lisp interpreter")]
struct Args {
    /// Source files to evaluate in order; with none, enter the REPL.
    files: Vec<PathBuf>,

    /// Suppress the banner and the prompt.
    #[arg(long)]
    quiet: bool,

    /// Trace filter, e.g. `copia::eval=trace` or `trace` for everything
    /// (also honours RUST_LOG).
    #[arg(long)]
    trace: Option<String>,

    /// Maximum number of cons pages before allocation reports exhaustion.
    #[arg(long, default_value_t = DEFAULT_MAX_PAGES)]
    heap_pages: usize,
}

fn init_tracing(filter: Option<&str>) {
    let filter = filter.map_or_else(
        || EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        EnvFilter::new,
    );
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();
    init_tracing(args.trace.as_deref());

    let mut vm = Vm::with_max_pages(args.heap_pages);

    if args.quiet {
        copia_vm::ops::builtins::bind_value(&mut vm, "*prompt*", copia_vm::CellPtr::NIL);
    }

    if args.files.is_empty() {
        if !args.quiet {
            println!("Copia version {VERSION}");
        }
        repl::run(&mut vm)?;
        return Ok(ExitCode::SUCCESS);
    }

    let mut last = String::new();
    for file in &args.files {
        match repl::eval_file(&mut vm, file) {
            Ok(text) => last = text,
            Err(error) => {
                eprintln!("{error}");
                return Ok(ExitCode::FAILURE);
            }
        }
    }
    if !args.quiet {
        println!("{last}");
    }

    Ok(ExitCode::SUCCESS)
}
