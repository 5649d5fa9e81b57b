//! `aislc [--ast-export] <input.aisl> <output.aislc>` — the AISL compiler
//! driver. Reads the entry file and its import graph, compiles them to a
//! bytecode `Module`, and writes the binary artifact. `--ast-export` also
//! writes a `<output>.ast` text dump of the compiled module alongside it.

use aisl_cli::diagnostics;
use aisl_cli::loader::{self, LoadError};
use aisl_compiler::{compile_program, CompileError};
use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "aislc", about = "Compile AISL source to a bytecode artifact")]
struct Args {
    /// Also write `<output>.ast`, the round-trippable AISLTEXT1 dump of the
    /// compiled module.
    #[arg(long)]
    ast_export: bool,

    /// Also write `<output>.dis`, a human-readable address-annotated
    /// disassembly (not round-trippable; for reading, not reloading).
    #[arg(long)]
    disassemble: bool,

    /// Entry source file.
    input: PathBuf,

    /// Path for the compiled artifact.
    output: PathBuf,
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("{message}");
            ExitCode::from(1)
        }
    }
}

fn run(args: &Args) -> Result<(), String> {
    let (entry_name, modules) = loader::load_program(&args.input).map_err(|e| report_load_error(&e))?;

    let module = compile_program(&entry_name, &modules).map_err(|e| report_compile_error(&e))?;

    std::fs::write(&args.output, module.encode())
        .map_err(|e| report_io_error(&args.output.display().to_string(), &e))?;

    if args.ast_export {
        let ast_path = args.output.with_extension("ast");
        let text = aisl_bytecode::write_text(&module);
        std::fs::write(&ast_path, text).map_err(|e| report_io_error(&ast_path.display().to_string(), &e))?;
    }

    if args.disassemble {
        let dis_path = args.output.with_extension("dis");
        let text = aisl_bytecode::disassemble(&module);
        std::fs::write(&dis_path, text).map_err(|e| report_io_error(&dis_path.display().to_string(), &e))?;
    }

    Ok(())
}

fn report_load_error(e: &LoadError) -> String {
    let (category, code, message) = match e {
        LoadError::Io { path, message } => ("I/O error", "IO", format!("{path}: {message}")),
        LoadError::Parse { path, error } => {
            ("Parse error", "PARSE", format!("{path}:{}:{}: {}", error.line, error.col, error.message))
        }
        LoadError::Resolve(re) => ("Compile error", "COMPILE", re.to_string()),
    };
    diagnostics::report(category, code, 0, 0, &message);
    message
}

fn report_compile_error(e: &CompileError) -> String {
    let message = e.to_string();
    diagnostics::report("Compile error", "COMPILE", 0, 0, &message);
    message
}

fn report_io_error(path: &str, e: &std::io::Error) -> String {
    let message = format!("{path}: {e}");
    diagnostics::report("I/O error", "IO", 0, 0, &message);
    message
}
