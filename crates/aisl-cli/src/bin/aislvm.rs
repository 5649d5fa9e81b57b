//! `aislvm <input.aislc>` — load a compiled artifact and run it. The
//! process exits with the VM's own exit code; a fatal `VmError` is reported
//! to stderr and the process exits non-zero instead.

use aisl_bytecode::Module;
use aisl_cli::diagnostics;
use aisl_vm::Vm;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "aislvm", about = "Run a compiled AISL bytecode artifact")]
struct Args {
    /// Compiled artifact to run.
    input: PathBuf,
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(&args) {
        Ok(code) => code_to_exit(code),
        Err(message) => {
            eprintln!("{message}");
            ExitCode::from(1)
        }
    }
}

fn run(args: &Args) -> Result<i32, String> {
    let bytes = std::fs::read(&args.input).map_err(|e| {
        let message = format!("{}: {}", args.input.display(), e);
        diagnostics::report("I/O error", "IO", 0, 0, &message);
        message
    })?;

    let module = Module::decode(&bytes).map_err(|e| {
        let message = e.to_string();
        diagnostics::report("Load error", "LOAD", 0, 0, &message);
        message
    })?;

    let mut vm = Vm::new(module);
    vm.run().map_err(|e| {
        let message = e.to_string();
        diagnostics::report("Runtime error", "RUNTIME", 0, 0, &message);
        message
    })
}

fn code_to_exit(code: i32) -> ExitCode {
    ExitCode::from((code & 0xFF) as u8)
}
