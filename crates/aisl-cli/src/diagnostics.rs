//! Shared error-reporting for both binaries: colored human-readable output
//! when stderr is a terminal, a single machine-readable line otherwise (or
//! always, under `AISL_ERROR_FORMAT=machine`).

use std::io::Write;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

fn machine_format_requested() -> bool {
    std::env::var("AISL_ERROR_FORMAT").map(|v| v == "machine").unwrap_or(false)
}

/// Report a diagnostic with the given category (`"Parse error"`, `"Compile
/// error"`, ...), an AISL_ERROR_FORMAT-stable code, a 1-based line/col, and a
/// message. Line/col are `0` when the source of the error carries no
/// position information (e.g. a compile error, which is reported over an
/// already-desugared AST with no surface spans).
pub fn report(category: &str, code: &str, line: usize, col: usize, message: &str) {
    if machine_format_requested() {
        eprintln!("ERROR:{code}:{line}:{col}:{message}");
        return;
    }
    let mut stderr = StandardStream::stderr(ColorChoice::Auto);
    let mut spec = ColorSpec::new();
    spec.set_fg(Some(Color::Red)).set_bold(true);
    let _ = stderr.set_color(&spec);
    let _ = write!(stderr, "{category}: ");
    let _ = stderr.reset();
    let _ = writeln!(stderr, "{message}");
}
