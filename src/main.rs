use std::io::{self, BufRead};
use std::process::ExitCode;

use binlog_format::{analyze, ParsedFormat};
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

/// Prints the argument slots of each format string given on the command line,
/// or of each line on stdin when there are no arguments. Exits with status 1
/// if any format string has a bad specifier.
fn main() -> ExitCode {
    let (writer, _guard) = tracing_appender::non_blocking(io::stderr());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(writer)
        .init();

    let formats: Vec<String> = std::env::args().skip(1).collect();
    let formats = if formats.is_empty() {
        match io::stdin().lock().lines().collect::<io::Result<Vec<_>>>() {
            Ok(lines) => lines,
            Err(err) => {
                error!(%err, "failed to read format strings from stdin");
                return ExitCode::FAILURE;
            }
        }
    } else {
        formats
    };

    let mut all_valid = true;
    for fmt in &formats {
        let parsed = analyze(fmt);
        debug!(format = %fmt, params = parsed.len(), "inspected format");
        all_valid &= parsed.is_valid();
        print_report(fmt, &parsed);
    }

    if all_valid {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn print_report(fmt: &str, parsed: &ParsedFormat) {
    println!("{fmt:?}: {} argument(s)", parsed.len());
    for (slot, kind) in parsed.iter().enumerate() {
        println!("  {slot}: {kind:?}");
    }
    for issue in parsed.issues() {
        println!("  error: {issue}");
    }
}
