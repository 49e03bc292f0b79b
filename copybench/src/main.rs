//! copybench command-line entry point

use std::process::ExitCode;

fn main() -> ExitCode {
    match copybench::run() {
        Ok(status) => status.into(),
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
