//! Main entry point for the `commit-hooks` CLI.

use commit_hooks::cli;
use std::process::ExitCode;

fn main() -> ExitCode {
    match cli::run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e}");
            u8::try_from(e.exit_code()).map_or(ExitCode::FAILURE, ExitCode::from)
        },
    }
}
