use std::process::ExitCode;

fn main() -> ExitCode {
    twin_cli::run()
}
