use std::process::ExitCode;

fn main() -> ExitCode {
    chowbot_cli::run()
}
