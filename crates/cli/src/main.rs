use std::process::ExitCode;

fn main() -> ExitCode {
    picflow_cli::run()
}
