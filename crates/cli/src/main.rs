use std::process::ExitCode;

fn main() -> ExitCode {
    irongpt_cli::run()
}
