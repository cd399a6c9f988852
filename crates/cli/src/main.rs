use std::process::ExitCode;

fn main() -> ExitCode {
    sfmcp_cli::run()
}
