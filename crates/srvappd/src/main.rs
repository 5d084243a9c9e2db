use std::process::ExitCode;

fn main() -> ExitCode {
    match srvappd::run_process() {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            // The subscriber may not be installed when bootstrap fails.
            eprintln!("srvappd: {error}");
            ExitCode::FAILURE
        }
    }
}
