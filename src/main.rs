use std::process::ExitCode;

fn main() -> ExitCode {
    match stocktake::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}
