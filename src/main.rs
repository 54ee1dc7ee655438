use std::process::ExitCode;

fn main() -> ExitCode {
    match hotel_insights::run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
