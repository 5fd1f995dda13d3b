use std::process::ExitCode;

fn main() -> ExitCode {
    match std::panic::catch_unwind(dlock_lib::run) {
        Ok(0) => ExitCode::SUCCESS,
        Ok(code) => ExitCode::from(u8::try_from(code).unwrap_or(1)),
        Err(_) => {
            eprintln!("Unexpected error, exiting");
            ExitCode::from(1)
        }
    }
}
