use std::process::ExitCode;

fn main() -> ExitCode {
    match rwskit::cli::run_cli() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            match e.downcast_ref::<rwskit::Error>() {
                Some(err) => eprintln!("error[{}]: {err}", err.kind()),
                None => eprintln!("error: {e:#}"),
            }
            ExitCode::FAILURE
        }
    }
}
