use std::process::ExitCode;

fn main() -> ExitCode {
    let matches = wp_cli::command().get_matches();
    wp_cli::init_tracing(wp_cli::global_flag(&matches, "json-logs"));

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    match wp_cli::execute(&matches, &mut out) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            tracing::error!(error = %err, "command failed");
            eprintln!("error: {err:#}");
            ExitCode::from(2)
        }
    }
}
