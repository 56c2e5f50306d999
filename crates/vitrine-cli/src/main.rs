mod cli;

use vitrine_core::ApiError;

fn main() {
    if let Err(e) = cli::run() {
        if let Some(api_err) = e.downcast_ref::<ApiError>() {
            eprintln!("Error: {}", api_err.user_message());
            if api_err.requires_login() {
                eprintln!("Run `vitrine login` to sign in again.");
            }
        } else {
            eprintln!("Error: {e:#}"); // pretty anyhow chain
        }
        std::process::exit(1);
    }
}
