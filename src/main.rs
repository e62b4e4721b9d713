//! macbundler - bundle, sign and package macOS applications.

use std::process;

#[tokio::main]
async fn main() {
    let exit_code = match macbundler::cli::run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    };

    process::exit(exit_code);
}
