//! Binary entrypoint for the `redeemer` CLI.

use std::process;

#[tokio::main]
async fn main() {
    let exit_code = redeemer_cli::run().await;
    process::exit(exit_code);
}
