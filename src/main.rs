use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    chain_harvest::run().await
}
