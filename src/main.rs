// src/main.rs

use std::process::ExitCode;

use clap::Parser;
use imob_backend::cli::{self, Cli};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match cli::run(cli).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{:#}", e);
            eprintln!("Erro: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
