// src/telemetry.rs

use tracing_subscriber::EnvFilter;

/// `RUST_LOG` tem precedência; sem ele vale o `LOG_LEVEL` da configuração.
pub fn env_filter(log_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

pub fn init(log_level: &str) {
    // try_init: nos testes o subscriber pode já estar instalado
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter(log_level))
        .with_target(false)
        .compact()
        .try_init();
}
