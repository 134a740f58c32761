// src/cli.rs

use std::{net::SocketAddr, path::PathBuf, process::ExitCode};

use clap::{Args, Parser, Subcommand};
use tokio::net::TcpListener;
use uuid::Uuid;

use crate::{
    config::{connect_pool, AppConfig, AppState},
    import_client, maintenance,
    models::import::ImportSource,
    routes::build_router,
    telemetry,
};

#[derive(Parser, Debug)]
#[command(
    name = "imob-backend",
    about = "API multi-tenant para imobiliárias e corretores",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Sobe o servidor HTTP (comando padrão)
    Serve(ServeArgs),
    /// Aplica as migrações pendentes e sai
    Migrate,
    /// Correções pontuais de dados
    Maintenance(MaintenanceArgs),
    /// Envia arquivos para importação e acompanha o lote até o fim
    Import(ImportArgs),
}

#[derive(Args, Debug, Default)]
pub struct ServeArgs {
    /// Sobrescreve o HOST da configuração
    #[arg(long)]
    pub host: Option<String>,
    /// Sobrescreve o PORT da configuração
    #[arg(long)]
    pub port: Option<u16>,
}

#[derive(Args, Debug)]
pub struct MaintenanceArgs {
    /// Mostra o que seria feito e desfaz a transação
    #[arg(long, global = true)]
    pub dry_run: bool,

    #[command(subcommand)]
    pub command: MaintenanceCommand,
}

#[derive(Subcommand, Debug)]
pub enum MaintenanceCommand {
    /// Cria o tenant administrador da plataforma e seu usuário admin
    CreatePlatformTenant {
        #[arg(long)]
        name: String,
        #[arg(long)]
        slug: String,
        #[arg(long)]
        admin_email: String,
        #[arg(long)]
        admin_password: String,
        #[arg(long)]
        admin_name: String,
    },
    /// Torna públicos todos os imóveis (opcionalmente de um tenant)
    PublishAllProperties {
        #[arg(long)]
        tenant: Option<Uuid>,
    },
    /// Ajusta papéis de acordo com o CRECI cadastrado
    NormalizeBrokerRoles,
    /// Move um usuário para outro tenant
    MoveUser {
        #[arg(long)]
        email: String,
        #[arg(long)]
        tenant: Uuid,
    },
    /// Contagens por tenant
    Report,
}

#[derive(Args, Debug, Clone)]
pub struct ImportArgs {
    /// URL base da API, ex.: http://localhost:8080
    #[arg(long)]
    pub api_url: String,
    /// JWT de um usuário com imports.run
    #[arg(long)]
    pub token: String,
    #[arg(long)]
    pub tenant: Uuid,
    /// Feed XML de anúncios
    #[arg(long)]
    pub xml: Option<PathBuf>,
    /// Planilha de proprietários
    #[arg(long)]
    pub xls: Option<PathBuf>,
    #[arg(long, default_value = "union", value_parser = parse_source)]
    pub source: ImportSource,
    #[arg(long)]
    pub created_by: Option<Uuid>,
    /// Intervalo entre consultas do lote
    #[arg(long, default_value_t = 2)]
    pub interval_secs: u64,
    /// Desiste de acompanhar após N segundos
    #[arg(long)]
    pub timeout_secs: Option<u64>,
}

fn parse_source(value: &str) -> Result<ImportSource, String> {
    ImportSource::parse(value).ok_or_else(|| format!("source inválido: {} (use union ou other)", value))
}

pub async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let command = cli.command.unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => {
            serve(args).await?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Migrate => {
            let config = AppConfig::load()?;
            telemetry::init(&config.log_level);
            let pool = connect_pool(&config).await?;
            sqlx::migrate!().run(&pool).await?;
            tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");
            Ok(ExitCode::SUCCESS)
        }
        Command::Maintenance(args) => {
            let config = AppConfig::load()?;
            telemetry::init(&config.log_level);
            let pool = connect_pool(&config).await?;
            maintenance::run(&pool, args.command, args.dry_run).await?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Import(args) => {
            // O cliente não precisa de DATABASE_URL nem JWT_SECRET
            telemetry::init("info");
            import_client::run(args).await
        }
    }
}

async fn serve(args: ServeArgs) -> anyhow::Result<()> {
    let mut config = AppConfig::load()?;
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    telemetry::init(&config.log_level);

    let addr = config.socket_addr()?;
    let environment = config.environment;
    let app_state = AppState::new(config).await?;

    sqlx::migrate!().run(&app_state.db_pool).await?;
    tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

    app_state.rate_limiter.spawn_cleanup();
    app_state.strict_rate_limiter.spawn_cleanup();

    let app = build_router(app_state);

    let listener = TcpListener::bind(addr).await?;
    tracing::info!(environment = environment.as_str(), "🚀 Servidor escutando em {}", addr);

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Servidor encerrado");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Falha ao instalar o handler de Ctrl-C: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_subcommand_means_serve() {
        let cli = Cli::try_parse_from(["imob-backend"]).expect("parse");
        assert!(cli.command.is_none());
    }

    #[test]
    fn maintenance_accepts_dry_run_after_subcommand() {
        let cli = Cli::try_parse_from(["imob-backend", "maintenance", "publish-all-properties", "--dry-run"])
            .expect("parse");
        match cli.command {
            Some(Command::Maintenance(args)) => {
                assert!(args.dry_run);
                assert!(matches!(args.command, MaintenanceCommand::PublishAllProperties { tenant: None }));
            }
            other => panic!("comando inesperado: {:?}", other),
        }
    }

    #[test]
    fn import_defaults_and_source_validation() {
        let tenant = Uuid::new_v4().to_string();
        let base = ["imob-backend", "import", "--api-url", "http://localhost:8080", "--token", "t", "--tenant"];

        let mut argv: Vec<&str> = base.to_vec();
        argv.push(&tenant);
        let cli = Cli::try_parse_from(&argv).expect("parse");
        match cli.command {
            Some(Command::Import(args)) => {
                assert_eq!(args.source, ImportSource::Union);
                assert_eq!(args.interval_secs, 2);
                assert!(args.timeout_secs.is_none());
            }
            other => panic!("comando inesperado: {:?}", other),
        }

        argv.extend(["--source", "zap"]);
        assert!(Cli::try_parse_from(&argv).is_err());
    }
}
