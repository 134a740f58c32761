// src/import_client.rs

use std::{path::Path, process::ExitCode, time::Duration};

use anyhow::Context;
use reqwest::{multipart, Client};
use uuid::Uuid;

use crate::{
    cli::ImportArgs,
    models::import::{ImportBatch, ImportErrorEntry, ImportErrorList, ImportStarted, ImportStatus},
};

/// Como terminou o acompanhamento de um lote.
#[derive(Debug)]
pub enum PollOutcome {
    Finished(ImportBatch),
    Cancelled,
    TimedOut,
}

impl PollOutcome {
    pub fn exit_status(&self) -> u8 {
        match self {
            PollOutcome::Finished(batch) if batch.status == ImportStatus::Completed => 0,
            PollOutcome::Finished(_) => 1,
            // Interrompido pelo usuário ou pelo timeout; o job segue no servidor
            PollOutcome::Cancelled | PollOutcome::TimedOut => 2,
        }
    }
}

struct ImportClient {
    http: Client,
    base: String,
    token: String,
}

impl ImportClient {
    fn new(api_url: &str, tenant: Uuid, token: String) -> anyhow::Result<Self> {
        let http = Client::builder().timeout(Duration::from_secs(60)).build()?;
        let base = format!("{}/api/v1/admin/{}/import", api_url.trim_end_matches('/'), tenant);
        Ok(Self { http, base, token })
    }

    async fn upload(&self, args: &ImportArgs) -> anyhow::Result<ImportStarted> {
        let mut form = multipart::Form::new().text("source", source_name(args));
        if let Some(created_by) = args.created_by {
            form = form.text("created_by", created_by.to_string());
        }
        if let Some(path) = &args.xml {
            form = form.part("xml", file_part(path).await?);
        }
        if let Some(path) = &args.xls {
            form = form.part("xls", file_part(path).await?);
        }

        let response = self
            .http
            .post(format!("{}/properties", self.base))
            .bearer_auth(&self.token)
            .multipart(form)
            .send()
            .await
            .context("falha ao enviar os arquivos")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("upload recusado ({}): {}", status, body);
        }
        Ok(response.json::<ImportStarted>().await?)
    }

    async fn batch(&self, id: Uuid) -> anyhow::Result<ImportBatch> {
        let response = self
            .http
            .get(format!("{}/batches/{}", self.base, id))
            .bearer_auth(&self.token)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json::<ImportBatch>().await?)
    }

    async fn errors(&self, id: Uuid) -> anyhow::Result<Vec<ImportErrorEntry>> {
        let response = self
            .http
            .get(format!("{}/batches/{}/errors", self.base, id))
            .bearer_auth(&self.token)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json::<ImportErrorList>().await?.errors)
    }

    /// Consulta o lote até um estado final. Falhas de consulta não interrompem o laço.
    async fn poll(&self, id: Uuid, interval: Duration) -> ImportBatch {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            match self.batch(id).await {
                Ok(batch) if batch.status.is_terminal() => return batch,
                Ok(batch) => {
                    tracing::info!(
                        status = ?batch.status,
                        xml = batch.total_xml_records,
                        created = batch.total_properties_created,
                        errors = batch.total_errors,
                        "Lote em andamento"
                    );
                }
                Err(e) => tracing::warn!("Falha ao consultar o lote {}: {:#}", id, e),
            }
        }
    }
}

fn source_name(args: &ImportArgs) -> String {
    serde_json::to_value(args.source)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_else(|| "union".to_string())
}

async fn file_part(path: &Path) -> anyhow::Result<multipart::Part> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("não foi possível ler {}", path.display()))?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string());
    Ok(multipart::Part::bytes(bytes).file_name(file_name))
}

pub fn format_summary(batch: &ImportBatch, errors: &[ImportErrorEntry]) -> String {
    let mut lines = vec![
        format!("Lote {}: {:?}", batch.id, batch.status),
        format!("  registros XML:        {}", batch.total_xml_records),
        format!("  registros planilha:   {}", batch.total_xls_records),
        format!("  imóveis criados:      {}", batch.total_properties_created),
        format!("  imóveis já existentes: {}", batch.total_properties_matched_existing),
        format!("  proprietários criados: {}", batch.total_owners_created),
        format!("  erros:                {}", batch.total_errors),
    ];
    for error in errors {
        let reference = error.record_ref.as_deref().unwrap_or("-");
        lines.push(format!("  - [{}] {}: {}", error.error_type, reference, error.error_message));
    }
    lines.join("\n")
}

pub async fn run(args: ImportArgs) -> anyhow::Result<ExitCode> {
    anyhow::ensure!(args.xml.is_some() || args.xls.is_some(), "informe --xml e/ou --xls");
    anyhow::ensure!(args.interval_secs > 0, "--interval-secs deve ser maior que zero");

    let client = ImportClient::new(&args.api_url, args.tenant, args.token.clone())?;
    let started = client.upload(&args).await?;
    tracing::info!(batch_id = %started.batch_id, "Lote criado; acompanhando o processamento");

    let interval = Duration::from_secs(args.interval_secs);
    let deadline = async {
        match args.timeout_secs {
            Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
            None => std::future::pending::<()>().await,
        }
    };

    let outcome = tokio::select! {
        batch = client.poll(started.batch_id, interval) => PollOutcome::Finished(batch),
        _ = tokio::signal::ctrl_c() => PollOutcome::Cancelled,
        _ = deadline => PollOutcome::TimedOut,
    };

    match &outcome {
        PollOutcome::Finished(batch) => {
            let errors = if batch.total_errors > 0 {
                client.errors(batch.id).await.unwrap_or_else(|e| {
                    tracing::warn!("Falha ao buscar os erros do lote: {:#}", e);
                    Vec::new()
                })
            } else {
                Vec::new()
            };
            println!("{}", format_summary(batch, &errors));
        }
        PollOutcome::Cancelled => {
            println!("Acompanhamento interrompido; o lote {} continua no servidor", started.batch_id)
        }
        PollOutcome::TimedOut => {
            println!("Tempo esgotado; o lote {} continua no servidor", started.batch_id)
        }
    }

    Ok(ExitCode::from(outcome.exit_status()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::import::ImportSource;
    use axum::{http::StatusCode, response::IntoResponse, routing::get, Json, Router};
    use chrono::Utc;
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    fn batch(status: ImportStatus, total_errors: i32) -> ImportBatch {
        ImportBatch {
            id: Uuid::nil(),
            tenant_id: Uuid::nil(),
            source: ImportSource::Union,
            status,
            created_by: None,
            total_xml_records: 10,
            total_xls_records: 4,
            total_properties_created: 7,
            total_properties_matched_existing: 2,
            total_owners_created: 3,
            total_errors,
            started_at: None,
            completed_at: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn exit_code_reflects_final_status() {
        assert_eq!(PollOutcome::Finished(batch(ImportStatus::Completed, 0)).exit_status(), 0);
        assert_eq!(PollOutcome::Finished(batch(ImportStatus::Failed, 1)).exit_status(), 1);
        assert_eq!(PollOutcome::TimedOut.exit_status(), 2);
        assert_eq!(PollOutcome::Cancelled.exit_status(), 2);
    }

    #[test]
    fn summary_lists_counters_and_errors() {
        let errors = vec![ImportErrorEntry {
            error_type: "missing_field".into(),
            error_message: "Título ausente".into(),
            record_ref: Some("AP-12".into()),
            created_at: Utc::now(),
        }];
        let summary = format_summary(&batch(ImportStatus::Completed, 1), &errors);
        assert!(summary.contains("Completed"));
        assert!(summary.contains("imóveis criados:      7"));
        assert!(summary.contains("- [missing_field] AP-12: Título ausente"));
    }

    // Servidor local que falha, devolve lixo e só depois conclui o lote.
    async fn flaky_server() -> String {
        let calls = Arc::new(AtomicUsize::new(0));
        let app = Router::new().route(
            "/api/v1/admin/{tenant}/import/batches/{id}",
            get(move || {
                let calls = calls.clone();
                async move {
                    match calls.fetch_add(1, Ordering::SeqCst) {
                        0 => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
                        1 => "{ não é json".into_response(),
                        2 => Json(batch(ImportStatus::Processing, 0)).into_response(),
                        _ => Json(batch(ImportStatus::Completed, 0)).into_response(),
                    }
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn poll_survives_server_errors_until_terminal_state() {
        let api_url = flaky_server().await;
        let client = ImportClient::new(&api_url, Uuid::new_v4(), "token".into()).expect("client");

        let finished = tokio::time::timeout(
            Duration::from_secs(10),
            client.poll(Uuid::nil(), Duration::from_millis(10)),
        )
        .await
        .expect("poll terminou");
        assert_eq!(finished.status, ImportStatus::Completed);
    }

    #[tokio::test]
    async fn unreachable_server_is_an_error_not_a_panic() {
        // Porta fechada: erro de transporte
        let client = ImportClient::new("http://127.0.0.1:1", Uuid::new_v4(), "token".into()).expect("client");
        assert!(client.batch(Uuid::nil()).await.is_err());
    }
}
