// src/services/import_service.rs

use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::{
        error::AppError,
        pagination::Pagination,
        slug::{generate_slug, with_suffix},
        validators::{normalize_email, normalize_phone_br},
    },
    db::{
        property_repo::{random_slug, UpsertedProperty},
        ImportRepository, OwnerRepository, PropertyRepository,
    },
    models::{
        activity::NewActivity,
        import::{
            ImportBatch, ImportCounters, ImportErrorKind, ImportErrorList, ImportFiles, ImportSource, ImportStarted,
            ImportStatus, ImportedListing, OwnerRow, RecordIssue,
        },
        owner::{ConsentOrigin, NewOwner},
        property::{PropertyDraft, PropertyStatus, Visibility},
    },
    services::{
        activity_service::{events, ActivityService},
        import_parser::{parse_listing_feed, parse_owner_sheet},
        owner_service::normalize_owner_document,
        property_service::base_slug,
    },
};

/// Slug do imóvel importado: título + código do anúncio, estável entre importações.
pub fn imported_slug(listing: &ImportedListing) -> String {
    let suffix = generate_slug(&listing.external_id);
    if suffix.is_empty() {
        base_slug(&listing.title)
    } else {
        with_suffix(&base_slug(&listing.title), &suffix)
    }
}

/// Imóveis novos entram disponíveis e privados.
pub fn draft_from_listing(listing: ImportedListing) -> PropertyDraft {
    let slug = imported_slug(&listing);
    let cover = listing.images.first().map(|i| i.url.clone());
    PropertyDraft {
        reference: Some(listing.external_id.clone()),
        external_id: Some(listing.external_id),
        slug,
        title: listing.title,
        description: listing.description,
        property_type: listing.property_type,
        transaction_type: listing.transaction_type,
        status: PropertyStatus::Available,
        visibility: Visibility::Private,
        featured: false,
        owner_id: None,
        broker_id: None,
        sale_price: listing.sale_price,
        rental_price: listing.rental_price,
        area_sqm: listing.area_sqm,
        bedrooms: listing.bedrooms,
        bathrooms: listing.bathrooms,
        parking_spaces: listing.parking_spaces,
        street: listing.street,
        number: listing.number,
        neighborhood: listing.neighborhood,
        city: listing.city,
        state: listing.state,
        zip_code: listing.zip_code,
        cover_image_url: cover,
        images: listing.images,
        features: listing.features,
    }
}

/// Converte a linha da planilha. Valores inválidos são descartados e viram avisos.
pub fn owner_from_row(row: &OwnerRow) -> (NewOwner, Vec<RecordIssue>) {
    let record_ref = Some(row.reference.clone());
    let mut issues = Vec::new();
    let mut invalid = |field: &str, value: &str| {
        issues.push(RecordIssue {
            kind: ImportErrorKind::InvalidValue,
            record_ref: record_ref.clone(),
            message: format!("Linha {}: {} inválido ({})", row.line, field, value),
        });
    };

    let email = row.email.as_deref().and_then(|v| match normalize_email(v) {
        Ok(e) => Some(e),
        Err(_) => {
            invalid("email", v);
            None
        }
    });
    let phone = row.phone.as_deref().and_then(|v| match normalize_phone_br(v) {
        Ok(p) => Some(p),
        Err(_) => {
            invalid("telefone", v);
            None
        }
    });
    let (document, document_type) = match row.document.as_deref().map(|v| (v, normalize_owner_document(v))) {
        Some((_, Ok((doc, kind)))) => (Some(doc), Some(kind)),
        Some((v, Err(_))) => {
            invalid("documento", v);
            (None, None)
        }
        None => (None, None),
    };

    let owner = NewOwner {
        name: row.name.clone(),
        email,
        phone,
        document,
        document_type,
        consent_given: false,
        consent_text: None,
        consent_origin: Some(ConsentOrigin::XlsImport),
    };
    (owner, issues)
}

#[derive(Clone)]
pub struct ImportService {
    pool: PgPool,
    import_repo: ImportRepository,
    property_repo: PropertyRepository,
    owner_repo: OwnerRepository,
    activity: ActivityService,
}

impl ImportService {
    pub fn new(
        pool: PgPool,
        import_repo: ImportRepository,
        property_repo: PropertyRepository,
        owner_repo: OwnerRepository,
        activity: ActivityService,
    ) -> Self {
        Self { pool, import_repo, property_repo, owner_repo, activity }
    }

    /// Cria o lote e dispara o job em background.
    pub async fn start(
        &self,
        tenant_id: Uuid,
        source: ImportSource,
        created_by: Uuid,
        files: ImportFiles,
    ) -> Result<ImportStarted, AppError> {
        if files.is_empty() {
            return Err(AppError::ImportFilesRequired);
        }

        let batch = self.import_repo.create_batch(tenant_id, source, Some(created_by)).await?;
        tracing::info!(
            %tenant_id,
            batch_id = %batch.id,
            xml_bytes = files.xml.as_ref().map_or(0, Vec::len),
            xls_bytes = files.xls.as_ref().map_or(0, Vec::len),
            "📦 Importação enfileirada"
        );

        let service = self.clone();
        let batch_id = batch.id;
        tokio::spawn(async move {
            service.run(tenant_id, batch_id, files).await;
        });

        Ok(ImportStarted { batch_id: batch.id, status: batch.status })
    }

    /// Executa o job até um estado final. Nunca propaga erro: tudo termina no lote.
    pub async fn run(&self, tenant_id: Uuid, batch_id: Uuid, files: ImportFiles) {
        let mut counters = ImportCounters::default();

        let outcome = match self.import_repo.mark_processing(batch_id).await {
            Ok(()) => self.process(tenant_id, batch_id, files, &mut counters).await,
            Err(e) => Err(e),
        };

        let (status, event) = match &outcome {
            Ok(()) => (ImportStatus::Completed, events::IMPORT_COMPLETED),
            Err(e) => {
                tracing::error!(%batch_id, "Importação falhou: {}", e);
                (ImportStatus::Failed, events::IMPORT_FAILED)
            }
        };

        if let Err(e) = self.import_repo.finish(batch_id, status, &counters).await {
            tracing::error!(%batch_id, "Não foi possível encerrar o lote: {}", e);
        }

        tracing::info!(
            %batch_id,
            status = ?status,
            created = counters.total_properties_created,
            matched = counters.total_properties_matched_existing,
            owners = counters.total_owners_created,
            errors = counters.total_errors,
            "Importação finalizada"
        );
        self.activity
            .record(NewActivity::by_system(
                tenant_id,
                event,
                json!({
                    "batch_id": batch_id,
                    "total_xml_records": counters.total_xml_records,
                    "total_xls_records": counters.total_xls_records,
                    "total_properties_created": counters.total_properties_created,
                    "total_properties_matched_existing": counters.total_properties_matched_existing,
                    "total_owners_created": counters.total_owners_created,
                    "total_errors": counters.total_errors,
                }),
            ))
            .await;
    }

    // `Err` aqui é sempre fatal para o lote.
    async fn process(
        &self,
        tenant_id: Uuid,
        batch_id: Uuid,
        files: ImportFiles,
        counters: &mut ImportCounters,
    ) -> Result<(), AppError> {
        if let Some(xml) = files.xml {
            let feed = match parse_listing_feed(&xml) {
                Ok(feed) => feed,
                Err(message) => {
                    self.import_repo
                        .add_error(batch_id, ImportErrorKind::XmlParse, &message, None)
                        .await?;
                    counters.total_errors += 1;
                    return Err(AppError::InvalidInput(message));
                }
            };

            counters.total_xml_records = feed.total_records as i32;
            for problem in &feed.issues {
                self.record_issue(batch_id, problem, counters).await?;
            }
            for listing in feed.listings {
                self.import_listing(tenant_id, batch_id, listing, counters).await?;
            }
        }

        if let Some(xls) = files.xls {
            match parse_owner_sheet(&xls) {
                Ok(sheet) => {
                    counters.total_xls_records = sheet.total_records as i32;
                    for problem in &sheet.issues {
                        self.record_issue(batch_id, problem, counters).await?;
                    }
                    for row in &sheet.rows {
                        self.import_owner(tenant_id, batch_id, row, counters).await?;
                    }
                }
                Err(message) => {
                    let problem = RecordIssue { kind: ImportErrorKind::XlsParse, record_ref: None, message };
                    self.record_issue(batch_id, &problem, counters).await?;
                }
            }
        }
        Ok(())
    }

    async fn record_issue(&self, batch_id: Uuid, problem: &RecordIssue, counters: &mut ImportCounters) -> Result<(), AppError> {
        self.import_repo
            .add_error(batch_id, problem.kind, &problem.message, problem.record_ref.as_deref())
            .await?;
        counters.total_errors += 1;
        Ok(())
    }

    async fn import_listing(
        &self,
        tenant_id: Uuid,
        batch_id: Uuid,
        listing: ImportedListing,
        counters: &mut ImportCounters,
    ) -> Result<(), AppError> {
        let external_id = listing.external_id.clone();
        let mut draft = draft_from_listing(listing);
        match self.upsert_listing(tenant_id, &external_id, &mut draft).await {
            Ok(upserted) if upserted.inserted => counters.total_properties_created += 1,
            Ok(_) => counters.total_properties_matched_existing += 1,
            // Falha de um registro não derruba o lote.
            Err(e) => {
                let problem = RecordIssue {
                    kind: ImportErrorKind::Database,
                    record_ref: Some(external_id),
                    message: e.to_string(),
                };
                self.record_issue(batch_id, &problem, counters).await?;
            }
        }
        Ok(())
    }

    // Na atualização o slug atual é mantido; só imóveis novos precisam de um slug livre.
    async fn upsert_listing(
        &self,
        tenant_id: Uuid,
        external_id: &str,
        draft: &mut PropertyDraft,
    ) -> Result<UpsertedProperty, AppError> {
        if !self.property_repo.external_id_exists(tenant_id, external_id).await? {
            draft.slug = self.property_repo.available_slug(tenant_id, &draft.slug).await?;
        }
        match self.property_repo.upsert_imported(&self.pool, tenant_id, draft).await {
            // Outro cadastro levou o slug entre a consulta e o insert.
            Err(AppError::SlugAlreadyExists(_)) => {
                draft.slug = random_slug(&draft.slug);
                self.property_repo.upsert_imported(&self.pool, tenant_id, draft).await
            }
            other => other,
        }
    }

    async fn import_owner(
        &self,
        tenant_id: Uuid,
        batch_id: Uuid,
        row: &OwnerRow,
        counters: &mut ImportCounters,
    ) -> Result<(), AppError> {
        if !self.property_repo.external_id_exists(tenant_id, &row.reference).await? {
            let problem = RecordIssue {
                kind: ImportErrorKind::OwnerNotMatched,
                record_ref: Some(row.reference.clone()),
                message: format!("Linha {}: nenhum imóvel com a referência {}", row.line, row.reference),
            };
            return self.record_issue(batch_id, &problem, counters).await;
        }

        let (owner, issues) = owner_from_row(row);
        for problem in &issues {
            self.record_issue(batch_id, problem, counters).await?;
        }

        match self.create_and_link_owner(tenant_id, &row.reference, &owner).await {
            Ok(()) => counters.total_owners_created += 1,
            Err(e) => {
                let problem = RecordIssue {
                    kind: ImportErrorKind::Database,
                    record_ref: Some(row.reference.clone()),
                    message: e.to_string(),
                };
                self.record_issue(batch_id, &problem, counters).await?;
            }
        }
        Ok(())
    }

    // Proprietário e vínculo entram juntos ou não entram.
    async fn create_and_link_owner(&self, tenant_id: Uuid, reference: &str, owner: &NewOwner) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        let created = self.owner_repo.create(&mut *tx, tenant_id, owner).await?;
        self.property_repo
            .link_owner_by_external_id(&mut *tx, tenant_id, reference, created.id)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    // ---
    // Consultas
    // ---

    pub async fn list(&self, tenant_id: Uuid, pagination: &Pagination) -> Result<Vec<ImportBatch>, AppError> {
        self.import_repo
            .list(tenant_id, pagination.limit(), pagination.offset())
            .await
    }

    pub async fn get(&self, tenant_id: Uuid, id: Uuid) -> Result<ImportBatch, AppError> {
        self.import_repo
            .find(tenant_id, id)
            .await?
            .ok_or(AppError::ImportBatchNotFound)
    }

    pub async fn errors(&self, tenant_id: Uuid, id: Uuid) -> Result<ImportErrorList, AppError> {
        let batch = self.get(tenant_id, id).await?;
        let errors = self.import_repo.errors(batch.id).await?;
        Ok(ImportErrorList { errors })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        owner::OwnerStatus,
        property::{PropertyImage, PropertyType, TransactionType},
        tenancy::DocumentType,
    };

    fn listing() -> ImportedListing {
        ImportedListing {
            external_id: "AP-001".into(),
            title: "Apartamento Centro".into(),
            description: None,
            property_type: PropertyType::Apartment,
            transaction_type: TransactionType::Sale,
            sale_price: None,
            rental_price: None,
            area_sqm: None,
            bedrooms: Some(2),
            bathrooms: None,
            parking_spaces: None,
            street: None,
            number: None,
            neighborhood: None,
            city: Some("Campinas".into()),
            state: Some("SP".into()),
            zip_code: None,
            images: vec![PropertyImage { url: "https://cdn.example.com/a.jpg".into(), caption: None, order: 0 }],
            features: vec![],
        }
    }

    #[test]
    fn imported_property_starts_private_and_available() {
        let draft = draft_from_listing(listing());
        assert_eq!(draft.status, PropertyStatus::Available);
        assert_eq!(draft.visibility, Visibility::Private);
        assert_eq!(draft.external_id.as_deref(), Some("AP-001"));
        assert_eq!(draft.cover_image_url.as_deref(), Some("https://cdn.example.com/a.jpg"));
    }

    #[test]
    fn imported_slug_includes_listing_code() {
        assert_eq!(imported_slug(&listing()), "apartamento-centro-ap-001");
    }

    #[test]
    fn distinct_listing_codes_can_share_a_base_slug() {
        // Por isso o slug ainda passa por `available_slug` antes do insert.
        let mut first = listing();
        first.external_id = "AP-1".into();
        first.title = "Casa".into();
        let mut second = first.clone();
        second.external_id = "ap 1".into();
        assert_eq!(imported_slug(&first), imported_slug(&second));
    }

    #[test]
    fn owner_row_keeps_valid_fields_and_reports_the_rest() {
        let row = OwnerRow {
            line: 3,
            reference: "AP-001".into(),
            name: Some("José".into()),
            email: Some("não-é-email".into()),
            phone: Some("(11) 98765-4321".into()),
            document: Some("529.982.247-25".into()),
        };
        let (owner, issues) = owner_from_row(&row);
        assert_eq!(owner.email, None);
        assert_eq!(owner.phone.as_deref(), Some("11987654321"));
        assert_eq!(owner.document_type, Some(DocumentType::Cpf));
        assert_eq!(owner.consent_origin, Some(ConsentOrigin::XlsImport));
        assert_eq!(owner.completeness(), OwnerStatus::Partial);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].kind, ImportErrorKind::InvalidValue);
    }
}
