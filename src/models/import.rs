// src/models/import.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::property::{PropertyImage, PropertyType, TransactionType};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "import_source", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ImportSource {
    #[default]
    Union,
    Other,
}

impl ImportSource {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "union" => Some(ImportSource::Union),
            "other" => Some(ImportSource::Other),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "import_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ImportStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl ImportStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, ImportStatus::Completed | ImportStatus::Failed)
    }
}

/// Tipos de erro registrados durante a importação.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportErrorKind {
    XmlParse,
    MissingField,
    InvalidValue,
    XlsParse,
    OwnerNotMatched,
    Database,
}

impl ImportErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ImportErrorKind::XmlParse => "xml_parse",
            ImportErrorKind::MissingField => "missing_field",
            ImportErrorKind::InvalidValue => "invalid_value",
            ImportErrorKind::XlsParse => "xls_parse",
            ImportErrorKind::OwnerNotMatched => "owner_not_matched",
            ImportErrorKind::Database => "database",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct ImportBatch {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub source: ImportSource,
    pub status: ImportStatus,
    pub created_by: Option<Uuid>,
    pub total_xml_records: i32,
    pub total_xls_records: i32,
    pub total_properties_created: i32,
    pub total_properties_matched_existing: i32,
    pub total_owners_created: i32,
    pub total_errors: i32,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct ImportErrorEntry {
    pub error_type: String,
    pub error_message: String,
    pub record_ref: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ImportErrorList {
    pub errors: Vec<ImportErrorEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ImportStarted {
    pub batch_id: Uuid,
    pub status: ImportStatus,
}

/// Contadores acumulados pelo job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportCounters {
    pub total_xml_records: i32,
    pub total_xls_records: i32,
    pub total_properties_created: i32,
    pub total_properties_matched_existing: i32,
    pub total_owners_created: i32,
    pub total_errors: i32,
}

/// Arquivos recebidos no upload, mantidos em memória até o job rodar.
#[derive(Debug, Clone, Default)]
pub struct ImportFiles {
    pub xml: Option<Vec<u8>>,
    pub xls: Option<Vec<u8>>,
}

impl ImportFiles {
    pub fn is_empty(&self) -> bool {
        self.xml.is_none() && self.xls.is_none()
    }
}

// ---
// Registros extraídos dos arquivos
// ---

/// Um anúncio do feed XML, já convertido para os tipos do domínio.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportedListing {
    pub external_id: String,
    pub title: String,
    pub description: Option<String>,
    pub property_type: PropertyType,
    pub transaction_type: TransactionType,
    pub sale_price: Option<Decimal>,
    pub rental_price: Option<Decimal>,
    pub area_sqm: Option<Decimal>,
    pub bedrooms: Option<i32>,
    pub bathrooms: Option<i32>,
    pub parking_spaces: Option<i32>,
    pub street: Option<String>,
    pub number: Option<String>,
    pub neighborhood: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub images: Vec<PropertyImage>,
    pub features: Vec<String>,
}

/// Uma linha da planilha de proprietários.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OwnerRow {
    pub line: usize,
    pub reference: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub document: Option<String>,
}

/// Problema encontrado num registro específico (não fatal).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordIssue {
    pub kind: ImportErrorKind,
    pub record_ref: Option<String>,
    pub message: String,
}
