// src/models/property.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

// --- Enums ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "property_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PropertyType {
    Apartment,
    House,
    Land,
    Commercial,
    NewDevelopment,
    CondoLot,
    BuildingLot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "property_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PropertyStatus {
    Available,
    Unavailable,
    PendingConfirmation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "property_visibility", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Private,
    Network,
    Marketplace,
    Public,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "transaction_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Sale,
    Rent,
    Both,
}

impl TransactionType {
    pub fn includes_sale(self) -> bool {
        matches!(self, TransactionType::Sale | TransactionType::Both)
    }

    pub fn includes_rent(self) -> bool {
        matches!(self, TransactionType::Rent | TransactionType::Both)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PropertyImage {
    pub url: String,
    pub caption: Option<String>,
    #[serde(default)]
    pub order: i32,
}

// ---
// Property (imóvel anunciado)
// ---
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct Property {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub owner_id: Option<Uuid>,
    pub broker_id: Option<Uuid>,
    /// Chave do registro no feed de importação
    pub external_id: Option<String>,
    pub reference: Option<String>,
    pub slug: String,
    #[schema(example = "Apartamento 3 quartos no Centro")]
    pub title: String,
    pub description: Option<String>,
    pub property_type: PropertyType,
    pub status: PropertyStatus,
    pub visibility: Visibility,
    pub transaction_type: TransactionType,
    pub featured: bool,
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
    pub cover_image_url: Option<String>,
    #[schema(value_type = Vec<PropertyImage>)]
    pub images: Json<Vec<PropertyImage>>,
    pub features: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Property {
    /// Referência exibida ao cliente (código do anúncio ou título).
    pub fn display_reference(&self) -> &str {
        self.reference
            .as_deref()
            .or(self.external_id.as_deref())
            .unwrap_or(&self.title)
    }
}

/// Projeção pública do imóvel (sem proprietário nem endereço completo).
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PublicProperty {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub broker_id: Option<Uuid>,
    pub slug: String,
    pub reference: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub property_type: PropertyType,
    pub transaction_type: TransactionType,
    pub featured: bool,
    pub sale_price: Option<Decimal>,
    pub rental_price: Option<Decimal>,
    pub area_sqm: Option<Decimal>,
    pub bedrooms: Option<i32>,
    pub bathrooms: Option<i32>,
    pub parking_spaces: Option<i32>,
    pub neighborhood: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub cover_image_url: Option<String>,
    pub images: Vec<PropertyImage>,
    pub features: Vec<String>,
}

impl From<Property> for PublicProperty {
    fn from(p: Property) -> Self {
        Self {
            id: p.id,
            tenant_id: p.tenant_id,
            broker_id: p.broker_id,
            slug: p.slug,
            reference: p.reference,
            title: p.title,
            description: p.description,
            property_type: p.property_type,
            transaction_type: p.transaction_type,
            featured: p.featured,
            sale_price: p.sale_price,
            rental_price: p.rental_price,
            area_sqm: p.area_sqm,
            bedrooms: p.bedrooms,
            bathrooms: p.bathrooms,
            parking_spaces: p.parking_spaces,
            neighborhood: p.neighborhood,
            city: p.city,
            state: p.state,
            cover_image_url: p.cover_image_url,
            images: p.images.0,
            features: p.features,
        }
    }
}

// ---
// Payloads
// ---

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreatePropertyPayload {
    #[validate(length(min = 1, max = 255, message = "required"))]
    pub title: String,
    pub description: Option<String>,
    pub reference: Option<String>,
    pub property_type: PropertyType,
    pub transaction_type: TransactionType,
    pub status: Option<PropertyStatus>,
    pub visibility: Option<Visibility>,
    #[serde(default)]
    pub featured: bool,
    pub owner_id: Option<Uuid>,
    pub broker_id: Option<Uuid>,
    pub sale_price: Option<Decimal>,
    pub rental_price: Option<Decimal>,
    pub area_sqm: Option<Decimal>,
    #[validate(range(min = 0, message = "negative_value"))]
    pub bedrooms: Option<i32>,
    #[validate(range(min = 0, message = "negative_value"))]
    pub bathrooms: Option<i32>,
    #[validate(range(min = 0, message = "negative_value"))]
    pub parking_spaces: Option<i32>,
    pub street: Option<String>,
    pub number: Option<String>,
    pub neighborhood: Option<String>,
    pub city: Option<String>,
    #[validate(length(equal = 2, message = "invalid_value"))]
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub cover_image_url: Option<String>,
    #[serde(default)]
    pub images: Vec<PropertyImage>,
    #[serde(default)]
    pub features: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdatePropertyPayload {
    #[validate(length(min = 1, max = 255, message = "required"))]
    pub title: Option<String>,
    pub description: Option<String>,
    pub reference: Option<String>,
    pub property_type: Option<PropertyType>,
    pub transaction_type: Option<TransactionType>,
    pub featured: Option<bool>,
    pub owner_id: Option<Uuid>,
    pub broker_id: Option<Uuid>,
    pub sale_price: Option<Decimal>,
    pub rental_price: Option<Decimal>,
    pub area_sqm: Option<Decimal>,
    #[validate(range(min = 0, message = "negative_value"))]
    pub bedrooms: Option<i32>,
    #[validate(range(min = 0, message = "negative_value"))]
    pub bathrooms: Option<i32>,
    #[validate(range(min = 0, message = "negative_value"))]
    pub parking_spaces: Option<i32>,
    pub street: Option<String>,
    pub number: Option<String>,
    pub neighborhood: Option<String>,
    pub city: Option<String>,
    #[validate(length(equal = 2, message = "invalid_value"))]
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub cover_image_url: Option<String>,
    pub images: Option<Vec<PropertyImage>>,
    pub features: Option<Vec<String>>,
    /// Campos opcionais a esvaziar. Campo ausente no JSON significa "não alterar".
    #[serde(default)]
    pub clear: Vec<ClearableField>,
}

/// Campos anuláveis do imóvel que a edição pode limpar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ClearableField {
    Description,
    Reference,
    OwnerId,
    BrokerId,
    SalePrice,
    RentalPrice,
    AreaSqm,
    Bedrooms,
    Bathrooms,
    ParkingSpaces,
    Street,
    Number,
    Neighborhood,
    City,
    State,
    ZipCode,
    CoverImageUrl,
}

impl ClearableField {
    /// Nome da coluna; casa com os `CASE WHEN` do UPDATE.
    pub fn column(self) -> &'static str {
        match self {
            ClearableField::Description => "description",
            ClearableField::Reference => "reference",
            ClearableField::OwnerId => "owner_id",
            ClearableField::BrokerId => "broker_id",
            ClearableField::SalePrice => "sale_price",
            ClearableField::RentalPrice => "rental_price",
            ClearableField::AreaSqm => "area_sqm",
            ClearableField::Bedrooms => "bedrooms",
            ClearableField::Bathrooms => "bathrooms",
            ClearableField::ParkingSpaces => "parking_spaces",
            ClearableField::Street => "street",
            ClearableField::Number => "number",
            ClearableField::Neighborhood => "neighborhood",
            ClearableField::City => "city",
            ClearableField::State => "state",
            ClearableField::ZipCode => "zip_code",
            ClearableField::CoverImageUrl => "cover_image_url",
        }
    }
}

impl UpdatePropertyPayload {
    pub fn clears(&self, field: ClearableField) -> bool {
        self.clear.contains(&field)
    }

    pub fn cleared_columns(&self) -> Vec<String> {
        self.clear.iter().map(|f| f.column().to_string()).collect()
    }

    /// Valor e limpeza do mesmo campo na mesma requisição são ambíguos.
    pub fn check_clear(&self) -> Result<(), String> {
        let sent = |field: ClearableField| match field {
            ClearableField::Description => self.description.is_some(),
            ClearableField::Reference => self.reference.is_some(),
            ClearableField::OwnerId => self.owner_id.is_some(),
            ClearableField::BrokerId => self.broker_id.is_some(),
            ClearableField::SalePrice => self.sale_price.is_some(),
            ClearableField::RentalPrice => self.rental_price.is_some(),
            ClearableField::AreaSqm => self.area_sqm.is_some(),
            ClearableField::Bedrooms => self.bedrooms.is_some(),
            ClearableField::Bathrooms => self.bathrooms.is_some(),
            ClearableField::ParkingSpaces => self.parking_spaces.is_some(),
            ClearableField::Street => self.street.is_some(),
            ClearableField::Number => self.number.is_some(),
            ClearableField::Neighborhood => self.neighborhood.is_some(),
            ClearableField::City => self.city.is_some(),
            ClearableField::State => self.state.is_some(),
            ClearableField::ZipCode => self.zip_code.is_some(),
            ClearableField::CoverImageUrl => self.cover_image_url.is_some(),
        };
        match self.clear.iter().find(|f| sent(**f)) {
            Some(field) => Err(format!("{} foi enviado e também marcado para limpar", field.column())),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct PropertyStatusPayload {
    pub status: PropertyStatus,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct PropertyVisibilityPayload {
    pub visibility: Visibility,
}

/// Confere preços contra o tipo de transação.
pub fn check_prices(
    transaction_type: TransactionType,
    sale_price: Option<Decimal>,
    rental_price: Option<Decimal>,
) -> Result<(), String> {
    for price in [sale_price, rental_price].into_iter().flatten() {
        if price.is_sign_negative() {
            return Err("Os preços não podem ser negativos".into());
        }
    }
    if transaction_type.includes_sale() && sale_price.is_none() {
        return Err("sale_price é obrigatório para venda".into());
    }
    if transaction_type.includes_rent() && rental_price.is_none() {
        return Err("rental_price é obrigatório para locação".into());
    }
    Ok(())
}

/// Campos de inserção, vindos do cadastro manual ou da importação.
#[derive(Debug, Clone)]
pub struct PropertyDraft {
    pub external_id: Option<String>,
    pub reference: Option<String>,
    pub slug: String,
    pub title: String,
    pub description: Option<String>,
    pub property_type: PropertyType,
    pub transaction_type: TransactionType,
    pub status: PropertyStatus,
    pub visibility: Visibility,
    pub featured: bool,
    pub owner_id: Option<Uuid>,
    pub broker_id: Option<Uuid>,
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
    pub cover_image_url: Option<String>,
    pub images: Vec<PropertyImage>,
    pub features: Vec<String>,
}

impl PropertyDraft {
    pub fn from_payload(p: CreatePropertyPayload, slug: String) -> Self {
        // Sem capa explícita, a primeira imagem vira capa.
        let cover = p
            .cover_image_url
            .or_else(|| p.images.iter().min_by_key(|i| i.order).map(|i| i.url.clone()));
        Self {
            external_id: None,
            reference: p.reference,
            slug,
            title: p.title,
            description: p.description,
            property_type: p.property_type,
            transaction_type: p.transaction_type,
            status: p.status.unwrap_or(PropertyStatus::Available),
            visibility: p.visibility.unwrap_or(Visibility::Private),
            featured: p.featured,
            owner_id: p.owner_id,
            broker_id: p.broker_id,
            sale_price: p.sale_price,
            rental_price: p.rental_price,
            area_sqm: p.area_sqm,
            bedrooms: p.bedrooms,
            bathrooms: p.bathrooms,
            parking_spaces: p.parking_spaces,
            street: p.street,
            number: p.number,
            neighborhood: p.neighborhood,
            city: p.city,
            state: p.state.map(|s| s.to_uppercase()),
            zip_code: p.zip_code,
            cover_image_url: cover,
            images: p.images,
            features: p.features,
        }
    }
}

// ---
// Filtros
// ---

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PropertyListQuery {
    pub status: Option<PropertyStatus>,
    pub visibility: Option<Visibility>,
    pub property_type: Option<PropertyType>,
    pub transaction_type: Option<TransactionType>,
    pub city: Option<String>,
    pub broker_id: Option<Uuid>,
    /// Busca por título ou referência
    pub search: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PublicPropertyQuery {
    /// Slug do tenant
    pub tenant: Option<String>,
    pub transaction_type: Option<TransactionType>,
    pub property_type: Option<PropertyType>,
    pub city: Option<String>,
    pub neighborhood: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    /// Mínimo de quartos
    pub bedrooms: Option<i32>,
    /// Mínimo de vagas
    pub parking_spaces: Option<i32>,
    pub min_area: Option<Decimal>,
    pub max_area: Option<Decimal>,
    pub featured: Option<bool>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl PublicPropertyQuery {
    /// Para locação os limites de preço valem sobre o aluguel.
    pub fn price_column(&self) -> &'static str {
        match self.transaction_type {
            Some(TransactionType::Rent) => "rental_price",
            _ => "sale_price",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn prices_must_match_transaction() {
        let p = Some(Decimal::new(500_000, 0));
        assert!(check_prices(TransactionType::Sale, p, None).is_ok());
        assert!(check_prices(TransactionType::Sale, None, p).is_err());
        assert!(check_prices(TransactionType::Rent, None, p).is_ok());
        assert!(check_prices(TransactionType::Both, p, None).is_err());
        assert!(check_prices(TransactionType::Both, p, p).is_ok());
    }

    #[test]
    fn negative_prices_are_rejected() {
        let neg = Some(Decimal::new(-1, 0));
        assert!(check_prices(TransactionType::Sale, neg, None).is_err());
    }

    #[test]
    fn rent_filters_on_rental_price() {
        let q = PublicPropertyQuery {
            transaction_type: Some(TransactionType::Rent),
            ..Default::default()
        };
        assert_eq!(q.price_column(), "rental_price");
        assert_eq!(PublicPropertyQuery::default().price_column(), "sale_price");
    }

    #[test]
    fn update_payload_lists_columns_to_clear() {
        let changes: UpdatePropertyPayload =
            serde_json::from_value(serde_json::json!({ "clear": ["sale_price", "owner_id"] })).unwrap();
        assert!(changes.clears(ClearableField::SalePrice));
        assert_eq!(changes.cleared_columns(), vec!["sale_price", "owner_id"]);
        assert!(changes.check_clear().is_ok());

        let missing: UpdatePropertyPayload = serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(missing.clear.is_empty());
    }

    #[test]
    fn value_and_clear_for_same_field_conflict() {
        let changes = UpdatePropertyPayload {
            city: Some("Campinas".into()),
            clear: vec![ClearableField::City],
            ..Default::default()
        };
        assert!(changes.check_clear().is_err());
    }
}
