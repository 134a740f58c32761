// src/services/property_service.rs

use rust_decimal::Decimal;
use serde_json::json;
use uuid::Uuid;

use crate::{
    common::{
        error::AppError,
        pagination::Pagination,
        slug::generate_slug,
    },
    db::{OwnerRepository, PropertyRepository, UserRepository},
    middleware::auth::AuthenticatedUser,
    models::{
        activity::NewActivity,
        property::{
            check_prices, ClearableField, CreatePropertyPayload, Property, PropertyDraft, PropertyListQuery, PropertyStatus,
            PublicProperty, PublicPropertyQuery, UpdatePropertyPayload, Visibility,
        },
    },
    services::activity_service::{events, ActivityService},
};

const FALLBACK_SLUG: &str = "imovel";

/// Slug-base do título; títulos sem letras nem números caem no padrão.
pub fn base_slug(title: &str) -> String {
    let slug = generate_slug(title);
    if slug.is_empty() { FALLBACK_SLUG.to_string() } else { slug }
}

/// Confere os preços da atualização já combinados com os valores atuais.
pub fn check_merged_prices(current: &Property, changes: &UpdatePropertyPayload) -> Result<(), AppError> {
    let merged = |cleared: bool, new: Option<Decimal>, old: Option<Decimal>| if cleared { None } else { new.or(old) };
    check_prices(
        changes.transaction_type.unwrap_or(current.transaction_type),
        merged(changes.clears(ClearableField::SalePrice), changes.sale_price, current.sale_price),
        merged(changes.clears(ClearableField::RentalPrice), changes.rental_price, current.rental_price),
    )
    .map_err(AppError::InvalidInput)
}

#[derive(Clone)]
pub struct PropertyService {
    property_repo: PropertyRepository,
    owner_repo: OwnerRepository,
    user_repo: UserRepository,
    activity: ActivityService,
}

impl PropertyService {
    pub fn new(
        property_repo: PropertyRepository,
        owner_repo: OwnerRepository,
        user_repo: UserRepository,
        activity: ActivityService,
    ) -> Self {
        Self { property_repo, owner_repo, user_repo, activity }
    }

    /// Proprietário e corretor precisam ser do mesmo tenant do imóvel.
    async fn check_references(
        &self,
        tenant_id: Uuid,
        owner_id: Option<Uuid>,
        broker_id: Option<Uuid>,
    ) -> Result<(), AppError> {
        if let Some(owner_id) = owner_id {
            if !self.owner_repo.exists_in_tenant(tenant_id, owner_id).await? {
                return Err(AppError::OwnerNotFound);
            }
        }
        if let Some(broker_id) = broker_id {
            if !self.user_repo.exists_in_tenant(tenant_id, broker_id).await? {
                return Err(AppError::UserNotFound);
            }
        }
        Ok(())
    }

    async fn unique_slug(&self, tenant_id: Uuid, title: &str) -> Result<String, AppError> {
        self.property_repo.available_slug(tenant_id, &base_slug(title)).await
    }

    pub async fn create(&self, tenant_id: Uuid, payload: CreatePropertyPayload, actor_id: Uuid) -> Result<Property, AppError> {
        check_prices(payload.transaction_type, payload.sale_price, payload.rental_price)
            .map_err(AppError::InvalidInput)?;
        self.check_references(tenant_id, payload.owner_id, payload.broker_id).await?;

        let slug = self.unique_slug(tenant_id, &payload.title).await?;
        let mut payload = payload;
        payload.title = payload.title.trim().to_string();
        let property = self
            .property_repo
            .create(tenant_id, &PropertyDraft::from_payload(payload, slug))
            .await?;

        tracing::info!(%tenant_id, property_id = %property.id, slug = %property.slug, "Imóvel criado");
        self.activity
            .record(NewActivity::by_user(
                tenant_id,
                events::PROPERTY_CREATED,
                actor_id,
                json!({ "property_id": property.id, "title": property.title }),
            ))
            .await;
        Ok(property)
    }

    pub async fn list(&self, tenant_id: Uuid, query: &PropertyListQuery) -> Result<Vec<Property>, AppError> {
        let pagination = Pagination { limit: query.limit, offset: query.offset };
        self.property_repo
            .list(tenant_id, query, pagination.limit(), pagination.offset())
            .await
    }

    pub async fn get(&self, tenant_id: Uuid, id: Uuid) -> Result<Property, AppError> {
        self.property_repo
            .find(tenant_id, id)
            .await?
            .ok_or(AppError::PropertyNotFound)
    }

    pub async fn update(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        changes: UpdatePropertyPayload,
        actor_id: Uuid,
    ) -> Result<Property, AppError> {
        changes.check_clear().map_err(AppError::InvalidInput)?;
        let current = self.get(tenant_id, id).await?;
        check_merged_prices(&current, &changes)?;
        self.check_references(tenant_id, changes.owner_id, changes.broker_id).await?;

        let property = self
            .property_repo
            .update(tenant_id, id, &changes)
            .await?
            .ok_or(AppError::PropertyNotFound)?;

        self.activity
            .record(NewActivity::by_user(tenant_id, events::PROPERTY_UPDATED, actor_id, json!({ "property_id": id })))
            .await;
        Ok(property)
    }

    pub async fn delete(&self, tenant_id: Uuid, id: Uuid, actor_id: Uuid) -> Result<(), AppError> {
        if !self.property_repo.delete(tenant_id, id).await? {
            return Err(AppError::PropertyNotFound);
        }
        tracing::info!(%tenant_id, property_id = %id, "Imóvel excluído");
        self.activity
            .record(NewActivity::by_user(tenant_id, events::PROPERTY_DELETED, actor_id, json!({ "property_id": id })))
            .await;
        Ok(())
    }

    pub async fn set_status(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        status: PropertyStatus,
        actor_id: Uuid,
    ) -> Result<Property, AppError> {
        let property = self
            .property_repo
            .set_status(tenant_id, id, status)
            .await?
            .ok_or(AppError::PropertyNotFound)?;
        self.activity
            .record(NewActivity::by_user(
                tenant_id,
                events::PROPERTY_UPDATED,
                actor_id,
                json!({ "property_id": id, "status": status }),
            ))
            .await;
        Ok(property)
    }

    pub async fn set_visibility(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        visibility: Visibility,
        actor_id: Uuid,
    ) -> Result<Property, AppError> {
        let property = self
            .property_repo
            .set_visibility(tenant_id, id, visibility)
            .await?
            .ok_or(AppError::PropertyNotFound)?;
        self.activity
            .record(NewActivity::by_user(
                tenant_id,
                events::PROPERTY_UPDATED,
                actor_id,
                json!({ "property_id": id, "visibility": visibility }),
            ))
            .await;
        Ok(property)
    }

    // ---
    // Vitrine pública
    // ---

    pub async fn list_public(&self, query: &PublicPropertyQuery) -> Result<Vec<PublicProperty>, AppError> {
        let pagination = Pagination { limit: query.limit, offset: query.offset };
        let properties = self
            .property_repo
            .list_public(query, pagination.limit(), pagination.offset())
            .await?;
        Ok(properties.into_iter().map(PublicProperty::from).collect())
    }

    /// Imóvel público. Um membro do tenant dono (ou da plataforma) também
    /// enxerga imóveis ainda não publicados.
    pub async fn get_public(&self, id: Uuid, viewer: Option<&AuthenticatedUser>) -> Result<PublicProperty, AppError> {
        if let Some(property) = self.property_repo.find_public(id).await? {
            return Ok(property.into());
        }

        let Some(viewer) = viewer else {
            return Err(AppError::PublicPropertyNotFound);
        };
        self.property_repo
            .find_any(id)
            .await?
            .filter(|p| viewer.can_access_tenant(p.tenant_id))
            .map(PublicProperty::from)
            .ok_or(AppError::PublicPropertyNotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::property::{PropertyType, TransactionType};
    use chrono::Utc;
    use sqlx::types::Json;

    fn property(transaction_type: TransactionType, sale: Option<i64>, rent: Option<i64>) -> Property {
        Property {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            owner_id: None,
            broker_id: None,
            external_id: None,
            reference: None,
            slug: "casa".into(),
            title: "Casa".into(),
            description: None,
            property_type: PropertyType::House,
            status: PropertyStatus::Available,
            visibility: Visibility::Private,
            transaction_type,
            featured: false,
            sale_price: sale.map(|v| Decimal::new(v, 0)),
            rental_price: rent.map(|v| Decimal::new(v, 0)),
            area_sqm: None,
            bedrooms: None,
            bathrooms: None,
            parking_spaces: None,
            street: None,
            number: None,
            neighborhood: None,
            city: None,
            state: None,
            zip_code: None,
            cover_image_url: None,
            images: Json(vec![]),
            features: vec![],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn base_slug_falls_back_for_symbol_titles() {
        assert_eq!(base_slug("Casa Térrea com Piscina"), "casa-terrea-com-piscina");
        assert_eq!(base_slug("***"), "imovel");
    }

    #[test]
    fn switching_to_both_needs_rental_price() {
        let current = property(TransactionType::Sale, Some(300_000), None);
        let changes = UpdatePropertyPayload {
            transaction_type: Some(TransactionType::Both),
            ..Default::default()
        };
        assert!(check_merged_prices(&current, &changes).is_err());

        let changes = UpdatePropertyPayload {
            transaction_type: Some(TransactionType::Both),
            rental_price: Some(Decimal::new(2_500, 0)),
            ..Default::default()
        };
        assert!(check_merged_prices(&current, &changes).is_ok());
    }

    #[test]
    fn clearing_a_required_price_is_rejected() {
        let current = property(TransactionType::Both, Some(300_000), Some(2_000));
        let changes = UpdatePropertyPayload { clear: vec![ClearableField::RentalPrice], ..Default::default() };
        assert!(check_merged_prices(&current, &changes).is_err());

        let changes = UpdatePropertyPayload {
            transaction_type: Some(TransactionType::Sale),
            clear: vec![ClearableField::RentalPrice],
            ..Default::default()
        };
        assert!(check_merged_prices(&current, &changes).is_ok());
    }

    #[test]
    fn unrelated_update_keeps_existing_prices_valid() {
        let current = property(TransactionType::Rent, None, Some(1_800));
        let changes = UpdatePropertyPayload {
            title: Some("Novo título".into()),
            ..Default::default()
        };
        assert!(check_merged_prices(&current, &changes).is_ok());
    }
}
