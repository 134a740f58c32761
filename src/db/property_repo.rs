// src/db/property_repo.rs

use sqlx::{types::Json, Executor, FromRow, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    common::{
        error::{map_unique_violation, AppError},
        slug::with_suffix,
    },
    models::{
        owner_confirmation::OwnerDecision,
        property::{
            Property, PropertyDraft, PropertyListQuery, PropertyStatus, PublicPropertyQuery,
            UpdatePropertyPayload, Visibility,
        },
    },
};

/// Resultado do upsert da importação: `inserted` distingue criação de atualização.
#[derive(Debug, Clone, FromRow)]
pub struct UpsertedProperty {
    #[sqlx(flatten)]
    pub property: Property,
    pub inserted: bool,
}

const MAX_SLUG_ATTEMPTS: u32 = 100;

/// Sufixo aleatório curto; usado quando os sufixos numéricos se esgotam ou numa corrida.
pub fn random_slug(base: &str) -> String {
    with_suffix(base, &Uuid::new_v4().simple().to_string()[..8])
}

/// Escapa os curingas do LIKE (`\` é o escape padrão do Postgres).
pub fn escape_like(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

// Condição de listagem pública, reaproveitada na busca por id.
const PUBLIC_CONDITION: &str =
    " p.visibility = 'public' AND p.status = 'available' AND t.is_active = TRUE";

#[derive(Clone)]
pub struct PropertyRepository {
    pool: PgPool,
}

impl PropertyRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn slug_exists(&self, tenant_id: Uuid, slug: &str) -> Result<bool, AppError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM properties WHERE tenant_id = $1 AND slug = $2)",
        )
        .bind(tenant_id)
        .bind(slug)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    /// Primeiro slug livre no tenant: `base`, `base-2`, `base-3`... e por fim um sufixo aleatório.
    pub async fn available_slug(&self, tenant_id: Uuid, base: &str) -> Result<String, AppError> {
        if !self.slug_exists(tenant_id, base).await? {
            return Ok(base.to_string());
        }
        for n in 2..MAX_SLUG_ATTEMPTS {
            let candidate = with_suffix(base, &n.to_string());
            if !self.slug_exists(tenant_id, &candidate).await? {
                return Ok(candidate);
            }
        }
        Ok(random_slug(base))
    }

    pub async fn create(&self, tenant_id: Uuid, draft: &PropertyDraft) -> Result<Property, AppError> {
        let property = sqlx::query_as::<_, Property>(
            r#"
            INSERT INTO properties (
                tenant_id, external_id, reference, slug, title, description, property_type,
                transaction_type, status, visibility, featured, owner_id, broker_id,
                sale_price, rental_price, area_sqm, bedrooms, bathrooms, parking_spaces,
                street, number, neighborhood, city, state, zip_code, cover_image_url, images, features
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17,
                    $18, $19, $20, $21, $22, $23, $24, $25, $26, $27, $28)
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(&draft.external_id)
        .bind(&draft.reference)
        .bind(&draft.slug)
        .bind(&draft.title)
        .bind(&draft.description)
        .bind(draft.property_type)
        .bind(draft.transaction_type)
        .bind(draft.status)
        .bind(draft.visibility)
        .bind(draft.featured)
        .bind(draft.owner_id)
        .bind(draft.broker_id)
        .bind(draft.sale_price)
        .bind(draft.rental_price)
        .bind(draft.area_sqm)
        .bind(draft.bedrooms)
        .bind(draft.bathrooms)
        .bind(draft.parking_spaces)
        .bind(&draft.street)
        .bind(&draft.number)
        .bind(&draft.neighborhood)
        .bind(&draft.city)
        .bind(&draft.state)
        .bind(&draft.zip_code)
        .bind(&draft.cover_image_url)
        .bind(Json(&draft.images))
        .bind(&draft.features)
        .fetch_one(&self.pool)
        .await
        .map_err(map_unique_violation)?;
        Ok(property)
    }

    /// Insere ou atualiza pelo `external_id`. Na atualização, slug, status e
    /// visibilidade escolhidos no painel são preservados.
    pub async fn upsert_imported<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        draft: &PropertyDraft,
    ) -> Result<UpsertedProperty, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let upserted = sqlx::query_as::<_, UpsertedProperty>(
            r#"
            INSERT INTO properties (
                tenant_id, external_id, reference, slug, title, description, property_type,
                transaction_type, status, visibility, sale_price, rental_price, area_sqm,
                bedrooms, bathrooms, parking_spaces, street, number, neighborhood, city,
                state, zip_code, cover_image_url, images, features
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16,
                    $17, $18, $19, $20, $21, $22, $23, $24, $25)
            ON CONFLICT ON CONSTRAINT properties_tenant_external_key DO UPDATE SET
                title = EXCLUDED.title,
                description = EXCLUDED.description,
                property_type = EXCLUDED.property_type,
                transaction_type = EXCLUDED.transaction_type,
                sale_price = EXCLUDED.sale_price,
                rental_price = EXCLUDED.rental_price,
                area_sqm = EXCLUDED.area_sqm,
                bedrooms = EXCLUDED.bedrooms,
                bathrooms = EXCLUDED.bathrooms,
                parking_spaces = EXCLUDED.parking_spaces,
                street = EXCLUDED.street,
                number = EXCLUDED.number,
                neighborhood = EXCLUDED.neighborhood,
                city = EXCLUDED.city,
                state = EXCLUDED.state,
                zip_code = EXCLUDED.zip_code,
                cover_image_url = EXCLUDED.cover_image_url,
                images = EXCLUDED.images,
                features = EXCLUDED.features,
                updated_at = NOW()
            RETURNING *, (xmax = 0) AS inserted
            "#,
        )
        .bind(tenant_id)
        .bind(&draft.external_id)
        .bind(&draft.reference)
        .bind(&draft.slug)
        .bind(&draft.title)
        .bind(&draft.description)
        .bind(draft.property_type)
        .bind(draft.transaction_type)
        .bind(draft.status)
        .bind(draft.visibility)
        .bind(draft.sale_price)
        .bind(draft.rental_price)
        .bind(draft.area_sqm)
        .bind(draft.bedrooms)
        .bind(draft.bathrooms)
        .bind(draft.parking_spaces)
        .bind(&draft.street)
        .bind(&draft.number)
        .bind(&draft.neighborhood)
        .bind(&draft.city)
        .bind(&draft.state)
        .bind(&draft.zip_code)
        .bind(&draft.cover_image_url)
        .bind(Json(&draft.images))
        .bind(&draft.features)
        .fetch_one(executor)
        .await
        .map_err(map_unique_violation)?;
        Ok(upserted)
    }

    /// Vincula o proprietário ao imóvel com aquele código de importação.
    pub async fn link_owner_by_external_id<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        external_id: &str,
        owner_id: Uuid,
    ) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            "UPDATE properties SET owner_id = $3, updated_at = NOW() WHERE tenant_id = $1 AND external_id = $2",
        )
        .bind(tenant_id)
        .bind(external_id)
        .bind(owner_id)
        .execute(executor)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn external_id_exists(&self, tenant_id: Uuid, external_id: &str) -> Result<bool, AppError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM properties WHERE tenant_id = $1 AND external_id = $2)",
        )
        .bind(tenant_id)
        .bind(external_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    pub async fn find(&self, tenant_id: Uuid, id: Uuid) -> Result<Option<Property>, AppError> {
        let property = sqlx::query_as::<_, Property>("SELECT * FROM properties WHERE tenant_id = $1 AND id = $2")
            .bind(tenant_id)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(property)
    }

    /// Busca sem escopo de tenant (pré-visualização de administradores).
    pub async fn find_any(&self, id: Uuid) -> Result<Option<Property>, AppError> {
        let property = sqlx::query_as::<_, Property>("SELECT * FROM properties WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(property)
    }

    pub async fn list(
        &self,
        tenant_id: Uuid,
        filters: &PropertyListQuery,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Property>, AppError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM properties WHERE tenant_id = ");
        qb.push_bind(tenant_id);

        if let Some(status) = filters.status {
            qb.push(" AND status = ").push_bind(status);
        }
        if let Some(visibility) = filters.visibility {
            qb.push(" AND visibility = ").push_bind(visibility);
        }
        if let Some(property_type) = filters.property_type {
            qb.push(" AND property_type = ").push_bind(property_type);
        }
        if let Some(transaction_type) = filters.transaction_type {
            qb.push(" AND transaction_type = ").push_bind(transaction_type);
        }
        if let Some(city) = filters.city.as_deref().filter(|c| !c.trim().is_empty()) {
            qb.push(" AND city ILIKE ").push_bind(escape_like(city.trim()));
        }
        if let Some(broker_id) = filters.broker_id {
            qb.push(" AND broker_id = ").push_bind(broker_id);
        }
        if let Some(search) = filters.search.as_deref().filter(|s| !s.trim().is_empty()) {
            let pattern = format!("%{}%", escape_like(search.trim()));
            qb.push(" AND (title ILIKE ").push_bind(pattern.clone());
            qb.push(" OR reference ILIKE ").push_bind(pattern.clone());
            qb.push(" OR external_id ILIKE ").push_bind(pattern).push(")");
        }

        qb.push(" ORDER BY created_at DESC LIMIT ").push_bind(limit);
        qb.push(" OFFSET ").push_bind(offset);

        let properties = qb.build_query_as::<Property>().fetch_all(&self.pool).await?;
        Ok(properties)
    }

    pub async fn update(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        changes: &UpdatePropertyPayload,
    ) -> Result<Option<Property>, AppError> {
        let property = sqlx::query_as::<_, Property>(
            r#"
            UPDATE properties SET
                title = COALESCE($3, title),
                description = CASE WHEN 'description' = ANY($26) THEN NULL ELSE COALESCE($4, description) END,
                reference = CASE WHEN 'reference' = ANY($26) THEN NULL ELSE COALESCE($5, reference) END,
                property_type = COALESCE($6, property_type),
                transaction_type = COALESCE($7, transaction_type),
                featured = COALESCE($8, featured),
                owner_id = CASE WHEN 'owner_id' = ANY($26) THEN NULL ELSE COALESCE($9, owner_id) END,
                broker_id = CASE WHEN 'broker_id' = ANY($26) THEN NULL ELSE COALESCE($10, broker_id) END,
                sale_price = CASE WHEN 'sale_price' = ANY($26) THEN NULL ELSE COALESCE($11, sale_price) END,
                rental_price = CASE WHEN 'rental_price' = ANY($26) THEN NULL ELSE COALESCE($12, rental_price) END,
                area_sqm = CASE WHEN 'area_sqm' = ANY($26) THEN NULL ELSE COALESCE($13, area_sqm) END,
                bedrooms = CASE WHEN 'bedrooms' = ANY($26) THEN NULL ELSE COALESCE($14, bedrooms) END,
                bathrooms = CASE WHEN 'bathrooms' = ANY($26) THEN NULL ELSE COALESCE($15, bathrooms) END,
                parking_spaces = CASE WHEN 'parking_spaces' = ANY($26) THEN NULL ELSE COALESCE($16, parking_spaces) END,
                street = CASE WHEN 'street' = ANY($26) THEN NULL ELSE COALESCE($17, street) END,
                number = CASE WHEN 'number' = ANY($26) THEN NULL ELSE COALESCE($18, number) END,
                neighborhood = CASE WHEN 'neighborhood' = ANY($26) THEN NULL ELSE COALESCE($19, neighborhood) END,
                city = CASE WHEN 'city' = ANY($26) THEN NULL ELSE COALESCE($20, city) END,
                state = CASE WHEN 'state' = ANY($26) THEN NULL ELSE COALESCE($21, state) END,
                zip_code = CASE WHEN 'zip_code' = ANY($26) THEN NULL ELSE COALESCE($22, zip_code) END,
                cover_image_url = CASE WHEN 'cover_image_url' = ANY($26) THEN NULL ELSE COALESCE($23, cover_image_url) END,
                images = COALESCE($24, images),
                features = COALESCE($25, features),
                updated_at = NOW()
            WHERE tenant_id = $1 AND id = $2
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(id)
        .bind(&changes.title)
        .bind(&changes.description)
        .bind(&changes.reference)
        .bind(changes.property_type)
        .bind(changes.transaction_type)
        .bind(changes.featured)
        .bind(changes.owner_id)
        .bind(changes.broker_id)
        .bind(changes.sale_price)
        .bind(changes.rental_price)
        .bind(changes.area_sqm)
        .bind(changes.bedrooms)
        .bind(changes.bathrooms)
        .bind(changes.parking_spaces)
        .bind(&changes.street)
        .bind(&changes.number)
        .bind(&changes.neighborhood)
        .bind(&changes.city)
        .bind(changes.state.as_ref().map(|s| s.to_uppercase()))
        .bind(&changes.zip_code)
        .bind(&changes.cover_image_url)
        .bind(changes.images.as_ref().map(Json))
        .bind(&changes.features)
        .bind(changes.cleared_columns())
        .fetch_optional(&self.pool)
        .await?;
        Ok(property)
    }

    pub async fn delete(&self, tenant_id: Uuid, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM properties WHERE tenant_id = $1 AND id = $2")
            .bind(tenant_id)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn set_status(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        status: PropertyStatus,
    ) -> Result<Option<Property>, AppError> {
        let property = sqlx::query_as::<_, Property>(
            "UPDATE properties SET status = $3, updated_at = NOW() WHERE tenant_id = $1 AND id = $2 RETURNING *",
        )
        .bind(tenant_id)
        .bind(id)
        .bind(status)
        .fetch_optional(&self.pool)
        .await?;
        Ok(property)
    }

    /// Aplica a resposta do proprietário dentro da transação que consome o link.
    pub async fn apply_owner_decision<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        id: Uuid,
        decision: &OwnerDecision,
    ) -> Result<Option<Property>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let property = sqlx::query_as::<_, Property>(
            r#"
            UPDATE properties SET
                status = $3,
                sale_price = COALESCE($4, sale_price),
                rental_price = COALESCE($5, rental_price),
                updated_at = NOW()
            WHERE tenant_id = $1 AND id = $2
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(id)
        .bind(decision.status)
        .bind(decision.sale_price)
        .bind(decision.rental_price)
        .fetch_optional(executor)
        .await?;
        Ok(property)
    }

    pub async fn set_visibility(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        visibility: Visibility,
    ) -> Result<Option<Property>, AppError> {
        let property = sqlx::query_as::<_, Property>(
            "UPDATE properties SET visibility = $3, updated_at = NOW() WHERE tenant_id = $1 AND id = $2 RETURNING *",
        )
        .bind(tenant_id)
        .bind(id)
        .bind(visibility)
        .fetch_optional(&self.pool)
        .await?;
        Ok(property)
    }

    // --- Vitrine pública ---

    pub async fn find_public(&self, id: Uuid) -> Result<Option<Property>, AppError> {
        let sql = format!(
            "SELECT p.* FROM properties p JOIN tenants t ON t.id = p.tenant_id WHERE p.id = $1 AND{}",
            PUBLIC_CONDITION
        );
        let property = sqlx::query_as::<_, Property>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(property)
    }

    pub async fn list_public(
        &self,
        filters: &PublicPropertyQuery,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Property>, AppError> {
        let mut qb = QueryBuilder::<Postgres>::new(
            "SELECT p.* FROM properties p JOIN tenants t ON t.id = p.tenant_id WHERE",
        );
        qb.push(PUBLIC_CONDITION);

        if let Some(slug) = filters.tenant.as_deref().filter(|s| !s.is_empty()) {
            qb.push(" AND t.slug = ").push_bind(slug.to_string());
        }
        if let Some(transaction_type) = filters.transaction_type {
            // "both" atende tanto quem procura venda quanto locação.
            qb.push(" AND (p.transaction_type = ")
                .push_bind(transaction_type)
                .push(" OR p.transaction_type = 'both')");
        }
        if let Some(property_type) = filters.property_type {
            qb.push(" AND p.property_type = ").push_bind(property_type);
        }
        if let Some(city) = filters.city.as_deref().filter(|c| !c.trim().is_empty()) {
            qb.push(" AND p.city ILIKE ").push_bind(escape_like(city.trim()));
        }
        if let Some(neighborhood) = filters.neighborhood.as_deref().filter(|n| !n.trim().is_empty()) {
            qb.push(" AND p.neighborhood ILIKE ").push_bind(escape_like(neighborhood.trim()));
        }

        // Coluna vem de um conjunto fechado.
        let price_column = filters.price_column();
        if let Some(min) = filters.min_price {
            qb.push(format!(" AND p.{} >= ", price_column)).push_bind(min);
        }
        if let Some(max) = filters.max_price {
            qb.push(format!(" AND p.{} <= ", price_column)).push_bind(max);
        }
        if let Some(bedrooms) = filters.bedrooms {
            qb.push(" AND p.bedrooms >= ").push_bind(bedrooms);
        }
        if let Some(parking) = filters.parking_spaces {
            qb.push(" AND p.parking_spaces >= ").push_bind(parking);
        }
        if let Some(min_area) = filters.min_area {
            qb.push(" AND p.area_sqm >= ").push_bind(min_area);
        }
        if let Some(max_area) = filters.max_area {
            qb.push(" AND p.area_sqm <= ").push_bind(max_area);
        }
        if let Some(featured) = filters.featured {
            qb.push(" AND p.featured = ").push_bind(featured);
        }

        qb.push(" ORDER BY p.featured DESC, p.created_at DESC LIMIT ").push_bind(limit);
        qb.push(" OFFSET ").push_bind(offset);

        let properties = qb.build_query_as::<Property>().fetch_all(&self.pool).await?;
        Ok(properties)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like("São Paulo"), "São Paulo");
        assert_eq!(escape_like("100%"), "100\\%");
        assert_eq!(escape_like("a_b"), "a\\_b");
        assert_eq!(escape_like("c:\\x"), "c:\\\\x");
    }

    #[test]
    fn random_slug_keeps_base_and_limit() {
        let slug = random_slug("casa-ap-1");
        assert!(slug.starts_with("casa-ap-1-"));
        assert_eq!(slug.len(), "casa-ap-1-".len() + 8);
        assert!(random_slug(&"x".repeat(60)).len() <= 50);
    }
}
