// src/maintenance.rs

use std::collections::BTreeMap;

use anyhow::Context;
use sqlx::{types::Json, FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::{
    cli::MaintenanceCommand,
    common::{slug::normalize_slug, validators::normalize_email},
    db::{TenantRepository, UserRepository},
    models::{
        tenancy::{AddressPayload, TenantChanges},
        user::{permissions, NewUser, UserRole},
    },
    services::auth::hash_password,
};

/// O que fazer com um usuário na normalização de papéis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleAction {
    PromoteToBrokerAdmin,
    ReportManagerWithCreci,
    ReportBrokerWithoutCreci,
    Keep,
}

pub fn role_action(role: UserRole, creci: Option<&str>) -> RoleAction {
    let has_creci = creci.is_some_and(|c| !c.trim().is_empty());
    match (role, has_creci) {
        (UserRole::Admin, true) => RoleAction::PromoteToBrokerAdmin,
        (UserRole::Manager, true) => RoleAction::ReportManagerWithCreci,
        (UserRole::Broker | UserRole::BrokerAdmin, false) => RoleAction::ReportBrokerWithoutCreci,
        _ => RoleAction::Keep,
    }
}

#[derive(Debug, FromRow)]
struct RoleRow {
    id: Uuid,
    email: String,
    role: UserRole,
    creci: Option<String>,
}

#[derive(Debug, FromRow)]
pub struct TenantStats {
    pub name: String,
    pub slug: String,
    pub users: i64,
    pub brokers: i64,
    pub properties: i64,
    pub properties_by_visibility: Json<BTreeMap<String, i64>>,
    pub leads: i64,
    pub leads_by_status: Json<BTreeMap<String, i64>>,
}

fn breakdown(counts: &BTreeMap<String, i64>) -> String {
    if counts.is_empty() {
        return "-".to_string();
    }
    counts
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn format_tenant_stats(stats: &TenantStats) -> String {
    format!(
        "{} ({}): usuários={} corretores={} imóveis={} [{}] leads={} [{}]",
        stats.name,
        stats.slug,
        stats.users,
        stats.brokers,
        stats.properties,
        breakdown(&stats.properties_by_visibility),
        stats.leads,
        breakdown(&stats.leads_by_status),
    )
}

/// Roda um comando de manutenção numa única transação.
/// Em `dry_run` tudo é desfeito no final e só o relatório fica.
pub async fn run(pool: &PgPool, command: MaintenanceCommand, dry_run: bool) -> anyhow::Result<()> {
    let mut tx = pool.begin().await?;

    let lines = match command {
        MaintenanceCommand::CreatePlatformTenant { name, slug, admin_email, admin_password, admin_name } => {
            create_platform_tenant(pool, &mut tx, &name, &slug, &admin_email, &admin_password, &admin_name).await?
        }
        MaintenanceCommand::PublishAllProperties { tenant } => publish_all_properties(&mut tx, tenant).await?,
        MaintenanceCommand::NormalizeBrokerRoles => normalize_broker_roles(&mut tx).await?,
        MaintenanceCommand::MoveUser { email, tenant } => move_user(&mut tx, &email, tenant).await?,
        MaintenanceCommand::Report => report(&mut tx).await?,
    };

    for line in &lines {
        println!("{}", line);
    }

    if dry_run {
        tx.rollback().await?;
        println!("(dry-run) nenhuma alteração foi gravada");
    } else {
        tx.commit().await?;
    }
    Ok(())
}

async fn create_platform_tenant(
    pool: &PgPool,
    tx: &mut Transaction<'_, Postgres>,
    name: &str,
    slug: &str,
    admin_email: &str,
    admin_password: &str,
    admin_name: &str,
) -> anyhow::Result<Vec<String>> {
    let tenant_repo = TenantRepository::new(pool.clone());
    let user_repo = UserRepository::new(pool.clone());
    let slug = normalize_slug(slug);
    anyhow::ensure!(!slug.is_empty(), "slug inválido");

    let existing: Option<(Uuid, bool)> =
        sqlx::query_as("SELECT id, is_platform_admin FROM tenants WHERE slug = $1")
            .bind(&slug)
            .fetch_optional(&mut **tx)
            .await?;
    if let Some((id, is_platform_admin)) = existing {
        return Ok(vec![format!(
            "Tenant '{}' já existe ({}, plataforma={}); nada a fazer",
            slug, id, is_platform_admin
        )]);
    }

    let changes = TenantChanges {
        name: Some(name.trim().to_string()),
        slug: Some(slug.clone()),
        tenant_type: None,
        document: None,
        document_type: None,
        business_type: None,
        creci: None,
        email: None,
        phone: None,
        address: AddressPayload::default(),
        settings: None,
        is_platform_admin: true,
        subscription_plan: None,
        subscription_status: None,
    };
    let tenant = tenant_repo.create(&mut **tx, &changes).await?;

    let email = normalize_email(admin_email)?;
    if user_repo.find_by_email(&mut **tx, &email).await?.is_some() {
        anyhow::bail!("já existe um usuário com o e-mail {}", email);
    }
    let password_hash = hash_password(admin_password).await?;
    let user = user_repo
        .create(
            &mut **tx,
            &NewUser {
                tenant_id: tenant.id,
                name: admin_name.trim().to_string(),
                email,
                password_hash,
                phone: None,
                document: None,
                document_type: None,
                creci: None,
                role: UserRole::Admin,
                permissions: permissions::ALL.iter().map(|p| p.to_string()).collect(),
            },
        )
        .await?;

    tracing::info!(tenant_id = %tenant.id, user_id = %user.id, "Tenant da plataforma criado");
    Ok(vec![
        format!("Tenant da plataforma criado: {} ({})", tenant.slug, tenant.id),
        format!("Administrador: {} ({})", user.email, user.id),
    ])
}

async fn publish_all_properties(
    tx: &mut Transaction<'_, Postgres>,
    tenant: Option<Uuid>,
) -> anyhow::Result<Vec<String>> {
    let result = sqlx::query(
        r#"
        UPDATE properties SET visibility = 'public', updated_at = NOW()
        WHERE visibility <> 'public' AND ($1::uuid IS NULL OR tenant_id = $1)
        "#,
    )
    .bind(tenant)
    .execute(&mut **tx)
    .await?;

    let scope = tenant.map_or_else(|| "todos os tenants".to_string(), |id| format!("tenant {}", id));
    Ok(vec![format!("{} imóveis publicados ({})", result.rows_affected(), scope)])
}

async fn normalize_broker_roles(tx: &mut Transaction<'_, Postgres>) -> anyhow::Result<Vec<String>> {
    let rows = sqlx::query_as::<_, RoleRow>("SELECT id, email, role, creci FROM users ORDER BY email")
        .fetch_all(&mut **tx)
        .await?;

    let mut promoted = Vec::new();
    let mut lines = Vec::new();
    for row in &rows {
        match role_action(row.role, row.creci.as_deref()) {
            RoleAction::PromoteToBrokerAdmin => promoted.push(row.id),
            RoleAction::ReportManagerWithCreci => {
                lines.push(format!("manager com CRECI mantido: {}", row.email))
            }
            RoleAction::ReportBrokerWithoutCreci => {
                lines.push(format!("{} sem CRECI: {}", row.role.as_str(), row.email))
            }
            RoleAction::Keep => {}
        }
    }

    if !promoted.is_empty() {
        sqlx::query("UPDATE users SET role = 'broker_admin', updated_at = NOW() WHERE id = ANY($1)")
            .bind(&promoted)
            .execute(&mut **tx)
            .await?;
    }
    lines.insert(0, format!("{} admins com CRECI promovidos a broker_admin", promoted.len()));
    Ok(lines)
}

async fn move_user(
    tx: &mut Transaction<'_, Postgres>,
    email: &str,
    tenant: Uuid,
) -> anyhow::Result<Vec<String>> {
    let email = normalize_email(email)?;
    let target: Option<String> = sqlx::query_scalar("SELECT slug FROM tenants WHERE id = $1")
        .bind(tenant)
        .fetch_optional(&mut **tx)
        .await?;
    let target = target.with_context(|| format!("tenant {} não encontrado", tenant))?;

    let moved: Option<(Uuid, Uuid)> = sqlx::query_as(
        r#"
        WITH previous AS (SELECT id, tenant_id FROM users WHERE email = $1)
        UPDATE users u SET tenant_id = $2, updated_at = NOW()
        FROM previous
        WHERE u.id = previous.id
        RETURNING u.id, previous.tenant_id
        "#,
    )
    .bind(&email)
    .bind(tenant)
    .fetch_optional(&mut **tx)
    .await?;
    let (user_id, from) = moved.with_context(|| format!("usuário {} não encontrado", email))?;

    Ok(vec![format!("Usuário {} ({}) movido de {} para {}", email, user_id, from, target)])
}

async fn report(tx: &mut Transaction<'_, Postgres>) -> anyhow::Result<Vec<String>> {
    let stats = sqlx::query_as::<_, TenantStats>(
        r#"
        SELECT
            t.name,
            t.slug,
            (SELECT COUNT(*) FROM users u WHERE u.tenant_id = t.id) AS users,
            (SELECT COUNT(*) FROM users u
                WHERE u.tenant_id = t.id AND u.role IN ('broker', 'broker_admin')) AS brokers,
            (SELECT COUNT(*) FROM properties p WHERE p.tenant_id = t.id) AS properties,
            (SELECT COALESCE(jsonb_object_agg(v.visibility, v.n), '{}'::jsonb)
                FROM (SELECT visibility::text AS visibility, COUNT(*) AS n
                      FROM properties WHERE tenant_id = t.id GROUP BY visibility) v
            ) AS properties_by_visibility,
            (SELECT COUNT(*) FROM leads l WHERE l.tenant_id = t.id) AS leads,
            (SELECT COALESCE(jsonb_object_agg(s.status, s.n), '{}'::jsonb)
                FROM (SELECT status::text AS status, COUNT(*) AS n
                      FROM leads WHERE tenant_id = t.id GROUP BY status) s
            ) AS leads_by_status
        FROM tenants t
        ORDER BY t.name
        "#,
    )
    .fetch_all(&mut **tx)
    .await?;

    if stats.is_empty() {
        return Ok(vec!["Nenhum tenant cadastrado".to_string()]);
    }
    Ok(stats.iter().map(format_tenant_stats).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admins_with_creci_are_promoted() {
        assert_eq!(role_action(UserRole::Admin, Some("12345-F")), RoleAction::PromoteToBrokerAdmin);
        assert_eq!(role_action(UserRole::Admin, None), RoleAction::Keep);
        assert_eq!(role_action(UserRole::Admin, Some("  ")), RoleAction::Keep);
    }

    #[test]
    fn managers_with_creci_are_only_reported() {
        assert_eq!(role_action(UserRole::Manager, Some("12345-F")), RoleAction::ReportManagerWithCreci);
        assert_eq!(role_action(UserRole::Manager, None), RoleAction::Keep);
    }

    #[test]
    fn brokers_without_creci_are_reported() {
        assert_eq!(role_action(UserRole::Broker, None), RoleAction::ReportBrokerWithoutCreci);
        assert_eq!(role_action(UserRole::BrokerAdmin, Some("")), RoleAction::ReportBrokerWithoutCreci);
        assert_eq!(role_action(UserRole::Broker, Some("999-J")), RoleAction::Keep);
    }

    #[test]
    fn tenant_stats_line_lists_breakdowns() {
        let stats = TenantStats {
            name: "Imob Centro".into(),
            slug: "imob-centro".into(),
            users: 3,
            brokers: 2,
            properties: 5,
            properties_by_visibility: Json(BTreeMap::from([("private".into(), 1), ("public".into(), 4)])),
            leads: 0,
            leads_by_status: Json(BTreeMap::new()),
        };
        assert_eq!(
            format_tenant_stats(&stats),
            "Imob Centro (imob-centro): usuários=3 corretores=2 imóveis=5 [private=1, public=4] leads=0 [-]"
        );
    }
}
