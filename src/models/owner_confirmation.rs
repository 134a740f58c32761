// src/models/owner_confirmation.rs

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::models::property::{Property, PropertyStatus, PropertyType, TransactionType};

pub const CONFIRMATION_TTL_DAYS: i64 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "confirmation_action", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ConfirmationAction {
    ConfirmAvailable,
    ConfirmUnavailable,
    ConfirmPrice,
}

// ---
// Link de uso único enviado ao proprietário. Só o hash do token fica no banco.
// ---
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct OwnerConfirmationToken {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub property_id: Uuid,
    pub owner_id: Option<Uuid>,
    #[serde(skip_serializing)]
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub created_by: Option<Uuid>,
    pub used_at: Option<DateTime<Utc>>,
    pub last_action: Option<ConfirmationAction>,
    pub delivery_hint: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationCheck {
    Valid,
    Used,
    Expired,
}

impl OwnerConfirmationToken {
    pub fn check(&self, now: DateTime<Utc>) -> ConfirmationCheck {
        if self.used_at.is_some() {
            ConfirmationCheck::Used
        } else if self.expires_at <= now {
            ConfirmationCheck::Expired
        } else {
            ConfirmationCheck::Valid
        }
    }
}

pub fn confirmation_expiry_from(now: DateTime<Utc>) -> DateTime<Utc> {
    now + Duration::days(CONFIRMATION_TTL_DAYS)
}

/// SHA-256 do token em hexadecimal.
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

pub fn confirmation_url(public_site_url: &str, token: &str) -> String {
    format!("{}/confirmar/{}", public_site_url.trim_end_matches('/'), token)
}

/// "Maria Aparecida Souza" => "Maria S."
pub fn mask_name(name: &str) -> String {
    let mut words = name.split_whitespace();
    let Some(first) = words.next() else {
        return String::new();
    };
    match words.last().and_then(|w| w.chars().next()) {
        Some(initial) => format!("{} {}.", first, initial.to_uppercase()),
        None => first.to_string(),
    }
}

/// O que a resposta do proprietário muda no imóvel.
#[derive(Debug, Clone, PartialEq)]
pub struct OwnerDecision {
    pub status: PropertyStatus,
    pub sale_price: Option<Decimal>,
    pub rental_price: Option<Decimal>,
}

// ---
// Payloads / respostas
// ---

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct CreateConfirmationPayload {
    /// Canal usado para enviar o link (whatsapp, email, sms...)
    #[validate(length(max = 20, message = "too_long"))]
    pub delivery_hint: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ConfirmationLink {
    pub id: Uuid,
    pub property_id: Uuid,
    /// Mostrado uma única vez; não pode ser recuperado depois.
    pub token: String,
    pub confirmation_url: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SubmitConfirmationPayload {
    pub action: ConfirmationAction,
    /// Obrigatório em confirm_price
    pub price_amount: Option<Decimal>,
}

impl SubmitConfirmationPayload {
    /// Confirmar o preço também confirma a disponibilidade. O valor vai para
    /// o preço de venda quando o imóvel é vendido, senão para o aluguel.
    pub fn decision(&self, transaction_type: TransactionType) -> Result<OwnerDecision, String> {
        match self.action {
            ConfirmationAction::ConfirmAvailable => Ok(OwnerDecision {
                status: PropertyStatus::Available,
                sale_price: None,
                rental_price: None,
            }),
            ConfirmationAction::ConfirmUnavailable => Ok(OwnerDecision {
                status: PropertyStatus::Unavailable,
                sale_price: None,
                rental_price: None,
            }),
            ConfirmationAction::ConfirmPrice => {
                let price = self
                    .price_amount
                    .ok_or_else(|| "price_amount é obrigatório para confirm_price".to_string())?;
                if price <= Decimal::ZERO {
                    return Err("price_amount deve ser maior que zero".to_string());
                }
                let (sale_price, rental_price) = if transaction_type.includes_sale() {
                    (Some(price), None)
                } else {
                    (None, Some(price))
                };
                Ok(OwnerDecision { status: PropertyStatus::Available, sale_price, rental_price })
            }
        }
    }
}

/// O mínimo do imóvel que o proprietário vê na página de confirmação.
#[derive(Debug, Serialize, ToSchema)]
pub struct ConfirmationPage {
    pub property_id: Uuid,
    pub title: String,
    pub property_type: PropertyType,
    pub transaction_type: TransactionType,
    pub status: PropertyStatus,
    pub sale_price: Option<Decimal>,
    pub rental_price: Option<Decimal>,
    pub neighborhood: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub cover_image_url: Option<String>,
    /// Nome mascarado do proprietário
    pub owner_name: Option<String>,
    pub expires_at: DateTime<Utc>,
}

impl ConfirmationPage {
    pub fn new(property: Property, owner_name: Option<&str>, expires_at: DateTime<Utc>) -> Self {
        Self {
            property_id: property.id,
            title: property.title,
            property_type: property.property_type,
            transaction_type: property.transaction_type,
            status: property.status,
            sale_price: property.sale_price,
            rental_price: property.rental_price,
            neighborhood: property.neighborhood,
            city: property.city,
            state: property.state,
            cover_image_url: property.cover_image_url,
            owner_name: owner_name.map(mask_name).filter(|n| !n.is_empty()),
            expires_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(used: bool, expires_in: Duration) -> OwnerConfirmationToken {
        let now = Utc::now();
        OwnerConfirmationToken {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            property_id: Uuid::new_v4(),
            owner_id: None,
            token_hash: hash_token("abc"),
            expires_at: now + expires_in,
            created_by: None,
            used_at: used.then_some(now),
            last_action: None,
            delivery_hint: None,
            created_at: now,
        }
    }

    fn submit(action: ConfirmationAction, price: Option<i64>) -> SubmitConfirmationPayload {
        SubmitConfirmationPayload { action, price_amount: price.map(|p| Decimal::new(p, 0)) }
    }

    #[test]
    fn used_link_wins_over_expiry() {
        let now = Utc::now();
        assert_eq!(token(false, Duration::days(1)).check(now), ConfirmationCheck::Valid);
        assert_eq!(token(false, Duration::seconds(-1)).check(now), ConfirmationCheck::Expired);
        assert_eq!(token(true, Duration::seconds(-1)).check(now), ConfirmationCheck::Used);
    }

    #[test]
    fn token_hash_is_hex_sha256() {
        let hash = hash_token("segredo");
        assert_eq!(hash.len(), 64);
        assert_eq!(hash, hash_token("segredo"));
        assert_ne!(hash, hash_token("segredo2"));
    }

    #[test]
    fn link_points_to_the_public_site() {
        assert_eq!(
            confirmation_url("https://site.example.com/", "tok"),
            "https://site.example.com/confirmar/tok"
        );
        let now = Utc::now();
        assert_eq!(confirmation_expiry_from(now) - now, Duration::days(7));
    }

    #[test]
    fn owner_name_is_masked() {
        assert_eq!(mask_name("Maria Aparecida souza"), "Maria S.");
        assert_eq!(mask_name("José"), "José");
        assert_eq!(mask_name("   "), "");
    }

    #[test]
    fn price_confirmation_needs_a_positive_amount() {
        assert!(submit(ConfirmationAction::ConfirmPrice, None).decision(TransactionType::Sale).is_err());
        assert!(submit(ConfirmationAction::ConfirmPrice, Some(0)).decision(TransactionType::Sale).is_err());
    }

    #[test]
    fn price_goes_to_the_matching_column() {
        let sale = submit(ConfirmationAction::ConfirmPrice, Some(450_000))
            .decision(TransactionType::Both)
            .expect("decision");
        assert_eq!(sale.sale_price, Some(Decimal::new(450_000, 0)));
        assert_eq!(sale.rental_price, None);

        let rent = submit(ConfirmationAction::ConfirmPrice, Some(2_300))
            .decision(TransactionType::Rent)
            .expect("decision");
        assert_eq!(rent.rental_price, Some(Decimal::new(2_300, 0)));
        assert_eq!(rent.status, PropertyStatus::Available);
    }

    #[test]
    fn unavailable_keeps_prices() {
        let decision = submit(ConfirmationAction::ConfirmUnavailable, Some(10))
            .decision(TransactionType::Sale)
            .expect("decision");
        assert_eq!(
            decision,
            OwnerDecision { status: PropertyStatus::Unavailable, sale_price: None, rental_price: None }
        );
    }
}
