// src/services/document_service.rs

use genpdf::{elements, style, Element};
use image::Luma;
use qrcode::QrCode;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::TenantRepository,
    models::property::{Property, PropertyType, TransactionType},
};

const FONT_FAMILY: &str = "Roboto";

/// Formata em reais: `R$ 1.234.567,89`.
pub fn format_brl(value: Decimal) -> String {
    let rounded = value.round_dp(2);
    let text = format!("{:.2}", rounded.abs());
    let (int_part, frac_part) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(c);
    }

    let sign = if rounded.is_sign_negative() && !rounded.is_zero() { "-" } else { "" };
    format!("{}R$ {},{}", sign, grouped, frac_part)
}

/// Linhas de preço conforme o tipo de transação.
pub fn price_lines(property: &Property) -> Vec<String> {
    let mut lines = Vec::new();
    if property.transaction_type != TransactionType::Rent {
        if let Some(price) = property.sale_price {
            lines.push(format!("Venda: {}", format_brl(price)));
        }
    }
    if property.transaction_type != TransactionType::Sale {
        if let Some(price) = property.rental_price {
            lines.push(format!("Aluguel: {}/mês", format_brl(price)));
        }
    }
    if lines.is_empty() {
        lines.push("Preço sob consulta".into());
    }
    lines
}

pub fn property_type_label(property_type: PropertyType) -> &'static str {
    match property_type {
        PropertyType::Apartment => "Apartamento",
        PropertyType::House => "Casa",
        PropertyType::Land => "Terreno",
        PropertyType::Commercial => "Comercial",
        PropertyType::NewDevelopment => "Lançamento",
        PropertyType::CondoLot => "Lote em condomínio",
        PropertyType::BuildingLot => "Terreno para construção",
    }
}

fn address_line(property: &Property) -> Option<String> {
    let street = match (&property.street, &property.number) {
        (Some(s), Some(n)) => Some(format!("{}, {}", s, n)),
        (Some(s), None) => Some(s.clone()),
        _ => None,
    };
    let city = match (&property.city, &property.state) {
        (Some(c), Some(uf)) => Some(format!("{} - {}", c, uf)),
        (Some(c), None) => Some(c.clone()),
        _ => None,
    };
    let parts: Vec<String> = [street, property.neighborhood.clone(), city]
        .into_iter()
        .flatten()
        .collect();
    (!parts.is_empty()).then(|| parts.join(" · "))
}

fn feature_line(property: &Property) -> String {
    let mut parts = vec![property_type_label(property.property_type).to_string()];
    if let Some(area) = property.area_sqm {
        parts.push(format!("{} m²", area.normalize()));
    }
    if let Some(n) = property.bedrooms {
        parts.push(format!("{} quarto(s)", n));
    }
    if let Some(n) = property.bathrooms {
        parts.push(format!("{} banheiro(s)", n));
    }
    if let Some(n) = property.parking_spaces {
        parts.push(format!("{} vaga(s)", n));
    }
    parts.join(" · ")
}

pub fn public_property_url(public_site_url: &str, tenant_slug: &str, property: &Property) -> String {
    format!(
        "{}/{}/imovel/{}",
        public_site_url.trim_end_matches('/'),
        tenant_slug,
        property.slug
    )
}

fn pdf_error(e: impl std::fmt::Display) -> AppError {
    AppError::InternalServerError(anyhow::Error::msg(e.to_string()))
}

#[derive(Clone)]
pub struct DocumentService {
    tenant_repo: TenantRepository,
    fonts_dir: String,
    public_site_url: String,
}

impl DocumentService {
    pub fn new(tenant_repo: TenantRepository, fonts_dir: String, public_site_url: String) -> Self {
        Self { tenant_repo, fonts_dir, public_site_url }
    }

    /// Ficha do imóvel: título, preço, características, endereço e QR code da página pública.
    pub async fn property_brochure(&self, tenant_id: Uuid, property: &Property) -> Result<Vec<u8>, AppError> {
        let tenant = self
            .tenant_repo
            .find_by_id(tenant_id)
            .await?
            .ok_or(AppError::TenantNotFound)?;

        let font_family = genpdf::fonts::from_files(&self.fonts_dir, FONT_FAMILY, None)
            .map_err(|_| AppError::FontNotFound(format!("Fonte {} não encontrada em {}", FONT_FAMILY, self.fonts_dir)))?;

        let mut doc = genpdf::Document::new(font_family);
        doc.set_title(property.title.clone());
        let mut decorator = genpdf::SimplePageDecorator::new();
        decorator.set_margins(10);
        doc.set_page_decorator(decorator);

        // --- CABEÇALHO ---
        doc.push(elements::Paragraph::new(tenant.name.clone()).styled(style::Style::new().bold().with_font_size(16)));
        if let Some(creci) = &tenant.creci {
            doc.push(elements::Paragraph::new(format!("CRECI {}", creci)).styled(style::Style::new().with_font_size(9)));
        }
        doc.push(elements::Break::new(1.5));

        doc.push(elements::Paragraph::new(property.title.clone()).styled(style::Style::new().bold().with_font_size(14)));
        if let Some(reference) = &property.reference {
            doc.push(elements::Paragraph::new(format!("Ref.: {}", reference)).styled(style::Style::new().with_font_size(9)));
        }
        doc.push(elements::Break::new(1));

        // --- PREÇO E CARACTERÍSTICAS ---
        for line in price_lines(property) {
            doc.push(elements::Paragraph::new(line).styled(style::Style::new().bold().with_font_size(12)));
        }
        doc.push(elements::Paragraph::new(feature_line(property)));
        if !property.features.is_empty() {
            doc.push(elements::Paragraph::new(format!("Diferenciais: {}", property.features.join(", "))));
        }
        if let Some(address) = address_line(property) {
            doc.push(elements::Paragraph::new(address));
        }

        if let Some(description) = &property.description {
            doc.push(elements::Break::new(1));
            doc.push(elements::Paragraph::new(description.clone()));
        }
        doc.push(elements::Break::new(2));

        // --- QR CODE ---
        let url = public_property_url(&self.public_site_url, &tenant.slug, property);
        let code = QrCode::new(url.as_bytes()).map_err(pdf_error)?;
        let image_buffer = code.render::<Luma<u8>>().build();
        let pdf_image = elements::Image::from_dynamic_image(image::DynamicImage::ImageLuma8(image_buffer))
            .map_err(pdf_error)?
            .with_scale(genpdf::Scale::new(0.5, 0.5));
        doc.push(pdf_image);
        doc.push(elements::Paragraph::new(url).styled(style::Style::new().italic().with_font_size(8)));

        // --- RODAPÉ ---
        let contact: Vec<&str> = [tenant.phone.as_deref(), tenant.email.as_deref()].into_iter().flatten().collect();
        if !contact.is_empty() {
            doc.push(elements::Break::new(1));
            doc.push(elements::Paragraph::new(contact.join(" · ")).styled(style::Style::new().with_font_size(8)));
        }

        let mut buffer = Vec::new();
        doc.render(&mut buffer).map_err(pdf_error)?;
        Ok(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::property::{PropertyStatus, Visibility};
    use chrono::Utc;
    use sqlx::types::Json;

    fn property(transaction_type: TransactionType) -> Property {
        Property {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            owner_id: None,
            broker_id: None,
            external_id: None,
            reference: Some("AP-1".into()),
            slug: "apartamento-centro".into(),
            title: "Apartamento Centro".into(),
            description: None,
            property_type: PropertyType::Apartment,
            status: PropertyStatus::Available,
            visibility: Visibility::Public,
            transaction_type,
            featured: false,
            sale_price: Some(Decimal::new(45_000_000, 2)),
            rental_price: Some(Decimal::new(2_500, 0)),
            area_sqm: Some(Decimal::new(685, 1)),
            bedrooms: Some(2),
            bathrooms: None,
            parking_spaces: Some(1),
            street: Some("Rua A".into()),
            number: Some("10".into()),
            neighborhood: Some("Centro".into()),
            city: Some("Campinas".into()),
            state: Some("SP".into()),
            zip_code: None,
            cover_image_url: None,
            images: Json(vec![]),
            features: vec![],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn brl_formatting() {
        assert_eq!(format_brl(Decimal::new(123_456_789, 2)), "R$ 1.234.567,89");
        assert_eq!(format_brl(Decimal::new(950, 0)), "R$ 950,00");
        assert_eq!(format_brl(Decimal::new(1_000, 0)), "R$ 1.000,00");
    }

    #[test]
    fn prices_follow_transaction_type() {
        assert_eq!(price_lines(&property(TransactionType::Sale)), vec!["Venda: R$ 450.000,00".to_string()]);
        assert_eq!(price_lines(&property(TransactionType::Rent)), vec!["Aluguel: R$ 2.500,00/mês".to_string()]);
        assert_eq!(price_lines(&property(TransactionType::Both)).len(), 2);
    }

    #[test]
    fn features_and_address() {
        let p = property(TransactionType::Sale);
        assert_eq!(feature_line(&p), "Apartamento · 68.5 m² · 2 quarto(s) · 1 vaga(s)");
        assert_eq!(address_line(&p).as_deref(), Some("Rua A, 10 · Centro · Campinas - SP"));
    }

    #[test]
    fn qr_code_points_to_public_page() {
        let p = property(TransactionType::Sale);
        assert_eq!(
            public_property_url("https://site.example.com/", "imob-central", &p),
            "https://site.example.com/imob-central/imovel/apartamento-centro"
        );
    }
}
