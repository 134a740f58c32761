// src/common/validators.rs
//
// Documentos brasileiros (CPF, CNPJ, CRECI), telefones e e-mails.

use validator::{ValidateEmail, ValidationError};

use crate::common::error::AppError;

const UFS: [&str; 27] = [
    "AC", "AL", "AP", "AM", "BA", "CE", "DF", "ES", "GO", "MA", "MT", "MS", "MG", "PA", "PB",
    "PR", "PE", "PI", "RJ", "RN", "RS", "RO", "RR", "SC", "SP", "SE", "TO",
];

pub fn only_digits(value: &str) -> String {
    value.chars().filter(|c| c.is_ascii_digit()).collect()
}

// ---
// CPF / CNPJ
// ---

fn digits_vec(value: &str) -> Vec<u32> {
    value.chars().filter_map(|c| c.to_digit(10)).collect()
}

fn all_equal(digits: &[u32]) -> bool {
    digits.windows(2).all(|w| w[0] == w[1])
}

fn check_digit(sum: u32) -> u32 {
    let rest = sum % 11;
    if rest < 2 { 0 } else { 11 - rest }
}

pub fn is_valid_cpf(value: &str) -> bool {
    let d = digits_vec(value);
    if d.len() != 11 || all_equal(&d) {
        return false;
    }

    let first: u32 = (0..9).map(|i| d[i] * (10 - i as u32)).sum();
    if check_digit(first) != d[9] {
        return false;
    }
    let second: u32 = (0..10).map(|i| d[i] * (11 - i as u32)).sum();
    check_digit(second) == d[10]
}

pub fn is_valid_cnpj(value: &str) -> bool {
    const W1: [u32; 12] = [5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2];
    const W2: [u32; 13] = [6, 5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2];

    let d = digits_vec(value);
    if d.len() != 14 || all_equal(&d) {
        return false;
    }

    let first: u32 = W1.iter().zip(&d).map(|(w, x)| w * x).sum();
    if check_digit(first) != d[12] {
        return false;
    }
    let second: u32 = W2.iter().zip(&d).map(|(w, x)| w * x).sum();
    check_digit(second) == d[13]
}

/// Valida e devolve só os dígitos do CPF.
pub fn normalize_cpf(value: &str) -> Result<String, AppError> {
    if !is_valid_cpf(value) {
        return Err(AppError::InvalidInput("CPF inválido".into()));
    }
    Ok(only_digits(value))
}

/// Valida e devolve só os dígitos do CNPJ.
pub fn normalize_cnpj(value: &str) -> Result<String, AppError> {
    if !is_valid_cnpj(value) {
        return Err(AppError::InvalidInput("CNPJ inválido".into()));
    }
    Ok(only_digits(value))
}

// ---
// CRECI
// ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreciKind {
    /// Pessoa física (corretor)
    F,
    /// Pessoa jurídica (imobiliária)
    J,
}

impl CreciKind {
    fn letter(self) -> char {
        match self {
            CreciKind::F => 'F',
            CreciKind::J => 'J',
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Creci {
    pub number: String,
    pub kind: CreciKind,
    pub uf: Option<String>,
}

impl Creci {
    /// Aceita `12345-F`, `12345F`, `CRECI 12345-F/SP` e variações de caixa.
    pub fn parse(value: &str) -> Option<Self> {
        let mut s: String = value
            .trim()
            .to_uppercase()
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        if let Some(rest) = s.strip_prefix("CRECI") {
            s = rest.trim_start_matches([':', '-']).to_string();
        }

        let (body, uf) = match s.split_once('/') {
            Some((body, uf)) => (body.to_string(), Some(uf.to_string())),
            None => (s, None),
        };

        let number: String = body.chars().take_while(|c| c.is_ascii_digit()).collect();
        if number.is_empty() || number.len() > 6 {
            return None;
        }

        let kind = match body[number.len()..].trim_start_matches('-') {
            "F" => CreciKind::F,
            "J" => CreciKind::J,
            _ => return None,
        };

        if let Some(uf) = &uf {
            if !UFS.contains(&uf.as_str()) {
                return None;
            }
        }

        Some(Self { number, kind, uf })
    }

    pub fn to_normalized(&self) -> String {
        match &self.uf {
            Some(uf) => format!("{}-{}/{}", self.number, self.kind.letter(), uf),
            None => format!("{}-{}", self.number, self.kind.letter()),
        }
    }
}

/// Valida o formato do CRECI e devolve a forma normalizada.
pub fn normalize_creci(value: &str) -> Result<String, AppError> {
    Creci::parse(value)
        .map(|c| c.to_normalized())
        .ok_or_else(|| AppError::InvalidInput(format!("CRECI inválido: {}", value.trim())))
}

/// Como `normalize_creci`, exigindo o tipo (F ou J).
pub fn normalize_creci_of_kind(value: &str, kind: CreciKind) -> Result<String, AppError> {
    let creci = Creci::parse(value)
        .ok_or_else(|| AppError::InvalidInput(format!("CRECI inválido: {}", value.trim())))?;
    if creci.kind != kind {
        return Err(AppError::InvalidInput(format!(
            "CRECI deve ser do tipo {} ({})",
            kind.letter(),
            creci.to_normalized()
        )));
    }
    Ok(creci.to_normalized())
}

// ---
// Telefones
// ---

fn national_digits(value: &str) -> String {
    let digits = only_digits(value);
    match digits.strip_prefix("55") {
        Some(rest) if digits.len() >= 12 => rest.to_string(),
        _ => digits,
    }
}

/// DDD + número (10 dígitos fixo, 11 dígitos celular começando com 9).
pub fn is_valid_phone_br(value: &str) -> bool {
    let national = national_digits(value);
    let bytes = national.as_bytes();
    match national.len() {
        10 => bytes[0] != b'0' && bytes[1] != b'0',
        11 => bytes[0] != b'0' && bytes[1] != b'0' && bytes[2] == b'9',
        _ => false,
    }
}

/// Devolve DDD + número, sem o código do país.
pub fn normalize_phone_br(value: &str) -> Result<String, AppError> {
    if !is_valid_phone_br(value) {
        return Err(AppError::InvalidInput(format!("Telefone inválido: {}", value.trim())));
    }
    Ok(national_digits(value))
}

/// Normaliza para E.164. Números sem `+` recebem `default_country`.
pub fn normalize_phone_e164(value: &str, default_country: &str) -> Result<String, AppError> {
    let trimmed = value.trim();
    if trimmed.starts_with('+') {
        let digits = only_digits(trimmed);
        if !(8..=15).contains(&digits.len()) {
            return Err(AppError::InvalidInput(format!("Telefone inválido: {}", trimmed)));
        }
        return Ok(format!("+{}", digits));
    }

    if default_country == "55" {
        let national = normalize_phone_br(trimmed)?;
        return Ok(format!("+55{}", national));
    }

    let digits = only_digits(trimmed);
    if digits.len() < 6 || digits.len() + default_country.len() > 15 {
        return Err(AppError::InvalidInput(format!("Telefone inválido: {}", trimmed)));
    }
    Ok(format!("+{}{}", default_country, digits))
}

// ---
// E-mail
// ---

pub fn normalize_email(value: &str) -> Result<String, AppError> {
    let email = value.trim().to_lowercase();
    if !email.validate_email() {
        return Err(AppError::InvalidInput(format!("E-mail inválido: {}", value.trim())));
    }
    Ok(email)
}

// ---
// Regras customizadas para o `validator`
// ---

/// Mínimo de 6 caracteres com maiúscula, minúscula e número.
pub fn validate_password_strength(password: &str) -> Result<(), ValidationError> {
    if password.chars().count() < 6 {
        return Err(ValidationError::new("password_too_short").with_message("password_too_short".into()));
    }
    let upper = password.chars().any(|c| c.is_uppercase());
    let lower = password.chars().any(|c| c.is_lowercase());
    let digit = password.chars().any(|c| c.is_ascii_digit());
    if !(upper && lower && digit) {
        return Err(ValidationError::new("password_weak").with_message("password_weak".into()));
    }
    Ok(())
}

pub fn validate_phone(phone: &str) -> Result<(), ValidationError> {
    if is_valid_phone_br(phone) || phone.trim().starts_with('+') {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_phone").with_message("invalid_phone".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cpf_check_digits() {
        assert!(is_valid_cpf("529.982.247-25"));
        assert!(is_valid_cpf("52998224725"));
        assert!(!is_valid_cpf("529.982.247-24"));
        assert!(!is_valid_cpf("111.111.111-11"));
        assert!(!is_valid_cpf("123"));
    }

    #[test]
    fn cnpj_check_digits() {
        assert!(is_valid_cnpj("11.222.333/0001-81"));
        assert!(!is_valid_cnpj("11.222.333/0001-82"));
        assert!(!is_valid_cnpj("00000000000000"));
        assert_eq!(normalize_cnpj("11.222.333/0001-81").unwrap(), "11222333000181");
    }

    #[test]
    fn creci_accepts_common_spellings() {
        assert_eq!(normalize_creci("12345-f").unwrap(), "12345-F");
        assert_eq!(normalize_creci("CRECI 12345F/sp").unwrap(), "12345-F/SP");
        assert_eq!(normalize_creci(" 6789-J ").unwrap(), "6789-J");
    }

    #[test]
    fn creci_rejects_bad_values() {
        assert!(normalize_creci("ABC").is_err());
        assert!(normalize_creci("12345-X").is_err());
        assert!(normalize_creci("1234567-F").is_err());
        assert!(normalize_creci("12345-F/XX").is_err());
    }

    #[test]
    fn creci_kind_is_enforced() {
        assert!(normalize_creci_of_kind("12345-F", CreciKind::F).is_ok());
        assert!(normalize_creci_of_kind("12345-J", CreciKind::F).is_err());
        assert!(normalize_creci_of_kind("12345-J", CreciKind::J).is_ok());
    }

    #[test]
    fn brazilian_phones() {
        assert!(is_valid_phone_br("(11) 98765-4321"));
        assert!(is_valid_phone_br("1133334444"));
        assert!(is_valid_phone_br("+55 11 98765-4321"));
        assert!(!is_valid_phone_br("(11) 88765-4321"));
        assert!(!is_valid_phone_br("12345"));
        assert_eq!(normalize_phone_br("+55 (11) 98765-4321").unwrap(), "11987654321");
    }

    #[test]
    fn e164_defaults_to_brazil() {
        assert_eq!(normalize_phone_e164("(11) 98765-4321", "55").unwrap(), "+5511987654321");
        assert_eq!(normalize_phone_e164("+1 415 555 2671", "55").unwrap(), "+14155552671");
        assert!(normalize_phone_e164("123", "55").is_err());
    }

    #[test]
    fn emails_are_lowercased() {
        assert_eq!(normalize_email("  Ana@Example.COM ").unwrap(), "ana@example.com");
        assert!(normalize_email("not-an-email").is_err());
    }

    #[test]
    fn password_strength_rules() {
        assert!(validate_password_strength("Senha1").is_ok());
        assert!(validate_password_strength("Se1").is_err());
        assert!(validate_password_strength("senha123").is_err());
        assert!(validate_password_strength("SENHA123").is_err());
        assert!(validate_password_strength("SenhaForte").is_err());
    }
}
