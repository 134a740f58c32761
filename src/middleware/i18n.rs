// src/middleware/i18n.rs

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts, HeaderMap},
};

use crate::{
    common::i18n::{I18nStore, DEFAULT_LANG},
    config::AppState,
};

// Idioma da requisição, já restrito aos idiomas com tradução.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locale(pub String);

impl Default for Locale {
    fn default() -> Self {
        Locale(DEFAULT_LANG.to_string())
    }
}

impl Locale {
    /// Percorre o `Accept-Language` em ordem de preferência ("pt-BR" -> "pt").
    pub fn from_headers(headers: &HeaderMap, store: &I18nStore) -> Self {
        headers
            .get(header::ACCEPT_LANGUAGE)
            .and_then(|value| value.to_str().ok())
            .and_then(|header_str| {
                accept_language::parse(header_str)
                    .into_iter()
                    .map(|tag| tag.split('-').next().unwrap_or_default().to_lowercase())
                    .find(|lang| store.supports(lang))
            })
            .map(Locale)
            .unwrap_or_default()
    }
}

impl<S> FromRequestParts<S> for Locale
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        Ok(Locale::from_headers(&parts.headers, &app_state.i18n_store))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &'static str) -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(header::ACCEPT_LANGUAGE, HeaderValue::from_static(value));
        h
    }

    #[test]
    fn picks_first_supported_language() {
        let store = I18nStore::default();
        assert_eq!(Locale::from_headers(&headers("en-US,en;q=0.9"), &store).0, "en");
        assert_eq!(Locale::from_headers(&headers("fr-FR,en;q=0.5"), &store).0, "en");
    }

    #[test]
    fn falls_back_to_portuguese() {
        let store = I18nStore::default();
        assert_eq!(Locale::from_headers(&headers("de"), &store).0, "pt");
        assert_eq!(Locale::from_headers(&HeaderMap::new(), &store).0, "pt");
    }
}
