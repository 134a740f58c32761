// src/common/i18n.rs

use std::{collections::HashMap, sync::Arc};

pub const DEFAULT_LANG: &str = "pt";

// Os arquivos de tradução são embutidos no binário.
const PT: &str = include_str!("../../locales/pt.json");
const EN: &str = include_str!("../../locales/en.json");

/// Catálogo de mensagens por idioma (`lang -> chave -> texto`).
#[derive(Debug, Clone)]
pub struct I18nStore {
    messages: Arc<HashMap<String, HashMap<String, String>>>,
}

impl I18nStore {
    pub fn load() -> anyhow::Result<Self> {
        let mut messages = HashMap::new();
        messages.insert("pt".to_string(), serde_json::from_str(PT)?);
        messages.insert("en".to_string(), serde_json::from_str(EN)?);
        Ok(Self { messages: Arc::new(messages) })
    }

    /// Traduz `key` para `lang`, caindo para o português quando faltar.
    pub fn translate(&self, lang: &str, key: &str) -> Option<&str> {
        self.messages
            .get(lang)
            .and_then(|m| m.get(key))
            .or_else(|| self.messages.get(DEFAULT_LANG).and_then(|m| m.get(key)))
            .map(String::as_str)
    }

    pub fn supports(&self, lang: &str) -> bool {
        self.messages.contains_key(lang)
    }
}

impl Default for I18nStore {
    fn default() -> Self {
        // Os JSON embutidos são validados pelos testes abaixo.
        Self::load().unwrap_or_else(|e| {
            tracing::error!("Falha ao carregar traduções: {}", e);
            Self { messages: Arc::new(HashMap::new()) }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_locales_parse() {
        let store = I18nStore::load().expect("locales");
        assert!(store.supports("pt"));
        assert!(store.supports("en"));
    }

    #[test]
    fn falls_back_to_portuguese() {
        let store = I18nStore::default();
        assert_eq!(
            store.translate("es", "tenant_inactive"),
            store.translate("pt", "tenant_inactive")
        );
        assert!(store.translate("pt", "does_not_exist").is_none());
    }

    #[test]
    fn every_portuguese_key_has_an_english_entry() {
        let pt: HashMap<String, String> = serde_json::from_str(PT).unwrap();
        let en: HashMap<String, String> = serde_json::from_str(EN).unwrap();
        for key in pt.keys() {
            assert!(en.contains_key(key), "missing en key {key}");
        }
    }
}
