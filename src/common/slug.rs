// src/common/slug.rs

const MAX_SLUG_LEN: usize = 50;

fn fold_accent(c: char) -> char {
    match c {
        'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'í' | 'ì' | 'î' | 'ï' => 'i',
        'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
        'ú' | 'ù' | 'û' | 'ü' => 'u',
        'ç' => 'c',
        'ñ' => 'n',
        other => other,
    }
}

// Troca cada sequência fora de [a-z0-9] por um único hífen.
fn slugify(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut pending_dash = false;

    for c in input.to_lowercase().chars().map(fold_accent) {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.push(c);
        } else {
            pending_dash = true;
        }
    }

    truncate(out)
}

fn truncate(slug: String) -> String {
    if slug.len() <= MAX_SLUG_LEN {
        return slug;
    }
    // Só há ASCII aqui, então cortar por byte é seguro.
    slug[..MAX_SLUG_LEN].trim_end_matches('-').to_string()
}

/// Gera um slug a partir de um nome livre ("Imobiliária São João" -> "imobiliaria-sao-joao").
pub fn generate_slug(name: &str) -> String {
    slugify(name)
}

/// Normaliza um slug informado pelo usuário, colapsando hífens repetidos.
pub fn normalize_slug(slug: &str) -> String {
    slugify(slug)
}

/// Acrescenta um sufixo mantendo o limite de tamanho.
pub fn with_suffix(slug: &str, suffix: &str) -> String {
    let room = MAX_SLUG_LEN.saturating_sub(suffix.len() + 1);
    let base = if slug.len() > room { slug[..room].trim_end_matches('-') } else { slug };
    if base.is_empty() {
        suffix.to_string()
    } else {
        format!("{}-{}", base, suffix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folds_portuguese_accents() {
        assert_eq!(generate_slug("Imobiliária São João"), "imobiliaria-sao-joao");
        assert_eq!(generate_slug("Ação & Construção Ltda."), "acao-construcao-ltda");
    }

    #[test]
    fn trims_and_collapses_separators() {
        assert_eq!(generate_slug("  --Casa   Verde--  "), "casa-verde");
        assert_eq!(normalize_slug("minha---imobiliaria"), "minha-imobiliaria");
        assert_eq!(normalize_slug("Já-Existe"), "ja-existe");
    }

    #[test]
    fn caps_length_without_trailing_dash() {
        let long = "a".repeat(49) + " bcd";
        let slug = generate_slug(&long);
        assert!(slug.len() <= 50);
        assert!(!slug.ends_with('-'));
    }

    #[test]
    fn empty_input_gives_empty_slug() {
        assert_eq!(generate_slug("!!!"), "");
    }

    #[test]
    fn suffix_respects_limit() {
        let slug = with_suffix(&"x".repeat(50), "1700000000");
        assert!(slug.len() <= 50);
        assert!(slug.ends_with("-1700000000"));
        assert_eq!(with_suffix("casa", "2"), "casa-2");
    }
}
