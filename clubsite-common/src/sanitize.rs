//! Text sanitization helpers
//!
//! Everything here is a pure function over strings so it can be shared by the
//! write path (slug normalization, storage keys) and the read path (legacy CSV
//! cleanup, delimited list splitting).

/// Quote characters stripped from legacy CSV values
const QUOTE_CHARS: [char; 2] = ['"', '\''];

/// Strip exactly one layer of matching leading/trailing quotes
///
/// `"\"Anna\""` becomes `"Anna"`, `"\"\"Anna\"\""` becomes `"\"Anna\""`.
/// Mismatched or single quotes are left alone.
pub fn strip_matching_quotes(value: &str) -> &str {
    let mut chars = value.chars();
    match (chars.next(), chars.next_back()) {
        (Some(first), Some(last)) if first == last && QUOTE_CHARS.contains(&first) => {
            &value[first.len_utf8()..value.len() - last.len_utf8()]
        }
        _ => value,
    }
}

/// Reduce an uploaded filename to `[A-Za-z0-9_.-]`
///
/// Every other character is replaced by `_`. An empty name becomes `file`.
pub fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if cleaned.is_empty() {
        "file".to_string()
    } else {
        cleaned
    }
}

/// Normalize a slug at write time
///
/// Strips one quote layer, lowercases, transliterates German umlauts and
/// collapses everything outside `[a-z0-9]` into single dashes.
pub fn normalize_slug(value: &str) -> String {
    let unquoted = strip_matching_quotes(value.trim()).trim();

    let mut slug = String::with_capacity(unquoted.len());
    let mut pending_dash = false;

    for c in unquoted.chars().flat_map(char::to_lowercase) {
        let mapped: &str = match c {
            'ä' => "ae",
            'ö' => "oe",
            'ü' => "ue",
            'ß' => "ss",
            _ => "",
        };

        if !mapped.is_empty() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push_str(mapped);
        } else if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c);
        } else {
            pending_dash = true;
        }
    }

    slug
}

/// Quoted form of a slug as found in historically malformed news records
pub fn quoted_variant(slug: &str) -> String {
    format!("\"{}\"", slug)
}

/// Split a stored delimited list (newline or `;`) into trimmed items
pub fn split_delimited(value: &str) -> Vec<String> {
    value
        .split(['\n', ';'])
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

/// Whether a free-form content field name is acceptable as a document key
///
/// Names must match `[A-Za-z][A-Za-z0-9_]{0,63}`.
pub fn is_content_field_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {}
        _ => return false,
    }
    name.len() <= 64 && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_matching_quotes_one_layer_only() {
        assert_eq!(strip_matching_quotes("\"Anna\""), "Anna");
        assert_eq!(strip_matching_quotes("'Anna'"), "Anna");
        assert_eq!(strip_matching_quotes("\"\"Anna\"\""), "\"Anna\"");
    }

    #[test]
    fn test_strip_matching_quotes_leaves_mismatched() {
        assert_eq!(strip_matching_quotes("\"Anna'"), "\"Anna'");
        assert_eq!(strip_matching_quotes("\"Anna"), "\"Anna");
        assert_eq!(strip_matching_quotes("\""), "\"");
        assert_eq!(strip_matching_quotes(""), "");
        assert_eq!(strip_matching_quotes("\"\""), "");
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("logo acme (final).png"), "logo_acme__final_.png");
        assert_eq!(sanitize_filename("Grüße.jpg"), "Gr__e.jpg");
        assert_eq!(sanitize_filename("a-b_c.d"), "a-b_c.d");
        assert_eq!(sanitize_filename(""), "file");
    }

    #[test]
    fn test_normalize_slug() {
        assert_eq!(normalize_slug("Max Mustermann"), "max-mustermann");
        assert_eq!(normalize_slug("\"saison-start-2024\""), "saison-start-2024");
        assert_eq!(normalize_slug("  Jürgen   Groß! "), "juergen-gross");
        assert_eq!(normalize_slug("--Already--dashed--"), "already-dashed");
    }

    #[test]
    fn test_split_delimited() {
        assert_eq!(
            split_delimited("Meister 2021; Vize 2022\n\n  Pokal 2023 "),
            vec!["Meister 2021", "Vize 2022", "Pokal 2023"]
        );
        assert!(split_delimited("  ").is_empty());
    }

    #[test]
    fn test_is_content_field_name() {
        assert!(is_content_field_name("introText"));
        assert!(is_content_field_name("section_2_title"));
        assert!(!is_content_field_name("2nd"));
        assert!(!is_content_field_name("with space"));
        assert!(!is_content_field_name(""));
        assert!(!is_content_field_name(&"a".repeat(65)));
    }
}
