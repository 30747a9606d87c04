//! Table, column and resource naming rules

use crate::schema::SchemaError;

/// Convert a PascalCase / camelCase identifier to snake_case
///
/// Inserts `_` before every interior uppercase letter, then lowercases.
/// Identifiers that are already snake_case pass through unchanged.
///
/// # Errors
///
/// Returns [`SchemaError::InvalidName`] if the result is empty, starts or
/// ends with `_`, or contains `__`.
pub fn snake_case(ident: &str) -> Result<String, SchemaError> {
    let mut out = String::with_capacity(ident.len() + 4);
    for (i, ch) in ident.chars().enumerate() {
        if ch.is_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.extend(ch.to_lowercase());
        } else {
            out.push(ch);
        }
    }

    let valid = !out.is_empty()
        && !out.starts_with('_')
        && !out.ends_with('_')
        && !out.contains("__")
        && out
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    if !valid {
        return Err(SchemaError::InvalidName {
            name: ident.to_string(),
            derived: out,
        });
    }
    Ok(out)
}

/// Simple English pluralisation for resource names
pub fn pluralize(word: &str) -> String {
    if let Some(stem) = word.strip_suffix('y') {
        let before = stem.chars().last();
        if !matches!(before, Some('a' | 'e' | 'i' | 'o' | 'u')) {
            return format!("{}ies", stem);
        }
    }
    if word.ends_with('s')
        || word.ends_with('x')
        || word.ends_with("ch")
        || word.ends_with("sh")
    {
        return format!("{}es", word);
    }
    format!("{}s", word)
}

/// REST-style collection path for an aggregate type (`Order` -> `/orders`)
///
/// # Errors
///
/// Returns [`SchemaError::InvalidName`] if the type name is not convertible.
pub fn resource_path(type_name: &str) -> Result<String, SchemaError> {
    Ok(format!("/{}", pluralize(&snake_case(type_name)?)))
}

/// Quote an identifier for SQL
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}
