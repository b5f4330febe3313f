//! `order=` terms.

use restgate_core::ident::{is_valid_identifier, quote};

/// Parse `col.dir[.nullsfirst|nullslast]`, comma-separated, into ORDER BY
/// terms. Terms with invalid columns are dropped.
pub fn order_terms(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|term| !term.is_empty())
        .filter_map(order_term)
        .collect()
}

fn order_term(term: &str) -> Option<String> {
    let mut parts = term.split('.');
    let column = parts.next()?;
    if !is_valid_identifier(column) {
        return None;
    }
    let column = quote(column).ok()?;

    let mut direction = "ASC";
    let mut nulls = None;
    for modifier in parts {
        match modifier.to_ascii_lowercase().as_str() {
            "desc" => direction = "DESC",
            "nullsfirst" => nulls = Some("NULLS FIRST"),
            "nullslast" => nulls = Some("NULLS LAST"),
            _ => {}
        }
    }

    Some(match nulls {
        Some(nulls) => format!("{} {} {}", column, direction, nulls),
        None => format!("{} {}", column, direction),
    })
}

/// Render an ORDER BY clause, or nothing.
pub fn order_clause(raw: Option<&str>) -> String {
    let terms = raw.map(order_terms).unwrap_or_default();
    if terms.is_empty() {
        String::new()
    } else {
        format!(" ORDER BY {}", terms.join(", "))
    }
}
