//! `select=` column lists.

use restgate_core::ident::{is_valid_identifier, quote};

use crate::error::CompileError;

/// Tokens that never belong in a select list, even inside expressions.
const FORBIDDEN: &[&str] = &[";", "--", "/*"];

/// Build the column list for a read. `None` or an empty value selects `*`.
///
/// Entries are `col`, `col:alias`, `*`, or expressions containing `(`,
/// `->`, `::` or `.`, which are copied verbatim.
pub fn select_list(raw: Option<&str>) -> Result<String, CompileError> {
    let Some(raw) = raw.filter(|r| !r.trim().is_empty()) else {
        return Ok("*".to_string());
    };

    let mut columns = Vec::new();
    for entry in split_top_level(raw) {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }
        columns.push(select_entry(entry)?);
    }

    if columns.is_empty() {
        return Ok("*".to_string());
    }
    Ok(columns.join(", "))
}

fn select_entry(entry: &str) -> Result<String, CompileError> {
    if FORBIDDEN.iter().any(|token| entry.contains(token)) {
        return Err(CompileError::InvalidIdentifier("select list entry".into()));
    }
    if entry == "*" {
        return Ok(entry.to_string());
    }
    if is_expression(entry) {
        return Ok(entry.to_string());
    }

    match entry.split_once(':') {
        Some((column, alias)) => Ok(format!("{} AS {}", column_ident(column)?, column_ident(alias)?)),
        None => column_ident(entry),
    }
}

fn is_expression(entry: &str) -> bool {
    entry.contains('(') || entry.contains("->") || entry.contains("::") || entry.contains('.')
}

fn column_ident(name: &str) -> Result<String, CompileError> {
    let name = name.trim();
    if !is_valid_identifier(name) {
        return Err(CompileError::InvalidIdentifier("select list entry".into()));
    }
    Ok(quote(name)?)
}

/// Split on commas that are not inside parentheses.
fn split_top_level(raw: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in raw.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&raw[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&raw[start..]);
    parts
}
