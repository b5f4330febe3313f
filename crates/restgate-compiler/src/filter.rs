//! Filter grammar: `column=operator.value` query parameters.
//!
//! A filter value is split on its first `.` only, so `email=eq.a.b@c.io`
//! compares against `a.b@c.io`. Values are always bound as parameters; the
//! returned SQL fragment contains only the quoted column, an operator and a
//! `$n` placeholder.

use restgate_core::SqlValue;
use restgate_core::ident::{is_valid_identifier, quote};

/// Operators accepted in a filter value prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterOperator {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
    Ilike,
    Is,
    In,
    /// `@>` containment.
    Cs,
    /// `<@` containment.
    Cd,
}

impl FilterOperator {
    pub fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix {
            "eq" => Some(Self::Eq),
            "neq" => Some(Self::Neq),
            "gt" => Some(Self::Gt),
            "gte" => Some(Self::Gte),
            "lt" => Some(Self::Lt),
            "lte" => Some(Self::Lte),
            "like" => Some(Self::Like),
            "ilike" => Some(Self::Ilike),
            "is" => Some(Self::Is),
            "in" => Some(Self::In),
            "cs" => Some(Self::Cs),
            "cd" => Some(Self::Cd),
            _ => None,
        }
    }

    fn sql_operator(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Neq => "!=",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Like => "LIKE",
            Self::Ilike => "ILIKE",
            Self::Cs => "@>",
            Self::Cd => "<@",
            // Rendered separately.
            Self::Is | Self::In => "",
        }
    }
}

/// One parsed filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterClause {
    /// Validated, unquoted column name.
    pub column: String,
    pub operator: FilterOperator,
    /// Operand after the operator prefix, or the whole value for implicit
    /// and unrecognized operators.
    pub raw_value: String,
    quoted: String,
}

impl FilterClause {
    /// Parse a query-string pair. Returns `None` when the key is not a valid
    /// identifier; the key is never reported back.
    pub fn parse(column: &str, raw: &str) -> Option<Self> {
        if !is_valid_identifier(column) {
            return None;
        }
        let quoted = quote(column).ok()?;

        let (operator, raw_value) = match raw.split_once('.') {
            Some((prefix, rest)) => match FilterOperator::from_prefix(prefix) {
                Some(op) => (op, rest),
                None => (FilterOperator::Eq, raw),
            },
            None => (FilterOperator::Eq, raw),
        };

        Some(Self {
            column: column.to_string(),
            operator,
            raw_value: raw_value.to_string(),
            quoted,
        })
    }

    /// Render the clause with its placeholder numbered `next_param`.
    pub fn to_predicate(&self, next_param: usize) -> Predicate {
        let col = &self.quoted;
        match self.operator {
            FilterOperator::Is => {
                let keyword = match self.raw_value.to_ascii_lowercase().as_str() {
                    "null" => "NULL",
                    "true" => "TRUE",
                    "false" => "FALSE",
                    _ => return Predicate::empty(),
                };
                Predicate::unbound(format!("{} IS {}", col, keyword))
            }
            FilterOperator::In => {
                let items = parse_in_list(&self.raw_value);
                if items.is_empty() {
                    return Predicate::unbound("1=0");
                }
                Predicate::bound(
                    format!("{} = ANY(${})", col, next_param),
                    SqlValue::TextArray(items),
                )
            }
            FilterOperator::Like | FilterOperator::Ilike => Predicate::bound(
                format!("{} {} ${}", col, self.operator.sql_operator(), next_param),
                SqlValue::text(self.raw_value.replace('*', "%")),
            ),
            op => Predicate::bound(
                format!("{} {} ${}", col, op.sql_operator(), next_param),
                SqlValue::text(self.raw_value.as_str()),
            ),
        }
    }
}

/// A SQL fragment plus the value for its placeholder, if it has one.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub sql: String,
    pub value: Option<SqlValue>,
}

impl Predicate {
    fn bound(sql: String, value: SqlValue) -> Self {
        Self {
            sql,
            value: Some(value),
        }
    }

    fn unbound(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            value: None,
        }
    }

    fn empty() -> Self {
        Self::unbound(String::new())
    }

    /// No-op clause (e.g. `is.maybe`); contributes nothing to WHERE.
    pub fn is_empty(&self) -> bool {
        self.sql.is_empty()
    }
}

/// Parse one filter into a predicate. `None` means the key was dropped.
pub fn parse_filter(column: &str, raw: &str, next_param: usize) -> Option<Predicate> {
    FilterClause::parse(column, raw).map(|clause| clause.to_predicate(next_param))
}

fn parse_in_list(raw: &str) -> Vec<String> {
    let inner = raw.trim();
    let inner = inner.strip_prefix('(').unwrap_or(inner);
    let inner = inner.strip_suffix(')').unwrap_or(inner);

    inner
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| {
            item.strip_prefix('"')
                .and_then(|s| s.strip_suffix('"'))
                .unwrap_or(item)
                .to_string()
        })
        .collect()
}
