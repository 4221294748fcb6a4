//! Comparison operators accepted in bracketed filter keys.
//!
//! A filter key is either a bare field name (`housing=true`, equality) or a
//! field name followed by one bracketed operator token (`averageCost[lte]=10000`).
//! Only the tokens listed in [`ComparisonOperator::BRACKETED`] are recognised;
//! anything else is rejected by the query parser.

use std::cmp::Ordering;
use std::fmt;

/// Comparison operators supported by filter predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComparisonOperator {
    /// Equality (bare `field=value`)
    Eq,
    /// Greater than (`[gt]`)
    Gt,
    /// Greater than or equal (`[gte]`)
    Gte,
    /// Less than (`[lt]`)
    Lt,
    /// Less than or equal (`[lte]`)
    Lte,
    /// Membership in a comma separated list (`[in]`)
    In,
}

impl ComparisonOperator {
    /// Operators that may appear inside brackets.
    pub const BRACKETED: [Self; 5] = [Self::Gt, Self::Gte, Self::Lt, Self::Lte, Self::In];

    /// Parse a bracket token (`gte`, `in`, ...).
    ///
    /// `eq` is deliberately not a bracket token: equality is spelled as a bare key.
    #[must_use]
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "gt" => Some(Self::Gt),
            "gte" => Some(Self::Gte),
            "lt" => Some(Self::Lt),
            "lte" => Some(Self::Lte),
            "in" => Some(Self::In),
            _ => None,
        }
    }

    /// The query-string token for this operator.
    #[must_use]
    pub const fn token(self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Gt => "gt",
            Self::Gte => "gte",
            Self::Lt => "lt",
            Self::Lte => "lte",
            Self::In => "in",
        }
    }

    /// SQL comparison symbol used by the relational document backend.
    #[must_use]
    pub const fn sql_symbol(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::In => "IN",
        }
    }

    /// Whether the operator takes a list of values rather than a scalar.
    #[must_use]
    pub const fn takes_list(self) -> bool {
        matches!(self, Self::In)
    }

    /// Decide whether a comparison outcome satisfies this operator.
    ///
    /// `None` means the two values were not comparable (mismatched types),
    /// which never satisfies any operator.
    #[must_use]
    pub fn accepts(self, ordering: Option<Ordering>) -> bool {
        match (self, ordering) {
            (_, None) => false,
            (Self::Eq | Self::In, Some(ord)) => ord == Ordering::Equal,
            (Self::Gt, Some(ord)) => ord == Ordering::Greater,
            (Self::Gte, Some(ord)) => ord != Ordering::Less,
            (Self::Lt, Some(ord)) => ord == Ordering::Less,
            (Self::Lte, Some(ord)) => ord != Ordering::Greater,
        }
    }

    /// Comma separated list of the bracket tokens, for error messages.
    #[must_use]
    pub fn supported_tokens() -> String {
        Self::BRACKETED
            .iter()
            .map(|op| op.token())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for ComparisonOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}
